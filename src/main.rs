use clap::{Parser, Subcommand};

mod payload;
mod stream;

use stream::StreamClient;

#[derive(Parser)]
#[clap(
    name = "streampub",
    about = "Publish and inspect records on a Kinesis-compatible stream service."
)]
struct Cli {
    /// Region to use, falling back to the ambient AWS configuration.
    #[clap(global = true, long)]
    region: Option<String>,
    /// Service endpoint override, e.g. `http://localhost:4567` for a local
    /// emulator.
    #[clap(global = true, long)]
    endpoint_url: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a single record. The value is base64-encoded before it is
    /// sent.
    Put {
        stream_name: String,
        partition_key: String,
        value: String,
    },
    /// Publish one record per line read from stdin.
    Push {
        #[clap(long)]
        stream_name: String,
    },
    #[clap(alias = "mk")]
    Create {
        #[clap(long)]
        stream_name: String,
        #[clap(long, default_value_t = 1)]
        num_shards: usize,
    },
    #[clap(alias = "rm")]
    Delete {
        #[clap(long)]
        stream_name: String,
    },
    #[clap(alias = "ls")]
    List,
    Describe {
        #[clap(long)]
        stream_name: String,
    },
    /// Follow one shard and print its records.
    Tail {
        #[clap(long)]
        stream_name: String,
        #[clap(long)]
        shard_id: usize,
        /// Base64-decode payloads back to their original form.
        #[clap(long)]
        decode: bool,
        /// Start from the oldest available record instead of the latest.
        #[clap(long)]
        from_beginning: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client = StreamClient::connect(cli.region, cli.endpoint_url).await?;
    match cli.command {
        Commands::Put {
            stream_name,
            partition_key,
            value,
        } => client.put(&stream_name, &partition_key, &value).await?,
        Commands::Push { stream_name } => client.push(&stream_name).await?,
        Commands::Create {
            stream_name,
            num_shards,
        } => client.create(&stream_name, num_shards).await?,
        Commands::Delete { stream_name } => client.delete(&stream_name).await?,
        Commands::List => client.list().await?,
        Commands::Describe { stream_name } => client.describe(&stream_name).await?,
        Commands::Tail {
            stream_name,
            shard_id,
            decode,
            from_beginning,
        } => {
            client
                .tail(&stream_name, shard_id, decode, from_beginning)
                .await?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn put_captures_positional_arguments_in_order() {
        let cli = Cli::try_parse_from(["streampub", "put", "orders", "user-1", "hello"]).unwrap();
        match cli.command {
            Commands::Put {
                stream_name,
                partition_key,
                value,
            } => {
                assert_eq!(stream_name, "orders");
                assert_eq!(partition_key, "user-1");
                assert_eq!(value, "hello");
            }
            _ => panic!("expected the put command"),
        }
    }

    #[test]
    fn put_requires_all_three_arguments() {
        assert!(Cli::try_parse_from(["streampub", "put", "orders", "user-1"]).is_err());
    }
}
