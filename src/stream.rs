use std::time::{Duration, Instant};

use anyhow::Context;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_kinesis::model::{PutRecordsRequestEntry, ShardIteratorType};
use aws_sdk_kinesis::types::Blob;
use aws_sdk_kinesis::{Client, Endpoint, Region};
use tokio::io::AsyncBufReadExt;

use crate::payload;

const MAX_BATCH_RECORDS: usize = 500;

/// Client handle bound to one resolved region and endpoint.
pub struct StreamClient {
    client: Client,
}

impl StreamClient {
    /// Resolve AWS configuration and build the client. `endpoint_url` points
    /// the client at a Kinesis-compatible emulator instead of the real
    /// service.
    pub async fn connect(
        region: Option<String>,
        endpoint_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let region_provider = RegionProviderChain::first_try(region.map(Region::new))
            .or_default_provider()
            .or_else(Region::new("us-east-1"));
        let loader = aws_config::from_env().region(region_provider);
        let config = loader.load().await;

        let mut config_builder = aws_sdk_kinesis::config::Builder::from(&config);
        if let Some(endpoint_url) = endpoint_url {
            tracing::debug!("overriding service endpoint to {}", endpoint_url);
            let uri = endpoint_url
                .parse()
                .with_context(|| format!("`{}` is not a valid endpoint URL", endpoint_url))?;
            config_builder = config_builder.endpoint_resolver(Endpoint::immutable(uri));
        }

        Ok(Self {
            client: Client::from_conf(config_builder.build()),
        })
    }

    /// Publish one record. The value is base64-encoded and sent as the record
    /// data, the stream name and partition key pass through unmodified.
    pub async fn put(
        &self,
        stream_name: &str,
        partition_key: &str,
        value: &str,
    ) -> anyhow::Result<()> {
        let output = self
            .client
            .put_record()
            .stream_name(stream_name)
            .partition_key(partition_key)
            .data(Blob::new(payload::encode(value)))
            .send()
            .await?;
        println!(
            "Published record to stream `{}` (shard {}, sequence number {}).",
            stream_name,
            output.shard_id().unwrap_or("unknown"),
            output.sequence_number().unwrap_or("unknown"),
        );
        Ok(())
    }

    /// Publish one record per line of stdin, batching into PutRecords
    /// requests. Lines whose encoded form exceeds the per-record limit are
    /// skipped.
    pub async fn push(&self, stream_name: &str) -> anyhow::Result<()> {
        let stdin = tokio::io::stdin();
        let mut lines = tokio::io::BufReader::new(stdin).lines();

        let mut batch = Vec::new();
        let mut batch_bytes = 0;
        let mut num_published = 0usize;
        let mut num_skipped = 0usize;
        let start = Instant::now();

        while let Some(line) = lines.next_line().await? {
            let entry = batch_entry(&line);
            let entry_bytes = entry.data().map(|blob| blob.as_ref().len()).unwrap_or(0);

            if entry_bytes > payload::MAX_RECORD_BYTES {
                tracing::warn!(
                    "skipping record of {} encoded bytes, the limit is {}",
                    entry_bytes,
                    payload::MAX_RECORD_BYTES
                );
                num_skipped += 1;
                continue;
            }
            if batch.len() == MAX_BATCH_RECORDS || batch_bytes + entry_bytes > payload::MAX_BATCH_BYTES
            {
                self.put_batch(stream_name, std::mem::take(&mut batch))
                    .await?;
                batch_bytes = 0;
            }
            batch_bytes += entry_bytes;
            batch.push(entry);
            num_published += 1;
        }
        if !batch.is_empty() {
            self.put_batch(stream_name, batch).await?;
        }
        println!(
            "Pushed {} record(s) to stream `{}` in {:.1}s ({} skipped).",
            num_published,
            stream_name,
            start.elapsed().as_secs_f64(),
            num_skipped
        );
        Ok(())
    }

    async fn put_batch(
        &self,
        stream_name: &str,
        records: Vec<PutRecordsRequestEntry>,
    ) -> anyhow::Result<()> {
        self.client
            .put_records()
            .stream_name(stream_name)
            .set_records(Some(records))
            .send()
            .await?;
        Ok(())
    }

    pub async fn create(&self, stream_name: &str, num_shards: usize) -> anyhow::Result<()> {
        self.client
            .create_stream()
            .stream_name(stream_name)
            .shard_count(num_shards as i32)
            .send()
            .await?;
        println!(
            "Created stream `{}` with {} shard(s).",
            stream_name, num_shards
        );
        Ok(())
    }

    pub async fn delete(&self, stream_name: &str) -> anyhow::Result<()> {
        self.client
            .delete_stream()
            .stream_name(stream_name)
            .send()
            .await?;
        println!("Deleted stream `{}`.", stream_name);
        Ok(())
    }

    pub async fn list(&self) -> anyhow::Result<()> {
        let output = self.client.list_streams().send().await?;

        // TODO: handle `has_more_streams` for accounts with many streams.
        if let Some(stream_names) = output.stream_names {
            for stream_name in stream_names {
                println!("{}", stream_name);
            }
        }
        Ok(())
    }

    pub async fn describe(&self, stream_name: &str) -> anyhow::Result<()> {
        let output = self
            .client
            .describe_stream()
            .stream_name(stream_name)
            .send()
            .await?;
        let description = output.stream_description().ok_or_else(|| {
            anyhow::anyhow!("service returned no description for stream `{}`", stream_name)
        })?;

        println!("Stream: {}", description.stream_name().unwrap_or(stream_name));
        if let Some(status) = description.stream_status() {
            println!("Status: {}", status.as_str());
        }
        if let Some(hours) = description.retention_period_hours() {
            println!("Retention: {}h", hours);
        }
        println!("Shards:");
        if let Some(shards) = description.shards() {
            for shard in shards {
                println!("\t{}", shard.shard_id().unwrap_or("unknown"));
            }
        }
        Ok(())
    }

    /// Poll one shard and print its records as `partition_key | payload`
    /// lines until the shard closes.
    pub async fn tail(
        &self,
        stream_name: &str,
        shard_id: usize,
        decode: bool,
        from_beginning: bool,
    ) -> anyhow::Result<()> {
        let iterator_type = if from_beginning {
            ShardIteratorType::TrimHorizon
        } else {
            ShardIteratorType::Latest
        };
        let mut shard_iterator_opt = self
            .client
            .get_shard_iterator()
            .stream_name(stream_name)
            .shard_id(make_shard_id(shard_id))
            .shard_iterator_type(iterator_type)
            .send()
            .await?
            .shard_iterator;

        let mut interval = tokio::time::interval(Duration::from_millis(200));

        while let Some(shard_iterator) = shard_iterator_opt {
            interval.tick().await;

            let output = self
                .client
                .get_records()
                .shard_iterator(shard_iterator)
                .send()
                .await?;

            if let Some(records) = output.records {
                for record in records {
                    let key = record.partition_key().unwrap_or("-");
                    let data = record.data().map(|blob| blob.as_ref()).unwrap_or_default();
                    let line = if decode {
                        payload::decode(data)?
                    } else {
                        String::from_utf8_lossy(data).into_owned()
                    };
                    println!("{} | {}", key, line);
                }
            }
            shard_iterator_opt = output.next_shard_iterator;
        }
        println!("Shard `{}` is closed.", make_shard_id(shard_id));
        Ok(())
    }
}

fn batch_entry(line: &str) -> PutRecordsRequestEntry {
    PutRecordsRequestEntry::builder()
        .partition_key(format!("{:x}", seahash::hash(line.as_bytes())))
        .data(Blob::new(payload::encode(line)))
        .build()
}

fn make_shard_id(id: usize) -> String {
    format!("shardId-{:0>12}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_entry_encodes_payload_and_hashes_key() {
        let entry = batch_entry("hello");
        assert_eq!(entry.data().unwrap().as_ref(), b"aGVsbG8=");
        let expected_key = format!("{:x}", seahash::hash(b"hello"));
        assert_eq!(entry.partition_key().unwrap(), expected_key);
    }

    #[test]
    fn shard_ids_are_zero_padded() {
        assert_eq!(make_shard_id(0), "shardId-000000000000");
        assert_eq!(make_shard_id(42), "shardId-000000000042");
    }
}
