//! Record payload encoding.
//!
//! Values are base64-encoded before publication so arbitrary payloads
//! survive transports and tooling that expect text. `decode` is the exact
//! inverse and backs `tail --decode`.

use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Largest encoded record the service accepts.
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;
/// Largest sum of encoded record sizes in one batch request.
pub const MAX_BATCH_BYTES: usize = 5 * 1024 * 1024;

pub fn encode(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

pub fn decode(data: &[u8]) -> anyhow::Result<String> {
    let bytes = STANDARD
        .decode(data)
        .context("record payload is not valid base64")?;
    String::from_utf8(bytes).context("decoded payload is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_produces_standard_padded_base64() {
        assert_eq!(encode("hello"), "aGVsbG8=");
        assert_eq!(encode(""), "");
    }

    #[test]
    fn decode_recovers_original_value() {
        for value in ["", "hello", "with spaces and $ymbols", "héllo wörld"] {
            let encoded = encode(value);
            assert_eq!(decode(encoded.as_bytes()).unwrap(), value);
        }
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(decode(b"not base64!!").is_err());
    }
}
