//! Compressed payload decoding
//!
//! The hub sends every data payload as base64 of a raw DEFLATE stream. The
//! zlib header is stripped on the server and so is (usually) the adler-32
//! trailer. Decoding re-prepends the header and inflates in zlib mode,
//! accepting a stream that ends where the trailer would start.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use flate2::{Decompress, FlushDecompress, Status};
use thiserror::Error;

/// zlib header for the default compression level
pub const ZLIB_HEADER: [u8; 2] = [0x78, 0x9C];

const OUTPUT_CHUNK: usize = 16 * 1024;

/// Payload decode failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Nothing to decode
    #[error("empty payload")]
    Empty,

    /// Payload is not valid base64
    #[error("invalid base64: {0}")]
    Base64(String),

    /// DEFLATE stream is corrupt
    #[error("inflate failed: {0}")]
    Inflate(String),

    /// Inflater stopped making progress before the input ran out
    #[error("inflate stalled after {consumed} of {total} bytes")]
    Stalled { consumed: usize, total: usize },

    /// Inflated bytes are not UTF-8
    #[error("payload is not UTF-8: {0}")]
    Utf8(String),
}

impl From<DecodeError> for bittrex_types::BittrexError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Decode one payload block into its JSON text
pub fn decode(payload: &str) -> Result<String, DecodeError> {
    let trimmed = trim_quotes(payload.trim());
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    let compressed = BASE64
        .decode(trimmed)
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    let inflated = inflate(&compressed)?;

    String::from_utf8(inflated).map_err(|e| DecodeError::Utf8(e.to_string()))
}

/// Strip one layer of surrounding double quotes
fn trim_quotes(s: &str) -> &str {
    let s = s.strip_prefix('"').unwrap_or(s);
    s.strip_suffix('"').unwrap_or(s)
}

/// Inflate a header-less zlib stream
fn inflate(deflated: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut input = Vec::with_capacity(ZLIB_HEADER.len() + deflated.len());
    input.extend_from_slice(&ZLIB_HEADER);
    input.extend_from_slice(deflated);

    let mut inflater = Decompress::new(true);
    let mut output = Vec::with_capacity(OUTPUT_CHUNK.min(deflated.len() * 4 + 64));

    loop {
        if output.len() == output.capacity() {
            output.reserve(OUTPUT_CHUNK);
        }

        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();
        let status = inflater
            .decompress_vec(&input[consumed..], &mut output, FlushDecompress::None)
            .map_err(|e| DecodeError::Inflate(e.to_string()))?;

        if status == Status::StreamEnd {
            return Ok(output);
        }

        let has_room = output.len() < output.capacity();
        if inflater.total_in() as usize == input.len() && has_room {
            // Input exhausted without a trailer
            return Ok(output);
        }

        let progressed = inflater.total_in() as usize != consumed || inflater.total_out() != produced;
        if !progressed && has_room {
            return Err(DecodeError::Stalled {
                consumed: inflater.total_in() as usize,
                total: input.len(),
            });
        }
    }
}

/// Compress `json` the way the hub does: raw DEFLATE, base64 encoded
#[cfg(any(test, feature = "test-utils"))]
pub fn encode_payload(json: &str) -> String {
    let zlib = zlib_compress(json.as_bytes());
    // Drop the 2-byte header and the 4-byte adler-32 trailer
    BASE64.encode(&zlib[ZLIB_HEADER.len()..zlib.len() - 4])
}

/// Like [`encode_payload`] but keeps the adler-32 trailer
#[cfg(any(test, feature = "test-utils"))]
pub fn encode_payload_with_checksum(json: &str) -> String {
    let zlib = zlib_compress(json.as_bytes());
    BASE64.encode(&zlib[ZLIB_HEADER.len()..])
}

#[cfg(any(test, feature = "test-utils"))]
fn zlib_compress(data: &[u8]) -> Vec<u8> {
    use flate2::{write::ZlibEncoder, Compression};
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("write to Vec");
    let zlib = encoder.finish().expect("finish to Vec");
    debug_assert_eq!(zlib[..2], ZLIB_HEADER);
    zlib
}
