//! FlateDecode (zlib/deflate) implementation.
//!
//! Uses flate2 first. Damaged streams fall back through raw deflate, a
//! header skip, the `inflate` crate and `libflate`, keeping any partial
//! output a decoder managed to produce before failing.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use inflate::inflate_bytes_zlib;
use libflate::zlib::Decoder as LibflateDecoder;
use std::io::Read;

/// FlateDecode filter implementation.
pub struct FlateDecoder;

/// Read a decoder to the end, accepting partial output on error.
fn drain<R: Read>(mut reader: R, strategy: &str) -> Option<Vec<u8>> {
    let mut output = Vec::new();
    match reader.read_to_end(&mut output) {
        Ok(_) => Some(output),
        Err(e) if !output.is_empty() => {
            log::warn!(
                "FlateDecode {} partial recovery: {} bytes before error: {}",
                strategy,
                output.len(),
                e
            );
            Some(output)
        },
        Err(e) => {
            log::debug!("FlateDecode {} failed: {}", strategy, e);
            None
        },
    }
}

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        if let Some(output) = drain(ZlibDecoder::new(input), "zlib") {
            return Ok(output);
        }

        // Some writers emit raw deflate without the zlib wrapper
        if let Some(output) = drain(DeflateDecoder::new(input), "raw deflate") {
            if !output.is_empty() {
                log::info!("Raw deflate recovery succeeded: {} bytes", output.len());
                return Ok(output);
            }
        }

        if input.len() > 2 {
            if let Some(output) = drain(DeflateDecoder::new(&input[2..]), "header skip") {
                if !output.is_empty() {
                    return Ok(output);
                }
            }
        }

        match inflate_bytes_zlib(input) {
            Ok(output) => {
                log::info!("Inflate crate recovery succeeded: {} bytes", output.len());
                return Ok(output);
            },
            Err(e) => log::debug!("Inflate crate failed: {}", e),
        }

        match LibflateDecoder::new(input) {
            Ok(decoder) => {
                if let Some(output) = drain(decoder, "libflate") {
                    if !output.is_empty() {
                        return Ok(output);
                    }
                }
            },
            Err(e) => log::debug!("Libflate init failed: {}", e),
        }

        log::error!("All FlateDecode recovery strategies failed ({} input bytes)", input.len());
        Err(Error::Decode(format!(
            "FlateDecode decompression failed for {} input bytes",
            input.len()
        )))
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_flate_decode_zlib() {
        let original = b"1 0 obj << /Type /XRef >> endobj".repeat(20);
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&original).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(FlateDecoder.decode(&compressed).unwrap(), original);
    }

    #[test]
    fn test_flate_decode_raw_deflate() {
        let original = b"raw deflate without a zlib header";
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(FlateDecoder.decode(&compressed).unwrap(), original);
    }

    #[test]
    fn test_flate_decode_garbage_fails() {
        let result = FlateDecoder.decode(b"This is not zlib compressed data");
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_flate_decoder_name() {
        assert_eq!(FlateDecoder.name(), "FlateDecode");
    }
}
