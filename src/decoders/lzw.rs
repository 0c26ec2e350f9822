//! LZWDecode implementation.
//!
//! PDF's LZW uses MSB-first codes starting at 9 bits, clear code 256 and EOD
//! code 257. With the default `EarlyChange` of 1 the code width grows one code
//! early, which is the TIFF convention; streams written with the GIF
//! convention are retried with a plain decoder.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use weezl::{decode::Decoder, BitOrder};

/// LZWDecode filter implementation.
pub struct LzwDecoder;

impl StreamDecoder for LzwDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        match Decoder::with_tiff_size_switch(BitOrder::Msb, 8).decode(input) {
            Ok(output) => Ok(output),
            Err(early) => {
                log::debug!("LZW early-change decode failed: {:?}, retrying", early);
                Decoder::new(BitOrder::Msb, 8)
                    .decode(input)
                    .map_err(|e| Error::Decode(format!("LZWDecode error: {:?}", e)))
            },
        }
    }

    fn name(&self) -> &str {
        "LZWDecode"
    }
}
