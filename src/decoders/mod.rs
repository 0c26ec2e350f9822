//! Stream decoder implementations for the filters found on structural streams.
//!
//! Cross-reference streams and object streams are almost always
//! FlateDecode-compressed, often with a PNG Up predictor. Older producers
//! used LZWDecode, and hand-edited files sometimes carry ASCIIHexDecode.
//!
//! Decoders can be chained together in a filter pipeline; the predictor
//! described by `DecodeParms` runs after the last filter.

use crate::error::{Error, Result};
use crate::parser_config::ParserOptions;

mod ascii_hex;
mod flate;
mod lzw;
mod predictor;

pub use ascii_hex::AsciiHexDecoder;
pub use flate::FlateDecoder;
pub use lzw::LzwDecoder;
pub use predictor::{decode_predictor, DecodeParams};

/// Stream filters understood by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// FlateDecode (deflate/zlib compression)
    FlateDecode,
    /// LZWDecode (Lempel-Ziv-Welch compression)
    LZWDecode,
    /// ASCIIHexDecode (hexadecimal encoding)
    ASCIIHexDecode,
}

impl Filter {
    /// Look up a filter by its PDF name, including the inline-image abbreviations.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "LZWDecode" | "LZW" => Some(Filter::LZWDecode),
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            _ => None,
        }
    }

    fn decoder(self) -> &'static dyn StreamDecoder {
        match self {
            Filter::FlateDecode => &FlateDecoder,
            Filter::LZWDecode => &LzwDecoder,
            Filter::ASCIIHexDecode => &AsciiHexDecoder,
        }
    }
}

/// Trait for stream decoders.
pub trait StreamDecoder: Sync {
    /// Decode the input data.
    ///
    /// # Arguments
    ///
    /// * `input` - The encoded/compressed data
    ///
    /// # Returns
    ///
    /// The decoded data or an error if decoding fails.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Get the name of this decoder (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

/// Decode stream data through a filter pipeline with default limits.
pub fn decode_stream(data: &[u8], filters: &[String]) -> Result<Vec<u8>> {
    decode_stream_with_options(data, filters, None, &ParserOptions::default())
}

/// Decode stream data through a filter pipeline, then undo any predictor.
///
/// # Arguments
///
/// * `data` - The raw stream data
/// * `filters` - List of filter names to apply in order
/// * `params` - Optional decode parameters (predictor, columns, ...)
/// * `options` - Decompression bomb limits
///
/// # Errors
///
/// `Error::UnsupportedFilter` for an unknown filter name, `Error::Decode` when
/// a filter fails or the output breaks the size or ratio limit.
pub fn decode_stream_with_options(
    data: &[u8],
    filters: &[String],
    params: Option<&DecodeParams>,
    options: &ParserOptions,
) -> Result<Vec<u8>> {
    let mut current = data.to_vec();

    for name in filters {
        let filter =
            Filter::from_name(name).ok_or_else(|| Error::UnsupportedFilter(name.clone()))?;
        current = filter.decoder().decode(&current)?;

        if !options.allows_decompressed(data.len(), current.len()) {
            return Err(Error::Decode(format!(
                "{} output of {} bytes from {} input bytes exceeds decompression limits",
                name,
                current.len(),
                data.len()
            )));
        }
    }

    match params {
        Some(params) if params.predictor > 1 => decode_predictor(&current, params),
        _ => Ok(current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decode_stream_no_filters() {
        let data = b"Hello, World!";
        assert_eq!(decode_stream(data, &[]).unwrap(), data);
    }

    #[test]
    fn test_decode_stream_unsupported_filter() {
        let result = decode_stream(b"test", &["DCTDecode".to_string()]);
        match result {
            Err(Error::UnsupportedFilter(name)) => assert_eq!(name, "DCTDecode"),
            other => panic!("Expected UnsupportedFilter error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_stream_chain() {
        // hex of a zlib stream, decoded hex-first
        let compressed = zlib(b"chained");
        let hex: String = compressed.iter().map(|b| format!("{:02X}", b)).collect();
        let filters = vec!["ASCIIHexDecode".to_string(), "FlateDecode".to_string()];
        assert_eq!(decode_stream(hex.as_bytes(), &filters).unwrap(), b"chained");
    }

    #[test]
    fn test_decode_stream_with_png_predictor() {
        // Two rows of three columns, PNG Up on both rows
        let encoded = [2u8, 1, 2, 3, 2, 1, 1, 1];
        let params = DecodeParams {
            predictor: 12,
            columns: 3,
            ..DecodeParams::default()
        };
        let filters = vec!["FlateDecode".to_string()];
        let decoded = decode_stream_with_options(
            &zlib(&encoded),
            &filters,
            Some(&params),
            &ParserOptions::default(),
        )
        .unwrap();
        assert_eq!(decoded, vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn test_decompression_bomb_rejected() {
        let bomb = zlib(&vec![0u8; 1_000_000]);
        let options = ParserOptions {
            max_decompression_ratio: 10,
            ..ParserOptions::default()
        };
        let result =
            decode_stream_with_options(&bomb, &["FlateDecode".to_string()], None, &options);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_filter_abbreviations() {
        assert_eq!(Filter::from_name("Fl"), Some(Filter::FlateDecode));
        assert_eq!(Filter::from_name("AHx"), Some(Filter::ASCIIHexDecode));
        assert_eq!(Filter::from_name("RunLengthDecode"), None);
    }
}
