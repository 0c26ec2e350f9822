//! Parser configuration for controlling lenient/strict cross-reference loading.

use serde::{Deserialize, Serialize};

/// Parser options for controlling error handling and recovery behavior.
///
/// These options trade strict PDF compliance for broader compatibility with
/// damaged files, and bound the work a hostile file can cause.
///
/// # Example
///
/// ```
/// use pdf_core::parser_config::ParserOptions;
///
/// // Strict mode - structural errors are returned to the caller
/// let strict = ParserOptions::strict();
/// assert!(!strict.recover_damaged_xref);
///
/// // Lenient mode (default) - rebuild the table from a full scan
/// let lenient = ParserOptions::default();
/// assert!(lenient.recover_damaged_xref);
///
/// // Custom configuration
/// let custom = ParserOptions {
///     max_xref_chain_length: 16,
///     ..ParserOptions::lenient()
/// };
/// assert_eq!(custom.max_xref_chain_length, 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserOptions {
    /// Fail on the first error (true) or attempt recovery (false)
    pub strict: bool,

    /// Maximum number of sections followed through `/Prev` and `/XRefStm`
    ///
    /// Guards against pathological chains. Exceeding it fails the load with
    /// `Error::RecursionLimitExceeded`.
    pub max_xref_chain_length: u32,

    /// Maximum number of entries a single classic subsection may declare
    pub max_subsection_entries: u32,

    /// Rebuild the table by scanning the whole file when the section chain
    /// is structurally broken
    ///
    /// Cross-reference stream rows that cannot be decoded always fall back
    /// to the scan, whatever this flag says.
    pub recover_damaged_xref: bool,

    /// Maximum decompression ratio (compressed:decompressed)
    ///
    /// Default: 100 (100:1 ratio). Set to 0 to disable check.
    pub max_decompression_ratio: u32,

    /// Maximum decompressed stream size in bytes
    ///
    /// Default: 100 MB. Set to 0 to disable check.
    pub max_decompressed_size: usize,
}

impl Default for ParserOptions {
    /// Default configuration: lenient mode
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParserOptions {
    /// Strict mode: structural errors are returned, never repaired.
    ///
    /// Use this for validating files or when parsing trusted input.
    pub fn strict() -> Self {
        Self {
            strict: true,
            max_xref_chain_length: 100,
            max_subsection_entries: 1_000_000,
            recover_damaged_xref: false,
            max_decompression_ratio: 100,
            max_decompressed_size: 100 * 1024 * 1024, // 100 MB
        }
    }

    /// Lenient mode: fall back to a full-file scan when the chain is broken.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            recover_damaged_xref: true,
            ..Self::strict()
        }
    }

    /// Check a decompressed size against the configured bomb limits.
    pub(crate) fn allows_decompressed(&self, compressed: usize, decompressed: usize) -> bool {
        if self.max_decompressed_size != 0 && decompressed > self.max_decompressed_size {
            return false;
        }
        if self.max_decompression_ratio != 0 && compressed > 0 {
            let ratio = decompressed / compressed;
            if ratio > self.max_decompression_ratio as usize {
                return false;
            }
        }
        true
    }
}
