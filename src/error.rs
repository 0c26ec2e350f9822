//! Error types for the PDF core library.
//!
//! This module defines all error types that can occur while reading byte
//! buffers, resolving cross-reference sections, and parsing or subsetting
//! TrueType fonts.

/// Result type alias for PDF core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during PDF and font processing.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)] // "Invalid" prefix is intentional for clarity
pub enum Error {
    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid cross-reference table
    #[error("Invalid cross-reference table")]
    InvalidXref,

    /// Cross-reference stream rows could not be decoded
    #[error("Invalid cross-reference stream: {0}")]
    InvalidXrefStream(String),

    /// Referenced object not found in cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Fixed-width read ran past the end of the data
    #[error("End of data reached unexpectedly")]
    UnexpectedEof,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error
    #[error("UTF-8 decoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Unsupported stream filter
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Structurally invalid font data
    #[error("Font error: {0}")]
    Font(String),

    /// A table the operation needs is not present in the font
    #[error("Required font table is missing: {0}")]
    MissingTable(String),

    /// Composite glyph nesting exceeds the font's declared maximum
    #[error("Composite glyph {glyph_id} exceeds maximum component depth {max_depth}")]
    CompositeDepthExceeded {
        /// Glyph whose component chain went too deep
        glyph_id: u16,
        /// Value of maxComponentDepth in the maxp table
        max_depth: u16,
    },

    /// Code point cannot be encoded in a format 4 cmap subtable
    #[error("Code point U+{0:04X} is outside the Basic Multilingual Plane")]
    UnsupportedCodepoint(u32),

    /// The subsetter was modified after its glyph set was closed
    #[error("Font subset is already finalized")]
    SubsetFinalized,

    /// Recursion depth limit exceeded
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),
}
