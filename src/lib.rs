//! # PDF Core
//!
//! Byte-exact building blocks for reading and writing PDF files.
//!
//! ## Core Features
//!
//! ### Byte Buffer
//! - **ByteBuffer**: growable, cursor-based buffer with big/little-endian
//!   integer reads and writes, bit-level reads and in-place edits
//!
//! ### Fonts
//! - **TrueType/OpenType parsing**: lazy typed tables (`head`, `hhea`,
//!   `maxp`, `loca`, `hmtx`, `cmap`, `post`, `OS/2`, `name`, `VORG`)
//! - **Collections**: `.ttc` files with per-font lazy loading
//! - **Glyphs**: on-demand `glyf` decoding with a shared cache and
//!   cycle-safe composite resolution
//! - **Subsetting**: minimal embeddable fonts with renumbered glyphs,
//!   a fresh format 4 `cmap` and valid checksums
//!
//! ### Cross-Reference Tables
//! - **Classic tables and xref streams** (PDF 1.5+), including hybrid files
//! - **Incremental updates**: `/Prev` and `/XRefStm` chains, newest wins
//! - **Linearized files**: first-page table located through the `/T` hint
//! - **Recovery**: full-file scan with object stream expansion when the
//!   chain is damaged
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_core::fonts::{TrueTypeFont, TtfSubsetter};
//! use pdf_core::parser_config::ParserOptions;
//! use pdf_core::xref::load_xref_file;
//!
//! # fn main() -> pdf_core::Result<()> {
//! let info = load_xref_file("paper.pdf", &ParserOptions::default())?;
//! println!("{} objects, recovered: {}", info.table.len(), info.recovered);
//!
//! let font = TrueTypeFont::open("DejaVuSans.ttf")?;
//! let mut subsetter = TtfSubsetter::new(&font);
//! subsetter.add_str("Hello")?;
//! let name = subsetter.subset_font_name("DejaVuSans");
//! let bytes = subsetter.to_bytes()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Byte-level I/O
pub mod byte_buffer;

// Core PDF parsing
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
/// Parser configuration options
pub mod parser_config;
pub mod xref;
pub mod xref_reconstruction;

// Stream decoders
pub mod decoders;

// Fonts
pub mod fonts;

// Configuration
pub mod config;

// Re-exports
pub use byte_buffer::{ByteBuffer, ByteOrder};
pub use error::{Error, Result};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
