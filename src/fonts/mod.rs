//! TrueType and OpenType fonts.
//!
//! This module parses sfnt fonts and collections, resolves glyph outlines
//! including composites, and builds subset fonts for PDF embedding.

pub mod collection;
pub mod composite;
pub mod font_subsetter;
pub mod glyph_names;
pub mod glyph_table;
pub mod tables;
pub mod tag;
pub mod truetype_parser;

pub use collection::{DsigInfo, TrueTypeCollection};
pub use composite::{
    Component, ComponentFlags, CompositeDescription, CompositeGlyph, GlyphDescription, Resolve, ResolveState,
    Resolver,
};
pub use font_subsetter::{sfnt_checksum, verify_font_checksum, SubsetPhase, SubsetStats, TtfSubsetter};
pub use glyph_table::{Bounds, GlyphData, GlyphOutline, GlyphTable, SimpleGlyph};
pub use tag::Tag;
pub use truetype_parser::{TableRecord, TrueTypeFont};
