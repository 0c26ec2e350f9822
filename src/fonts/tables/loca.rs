//! `loca`: glyph offsets into `glyf`.

use super::read_table;
use crate::byte_buffer::ByteBuffer;
use crate::error::Result;
use crate::fonts::Tag;
use std::ops::Range;

/// Index-to-location table.
///
/// Holds `num_glyphs + 1` byte offsets. Glyph `gid` occupies
/// `offsets[gid]..offsets[gid + 1]` of `glyf`; an empty range is a glyph
/// without an outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaTable {
    offsets: Vec<u32>,
}

impl LocaTable {
    /// Parse `num_glyphs + 1` offsets, halved words when `long` is false.
    pub fn parse(data: &[u8], num_glyphs: u16, long: bool) -> Result<Self> {
        read_table(Tag::LOCA, data, |buf| {
            let count = num_glyphs as usize + 1;
            let mut offsets = Vec::with_capacity(count);
            for _ in 0..count {
                let offset = if long { buf.read_u32()? } else { buf.read_u16()? as u32 * 2 };
                offsets.push(offset);
            }
            Ok(Self { offsets })
        })
    }

    /// Build a table from already computed offsets.
    pub fn from_offsets(offsets: Vec<u32>) -> Self {
        Self { offsets }
    }

    /// All offsets, including the trailing end-of-table entry.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Number of glyphs described.
    pub fn num_glyphs(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Byte range of a glyph in `glyf`, or `None` when `gid` is out of range
    /// or its offsets run backwards.
    pub fn glyph_range(&self, gid: u16) -> Option<Range<usize>> {
        let gid = gid as usize;
        let start = *self.offsets.get(gid)? as usize;
        let end = *self.offsets.get(gid + 1)? as usize;
        if start > end {
            log::warn!("loca offsets for glyph {} run backwards ({} > {})", gid, start, end);
            return None;
        }
        Some(start..end)
    }

    /// Serialize in the long (32-bit) format.
    pub fn write_long(&self, out: &mut ByteBuffer) {
        for &offset in &self.offsets {
            out.write_u32(offset);
        }
    }
}
