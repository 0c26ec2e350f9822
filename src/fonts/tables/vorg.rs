//! `VORG`: vertical origin table for CFF fonts.

use super::read_table;
use crate::error::Result;
use crate::fonts::Tag;
use std::collections::BTreeMap;

/// Vertical origin table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VorgTable {
    /// Major version, 1
    pub major_version: u16,
    /// Minor version, 0
    pub minor_version: u16,
    /// Origin y for glyphs without an explicit entry
    pub default_vert_origin_y: i16,
    origins: BTreeMap<u16, i16>,
}

impl VorgTable {
    /// Parse the table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        read_table(Tag::VORG, data, |buf| {
            let major_version = buf.read_u16()?;
            let minor_version = buf.read_u16()?;
            let default_vert_origin_y = buf.read_i16()?;
            let count = buf.read_u16()?;
            let mut origins = BTreeMap::new();
            for _ in 0..count {
                origins.insert(buf.read_u16()?, buf.read_i16()?);
            }
            Ok(Self {
                major_version,
                minor_version,
                default_vert_origin_y,
                origins,
            })
        })
    }

    /// Vertical origin y of a glyph.
    pub fn vertical_origin(&self, gid: u16) -> i16 {
        self.origins.get(&gid).copied().unwrap_or(self.default_vert_origin_y)
    }

    /// Explicit per-glyph origins.
    pub fn origins(&self) -> &BTreeMap<u16, i16> {
        &self.origins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_and_default() {
        let data = [0, 1, 0, 0, 0x03, 0x70, 0, 1, 0, 5, 0x03, 0x20];
        let vorg = VorgTable::parse(&data).unwrap();
        assert_eq!(vorg.vertical_origin(5), 800);
        assert_eq!(vorg.vertical_origin(6), 880);
        assert_eq!(vorg.origins().len(), 1);
    }
}
