//! `head`: font header.

use super::read_table;
use crate::byte_buffer::ByteBuffer;
use crate::error::Result;
use crate::fonts::Tag;

/// Expected value of `magic_number`.
pub const HEAD_MAGIC: u32 = 0x5F0F_3CF5;

/// Font header table.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadTable {
    /// Table version, 1.0
    pub version: f64,
    /// Font revision set by the manufacturer
    pub font_revision: f64,
    /// Whole-file checksum adjustment
    pub checksum_adjustment: u32,
    /// Always 0x5F0F3CF5
    pub magic_number: u32,
    /// Header flags
    pub flags: u16,
    /// Design units per em
    pub units_per_em: u16,
    /// Creation time, seconds since 1904-01-01
    pub created: i64,
    /// Modification time, seconds since 1904-01-01
    pub modified: i64,
    /// Bounding box of all glyphs
    pub x_min: i16,
    #[allow(missing_docs)]
    pub y_min: i16,
    #[allow(missing_docs)]
    pub x_max: i16,
    #[allow(missing_docs)]
    pub y_max: i16,
    /// Bold/italic style bits
    pub mac_style: u16,
    /// Smallest readable size in pixels
    pub lowest_rec_ppem: u16,
    /// Deprecated direction hint
    pub font_direction_hint: i16,
    /// 0 for short `loca` offsets, 1 for long
    pub index_to_loc_format: i16,
    /// 0 for the current glyph format
    pub glyph_data_format: i16,
}

impl HeadTable {
    /// Byte offset of `checksum_adjustment` within the table.
    pub const CHECKSUM_ADJUSTMENT_OFFSET: usize = 8;

    /// Serialized size.
    pub const SIZE: usize = 54;

    /// Parse the table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        read_table(Tag::HEAD, data, |buf| {
            let head = Self {
                version: buf.read_fixed()?,
                font_revision: buf.read_fixed()?,
                checksum_adjustment: buf.read_u32()?,
                magic_number: buf.read_u32()?,
                flags: buf.read_u16()?,
                units_per_em: buf.read_u16()?,
                created: buf.read_i64()?,
                modified: buf.read_i64()?,
                x_min: buf.read_i16()?,
                y_min: buf.read_i16()?,
                x_max: buf.read_i16()?,
                y_max: buf.read_i16()?,
                mac_style: buf.read_u16()?,
                lowest_rec_ppem: buf.read_u16()?,
                font_direction_hint: buf.read_i16()?,
                index_to_loc_format: buf.read_i16()?,
                glyph_data_format: buf.read_i16()?,
            };
            if head.magic_number != HEAD_MAGIC {
                log::warn!("head table magic number is {:#010x}", head.magic_number);
            }
            Ok(head)
        })
    }

    /// Whether `loca` uses 32-bit offsets.
    pub fn long_loca(&self) -> bool {
        self.index_to_loc_format != 0
    }

    /// Serialize the table.
    pub fn write(&self, out: &mut ByteBuffer) {
        out.write_fixed(self.version);
        out.write_fixed(self.font_revision);
        out.write_u32(self.checksum_adjustment);
        out.write_u32(self.magic_number);
        out.write_u16(self.flags);
        out.write_u16(self.units_per_em);
        out.write_i64(self.created);
        out.write_i64(self.modified);
        out.write_i16(self.x_min);
        out.write_i16(self.y_min);
        out.write_i16(self.x_max);
        out.write_i16(self.y_max);
        out.write_u16(self.mac_style);
        out.write_u16(self.lowest_rec_ppem);
        out.write_i16(self.font_direction_hint);
        out.write_i16(self.index_to_loc_format);
        out.write_i16(self.glyph_data_format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HeadTable {
        HeadTable {
            version: 1.0,
            font_revision: 2.5,
            checksum_adjustment: 0x1234_5678,
            magic_number: HEAD_MAGIC,
            flags: 3,
            units_per_em: 1000,
            created: 100,
            modified: 200,
            x_min: -10,
            y_min: -20,
            x_max: 900,
            y_max: 800,
            mac_style: 0,
            lowest_rec_ppem: 8,
            font_direction_hint: 2,
            index_to_loc_format: 0,
            glyph_data_format: 0,
        }
    }

    #[test]
    fn test_write_then_parse() {
        let mut buf = ByteBuffer::new();
        sample().write(&mut buf);
        assert_eq!(buf.len(), HeadTable::SIZE);
        let bytes = buf.into_vec();
        assert_eq!(&bytes[8..12], &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(HeadTable::parse(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_truncated_head() {
        assert!(matches!(
            HeadTable::parse(&[0, 1, 0, 0]),
            Err(crate::error::Error::Font(_))
        ));
    }
}
