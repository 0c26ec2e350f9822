//! `hhea`: horizontal header.

use super::read_table;
use crate::byte_buffer::ByteBuffer;
use crate::error::Result;
use crate::fonts::Tag;

/// Horizontal header table.
#[derive(Debug, Clone, PartialEq)]
pub struct HheaTable {
    /// Table version, 1.0
    pub version: f64,
    /// Typographic ascent
    pub ascender: i16,
    /// Typographic descent
    pub descender: i16,
    /// Typographic line gap
    pub line_gap: i16,
    /// Largest advance width
    pub advance_width_max: u16,
    /// Smallest left side bearing
    pub min_left_side_bearing: i16,
    /// Smallest right side bearing
    pub min_right_side_bearing: i16,
    /// max(lsb + (xMax - xMin))
    pub x_max_extent: i16,
    /// Caret slope rise
    pub caret_slope_rise: i16,
    /// Caret slope run
    pub caret_slope_run: i16,
    /// Caret offset
    pub caret_offset: i16,
    /// Four reserved words
    pub reserved: [i16; 4],
    /// 0 for the current format
    pub metric_data_format: i16,
    /// Number of full (advance, lsb) records in `hmtx`
    pub number_of_h_metrics: u16,
}

impl HheaTable {
    /// Parse the table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        read_table(Tag::HHEA, data, |buf| {
            Ok(Self {
                version: buf.read_fixed()?,
                ascender: buf.read_i16()?,
                descender: buf.read_i16()?,
                line_gap: buf.read_i16()?,
                advance_width_max: buf.read_u16()?,
                min_left_side_bearing: buf.read_i16()?,
                min_right_side_bearing: buf.read_i16()?,
                x_max_extent: buf.read_i16()?,
                caret_slope_rise: buf.read_i16()?,
                caret_slope_run: buf.read_i16()?,
                caret_offset: buf.read_i16()?,
                reserved: [buf.read_i16()?, buf.read_i16()?, buf.read_i16()?, buf.read_i16()?],
                metric_data_format: buf.read_i16()?,
                number_of_h_metrics: buf.read_u16()?,
            })
        })
    }

    /// Serialize the table.
    pub fn write(&self, out: &mut ByteBuffer) {
        out.write_fixed(self.version);
        out.write_i16(self.ascender);
        out.write_i16(self.descender);
        out.write_i16(self.line_gap);
        out.write_u16(self.advance_width_max);
        out.write_i16(self.min_left_side_bearing);
        out.write_i16(self.min_right_side_bearing);
        out.write_i16(self.x_max_extent);
        out.write_i16(self.caret_slope_rise);
        out.write_i16(self.caret_slope_run);
        out.write_i16(self.caret_offset);
        for reserved in self.reserved {
            out.write_i16(reserved);
        }
        out.write_i16(self.metric_data_format);
        out.write_u16(self.number_of_h_metrics);
    }
}
