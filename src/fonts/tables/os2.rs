//! `OS/2`: OS/2 and Windows metrics.

use super::read_table;
use crate::byte_buffer::ByteBuffer;
use crate::error::Result;
use crate::fonts::Tag;

/// OS/2 table, decoded through `usWinDescent`.
///
/// Later-version fields (code page ranges, x-height and so on) are kept as
/// raw bytes so the table can be written back unchanged.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Os2Table {
    pub version: u16,
    pub x_avg_char_width: i16,
    pub us_weight_class: u16,
    pub us_width_class: u16,
    pub fs_type: u16,
    pub y_subscript_x_size: i16,
    pub y_subscript_y_size: i16,
    pub y_subscript_x_offset: i16,
    pub y_subscript_y_offset: i16,
    pub y_superscript_x_size: i16,
    pub y_superscript_y_size: i16,
    pub y_superscript_x_offset: i16,
    pub y_superscript_y_offset: i16,
    pub y_strikeout_size: i16,
    pub y_strikeout_position: i16,
    pub s_family_class: i16,
    pub panose: [u8; 10],
    pub ul_unicode_range: [u32; 4],
    pub ach_vend_id: [u8; 4],
    pub fs_selection: u16,
    pub us_first_char_index: u16,
    pub us_last_char_index: u16,
    pub s_typo_ascender: i16,
    pub s_typo_descender: i16,
    pub s_typo_line_gap: i16,
    pub us_win_ascent: u16,
    pub us_win_descent: u16,
    /// Bytes after `usWinDescent`
    pub tail: Vec<u8>,
}

impl Os2Table {
    /// Size of the fields decoded here.
    pub const BASE_SIZE: usize = 78;

    /// Smallest table accepted. Version 0 tables from some old fonts end
    /// at `usLastCharIndex`; the missing words read as zero.
    pub const MIN_SIZE: usize = 68;

    /// Parse the table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut padded;
        let data = if data.len() >= Self::MIN_SIZE && data.len() < Self::BASE_SIZE {
            log::debug!("Short OS/2 table ({} bytes), padding with zeros", data.len());
            padded = data.to_vec();
            padded.resize(Self::BASE_SIZE, 0);
            &padded[..]
        } else {
            data
        };

        read_table(Tag::OS2, data, |buf| {
            let mut panose = [0u8; 10];
            let mut ul_unicode_range = [0u32; 4];
            let mut ach_vend_id = [0u8; 4];
            Ok(Self {
                version: buf.read_u16()?,
                x_avg_char_width: buf.read_i16()?,
                us_weight_class: buf.read_u16()?,
                us_width_class: buf.read_u16()?,
                fs_type: buf.read_u16()?,
                y_subscript_x_size: buf.read_i16()?,
                y_subscript_y_size: buf.read_i16()?,
                y_subscript_x_offset: buf.read_i16()?,
                y_subscript_y_offset: buf.read_i16()?,
                y_superscript_x_size: buf.read_i16()?,
                y_superscript_y_size: buf.read_i16()?,
                y_superscript_x_offset: buf.read_i16()?,
                y_superscript_y_offset: buf.read_i16()?,
                y_strikeout_size: buf.read_i16()?,
                y_strikeout_position: buf.read_i16()?,
                s_family_class: buf.read_i16()?,
                panose: {
                    read_exact(buf, &mut panose)?;
                    panose
                },
                ul_unicode_range: {
                    for range in ul_unicode_range.iter_mut() {
                        *range = buf.read_u32()?;
                    }
                    ul_unicode_range
                },
                ach_vend_id: {
                    read_exact(buf, &mut ach_vend_id)?;
                    ach_vend_id
                },
                fs_selection: buf.read_u16()?,
                us_first_char_index: buf.read_u16()?,
                us_last_char_index: buf.read_u16()?,
                s_typo_ascender: buf.read_i16()?,
                s_typo_descender: buf.read_i16()?,
                s_typo_line_gap: buf.read_i16()?,
                us_win_ascent: buf.read_u16()?,
                us_win_descent: buf.read_u16()?,
                tail: buf.read_slice(buf.available()).to_vec(),
            })
        })
    }

    /// Serialize the table, tail included.
    pub fn write(&self, out: &mut ByteBuffer) {
        out.write_u16(self.version);
        out.write_i16(self.x_avg_char_width);
        out.write_u16(self.us_weight_class);
        out.write_u16(self.us_width_class);
        out.write_u16(self.fs_type);
        for value in [
            self.y_subscript_x_size,
            self.y_subscript_y_size,
            self.y_subscript_x_offset,
            self.y_subscript_y_offset,
            self.y_superscript_x_size,
            self.y_superscript_y_size,
            self.y_superscript_x_offset,
            self.y_superscript_y_offset,
            self.y_strikeout_size,
            self.y_strikeout_position,
            self.s_family_class,
        ] {
            out.write_i16(value);
        }
        out.write_bytes(&self.panose);
        for range in self.ul_unicode_range {
            out.write_u32(range);
        }
        out.write_bytes(&self.ach_vend_id);
        out.write_u16(self.fs_selection);
        out.write_u16(self.us_first_char_index);
        out.write_u16(self.us_last_char_index);
        out.write_i16(self.s_typo_ascender);
        out.write_i16(self.s_typo_descender);
        out.write_i16(self.s_typo_line_gap);
        out.write_u16(self.us_win_ascent);
        out.write_u16(self.us_win_descent);
        out.write_bytes(&self.tail);
    }
}

fn read_exact(buf: &mut ByteBuffer, out: &mut [u8]) -> Result<()> {
    if buf.read_into(out) < out.len() {
        return Err(crate::error::Error::UnexpectedEof);
    }
    Ok(())
}
