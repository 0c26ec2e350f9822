//! `post`: PostScript information and glyph names.

use super::read_table;
use crate::byte_buffer::ByteBuffer;
use crate::error::Result;
use crate::fonts::glyph_names::{mac_glyph_name, MAC_GLYPH_NAMES};
use crate::fonts::Tag;

/// Version 1.0: the standard Macintosh glyph order.
pub const POST_VERSION_1_0: u32 = 0x0001_0000;
/// Version 2.0: per-glyph name indices plus custom names.
pub const POST_VERSION_2_0: u32 = 0x0002_0000;
/// Version 2.5: per-glyph offsets into the standard order (deprecated).
pub const POST_VERSION_2_5: u32 = 0x0002_5000;
/// Version 3.0: no glyph names.
pub const POST_VERSION_3_0: u32 = 0x0003_0000;

/// Number of standard Macintosh glyph names.
pub const NUM_MAC_GLYPH_NAMES: u16 = 258;

/// PostScript table.
#[derive(Debug, Clone, PartialEq)]
pub struct PostTable {
    /// Raw 16.16 version
    pub version: u32,
    /// Italic angle in degrees counter-clockwise from vertical
    pub italic_angle: f64,
    /// Suggested underline position
    pub underline_position: i16,
    /// Suggested underline thickness
    pub underline_thickness: i16,
    /// Non-zero for monospaced fonts
    pub is_fixed_pitch: u32,
    /// Memory hints for PostScript drivers
    pub min_mem_type42: u32,
    #[allow(missing_docs)]
    pub max_mem_type42: u32,
    #[allow(missing_docs)]
    pub min_mem_type1: u32,
    #[allow(missing_docs)]
    pub max_mem_type1: u32,
    glyph_names: Vec<String>,
}

impl PostTable {
    /// Serialized size of the fixed header.
    pub const HEADER_SIZE: usize = 32;

    /// Parse the table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        read_table(Tag::POST, data, |buf| {
            let mut post = Self {
                version: buf.read_u32()?,
                italic_angle: buf.read_fixed()?,
                underline_position: buf.read_i16()?,
                underline_thickness: buf.read_i16()?,
                is_fixed_pitch: buf.read_u32()?,
                min_mem_type42: buf.read_u32()?,
                max_mem_type42: buf.read_u32()?,
                min_mem_type1: buf.read_u32()?,
                max_mem_type1: buf.read_u32()?,
                glyph_names: Vec::new(),
            };
            post.glyph_names = match post.version {
                POST_VERSION_1_0 => MAC_GLYPH_NAMES.iter().map(|n| n.to_string()).collect(),
                POST_VERSION_2_0 => read_v2_names(buf)?,
                POST_VERSION_2_5 => read_v2_5_names(buf)?,
                POST_VERSION_3_0 => Vec::new(),
                other => {
                    log::warn!("Unknown post table version {:#010x}, ignoring glyph names", other);
                    Vec::new()
                },
            };
            Ok(post)
        })
    }

    /// Name of a glyph, if the table carries names.
    pub fn name(&self, gid: u16) -> Option<&str> {
        self.glyph_names.get(gid as usize).map(String::as_str)
    }

    /// Whether the table carries glyph names at all.
    pub fn has_glyph_names(&self) -> bool {
        !self.glyph_names.is_empty()
    }

    /// Serialize the fixed header with the given version.
    pub fn write_header(&self, version: u32, out: &mut ByteBuffer) {
        out.write_u32(version);
        out.write_fixed(self.italic_angle);
        out.write_i16(self.underline_position);
        out.write_i16(self.underline_thickness);
        out.write_u32(self.is_fixed_pitch);
        out.write_u32(self.min_mem_type42);
        out.write_u32(self.max_mem_type42);
        out.write_u32(self.min_mem_type1);
        out.write_u32(self.max_mem_type1);
    }
}

fn read_v2_names(buf: &mut ByteBuffer) -> Result<Vec<String>> {
    let num_glyphs = buf.read_u16()?;
    let indices = (0..num_glyphs).map(|_| buf.read_u16()).collect::<Result<Vec<u16>>>()?;

    let mut custom = Vec::new();
    while let Some(len) = buf.read_byte() {
        let bytes = buf.read_slice(len as usize);
        custom.push(bytes.iter().map(|&b| b as char).collect::<String>());
    }

    Ok(indices
        .into_iter()
        .enumerate()
        .map(|(gid, index)| {
            let name = match index.checked_sub(NUM_MAC_GLYPH_NAMES) {
                None => mac_glyph_name(index).map(str::to_string),
                Some(custom_index) => custom.get(custom_index as usize).cloned(),
            };
            name.unwrap_or_else(|| {
                log::warn!("post name index {} for glyph {} is out of range", index, gid);
                ".notdef".to_string()
            })
        })
        .collect())
}

fn read_v2_5_names(buf: &mut ByteBuffer) -> Result<Vec<String>> {
    let num_glyphs = buf.read_u16()?;
    let mut names = Vec::with_capacity(num_glyphs as usize);
    for gid in 0..num_glyphs {
        let offset = buf.read_i8()?;
        let index = gid as i32 + offset as i32;
        let name = u16::try_from(index).ok().and_then(mac_glyph_name).unwrap_or(".notdef");
        names.push(name.to_string());
    }
    Ok(names)
}
