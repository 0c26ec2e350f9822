//! `maxp`: maximum profile.

use super::read_table;
use crate::byte_buffer::ByteBuffer;
use crate::error::Result;
use crate::fonts::Tag;

/// Version 0.5, used by CFF-flavoured fonts.
pub const MAXP_VERSION_0_5: u32 = 0x0000_5000;
/// Version 1.0, used by TrueType-flavoured fonts.
pub const MAXP_VERSION_1_0: u32 = 0x0001_0000;

/// Maximum profile table.
///
/// The fields after `num_glyphs` exist only in version 1.0 and read as zero
/// otherwise.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaxpTable {
    /// Raw 16.16 version
    pub version: u32,
    /// Number of glyphs in the font
    pub num_glyphs: u16,
    pub max_points: u16,
    pub max_contours: u16,
    pub max_composite_points: u16,
    pub max_composite_contours: u16,
    pub max_zones: u16,
    pub max_twilight_points: u16,
    pub max_storage: u16,
    pub max_function_defs: u16,
    pub max_instruction_defs: u16,
    pub max_stack_elements: u16,
    pub max_size_of_instructions: u16,
    pub max_component_elements: u16,
    /// Deepest composite nesting; 1 when components are simple glyphs
    pub max_component_depth: u16,
}

impl MaxpTable {
    /// Parse the table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        read_table(Tag::MAXP, data, |buf| {
            let mut maxp = Self {
                version: buf.read_u32()?,
                num_glyphs: buf.read_u16()?,
                ..Self::default()
            };
            if maxp.has_v1_fields() {
                maxp.max_points = buf.read_u16()?;
                maxp.max_contours = buf.read_u16()?;
                maxp.max_composite_points = buf.read_u16()?;
                maxp.max_composite_contours = buf.read_u16()?;
                maxp.max_zones = buf.read_u16()?;
                maxp.max_twilight_points = buf.read_u16()?;
                maxp.max_storage = buf.read_u16()?;
                maxp.max_function_defs = buf.read_u16()?;
                maxp.max_instruction_defs = buf.read_u16()?;
                maxp.max_stack_elements = buf.read_u16()?;
                maxp.max_size_of_instructions = buf.read_u16()?;
                maxp.max_component_elements = buf.read_u16()?;
                maxp.max_component_depth = buf.read_u16()?;
            }
            Ok(maxp)
        })
    }

    /// Whether the version 1.0 fields are present.
    pub fn has_v1_fields(&self) -> bool {
        self.version >= MAXP_VERSION_1_0
    }

    /// Serialize the table.
    pub fn write(&self, out: &mut ByteBuffer) {
        out.write_u32(self.version);
        out.write_u16(self.num_glyphs);
        if self.has_v1_fields() {
            for value in [
                self.max_points,
                self.max_contours,
                self.max_composite_points,
                self.max_composite_contours,
                self.max_zones,
                self.max_twilight_points,
                self.max_storage,
                self.max_function_defs,
                self.max_instruction_defs,
                self.max_stack_elements,
                self.max_size_of_instructions,
                self.max_component_elements,
                self.max_component_depth,
            ] {
                out.write_u16(value);
            }
        }
    }
}
