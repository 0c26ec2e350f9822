//! `cmap`: character to glyph mapping.
//!
//! Subtable formats 0, 4, 6 and 12 are decoded into ordered maps from
//! character code to glyph id. Other formats are kept as empty subtables so
//! the platform/encoding records stay visible.

use super::read_table;
use crate::byte_buffer::ByteBuffer;
use crate::error::Result;
use crate::fonts::Tag;
use std::collections::BTreeMap;

/// Highest Unicode scalar value.
const MAX_CODE_POINT: u32 = 0x10FFFF;

/// Unicode subtables in order of preference: (platform, encoding).
const UNICODE_PREFERENCE: [(u16, u16); 5] = [(0, 4), (3, 10), (0, 3), (3, 1), (3, 0)];

/// One decoded encoding subtable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmapSubtable {
    /// Platform id (0 Unicode, 1 Macintosh, 3 Windows)
    pub platform_id: u16,
    /// Platform-specific encoding id
    pub encoding_id: u16,
    /// Subtable format number
    pub format: u16,
    mapping: BTreeMap<u32, u16>,
}

impl CmapSubtable {
    /// Glyph for a character code.
    pub fn glyph_id(&self, code: u32) -> Option<u16> {
        self.mapping.get(&code).copied()
    }

    /// Every (code, glyph) pair, ordered by code.
    pub fn mapping(&self) -> &BTreeMap<u32, u16> {
        &self.mapping
    }

    /// Whether this subtable holds Unicode code points.
    pub fn is_unicode(&self) -> bool {
        self.platform_id == 0 || (self.platform_id == 3 && matches!(self.encoding_id, 0 | 1 | 10))
    }
}

/// Character to glyph index mapping table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmapTable {
    /// Table version, always 0
    pub version: u16,
    subtables: Vec<CmapSubtable>,
}

impl CmapTable {
    /// Parse the table and every subtable it lists.
    pub fn parse(data: &[u8]) -> Result<Self> {
        read_table(Tag::CMAP, data, |buf| {
            let version = buf.read_u16()?;
            let num_tables = buf.read_u16()?;
            let mut records = Vec::with_capacity(num_tables as usize);
            for _ in 0..num_tables {
                records.push((buf.read_u16()?, buf.read_u16()?, buf.read_u32()?));
            }

            let mut subtables = Vec::with_capacity(records.len());
            for (platform_id, encoding_id, offset) in records {
                if offset as usize >= buf.len() {
                    log::warn!(
                        "cmap subtable ({}, {}) offset {} is outside the table",
                        platform_id,
                        encoding_id,
                        offset
                    );
                    continue;
                }
                buf.seek(offset as i64);
                let format = buf.read_u16()?;
                let mapping = match format {
                    0 => read_format0(buf)?,
                    4 => read_format4(buf, offset as usize)?,
                    6 => read_format6(buf)?,
                    12 => read_format12(buf)?,
                    _ => {
                        log::warn!(
                            "Unsupported cmap subtable format {} for ({}, {})",
                            format,
                            platform_id,
                            encoding_id
                        );
                        BTreeMap::new()
                    },
                };
                subtables.push(CmapSubtable {
                    platform_id,
                    encoding_id,
                    format,
                    mapping,
                });
            }

            Ok(Self { version, subtables })
        })
    }

    /// All decoded subtables, in record order.
    pub fn subtables(&self) -> &[CmapSubtable] {
        &self.subtables
    }

    /// The subtable for a platform/encoding pair.
    pub fn subtable(&self, platform_id: u16, encoding_id: u16) -> Option<&CmapSubtable> {
        self.subtables
            .iter()
            .find(|s| s.platform_id == platform_id && s.encoding_id == encoding_id)
    }

    /// The best Unicode subtable, falling back to the first one.
    pub fn unicode(&self) -> Option<&CmapSubtable> {
        UNICODE_PREFERENCE
            .iter()
            .find_map(|&(platform, encoding)| self.subtable(platform, encoding))
            .or_else(|| self.subtables.first())
    }
}

fn read_format0(buf: &mut ByteBuffer) -> Result<BTreeMap<u32, u16>> {
    buf.skip(4); // length, language
    let mut mapping = BTreeMap::new();
    for code in 0..256u32 {
        let gid = buf.read_u8()?;
        if gid != 0 {
            mapping.insert(code, gid as u16);
        }
    }
    Ok(mapping)
}

fn read_format4(buf: &mut ByteBuffer, start: usize) -> Result<BTreeMap<u32, u16>> {
    buf.skip(4); // length, language
    let seg_count = (buf.read_u16()? / 2) as usize;
    buf.skip(6); // searchRange, entrySelector, rangeShift

    let read_array = |buf: &mut ByteBuffer| -> Result<Vec<u16>> {
        (0..seg_count).map(|_| buf.read_u16()).collect()
    };
    let end_codes = read_array(buf)?;
    buf.skip(2); // reservedPad
    let start_codes = read_array(buf)?;
    let id_deltas = read_array(buf)?;
    let range_offsets_at = buf.position();
    let id_range_offsets = read_array(buf)?;

    let mut mapping = BTreeMap::new();
    for seg in 0..seg_count {
        let (first, last) = (start_codes[seg] as u32, end_codes[seg] as u32);
        if first > last {
            log::warn!("cmap format 4 segment {} runs backwards at {}", seg, start);
            continue;
        }
        let delta = id_deltas[seg];
        let range_offset = id_range_offsets[seg] as usize;
        for code in first..=last {
            let gid = if range_offset == 0 {
                (code as u16).wrapping_add(delta)
            } else {
                let at = range_offsets_at + seg * 2 + range_offset + 2 * (code - first) as usize;
                buf.seek(at as i64);
                match buf.read_u16()? {
                    0 => 0,
                    raw => raw.wrapping_add(delta),
                }
            };
            if gid != 0 {
                mapping.insert(code, gid);
            }
        }
    }
    Ok(mapping)
}

fn read_format6(buf: &mut ByteBuffer) -> Result<BTreeMap<u32, u16>> {
    buf.skip(4); // length, language
    let first_code = buf.read_u16()? as u32;
    let entry_count = buf.read_u16()? as u32;
    let mut mapping = BTreeMap::new();
    for code in first_code..first_code + entry_count {
        let gid = buf.read_u16()?;
        if gid != 0 {
            mapping.insert(code, gid);
        }
    }
    Ok(mapping)
}

fn read_format12(buf: &mut ByteBuffer) -> Result<BTreeMap<u32, u16>> {
    buf.skip(10); // reserved, length, language
    let num_groups = buf.read_u32()?;
    let mut mapping = BTreeMap::new();
    for _ in 0..num_groups {
        let first = buf.read_u32()?;
        let last = buf.read_u32()?.min(MAX_CODE_POINT);
        let start_glyph = buf.read_u32()?;
        if first > last {
            continue;
        }
        for code in first..=last {
            let gid = start_glyph + (code - first);
            if gid > u16::MAX as u32 {
                break;
            }
            if gid != 0 {
                mapping.insert(code, gid as u16);
            }
        }
    }
    Ok(mapping)
}
