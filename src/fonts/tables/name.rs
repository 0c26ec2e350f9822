//! `name`: naming table.

use super::read_table;
use crate::byte_buffer::ByteBuffer;
use crate::error::Result;
use crate::fonts::Tag;

/// Name id of the PostScript name.
pub const NAME_ID_POSTSCRIPT: u16 = 6;

/// Windows platform, Unicode BMP encoding, US English.
pub const WINDOWS_ENGLISH: (u16, u16, u16) = (3, 1, 0x0409);

/// One decoded name record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    /// Platform id
    pub platform_id: u16,
    /// Platform-specific encoding id
    pub encoding_id: u16,
    /// Language id
    pub language_id: u16,
    /// Name id (1 family, 4 full name, 6 PostScript name, ...)
    pub name_id: u16,
    /// Decoded string
    pub value: String,
}

impl NameRecord {
    /// Whether the string is stored as UTF-16BE.
    pub fn is_utf16(&self) -> bool {
        is_utf16(self.platform_id, self.encoding_id)
    }

    fn encode(&self) -> Vec<u8> {
        if self.is_utf16() {
            self.value.encode_utf16().flat_map(u16::to_be_bytes).collect()
        } else {
            self.value
                .chars()
                .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
                .collect()
        }
    }
}

fn is_utf16(platform_id: u16, encoding_id: u16) -> bool {
    matches!(platform_id, 0 | 3) || (platform_id == 2 && encoding_id == 1)
}

/// Naming table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    records: Vec<NameRecord>,
}

impl NameTable {
    /// Parse the table. Records whose string lies outside the table are
    /// skipped.
    pub fn parse(data: &[u8]) -> Result<Self> {
        read_table(Tag::NAME, data, |buf| {
            let _format = buf.read_u16()?;
            let count = buf.read_u16()?;
            let string_offset = buf.read_u16()? as usize;

            let mut records = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let platform_id = buf.read_u16()?;
                let encoding_id = buf.read_u16()?;
                let language_id = buf.read_u16()?;
                let name_id = buf.read_u16()?;
                let length = buf.read_u16()? as usize;
                let offset = buf.read_u16()? as usize;

                let start = string_offset + offset;
                if start + length > buf.len() {
                    log::warn!("name record {} string lies outside the table", name_id);
                    continue;
                }
                let raw = buf.slice(start, length);
                let value = if is_utf16(platform_id, encoding_id) {
                    let units: Vec<u16> = raw.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
                    String::from_utf16_lossy(&units)
                } else {
                    raw.iter().map(|&b| b as char).collect()
                };
                records.push(NameRecord {
                    platform_id,
                    encoding_id,
                    language_id,
                    name_id,
                    value,
                });
            }
            Ok(Self { records })
        })
    }

    /// Build a table from records.
    pub fn from_records(records: Vec<NameRecord>) -> Self {
        Self { records }
    }

    /// All records, in table order.
    pub fn records(&self) -> &[NameRecord] {
        &self.records
    }

    /// The best string for a name id: Windows English first, then any
    /// Windows record, then Macintosh, then anything.
    pub fn name(&self, name_id: u16) -> Option<&str> {
        let candidates = || self.records.iter().filter(move |r| r.name_id == name_id);
        let (platform, encoding, language) = WINDOWS_ENGLISH;
        candidates()
            .find(|r| r.platform_id == platform && r.encoding_id == encoding && r.language_id == language)
            .or_else(|| candidates().find(|r| r.platform_id == 3))
            .or_else(|| candidates().find(|r| r.platform_id == 1))
            .or_else(|| candidates().next())
            .map(|r| r.value.as_str())
    }

    /// Serialize as a format 0 table.
    pub fn write(&self, out: &mut ByteBuffer) {
        let encoded: Vec<Vec<u8>> = self.records.iter().map(NameRecord::encode).collect();
        let count = self.records.len() as u16;
        out.write_u16(0);
        out.write_u16(count);
        out.write_u16(6 + 12 * count);

        let mut offset = 0u16;
        for (record, bytes) in self.records.iter().zip(&encoded) {
            out.write_u16(record.platform_id);
            out.write_u16(record.encoding_id);
            out.write_u16(record.language_id);
            out.write_u16(record.name_id);
            out.write_u16(bytes.len() as u16);
            out.write_u16(offset);
            offset = offset.wrapping_add(bytes.len() as u16);
        }
        for bytes in &encoded {
            out.write_bytes(bytes);
        }
    }
}
