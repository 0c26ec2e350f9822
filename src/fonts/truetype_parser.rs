//! TrueType/OpenType font parser.
//!
//! Reads the sfnt table directory up front and decodes individual tables the
//! first time they are asked for. The font keeps the whole file as a
//! reference-counted [`Bytes`], so table slices and fonts inside a
//! collection share one allocation.
//!
//! # Layout
//!
//! ```text
//! sfntVersion(4) numTables(2) searchRange(2) entrySelector(2) rangeShift(2)
//! numTables x { tag(4) checksum(4) offset(4) length(4) }
//! table bodies, 4-byte aligned
//! ```
//!
//! Fonts with CFF outlines (`OTTO`) parse the same way, but have no `glyf`
//! table, so glyph outline requests fail with [`Error::MissingTable`].

use super::glyph_table::{GlyphData, GlyphTable};
use super::tables::{
    CmapSubtable, CmapTable, HeadTable, HheaTable, HmtxTable, LocaTable, MaxpTable, NameTable, Os2Table,
    PostTable, VorgTable,
};
use super::tables::name::NAME_ID_POSTSCRIPT;
use super::Tag;
use crate::byte_buffer::ByteBuffer;
use crate::error::{Error, Result};
use bytes::Bytes;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// sfnt version of fonts with TrueType outlines.
pub const SFNT_VERSION_TRUETYPE: u32 = 0x0001_0000;
/// Apple's legacy `true` signature.
pub const SFNT_VERSION_APPLE: u32 = 0x7472_7565;
/// `OTTO`: OpenType with CFF outlines.
pub const SFNT_VERSION_CFF: u32 = 0x4F54_544F;

/// Size of the offset table that precedes the directory.
pub const SFNT_HEADER_SIZE: usize = 12;
/// Size of one directory record.
pub const TABLE_RECORD_SIZE: usize = 16;

/// One table directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableRecord {
    /// Table tag
    pub tag: Tag,
    /// Checksum as stored in the directory
    pub checksum: u32,
    /// Offset from the start of the file
    pub offset: u32,
    /// Unpadded length
    pub length: u32,
}

/// A parsed sfnt font.
#[derive(Debug)]
pub struct TrueTypeFont {
    data: Bytes,
    sfnt_version: u32,
    tables: IndexMap<Tag, TableRecord>,
    head: OnceLock<HeadTable>,
    hhea: OnceLock<HheaTable>,
    maxp: OnceLock<MaxpTable>,
    loca: OnceLock<LocaTable>,
    hmtx: OnceLock<HmtxTable>,
    cmap: OnceLock<CmapTable>,
    post: OnceLock<PostTable>,
    os2: OnceLock<Os2Table>,
    name: OnceLock<NameTable>,
    vorg: OnceLock<VorgTable>,
    glyphs: OnceLock<GlyphTable>,
}

/// Parse into `cell` on first use. Failures are returned and not cached.
pub(crate) fn cached<T>(cell: &OnceLock<T>, parse: impl FnOnce() -> Result<T>) -> Result<&T> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = parse()?;
    Ok(cell.get_or_init(|| value))
}

impl TrueTypeFont {
    /// Parse a font file.
    pub fn parse(data: impl Into<Bytes>) -> Result<Self> {
        Self::parse_at(data, 0)
    }

    /// Parse the font whose offset table starts at `offset`.
    ///
    /// Table offsets stay relative to the start of `data`, which is how
    /// fonts inside a collection address their tables.
    pub fn parse_at(data: impl Into<Bytes>, offset: usize) -> Result<Self> {
        let data = data.into();
        if data.is_empty() {
            return Err(Error::Font("font data is empty".to_string()));
        }
        if offset >= data.len() {
            return Err(Error::Font(format!("font offset {} is past the end of the data", offset)));
        }
        let directory_limit = data
            .len()
            .min(offset + SFNT_HEADER_SIZE + u16::MAX as usize * TABLE_RECORD_SIZE);
        let mut buf = ByteBuffer::from(&data[offset..directory_limit]);

        let header = (|| -> Result<(u32, u16)> {
            let version = buf.read_u32()?;
            let num_tables = buf.read_u16()?;
            buf.skip(6); // searchRange, entrySelector, rangeShift
            Ok((version, num_tables))
        })();
        let (sfnt_version, num_tables) =
            header.map_err(|_| Error::Font("font header is truncated".to_string()))?;

        if !matches!(sfnt_version, SFNT_VERSION_TRUETYPE | SFNT_VERSION_APPLE | SFNT_VERSION_CFF) {
            return Err(Error::Font(format!("unknown sfnt version {:#010x}", sfnt_version)));
        }
        if num_tables == 0 {
            return Err(Error::Font("font has no tables".to_string()));
        }
        let directory_end = offset + SFNT_HEADER_SIZE + num_tables as usize * TABLE_RECORD_SIZE;
        if directory_end > data.len() {
            return Err(Error::Font(format!(
                "table directory of {} entries does not fit in {} bytes",
                num_tables,
                data.len()
            )));
        }

        let mut tables = IndexMap::with_capacity(num_tables as usize);
        for _ in 0..num_tables {
            let record = TableRecord {
                tag: Tag::new(buf.read_tag()?),
                checksum: buf.read_u32()?,
                offset: buf.read_u32()?,
                length: buf.read_u32()?,
            };
            if tables.insert(record.tag, record).is_some() {
                log::warn!("Duplicate {} table record, keeping the last one", record.tag);
            }
        }
        log::debug!(
            "Parsed sfnt directory at {}: version {:#010x}, {} tables",
            offset,
            sfnt_version,
            tables.len()
        );

        Ok(Self {
            data,
            sfnt_version,
            tables,
            head: OnceLock::new(),
            hhea: OnceLock::new(),
            maxp: OnceLock::new(),
            loca: OnceLock::new(),
            hmtx: OnceLock::new(),
            cmap: OnceLock::new(),
            post: OnceLock::new(),
            os2: OnceLock::new(),
            name: OnceLock::new(),
            vorg: OnceLock::new(),
            glyphs: OnceLock::new(),
        })
    }

    /// Read and parse a font file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(std::fs::read(path)?)
    }

    /// The whole file this font was parsed from.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Raw sfnt version.
    pub fn sfnt_version(&self) -> u32 {
        self.sfnt_version
    }

    /// Whether outlines are CFF rather than `glyf`.
    pub fn is_opentype_cff(&self) -> bool {
        self.sfnt_version == SFNT_VERSION_CFF
    }

    /// Directory records in file order.
    pub fn tables(&self) -> impl Iterator<Item = &TableRecord> {
        self.tables.values()
    }

    /// Directory record for a tag.
    pub fn table_record(&self, tag: Tag) -> Option<&TableRecord> {
        self.tables.get(&tag)
    }

    /// Whether the font has a table.
    pub fn has_table(&self, tag: Tag) -> bool {
        self.tables.contains_key(&tag)
    }

    /// Raw bytes of a table, sharing the font's buffer.
    ///
    /// # Errors
    ///
    /// [`Error::MissingTable`] when absent, [`Error::Font`] when the record
    /// points outside the file.
    pub fn table_bytes(&self, tag: Tag) -> Result<Bytes> {
        let record = self
            .tables
            .get(&tag)
            .ok_or_else(|| Error::MissingTable(tag.to_string()))?;
        let start = record.offset as usize;
        let end = start
            .checked_add(record.length as usize)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                Error::Font(format!(
                    "{} table ({} bytes at {}) lies outside the font data",
                    tag, record.length, record.offset
                ))
            })?;
        Ok(self.data.slice(start..end))
    }

    fn optional<'a, T>(
        &'a self,
        tag: Tag,
        cell: &'a OnceLock<T>,
        parse: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Result<Option<&'a T>> {
        if !self.has_table(tag) {
            return Ok(None);
        }
        cached(cell, || parse(&self.table_bytes(tag)?)).map(Some)
    }

    /// Font header.
    pub fn head(&self) -> Result<&HeadTable> {
        cached(&self.head, || HeadTable::parse(&self.table_bytes(Tag::HEAD)?))
    }

    /// Horizontal header.
    pub fn hhea(&self) -> Result<&HheaTable> {
        cached(&self.hhea, || HheaTable::parse(&self.table_bytes(Tag::HHEA)?))
    }

    /// Maximum profile.
    pub fn maxp(&self) -> Result<&MaxpTable> {
        cached(&self.maxp, || MaxpTable::parse(&self.table_bytes(Tag::MAXP)?))
    }

    /// Glyph locations.
    pub fn loca(&self) -> Result<&LocaTable> {
        cached(&self.loca, || {
            let long = self.head()?.long_loca();
            LocaTable::parse(&self.table_bytes(Tag::LOCA)?, self.number_of_glyphs()?, long)
        })
    }

    /// Horizontal metrics.
    pub fn hmtx(&self) -> Result<&HmtxTable> {
        cached(&self.hmtx, || {
            let number_of_h_metrics = self.hhea()?.number_of_h_metrics;
            HmtxTable::parse(&self.table_bytes(Tag::HMTX)?, number_of_h_metrics, self.number_of_glyphs()?)
        })
    }

    /// Character mapping, if present.
    pub fn cmap(&self) -> Result<Option<&CmapTable>> {
        self.optional(Tag::CMAP, &self.cmap, CmapTable::parse)
    }

    /// PostScript table, if present.
    pub fn post(&self) -> Result<Option<&PostTable>> {
        self.optional(Tag::POST, &self.post, PostTable::parse)
    }

    /// OS/2 metrics, if present.
    pub fn os2(&self) -> Result<Option<&Os2Table>> {
        self.optional(Tag::OS2, &self.os2, Os2Table::parse)
    }

    /// Naming table, if present.
    pub fn name(&self) -> Result<Option<&NameTable>> {
        self.optional(Tag::NAME, &self.name, NameTable::parse)
    }

    /// Vertical origins, if present.
    pub fn vorg(&self) -> Result<Option<&VorgTable>> {
        self.optional(Tag::VORG, &self.vorg, VorgTable::parse)
    }

    /// Outline access over `glyf`.
    pub fn glyph_table(&self) -> Result<&GlyphTable> {
        cached(&self.glyphs, || {
            if self.is_opentype_cff() || !self.has_table(Tag::GLYF) {
                return Err(Error::MissingTable(Tag::GLYF.to_string()));
            }
            Ok(GlyphTable::new(
                self.table_bytes(Tag::GLYF)?,
                self.loca()?.clone(),
                self.hmtx()?.clone(),
                self.maxp()?.max_component_depth,
            ))
        })
    }

    /// Decode one glyph; see [`GlyphTable::glyph`].
    pub fn glyph(&self, gid: u16) -> Result<Option<Arc<GlyphData>>> {
        self.glyph_table()?.glyph(gid)
    }

    /// Number of glyphs, from `maxp`.
    pub fn number_of_glyphs(&self) -> Result<u16> {
        Ok(self.maxp()?.num_glyphs)
    }

    /// Design units per em.
    pub fn units_per_em(&self) -> Result<u16> {
        Ok(self.head()?.units_per_em)
    }

    /// The preferred Unicode subtable.
    pub fn unicode_cmap(&self) -> Result<Option<&CmapSubtable>> {
        Ok(self.cmap()?.and_then(CmapTable::unicode))
    }

    /// Glyph for a Unicode code point.
    pub fn glyph_id(&self, codepoint: u32) -> Result<Option<u16>> {
        Ok(self.unicode_cmap()?.and_then(|cmap| cmap.glyph_id(codepoint)))
    }

    /// Advance width in font units.
    pub fn advance_width(&self, gid: u16) -> Result<u16> {
        Ok(self.hmtx()?.advance_width(gid))
    }

    /// Advance width in 1/1000 em, as PDF width arrays use.
    pub fn glyph_width(&self, gid: u16) -> Result<u16> {
        let units_per_em = self.units_per_em()?.max(1) as u32;
        Ok((self.advance_width(gid)? as u32 * 1000 / units_per_em) as u16)
    }

    /// Left side bearing in font units.
    pub fn left_side_bearing(&self, gid: u16) -> Result<i16> {
        Ok(self.hmtx()?.left_side_bearing(gid))
    }

    /// PostScript glyph name from `post`.
    pub fn glyph_name(&self, gid: u16) -> Result<Option<&str>> {
        Ok(self.post()?.and_then(|post| post.name(gid)))
    }

    /// PostScript name (name id 6).
    pub fn postscript_name(&self) -> Result<Option<&str>> {
        Ok(self.name()?.and_then(|name| name.name(NAME_ID_POSTSCRIPT)))
    }

    /// Typographic ascent from `hhea`.
    pub fn ascender(&self) -> Result<i16> {
        Ok(self.hhea()?.ascender)
    }

    /// Typographic descent from `hhea`, usually negative.
    pub fn descender(&self) -> Result<i16> {
        Ok(self.hhea()?.descender)
    }

    /// Font bounding box from `head`.
    pub fn bbox(&self) -> Result<(i16, i16, i16, i16)> {
        let head = self.head()?;
        Ok((head.x_min, head.y_min, head.x_max, head.y_max))
    }

    /// Bold bit of `head.macStyle`.
    pub fn is_bold(&self) -> Result<bool> {
        Ok(self.head()?.mac_style & 0x0001 != 0)
    }

    /// Italic bit of `head.macStyle`.
    pub fn is_italic(&self) -> Result<bool> {
        Ok(self.head()?.mac_style & 0x0002 != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sfnt(version: u32, tables: &[(Tag, &[u8])]) -> Vec<u8> {
        let mut buf = ByteBuffer::new();
        buf.write_u32(version);
        buf.write_u16(tables.len() as u16);
        buf.write_bytes(&[0; 6]);
        let mut offset = SFNT_HEADER_SIZE + TABLE_RECORD_SIZE * tables.len();
        for (tag, body) in tables {
            buf.write_bytes(tag.as_bytes());
            buf.write_u32(0);
            buf.write_u32(offset as u32);
            buf.write_u32(body.len() as u32);
            offset += body.len();
        }
        for (_, body) in tables {
            buf.write_bytes(body);
        }
        buf.into_vec()
    }

    #[test]
    fn test_directory_in_file_order() {
        let data = sfnt(SFNT_VERSION_TRUETYPE, &[(Tag::MAXP, &[0, 0, 0x50, 0, 0, 3]), (Tag::CMAP, &[0, 0, 0, 0])]);
        let font = TrueTypeFont::parse(data).unwrap();
        let tags: Vec<Tag> = font.tables().map(|r| r.tag).collect();
        assert_eq!(tags, vec![Tag::MAXP, Tag::CMAP]);
        assert_eq!(font.number_of_glyphs().unwrap(), 3);
        assert_eq!(font.table_bytes(Tag::CMAP).unwrap().as_ref(), &[0, 0, 0, 0]);
        assert!(font.cmap().unwrap().unwrap().subtables().is_empty());
    }

    #[test]
    fn test_missing_and_optional_tables() {
        let font = TrueTypeFont::parse(sfnt(SFNT_VERSION_TRUETYPE, &[(Tag::CMAP, &[0, 0, 0, 0])])).unwrap();
        assert!(matches!(font.head(), Err(Error::MissingTable(t)) if t == "head"));
        assert!(font.post().unwrap().is_none());
        assert!(font.vorg().unwrap().is_none());
    }

    #[test]
    fn test_cff_font_has_no_glyph_table() {
        let font = TrueTypeFont::parse(sfnt(SFNT_VERSION_CFF, &[(Tag::CFF, &[1, 0, 4, 1])])).unwrap();
        assert!(font.is_opentype_cff());
        assert!(matches!(font.glyph_table(), Err(Error::MissingTable(t)) if t == "glyf"));
    }

    #[test]
    fn test_header_validation() {
        assert!(matches!(TrueTypeFont::parse(Vec::new()), Err(Error::Font(_))));
        assert!(matches!(TrueTypeFont::parse(vec![0, 1, 0]), Err(Error::Font(_))));
        assert!(matches!(
            TrueTypeFont::parse(sfnt(0xDEAD_BEEF, &[(Tag::CMAP, &[0; 4])])),
            Err(Error::Font(_))
        ));
        assert!(matches!(TrueTypeFont::parse(sfnt(SFNT_VERSION_TRUETYPE, &[])), Err(Error::Font(_))));

        let mut short = sfnt(SFNT_VERSION_TRUETYPE, &[(Tag::CMAP, &[])]);
        short.truncate(20);
        assert!(matches!(TrueTypeFont::parse(short), Err(Error::Font(_))));
    }

    #[test]
    fn test_table_outside_data() {
        let mut data = sfnt(SFNT_VERSION_TRUETYPE, &[(Tag::POST, &[0; 4])]);
        // stretch the recorded length past the end
        data[24..28].copy_from_slice(&100u32.to_be_bytes());
        let font = TrueTypeFont::parse(data).unwrap();
        assert!(matches!(font.table_bytes(Tag::POST), Err(Error::Font(_))));
        assert!(font.post().is_err());
    }
}
