//! TrueType font subsetting for PDF embedding.
//!
//! Builds a standalone sfnt that holds only the glyphs a document uses.
//! Per ISO 32000-1 section 9.9, subset fonts are named with a tag prefix
//! (e.g., "ABCDEF+FontName").
//!
//! # Subsetting Strategy
//!
//! 1. Collect code points ([`TtfSubsetter::add`]) and raw glyph ids
//!    ([`TtfSubsetter::add_glyph_ids`]). GID 0 (`.notdef`) is always kept.
//! 2. Close the glyph set over composite references, repeating until a pass
//!    adds nothing, since components may themselves be composites.
//! 3. Renumber: the Nth smallest retained GID becomes GID N.
//! 4. Rebuild `head`, `hhea`, `maxp`, `loca`, `glyf`, `hmtx`, `cmap`,
//!    `post`, `name` and `OS/2` for the new numbering; copy other tables.
//! 5. Write the directory in tag order and patch `head.checkSumAdjustment`.
//!
//! Closing the set is a one-way step. After [`TtfSubsetter::gid_map`] or a
//! write, adding glyphs fails with [`Error::SubsetFinalized`].

use super::composite::ComponentFlags;
use super::glyph_names::mac_glyph_index;
use super::tables::name::WINDOWS_ENGLISH;
use super::tables::post::{NUM_MAC_GLYPH_NAMES, POST_VERSION_2_0, POST_VERSION_3_0};
use super::tables::{HeadTable, LocaTable, NameRecord, NameTable};
use super::truetype_parser::{SFNT_HEADER_SIZE, SFNT_VERSION_TRUETYPE, TABLE_RECORD_SIZE};
use super::{Tag, TrueTypeFont};
use crate::byte_buffer::ByteBuffer;
use crate::config::SubsetOptions;
use crate::error::{Error, Result};
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;

/// Target of the whole-file checksum.
pub const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

/// Offset of the first component record in a composite glyph.
const COMPONENTS_OFFSET: usize = 10;

/// Whether the glyph set may still grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsetPhase {
    /// Glyphs and code points may be added
    Collecting,
    /// Composite closure has run; the set is final
    Closed,
}

/// Font subsetter over a parsed TrueType font.
#[derive(Debug)]
pub struct TtfSubsetter<'a> {
    font: &'a TrueTypeFont,
    options: SubsetOptions,
    /// Code point to original GID, ordered by code point
    uni_to_gid: BTreeMap<u32, u16>,
    /// Original GIDs to keep
    glyph_ids: BTreeSet<u16>,
    /// Original to new GID, filled when the set closes
    old_to_new: HashMap<u16, u16>,
    phase: SubsetPhase,
}

impl<'a> TtfSubsetter<'a> {
    /// Create a subsetter holding only `.notdef`.
    pub fn new(font: &'a TrueTypeFont) -> Self {
        Self {
            font,
            options: SubsetOptions::default(),
            uni_to_gid: BTreeMap::new(),
            glyph_ids: BTreeSet::from([0]),
            old_to_new: HashMap::new(),
            phase: SubsetPhase::Collecting,
        }
    }

    /// Replace the subsetting options.
    pub fn with_options(mut self, options: SubsetOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the prefix prepended to the PostScript name.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.options.prefix = Some(prefix.into());
    }

    /// Current phase.
    pub fn phase(&self) -> SubsetPhase {
        self.phase
    }

    fn ensure_collecting(&self) -> Result<()> {
        match self.phase {
            SubsetPhase::Collecting => Ok(()),
            SubsetPhase::Closed => Err(Error::SubsetFinalized),
        }
    }

    /// Keep `gid` if the font has it.
    fn retain(&mut self, gid: u16) -> Result<bool> {
        let num_glyphs = self.font.number_of_glyphs()?;
        if gid >= num_glyphs {
            log::warn!("Ignoring glyph {} beyond the font's {} glyphs", gid, num_glyphs);
            return Ok(false);
        }
        self.glyph_ids.insert(gid);
        Ok(true)
    }

    /// Add a code point. Code points the font does not map are skipped.
    pub fn add(&mut self, codepoint: u32) -> Result<()> {
        self.ensure_collecting()?;
        match self.font.glyph_id(codepoint)? {
            Some(gid) if gid != 0 => {
                if self.retain(gid)? {
                    self.uni_to_gid.insert(codepoint, gid);
                }
            },
            _ => log::debug!("No glyph for U+{:04X}, skipping", codepoint),
        }
        Ok(())
    }

    /// Add several code points.
    pub fn add_all(&mut self, codepoints: impl IntoIterator<Item = u32>) -> Result<()> {
        codepoints.into_iter().try_for_each(|c| self.add(c))
    }

    /// Add every character of a string.
    pub fn add_str(&mut self, text: &str) -> Result<()> {
        self.add_all(text.chars().map(u32::from))
    }

    /// Add raw glyph ids, e.g. ones referenced directly by a content stream.
    pub fn add_glyph_ids(&mut self, gids: impl IntoIterator<Item = u16>) -> Result<()> {
        self.ensure_collecting()?;
        for gid in gids {
            self.retain(gid)?;
        }
        Ok(())
    }

    /// Retained original GIDs.
    pub fn glyph_ids(&self) -> &BTreeSet<u16> {
        &self.glyph_ids
    }

    /// Code point to original GID mapping.
    pub fn uni_to_gid(&self) -> &BTreeMap<u32, u16> {
        &self.uni_to_gid
    }

    /// Close the glyph set over composite references.
    ///
    /// Runs once; later calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.phase == SubsetPhase::Closed {
            return Ok(());
        }
        self.add_compound_references()?;
        self.old_to_new = self
            .glyph_ids
            .iter()
            .enumerate()
            .map(|(new, &old)| (old, new as u16))
            .collect();
        self.phase = SubsetPhase::Closed;
        Ok(())
    }

    fn add_compound_references(&mut self) -> Result<()> {
        let glyphs = self.font.glyph_table()?;
        let num_glyphs = self.font.number_of_glyphs()?;
        loop {
            let mut to_add = BTreeSet::new();
            for &gid in &self.glyph_ids {
                let Some(raw) = glyphs.raw_glyph(gid) else {
                    continue;
                };
                for (_, component) in scan_components(gid, raw)?.references {
                    if component >= num_glyphs {
                        log::warn!("Glyph {} references missing component {}", gid, component);
                    } else if !self.glyph_ids.contains(&component) {
                        to_add.insert(component);
                    }
                }
            }
            if to_add.is_empty() {
                return Ok(());
            }
            log::debug!("Adding {} composite components to subset", to_add.len());
            self.glyph_ids.extend(to_add);
        }
    }

    /// New to old GID mapping. Closes the glyph set.
    pub fn gid_map(&mut self) -> Result<BTreeMap<u16, u16>> {
        self.close()?;
        Ok(self
            .glyph_ids
            .iter()
            .enumerate()
            .map(|(new, &old)| (new as u16, old))
            .collect())
    }

    /// New GID of a retained original GID: the number of retained GIDs
    /// below it. `None` until the set is closed, or if `old_gid` was not
    /// retained.
    pub fn new_glyph_id(&self, old_gid: u16) -> Option<u16> {
        self.old_to_new.get(&old_gid).copied()
    }

    /// Write the subset font. Closes the glyph set.
    pub fn write_to<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        out.write_all(&bytes)?;
        Ok(())
    }

    /// Build the subset font. Closes the glyph set.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        if self.glyph_ids.len() == 1 && self.uni_to_gid.is_empty() {
            log::info!("Font subset is empty");
        }
        self.close()?;

        let (glyf, loca) = self.build_glyf()?;
        let mut tables: BTreeMap<Tag, Vec<u8>> = BTreeMap::new();
        tables.insert(Tag::HEAD, self.build_head()?);
        tables.insert(Tag::HHEA, self.build_hhea()?);
        tables.insert(Tag::MAXP, self.build_maxp()?);
        tables.insert(Tag::GLYF, glyf);
        tables.insert(Tag::LOCA, loca);
        tables.insert(Tag::HMTX, self.build_hmtx()?);
        let optional = [
            (Tag::CMAP, self.build_cmap()?),
            (Tag::POST, self.build_post()?),
            (Tag::NAME, self.build_name()?),
            (Tag::OS2, self.build_os2()?),
        ];
        for (tag, table) in optional {
            if let Some(table) = table {
                tables.insert(tag, table);
            }
        }

        // cmap is never copied: its glyph ids would point at the old numbering
        for record in self.font.tables() {
            let tag = record.tag;
            if tables.contains_key(&tag) || tag == Tag::CMAP || !self.options.keeps(tag) {
                continue;
            }
            tables.insert(tag, self.font.table_bytes(tag)?.to_vec());
        }

        log::debug!(
            "Writing subset of {} glyphs with {} tables",
            self.glyph_ids.len(),
            tables.len()
        );
        write_sfnt(&tables)
    }

    fn build_head(&self) -> Result<Vec<u8>> {
        let mut head = self.font.head()?.clone();
        head.checksum_adjustment = 0;
        head.index_to_loc_format = 1;
        let mut out = ByteBuffer::with_capacity(HeadTable::SIZE);
        head.write(&mut out);
        Ok(out.into_vec())
    }

    /// Whether the subset extends past the last full metric without keeping
    /// that glyph, so its advance must be carried into the subset.
    fn needs_last_metric_width(&self, number_of_h_metrics: u16) -> bool {
        let Some(last_metric) = number_of_h_metrics.checked_sub(1) else {
            return false;
        };
        self.glyph_ids.last().is_some_and(|&last| last > last_metric) && !self.glyph_ids.contains(&last_metric)
    }

    fn build_hhea(&self) -> Result<Vec<u8>> {
        let mut hhea = self.font.hhea()?.clone();
        let original = hhea.number_of_h_metrics;
        let mut metrics = self.glyph_ids.range(..original).count() as u16;
        if self.needs_last_metric_width(original) {
            metrics += 1;
        }
        hhea.number_of_h_metrics = metrics;
        let mut out = ByteBuffer::new();
        hhea.write(&mut out);
        Ok(out.into_vec())
    }

    fn build_maxp(&self) -> Result<Vec<u8>> {
        let mut maxp = self.font.maxp()?.clone();
        maxp.num_glyphs = self.glyph_ids.len() as u16;
        let mut out = ByteBuffer::new();
        maxp.write(&mut out);
        Ok(out.into_vec())
    }

    /// Build `glyf` and its long-format `loca`.
    fn build_glyf(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let glyphs = self.font.glyph_table()?;
        let mut glyf = ByteBuffer::new();
        let mut offsets = Vec::with_capacity(self.glyph_ids.len() + 1);

        for &gid in &self.glyph_ids {
            offsets.push(glyf.len() as u32);
            let Some(raw) = glyphs.raw_glyph(gid) else {
                log::warn!("Glyph {} has no data, writing it empty", gid);
                continue;
            };

            let scan = scan_components(gid, raw)?;
            if scan.is_composite {
                // drop anything after the instructions
                let mut bytes = raw[..scan.end].to_vec();
                for (at, component) in scan.references {
                    // components beyond the font fall back to .notdef
                    let new_gid = self.new_glyph_id(component).unwrap_or(0);
                    bytes[at..at + 2].copy_from_slice(&new_gid.to_be_bytes());
                }
                glyf.write_bytes(&bytes);
            } else {
                glyf.write_bytes(raw);
            }

            let padding = (4 - glyf.len() % 4) % 4;
            glyf.write_bytes(&[0; 3][..padding]);
        }
        offsets.push(glyf.len() as u32);

        let mut loca = ByteBuffer::with_capacity(offsets.len() * 4);
        LocaTable::from_offsets(offsets).write_long(&mut loca);
        Ok((glyf.into_vec(), loca.into_vec()))
    }

    fn build_hmtx(&self) -> Result<Vec<u8>> {
        let hmtx = self.font.hmtx()?;
        let number_of_h_metrics = self.font.hhea()?.number_of_h_metrics;
        let mut needs_last_width = self.needs_last_metric_width(number_of_h_metrics);

        let mut out = ByteBuffer::new();
        for &gid in &self.glyph_ids {
            if gid < number_of_h_metrics {
                out.write_u16(hmtx.advance_width(gid));
            } else if needs_last_width {
                // the last full metric's advance applies to every later glyph
                needs_last_width = false;
                out.write_u16(hmtx.advance_width(number_of_h_metrics - 1));
            }
            out.write_i16(hmtx.left_side_bearing(gid));
        }
        Ok(out.into_vec())
    }

    /// A single Windows Unicode BMP format 4 subtable.
    fn build_cmap(&self) -> Result<Option<Vec<u8>>> {
        if self.uni_to_gid.is_empty() || !self.options.keeps(Tag::CMAP) {
            return Ok(None);
        }
        if let Some(&codepoint) = self.uni_to_gid.keys().find(|&&c| c > 0xFFFF) {
            return Err(Error::UnsupportedCodepoint(codepoint));
        }

        let mut segments: Vec<(u32, u32, i32)> = Vec::new();
        let mut entries = self
            .uni_to_gid
            .iter()
            .map(|(&code, &gid)| (code, self.new_glyph_id(gid).unwrap_or(0) as i32));
        let Some((first_code, first_gid)) = entries.next() else {
            return Ok(None);
        };
        let (mut start_code, mut start_gid) = (first_code, first_gid);
        let mut prev_code = first_code;

        for (code, gid) in entries {
            if code != prev_code + 1 || gid - start_gid != (code - start_code) as i32 {
                let delta = start_gid - start_code as i32;
                if start_gid != 0 {
                    segments.push((start_code, prev_code, delta));
                } else if start_code != prev_code {
                    // a run starting at GID 0 would map its first code to .notdef twice
                    segments.push((start_code + 1, prev_code, delta));
                }
                start_code = code;
                start_gid = gid;
            }
            prev_code = code;
        }
        segments.push((start_code, prev_code, start_gid - start_code as i32));
        segments.push((0xFFFF, 0xFFFF, 1));

        let length = format4_length(segments.len())?;
        let seg_count = segments.len() as u16;
        let search_range = 2 * highest_power_of_two(seg_count);
        let mut out = ByteBuffer::new();
        out.write_u16(0); // version
        out.write_u16(1); // numTables
        let (platform, encoding, _) = WINDOWS_ENGLISH;
        out.write_u16(platform);
        out.write_u16(encoding);
        out.write_u32(12);

        out.write_u16(4); // format
        out.write_u16(length);
        out.write_u16(0); // language
        out.write_u16(2 * seg_count);
        out.write_u16(search_range);
        out.write_u16((search_range / 2).trailing_zeros() as u16);
        out.write_u16(2 * seg_count - search_range);
        for &(_, end, _) in &segments {
            out.write_u16(end as u16);
        }
        out.write_u16(0); // reservedPad
        for &(start, _, _) in &segments {
            out.write_u16(start as u16);
        }
        for &(_, _, delta) in &segments {
            out.write_u16(delta as u16);
        }
        for _ in &segments {
            out.write_u16(0); // idRangeOffset
        }
        Ok(Some(out.into_vec()))
    }

    fn build_post(&self) -> Result<Option<Vec<u8>>> {
        let Some(post) = self.font.post()? else {
            return Ok(None);
        };
        if !self.options.keeps(Tag::POST) {
            return Ok(None);
        }

        let mut out = ByteBuffer::new();
        if !post.has_glyph_names() {
            post.write_header(POST_VERSION_3_0, &mut out);
            return Ok(Some(out.into_vec()));
        }

        post.write_header(POST_VERSION_2_0, &mut out);
        out.write_u16(self.glyph_ids.len() as u16);
        let mut custom_names = IndexSet::new();
        for &gid in &self.glyph_ids {
            let name = post.name(gid).unwrap_or(".notdef");
            let index = match mac_glyph_index(name) {
                Some(index) => index,
                None => NUM_MAC_GLYPH_NAMES + custom_names.insert_full(name).0 as u16,
            };
            out.write_u16(index);
        }
        for name in custom_names {
            let bytes: Vec<u8> = name
                .chars()
                .take(u8::MAX as usize)
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect();
            out.write_u8(bytes.len() as u8);
            out.write_bytes(&bytes);
        }
        Ok(Some(out.into_vec()))
    }

    fn build_name(&self) -> Result<Option<Vec<u8>>> {
        let Some(name) = self.font.name()? else {
            return Ok(None);
        };
        if !self.options.keeps(Tag::NAME) {
            return Ok(None);
        }

        let (platform, encoding, language) = WINDOWS_ENGLISH;
        let records: Vec<NameRecord> = name
            .records()
            .iter()
            .filter(|r| {
                r.platform_id == platform && r.encoding_id == encoding && r.language_id == language && r.name_id < 7
            })
            .map(|r| {
                let mut record = r.clone();
                if let (6, Some(prefix)) = (record.name_id, &self.options.prefix) {
                    record.value = format!("{}{}", prefix, record.value);
                }
                record
            })
            .collect();
        if records.is_empty() {
            return Ok(None);
        }

        let mut out = ByteBuffer::new();
        NameTable::from_records(records).write(&mut out);
        Ok(Some(out.into_vec()))
    }

    fn build_os2(&self) -> Result<Option<Vec<u8>>> {
        let Some(os2) = self.font.os2()? else {
            return Ok(None);
        };
        let (Some((&first, _)), Some((&last, _))) =
            (self.uni_to_gid.first_key_value(), self.uni_to_gid.last_key_value())
        else {
            return Ok(None);
        };
        if !self.options.keeps(Tag::OS2) {
            return Ok(None);
        }

        let mut os2 = os2.clone();
        os2.ul_unicode_range = [0; 4];
        os2.us_first_char_index = first.min(0xFFFF) as u16;
        os2.us_last_char_index = last.min(0xFFFF) as u16;
        let mut out = ByteBuffer::new();
        os2.write(&mut out);
        Ok(Some(out.into_vec()))
    }

    /// Statistics about the current glyph set.
    pub fn stats(&self) -> SubsetStats {
        SubsetStats {
            unique_chars: self.uni_to_gid.len(),
            unique_glyphs: self.glyph_ids.len(),
            min_glyph_id: self.glyph_ids.first().copied(),
            max_glyph_id: self.glyph_ids.last().copied(),
        }
    }

    /// Deterministic six-letter tag for the current glyph set.
    pub fn subset_tag(&self) -> String {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for glyph in &self.glyph_ids {
            glyph.hash(&mut hasher);
        }
        hash_to_tag(hasher.finish())
    }

    /// Subset font name, e.g. "ABCDEF+Arial".
    pub fn subset_font_name(&self, base_name: &str) -> String {
        format!("{}+{}", self.subset_tag(), base_name)
    }
}

/// Convert a hash to a 6-letter uppercase tag.
fn hash_to_tag(hash: u64) -> String {
    let mut tag = String::with_capacity(6);
    let mut h = hash;
    for _ in 0..6 {
        tag.push(((h % 26) as u8 + b'A') as char);
        h /= 26;
    }
    tag
}

/// Statistics about a font subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsetStats {
    /// Number of unique Unicode characters used
    pub unique_chars: usize,
    /// Number of unique glyphs kept, `.notdef` included
    pub unique_glyphs: usize,
    /// Minimum glyph ID kept
    pub min_glyph_id: Option<u16>,
    /// Maximum glyph ID kept
    pub max_glyph_id: Option<u16>,
}

impl SubsetStats {
    /// Glyph-count based estimate of the size reduction, in percent.
    pub fn estimated_reduction(&self, total_glyphs: u16) -> f32 {
        if total_glyphs == 0 || self.unique_glyphs == 0 {
            return 0.0;
        }
        let used = self.unique_glyphs as f32;
        let total = total_glyphs as f32;
        (1.0 - used / total) * 100.0
    }
}

/// Component references found in one raw glyph.
struct ComponentScan {
    is_composite: bool,
    /// (byte offset of the glyph index field, referenced GID)
    references: Vec<(usize, u16)>,
    /// End of the component records and their instructions
    end: usize,
}

/// Walk the component records of a raw glyph without decoding outlines.
fn scan_components(gid: u16, raw: &[u8]) -> Result<ComponentScan> {
    let truncated = || Error::Font(format!("composite glyph {} is truncated", gid));
    let is_composite = raw.len() >= 2 && i16::from_be_bytes([raw[0], raw[1]]) < 0;
    let mut scan = ComponentScan {
        is_composite,
        references: Vec::new(),
        end: raw.len(),
    };
    if !is_composite {
        return Ok(scan);
    }

    let read_u16 = |at: usize| -> Result<u16> {
        raw.get(at..at + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or_else(truncated)
    };

    let mut offset = COMPONENTS_OFFSET;
    let mut flags;
    loop {
        flags = ComponentFlags::from_bits_retain(read_u16(offset)?);
        scan.references.push((offset + 2, read_u16(offset + 2)?));
        offset += 4 + flags.argument_size() + flags.transform_size();
        if !flags.contains(ComponentFlags::MORE_COMPONENTS) {
            break;
        }
    }
    if flags.contains(ComponentFlags::WE_HAVE_INSTRUCTIONS) {
        offset += 2 + read_u16(offset)? as usize;
    }
    if offset > raw.len() {
        return Err(truncated());
    }
    scan.end = offset;
    Ok(scan)
}

/// Length of a format 4 subtable with `seg_count` segments and no glyph
/// id array.
fn format4_length(seg_count: usize) -> Result<u16> {
    seg_count
        .checked_mul(8)
        .and_then(|n| n.checked_add(16))
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| Error::Font(format!("cmap format 4 cannot hold {} segments", seg_count)))
}

fn highest_power_of_two(n: u16) -> u16 {
    if n == 0 {
        0
    } else {
        1 << (15 - n.leading_zeros())
    }
}

/// Sum of the big-endian 32-bit words of `data`, zero padded.
pub fn sfnt_checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

/// Check a font's table checksums and its whole-file checksum adjustment.
///
/// The `head` table is summed with its adjustment field zeroed, as written.
pub fn verify_font_checksum(data: &[u8]) -> bool {
    let Ok(font) = TrueTypeFont::parse(data.to_vec()) else {
        return false;
    };
    for record in font.tables() {
        let Ok(bytes) = font.table_bytes(record.tag) else {
            return false;
        };
        let mut bytes = bytes.to_vec();
        if record.tag == Tag::HEAD {
            let at = HeadTable::CHECKSUM_ADJUSTMENT_OFFSET;
            match bytes.get_mut(at..at + 4) {
                Some(field) => field.fill(0),
                None => return false,
            }
        }
        if sfnt_checksum(&bytes) != record.checksum {
            log::debug!("Checksum mismatch in {} table", record.tag);
            return false;
        }
    }
    sfnt_checksum(data) == CHECKSUM_MAGIC
}

/// Serialize tables into an sfnt file, in map order.
fn write_sfnt(tables: &BTreeMap<Tag, Vec<u8>>) -> Result<Vec<u8>> {
    let num_tables = tables.len() as u16;
    let mask = highest_power_of_two(num_tables);
    let search_range = mask * 16;

    let mut out = ByteBuffer::new();
    out.write_u32(SFNT_VERSION_TRUETYPE);
    out.write_u16(num_tables);
    out.write_u16(search_range);
    out.write_u16(mask.trailing_zeros() as u16);
    out.write_u16(num_tables * 16 - search_range);

    let mut offset = SFNT_HEADER_SIZE + TABLE_RECORD_SIZE * tables.len();
    let mut head_offset = None;
    for (tag, body) in tables {
        if *tag == Tag::HEAD {
            head_offset = Some(offset);
        }
        out.write_bytes(tag.as_bytes());
        out.write_u32(sfnt_checksum(body));
        out.write_u32(offset as u32);
        out.write_u32(body.len() as u32);
        offset += (body.len() + 3) & !3;
    }
    for body in tables.values() {
        out.write_bytes(body);
        let padding = (4 - body.len() % 4) % 4;
        out.write_bytes(&[0; 3][..padding]);
    }

    let head_offset = head_offset.ok_or_else(|| Error::MissingTable(Tag::HEAD.to_string()))?;
    let adjustment = CHECKSUM_MAGIC.wrapping_sub(sfnt_checksum(out.as_slice()));
    out.replace(head_offset + HeadTable::CHECKSUM_ADJUSTMENT_OFFSET, &adjustment.to_be_bytes());
    Ok(out.into_vec())
}
