//! Cross-reference table loading.
//!
//! The xref table maps object numbers to byte offsets in the PDF file,
//! enabling random access to PDF objects.
//!
//! Supports both traditional xref tables (PDF 1.0-1.4) and
//! cross-reference streams (PDF 1.5+), chained through `/Prev` and the
//! hybrid-file `/XRefStm` pointer. Sections are walked newest first, so the
//! first definition seen for an object number is the one kept.
//!
//! When the chain is unusable, [`load_xref`] falls back to
//! [`crate::xref_reconstruction`], which rebuilds the table from a scan of
//! the whole file.

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{Dictionary, Object};
use crate::parser::{parse_indirect_object, parse_object};
use crate::parser_config::ParserOptions;
use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// How far before a linearization `/T` hint to look for the `xref` keyword.
const LINEARIZED_SEARCH_WINDOW: usize = 256;

/// Cross-reference table entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum XRefEntryType {
    /// Entry for a free object
    Free,
    /// Entry for an uncompressed object (traditional)
    Uncompressed,
    /// Entry for an object in an object stream (PDF 1.5+)
    Compressed,
}

/// Cross-reference table entry.
///
/// Each entry contains information about where to find an object.
/// Supports both traditional entries (byte offset) and compressed entries
/// (object stream reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct XRefEntry {
    /// Type of entry
    pub entry_type: XRefEntryType,
    /// Byte offset (uncompressed), container object number (compressed)
    /// or next free object number (free)
    pub offset: u64,
    /// Generation number, or the index within the container for compressed
    /// entries
    pub generation: u32,
}

impl XRefEntry {
    /// Create a new uncompressed entry.
    pub fn uncompressed(offset: u64, generation: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Uncompressed,
            offset,
            generation: generation as u32,
        }
    }

    /// Create a new compressed entry (object in object stream).
    pub fn compressed(container: u32, index: u32) -> Self {
        Self {
            entry_type: XRefEntryType::Compressed,
            offset: container as u64,
            generation: index,
        }
    }

    /// Create a new free entry.
    pub fn free(next_free: u64, generation: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Free,
            offset: next_free,
            generation: generation as u32,
        }
    }

    /// Whether the entry describes a live object.
    pub fn in_use(&self) -> bool {
        self.entry_type != XRefEntryType::Free
    }

    /// Object number of the containing object stream, for compressed entries.
    pub fn container(&self) -> Option<u32> {
        match self.entry_type {
            XRefEntryType::Compressed => u32::try_from(self.offset).ok(),
            _ => None,
        }
    }

    /// Index within the containing object stream, for compressed entries.
    pub fn index_in_stream(&self) -> Option<u32> {
        match self.entry_type {
            XRefEntryType::Compressed => Some(self.generation),
            _ => None,
        }
    }
}

/// Cross-reference table mapping object numbers to entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    trailer: Option<Dictionary>,
}

impl CrossRefTable {
    /// Create a new empty cross-reference table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trailer dictionary.
    pub fn set_trailer(&mut self, trailer: Dictionary) {
        self.trailer = Some(trailer);
    }

    /// Get the trailer dictionary.
    pub fn trailer(&self) -> Option<&Dictionary> {
        self.trailer.as_ref()
    }

    /// Record an entry unless the object number is already defined.
    ///
    /// This is the chained-section rule: sections are visited newest first,
    /// so an older section never replaces a newer definition. Returns
    /// whether the entry was stored.
    pub fn insert_if_absent(&mut self, object_number: u32, entry: XRefEntry) -> bool {
        match self.entries.entry(object_number) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            },
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Like [`insert_if_absent`](Self::insert_if_absent), but a free entry
    /// may be replaced.
    ///
    /// Hybrid files list objects stored in their `/XRefStm` stream as free
    /// in the classic table.
    pub fn insert_over_free(&mut self, object_number: u32, entry: XRefEntry) -> bool {
        match self.entries.get(&object_number) {
            Some(existing) if existing.in_use() => false,
            _ => {
                self.entries.insert(object_number, entry);
                true
            },
        }
    }

    /// Record an entry, replacing any previous definition.
    ///
    /// This is the full-scan rule: a forward scan meets objects in write
    /// order, so the last occurrence is the live one. Returns the replaced
    /// entry, if any.
    pub fn insert_overwrite(&mut self, object_number: u32, entry: XRefEntry) -> Option<XRefEntry> {
        self.entries.insert(object_number, entry)
    }

    /// Get an entry by object number.
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    /// Check if an object number is defined.
    pub fn contains(&self, object_number: u32) -> bool {
        self.entries.contains_key(&object_number)
    }

    /// Entries in ascending object-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &XRefEntry)> + '_ {
        self.entries.iter().map(|(&number, entry)| (number, entry))
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of loading the cross-reference structure of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct XRefInfo {
    /// Header version `(major, minor)` from `%PDF-x.y`, if present
    pub version: Option<(u8, u8)>,
    /// Trailer dictionary
    pub trailer: Dictionary,
    /// Object number to location index
    pub table: CrossRefTable,
    /// True when the table was rebuilt by scanning the file
    pub recovered: bool,
}

/// Find the byte offset of the newest cross-reference section.
///
/// Reads the last 2 KiB of the file and takes the integer that follows the
/// final `startxref` keyword.
///
/// # Errors
///
/// Returns `Error::InvalidXref` if:
/// - The "startxref" keyword is not found
/// - The offset following "startxref" is not a non-negative integer
pub fn find_xref_offset<R: Read + Seek>(reader: &mut R) -> Result<u64> {
    let file_size = reader.seek(SeekFrom::End(0))?;

    let read_size = std::cmp::min(2048, file_size);
    reader.seek(SeekFrom::End(-(read_size as i64)))?;

    let mut buf = Vec::with_capacity(read_size as usize);
    reader.take(read_size).read_to_end(&mut buf)?;

    let keyword_pos = rfind(&buf, b"startxref").ok_or(Error::InvalidXref)?;
    match token(&buf[keyword_pos + b"startxref".len()..]) {
        Ok((_, Token::Integer(offset))) if offset >= 0 => Ok(offset as u64),
        _ => Err(Error::InvalidXref),
    }
}

/// Version from the `%PDF-x.y` header within the first KiB.
///
/// Files with junk before the header are accepted. A missing header yields
/// `None` rather than an error.
pub fn parse_header_version(data: &[u8]) -> Option<(u8, u8)> {
    let window = &data[..data.len().min(1024)];
    let start = find(window, b"%PDF-")? + b"%PDF-".len();
    match window.get(start..start + 3)? {
        [major, b'.', minor] if major.is_ascii_digit() && minor.is_ascii_digit() => {
            Some((major - b'0', minor - b'0'))
        },
        _ => None,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// One parsed cross-reference section.
#[derive(Debug, Clone, PartialEq)]
pub struct XRefSection {
    /// Entries in the order they appear in the section
    pub entries: Vec<(u32, XRefEntry)>,
    /// The section's trailer (or cross-reference stream dictionary)
    pub trailer: Dictionary,
}

/// Walks the chain of cross-reference sections of an in-memory file.
#[derive(Debug, Clone, Copy)]
pub struct XRefReader<'a> {
    data: &'a [u8],
    options: ParserOptions,
}

impl<'a> XRefReader<'a> {
    /// Create a reader over the whole file contents.
    pub fn new(data: &'a [u8], options: ParserOptions) -> Self {
        Self { data, options }
    }

    /// Read every section reachable from `start` and merge them newest first.
    ///
    /// After each section its `/XRefStm` side section is visited before its
    /// `/Prev` predecessor. Objects a hybrid table lists as free may be
    /// redefined by its side section. The table's trailer is the newest
    /// section's trailer.
    ///
    /// # Errors
    ///
    /// Any section that fails to parse fails the walk. More than
    /// `max_xref_chain_length` sections is `Error::RecursionLimitExceeded`.
    pub fn read_chain(&self, start: u64) -> Result<CrossRefTable> {
        let mut table = CrossRefTable::new();
        // (offset, reached through /XRefStm)
        let mut pending = vec![(start, false)];
        let mut visited = HashSet::new();
        let mut sections = 0u32;

        while let Some((offset, side_stream)) = pending.pop() {
            if !visited.insert(offset) {
                log::warn!("Cross-reference section at offset {} already visited, skipping", offset);
                continue;
            }

            sections += 1;
            if sections > self.options.max_xref_chain_length {
                return Err(Error::RecursionLimitExceeded(self.options.max_xref_chain_length));
            }

            let section = self.read_section(offset, sections == 1)?;
            let mut shadowed = 0usize;
            for (number, entry) in section.entries {
                let stored = if side_stream {
                    table.insert_over_free(number, entry)
                } else {
                    table.insert_if_absent(number, entry)
                };
                if !stored {
                    shadowed += 1;
                }
            }
            log::debug!(
                "Cross-reference section at {}: {} entries shadowed by newer sections",
                offset,
                shadowed
            );

            let prev = chain_offset(&section.trailer, "Prev");
            let xref_stm = chain_offset(&section.trailer, "XRefStm");
            if table.trailer().is_none() {
                table.set_trailer(section.trailer);
            }

            // Stack order: XRefStm is popped before Prev.
            pending.extend(prev.map(|p| (p, false)));
            pending.extend(xref_stm.map(|s| (s, true)));
        }

        Ok(table)
    }

    /// Parse the single section at `offset`.
    ///
    /// When `first` is set, a linearization dictionary at `offset` redirects
    /// to the table named by its `/T` hint.
    pub fn read_section(&self, offset: u64, first: bool) -> Result<XRefSection> {
        let input = usize::try_from(offset)
            .ok()
            .and_then(|at| self.data.get(at..))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| Error::ParseError {
                offset: offset as usize,
                reason: "cross-reference offset beyond end of file".to_string(),
            })?;

        match token(input) {
            Ok((rest, Token::Keyword(b"xref"))) => self.read_classic(self.position_of(rest)),
            Ok((_, Token::Integer(_))) => {
                let (_, (reference, object)) =
                    parse_indirect_object(input).map_err(|_| Error::ParseError {
                        offset: offset as usize,
                        reason: "expected xref keyword or cross-reference stream".to_string(),
                    })?;

                if first {
                    if let Some(hint) = linearized_hint(&object) {
                        log::debug!("Linearized file, main cross-reference table hinted at {}", hint);
                        let start = self.locate_classic_table(hint)?;
                        return self.read_classic(start);
                    }
                }

                if object.has_type("XRef") {
                    log::debug!("Cross-reference stream object {}", reference);
                    self.read_stream(&object)
                } else {
                    Err(Error::InvalidXref)
                }
            },
            _ => Err(Error::InvalidXref),
        }
    }

    fn position_of(&self, rest: &[u8]) -> usize {
        self.data.len() - rest.len()
    }

    fn parse_error(&self, at: &[u8], reason: &str) -> Error {
        Error::ParseError {
            offset: self.position_of(at),
            reason: reason.to_string(),
        }
    }

    /// Find where the subsection headers of a hinted classic table start.
    ///
    /// The hint may point at the `xref` keyword itself or slightly past it.
    fn locate_classic_table(&self, hint: u64) -> Result<usize> {
        let hint = usize::try_from(hint)
            .ok()
            .filter(|&h| h < self.data.len())
            .ok_or(Error::InvalidXref)?;

        if let Ok((rest, Token::Keyword(b"xref"))) = token(&self.data[hint..]) {
            return Ok(self.position_of(rest));
        }

        let window_start = hint.saturating_sub(LINEARIZED_SEARCH_WINDOW);
        let window_end = (hint + b"xref".len()).min(self.data.len());
        rfind(&self.data[window_start..window_end], b"xref")
            .map(|pos| window_start + pos + b"xref".len())
            .ok_or(Error::InvalidXref)
    }

    /// Read subsections from `start` up to and including the trailer.
    fn read_classic(&self, start: usize) -> Result<XRefSection> {
        let mut input = &self.data[start..];
        let mut entries = Vec::new();

        loop {
            let (rest, tok) = token(input)
                .map_err(|_| self.parse_error(input, "unexpected end of cross-reference table"))?;
            match tok {
                Token::Keyword(b"trailer") => {
                    return match parse_object(rest) {
                        Ok((_, Object::Dictionary(trailer))) => Ok(XRefSection { entries, trailer }),
                        _ => Err(self.parse_error(rest, "trailer is not a dictionary")),
                    };
                },
                Token::Integer(first) => {
                    let (rest, count) = match token(rest) {
                        Ok((rest, Token::Integer(count))) => (rest, count),
                        _ => return Err(self.parse_error(input, "subsection header is not an integer pair")),
                    };
                    if first < 0 || count < 0 {
                        return Err(self.parse_error(input, "negative subsection header"));
                    }
                    if count > self.options.max_subsection_entries as i64 {
                        return Err(Error::InvalidPdf(format!(
                            "xref subsection count {} exceeds limit {}",
                            count, self.options.max_subsection_entries
                        )));
                    }

                    input = rest;
                    for i in 0..count {
                        let number = u32::try_from(first + i)
                            .map_err(|_| self.parse_error(input, "object number out of range"))?;
                        let (rest, entry) = self.classic_entry(input)?;
                        entries.push((number, entry));
                        input = rest;
                    }
                },
                _ => return Err(self.parse_error(input, "expected subsection header or trailer")),
            }
        }
    }

    /// One `offset generation n|f` entry.
    fn classic_entry<'i>(&self, input: &'i [u8]) -> Result<(&'i [u8], XRefEntry)> {
        let malformed = || self.parse_error(input, "malformed cross-reference entry");

        let (rest, offset) = match token(input) {
            Ok((rest, Token::Integer(v))) if v >= 0 => (rest, v as u64),
            _ => return Err(malformed()),
        };
        let (rest, generation) = match token(rest) {
            Ok((rest, Token::Integer(v))) => (rest, u16::try_from(v).map_err(|_| malformed())?),
            _ => return Err(malformed()),
        };
        match token(rest) {
            Ok((rest, Token::Keyword(b"n"))) => Ok((rest, XRefEntry::uncompressed(offset, generation))),
            Ok((rest, Token::Keyword(b"f"))) => Ok((rest, XRefEntry::free(offset, generation))),
            _ => Err(malformed()),
        }
    }

    /// Decode the rows of a cross-reference stream.
    fn read_stream(&self, object: &Object) -> Result<XRefSection> {
        let Object::Stream { dict, .. } = object else {
            return Err(Error::InvalidXrefStream("cross-reference object is not a stream".to_string()));
        };

        let widths = stream_widths(dict)?;
        let size = dict
            .get("Size")
            .and_then(Object::as_integer)
            .filter(|&s| s >= 0)
            .ok_or_else(|| Error::InvalidXrefStream("missing or invalid /Size".to_string()))?;
        let ranges = stream_ranges(dict, size)?;

        let data = object
            .decode_stream_data_with_options(&self.options)
            .map_err(|e| Error::InvalidXrefStream(format!("cannot decode rows: {}", e)))?;

        let row_len: usize = widths.iter().sum();
        if row_len == 0 {
            return Err(Error::InvalidXrefStream("/W describes zero-width rows".to_string()));
        }

        let mut rows = data.chunks(row_len);
        let mut entries = Vec::new();
        for (first, count) in ranges {
            if count > self.options.max_subsection_entries as u64 {
                return Err(Error::InvalidXrefStream(format!(
                    "/Index range of {} entries exceeds limit",
                    count
                )));
            }
            for i in 0..count {
                let row = rows
                    .next()
                    .filter(|row| row.len() == row_len)
                    .ok_or_else(|| Error::InvalidXrefStream("truncated row data".to_string()))?;
                let number = u32::try_from(first + i)
                    .map_err(|_| Error::InvalidXrefStream("object number out of range".to_string()))?;

                let (type_field, rest) = row.split_at(widths[0]);
                let (field2, field3) = rest.split_at(widths[1]);
                let entry_type = if widths[0] == 0 { 1 } else { read_field(type_field) };
                let (field2, field3) = (read_field(field2), read_field(field3));

                let entry = match entry_type {
                    0 => XRefEntry::free(field2, field3 as u16),
                    1 => XRefEntry::uncompressed(field2, field3 as u16),
                    2 => XRefEntry::compressed(field2 as u32, field3 as u32),
                    other => {
                        log::debug!("Ignoring cross-reference stream row of type {}", other);
                        continue;
                    },
                };
                entries.push((number, entry));
            }
        }

        Ok(XRefSection {
            entries,
            trailer: dict.clone(),
        })
    }
}

/// Big-endian unsigned field; an empty field reads as zero.
fn read_field(bytes: &[u8]) -> u64 {
    if bytes.is_empty() {
        0
    } else {
        BigEndian::read_uint(bytes, bytes.len())
    }
}

fn stream_widths(dict: &Dictionary) -> Result<[usize; 3]> {
    let bad = || Error::InvalidXrefStream("/W must be three widths of 0 to 8 bytes".to_string());
    let array = dict.get("W").and_then(Object::as_array).ok_or_else(bad)?;
    if array.len() != 3 {
        return Err(bad());
    }
    let mut widths = [0usize; 3];
    for (slot, value) in widths.iter_mut().zip(array) {
        match value.as_integer() {
            Some(w @ 0..=8) => *slot = w as usize,
            _ => return Err(bad()),
        }
    }
    Ok(widths)
}

fn stream_ranges(dict: &Dictionary, size: i64) -> Result<Vec<(u64, u64)>> {
    let Some(index) = dict.get("Index") else {
        return Ok(vec![(0, size as u64)]);
    };
    let bad = || Error::InvalidXrefStream("/Index must hold pairs of non-negative integers".to_string());
    let array = index.as_array().ok_or_else(bad)?;
    if array.len() % 2 != 0 {
        return Err(bad());
    }
    array
        .chunks(2)
        .map(|pair| match (pair[0].as_integer(), pair[1].as_integer()) {
            (Some(first), Some(count)) if first >= 0 && count >= 0 => Ok((first as u64, count as u64)),
            _ => Err(bad()),
        })
        .collect()
}

/// Positive `/Prev` or `/XRefStm` offset; zero and negatives end the chain.
fn chain_offset(trailer: &Dictionary, key: &str) -> Option<u64> {
    trailer
        .get(key)
        .and_then(Object::as_integer)
        .filter(|&offset| offset > 0)
        .map(|offset| offset as u64)
}

/// `/T` of a linearization dictionary.
fn linearized_hint(object: &Object) -> Option<u64> {
    let dict = object.as_dict()?;
    dict.get("Linearized")?;
    let hint = dict.get("T")?.as_integer()?;
    u64::try_from(hint).ok()
}

/// Load the cross-reference structure of an in-memory PDF.
///
/// Walks the section chain from `startxref`. When that fails, the table is
/// rebuilt by [`crate::xref_reconstruction::reconstruct_xref`]: always for
/// `Error::InvalidXrefStream`, and for other structural errors when
/// `options.recover_damaged_xref` is set.
///
/// # Example
///
/// ```no_run
/// use pdf_core::parser_config::ParserOptions;
/// use pdf_core::xref::load_xref;
///
/// # fn main() -> pdf_core::Result<()> {
/// let data = std::fs::read("document.pdf")?;
/// let info = load_xref(&data, &ParserOptions::default())?;
/// println!("{} objects, recovered: {}", info.table.len(), info.recovered);
/// # Ok(())
/// # }
/// ```
pub fn load_xref(data: &[u8], options: &ParserOptions) -> Result<XRefInfo> {
    let version = parse_header_version(data);
    if version.is_none() {
        log::warn!("No %PDF header found");
    }

    let reader = XRefReader::new(data, *options);
    let walked = find_xref_offset(&mut std::io::Cursor::new(data)).and_then(|start| reader.read_chain(start));

    let (table, recovered) = match walked {
        Ok(table) => (table, false),
        Err(err) => {
            let forced = matches!(err, Error::InvalidXrefStream(_));
            if !(forced || options.recover_damaged_xref) {
                return Err(err);
            }
            log::warn!("Cross-reference chain unusable ({}), rebuilding by full scan", err);
            (crate::xref_reconstruction::reconstruct_xref(data, options)?, true)
        },
    };

    let trailer = table.trailer().cloned().ok_or(Error::InvalidXref)?;
    Ok(XRefInfo {
        version,
        trailer,
        table,
        recovered,
    })
}

/// Load the cross-reference structure from any seekable reader.
pub fn load_xref_from_reader<R: Read + Seek>(reader: &mut R, options: &ParserOptions) -> Result<XRefInfo> {
    reader.seek(SeekFrom::Start(0))?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    load_xref(&data, options)
}

/// Load the cross-reference structure of a file on disk.
pub fn load_xref_file<P: AsRef<Path>>(path: P, options: &ParserOptions) -> Result<XRefInfo> {
    let data = std::fs::read(path)?;
    load_xref(&data, options)
}
