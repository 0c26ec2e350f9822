//! Cross-reference table reconstruction for damaged PDFs.
//!
//! When the section chain is corrupted, missing, or incomplete, the table is
//! rebuilt by scanning the whole file for `N G obj` headers.
//!
//! The scan runs front to back, which is the order objects were written in,
//! so a later definition of an object number replaces an earlier one. Object
//! streams met along the way are expanded into compressed entries for the
//! objects they contain.

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::objstm::{object_stream_index, parse_object_stream_with_options};
use crate::parser::{parse_indirect_object, parse_object};
use crate::parser_config::ParserOptions;
use crate::xref::{CrossRefTable, XRefEntry};
use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    /// Regex for finding "N G obj" patterns in PDF files
    static ref RE_OBJ_PATTERN: Regex = Regex::new(r"(?-u)(\d+)\s+(\d+)\s+obj").unwrap();

    /// Regex for finding "trailer <<" patterns
    static ref RE_TRAILER: Regex = Regex::new(r"(?-u)trailer\s*<<").unwrap();
}

/// What the scan learned besides the entries themselves.
#[derive(Default)]
struct ScanState {
    last_xref_stream: Option<Dictionary>,
    catalog: Option<ObjectRef>,
    highest_object: u32,
}

/// Reconstruct the cross-reference table by scanning the entire file.
///
/// Every `N G obj` header becomes an uncompressed entry, with later
/// occurrences replacing earlier ones. Cross-reference streams are not
/// recorded as entries, but the last one's dictionary is kept as a trailer
/// candidate. Object streams are expanded into `(container, index)` entries.
///
/// The returned table always carries a trailer: the last parsable `trailer`
/// dictionary in the file, else the last cross-reference stream dictionary
/// without `/Prev`, else a minimal `{Size, Root}` pointing at the catalog.
///
/// # Errors
///
/// Returns an error if:
/// - No objects are found during scanning
/// - No trailer can be found and the catalog cannot be identified
pub fn reconstruct_xref(data: &[u8], options: &ParserOptions) -> Result<CrossRefTable> {
    log::info!("Reconstructing xref table by scanning {} bytes", data.len());

    let mut table = CrossRefTable::new();
    let mut state = ScanState::default();
    let mut objects_found = 0usize;

    for capture in RE_OBJ_PATTERN.captures_iter(data) {
        let (Some(full_match), Some(number), Some(generation)) = (capture.get(0), capture.get(1), capture.get(2))
        else {
            continue;
        };
        let offset = full_match.start();

        let (Some(obj_num), Some(gen_num)) = (
            parse_decimal::<u32>(number.as_bytes()),
            parse_decimal::<u16>(generation.as_bytes()),
        ) else {
            log::warn!("Object header at offset {} has out-of-range numbers", offset);
            continue;
        };

        if !starts_object(&data[full_match.end()..]) {
            log::debug!("Skipping false positive object header at offset {}", offset);
            continue;
        }

        objects_found += 1;
        state.highest_object = state.highest_object.max(obj_num);

        let object = match parse_indirect_object(&data[offset..]) {
            Ok((_, (_, object))) => Some(object),
            Err(e) => {
                log::debug!("Object {} {} at offset {} does not parse: {:?}", obj_num, gen_num, offset, e);
                None
            },
        };

        if let Some(object) = &object {
            if object.has_type("XRef") {
                state.last_xref_stream = object.as_dict().cloned();
                continue;
            }
            if object.has_type("Catalog") {
                state.catalog = Some(ObjectRef::new(obj_num, gen_num));
            }
        }

        table.insert_overwrite(obj_num, XRefEntry::uncompressed(offset as u64, gen_num));

        if let Some(object) = object.filter(|o| o.has_type("ObjStm")) {
            expand_object_stream(&mut table, &mut state, obj_num, &object, options);
        }
    }

    log::info!("Reconstructed xref with {} object headers, {} entries", objects_found, table.len());

    if table.is_empty() {
        return Err(Error::InvalidPdf("No objects found during xref reconstruction".to_string()));
    }

    let trailer = find_trailer(data, &state)?;
    table.set_trailer(trailer);
    Ok(table)
}

/// Add a compressed entry for every object the stream contains.
fn expand_object_stream(
    table: &mut CrossRefTable,
    state: &mut ScanState,
    container: u32,
    stream: &Object,
    options: &ParserOptions,
) {
    let index = match object_stream_index(stream, options) {
        Ok(index) => index,
        Err(e) => {
            log::warn!("Cannot expand object stream {}: {}", container, e);
            return;
        },
    };

    for (position, &(obj_num, _)) in index.iter().enumerate() {
        table.insert_overwrite(obj_num, XRefEntry::compressed(container, position as u32));
        state.highest_object = state.highest_object.max(obj_num);
    }
    log::debug!("Object stream {} holds {} objects", container, index.len());

    if state.catalog.is_none() {
        if let Ok(objects) = parse_object_stream_with_options(stream, options) {
            state.catalog = objects
                .iter()
                .find(|(_, object)| object.has_type("Catalog"))
                .map(|(&number, _)| ObjectRef::new(number, 0));
        }
    }
}

fn parse_decimal<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Whether the bytes after `obj` plausibly begin an object.
///
/// Headers quoted inside strings or comments are usually followed by
/// something else.
fn starts_object(after_header: &[u8]) -> bool {
    match after_header.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(&next) => {
            matches!(next, b'<' | b'[' | b'(' | b'/' | b't' | b'f' | b'n' | b'-' | b'+' | b'.')
                || next.is_ascii_digit()
        },
        None => true,
    }
}

/// Pick the trailer for the rebuilt table.
fn find_trailer(data: &[u8], state: &ScanState) -> Result<Dictionary> {
    let keyword_starts: Vec<usize> = RE_TRAILER.find_iter(data).map(|m| m.start()).collect();
    for &start in keyword_starts.iter().rev() {
        match parse_object(&data[start + b"trailer".len()..]) {
            Ok((_, Object::Dictionary(mut trailer))) => {
                log::info!("Using trailer dictionary at offset {}", start);
                if let (false, Some(catalog)) = (trailer.contains_key("Root"), state.catalog) {
                    trailer.insert("Root".to_string(), Object::Reference(catalog));
                }
                return Ok(trailer);
            },
            _ => log::warn!("Unparsable trailer dictionary at offset {}", start),
        }
    }

    if let Some(mut dict) = state.last_xref_stream.clone() {
        log::info!("Using last cross-reference stream dictionary as trailer");
        dict.remove("Prev");
        return Ok(dict);
    }

    let catalog = state
        .catalog
        .ok_or_else(|| Error::InvalidPdf("Could not find catalog in reconstructed xref".to_string()))?;
    log::info!("Built minimal trailer with catalog {}", catalog);

    let mut trailer = Dictionary::new();
    trailer.insert("Root".to_string(), Object::Reference(catalog));
    trailer.insert("Size".to_string(), Object::Integer(state.highest_object as i64 + 1));
    Ok(trailer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_definition_wins() {
        let data = b"%PDF-1.4\n5 0 obj\n(old)\nendobj\n5 0 obj\n(new)\nendobj\ntrailer\n<< /Size 6 >>\n";
        let table = reconstruct_xref(data, &ParserOptions::default()).unwrap();
        let second = data.windows(7).rposition(|w| w == b"5 0 obj").unwrap();
        assert_eq!(table.get(5).unwrap().offset, second as u64);
    }

    #[test]
    fn test_false_positive_in_comment_skipped() {
        let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n% 7 0 obj ]\n";
        let table = reconstruct_xref(data, &ParserOptions::default()).unwrap();
        assert!(table.contains(1));
        assert!(!table.contains(7));
    }

    #[test]
    fn test_minimal_trailer_from_catalog() {
        let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n2 0 obj\n<< /Type /Pages >>\nendobj\n";
        let table = reconstruct_xref(data, &ParserOptions::default()).unwrap();
        let trailer = table.trailer().unwrap();
        assert_eq!(trailer.get("Root"), Some(&Object::Reference(ObjectRef::new(1, 0))));
        assert_eq!(trailer.get("Size").and_then(Object::as_integer), Some(3));
    }

    #[test]
    fn test_no_objects() {
        assert!(matches!(
            reconstruct_xref(b"%PDF-1.4\nnothing here\n", &ParserOptions::default()),
            Err(Error::InvalidPdf(_))
        ));
    }

    #[test]
    fn test_no_trailer_and_no_catalog() {
        let data = b"%PDF-1.4\n1 0 obj\n42\nendobj\n";
        assert!(reconstruct_xref(data, &ParserOptions::default()).is_err());
    }

    #[test]
    fn test_starts_object() {
        assert!(starts_object(b" << /A 1 >>"));
        assert!(starts_object(b"\n42"));
        assert!(!starts_object(b" ]"));
        assert!(!starts_object(b" endobj"));
    }
}
