//! Cross-reference chain walking: incremental updates, hybrid files,
//! cross-reference streams and linearized files.

mod common;

use common::PdfBuilder;
use pdf_core::object::{Object, ObjectRef};
use pdf_core::parser_config::ParserOptions;
use pdf_core::xref::{load_xref, load_xref_from_reader, XRefEntryType, XRefReader};
use pdf_core::xref_reconstruction::reconstruct_xref;
use pdf_core::Error;

const CATALOG: &str = "<< /Type /Catalog /Pages 2 0 R >>";
const PAGES: &str = "<< /Type /Pages /Kids [] /Count 0 >>";

fn base_document(builder: &mut PdfBuilder) -> (u64, u64, u64) {
    let o1 = builder.object(1, CATALOG);
    let o2 = builder.object(2, PAGES);
    let x1 = builder.classic_xref(
        &[(0, 0, 65535, false), (1, o1, 0, true), (2, o2, 0, true)],
        "<< /Size 3 /Root 1 0 R >>",
    );
    (o1, o2, x1)
}

#[test]
fn test_single_classic_section() {
    let mut builder = PdfBuilder::new();
    let (o1, o2, x1) = base_document(&mut builder);
    let data = builder.finish(x1);

    let info = load_xref(&data, &ParserOptions::default()).unwrap();
    assert!(!info.recovered);
    assert_eq!(info.version, Some((1, 7)));
    assert_eq!(info.table.len(), 3);
    assert_eq!(info.table.get(1).unwrap().offset, o1);
    assert_eq!(info.table.get(2).unwrap().offset, o2);
    assert!(!info.table.get(0).unwrap().in_use());
    assert_eq!(info.trailer.get("Root"), Some(&Object::Reference(ObjectRef::new(1, 0))));
}

#[test]
fn test_incremental_update_newest_wins() {
    let mut builder = PdfBuilder::new();
    let (o1, _, x1) = base_document(&mut builder);
    let o2_new = builder.object(2, "<< /Type /Pages /Kids [] /Count 1 >>");
    let o3 = builder.object(3, "(added)");
    let x2 = builder.classic_xref(
        &[(2, o2_new, 0, true), (3, o3, 0, true)],
        &format!("<< /Size 4 /Root 1 0 R /Prev {} >>", x1),
    );
    let data = builder.finish(x2);

    let info = load_xref(&data, &ParserOptions::default()).unwrap();
    assert!(!info.recovered);
    assert_eq!(info.table.get(1).unwrap().offset, o1);
    assert_eq!(info.table.get(2).unwrap().offset, o2_new);
    assert_eq!(info.table.get(3).unwrap().offset, o3);
    // the trailer is the newest section's
    assert_eq!(info.trailer.get("Size").and_then(Object::as_integer), Some(4));
    assert_eq!(info.trailer.get("Prev").and_then(Object::as_integer), Some(x1 as i64));
}

#[test]
fn test_update_that_frees_an_object() {
    let mut builder = PdfBuilder::new();
    let (_, _, x1) = base_document(&mut builder);
    let x2 = builder.classic_xref(&[(2, 0, 1, false)], &format!("<< /Size 3 /Root 1 0 R /Prev {} >>", x1));
    let data = builder.finish(x2);

    let info = load_xref(&data, &ParserOptions::default()).unwrap();
    let entry = info.table.get(2).unwrap();
    assert_eq!(entry.entry_type, XRefEntryType::Free);
    assert_eq!(entry.generation, 1);
}

#[test]
fn test_hybrid_side_stream_read_before_prev() {
    let mut builder = PdfBuilder::new();
    let o1 = builder.object(1, CATALOG);
    let o7_old = builder.object(7, "(old seven)");
    let x1 = builder.classic_xref(
        &[(0, 0, 65535, false), (1, o1, 0, true), (7, o7_old, 0, true)],
        "<< /Size 8 /Root 1 0 R >>",
    );
    // objects 5 and 7 live in object stream 10 according to the side stream
    let side = builder.xref_stream(11, &[(5, 2, 10, 0), (7, 2, 10, 1)], "");
    let x2 = builder.classic_xref(
        &[(5, 0, 1, false)],
        &format!("<< /Size 12 /Root 1 0 R /Prev {} /XRefStm {} >>", x1, side),
    );
    let data = builder.finish(x2);

    let info = load_xref(&data, &ParserOptions::default()).unwrap();
    assert!(!info.recovered);

    // the side stream redefines the object the classic table lists as free
    let five = info.table.get(5).unwrap();
    assert_eq!(five.container(), Some(10));
    assert_eq!(five.index_in_stream(), Some(0));

    // and is newer than the /Prev section
    let seven = info.table.get(7).unwrap();
    assert_eq!(seven.container(), Some(10));
    assert_eq!(seven.index_in_stream(), Some(1));

    assert!(info.trailer.contains_key("XRefStm"));
}

#[test]
fn test_hybrid_main_table_then_side_stream_then_prev() {
    let mut builder = PdfBuilder::new();
    let o1 = builder.object(1, CATALOG);
    let o7_old = builder.object(7, "(seven, first revision)");
    let o8_old = builder.object(8, "(eight, first revision)");
    let o9 = builder.object(9, "(nine)");
    let x1 = builder.classic_xref(
        &[(0, 0, 65535, false), (1, o1, 0, true), (7, o7_old, 0, true), (8, o8_old, 0, true), (9, o9, 0, true)],
        "<< /Size 10 /Root 1 0 R >>",
    );
    let o7_new = builder.object(7, "(seven, second revision)");
    // the side stream claims 7 and 8 for object stream 10
    let side = builder.xref_stream(11, &[(7, 2, 10, 0), (8, 2, 10, 1)], "");
    let x2 = builder.classic_xref(
        &[(7, o7_new, 0, true)],
        &format!("<< /Size 12 /Root 1 0 R /Prev {} /XRefStm {} >>", x1, side),
    );
    let data = builder.finish(x2);

    let info = load_xref(&data, &ParserOptions::strict()).unwrap();
    assert!(!info.recovered);

    // main table beats the side stream
    let seven = info.table.get(7).unwrap();
    assert_eq!(seven.entry_type, XRefEntryType::Uncompressed);
    assert_eq!(seven.offset, o7_new);

    // side stream beats /Prev
    let eight = info.table.get(8).unwrap();
    assert_eq!(eight.container(), Some(10));
    assert_eq!(eight.index_in_stream(), Some(1));

    // only /Prev knows nine
    assert_eq!(info.table.get(9).unwrap().offset, o9);
}

/// Object 5 is written in each of three revisions. `five_first` places the
/// newest revision's body at the start of the file instead of the end.
fn three_generations(five_first: bool) -> (Vec<u8>, [u64; 3]) {
    let mut builder = PdfBuilder::new();
    let early = five_first.then(|| builder.object(5, "(five, third revision)"));

    let o1 = builder.object(1, CATALOG);
    let o5_v1 = builder.object(5, "(five, first revision)");
    let x1 = builder.classic_xref(
        &[(0, 0, 65535, false), (1, o1, 0, true), (5, o5_v1, 0, true)],
        "<< /Size 6 /Root 1 0 R >>",
    );

    let o5_v2 = builder.object(5, "(five, second revision)");
    let x2 = builder.classic_xref(&[(5, o5_v2, 0, true)], &format!("<< /Size 6 /Root 1 0 R /Prev {} >>", x1));

    let o5_v3 = match early {
        Some(offset) => offset,
        None => builder.object(5, "(five, third revision)"),
    };
    let x3 = builder.classic_xref(&[(5, o5_v3, 0, true)], &format!("<< /Size 6 /Root 1 0 R /Prev {} >>", x2));
    (builder.finish(x3), [o5_v1, o5_v2, o5_v3])
}

#[test]
fn test_three_generations_chain_and_scan_agree_when_newest_is_last() {
    let (data, [_, _, newest]) = three_generations(false);

    let chained = load_xref(&data, &ParserOptions::strict()).unwrap();
    assert!(!chained.recovered);
    assert_eq!(chained.table.get(5).unwrap().offset, newest);

    let scanned = reconstruct_xref(&data, &ParserOptions::default()).unwrap();
    assert_eq!(scanned.get(5).unwrap().offset, newest);
}

#[test]
fn test_three_generations_chain_and_scan_differ_when_newest_is_first() {
    let (data, [_, second, newest]) = three_generations(true);
    assert!(newest < second);

    // the chain takes the most recent section's entry
    let chained = load_xref(&data, &ParserOptions::strict()).unwrap();
    assert_eq!(chained.table.get(5).unwrap().offset, newest);

    // the scan takes the physically last definition
    let scanned = reconstruct_xref(&data, &ParserOptions::default()).unwrap();
    assert_eq!(scanned.get(5).unwrap().offset, second);
}

#[test]
fn test_xref_stream_only_file() {
    let mut builder = PdfBuilder::new();
    let o1 = builder.object(1, CATALOG);
    let o2 = builder.object(2, PAGES);
    let xs_offset = builder.offset();
    let xs = builder.xref_stream(
        3,
        &[(0, 0, 0, 65535), (1, 1, o1 as u32, 0), (2, 1, o2 as u32, 0), (3, 1, xs_offset as u32, 0), (4, 2, 9, 3)],
        "/Root 1 0 R",
    );
    let data = builder.finish(xs);

    let info = load_xref(&data, &ParserOptions::default()).unwrap();
    assert!(!info.recovered);
    assert_eq!(info.table.get(1).unwrap().offset, o1);
    assert_eq!(info.table.get(3).unwrap().offset, xs);
    assert_eq!(info.table.get(4).unwrap().entry_type, XRefEntryType::Compressed);
    assert!(info.trailer.get("Type").and_then(Object::as_name) == Some("XRef"));
}

#[test]
fn test_xref_stream_unknown_row_type_ignored() {
    let mut builder = PdfBuilder::new();
    let o1 = builder.object(1, CATALOG);
    let xs = builder.xref_stream(2, &[(1, 1, o1 as u32, 0), (6, 7, 1, 1)], "/Root 1 0 R");
    let data = builder.finish(xs);

    let info = load_xref(&data, &ParserOptions::default()).unwrap();
    assert!(info.table.contains(1));
    assert!(!info.table.contains(6));
}

#[test]
fn test_linearized_hint_with_backward_search() {
    let mut builder = PdfBuilder::new();
    let lin_offset = builder.offset();
    // /T is patched below once the table offset is known
    let placeholder = "<< /Linearized 1 /L 0 /T 0000000000 >>";
    builder.object(9, placeholder);
    let o1 = builder.object(1, CATALOG);
    let o2 = builder.object(2, PAGES);
    let x1 = builder.classic_xref(
        &[(1, o1, 0, true), (2, o2, 0, true), (9, lin_offset, 0, true)],
        "<< /Size 10 /Root 1 0 R >>",
    );
    let mut data = builder.finish(lin_offset);

    // point /T a few bytes past the xref keyword
    let hint = format!("{:010}", x1 + 3);
    let at = data.windows(10).position(|w| w == b"0000000000").unwrap();
    data[at..at + 10].copy_from_slice(hint.as_bytes());

    let info = load_xref(&data, &ParserOptions::strict()).unwrap();
    assert!(!info.recovered);
    assert_eq!(info.table.get(1).unwrap().offset, o1);
    assert_eq!(info.table.get(9).unwrap().offset, lin_offset);
}

#[test]
fn test_linearized_hint_without_table_is_invalid() {
    let mut builder = PdfBuilder::new();
    let lin = builder.object(1, "<< /Linearized 1 /T 20 >>");
    let data = builder.finish(lin);
    assert!(matches!(
        load_xref(&data, &ParserOptions::strict()),
        Err(Error::InvalidXref)
    ));
}

#[test]
fn test_prev_loop_stops_walk() {
    let mut builder = PdfBuilder::new();
    let o1 = builder.object(1, CATALOG);
    let x_at = builder.offset();
    let x1 = builder.classic_xref(&[(1, o1, 0, true)], &format!("<< /Size 2 /Root 1 0 R /Prev {} >>", x_at));
    assert_eq!(x1, x_at);
    let data = builder.finish(x1);

    let info = load_xref(&data, &ParserOptions::strict()).unwrap();
    assert!(!info.recovered);
    assert_eq!(info.table.len(), 1);
}

#[test]
fn test_chain_length_limit() {
    let mut builder = PdfBuilder::new();
    let (_, _, x1) = base_document(&mut builder);
    let x2 = builder.classic_xref(&[(3, 0, 0, false)], &format!("<< /Size 4 /Prev {} >>", x1));
    let data = builder.finish(x2);

    let options = ParserOptions {
        max_xref_chain_length: 1,
        ..ParserOptions::strict()
    };
    let reader = XRefReader::new(&data, options);
    assert!(matches!(reader.read_chain(x2), Err(Error::RecursionLimitExceeded(1))));
}

#[test]
fn test_bad_startxref_recovers_when_lenient() {
    let mut builder = PdfBuilder::new();
    let (o1, _, _) = base_document(&mut builder);
    let data = builder.finish(5);

    assert!(load_xref(&data, &ParserOptions::strict()).is_err());

    let info = load_xref(&data, &ParserOptions::default()).unwrap();
    assert!(info.recovered);
    assert_eq!(info.table.get(1).unwrap().offset, o1);
    assert!(info.trailer.contains_key("Root"));
}

#[test]
fn test_broken_xref_stream_always_recovers() {
    let mut builder = PdfBuilder::new();
    let o1 = builder.object(1, CATALOG);
    // /W has only two widths
    let xs = builder.stream_object(2, "/Type /XRef /W [1 4] /Size 3 /Root 1 0 R", &[1, 0, 0, 0, 9]);
    let data = builder.finish(xs);

    let info = load_xref(&data, &ParserOptions::strict()).unwrap();
    assert!(info.recovered);
    assert_eq!(info.table.get(1).unwrap().offset, o1);
}

#[test]
fn test_missing_header_tolerated() {
    let mut builder = PdfBuilder::without_header();
    let (o1, _, x1) = base_document(&mut builder);
    let data = builder.finish(x1);

    let info = load_xref(&data, &ParserOptions::default()).unwrap();
    assert_eq!(info.version, None);
    assert_eq!(info.table.get(1).unwrap().offset, o1);
}

#[test]
fn test_load_from_reader() {
    let mut builder = PdfBuilder::new();
    let (_, _, x1) = base_document(&mut builder);
    let data = builder.finish(x1);

    let mut cursor = std::io::Cursor::new(data.clone());
    let from_reader = load_xref_from_reader(&mut cursor, &ParserOptions::default()).unwrap();
    assert_eq!(from_reader, load_xref(&data, &ParserOptions::default()).unwrap());
}
