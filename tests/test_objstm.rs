//! Object streams: the `(number, offset)` header and the objects behind it.

use bytes::Bytes;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_core::object::{Dictionary, Object, ObjectRef};
use pdf_core::objstm::{object_stream_index, parse_object_stream, parse_object_stream_with_options};
use pdf_core::parser_config::ParserOptions;
use pdf_core::Error;
use std::io::Write;

/// Header pairs and object bodies, separated by single spaces.
fn body(members: &[(u32, &str)]) -> (Vec<u8>, i64) {
    let mut header = String::new();
    let mut objects = String::new();
    for (number, text) in members {
        header.push_str(&format!("{} {} ", number, objects.len()));
        objects.push_str(text);
        objects.push(' ');
    }
    let first = header.len() as i64;
    ((header + &objects).into_bytes(), first)
}

fn stream_with(entries: &[(&str, Object)], data: Vec<u8>) -> Object {
    let mut dict = Dictionary::new();
    dict.insert("Type".to_string(), Object::Name("ObjStm".to_string()));
    for (key, value) in entries {
        dict.insert(key.to_string(), value.clone());
    }
    dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
    Object::Stream {
        dict,
        data: Bytes::from(data),
    }
}

fn objstm(members: &[(u32, &str)]) -> Object {
    let (data, first) = body(members);
    stream_with(
        &[
            ("N", Object::Integer(members.len() as i64)),
            ("First", Object::Integer(first)),
        ],
        data,
    )
}

#[test]
fn test_scalars() {
    let objects = parse_object_stream(&objstm(&[(10, "42"), (11, "/Test"), (12, "true"), (13, "null")])).unwrap();
    assert_eq!(objects.len(), 4);
    assert_eq!(objects[&10].as_integer(), Some(42));
    assert_eq!(objects[&11].as_name(), Some("Test"));
    assert_eq!(objects[&12].as_bool(), Some(true));
    assert_eq!(objects[&13], Object::Null);
}

#[test]
fn test_strings_and_containers() {
    let objects = parse_object_stream(&objstm(&[
        (30, "(Hello World)"),
        (31, "<48656C6C6F>"),
        (40, "<< /Kids [ 1 0 R [ 2 3 ] ] /Info << /Nested true >> >>"),
    ]))
    .unwrap();
    assert_eq!(objects[&30].as_string(), Some(&b"Hello World"[..]));
    assert_eq!(objects[&31].as_string(), Some(&b"Hello"[..]));

    let dict = objects[&40].as_dict().unwrap();
    let kids = dict["Kids"].as_array().unwrap();
    assert_eq!(kids[0].as_reference(), Some(ObjectRef::new(1, 0)));
    assert_eq!(kids[1].as_array().map(Vec::len), Some(2));
    assert_eq!(dict["Info"].as_dict().unwrap()["Nested"].as_bool(), Some(true));
}

#[test]
fn test_loose_header_whitespace() {
    let data = b"  10   0 \n  11   3\r\n42 99".to_vec();
    let stream = stream_with(&[("N", Object::Integer(2)), ("First", Object::Integer(20))], data);
    let objects = parse_object_stream(&stream).unwrap();
    assert_eq!(objects[&10].as_integer(), Some(42));
    assert_eq!(objects[&11].as_integer(), Some(99));
}

#[test]
fn test_large_object_numbers() {
    let objects = parse_object_stream(&objstm(&[(999_999, "true"), (1_000_000, "false")])).unwrap();
    assert_eq!(objects[&999_999].as_bool(), Some(true));
    assert_eq!(objects[&1_000_000].as_bool(), Some(false));
}

#[test]
fn test_empty_stream() {
    assert!(parse_object_stream(&objstm(&[])).unwrap().is_empty());
}

#[test]
fn test_malformed_member_is_skipped() {
    let objects = parse_object_stream(&objstm(&[(60, "true"), (61, "[[[[[")])).unwrap();
    assert_eq!(objects.len(), 1);
    assert!(!objects.contains_key(&61));
}

#[test]
fn test_member_offset_past_the_end_is_skipped() {
    let data = b"1 0 2 500 7".to_vec();
    let stream = stream_with(&[("N", Object::Integer(2)), ("First", Object::Integer(10))], data);
    let objects = parse_object_stream(&stream).unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[&1].as_integer(), Some(7));
}

#[test]
fn test_header_problems() {
    let (data, first) = body(&[(1, "42")]);
    let cases = [
        vec![("First", Object::Integer(first))],
        vec![("N", Object::Integer(1))],
        vec![("N", Object::Integer(-1)), ("First", Object::Integer(first))],
        vec![("N", Object::Integer(2_000_000)), ("First", Object::Integer(first))],
        vec![("N", Object::Integer(1)), ("First", Object::Integer(1000))],
        vec![("N", Object::Integer(3)), ("First", Object::Integer(first))],
    ];
    for entries in cases {
        let stream = stream_with(&entries, data.clone());
        assert!(parse_object_stream(&stream).is_err(), "accepted {:?}", entries);
    }
    assert!(matches!(
        parse_object_stream(&Object::Integer(42)),
        Err(Error::InvalidObjectType { .. })
    ));
}

#[test]
fn test_index_keeps_header_order() {
    let stream = objstm(&[(8, "1"), (3, "(two)"), (5, "/Three")]);
    let index = object_stream_index(&stream, &ParserOptions::default()).unwrap();
    assert_eq!(index, vec![(8, 0), (3, 2), (5, 8)]);
}

#[test]
fn test_flate_compressed_stream() {
    let (plain, first) = body(&[(12, "true"), (13, "<< /Type /Catalog /Pages 2 0 R >>")]);
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&plain).unwrap();
    let stream = stream_with(
        &[
            ("N", Object::Integer(2)),
            ("First", Object::Integer(first)),
            ("Filter", Object::Name("FlateDecode".to_string())),
        ],
        encoder.finish().unwrap(),
    );

    let objects = parse_object_stream_with_options(&stream, &ParserOptions::default()).unwrap();
    assert_eq!(objects[&12].as_bool(), Some(true));
    assert!(objects[&13].has_type("Catalog"));
}
