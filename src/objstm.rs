//! Object stream parsing (PDF 1.5+).
//!
//! Object streams (`/Type /ObjStm`) bundle several indirect objects into one
//! compressed stream. Objects stored this way are addressed by
//! `(container object number, index)` rather than by a byte offset.
//!
//! # Format
//!
//! ```text
//! N 0 obj
//! << /Type /ObjStm /N 3 /First 14 /Filter /FlateDecode >>
//! stream
//! 10 0 11 15 12 28    % N pairs: (object number, offset relative to /First)
//! <object 10> <object 11> <object 12>
//! endstream
//! endobj
//! ```

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::Object;
use crate::parser::parse_object;
use crate::parser_config::ParserOptions;
use std::collections::HashMap;

/// Decoded object stream: its header pairs plus the object data section.
struct ObjectStreamData {
    pairs: Vec<(u32, usize)>,
    data: Vec<u8>,
    first: usize,
}

fn decode_object_stream(stream_obj: &Object, options: &ParserOptions) -> Result<ObjectStreamData> {
    let dict = match stream_obj {
        Object::Stream { dict, .. } => dict,
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: other.type_name().to_string(),
            })
        },
    };

    if let Some(type_name) = dict.get("Type").and_then(Object::as_name) {
        if type_name != "ObjStm" {
            return Err(Error::InvalidPdf(format!(
                "expected /Type /ObjStm, got /Type /{}",
                type_name
            )));
        }
    }

    let n = dict
        .get("N")
        .and_then(Object::as_integer)
        .ok_or_else(|| Error::InvalidPdf("object stream missing /N entry".to_string()))?;
    let first = dict
        .get("First")
        .and_then(Object::as_integer)
        .ok_or_else(|| Error::InvalidPdf("object stream missing /First entry".to_string()))?;

    if !(0..=1_000_000).contains(&n) {
        return Err(Error::InvalidPdf(format!("invalid object stream /N value: {}", n)));
    }
    if first < 0 {
        return Err(Error::InvalidPdf(format!("invalid object stream /First value: {}", first)));
    }

    let data = stream_obj.decode_stream_data_with_options(options)?;
    let first = first as usize;
    if data.len() < first {
        return Err(Error::InvalidPdf(format!(
            "object stream data too short: {} bytes, /First is {}",
            data.len(),
            first
        )));
    }

    let pairs = parse_pairs(&data[..first], n as usize)?;
    Ok(ObjectStreamData { pairs, data, first })
}

/// Parse the `N` integer pairs that head an object stream.
fn parse_pairs(header: &[u8], count: usize) -> Result<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(count);
    let mut remaining = header;

    for i in 0..count {
        let mut pair = [0i64; 2];
        for slot in pair.iter_mut() {
            match token(remaining) {
                Ok((rest, Token::Integer(value))) if value >= 0 => {
                    *slot = value;
                    remaining = rest;
                },
                _ => {
                    return Err(Error::ParseError {
                        offset: header.len() - remaining.len(),
                        reason: format!("malformed object stream header pair {}", i),
                    })
                },
            }
        }
        let number = u32::try_from(pair[0]).map_err(|_| Error::ParseError {
            offset: header.len() - remaining.len(),
            reason: format!("object number {} out of range", pair[0]),
        })?;
        pairs.push((number, pair[1] as usize));
    }

    Ok(pairs)
}

/// Object numbers stored in an object stream, in index order.
///
/// Element `i` is `(object number, offset relative to /First)` for the object
/// at index `i`. Only the header is parsed; the objects themselves are not.
pub fn object_stream_index(stream_obj: &Object, options: &ParserOptions) -> Result<Vec<(u32, usize)>> {
    Ok(decode_object_stream(stream_obj, options)?.pairs)
}

/// Parse an object stream with default limits.
pub fn parse_object_stream(stream_obj: &Object) -> Result<HashMap<u32, Object>> {
    parse_object_stream_with_options(stream_obj, &ParserOptions::default())
}

/// Parse every object in an object stream.
///
/// Each member is parsed within its own extent, up to the next member's
/// offset. Members whose offset is out of range, that fail to parse, or that
/// leave an array or dictionary open are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the object is not a stream, is typed as something
/// other than `/ObjStm`, lacks `/N` or `/First`, or cannot be decoded.
pub fn parse_object_stream_with_options(
    stream_obj: &Object,
    options: &ParserOptions,
) -> Result<HashMap<u32, Object>> {
    let decoded = decode_object_stream(stream_obj, options)?;
    let body = &decoded.data[decoded.first..];
    let mut result = HashMap::with_capacity(decoded.pairs.len());

    let mut bounds: Vec<usize> = decoded.pairs.iter().map(|&(_, offset)| offset).collect();
    bounds.sort_unstable();
    bounds.dedup();

    for (obj_num, offset) in decoded.pairs {
        if offset >= body.len() {
            log::warn!(
                "Object {} offset {} is beyond object stream data length {}",
                obj_num,
                offset,
                body.len()
            );
            continue;
        }
        // a member ends where the next one starts
        let end = bounds
            .get(bounds.partition_point(|&b| b <= offset))
            .map_or(body.len(), |&next| next.min(body.len()));
        let member = &body[offset..end];

        match parse_object(member) {
            Ok((rest, obj)) if delimiters_balance(&member[..member.len() - rest.len()]) => {
                result.insert(obj_num, obj);
            },
            Ok(_) => {
                log::warn!("Object {} in object stream has an unclosed array or dictionary", obj_num);
            },
            Err(e) => {
                log::warn!("Failed to parse object {} from object stream: {:?}", obj_num, e);
            },
        }
    }

    Ok(result)
}

/// Whether every `[` and `<<` in `span` is closed within it.
///
/// The object parser closes containers left open at end of input, which is
/// right for a damaged file tail but not for a member with a known extent.
fn delimiters_balance(mut span: &[u8]) -> bool {
    let mut depth = 0usize;
    while let Ok((rest, tok)) = token(span) {
        match tok {
            Token::ArrayStart | Token::DictStart => depth += 1,
            Token::ArrayEnd | Token::DictEnd => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {},
        }
        span = rest;
    }
    depth == 0
}
