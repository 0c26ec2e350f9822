//! PDF object parser.
//!
//! Recursive descent over the lexer's tokens:
//! 1. Read token from lexer
//! 2. Based on token type, decide how to parse
//! 3. For composite types (arrays, dicts), recursively parse contents
//!
//! All parsing functions return `IResult` from nom so callers can keep the
//! remaining input; [`parse_indirect_object`] is the entry point for the
//! `N G obj ... endobj` wrapper used by cross-reference streams and object
//! streams.

use crate::decoders::{AsciiHexDecoder, StreamDecoder};
use crate::error::Result;
use crate::lexer::{token, Token};
use crate::object::{Dictionary, Object, ObjectRef};
use nom::IResult;

fn fail(input: &[u8], kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Decode escape sequences in a literal string.
///
/// Handles `\n \r \t \b \f \( \) \\`, octal `\ddd` (1-3 digits) and line
/// continuations. An unknown escape keeps the backslash.
///
/// ```
/// # use pdf_core::parser::decode_literal_string_escapes;
/// assert_eq!(decode_literal_string_escapes(b"Section \\247"), b"Section \xa7");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 >= raw.len() {
            result.push(raw[i]);
            i += 1;
            continue;
        }

        let escaped = raw[i + 1];
        i += 2;
        match escaped {
            b'n' => result.push(b'\n'),
            b'r' => result.push(b'\r'),
            b't' => result.push(b'\t'),
            b'b' => result.push(0x08),
            b'f' => result.push(0x0C),
            b'(' | b')' | b'\\' => result.push(escaped),
            b'\n' => {},
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut code = (escaped - b'0') as u32;
                let mut digits = 1;
                while digits < 3 && matches!(raw.get(i), Some(b'0'..=b'7')) {
                    code = code * 8 + (raw[i] - b'0') as u32;
                    i += 1;
                    digits += 1;
                }
                result.push((code & 0xFF) as u8);
            },
            other => {
                result.push(b'\\');
                result.push(other);
            },
        }
    }

    result
}

/// Decode a hex string body to bytes, ignoring whitespace.
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    AsciiHexDecoder.decode(hex_bytes)
}

/// Parse a PDF object from input bytes.
///
/// Handles null, booleans, numbers, strings, names, arrays, dictionaries,
/// streams and indirect references (`10 0 R`).
///
/// ```
/// use pdf_core::parser::parse_object;
///
/// let (_, obj) = parse_object(b"<< /Type /XRef /W [1 2 1] >>").unwrap();
/// assert!(obj.has_type("XRef"));
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, tok) = token(input)?;

    match tok {
        Token::Null => Ok((input, Object::Null)),
        Token::True => Ok((input, Object::Boolean(true))),
        Token::False => Ok((input, Object::Boolean(false))),

        Token::Integer(i) => {
            // Could be the start of an indirect reference (obj_num gen R)
            if let Ok((after_gen, Token::Integer(gen))) = token(input) {
                if let Ok((after_r, Token::R)) = token(after_gen) {
                    if (0..=u32::MAX as i64).contains(&i) && (0..=u16::MAX as i64).contains(&gen)
                    {
                        let reference = ObjectRef::new(i as u32, gen as u16);
                        return Ok((after_r, Object::Reference(reference)));
                    }
                }
            }
            Ok((input, Object::Integer(i)))
        },

        Token::Real(r) => Ok((input, Object::Real(r))),
        Token::LiteralString(raw) => Ok((input, Object::String(decode_literal_string_escapes(raw)))),
        Token::HexString(hex) => match decode_hex(hex) {
            Ok(decoded) => Ok((input, Object::String(decoded))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::HexDigit,
            ))),
        },
        Token::Name(name) => Ok((input, Object::Name(name))),
        Token::ArrayStart => parse_array(input),

        Token::DictStart => {
            let (remaining, dict) = parse_dictionary(input)?;

            if let Ok((stream_input, Token::StreamStart)) = token(remaining) {
                let (rest, data) = parse_stream_data(stream_input, &dict)?;
                return Ok((
                    rest,
                    Object::Stream {
                        dict,
                        data: bytes::Bytes::from(data),
                    },
                ));
            }

            Ok((remaining, Object::Dictionary(dict)))
        },

        _ => Err(fail(input, nom::error::ErrorKind::Tag)),
    }
}

/// Parse stream data after the `stream` keyword.
///
/// The keyword should be followed by CRLF or LF; a lone CR or no EOL at all
/// is accepted with a warning. `/Length` is used when it is a direct integer
/// that fits, otherwise the data runs to the next `endstream`.
fn parse_stream_data<'a>(input: &'a [u8], dict: &Dictionary) -> IResult<&'a [u8], Vec<u8>> {
    let input = if let Some(rest) = input.strip_prefix(b"\r\n") {
        rest
    } else if let Some(rest) = input.strip_prefix(b"\n") {
        rest
    } else if let Some(rest) = input.strip_prefix(b"\r") {
        log::warn!("Stream keyword followed by CR alone");
        rest
    } else {
        log::warn!("No end-of-line after stream keyword");
        input
    };

    let declared = dict
        .get("Length")
        .and_then(Object::as_integer)
        .filter(|&len| len >= 0 && len as usize <= input.len());

    if let Some(length) = declared {
        let length = length as usize;
        if let Ok((rest, Token::StreamEnd)) = token(&input[length..]) {
            return Ok((rest, input[..length].to_vec()));
        }
        log::debug!("Stream /Length {} does not end at endstream, scanning", length);
    }

    match find_endstream(input) {
        Some(pos) => {
            let mut data = &input[..pos];
            // Drop the EOL that precedes endstream
            if let Some(stripped) = data.strip_suffix(b"\n") {
                data = stripped.strip_suffix(b"\r").unwrap_or(stripped);
            } else if let Some(stripped) = data.strip_suffix(b"\r") {
                data = stripped;
            }
            Ok((&input[pos + b"endstream".len()..], data.to_vec()))
        },
        None => Err(fail(input, nom::error::ErrorKind::Eof)),
    }
}

/// Find the position of the `endstream` keyword.
fn find_endstream(input: &[u8]) -> Option<usize> {
    let keyword = b"endstream";
    input
        .windows(keyword.len())
        .position(|window| window == keyword)
}

/// Parse a PDF array body after `[`. An array cut off by end of input
/// returns what was parsed.
fn parse_array(input: &[u8]) -> IResult<&[u8], Object> {
    let mut objects = Vec::new();
    let mut remaining = input;

    loop {
        match token(remaining) {
            Ok((rest, Token::ArrayEnd)) => return Ok((rest, Object::Array(objects))),
            Ok(_) => {
                let (rest, obj) = parse_object(remaining)?;
                objects.push(obj);
                remaining = rest;
            },
            Err(_) if remaining.iter().all(|&c| crate::lexer::is_whitespace(c)) => {
                return Ok((&remaining[remaining.len()..], Object::Array(objects)));
            },
            Err(e) => return Err(e),
        }
    }
}

/// Parse a PDF dictionary body after `<<`. Keys must be names.
fn parse_dictionary(input: &[u8]) -> IResult<&[u8], Dictionary> {
    let mut dict = Dictionary::new();
    let mut remaining = input;

    loop {
        match token(remaining) {
            Ok((rest, Token::DictEnd)) => return Ok((rest, dict)),
            Ok((rest, Token::Name(key))) => {
                let (rest, value) = parse_object(rest)?;
                dict.insert(key, value);
                remaining = rest;
            },
            Ok(_) => return Err(fail(remaining, nom::error::ErrorKind::Tag)),
            Err(_) if remaining.iter().all(|&c| crate::lexer::is_whitespace(c)) => {
                return Ok((&remaining[remaining.len()..], dict));
            },
            Err(e) => return Err(e),
        }
    }
}

/// Parse an `N G obj` header.
pub fn parse_object_header(input: &[u8]) -> IResult<&[u8], ObjectRef> {
    let (rest, number) = token(input)?;
    let (rest, generation) = token(rest)?;
    let (rest, keyword) = token(rest)?;
    match (number, generation, keyword) {
        (Token::Integer(n), Token::Integer(g), Token::ObjStart)
            if (0..=u32::MAX as i64).contains(&n) && (0..=u16::MAX as i64).contains(&g) =>
        {
            Ok((rest, ObjectRef::new(n as u32, g as u16)))
        },
        _ => Err(fail(input, nom::error::ErrorKind::Tag)),
    }
}

/// Parse a complete indirect object: `N G obj <object> endobj`.
///
/// A missing `endobj` is tolerated.
pub fn parse_indirect_object(input: &[u8]) -> IResult<&[u8], (ObjectRef, Object)> {
    let (rest, reference) = parse_object_header(input)?;
    let (rest, object) = parse_object(rest)?;
    let rest = match token(rest) {
        Ok((after, Token::ObjEnd)) => after,
        _ => rest,
    };
    Ok((rest, (reference, object)))
}
