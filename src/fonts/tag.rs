//! Four-byte sfnt table tags.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A table tag such as `glyf` or `OS/2`.
///
/// Ordering is byte-wise, which is the order an sfnt table directory is
/// sorted in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag([u8; 4]);

impl Tag {
    /// Font header
    pub const HEAD: Tag = Tag(*b"head");
    /// Horizontal header
    pub const HHEA: Tag = Tag(*b"hhea");
    /// Maximum profile
    pub const MAXP: Tag = Tag(*b"maxp");
    /// Glyph locations
    pub const LOCA: Tag = Tag(*b"loca");
    /// Glyph outlines
    pub const GLYF: Tag = Tag(*b"glyf");
    /// Horizontal metrics
    pub const HMTX: Tag = Tag(*b"hmtx");
    /// Character to glyph mapping
    pub const CMAP: Tag = Tag(*b"cmap");
    /// PostScript information
    pub const POST: Tag = Tag(*b"post");
    /// OS/2 and Windows metrics
    pub const OS2: Tag = Tag(*b"OS/2");
    /// Naming table
    pub const NAME: Tag = Tag(*b"name");
    /// Vertical origin
    pub const VORG: Tag = Tag(*b"VORG");
    /// Compact font format outlines
    pub const CFF: Tag = Tag(*b"CFF ");
    /// Digital signature
    pub const DSIG: Tag = Tag(*b"DSIG");
    /// TrueType collection header
    pub const TTCF: Tag = Tag(*b"ttcf");
    /// OpenType font with CFF outlines
    pub const OTTO: Tag = Tag(*b"OTTO");

    /// Create a tag from its four bytes.
    pub const fn new(bytes: [u8; 4]) -> Self {
        Tag(bytes)
    }

    /// Create a tag from its big-endian integer form.
    pub const fn from_u32(value: u32) -> Self {
        Tag(value.to_be_bytes())
    }

    /// Big-endian integer form, as stored in a table directory.
    pub const fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for Tag {
    fn from(bytes: [u8; 4]) -> Self {
        Tag(bytes)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}

impl FromStr for Tag {
    type Err = Error;

    /// Parse one to four ASCII characters; short tags are padded with spaces.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s.len() > 4 || !s.is_ascii() {
            return Err(Error::Font(format!("invalid table tag {:?}", s)));
        }
        let mut bytes = [b' '; 4];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Tag(bytes))
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        assert_eq!(Tag::OS2.to_string(), "OS/2");
        assert_eq!("CFF".parse::<Tag>().unwrap(), Tag::CFF);
        assert_eq!("glyf".parse::<Tag>().unwrap(), Tag::GLYF);
        assert!("toolong".parse::<Tag>().is_err());
        assert!("".parse::<Tag>().is_err());
    }

    #[test]
    fn test_u32_round_trip() {
        assert_eq!(Tag::HEAD.to_u32(), 0x6865_6164);
        assert_eq!(Tag::from_u32(0x6865_6164), Tag::HEAD);
    }

    #[test]
    fn test_directory_ordering() {
        let mut tags = vec![Tag::POST, Tag::OS2, Tag::CMAP, Tag::GLYF, Tag::HEAD];
        tags.sort();
        assert_eq!(tags, vec![Tag::OS2, Tag::CMAP, Tag::GLYF, Tag::HEAD, Tag::POST]);
    }

    #[test]
    fn test_serializes_as_string() {
        assert_eq!(serde_json::to_string(&Tag::NAME).unwrap(), "\"name\"");
    }
}
