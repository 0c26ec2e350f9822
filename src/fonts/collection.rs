//! TrueType collections (`.ttc`).
//!
//! A collection stores several fonts that share table data. Its header lists
//! the offset of each member font's offset table; every member addresses its
//! tables relative to the start of the file.
//!
//! ```text
//! 'ttcf' majorVersion(2) minorVersion(2) numFonts(4) offsets[numFonts](4)
//! version 2 only: dsigTag(4) dsigLength(4) dsigOffset(4)
//! ```
//!
//! Member fonts are parsed the first time they are requested.

use super::truetype_parser::{cached, SFNT_VERSION_CFF};
use super::{Tag, TrueTypeFont};
use crate::byte_buffer::ByteBuffer;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Largest member count accepted before a header is treated as corrupt.
pub const MAX_FONTS: u32 = 1024;

/// Collection version that adds the DSIG fields.
pub const TTC_VERSION_2_0: u32 = 0x0002_0000;

/// Location of the collection's digital signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsigInfo {
    /// Signature tag, `DSIG`
    pub tag: Tag,
    /// Length in bytes
    pub length: u32,
    /// Offset from the start of the file
    pub offset: u32,
}

/// A parsed TrueType collection.
#[derive(Debug)]
pub struct TrueTypeCollection {
    data: Bytes,
    version: u32,
    offsets: Vec<u32>,
    dsig: Option<DsigInfo>,
    fonts: Vec<OnceLock<Arc<TrueTypeFont>>>,
}

impl TrueTypeCollection {
    /// Parse a collection header.
    ///
    /// # Errors
    ///
    /// [`Error::Font`] when the tag is not `ttcf`, the font count is 0 or
    /// above [`MAX_FONTS`], or the offset array runs past the data.
    pub fn parse(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let mut buf = ByteBuffer::from(data.as_ref());
        let truncated = |_| Error::Font("collection header is truncated".to_string());

        let tag = Tag::new(buf.read_tag().map_err(truncated)?);
        if tag != Tag::TTCF {
            return Err(Error::Font(format!("expected ttcf collection tag, found {}", tag)));
        }
        let version = buf.read_u32().map_err(truncated)?;
        let num_fonts = buf.read_u32().map_err(truncated)?;
        if num_fonts == 0 || num_fonts > MAX_FONTS {
            return Err(Error::Font(format!("invalid collection font count {}", num_fonts)));
        }
        if buf.available() < num_fonts as usize * 4 {
            return Err(Error::Font(format!(
                "offsets of {} fonts do not fit in {} bytes",
                num_fonts,
                data.len()
            )));
        }

        let offsets = (0..num_fonts)
            .map(|_| buf.read_u32())
            .collect::<Result<Vec<_>>>()
            .map_err(truncated)?;

        let dsig = if version >= TTC_VERSION_2_0 {
            let fields =
                (|| -> Result<(u32, u32, u32)> { Ok((buf.read_u32()?, buf.read_u32()?, buf.read_u32()?)) })();
            match fields {
                Ok((0, _, _)) => None,
                Ok((tag, length, offset)) => Some(DsigInfo {
                    tag: Tag::from_u32(tag),
                    length,
                    offset,
                }),
                Err(_) => {
                    log::warn!("Version 2 collection header has no DSIG fields");
                    None
                },
            }
        } else {
            None
        };

        log::debug!("Parsed ttcf header: version {:#010x}, {} fonts", version, num_fonts);
        let fonts = offsets.iter().map(|_| OnceLock::new()).collect();
        Ok(Self {
            data,
            version,
            offsets,
            dsig,
            fonts,
        })
    }

    /// Read and parse a collection file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(std::fs::read(path)?)
    }

    /// Header version, 0x00010000 or 0x00020000.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of member fonts.
    pub fn num_fonts(&self) -> usize {
        self.offsets.len()
    }

    /// Offsets of the member fonts' offset tables.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Signature location, for version 2 headers that have one.
    pub fn dsig(&self) -> Option<DsigInfo> {
        self.dsig
    }

    /// Member font at `index`, parsed on first request.
    pub fn font_at(&self, index: usize) -> Result<Arc<TrueTypeFont>> {
        let (Some(cell), Some(&offset)) = (self.fonts.get(index), self.offsets.get(index)) else {
            return Err(Error::Font(format!(
                "font index {} out of range for a collection of {}",
                index,
                self.num_fonts()
            )));
        };
        cached(cell, || {
            let font = TrueTypeFont::parse_at(self.data.clone(), offset as usize)?;
            if font.sfnt_version() == SFNT_VERSION_CFF {
                log::debug!("Collection font {} has CFF outlines", index);
            }
            Ok(Arc::new(font))
        })
        .cloned()
    }

    /// First member font whose PostScript name is `name`.
    pub fn font_by_name(&self, name: &str) -> Result<Option<Arc<TrueTypeFont>>> {
        for font in self.fonts() {
            let font = font?;
            if font.postscript_name()? == Some(name) {
                return Ok(Some(font));
            }
        }
        Ok(None)
    }

    /// Every member font in header order.
    pub fn fonts(&self) -> impl Iterator<Item = Result<Arc<TrueTypeFont>>> + '_ {
        (0..self.num_fonts()).map(move |index| self.font_at(index))
    }

    /// Run `f` on each member font, stopping at the first one that fails to
    /// parse.
    pub fn for_each_font<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&TrueTypeFont),
    {
        for font in self.fonts() {
            f(font?.as_ref());
        }
        Ok(())
    }
}
