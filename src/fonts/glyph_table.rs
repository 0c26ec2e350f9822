//! On-demand access to `glyf` outlines.
//!
//! The `glyf` table is never parsed in bulk. Individual glyphs are decoded
//! when first requested and kept in a shared cache, so one font instance can
//! serve many readers at once.

use super::composite::{read_components, CompositeGlyph, GlyphDescription, Resolve, Resolver};
use super::tables::{HmtxTable, LocaTable};
use crate::byte_buffer::ByteBuffer;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Flag bits of a simple glyph point.
pub mod point_flags {
    /// Point is on the curve
    pub const ON_CURVE: u8 = 0x01;
    /// x delta is one byte
    pub const X_SHORT: u8 = 0x02;
    /// y delta is one byte
    pub const Y_SHORT: u8 = 0x04;
    /// Next byte is a repeat count for this flag
    pub const REPEAT: u8 = 0x08;
    /// Short x is positive, or long x repeats the previous value
    pub const X_SAME_OR_POSITIVE: u8 = 0x10;
    /// Short y is positive, or long y repeats the previous value
    pub const Y_SAME_OR_POSITIVE: u8 = 0x20;
}

/// Glyph bounding box from the glyph header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    #[allow(missing_docs)]
    pub x_min: i16,
    #[allow(missing_docs)]
    pub y_min: i16,
    #[allow(missing_docs)]
    pub x_max: i16,
    #[allow(missing_docs)]
    pub y_max: i16,
}

/// Decoded outline of a simple glyph, coordinates absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleGlyph {
    end_points: Vec<u16>,
    flags: Vec<u8>,
    x_coordinates: Vec<i16>,
    y_coordinates: Vec<i16>,
    instructions: Vec<u8>,
}

impl SimpleGlyph {
    /// Number of points.
    pub fn point_count(&self) -> usize {
        self.flags.len()
    }

    /// Number of contours.
    pub fn contour_count(&self) -> usize {
        self.end_points.len()
    }

    /// Index of the last point of each contour.
    pub fn end_points(&self) -> &[u16] {
        &self.end_points
    }

    /// Per-point flags with the repeat bit expanded.
    pub fn flags(&self) -> &[u8] {
        &self.flags
    }

    #[allow(missing_docs)]
    pub fn x_coordinates(&self) -> &[i16] {
        &self.x_coordinates
    }

    #[allow(missing_docs)]
    pub fn y_coordinates(&self) -> &[i16] {
        &self.y_coordinates
    }

    /// TrueType hinting instructions.
    pub fn instructions(&self) -> &[u8] {
        &self.instructions
    }

    fn read(buf: &mut ByteBuffer, contours: usize) -> Result<Self> {
        let end_points = (0..contours).map(|_| buf.read_u16()).collect::<Result<Vec<u16>>>()?;
        let instruction_length = buf.read_u16()? as usize;
        let instructions = buf.read_slice(instruction_length).to_vec();
        if instructions.len() < instruction_length {
            return Err(Error::UnexpectedEof);
        }

        let point_count = end_points.last().map_or(0, |&last| last as usize + 1);
        let mut flags = Vec::with_capacity(point_count);
        while flags.len() < point_count {
            let flag = buf.read_u8()?;
            flags.push(flag);
            if flag & point_flags::REPEAT != 0 {
                let repeat = buf.read_u8()?;
                flags.extend(std::iter::repeat(flag).take(repeat as usize));
            }
        }
        flags.truncate(point_count);

        let x_coordinates = read_coordinates(buf, &flags, point_flags::X_SHORT, point_flags::X_SAME_OR_POSITIVE)?;
        let y_coordinates = read_coordinates(buf, &flags, point_flags::Y_SHORT, point_flags::Y_SAME_OR_POSITIVE)?;

        Ok(Self {
            end_points,
            flags,
            x_coordinates,
            y_coordinates,
            instructions,
        })
    }
}

fn read_coordinates(buf: &mut ByteBuffer, flags: &[u8], short: u8, same_or_positive: u8) -> Result<Vec<i16>> {
    let mut value = 0i16;
    let mut coordinates = Vec::with_capacity(flags.len());
    for &flag in flags {
        let delta = if flag & short != 0 {
            let magnitude = buf.read_u8()? as i16;
            if flag & same_or_positive != 0 {
                magnitude
            } else {
                -magnitude
            }
        } else if flag & same_or_positive != 0 {
            0
        } else {
            buf.read_i16()?
        };
        value = value.wrapping_add(delta);
        coordinates.push(value);
    }
    Ok(coordinates)
}

/// The outline part of a glyph.
#[derive(Debug, Clone)]
pub enum GlyphOutline {
    /// Zero-length `loca` range: a glyph with no outline, such as a space
    Empty,
    /// Points and contours
    Simple(Arc<SimpleGlyph>),
    /// Transformed references to other glyphs
    Composite(CompositeGlyph),
}

/// One decoded glyph.
#[derive(Debug, Clone)]
pub struct GlyphData {
    /// Glyph id
    pub gid: u16,
    /// Bounding box, zero for empty glyphs
    pub bounds: Bounds,
    /// Left side bearing from `hmtx`
    pub left_side_bearing: i16,
    /// The outline
    pub outline: GlyphOutline,
}

impl GlyphData {
    /// Whether the glyph is built from components.
    pub fn is_composite(&self) -> bool {
        matches!(self.outline, GlyphOutline::Composite(_))
    }

    /// Whether the glyph has no outline.
    pub fn is_empty(&self) -> bool {
        matches!(self.outline, GlyphOutline::Empty)
    }
}

fn read_outline(buf: &mut ByteBuffer) -> Result<(Bounds, GlyphOutline)> {
    let contours = buf.read_i16()?;
    let bounds = Bounds {
        x_min: buf.read_i16()?,
        y_min: buf.read_i16()?,
        x_max: buf.read_i16()?,
        y_max: buf.read_i16()?,
    };
    let outline = if contours >= 0 {
        GlyphOutline::Simple(Arc::new(SimpleGlyph::read(buf, contours as usize)?))
    } else {
        GlyphOutline::Composite(read_components(buf)?)
    };
    Ok((bounds, outline))
}

/// Lazily decoded `glyf` table.
#[derive(Debug)]
pub struct GlyphTable {
    glyf: Bytes,
    loca: LocaTable,
    hmtx: HmtxTable,
    max_component_depth: u16,
    cache: Mutex<HashMap<u16, Arc<GlyphData>>>,
    descriptions: Mutex<HashMap<u16, GlyphDescription>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl GlyphTable {
    /// Create a table over raw `glyf` bytes.
    pub fn new(glyf: Bytes, loca: LocaTable, hmtx: HmtxTable, max_component_depth: u16) -> Self {
        Self {
            glyf,
            loca,
            hmtx,
            max_component_depth,
            cache: Mutex::new(HashMap::new()),
            descriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of glyphs `loca` describes.
    pub fn num_glyphs(&self) -> usize {
        self.loca.num_glyphs()
    }

    /// Deepest composite nesting the font declares.
    pub fn max_component_depth(&self) -> u16 {
        self.max_component_depth
    }

    /// Raw bytes of one glyph, empty for glyphs without an outline.
    ///
    /// Returns `None` when `gid` is out of range or its `loca` range does not
    /// fit inside `glyf`.
    pub fn raw_glyph(&self, gid: u16) -> Option<&[u8]> {
        let range = self.loca.glyph_range(gid)?;
        if range.end > self.glyf.len() {
            log::warn!(
                "Glyph {} range {:?} exceeds glyf length {}",
                gid,
                range,
                self.glyf.len()
            );
            return None;
        }
        Some(&self.glyf[range])
    }

    /// Decode a glyph, or fetch it from the cache.
    ///
    /// Each glyph is decoded at most once; concurrent callers asking for the
    /// same glyph receive the same `Arc`. Returns `Ok(None)` for an
    /// out-of-range `gid`.
    pub fn glyph(&self, gid: u16) -> Result<Option<Arc<GlyphData>>> {
        let mut cache = locked(&self.cache);
        if let Some(glyph) = cache.get(&gid) {
            return Ok(Some(Arc::clone(glyph)));
        }
        let Some(raw) = self.raw_glyph(gid) else {
            return Ok(None);
        };
        let glyph = Arc::new(self.decode(gid, raw)?);
        cache.insert(gid, Arc::clone(&glyph));
        Ok(Some(glyph))
    }

    fn decode(&self, gid: u16, raw: &[u8]) -> Result<GlyphData> {
        let left_side_bearing = self.hmtx.left_side_bearing(gid);
        if raw.is_empty() {
            return Ok(GlyphData {
                gid,
                bounds: Bounds::default(),
                left_side_bearing,
                outline: GlyphOutline::Empty,
            });
        }

        let mut buf = ByteBuffer::from(raw);
        let decoded = read_outline(&mut buf);
        let (bounds, outline) = decoded.map_err(|e| match e {
            Error::UnexpectedEof => Error::Font(format!("glyph {} is truncated", gid)),
            other => other,
        })?;
        Ok(GlyphData {
            gid,
            bounds,
            left_side_bearing,
            outline,
        })
    }

    /// Resolved description of a glyph, composites flattened.
    ///
    /// Returns `Ok(None)` for an out-of-range `gid`.
    ///
    /// # Errors
    ///
    /// [`Error::CompositeDepthExceeded`] when components nest deeper than the
    /// font's `maxComponentDepth`.
    pub fn description(&self, gid: u16) -> Result<Option<GlyphDescription>> {
        match Resolver::new(self).resolve(gid)? {
            Resolve::Resolved(description) => Ok(Some(description)),
            Resolve::CycleDetected { .. } | Resolve::Missing { .. } => Ok(None),
        }
    }

    pub(crate) fn cached_description(&self, gid: u16) -> Option<GlyphDescription> {
        locked(&self.descriptions).get(&gid).cloned()
    }

    pub(crate) fn store_description(&self, gid: u16, description: GlyphDescription) {
        locked(&self.descriptions).entry(gid).or_insert(description);
    }
}
