//! Composite glyphs and their resolution.
//!
//! A composite glyph is a list of components, each a reference to another
//! glyph plus a transform. Resolving a composite walks that graph and lays
//! every component's points and contours out in one flattened index space.
//!
//! Fonts in the wild contain composites that reference themselves, directly
//! or through other glyphs. Resolution tracks a state per glyph and reports
//! a cycle as [`Resolve::CycleDetected`] instead of recursing forever.

use super::glyph_table::{GlyphOutline, GlyphTable, SimpleGlyph};
use crate::byte_buffer::ByteBuffer;
use crate::error::{Error, Result};
use bitflags::bitflags;
use std::collections::HashMap;
use std::sync::Arc;

bitflags! {
    /// Flags of one component record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ComponentFlags: u16 {
        /// Arguments are 16-bit
        const ARG_1_AND_2_ARE_WORDS = 0x0001;
        /// Arguments are an x/y offset rather than point numbers
        const ARGS_ARE_XY_VALUES = 0x0002;
        /// Round the offset to the pixel grid
        const ROUND_XY_TO_GRID = 0x0004;
        /// One uniform scale follows
        const WE_HAVE_A_SCALE = 0x0008;
        /// Another component follows this one
        const MORE_COMPONENTS = 0x0020;
        /// Separate x and y scales follow
        const WE_HAVE_AN_X_AND_Y_SCALE = 0x0040;
        /// A full 2x2 matrix follows
        const WE_HAVE_A_TWO_BY_TWO = 0x0080;
        /// Instructions follow the last component
        const WE_HAVE_INSTRUCTIONS = 0x0100;
        /// Use this component's metrics for the composite
        const USE_MY_METRICS = 0x0200;
        /// Components overlap
        const OVERLAP_COMPOUND = 0x0400;
    }
}

impl ComponentFlags {
    /// Size of the two arguments in bytes.
    pub fn argument_size(self) -> usize {
        if self.contains(Self::ARG_1_AND_2_ARE_WORDS) {
            4
        } else {
            2
        }
    }

    /// Size of the transform fields in bytes.
    pub fn transform_size(self) -> usize {
        if self.contains(Self::WE_HAVE_A_SCALE) {
            2
        } else if self.contains(Self::WE_HAVE_AN_X_AND_Y_SCALE) {
            4
        } else if self.contains(Self::WE_HAVE_A_TWO_BY_TWO) {
            8
        } else {
            0
        }
    }
}

/// One component of a composite glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Component flags
    pub flags: ComponentFlags,
    /// Referenced glyph
    pub glyph_index: u16,
    /// First argument: x offset or parent point number
    pub arg1: i32,
    /// Second argument: y offset or child point number
    pub arg2: i32,
    /// `[xscale, scale01, scale10, yscale]`
    pub transform: [f64; 4],
    /// x offset, zero unless the arguments are x/y values
    pub x_translate: i32,
    /// y offset, zero unless the arguments are x/y values
    pub y_translate: i32,
}

fn read_f2dot14(buf: &mut ByteBuffer) -> Result<f64> {
    Ok(buf.read_i16()? as f64 / 16384.0)
}

impl Component {
    /// Read one component record.
    pub fn read(buf: &mut ByteBuffer) -> Result<Self> {
        let flags = ComponentFlags::from_bits_retain(buf.read_u16()?);
        let glyph_index = buf.read_u16()?;
        let xy = flags.contains(ComponentFlags::ARGS_ARE_XY_VALUES);

        let (arg1, arg2) = match (flags.contains(ComponentFlags::ARG_1_AND_2_ARE_WORDS), xy) {
            (true, true) => (buf.read_i16()? as i32, buf.read_i16()? as i32),
            (true, false) => (buf.read_u16()? as i32, buf.read_u16()? as i32),
            (false, true) => (buf.read_i8()? as i32, buf.read_i8()? as i32),
            (false, false) => (buf.read_u8()? as i32, buf.read_u8()? as i32),
        };

        let transform = if flags.contains(ComponentFlags::WE_HAVE_A_SCALE) {
            let scale = read_f2dot14(buf)?;
            [scale, 0.0, 0.0, scale]
        } else if flags.contains(ComponentFlags::WE_HAVE_AN_X_AND_Y_SCALE) {
            let x_scale = read_f2dot14(buf)?;
            [x_scale, 0.0, 0.0, read_f2dot14(buf)?]
        } else if flags.contains(ComponentFlags::WE_HAVE_A_TWO_BY_TWO) {
            [read_f2dot14(buf)?, read_f2dot14(buf)?, read_f2dot14(buf)?, read_f2dot14(buf)?]
        } else {
            [1.0, 0.0, 0.0, 1.0]
        };

        let (x_translate, y_translate) = if xy { (arg1, arg2) } else { (0, 0) };
        Ok(Self {
            flags,
            glyph_index,
            arg1,
            arg2,
            transform,
            x_translate,
            y_translate,
        })
    }

    /// Transformed x of a point, before translation.
    pub fn scale_x(&self, x: i32, y: i32) -> i32 {
        (x as f64 * self.transform[0] + y as f64 * self.transform[2]).round() as i32
    }

    /// Transformed y of a point, before translation.
    pub fn scale_y(&self, x: i32, y: i32) -> i32 {
        (x as f64 * self.transform[1] + y as f64 * self.transform[3]).round() as i32
    }
}

/// Components of a composite glyph as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeGlyph {
    /// Components in declaration order
    pub components: Vec<Component>,
    /// Instructions after the last component
    pub instructions: Vec<u8>,
}

/// Read the component records that follow a composite glyph header.
pub fn read_components(buf: &mut ByteBuffer) -> Result<CompositeGlyph> {
    let mut components = Vec::new();
    loop {
        let component = Component::read(buf)?;
        let more = component.flags.contains(ComponentFlags::MORE_COMPONENTS);
        components.push(component);
        if !more {
            break;
        }
    }

    let has_instructions = components
        .last()
        .is_some_and(|c| c.flags.contains(ComponentFlags::WE_HAVE_INSTRUCTIONS));
    let instructions = if has_instructions {
        let length = buf.read_u16()? as usize;
        buf.read_slice(length).to_vec()
    } else {
        Vec::new()
    };

    Ok(CompositeGlyph {
        components,
        instructions,
    })
}

/// A glyph's points and contours, with composites flattened.
#[derive(Debug, Clone)]
pub enum GlyphDescription {
    /// No outline
    Empty,
    /// A simple glyph's own points
    Simple(Arc<SimpleGlyph>),
    /// Components laid out in one index space
    Composite(Arc<CompositeDescription>),
}

impl GlyphDescription {
    /// Whether this description is built from components.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    /// Total number of points.
    pub fn point_count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Simple(glyph) => glyph.point_count(),
            Self::Composite(composite) => composite.point_count,
        }
    }

    /// Total number of contours.
    pub fn contour_count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Simple(glyph) => glyph.contour_count(),
            Self::Composite(composite) => composite.contour_count,
        }
    }

    /// x of point `i`, transformed into this glyph's space.
    pub fn x_coordinate(&self, i: usize) -> Option<i32> {
        self.point(i).map(|(x, _)| x)
    }

    /// y of point `i`, transformed into this glyph's space.
    pub fn y_coordinate(&self, i: usize) -> Option<i32> {
        self.point(i).map(|(_, y)| y)
    }

    /// Both coordinates of point `i`.
    pub fn point(&self, i: usize) -> Option<(i32, i32)> {
        match self {
            Self::Empty => None,
            Self::Simple(glyph) => Some((
                *glyph.x_coordinates().get(i)? as i32,
                *glyph.y_coordinates().get(i)? as i32,
            )),
            Self::Composite(composite) => {
                let (part, description) = composite.part_for_point(i)?;
                let (x, y) = description.point(i - part.first_index)?;
                let component = &part.component;
                Some((
                    component.scale_x(x, y) + component.x_translate,
                    component.scale_y(x, y) + component.y_translate,
                ))
            },
        }
    }

    /// Flags of point `i`, untransformed.
    pub fn flags(&self, i: usize) -> Option<u8> {
        match self {
            Self::Empty => None,
            Self::Simple(glyph) => glyph.flags().get(i).copied(),
            Self::Composite(composite) => {
                let (part, description) = composite.part_for_point(i)?;
                description.flags(i - part.first_index)
            },
        }
    }

    /// Index of the last point of contour `i`, in this glyph's index space.
    pub fn end_point_of_contour(&self, i: usize) -> Option<usize> {
        match self {
            Self::Empty => None,
            Self::Simple(glyph) => glyph.end_points().get(i).map(|&end| end as usize),
            Self::Composite(composite) => {
                let (part, description) = composite.part_for_contour(i)?;
                description
                    .end_point_of_contour(i - part.first_contour)
                    .map(|end| end + part.first_index)
            },
        }
    }
}

/// One component placed in the flattened index space.
#[derive(Debug, Clone)]
pub struct CompositePart {
    /// The component record
    pub component: Component,
    /// Index of this part's first point
    pub first_index: usize,
    /// Index of this part's first contour
    pub first_contour: usize,
    /// Sub-glyph description; `None` when missing or cyclic
    pub description: Option<GlyphDescription>,
}

impl CompositePart {
    fn point_count(&self) -> usize {
        self.description.as_ref().map_or(0, GlyphDescription::point_count)
    }

    fn contour_count(&self) -> usize {
        self.description.as_ref().map_or(0, GlyphDescription::contour_count)
    }
}

/// A resolved composite glyph.
#[derive(Debug, Clone)]
pub struct CompositeDescription {
    gid: u16,
    parts: Vec<CompositePart>,
    point_count: usize,
    contour_count: usize,
    cycle: Option<u16>,
}

impl CompositeDescription {
    /// Glyph id of the composite.
    pub fn gid(&self) -> u16 {
        self.gid
    }

    /// Parts in declaration order.
    pub fn parts(&self) -> &[CompositePart] {
        &self.parts
    }

    /// The glyph at which a reference cycle was cut, if any part of this
    /// composite (at any depth) closed a cycle.
    pub fn cycle(&self) -> Option<u16> {
        self.cycle
    }

    fn part_for_point(&self, i: usize) -> Option<(&CompositePart, &GlyphDescription)> {
        self.parts
            .iter()
            .find(|p| p.first_index <= i && i < p.first_index + p.point_count())
            .and_then(|p| Some((p, p.description.as_ref()?)))
    }

    fn part_for_contour(&self, i: usize) -> Option<(&CompositePart, &GlyphDescription)> {
        self.parts
            .iter()
            .find(|p| p.first_contour <= i && i < p.first_contour + p.contour_count())
            .and_then(|p| Some((p, p.description.as_ref()?)))
    }
}

/// Per-glyph progress within one resolution.
#[derive(Debug, Clone)]
pub enum ResolveState {
    /// Not visited yet
    Unresolved,
    /// On the current path; meeting it again closes a cycle
    Resolving,
    /// Done
    Resolved(GlyphDescription),
}

/// Outcome of resolving one glyph.
#[derive(Debug, Clone)]
pub enum Resolve {
    /// The glyph's description
    Resolved(GlyphDescription),
    /// The glyph is already being resolved further up the path
    CycleDetected {
        /// Glyph that closed the cycle
        glyph_id: u16,
    },
    /// The glyph id is outside the font
    Missing {
        /// The missing glyph
        glyph_id: u16,
    },
}

/// One resolution session over a glyph table.
pub struct Resolver<'a> {
    table: &'a GlyphTable,
    states: HashMap<u16, ResolveState>,
}

impl<'a> Resolver<'a> {
    /// Start a session.
    pub fn new(table: &'a GlyphTable) -> Self {
        Self {
            table,
            states: HashMap::new(),
        }
    }

    /// Current state of a glyph in this session.
    pub fn state(&self, gid: u16) -> ResolveState {
        self.states.get(&gid).cloned().unwrap_or(ResolveState::Unresolved)
    }

    /// Resolve a glyph and, for composites, everything it references.
    ///
    /// Repeated calls return the first result.
    ///
    /// # Errors
    ///
    /// [`Error::CompositeDepthExceeded`] when components nest deeper than
    /// the font's `maxComponentDepth`; the outermost glyph is level 0.
    pub fn resolve(&mut self, gid: u16) -> Result<Resolve> {
        self.resolve_at(gid, 0)
    }

    fn resolve_at(&mut self, gid: u16, depth: u16) -> Result<Resolve> {
        match self.states.get(&gid) {
            Some(ResolveState::Resolved(description)) => return Ok(Resolve::Resolved(description.clone())),
            Some(ResolveState::Resolving) => {
                log::warn!("Composite glyph {} references itself through its components", gid);
                return Ok(Resolve::CycleDetected { glyph_id: gid });
            },
            _ => {},
        }

        let max_depth = self.table.max_component_depth();
        if depth > max_depth {
            return Err(Error::CompositeDepthExceeded {
                glyph_id: gid,
                max_depth,
            });
        }

        if let Some(description) = self.table.cached_description(gid) {
            self.states.insert(gid, ResolveState::Resolved(description.clone()));
            return Ok(Resolve::Resolved(description));
        }

        let Some(glyph) = self.table.glyph(gid)? else {
            return Ok(Resolve::Missing { glyph_id: gid });
        };

        let description = match &glyph.outline {
            GlyphOutline::Empty => GlyphDescription::Empty,
            GlyphOutline::Simple(simple) => GlyphDescription::Simple(Arc::clone(simple)),
            GlyphOutline::Composite(composite) => {
                self.states.insert(gid, ResolveState::Resolving);
                match self.resolve_components(gid, &composite.components, depth) {
                    Ok(resolved) => GlyphDescription::Composite(Arc::new(resolved)),
                    Err(e) => {
                        self.states.remove(&gid);
                        return Err(e);
                    },
                }
            },
        };

        self.states.insert(gid, ResolveState::Resolved(description.clone()));
        let cycle_free = match &description {
            GlyphDescription::Composite(composite) => composite.cycle.is_none(),
            _ => true,
        };
        if cycle_free {
            self.table.store_description(gid, description.clone());
        }
        Ok(Resolve::Resolved(description))
    }

    fn resolve_components(&mut self, gid: u16, components: &[Component], depth: u16) -> Result<CompositeDescription> {
        let mut parts = Vec::with_capacity(components.len());
        let mut first_index = 0;
        let mut first_contour = 0;
        let mut cycle = None;

        for component in components {
            let description = match self.resolve_at(component.glyph_index, depth + 1)? {
                Resolve::Resolved(description) => {
                    if let GlyphDescription::Composite(nested) = &description {
                        cycle = cycle.or(nested.cycle);
                    }
                    Some(description)
                },
                Resolve::CycleDetected { glyph_id } => {
                    cycle = cycle.or(Some(glyph_id));
                    None
                },
                Resolve::Missing { glyph_id } => {
                    log::warn!("Composite glyph {} references missing glyph {}", gid, glyph_id);
                    None
                },
            };
            let part = CompositePart {
                component: component.clone(),
                first_index,
                first_contour,
                description,
            };
            first_index += part.point_count();
            first_contour += part.contour_count();
            parts.push(part);
        }

        Ok(CompositeDescription {
            gid,
            parts,
            point_count: first_index,
            contour_count: first_contour,
            cycle,
        })
    }
}
