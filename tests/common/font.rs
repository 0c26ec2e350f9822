//! A small hand-assembled TrueType font.
//!
//! Glyphs:
//!
//! | gid | name    | kind                                        |
//! |-----|---------|---------------------------------------------|
//! | 0   | .notdef | rectangle                                   |
//! | 1   | A       | triangle                                    |
//! | 2   | ring    | square                                      |
//! | 3   | Aring   | composite: A + ring shifted right, with instructions |
//! | 4   | B       | two contours                                |
//! | 5   | space   | empty                                       |
//! | 6   | cyclic  | composite referencing itself                |
//! | 7   | nested  | composite: Aring + B scaled by 0.5          |
//!
//! `hhea.numberOfHMetrics` is 4, so glyphs 4 and up carry only a left side
//! bearing and inherit the advance of glyph 3.

#![allow(dead_code)]

use pdf_core::fonts::glyph_names::mac_glyph_index;
use std::collections::BTreeMap;

pub type Tables = BTreeMap<[u8; 4], Vec<u8>>;

pub const GID_NOTDEF: u16 = 0;
pub const GID_A: u16 = 1;
pub const GID_RING: u16 = 2;
pub const GID_ARING: u16 = 3;
pub const GID_B: u16 = 4;
pub const GID_SPACE: u16 = 5;
pub const GID_CYCLIC: u16 = 6;
pub const GID_NESTED: u16 = 7;
pub const NUM_GLYPHS: u16 = 8;
pub const NUM_H_METRICS: u16 = 4;

pub const RING_ABOVE: u32 = 0x02DA;
pub const A_RING: u32 = 0x00C5;
pub const EMOJI: u32 = 0x1F600;

/// Code point to glyph mapping of the fixture's cmap.
pub const CMAP: &[(u32, u16)] = &[
    (0x20, GID_SPACE),
    (0x41, GID_A),
    (0x42, GID_B),
    (A_RING, GID_ARING),
    (RING_ABOVE, GID_RING),
];

pub const GLYPH_NAMES: &[&str] = &[".notdef", "A", "ring", "Aring", "B", "space", "cyclic", "nested"];

/// (advance, lsb) for glyphs below `NUM_H_METRICS`, then lsb only.
pub const METRICS: &[(u16, i16)] = &[(500, 50), (600, 0), (300, 100), (600, 0)];
pub const TRAILING_LSB: &[i16] = &[40, 0, 0, 0];

const ARG_WORDS_XY: u16 = 0x0003;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;

pub fn p16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn pi16(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn p32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// A simple glyph with on-curve points and word-sized deltas.
pub fn simple_glyph(points: &[(i16, i16)], end_points: &[u16]) -> Vec<u8> {
    let x_min = points.iter().map(|p| p.0).min().unwrap_or(0);
    let y_min = points.iter().map(|p| p.1).min().unwrap_or(0);
    let x_max = points.iter().map(|p| p.0).max().unwrap_or(0);
    let y_max = points.iter().map(|p| p.1).max().unwrap_or(0);

    let mut out = Vec::new();
    pi16(&mut out, end_points.len() as i16);
    for v in [x_min, y_min, x_max, y_max] {
        pi16(&mut out, v);
    }
    for &end in end_points {
        p16(&mut out, end);
    }
    p16(&mut out, 0); // instructionLength
    out.extend(std::iter::repeat(0x01).take(points.len()));
    let (mut px, mut py) = (0i16, 0i16);
    for &(x, _) in points {
        pi16(&mut out, x - px);
        px = x;
    }
    for &(_, y) in points {
        pi16(&mut out, y - py);
        py = y;
    }
    out
}

/// One component record: `(glyph, dx, dy, scale)`.
pub type ComponentSpec = (u16, i16, i16, Option<f64>);

/// A composite glyph with word x/y offsets.
pub fn composite_glyph(bounds: [i16; 4], components: &[ComponentSpec], instructions: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    pi16(&mut out, -1);
    for v in bounds {
        pi16(&mut out, v);
    }
    for (i, &(glyph, dx, dy, scale)) in components.iter().enumerate() {
        let mut flags = ARG_WORDS_XY;
        if i + 1 < components.len() {
            flags |= MORE_COMPONENTS;
        } else if !instructions.is_empty() {
            flags |= WE_HAVE_INSTRUCTIONS;
        }
        if scale.is_some() {
            flags |= WE_HAVE_A_SCALE;
        }
        p16(&mut out, flags);
        p16(&mut out, glyph);
        pi16(&mut out, dx);
        pi16(&mut out, dy);
        if let Some(scale) = scale {
            pi16(&mut out, (scale * 16384.0) as i16);
        }
    }
    if !instructions.is_empty() {
        p16(&mut out, instructions.len() as u16);
        out.extend_from_slice(instructions);
    }
    out
}

pub fn glyphs() -> Vec<Vec<u8>> {
    vec![
        simple_glyph(&[(50, 0), (50, 700), (450, 700), (450, 0)], &[3]),
        simple_glyph(&[(0, 0), (300, 700), (600, 0)], &[2]),
        simple_glyph(&[(100, 750), (100, 900), (200, 900), (200, 750)], &[3]),
        composite_glyph(
            [0, 0, 600, 900],
            &[(GID_A, 0, 0, None), (GID_RING, 150, 0, None)],
            &[0xB0, 0x01],
        ),
        simple_glyph(
            &[(40, 0), (40, 700), (540, 700), (540, 0), (140, 100), (140, 600), (440, 600)],
            &[3, 6],
        ),
        Vec::new(),
        composite_glyph([0, 0, 0, 0], &[(GID_CYCLIC, 0, 0, None)], &[]),
        composite_glyph(
            [0, 0, 610, 920],
            &[(GID_ARING, 10, 20, None), (GID_B, 0, 0, Some(0.5))],
            &[],
        ),
    ]
}

/// `glyf` and short-format `loca`.
pub fn glyf_and_loca(glyphs: &[Vec<u8>]) -> (Vec<u8>, Vec<u8>) {
    let mut glyf = Vec::new();
    let mut loca = Vec::new();
    for glyph in glyphs {
        p16(&mut loca, (glyf.len() / 2) as u16);
        glyf.extend_from_slice(glyph);
        pad4(&mut glyf);
    }
    p16(&mut loca, (glyf.len() / 2) as u16);
    (glyf, loca)
}

pub fn head(index_to_loc_format: i16) -> Vec<u8> {
    let mut out = Vec::new();
    p32(&mut out, 0x0001_0000);
    p32(&mut out, 0x0001_0000); // fontRevision
    p32(&mut out, 0); // checkSumAdjustment
    p32(&mut out, 0x5F0F_3CF5);
    p16(&mut out, 0x000B);
    p16(&mut out, 1000);
    out.extend_from_slice(&[0; 16]); // created, modified
    for v in [-50i16, -200, 750, 900] {
        pi16(&mut out, v);
    }
    p16(&mut out, 0); // macStyle
    p16(&mut out, 8); // lowestRecPPEM
    pi16(&mut out, 2); // fontDirectionHint
    pi16(&mut out, index_to_loc_format);
    pi16(&mut out, 0); // glyphDataFormat
    out
}

pub fn hhea(number_of_h_metrics: u16) -> Vec<u8> {
    let mut out = Vec::new();
    p32(&mut out, 0x0001_0000);
    for v in [800i16, -200, 0] {
        pi16(&mut out, v);
    }
    p16(&mut out, 600); // advanceWidthMax
    for v in [0i16, 0, 750, 1, 0, 0, 0, 0, 0, 0, 0] {
        pi16(&mut out, v);
    }
    p16(&mut out, number_of_h_metrics);
    out
}

pub fn maxp(num_glyphs: u16, max_component_depth: u16) -> Vec<u8> {
    let mut out = Vec::new();
    p32(&mut out, 0x0001_0000);
    p16(&mut out, num_glyphs);
    for v in [8u16, 2, 8, 2, 2, 0, 0, 0, 0, 0, 0, 2, max_component_depth] {
        p16(&mut out, v);
    }
    out
}

pub fn hmtx() -> Vec<u8> {
    let mut out = Vec::new();
    for &(advance, lsb) in METRICS {
        p16(&mut out, advance);
        pi16(&mut out, lsb);
    }
    for &lsb in TRAILING_LSB {
        pi16(&mut out, lsb);
    }
    out
}

fn cmap_format4(mapping: &[(u32, u16)]) -> Vec<u8> {
    let mut segments: Vec<(u16, u16)> = mapping
        .iter()
        .filter(|(code, _)| *code <= 0xFFFF)
        .map(|&(code, gid)| (code as u16, gid))
        .collect();
    segments.sort();
    let seg_count = segments.len() as u16 + 1;

    let mut out = Vec::new();
    p16(&mut out, 4);
    p16(&mut out, 16 + 8 * seg_count);
    p16(&mut out, 0);
    p16(&mut out, seg_count * 2);
    let mut power = 1u16;
    while power * 2 <= seg_count {
        power *= 2;
    }
    p16(&mut out, power * 2);
    p16(&mut out, power.trailing_zeros() as u16);
    p16(&mut out, seg_count * 2 - power * 2);
    for &(code, _) in &segments {
        p16(&mut out, code);
    }
    p16(&mut out, 0xFFFF);
    p16(&mut out, 0);
    for &(code, _) in &segments {
        p16(&mut out, code);
    }
    p16(&mut out, 0xFFFF);
    for &(code, gid) in &segments {
        p16(&mut out, gid.wrapping_sub(code));
    }
    p16(&mut out, 1);
    for _ in 0..seg_count {
        p16(&mut out, 0);
    }
    out
}

fn cmap_format12(mapping: &[(u32, u16)]) -> Vec<u8> {
    let mut groups: Vec<(u32, u16)> = mapping.to_vec();
    groups.sort();
    let mut out = Vec::new();
    p16(&mut out, 12);
    p16(&mut out, 0);
    p32(&mut out, 16 + 12 * groups.len() as u32);
    p32(&mut out, 0);
    p32(&mut out, groups.len() as u32);
    for (code, gid) in groups {
        p32(&mut out, code);
        p32(&mut out, code);
        p32(&mut out, gid as u32);
    }
    out
}

/// A (3,1) format 4 subtable, plus a (3,10) format 12 subtable when
/// `full_unicode` mappings are given.
pub fn cmap(bmp: &[(u32, u16)], full_unicode: Option<&[(u32, u16)]>) -> Vec<u8> {
    let mut subtables = vec![((3u16, 1u16), cmap_format4(bmp))];
    if let Some(full) = full_unicode {
        subtables.push(((3, 10), cmap_format12(full)));
    }

    let mut out = Vec::new();
    p16(&mut out, 0);
    p16(&mut out, subtables.len() as u16);
    let mut offset = 4 + 8 * subtables.len() as u32;
    for ((platform, encoding), body) in &subtables {
        p16(&mut out, *platform);
        p16(&mut out, *encoding);
        p32(&mut out, offset);
        offset += body.len() as u32;
    }
    for (_, body) in subtables {
        out.extend_from_slice(&body);
    }
    out
}

pub fn post(names: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    p32(&mut out, 0x0002_0000);
    p32(&mut out, 0); // italicAngle
    pi16(&mut out, -100);
    pi16(&mut out, 50);
    out.extend_from_slice(&[0; 20]); // isFixedPitch, memory usage
    p16(&mut out, names.len() as u16);
    let mut custom = Vec::new();
    for name in names {
        match mac_glyph_index(name) {
            Some(index) => p16(&mut out, index),
            None => {
                p16(&mut out, 258 + custom.len() as u16);
                custom.push(*name);
            },
        }
    }
    for name in custom {
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());
    }
    out
}

pub fn post_v3() -> Vec<u8> {
    let mut out = Vec::new();
    p32(&mut out, 0x0003_0000);
    p32(&mut out, 0);
    pi16(&mut out, -100);
    pi16(&mut out, 50);
    out.extend_from_slice(&[0; 20]);
    out
}

/// Records: Windows English ids 1, 2, 4, 6 and 7, plus a Macintosh family.
pub fn name(postscript_name: &str) -> Vec<u8> {
    let windows = [
        (1u16, "Fixture Sans"),
        (2, "Regular"),
        (4, "Fixture Sans Regular"),
        (6, postscript_name),
        (7, "Fixture is a trademark"),
    ];
    let mut records: Vec<(u16, u16, u16, u16, Vec<u8>)> = vec![(1, 0, 0, 1, b"Fixture Sans".to_vec())];
    for (id, value) in windows {
        let utf16: Vec<u8> = value.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        records.push((3, 1, 0x0409, id, utf16));
    }

    let mut out = Vec::new();
    p16(&mut out, 0);
    p16(&mut out, records.len() as u16);
    p16(&mut out, 6 + 12 * records.len() as u16);
    let mut strings = Vec::new();
    for (platform, encoding, language, id, bytes) in &records {
        for v in [*platform, *encoding, *language, *id, bytes.len() as u16, strings.len() as u16] {
            p16(&mut out, v);
        }
        strings.extend_from_slice(bytes);
    }
    out.extend_from_slice(&strings);
    out
}

/// Version 4 OS/2 table with a non-zero Unicode range.
pub fn os2() -> Vec<u8> {
    let mut out = Vec::new();
    p16(&mut out, 4);
    pi16(&mut out, 500); // xAvgCharWidth
    p16(&mut out, 400);
    p16(&mut out, 5);
    p16(&mut out, 0); // fsType
    for _ in 0..8 {
        pi16(&mut out, 0); // sub/superscript
    }
    pi16(&mut out, 50);
    pi16(&mut out, 300);
    pi16(&mut out, 0); // sFamilyClass
    out.extend_from_slice(&[0; 10]); // panose
    for v in [1u32, 0, 0, 0] {
        p32(&mut out, v);
    }
    out.extend_from_slice(b"NONE");
    p16(&mut out, 0x0040); // fsSelection
    p16(&mut out, 0x20);
    p16(&mut out, 0xFFFF);
    for v in [800i16, -200, 0] {
        pi16(&mut out, v);
    }
    p16(&mut out, 800);
    p16(&mut out, 200);
    // version 1 code pages, version 2 extras
    p32(&mut out, 1);
    p32(&mut out, 0);
    for v in [500i16, 700, 0, 0x20, 2] {
        pi16(&mut out, v);
    }
    out
}

fn gasp() -> Vec<u8> {
    let mut out = Vec::new();
    for v in [1u16, 1, 0xFFFF, 0x000F] {
        p16(&mut out, v);
    }
    out
}

/// Every table of the fixture font.
pub fn fixture_tables(postscript_name: &str) -> Tables {
    let (glyf, loca) = glyf_and_loca(&glyphs());
    let mut full: Vec<(u32, u16)> = CMAP.to_vec();
    full.push((EMOJI, GID_B));

    let mut tables = Tables::new();
    tables.insert(*b"head", head(0));
    tables.insert(*b"hhea", hhea(NUM_H_METRICS));
    tables.insert(*b"maxp", maxp(NUM_GLYPHS, 2));
    tables.insert(*b"glyf", glyf);
    tables.insert(*b"loca", loca);
    tables.insert(*b"hmtx", hmtx());
    tables.insert(*b"cmap", cmap(CMAP, Some(&full)));
    tables.insert(*b"post", post(GLYPH_NAMES));
    tables.insert(*b"name", name(postscript_name));
    tables.insert(*b"OS/2", os2());
    tables.insert(*b"gasp", gasp());
    tables
}

pub fn fixture_font() -> Vec<u8> {
    build_sfnt(0x0001_0000, &fixture_tables("FixtureSans-Regular"))
}

pub fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

/// Directory plus padded bodies, with table offsets starting at `base`.
fn directory_and_bodies(version: u32, tables: &Tables, base: usize) -> (Vec<u8>, Vec<u8>) {
    let n = tables.len() as u16;
    let mut power = 1u16;
    while power * 2 <= n {
        power *= 2;
    }
    let mut directory = Vec::new();
    p32(&mut directory, version);
    p16(&mut directory, n);
    p16(&mut directory, power * 16);
    p16(&mut directory, power.trailing_zeros() as u16);
    p16(&mut directory, n * 16 - power * 16);

    let mut bodies = Vec::new();
    let start = base + 12 + 16 * tables.len();
    for (tag, body) in tables {
        directory.extend_from_slice(tag);
        p32(&mut directory, checksum(body));
        p32(&mut directory, (start + bodies.len()) as u32);
        p32(&mut directory, body.len() as u32);
        bodies.extend_from_slice(body);
        pad4(&mut bodies);
    }
    (directory, bodies)
}

/// Serialize tables in tag order and patch `head.checkSumAdjustment`.
pub fn build_sfnt(version: u32, tables: &Tables) -> Vec<u8> {
    let (mut font, bodies) = directory_and_bodies(version, tables, 0);
    font.extend_from_slice(&bodies);

    if tables.contains_key(b"head") {
        let head_offset = 12 + 16 * tables.len()
            + tables
                .iter()
                .take_while(|(tag, _)| *tag != b"head")
                .map(|(_, body)| (body.len() + 3) & !3)
                .sum::<usize>();
        let adjustment = 0xB1B0_AFBAu32.wrapping_sub(checksum(&font));
        font[head_offset + 8..head_offset + 12].copy_from_slice(&adjustment.to_be_bytes());
    }
    font
}

/// A collection of fonts that do not share tables.
pub fn build_ttc(fonts: &[Tables], dsig: bool) -> Vec<u8> {
    let version: u32 = if dsig { 0x0002_0000 } else { 0x0001_0000 };
    let header_len = 12 + 4 * fonts.len() + if dsig { 12 } else { 0 };

    let mut members = Vec::new();
    let mut offsets = Vec::new();
    for tables in fonts {
        let base = header_len + members.len();
        offsets.push(base as u32);
        let (directory, bodies) = directory_and_bodies(0x0001_0000, tables, base);
        members.extend_from_slice(&directory);
        members.extend_from_slice(&bodies);
    }

    let mut out = b"ttcf".to_vec();
    p32(&mut out, version);
    p32(&mut out, fonts.len() as u32);
    for offset in offsets {
        p32(&mut out, offset);
    }
    if dsig {
        out.extend_from_slice(b"DSIG");
        p32(&mut out, 8);
        p32(&mut out, (header_len + members.len()) as u32);
    }
    out.extend_from_slice(&members);
    if dsig {
        p32(&mut out, 1);
        p32(&mut out, 0);
    }
    out
}
