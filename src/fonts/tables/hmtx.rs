//! `hmtx`: horizontal metrics.

use super::read_table;
use crate::error::Result;
use crate::fonts::Tag;

/// Horizontal metrics table.
///
/// The first `number_of_h_metrics` glyphs carry an (advance, lsb) pair.
/// Later glyphs carry only a left side bearing and reuse the last advance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HmtxTable {
    metrics: Vec<(u16, i16)>,
    left_side_bearings: Vec<i16>,
}

impl HmtxTable {
    /// Parse the table.
    ///
    /// Fonts that stop short in the bearing-only tail are accepted; the
    /// missing bearings read as zero.
    pub fn parse(data: &[u8], number_of_h_metrics: u16, num_glyphs: u16) -> Result<Self> {
        read_table(Tag::HMTX, data, |buf| {
            let mut metrics = Vec::with_capacity(number_of_h_metrics as usize);
            for _ in 0..number_of_h_metrics {
                metrics.push((buf.read_u16()?, buf.read_i16()?));
            }
            let extra = num_glyphs.saturating_sub(number_of_h_metrics) as usize;
            let mut left_side_bearings = Vec::with_capacity(extra);
            for _ in 0..extra {
                match buf.read_i16() {
                    Ok(lsb) => left_side_bearings.push(lsb),
                    Err(_) => {
                        log::warn!(
                            "hmtx holds {} of {} trailing side bearings",
                            left_side_bearings.len(),
                            extra
                        );
                        break;
                    },
                }
            }
            Ok(Self {
                metrics,
                left_side_bearings,
            })
        })
    }

    /// Number of full metric records.
    pub fn number_of_h_metrics(&self) -> usize {
        self.metrics.len()
    }

    /// The full (advance, lsb) records.
    pub fn metrics(&self) -> &[(u16, i16)] {
        &self.metrics
    }

    /// Advance width; glyphs past the metric records use the last advance.
    pub fn advance_width(&self, gid: u16) -> u16 {
        match self.metrics.get(gid as usize) {
            Some(&(advance, _)) => advance,
            None => self.metrics.last().map_or(0, |&(advance, _)| advance),
        }
    }

    /// Left side bearing.
    pub fn left_side_bearing(&self, gid: u16) -> i16 {
        let gid = gid as usize;
        match self.metrics.get(gid) {
            Some(&(_, lsb)) => lsb,
            None => self
                .left_side_bearings
                .get(gid - self.metrics.len())
                .copied()
                .unwrap_or(0),
        }
    }
}
