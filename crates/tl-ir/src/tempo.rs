//! Tempo points as found in the source formats.

use alloc::vec::Vec;

use crate::position::Position;

/// Tempo assumed when a file does not set one at position 0.
pub const DEFAULT_MICROS_PER_QUARTER: u32 = 500_000;
/// The same default expressed in beats per minute.
pub const DEFAULT_BPM: f64 = 120.0;

/// A tempo rate in the unit of its source format.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TempoRate {
    /// Binary files: microseconds per quarter note
    MicrosPerQuarter(u32),
    /// Automation curves: beats per minute
    Bpm(f64),
}

impl TempoRate {
    /// The rate in beats per minute.
    pub fn bpm(self) -> f64 {
        match self {
            Self::MicrosPerQuarter(us) => 60_000_000.0 / f64::from(us),
            Self::Bpm(bpm) => bpm,
        }
    }
}

/// One tempo-defining point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoPoint {
    pub position: Position,
    pub rate: TempoRate,
}

impl TempoPoint {
    pub const fn new(position: Position, rate: TempoRate) -> Self {
        Self { position, rate }
    }
}

/// A project's global tempo: an initial rate plus an optional curve.
///
/// Points are in beats and BPM, ordered as found in the document.
#[derive(Clone, Debug, PartialEq)]
pub struct TempoAutomation {
    pub initial_bpm: f64,
    pub points: Vec<TempoPoint>,
}

impl TempoAutomation {
    /// A constant tempo with no curve.
    pub fn constant(bpm: f64) -> Self {
        Self { initial_bpm: bpm, points: Vec::new() }
    }
}

impl Default for TempoAutomation {
    fn default() -> Self {
        Self::constant(DEFAULT_BPM)
    }
}
