//! Symbolic time positions.
//!
//! Binary sequenced-music files count in integer ticks relative to a
//! quarter note; automation-based projects count in (fractional) beats.
//! `Position` carries either, and `TimeBase` says how to read it.

use core::cmp::Ordering;

/// A symbolic position on a track, before any tempo is applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Position {
    /// Absolute tick from the start of the file.
    Tick(u64),
    /// Absolute beat (quarter note) from the start of the project.
    Beat(f64),
}

impl Position {
    /// The zero position in tick units.
    pub const fn zero() -> Self {
        Self::Tick(0)
    }

    /// Position as a plain number in its own unit.
    pub fn value(self) -> f64 {
        match self {
            Self::Tick(t) => t as f64,
            Self::Beat(b) => b,
        }
    }

    /// Total order over positions.
    ///
    /// Ticks compare exactly; anything involving beats compares by value
    /// with `f64::total_cmp`, so NaN never breaks a sort.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Tick(a), Self::Tick(b)) => a.cmp(b),
            _ => self.value().total_cmp(&other.value()),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::zero()
    }
}

/// How the positions of a decoded song are measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeBase {
    /// Integer ticks with a fixed resolution per quarter note.
    Ticks { ticks_per_quarter: u16 },
    /// Fractional beats. `ticks_per_beat` is only used to derive the
    /// integer tick stamp that accompanies every output event.
    Beats { ticks_per_beat: u16 },
}

impl TimeBase {
    /// Tick resolution per quarter note (or per beat).
    pub const fn resolution(self) -> u16 {
        match self {
            Self::Ticks { ticks_per_quarter } => ticks_per_quarter,
            Self::Beats { ticks_per_beat } => ticks_per_beat,
        }
    }

    /// Integer tick stamp for a position.
    ///
    /// Beat positions are truncated toward zero; negative beats clamp to 0.
    pub fn tick_of(self, position: Position) -> u64 {
        match position {
            Position::Tick(t) => t,
            Position::Beat(b) => (b * f64::from(self.resolution())) as u64,
        }
    }
}
