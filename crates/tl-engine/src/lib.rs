//! Timing engine for tempoline.
//!
//! Builds a tempo map from a decoded song, integrates it to turn symbolic
//! positions into seconds, and assembles the final per-track timeline.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod analysis;
mod assembler;
mod mapper;
mod tempo_map;
mod timeline;

pub use analysis::{summarize, TimelineSummary};
pub use assembler::{assemble_timeline, assemble_with_map, AssembleOptions, TieBreak};
pub use tempo_map::{TempoError, TempoMap, TempoSegment, TempoSource, TempoUnit, DEFAULT_EPSILON};
pub use timeline::{RescaleOutcome, TimedEvent, Timeline, TimelineTrack};
