//! Core IR types for tempoline.
//!
//! This crate defines the intermediate representation shared by the
//! decoders and the timing engine. Every format parser emits a
//! [`DecodedSong`]; the engine turns it into a timeline with absolute
//! times.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod event;
mod position;
pub mod song;
mod tempo;

pub use event::{EventKind, MetaEvent, RawEvent, META_END_OF_TRACK, META_SET_TEMPO, META_TRACK_NAME};
pub use position::{Position, TimeBase};
pub use song::{DecodedSong, RawTrack};
pub use tempo::{
    TempoAutomation, TempoPoint, TempoRate, DEFAULT_BPM, DEFAULT_MICROS_PER_QUARTER,
};
