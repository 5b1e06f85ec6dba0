//! Decoded song structure.

use alloc::string::String;
use alloc::vec::Vec;

use crate::event::{EventKind, MetaEvent, RawEvent};
use crate::position::TimeBase;
use crate::tempo::{TempoAutomation, TempoPoint, TempoRate};

/// Everything a decoder extracted from one input, before timing.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedSong {
    /// How event positions are measured
    pub time_base: TimeBase,
    /// Tracks in output order
    pub tracks: Vec<RawTrack>,
    /// Global tempo curve for beat-based projects. Tick-based files carry
    /// their tempo as Set Tempo meta events inside the tracks instead.
    pub automation: Option<TempoAutomation>,
}

impl DecodedSong {
    /// Create an empty song with the given time base.
    pub fn new(time_base: TimeBase) -> Self {
        Self {
            time_base,
            tracks: Vec::new(),
            automation: None,
        }
    }

    /// Total number of events across all tracks.
    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(|t| t.events.len()).sum()
    }

    /// Set Tempo meta events of the selected tracks as tempo points, in
    /// track order. Sorting is left to the tempo builder.
    pub fn set_tempo_points(&self, first_track_only: bool) -> Vec<TempoPoint> {
        let take = if first_track_only { 1 } else { self.tracks.len() };
        self.tracks
            .iter()
            .take(take)
            .flat_map(|t| t.events.iter())
            .filter_map(|e| {
                e.set_tempo()
                    .map(|us| TempoPoint::new(e.position, TempoRate::MicrosPerQuarter(us)))
            })
            .collect()
    }
}

/// One decoded track.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTrack {
    /// Display name, from a Track Name meta event or the project structure
    pub name: Option<String>,
    /// Events in decode order
    pub events: Vec<RawEvent>,
}

impl RawTrack {
    /// Create an empty track.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty named track.
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(String::from(name)),
            events: Vec::new(),
        }
    }

    /// First Track Name meta event, if any.
    pub fn meta_name(&self) -> Option<&str> {
        self.events.iter().find_map(|e| match &e.kind {
            EventKind::Meta(MetaEvent::TrackName(name)) => Some(name.as_str()),
            _ => None,
        })
    }
}
