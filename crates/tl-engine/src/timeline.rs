//! Assembled timeline types.

use alloc::string::String;
use alloc::vec::Vec;
use tl_ir::{EventKind, Position, RawEvent, TimeBase};

use crate::tempo_map::TempoMap;

/// A decoded event with its absolute time.
///
/// Only the assembler creates these.
#[derive(Clone, Debug, PartialEq)]
pub struct TimedEvent {
    event: RawEvent,
    tick: u64,
    time: f64,
}

impl TimedEvent {
    pub(crate) fn new(event: RawEvent, tick: u64, time: f64) -> Self {
        Self { event, tick, time }
    }

    /// The underlying symbolic event.
    pub fn event(&self) -> &RawEvent {
        &self.event
    }

    pub fn kind(&self) -> &EventKind {
        &self.event.kind
    }

    pub fn channel(&self) -> Option<u8> {
        self.event.channel
    }

    pub fn position(&self) -> Position {
        self.event.position
    }

    /// Absolute tick stamp.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Absolute time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }
}

/// One output track.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimelineTrack {
    pub(crate) name: Option<String>,
    pub(crate) events: Vec<TimedEvent>,
}

impl TimelineTrack {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Events ordered by position, ending with an End-of-Track marker.
    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }
}

/// Result of a rescale request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RescaleOutcome {
    /// Every time was multiplied by `factor`
    Applied { factor: f64 },
    /// The last Note Off is at 0 s, so there is nothing to scale against
    Skipped,
}

/// The complete, timed output of one decode run.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    pub(crate) time_base: TimeBase,
    pub(crate) tempo: TempoMap,
    pub(crate) tracks: Vec<TimelineTrack>,
    pub(crate) last_note_off_time: f64,
    pub(crate) max_event_time: f64,
}

impl Timeline {
    pub(crate) fn new(time_base: TimeBase, tempo: TempoMap, tracks: Vec<TimelineTrack>) -> Self {
        let mut timeline = Self {
            time_base,
            tempo,
            tracks,
            last_note_off_time: 0.0,
            max_event_time: 0.0,
        };
        timeline.refresh_metadata();
        timeline
    }

    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// The tempo map the times were computed from.
    pub fn tempo(&self) -> &TempoMap {
        &self.tempo
    }

    pub fn tracks(&self) -> &[TimelineTrack] {
        &self.tracks
    }

    /// Latest Note Off time across all tracks (0 when there are none).
    pub fn last_note_off_time(&self) -> f64 {
        self.last_note_off_time
    }

    /// Latest event time across all tracks.
    pub fn max_event_time(&self) -> f64 {
        self.max_event_time
    }

    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(|t| t.events.len()).sum()
    }

    /// Linearly rescale every event time so that the last Note Off lands on
    /// `target_seconds`.
    pub fn rescale_to(&mut self, target_seconds: f64) -> RescaleOutcome {
        if !(self.last_note_off_time > 0.0) {
            log::warn!("Last note off is at 0s, cannot rescale to {}s", target_seconds);
            return RescaleOutcome::Skipped;
        }
        let factor = target_seconds / self.last_note_off_time;
        for event in self.tracks.iter_mut().flat_map(|t| t.events.iter_mut()) {
            event.time *= factor;
        }
        self.refresh_metadata();
        log::info!("Scaled times by {:.6} to a last note off of {}s", factor, target_seconds);
        RescaleOutcome::Applied { factor }
    }

    fn refresh_metadata(&mut self) {
        let mut last_note_off: f64 = 0.0;
        let mut max_time: f64 = 0.0;
        for event in self.tracks.iter().flat_map(|t| t.events.iter()) {
            max_time = max_time.max(event.time);
            if event.kind().is_note_off() {
                last_note_off = last_note_off.max(event.time);
            }
        }
        self.last_note_off_time = last_note_off;
        self.max_event_time = max_time;
    }
}
