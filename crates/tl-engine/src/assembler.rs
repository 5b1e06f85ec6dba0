//! Timeline assembly.
//!
//! Takes the per-track events of a decoded song, maps each one to seconds,
//! orders them and closes every track with an End-of-Track marker.

use alloc::vec::Vec;
use tl_ir::{DecodedSong, EventKind, MetaEvent, Position, RawEvent, RawTrack, TimeBase};

use crate::tempo_map::{TempoError, TempoMap, TempoSource, DEFAULT_EPSILON};
use crate::timeline::{TimedEvent, Timeline, TimelineTrack};

/// Ordering of note events that share a position.
///
/// Only Note On and Note Off trade places; every other event keeps its
/// decode-order slot within the position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TieBreak {
    /// Note Off before Note On, so a note ending exactly where the next one
    /// starts never overlaps it
    #[default]
    NoteOffFirst,
    /// Note On before Note Off
    NoteOnFirst,
    /// Keep decode order
    Preserve,
}

impl TieBreak {
    /// Rank of a note event within its position, lower first.
    fn rank(self, kind: &EventKind) -> u8 {
        match (self, kind.is_note_off()) {
            (Self::NoteOffFirst, true) | (Self::NoteOnFirst, false) => 0,
            (Self::NoteOffFirst, false) | (Self::NoteOnFirst, true) => 1,
            (Self::Preserve, _) => 0,
        }
    }

    /// Reorder the note events of one position in place.
    fn order_notes(self, group: &mut [RawEvent]) {
        if self == Self::Preserve {
            return;
        }
        let slots: Vec<usize> = group
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind.is_note_on() || e.kind.is_note_off())
            .map(|(i, _)| i)
            .collect();
        if slots.len() < 2 {
            return;
        }
        let mut notes: Vec<RawEvent> = slots.iter().map(|&i| group[i].clone()).collect();
        notes.sort_by_key(|e| self.rank(&e.kind));
        for (&slot, note) in slots.iter().zip(notes) {
            group[slot] = note;
        }
    }
}

/// Knobs for [`assemble_timeline`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AssembleOptions {
    pub tie_break: TieBreak,
    pub tempo_source: TempoSource,
    /// Constant-tempo threshold for ramp integration
    pub epsilon: f64,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::default(),
            tempo_source: TempoSource::default(),
            epsilon: DEFAULT_EPSILON,
        }
    }
}

/// Build the tempo map for `song` and assemble its timeline.
pub fn assemble_timeline(song: DecodedSong, options: &AssembleOptions) -> Result<Timeline, TempoError> {
    let map = TempoMap::from_song(&song, options.tempo_source)?.with_epsilon(options.epsilon);
    Ok(assemble_with_map(song, map, options.tie_break))
}

/// Assemble a timeline against an already built tempo map.
pub fn assemble_with_map(song: DecodedSong, map: TempoMap, tie_break: TieBreak) -> Timeline {
    let time_base = song.time_base;

    #[cfg(feature = "parallel")]
    let tracks: Vec<TimelineTrack> = {
        use rayon::prelude::*;
        song.tracks
            .into_par_iter()
            .enumerate()
            .map(|(index, track)| assemble_track(index, track, &map, time_base, tie_break))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let tracks: Vec<TimelineTrack> = song
        .tracks
        .into_iter()
        .enumerate()
        .map(|(index, track)| assemble_track(index, track, &map, time_base, tie_break))
        .collect();

    let timeline = Timeline::new(time_base, map, tracks);
    log::info!(
        "Assembled {} tracks, last note off {:.4}s, max event time {:.4}s",
        timeline.tracks().len(),
        timeline.last_note_off_time(),
        timeline.max_event_time()
    );
    timeline
}

fn assemble_track(
    index: usize,
    track: RawTrack,
    map: &TempoMap,
    time_base: TimeBase,
    tie_break: TieBreak,
) -> TimelineTrack {
    let RawTrack { name, mut events } = track;

    // Stable: equal positions keep decode order, End-of-Track last
    events.sort_by(|a, b| {
        a.position
            .total_cmp(&b.position)
            .then(a.kind.is_end_of_track().cmp(&b.kind.is_end_of_track()))
    });
    let mut start = 0;
    while start < events.len() {
        let position = events[start].position;
        let len = events[start..]
            .iter()
            .take_while(|e| e.position.total_cmp(&position).is_eq())
            .count();
        tie_break.order_notes(&mut events[start..start + len]);
        start += len;
    }

    let needs_marker = !events.last().is_some_and(|e| e.kind.is_end_of_track());
    if needs_marker {
        let position = events.last().map_or(Position::zero(), |e| e.position);
        events.push(RawEvent::meta(index, position, MetaEvent::EndOfTrack));
    }

    let events = events
        .into_iter()
        .map(|event| {
            let time = map.seconds_at_position(event.position);
            let tick = time_base.tick_of(event.position);
            TimedEvent::new(event, tick, time)
        })
        .collect();

    TimelineTrack { name, events }
}
