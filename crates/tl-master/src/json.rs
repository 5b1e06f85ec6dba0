//! JSON export of an assembled timeline.
//!
//! The output is an array of tracks, each an array of event objects with
//! camelCase keys.

use std::io::Write;

use serde::Serialize;
use tl_engine::{TimedEvent, Timeline};
use tl_ir::{EventKind, MetaEvent};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventRecord<'a> {
    absolute_ticks: u64,
    time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<u8>,
    #[serde(flatten)]
    payload: Payload<'a>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum Payload<'a> {
    NoteOn {
        note: u8,
        velocity: u8,
    },
    NoteOff {
        note: u8,
        velocity: u8,
    },
    #[serde(rename = "polyphonicKeyPressure")]
    PolyPressure {
        note: u8,
        pressure: u8,
    },
    ControlChange {
        controller: u8,
        value: u8,
    },
    ProgramChange {
        program: u8,
    },
    ChannelPressure {
        pressure: u8,
    },
    PitchBend {
        value: u16,
    },
    Meta {
        meta_type: u8,
        sub_type: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        tempo: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<&'a str>,
    },
    #[serde(rename = "sysex")]
    SystemExclusive,
}

impl<'a> From<&'a TimedEvent> for EventRecord<'a> {
    fn from(event: &'a TimedEvent) -> Self {
        Self {
            absolute_ticks: event.tick(),
            time: event.time(),
            channel: event.channel(),
            payload: Payload::from(event.kind()),
        }
    }
}

impl<'a> From<&'a EventKind> for Payload<'a> {
    fn from(kind: &'a EventKind) -> Self {
        match *kind {
            EventKind::NoteOn { note, velocity } => Self::NoteOn { note, velocity },
            EventKind::NoteOff { note, velocity } => Self::NoteOff { note, velocity },
            EventKind::PolyPressure { note, pressure } => Self::PolyPressure { note, pressure },
            EventKind::ControlChange { controller, value } => Self::ControlChange { controller, value },
            EventKind::ProgramChange { program } => Self::ProgramChange { program },
            EventKind::ChannelPressure { pressure } => Self::ChannelPressure { pressure },
            EventKind::PitchBend { value } => Self::PitchBend { value },
            EventKind::SystemExclusive => Self::SystemExclusive,
            EventKind::Meta(ref meta) => {
                let (sub_type, tempo, text) = match meta {
                    MetaEvent::SetTempo { micros_per_quarter } => ("setTempo", Some(*micros_per_quarter), None),
                    MetaEvent::TrackName(name) => ("trackName", None, Some(name.as_str())),
                    MetaEvent::EndOfTrack => ("endOfTrack", None, None),
                    MetaEvent::Other { .. } => ("unknown", None, None),
                };
                Self::Meta {
                    meta_type: meta.subtype(),
                    sub_type,
                    tempo,
                    text,
                }
            }
        }
    }
}

fn records(timeline: &Timeline) -> Vec<Vec<EventRecord<'_>>> {
    timeline
        .tracks()
        .iter()
        .map(|track| track.events().iter().map(EventRecord::from).collect())
        .collect()
}

/// Write the timeline as pretty-printed JSON.
pub fn write_json(w: &mut impl Write, timeline: &Timeline) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(w, &records(timeline))
}

/// The timeline as a JSON value.
pub fn timeline_to_json(timeline: &Timeline) -> serde_json::Value {
    // Records only hold numbers and strings, so this cannot fail
    serde_json::to_value(records(timeline)).unwrap_or(serde_json::Value::Null)
}
