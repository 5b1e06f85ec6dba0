//! Symbolic event types produced by the decoders.

use alloc::string::String;
use alloc::vec::Vec;

use crate::position::Position;

/// Meta subtype: sequence/track name.
pub const META_TRACK_NAME: u8 = 0x03;
/// Meta subtype: end of track.
pub const META_END_OF_TRACK: u8 = 0x2F;
/// Meta subtype: set tempo (microseconds per quarter note).
pub const META_SET_TEMPO: u8 = 0x51;

/// A decoded event at a symbolic position, not yet placed in time.
#[derive(Clone, Debug, PartialEq)]
pub struct RawEvent {
    /// Index of the track the event came from
    pub track: usize,
    /// Where the event sits, in the song's time base
    pub position: Position,
    /// Channel 0-15; `None` for meta and system events
    pub channel: Option<u8>,
    /// What the event is
    pub kind: EventKind,
}

impl RawEvent {
    /// Create a channel event.
    pub fn channel(track: usize, position: Position, channel: u8, kind: EventKind) -> Self {
        Self {
            track,
            position,
            channel: Some(channel & 0x0F),
            kind,
        }
    }

    /// Create a meta event (no channel).
    pub fn meta(track: usize, position: Position, meta: MetaEvent) -> Self {
        Self {
            track,
            position,
            channel: None,
            kind: EventKind::Meta(meta),
        }
    }

    /// Tempo carried by this event, if it is a Set Tempo meta event.
    pub fn set_tempo(&self) -> Option<u32> {
        match self.kind {
            EventKind::Meta(MetaEvent::SetTempo { micros_per_quarter }) => Some(micros_per_quarter),
            _ => None,
        }
    }
}

/// What an event does. One case per kind, each with exactly its fields.
#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    PolyPressure { note: u8, pressure: u8 },
    ControlChange { controller: u8, value: u8 },
    ProgramChange { program: u8 },
    ChannelPressure { pressure: u8 },
    /// 14-bit bend value, 0x2000 is centre
    PitchBend { value: u16 },
    Meta(MetaEvent),
    /// System exclusive message; the payload is skipped by the decoder
    SystemExclusive,
}

impl EventKind {
    /// Note On, normalized to Note Off (release velocity 0) when `velocity` is 0.
    pub fn note_on(note: u8, velocity: u8) -> Self {
        if velocity == 0 {
            Self::NoteOff { note, velocity: 0 }
        } else {
            Self::NoteOn { note, velocity }
        }
    }

    /// Short name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoteOn { .. } => "NoteOn",
            Self::NoteOff { .. } => "NoteOff",
            Self::PolyPressure { .. } => "PolyPressure",
            Self::ControlChange { .. } => "ControlChange",
            Self::ProgramChange { .. } => "ProgramChange",
            Self::ChannelPressure { .. } => "ChannelPressure",
            Self::PitchBend { .. } => "PitchBend",
            Self::Meta(_) => "Meta",
            Self::SystemExclusive => "SystemExclusive",
        }
    }

    pub fn is_note_on(&self) -> bool {
        matches!(self, Self::NoteOn { .. })
    }

    pub fn is_note_off(&self) -> bool {
        matches!(self, Self::NoteOff { .. })
    }

    pub fn is_end_of_track(&self) -> bool {
        matches!(self, Self::Meta(MetaEvent::EndOfTrack))
    }
}

/// A meta event. Unrecognized subtypes are kept opaque.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetaEvent {
    SetTempo { micros_per_quarter: u32 },
    TrackName(String),
    EndOfTrack,
    Other { subtype: u8, data: Vec<u8> },
}

impl MetaEvent {
    /// The meta type byte this event is encoded with.
    pub fn subtype(&self) -> u8 {
        match self {
            Self::SetTempo { .. } => META_SET_TEMPO,
            Self::TrackName(_) => META_TRACK_NAME,
            Self::EndOfTrack => META_END_OF_TRACK,
            Self::Other { subtype, .. } => *subtype,
        }
    }
}
