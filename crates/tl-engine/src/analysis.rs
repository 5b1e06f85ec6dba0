//! Timeline summary, printed after a conversion run.

use alloc::collections::BTreeSet;
use core::fmt;

use tl_ir::EventKind;

use crate::timeline::Timeline;

/// What a timeline contains.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineSummary {
    pub tracks: usize,
    pub events: usize,
    pub notes: usize,
    pub note_range: Option<(u8, u8)>,
    pub channels: BTreeSet<u8>,
    pub tempo_points: usize,
    pub last_note_off: f64,
    pub max_event_time: f64,
}

/// Scan a timeline and count what it holds.
pub fn summarize(timeline: &Timeline) -> TimelineSummary {
    let mut summary = TimelineSummary {
        tracks: timeline.tracks().len(),
        events: timeline.event_count(),
        notes: 0,
        note_range: None,
        channels: BTreeSet::new(),
        tempo_points: timeline.tempo().point_count(),
        last_note_off: timeline.last_note_off_time(),
        max_event_time: timeline.max_event_time(),
    };

    for event in timeline.tracks().iter().flat_map(|t| t.events()) {
        if let Some(ch) = event.channel() {
            summary.channels.insert(ch);
        }
        if let EventKind::NoteOn { note, .. } = *event.kind() {
            summary.notes += 1;
            summary.note_range = Some(match summary.note_range {
                Some((lo, hi)) => (lo.min(note), hi.max(note)),
                None => (note, note),
            });
        }
    }

    summary
}

impl fmt::Display for TimelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tracks:   {}", self.tracks)?;
        writeln!(f, "Events:   {} ({} notes)", self.events, self.notes)?;
        if let Some((lo, hi)) = self.note_range {
            writeln!(f, "Range:    {} - {} (MIDI)", lo, hi)?;
        }
        if self.channels.is_empty() {
            writeln!(f, "Channels: (none)")?;
        } else {
            let channels: alloc::vec::Vec<alloc::string::String> =
                self.channels.iter().map(|c| alloc::format!("{}", c)).collect();
            writeln!(f, "Channels: {}", channels.join(", "))?;
        }
        writeln!(f, "Tempo:    {} points", self.tempo_points)?;
        writeln!(f, "Last note off: {:.3}s", self.last_note_off)?;
        writeln!(f, "Duration: {:.3}s", self.max_event_time)
    }
}
