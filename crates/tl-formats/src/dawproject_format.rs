//! DAWproject decoder.
//!
//! A `.dawproject` file is a zip archive holding a `project.xml` document.
//! The decoder reads the global tempo (initial value plus its automation
//! curve), the track structure and the note clips of the arrangement, and
//! produces a beat-based [`DecodedSong`].

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use roxmltree::{Document, Node};
use tl_ir::{
    DecodedSong, EventKind, MetaEvent, Position, RawEvent, RawTrack, TempoAutomation, TempoPoint,
    TempoRate, TimeBase, DEFAULT_BPM,
};

use crate::FormatError;

/// Archive member holding the project document.
pub const PROJECT_MEMBER: &str = "project.xml";

const DEFAULT_KEY: i32 = 60;
const DEFAULT_VELOCITY: f64 = 0.5;

/// How DAWproject notes are turned into events.
#[derive(Clone, Debug, PartialEq)]
pub struct DawOptions {
    /// Resolution of the integer tick stamp derived from beat positions
    pub ticks_per_beat: u16,
    /// Semitone offset per track display name
    pub transpositions: BTreeMap<String, i32>,
    /// Preferred output order by display name; other tracks follow in
    /// first-appearance order
    pub track_order: Vec<String>,
    /// Channel stamped on note events
    pub note_channel: u8,
}

impl Default for DawOptions {
    fn default() -> Self {
        Self {
            ticks_per_beat: 960,
            transpositions: BTreeMap::new(),
            track_order: Vec::new(),
            note_channel: 13,
        }
    }
}

/// Decode a `.dawproject` archive.
pub fn load_dawproject(data: &[u8], options: &DawOptions) -> Result<DecodedSong, FormatError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).map_err(|e| FormatError::Archive(e.to_string()))?;
    let mut member = archive.by_name(PROJECT_MEMBER).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => FormatError::MissingDocument(PROJECT_MEMBER.into()),
        other => FormatError::Archive(other.to_string()),
    })?;
    let mut xml = String::new();
    member
        .read_to_string(&mut xml)
        .map_err(|e| FormatError::Archive(e.to_string()))?;
    log::debug!("[DAW] {} is {} bytes", PROJECT_MEMBER, xml.len());
    load_dawproject_xml(&xml, options)
}

/// Decode a bare DAWproject `project.xml` document.
pub fn load_dawproject_xml(xml: &str, options: &DawOptions) -> Result<DecodedSong, FormatError> {
    let doc = Document::parse(xml).map_err(|e| FormatError::Xml(e.to_string()))?;
    let root = doc.root_element();

    let automation = read_tempo(&doc, root)?;
    log::debug!(
        "[DAW] tempo {} BPM, {} automation points",
        automation.initial_bpm,
        automation.points.len()
    );

    let names = read_track_names(root);
    let tracks = read_arrangement(root, &names, options)?;

    let mut song = DecodedSong::new(TimeBase::Beats {
        ticks_per_beat: options.ticks_per_beat,
    });
    song.tracks = order_tracks(tracks, &options.track_order);
    song.automation = Some(automation);
    log::debug!("[DAW] {} tracks, {} events", song.tracks.len(), song.event_count());
    Ok(song)
}

// ---------------------------------------------------------------------------
// Element helpers
// ---------------------------------------------------------------------------

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn children<'a, 'i: 'a>(node: Node<'a, 'i>, name: &'a str) -> impl Iterator<Item = Node<'a, 'i>> + 'a {
    node.children().filter(move |n| n.has_tag_name(name))
}

fn parse_attr<T: std::str::FromStr>(node: Node, attribute: &str, raw: &str) -> Result<T, FormatError> {
    raw.trim().parse().map_err(|_| invalid(node, attribute, raw))
}

fn invalid(node: Node, attribute: &str, raw: &str) -> FormatError {
    FormatError::InvalidNumericAttribute {
        element: node.tag_name().name().into(),
        attribute: attribute.into(),
        value: raw.into(),
    }
}

/// Finite float attribute, `default` when absent.
fn f64_attr(node: Node, attribute: &str, default: f64) -> Result<f64, FormatError> {
    match node.attribute(attribute) {
        None => Ok(default),
        Some(raw) => {
            let v: f64 = parse_attr(node, attribute, raw)?;
            if v.is_finite() {
                Ok(v)
            } else {
                Err(invalid(node, attribute, raw))
            }
        }
    }
}

fn required_f64_attr(node: Node, attribute: &str) -> Result<f64, FormatError> {
    if node.attribute(attribute).is_none() {
        return Err(FormatError::MissingAttribute {
            element: node.tag_name().name().into(),
            attribute: attribute.into(),
        });
    }
    f64_attr(node, attribute, 0.0)
}

// ---------------------------------------------------------------------------
// Tempo
// ---------------------------------------------------------------------------

fn read_tempo(doc: &Document, root: Node) -> Result<TempoAutomation, FormatError> {
    let tempo = child(root, "Transport").and_then(|t| child(t, "Tempo"));
    let initial_bpm = match tempo {
        Some(node) => f64_attr(node, "value", DEFAULT_BPM)?,
        None => DEFAULT_BPM,
    };
    let mut automation = TempoAutomation::constant(initial_bpm);

    let Some(tempo_id) = tempo.and_then(|t| t.attribute("id")) else {
        return Ok(automation);
    };

    // Only the first curve targeting the tempo parameter is used
    let curve = doc.descendants().find(|n| {
        n.is_element()
            && child(*n, "Target").is_some_and(|t| t.attribute("parameter") == Some(tempo_id))
    });
    let Some(curve) = curve else {
        return Ok(automation);
    };

    let mut samples = Vec::new();
    for point in children(curve, "RealPoint") {
        samples.push(read_point(point)?);
    }
    if let Some(container) = child(curve, "Points") {
        for point in container.children().filter(Node::is_element) {
            samples.push(read_point(point)?);
        }
    }
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));

    automation.points = samples
        .into_iter()
        .map(|(beat, bpm)| TempoPoint::new(Position::Beat(beat), TempoRate::Bpm(bpm)))
        .collect();
    Ok(automation)
}

fn read_point(node: Node) -> Result<(f64, f64), FormatError> {
    Ok((required_f64_attr(node, "time")?, required_f64_attr(node, "value")?))
}

// ---------------------------------------------------------------------------
// Tracks and notes
// ---------------------------------------------------------------------------

fn read_track_names(root: Node) -> BTreeMap<String, String> {
    let mut names = BTreeMap::new();
    if let Some(structure) = child(root, "Structure") {
        for track in children(structure, "Track") {
            if let (Some(id), Some(name)) = (track.attribute("id"), track.attribute("name")) {
                names.insert(id.to_string(), name.to_string());
            }
        }
    }
    names
}

fn read_arrangement(
    root: Node,
    names: &BTreeMap<String, String>,
    options: &DawOptions,
) -> Result<Vec<RawTrack>, FormatError> {
    let mut tracks: Vec<RawTrack> = Vec::new();
    let Some(lanes) = child(root, "Arrangement").and_then(|a| child(a, "Lanes")) else {
        return Ok(tracks);
    };

    for lane in children(lanes, "Lanes") {
        let Some(name) = lane.attribute("track").and_then(|id| names.get(id)) else {
            continue;
        };
        let index = match tracks.iter().position(|t| t.name.as_deref() == Some(name.as_str())) {
            Some(i) => i,
            None => {
                let mut track = RawTrack::named(name);
                track.events.push(RawEvent::meta(
                    tracks.len(),
                    Position::Beat(0.0),
                    MetaEvent::TrackName(name.clone()),
                ));
                tracks.push(track);
                tracks.len() - 1
            }
        };
        let transpose = options.transpositions.get(name).copied().unwrap_or(0);

        for clip in children(lane, "Clips").flat_map(|c| children(c, "Clip")) {
            read_clip(clip, name, transpose, index, options.note_channel, &mut tracks[index])?;
        }
    }
    Ok(tracks)
}

fn read_clip(
    clip: Node,
    track_name: &str,
    transpose: i32,
    index: usize,
    channel: u8,
    track: &mut RawTrack,
) -> Result<(), FormatError> {
    let clip_time = f64_attr(clip, "time", 0.0)?;
    let play_start = f64_attr(clip, "playStart", 0.0)?;
    let Some(notes) = child(clip, "Notes") else {
        return Ok(());
    };

    for note in children(notes, "Note") {
        let time = f64_attr(note, "time", 0.0)?;
        let duration = f64_attr(note, "duration", 0.0)?;
        let key = match note.attribute("key") {
            Some(raw) => parse_attr::<i32>(note, "key", raw)?,
            None => DEFAULT_KEY,
        };
        let vel = f64_attr(note, "vel", DEFAULT_VELOCITY)?;
        let rel = f64_attr(note, "rel", DEFAULT_VELOCITY)?;

        let start = clip_time + (time - play_start);
        let end = start + duration;
        let key = clamp_key(key.saturating_add(transpose), track_name);

        // Kept as Note On even at velocity 0 so every note has a start
        track.events.push(RawEvent::channel(
            index,
            Position::Beat(start),
            channel,
            EventKind::NoteOn { note: key, velocity: velocity_byte(vel) },
        ));
        track.events.push(RawEvent::channel(
            index,
            Position::Beat(end),
            channel,
            EventKind::NoteOff { note: key, velocity: velocity_byte(rel) },
        ));
    }
    Ok(())
}

fn clamp_key(key: i32, track_name: &str) -> u8 {
    let clamped = key.clamp(0, 127);
    if clamped != key {
        log::warn!("Key {} on track {:?} is out of range, clamped to {}", key, track_name, clamped);
    }
    clamped as u8
}

/// Normalized 0..1 velocity to a 7-bit value, truncating.
fn velocity_byte(v: f64) -> u8 {
    (v * 127.0).clamp(0.0, 127.0) as u8
}

fn order_tracks(mut tracks: Vec<RawTrack>, order: &[String]) -> Vec<RawTrack> {
    let mut ordered = Vec::with_capacity(tracks.len());
    for name in order {
        if let Some(i) = tracks.iter().position(|t| t.name.as_ref() == Some(name)) {
            ordered.push(tracks.remove(i));
        }
    }
    ordered.extend(tracks);
    for (index, track) in ordered.iter_mut().enumerate() {
        for event in &mut track.events {
            event.track = index;
        }
    }
    ordered
}
