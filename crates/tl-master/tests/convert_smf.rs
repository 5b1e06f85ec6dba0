//! End-to-end conversion of in-memory MIDI files.

use pretty_assertions::assert_eq;
use tl_engine::RescaleOutcome;
use tl_master::{Converter, DecodeConfig, Error, FormatError, InputFormat, TempoSource, TieBreak};

fn smf(division: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = b"MThd".to_vec();
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&division.to_be_bytes());
    for body in tracks {
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
    }
    out
}

/// Track 0: 120 BPM, then 240 BPM from tick 960. Track 1: a legato line
/// whose notes touch at tick 480, plus a tempo event of its own.
fn song() -> Vec<u8> {
    let conductor = vec![
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // 500000
        0x87, 0x40, 0xFF, 0x51, 0x03, 0x03, 0xD0, 0x90, // +960: 250000
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let melody = vec![
        0x00, 0x90, 60, 100, // 0: on 60
        0x83, 0x60, 0x90, 62, 100, // 480: on 62
        0x00, 0x80, 60, 0, // 480: off 60
        0x83, 0x60, 0x80, 62, 0, // 960: off 62
        0x00, 0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40, // 960: 1000000 (second track)
        0x87, 0x40, 0x90, 64, 80, // 1920: on 64
        0x83, 0x60, 64, 0, // 2400: off 64 (running status, velocity 0)
    ];
    smf(480, &[conductor, melody])
}

fn times(conversion: &tl_master::Conversion, track: usize) -> Vec<(u64, &'static str, f64)> {
    conversion.timeline.tracks()[track]
        .events()
        .iter()
        .map(|e| (e.tick(), e.kind().name(), e.time()))
        .collect()
}

#[test]
fn merged_tempo_map() {
    let conversion = Converter::default().convert(&song()).unwrap();
    assert_eq!(conversion.format, InputFormat::Smf);
    // All tracks: 0.5 s/qn to 960, then the melody track's 1.0 s/qn at 960
    // overrides the conductor's 0.25 s/qn at the same tick
    assert_eq!(
        times(&conversion, 1),
        vec![
            (0, "NoteOn", 0.0),
            (480, "NoteOff", 0.5),
            (480, "NoteOn", 0.5),
            (960, "NoteOff", 1.0),
            (960, "Meta", 1.0),
            (1920, "NoteOn", 3.0),
            (2400, "NoteOff", 4.0),
            (2400, "Meta", 4.0),
        ]
    );
    assert_eq!(conversion.summary.last_note_off, 4.0);
    assert_eq!(conversion.summary.tracks, 2);
    assert_eq!(conversion.summary.notes, 3);
    assert_eq!(conversion.rescale, None);
}

#[test]
fn first_track_tempo_only() {
    let config = DecodeConfig {
        tempo_source: TempoSource::FirstTrack,
        ..Default::default()
    };
    let conversion = Converter::new(config).convert(&song()).unwrap();
    // 0.25 s/qn from 960: 1920 is 1.0 + 0.5
    let melody = times(&conversion, 1);
    assert_eq!(melody[5], (1920, "NoteOn", 1.5));
    assert_eq!(melody[6], (2400, "NoteOff", 1.75));
}

#[test]
fn note_on_first_ordering() {
    let config = DecodeConfig {
        tie_break: TieBreak::NoteOnFirst,
        ..Default::default()
    };
    let conversion = Converter::new(config).convert(&song()).unwrap();
    let melody = times(&conversion, 1);
    assert_eq!(melody[1], (480, "NoteOn", 0.5));
    assert_eq!(melody[2], (480, "NoteOff", 0.5));
}

#[test]
fn rescale_to_target() {
    let config = DecodeConfig {
        target_duration_seconds: Some(10.0),
        ..Default::default()
    };
    let conversion = Converter::new(config).convert(&song()).unwrap();
    assert_eq!(conversion.rescale, Some(RescaleOutcome::Applied { factor: 2.5 }));
    assert!((conversion.timeline.last_note_off_time() - 10.0).abs() < 1e-9);
    // Summary keeps the unscaled figures
    assert_eq!(conversion.summary.last_note_off, 4.0);
    let melody = times(&conversion, 1);
    assert_eq!(melody[1].2, 1.25);
}

#[test]
fn rescale_without_notes_is_skipped() {
    let empty = smf(96, &[vec![0x00, 0xFF, 0x2F, 0x00]]);
    let config = DecodeConfig {
        target_duration_seconds: Some(3.0),
        ..Default::default()
    };
    let conversion = Converter::new(config).convert(&empty).unwrap();
    assert_eq!(conversion.rescale, Some(RescaleOutcome::Skipped));
    assert_eq!(conversion.timeline.max_event_time(), 0.0);
}

#[test]
fn decode_errors_surface_unchanged() {
    let mut data = song();
    let last = data.len() - 1;
    data.truncate(last);
    match Converter::default().convert(&data) {
        Err(Error::Format(err)) => assert!(matches!(err.root(), FormatError::TruncatedInput { .. })),
        other => panic!("expected a format error, got {:?}", other.map(|c| c.format)),
    }
}

#[test]
fn zero_tempo_is_an_error() {
    let track = vec![0x00, 0xFF, 0x51, 0x03, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x2F, 0x00];
    assert!(matches!(
        Converter::default().convert(&smf(96, &[track])),
        Err(Error::Tempo(_))
    ));
}

#[test]
fn zero_epsilon_from_config_maps_every_event() {
    let config = DecodeConfig::from_json(r#"{"epsilon_for_constant_tempo": 0.0}"#).unwrap();
    let conversion = Converter::new(config).convert(&song()).unwrap();
    let melody = times(&conversion, 1);
    assert!(melody.iter().all(|&(_, _, t)| t.is_finite()));
    assert_eq!(melody[5], (1920, "NoteOn", 3.0));
    assert_eq!(conversion.summary.last_note_off, 4.0);

    let json = tl_master::timeline_to_json(&conversion.timeline);
    assert_eq!(json[1][1]["time"], 0.5);
}
