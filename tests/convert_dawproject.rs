//! End-to-end conversion of DAWproject archives built in memory.

use std::io::{Cursor, Write};

use pretty_assertions::assert_eq;
use serde_json::Value;
use tl_master::{timeline_to_json, Converter, DecodeConfig, InputFormat};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Two lanes for the same violin track, a cello lane, and a tempo curve
/// that ramps 60 → 120 over the first beat, then jumps to 90.
const PROJECT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Project version="1.0">
  <Application name="Test" version="1"/>
  <Transport>
    <Tempo max="666" min="20" unit="bpm" value="60" id="id2" name="Tempo"/>
    <TimeSignature denominator="4" numerator="4" id="id3"/>
  </Transport>
  <Structure>
    <Track contentType="notes" id="id10" name="Violoncello"/>
    <Track contentType="notes" id="id11" name="Violin I"/>
  </Structure>
  <Arrangement id="id20">
    <Lanes timeUnit="beats" id="id21">
      <Lanes track="id10" id="id22">
        <Clips id="id23">
          <Clip time="1" duration="4" playStart="0">
            <Notes id="id24">
              <Note time="0" duration="1" channel="0" key="48" vel="0.7874016" rel="0.5"/>
            </Notes>
          </Clip>
        </Clips>
      </Lanes>
      <Lanes track="id11" id="id25">
        <Clips id="id26">
          <Clip time="0" duration="1" playStart="0">
            <Notes id="id27">
              <Note time="0" duration="1" channel="0" key="76" vel="1.0" rel="0"/>
            </Notes>
          </Clip>
        </Clips>
      </Lanes>
      <Lanes track="id11" id="id28">
        <Clips id="id29">
          <Clip time="2" duration="1" playStart="0.5">
            <Notes id="id30">
              <Note time="0.5" duration="0.5" channel="0" key="79"/>
            </Notes>
          </Clip>
        </Clips>
      </Lanes>
    </Lanes>
    <Points unit="bpm" id="id40">
      <Target parameter="id2"/>
      <RealPoint time="0" value="60" interpolation="linear"/>
      <RealPoint time="1" value="120" interpolation="linear"/>
      <RealPoint time="1" value="90" interpolation="linear"/>
    </Points>
  </Arrangement>
</Project>"#;

fn dawproject() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file("project.xml", SimpleFileOptions::default()).unwrap();
    writer.write_all(PROJECT.as_bytes()).unwrap();
    writer.start_file("metadata.xml", SimpleFileOptions::default()).unwrap();
    writer.write_all(b"<MetaData/>").unwrap();
    writer.finish().unwrap().into_inner()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn archive_to_timeline() {
    let config = DecodeConfig {
        track_order: vec!["Violin I".into()],
        transpositions: [("Violoncello".to_string(), -12)].into_iter().collect(),
        ..Default::default()
    };
    let conversion = Converter::new(config).convert(&dawproject()).unwrap();
    assert_eq!(conversion.format, InputFormat::DawArchive);

    let tracks = conversion.timeline.tracks();
    let names: Vec<_> = tracks.iter().map(|t| t.name()).collect();
    assert_eq!(names, vec![Some("Violin I"), Some("Violoncello")]);

    // Ramp 60 → 120 over beat 0..1 takes ln 2 seconds, then 90 BPM
    let ln2 = std::f64::consts::LN_2;
    let violin: Vec<(u64, &str, f64)> = tracks[0]
        .events()
        .iter()
        .map(|e| (e.tick(), e.kind().name(), e.time()))
        .collect();
    assert_eq!(violin.len(), 6);
    assert_eq!((violin[0].0, violin[0].1), (0, "Meta"));
    assert_eq!((violin[1].0, violin[1].1), (0, "NoteOn"));
    assert!(approx(violin[2].2, ln2));
    // Second lane: 2 + (0.5 - 0.5) = beat 2 to beat 2.5
    assert_eq!((violin[3].0, violin[4].0), (1920, 2400));
    assert!(approx(violin[3].2, ln2 + 60.0 / 90.0));
    assert!(approx(violin[4].2, ln2 + 1.5 * 60.0 / 90.0));
    assert_eq!(violin[5].1, "Meta");
    assert_eq!(violin[5].0, 2400);

    let cello = tracks[1].events();
    assert_eq!(cello[1].kind(), &tl_ir::EventKind::NoteOn { note: 36, velocity: 100 });
    assert!(approx(cello[1].time(), ln2));
    assert!(approx(cello[2].time(), ln2 + 60.0 / 90.0));
}

#[test]
fn json_shape() {
    let conversion = Converter::default().convert(&dawproject()).unwrap();
    let json = timeline_to_json(&conversion.timeline);
    let tracks = json.as_array().unwrap();
    assert_eq!(tracks.len(), 2);

    let first = &tracks[0][0];
    assert_eq!(first["type"], "meta");
    assert_eq!(first["subType"], "trackName");
    assert_eq!(first["text"], "Violoncello");
    assert_eq!(first.get("channel"), None);

    let note = &tracks[0][1];
    assert_eq!(note["type"], "noteOn");
    assert_eq!(note["channel"], 13);
    assert_eq!(note["absoluteTicks"], 960);
    assert_eq!(note["note"], 48);

    let last = tracks[1].as_array().unwrap().last().unwrap();
    assert_eq!(last["subType"], "endOfTrack");
    assert_eq!(last["metaType"], Value::from(47));
}

#[test]
fn rescale_dawproject() {
    let config = DecodeConfig {
        target_duration_seconds: Some(30.0),
        ..Default::default()
    };
    let conversion = Converter::new(config).convert(&dawproject()).unwrap();
    assert!(approx(conversion.timeline.last_note_off_time(), 30.0));
    let raw = conversion.summary.last_note_off;
    assert!(approx(raw, std::f64::consts::LN_2 + 1.5 * 60.0 / 90.0));
}
