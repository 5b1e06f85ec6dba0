//! Tempo curve building.
//!
//! Both tempo flavours end up as the same thing: an ordered list of
//! segments `[start, end)` with a rate at each end. Step tempo (binary
//! files) has equal rates at both ends; ramp tempo (automation curves)
//! interpolates linearly between them. The last segment always runs to
//! positive infinity at the last known rate.

use alloc::vec::Vec;
use tl_ir::{
    DecodedSong, TempoAutomation, TempoPoint, TempoRate, TimeBase, DEFAULT_MICROS_PER_QUARTER,
};

/// Rates closer than this are integrated as constant.
pub const DEFAULT_EPSILON: f64 = 1e-4;

/// Tempo map construction failures.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TempoError {
    /// A tempo point with a zero, negative or NaN rate.
    #[error("non-positive tempo {rate} at position {position}")]
    NonPositiveTempo { position: f64, rate: f64 },
    /// Tick-based map with zero ticks per quarter note.
    #[error("tick resolution must be non-zero")]
    ZeroResolution,
}

/// Which tracks contribute Set Tempo events in tick-based files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TempoSource {
    /// Merge tempo events from every track
    #[default]
    AllTracks,
    /// Only the first track defines tempo
    FirstTrack,
}

/// Unit of segment positions and rates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TempoUnit {
    /// Positions in ticks, rates in microseconds per quarter note
    MicrosPerQuarter { ticks_per_quarter: u16 },
    /// Positions in beats, rates in beats per minute
    Bpm,
}

/// One piece of the tempo curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoSegment {
    pub start: f64,
    /// Exclusive; `f64::INFINITY` for the final segment
    pub end: f64,
    pub rate_start: f64,
    pub rate_end: f64,
}

impl TempoSegment {
    /// Length of the segment in position units.
    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        !(self.end > self.start)
    }
}

/// An immutable, normalized tempo map.
#[derive(Clone, Debug, PartialEq)]
pub struct TempoMap {
    pub(crate) unit: TempoUnit,
    pub(crate) segments: Vec<TempoSegment>,
    pub(crate) epsilon: f64,
    point_count: usize,
}

impl TempoMap {
    /// Build a step map from Set Tempo points (ticks, microseconds per quarter).
    ///
    /// Points sharing a tick keep their input order; the last one wins.
    pub fn step(points: &[TempoPoint], ticks_per_quarter: u16) -> Result<Self, TempoError> {
        if ticks_per_quarter == 0 {
            return Err(TempoError::ZeroResolution);
        }
        let raw: Vec<(f64, f64)> = points
            .iter()
            .map(|p| (p.position.value(), micros_of(p)))
            .collect();
        let normalized = normalize(raw, f64::from(DEFAULT_MICROS_PER_QUARTER))?;
        Ok(Self::from_points(
            TempoUnit::MicrosPerQuarter { ticks_per_quarter },
            &normalized,
            false,
        ))
    }

    /// Build a ramp map from a project's tempo automation (beats, BPM).
    ///
    /// Two points on the same beat form a zero-length segment, i.e. an
    /// instantaneous jump to the second value.
    pub fn ramp(automation: &TempoAutomation) -> Result<Self, TempoError> {
        let raw: Vec<(f64, f64)> = automation
            .points
            .iter()
            .map(|p| (p.position.value(), p.rate.bpm()))
            .collect();
        let normalized = normalize(raw, automation.initial_bpm)?;
        Ok(Self::from_points(TempoUnit::Bpm, &normalized, true))
    }

    /// Build the map a decoded song calls for.
    pub fn from_song(song: &DecodedSong, source: TempoSource) -> Result<Self, TempoError> {
        match song.time_base {
            TimeBase::Ticks { ticks_per_quarter } => {
                let first_only = source == TempoSource::FirstTrack;
                let points = song.set_tempo_points(first_only);
                if first_only {
                    let ignored = song.set_tempo_points(false).len() - points.len();
                    if ignored > 0 {
                        log::warn!("Ignoring {} tempo events outside the first track", ignored);
                    }
                }
                let map = Self::step(&points, ticks_per_quarter)?;
                log::debug!("Step tempo map: {} points, {} segments", map.point_count, map.segments.len());
                Ok(map)
            }
            TimeBase::Beats { .. } => {
                let fallback = TempoAutomation::default();
                let automation = song.automation.as_ref().unwrap_or(&fallback);
                let map = Self::ramp(automation)?;
                log::debug!("Ramp tempo map: {} points, {} segments", map.point_count, map.segments.len());
                Ok(map)
            }
        }
    }

    /// Replace the constant-tempo threshold.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn unit(&self) -> TempoUnit {
        self.unit
    }

    pub fn segments(&self) -> &[TempoSegment] {
        &self.segments
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Number of tempo points after normalization (including a synthesized
    /// point at 0).
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    fn from_points(unit: TempoUnit, points: &[(f64, f64)], ramp: bool) -> Self {
        let mut segments = Vec::with_capacity(points.len());
        for pair in points.windows(2) {
            let (start, rate_start) = pair[0];
            let (end, next_rate) = pair[1];
            if end > start {
                let rate_end = if ramp { next_rate } else { rate_start };
                segments.push(TempoSegment { start, end, rate_start, rate_end });
            }
        }
        // normalize() never returns an empty list
        let (start, rate) = points.last().copied().unwrap_or((0.0, 0.0));
        segments.push(TempoSegment {
            start,
            end: f64::INFINITY,
            rate_start: rate,
            rate_end: rate,
        });
        Self {
            unit,
            segments,
            epsilon: DEFAULT_EPSILON,
            point_count: points.len(),
        }
    }
}

/// Microseconds per quarter note, kept fractional for BPM points.
fn micros_of(point: &TempoPoint) -> f64 {
    match point.rate {
        TempoRate::MicrosPerQuarter(us) => f64::from(us),
        TempoRate::Bpm(bpm) if bpm > 0.0 => 60_000_000.0 / bpm,
        // Stays non-positive (or NaN) so normalize() rejects it
        TempoRate::Bpm(bpm) => bpm,
    }
}

/// Stable-sort by position, synthesize a point at 0 when the curve starts
/// later (or is empty), and reject non-positive rates.
fn normalize(mut points: Vec<(f64, f64)>, initial_rate: f64) -> Result<Vec<(f64, f64)>, TempoError> {
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    if points.first().map_or(true, |&(pos, _)| pos > 0.0) {
        points.insert(0, (0.0, initial_rate));
    }
    if let Some(&(position, rate)) = points.iter().find(|&&(_, rate)| !(rate > 0.0)) {
        return Err(TempoError::NonPositiveTempo { position, rate });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use pretty_assertions::assert_eq;
    use tl_ir::{EventKind, MetaEvent, Position, RawEvent, RawTrack};

    fn us(tick: u64, micros: u32) -> TempoPoint {
        TempoPoint::new(Position::Tick(tick), TempoRate::MicrosPerQuarter(micros))
    }

    fn bpm(beat: f64, value: f64) -> TempoPoint {
        TempoPoint::new(Position::Beat(beat), TempoRate::Bpm(value))
    }

    #[test]
    fn empty_step_map_gets_default_point() {
        let map = TempoMap::step(&[], 480).unwrap();
        assert_eq!(map.point_count(), 1);
        assert_eq!(
            map.segments(),
            &[TempoSegment { start: 0.0, end: f64::INFINITY, rate_start: 500_000.0, rate_end: 500_000.0 }]
        );
    }

    #[test]
    fn late_first_point_gets_default_prepended() {
        let map = TempoMap::step(&[us(480, 250_000)], 480).unwrap();
        assert_eq!(map.point_count(), 2);
        assert_eq!(map.segments()[0].end, 480.0);
        assert_eq!(map.segments()[0].rate_start, 500_000.0);
        assert_eq!(map.segments()[1].rate_start, 250_000.0);
    }

    #[test]
    fn step_points_are_sorted() {
        let map = TempoMap::step(&[us(960, 300_000), us(0, 600_000), us(480, 400_000)], 480).unwrap();
        let starts: Vec<f64> = map.segments().iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0.0, 480.0, 960.0]);
        assert!(map.segments().iter().all(|s| s.rate_start == s.rate_end));
    }

    #[test]
    fn step_duplicate_tick_last_wins() {
        let map = TempoMap::step(&[us(0, 600_000), us(0, 400_000)], 480).unwrap();
        assert_eq!(map.segments().len(), 1);
        assert_eq!(map.segments()[0].rate_start, 400_000.0);
    }

    #[test]
    fn step_bpm_points_keep_fractional_micros() {
        let points = [TempoPoint::new(Position::Tick(0), TempoRate::Bpm(90.0))];
        let map = TempoMap::step(&points, 480).unwrap();
        assert_eq!(map.segments()[0].rate_start, 60_000_000.0 / 90.0);
        assert_eq!(map.seconds_at(480.0), 480.0 * (60_000_000.0 / 90.0) / 480_000_000.0);

        let zero = [TempoPoint::new(Position::Tick(0), TempoRate::Bpm(0.0))];
        assert_eq!(
            TempoMap::step(&zero, 480),
            Err(TempoError::NonPositiveTempo { position: 0.0, rate: 0.0 })
        );
    }

    #[test]
    fn zero_resolution_rejected() {
        assert_eq!(TempoMap::step(&[], 0), Err(TempoError::ZeroResolution));
    }

    #[test]
    fn zero_micros_rejected() {
        let err = TempoMap::step(&[us(0, 0)], 480).unwrap_err();
        assert_eq!(err, TempoError::NonPositiveTempo { position: 0.0, rate: 0.0 });
    }

    #[test]
    fn ramp_segments_interpolate() {
        let automation = TempoAutomation {
            initial_bpm: 100.0,
            points: vec![bpm(0.0, 60.0), bpm(1.0, 120.0)],
        };
        let map = TempoMap::ramp(&automation).unwrap();
        assert_eq!(map.unit(), TempoUnit::Bpm);
        assert_eq!(
            map.segments(),
            &[
                TempoSegment { start: 0.0, end: 1.0, rate_start: 60.0, rate_end: 120.0 },
                TempoSegment { start: 1.0, end: f64::INFINITY, rate_start: 120.0, rate_end: 120.0 },
            ]
        );
    }

    #[test]
    fn ramp_step_pair_has_no_zero_length_segment() {
        let automation = TempoAutomation {
            initial_bpm: 60.0,
            points: vec![bpm(0.0, 60.0), bpm(2.0, 60.0), bpm(2.0, 120.0)],
        };
        let map = TempoMap::ramp(&automation).unwrap();
        assert_eq!(map.segments().len(), 2);
        assert_eq!(map.segments()[1].start, 2.0);
        assert_eq!(map.segments()[1].rate_start, 120.0);
    }

    #[test]
    fn ramp_without_curve_uses_initial_rate() {
        let map = TempoMap::ramp(&TempoAutomation::constant(90.0)).unwrap();
        assert_eq!(map.segments().len(), 1);
        assert_eq!(map.segments()[0].rate_start, 90.0);
    }

    #[test]
    fn ramp_negative_bpm_rejected() {
        let automation = TempoAutomation {
            initial_bpm: 120.0,
            points: vec![bpm(0.0, 120.0), bpm(4.0, -1.0)],
        };
        assert_eq!(
            TempoMap::ramp(&automation),
            Err(TempoError::NonPositiveTempo { position: 4.0, rate: -1.0 })
        );
    }

    #[test]
    fn nan_bpm_rejected() {
        let automation = TempoAutomation { initial_bpm: f64::NAN, points: Vec::new() };
        assert!(matches!(TempoMap::ramp(&automation), Err(TempoError::NonPositiveTempo { .. })));
    }

    #[test]
    fn from_song_respects_tempo_source() {
        let mut song = DecodedSong::new(TimeBase::Ticks { ticks_per_quarter: 96 });
        let mut t0 = RawTrack::new();
        t0.events.push(RawEvent::meta(0, Position::Tick(0), MetaEvent::SetTempo { micros_per_quarter: 400_000 }));
        let mut t1 = RawTrack::new();
        t1.events.push(RawEvent::meta(1, Position::Tick(96), MetaEvent::SetTempo { micros_per_quarter: 200_000 }));
        t1.events.push(RawEvent::channel(1, Position::Tick(96), 0, EventKind::note_on(60, 64)));
        song.tracks = vec![t0, t1];

        let all = TempoMap::from_song(&song, TempoSource::AllTracks).unwrap();
        assert_eq!(all.segments().len(), 2);
        let first = TempoMap::from_song(&song, TempoSource::FirstTrack).unwrap();
        assert_eq!(first.segments().len(), 1);
        assert_eq!(first.segments()[0].rate_start, 400_000.0);
    }

    #[test]
    fn from_song_beats_without_automation_is_120() {
        let song = DecodedSong::new(TimeBase::Beats { ticks_per_beat: 960 });
        let map = TempoMap::from_song(&song, TempoSource::AllTracks).unwrap();
        assert_eq!(map.unit(), TempoUnit::Bpm);
        assert_eq!(map.segments()[0].rate_start, 120.0);
    }

    #[test]
    fn with_epsilon_overrides_default() {
        let map = TempoMap::step(&[], 480).unwrap();
        assert_eq!(map.epsilon(), DEFAULT_EPSILON);
        assert_eq!(map.with_epsilon(0.5).epsilon(), 0.5);
    }
}
