//! Symbolic position to seconds.
//!
//! Integrates the tempo map segment by segment. A constant segment costs
//! `span * 60 / bpm` seconds (or `span * us / (tpq * 1e6)` for tick maps);
//! a linear BPM ramp `v(x) = v1 + slope * x` costs
//! `∫ 60 / v(x) dx = (60 / slope) * ln(v_end / v1)`.

use tl_ir::Position;

use crate::tempo_map::{TempoMap, TempoSegment, TempoUnit};

impl TempoMap {
    /// Elapsed seconds from position 0 to `position`.
    ///
    /// Pure and monotonic. Positions at or before the start of the map
    /// (including negative and NaN positions) map to 0; positions past the
    /// last point extrapolate at the last rate.
    pub fn seconds_at(&self, position: f64) -> f64 {
        let mut elapsed = 0.0;
        for seg in &self.segments {
            if !(position > seg.start) {
                break;
            }
            if position >= seg.end {
                elapsed += self.span_seconds(seg, seg.len(), seg.rate_end);
            } else {
                let span = position - seg.start;
                let rate_at = seg.rate_start + self.slope(seg) * span;
                elapsed += self.span_seconds(seg, span, rate_at);
                break;
            }
        }
        elapsed
    }

    /// Elapsed seconds at a symbolic position.
    pub fn seconds_at_position(&self, position: Position) -> f64 {
        self.seconds_at(position.value())
    }

    /// Step maps are constant everywhere; a BPM segment is constant when
    /// its end rates are equal or closer than epsilon.
    fn is_constant(&self, seg: &TempoSegment) -> bool {
        match self.unit {
            TempoUnit::MicrosPerQuarter { .. } => true,
            TempoUnit::Bpm => {
                seg.rate_end == seg.rate_start
                    || libm::fabs(seg.rate_end - seg.rate_start) < self.epsilon
            }
        }
    }

    fn slope(&self, seg: &TempoSegment) -> f64 {
        if self.is_constant(seg) {
            0.0
        } else {
            (seg.rate_end - seg.rate_start) / seg.len()
        }
    }

    /// Seconds spent over `span` units from the segment start, where the
    /// rate has reached `rate_at` at the end of the span.
    fn span_seconds(&self, seg: &TempoSegment, span: f64, rate_at: f64) -> f64 {
        if self.is_constant(seg) {
            return self.constant_seconds(span, seg.rate_start);
        }
        let slope = (seg.rate_end - seg.rate_start) / seg.len();
        (60.0 / slope) * libm::log(rate_at / seg.rate_start)
    }

    fn constant_seconds(&self, span: f64, rate: f64) -> f64 {
        match self.unit {
            TempoUnit::MicrosPerQuarter { ticks_per_quarter } => {
                span * rate / (f64::from(ticks_per_quarter) * 1_000_000.0)
            }
            TempoUnit::Bpm => span * 60.0 / rate,
        }
    }
}
