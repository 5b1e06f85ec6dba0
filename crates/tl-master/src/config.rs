//! Decode configuration.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tl_engine::{AssembleOptions, TempoSource, TieBreak, DEFAULT_EPSILON};
use tl_formats::DawOptions;

use crate::Error;

/// Options for one conversion run. Every field is optional in the JSON
/// form and falls back to its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeConfig {
    /// Tick resolution for the tick stamp of beat-based events
    pub ticks_per_quarter_default: u16,
    /// Rescale so the last Note Off lands here
    pub target_duration_seconds: Option<f64>,
    pub epsilon_for_constant_tempo: f64,
    pub tie_break: TieBreak,
    pub tempo_source: TempoSource,
    /// Semitone offset per DAWproject track name
    pub transpositions: BTreeMap<String, i32>,
    /// Preferred DAWproject track order
    pub track_order: Vec<String>,
    /// Channel for DAWproject note events
    pub note_channel: u8,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            ticks_per_quarter_default: 960,
            target_duration_seconds: None,
            epsilon_for_constant_tempo: DEFAULT_EPSILON,
            tie_break: TieBreak::default(),
            tempo_source: TempoSource::default(),
            transpositions: BTreeMap::new(),
            track_order: Vec::new(),
            note_channel: 13,
        }
    }
}

impl DecodeConfig {
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Self::from_json(&text)
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<(), Error> {
        if self.ticks_per_quarter_default == 0 {
            return Err(Error::Config("ticks_per_quarter_default must be positive".into()));
        }
        if !(self.epsilon_for_constant_tempo >= 0.0) {
            return Err(Error::Config(format!(
                "epsilon_for_constant_tempo must be non-negative, got {}",
                self.epsilon_for_constant_tempo
            )));
        }
        if let Some(target) = self.target_duration_seconds {
            if !(target.is_finite() && target > 0.0) {
                return Err(Error::Config(format!(
                    "target_duration_seconds must be positive, got {}",
                    target
                )));
            }
        }
        if self.note_channel > 15 {
            return Err(Error::Config(format!("note_channel must be 0-15, got {}", self.note_channel)));
        }
        Ok(())
    }

    pub fn assemble_options(&self) -> AssembleOptions {
        AssembleOptions {
            tie_break: self.tie_break,
            tempo_source: self.tempo_source,
            epsilon: self.epsilon_for_constant_tempo,
        }
    }

    pub fn daw_options(&self) -> DawOptions {
        DawOptions {
            ticks_per_beat: self.ticks_per_quarter_default,
            transpositions: self.transpositions.clone(),
            track_order: self.track_order.clone(),
            note_channel: self.note_channel,
        }
    }
}
