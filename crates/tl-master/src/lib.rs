//! Headless converter for tempoline.
//!
//! Detects the input format, decodes it, assembles the timed timeline and
//! exports it as JSON. The CLI is a thin wrapper around [`Converter`].

mod config;
mod json;

use std::path::{Path, PathBuf};

use tl_engine::{assemble_timeline, summarize, RescaleOutcome, TempoError, Timeline, TimelineSummary};
use tl_ir::DecodedSong;

pub use config::DecodeConfig;
pub use json::{timeline_to_json, write_json};
pub use tl_engine::{TempoSource, TieBreak};
pub use tl_formats::FormatError;

/// Any failure of a conversion run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Tempo(#[from] TempoError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config: {0}")]
    Config(String),
    /// Input is neither a MIDI file nor a DAWproject
    #[error("unrecognized input format")]
    UnknownInput,
}

/// Input kinds recognized by [`InputFormat::sniff`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// Standard MIDI File
    Smf,
    /// Zipped `.dawproject`
    DawArchive,
    /// Bare DAWproject `project.xml`
    DawXml,
}

impl InputFormat {
    /// Detect the format from leading bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"MThd") {
            return Some(Self::Smf);
        }
        if data.starts_with(b"PK\x03\x04") {
            return Some(Self::DawArchive);
        }
        let text = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
        match text.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'<') => Some(Self::DawXml),
            _ => None,
        }
    }
}

/// Result of one conversion.
#[derive(Debug)]
pub struct Conversion {
    pub format: InputFormat,
    pub timeline: Timeline,
    /// Counts taken before any rescale
    pub summary: TimelineSummary,
    pub rescale: Option<RescaleOutcome>,
}

/// Converter: owns a configuration and runs decode → assemble → rescale.
pub struct Converter {
    config: DecodeConfig,
}

impl Converter {
    pub fn new(config: DecodeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decode an input buffer into the IR, without timing.
    pub fn decode(&self, data: &[u8]) -> Result<(InputFormat, DecodedSong), Error> {
        let format = InputFormat::sniff(data).ok_or(Error::UnknownInput)?;
        log::debug!("Input detected as {:?}", format);
        let song = match format {
            InputFormat::Smf => tl_formats::load_smf(data)?,
            InputFormat::DawArchive => tl_formats::load_dawproject(data, &self.config.daw_options())?,
            InputFormat::DawXml => {
                let text = std::str::from_utf8(data).map_err(|e| FormatError::Xml(e.to_string()))?;
                let text = text.trim_start_matches('\u{FEFF}');
                tl_formats::load_dawproject_xml(text, &self.config.daw_options())?
            }
        };
        Ok((format, song))
    }

    /// Full conversion of an input buffer.
    pub fn convert(&self, data: &[u8]) -> Result<Conversion, Error> {
        let (format, song) = self.decode(data)?;
        let mut timeline = assemble_timeline(song, &self.config.assemble_options())?;
        let summary = summarize(&timeline);
        let rescale = self
            .config
            .target_duration_seconds
            .map(|target| timeline.rescale_to(target));
        Ok(Conversion {
            format,
            timeline,
            summary,
            rescale,
        })
    }

    /// Convert `input` and write the JSON to `output`, or next to the input
    /// when `output` is `None`. Returns the conversion and the path written.
    pub fn convert_file(&self, input: &Path, output: Option<&Path>) -> Result<(Conversion, PathBuf), Error> {
        let data = std::fs::read(input).map_err(|source| Error::Io {
            path: input.to_path_buf(),
            source,
        })?;
        let conversion = self.convert(&data)?;

        let out_path = output.map_or_else(|| default_output_path(input), Path::to_path_buf);
        let io_err = |source| Error::Io {
            path: out_path.clone(),
            source,
        };
        let file = std::fs::File::create(&out_path).map_err(io_err)?;
        let mut writer = std::io::BufWriter::new(file);
        write_json(&mut writer, &conversion.timeline)?;
        std::io::Write::flush(&mut writer).map_err(io_err)?;
        log::info!("Saved to {}", out_path.display());
        Ok((conversion, out_path))
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(DecodeConfig::default())
    }
}

/// Output path for an input: a known extension is replaced by `.json`,
/// anything else gets `.json` appended.
pub fn default_output_path(input: &Path) -> PathBuf {
    let known = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ["mid", "midi", "dawproject", "xml"].iter().any(|k| e.eq_ignore_ascii_case(k)));
    if known {
        input.with_extension("json")
    } else {
        let mut name = input.as_os_str().to_owned();
        name.push(".json");
        PathBuf::from(name)
    }
}
