//! Format decoders for tempoline.
//!
//! Decodes Standard MIDI Files and DAWproject documents into the IR.

mod cursor;
mod dawproject_format;
mod smf_format;

pub use cursor::ByteCursor;
pub use dawproject_format::{load_dawproject, load_dawproject_xml, DawOptions, PROJECT_MEMBER};
pub use smf_format::{load_smf, SmfHeader};

/// Error type for format decoding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    /// A read ran past the end of the buffer
    #[error("truncated input at byte {offset}: {needed} more bytes needed")]
    TruncatedInput { offset: usize, needed: usize },
    /// Variable-length quantity wider than 32 bits
    #[error("malformed variable-length quantity at byte {offset}")]
    MalformedVarint { offset: usize },
    /// Chunk tag did not match
    #[error("expected chunk {expected:?} at byte {offset}, found {found:?}")]
    InvalidChunkHeader {
        offset: usize,
        expected: [u8; 4],
        found: [u8; 4],
    },
    /// Data byte with no earlier status byte to inherit
    #[error("running status used without a previous status at byte {offset}")]
    RunningStatusUnavailable { offset: usize },
    /// End of chunk reached in the middle of an event
    #[error("event at byte {offset} runs past the end of its chunk")]
    TruncatedEvent { offset: usize },
    /// SMPTE time division
    #[error("unsupported SMPTE time division 0x{0:04X}")]
    UnsupportedTimeDivision(u16),
    /// System common or real-time status inside a track chunk
    #[error("unsupported status byte 0x{status:02X} at byte {offset}")]
    UnsupportedStatus { offset: usize, status: u8 },
    #[error("invalid numeric attribute {element}@{attribute}: {value:?}")]
    InvalidNumericAttribute {
        element: String,
        attribute: String,
        value: String,
    },
    #[error("missing attribute {element}@{attribute}")]
    MissingAttribute { element: String, attribute: String },
    /// Archive has no member with the expected name
    #[error("archive has no {0}")]
    MissingDocument(String),
    #[error("archive error: {0}")]
    Archive(String),
    #[error("xml error: {0}")]
    Xml(String),
    /// Failure located in one track
    #[error("track {index}: {source}")]
    Track {
        index: usize,
        #[source]
        source: Box<FormatError>,
    },
}

impl FormatError {
    /// Attach a track index.
    pub fn in_track(self, index: usize) -> Self {
        match self {
            err @ Self::Track { .. } => err,
            err => Self::Track {
                index,
                source: Box::new(err),
            },
        }
    }

    /// Innermost error, without the track wrapper.
    pub fn root(&self) -> &FormatError {
        match self {
            Self::Track { source, .. } => source.root(),
            err => err,
        }
    }
}
