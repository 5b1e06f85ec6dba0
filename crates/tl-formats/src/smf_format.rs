//! Standard MIDI File decoder.
//!
//! Decodes the MThd header and every MTrk chunk into a tick-based
//! [`DecodedSong`]. Each track is decoded by its own [`TrackDecoder`] with
//! its own running status, so tracks can be decoded independently.

use tl_ir::{DecodedSong, EventKind, MetaEvent, Position, RawEvent, RawTrack, TimeBase};
use tl_ir::{META_END_OF_TRACK, META_SET_TEMPO, META_TRACK_NAME};

use crate::cursor::ByteCursor;
use crate::FormatError;

const HEADER_TAG: [u8; 4] = *b"MThd";
const TRACK_TAG: [u8; 4] = *b"MTrk";

/// Parsed MThd fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SmfHeader {
    pub format: u16,
    pub track_count: u16,
    pub ticks_per_quarter: u16,
}

/// A located track chunk body.
struct TrackChunk<'a> {
    base: usize,
    body: &'a [u8],
}

/// Decode a Standard MIDI File.
pub fn load_smf(data: &[u8]) -> Result<DecodedSong, FormatError> {
    let mut cursor = ByteCursor::new(data);
    let header = read_header(&mut cursor)?;
    log::debug!(
        "[SMF] format {}, {} tracks, {} ticks/qn",
        header.format,
        header.track_count,
        header.ticks_per_quarter
    );

    let mut chunks = Vec::with_capacity(usize::from(header.track_count));
    for index in 0..usize::from(header.track_count) {
        let chunk = read_track_chunk(&mut cursor).map_err(|e| e.in_track(index))?;
        log::debug!("[SMF] track {}: {} bytes at {}", index, chunk.body.len(), chunk.base);
        chunks.push(chunk);
    }
    if !cursor.is_empty() {
        log::debug!("[SMF] ignoring {} trailing bytes", cursor.remaining());
    }

    let tracks = decode_tracks(&chunks)?;

    let mut song = DecodedSong::new(TimeBase::Ticks {
        ticks_per_quarter: header.ticks_per_quarter,
    });
    song.tracks = tracks;
    log::debug!("[SMF] decoded {} events", song.event_count());
    Ok(song)
}

fn read_header(cursor: &mut ByteCursor) -> Result<SmfHeader, FormatError> {
    let offset = cursor.offset();
    let tag = cursor.read_tag()?;
    if tag != HEADER_TAG {
        return Err(FormatError::InvalidChunkHeader {
            offset,
            expected: HEADER_TAG,
            found: tag,
        });
    }
    let length = cursor.read_u32_be()? as usize;
    let body_base = cursor.offset();
    let mut body = ByteCursor::with_base(cursor.read_bytes(length)?, body_base);

    let header = SmfHeader {
        format: body.read_u16_be()?,
        track_count: body.read_u16_be()?,
        ticks_per_quarter: body.read_u16_be()?,
    };
    if header.ticks_per_quarter & 0x8000 != 0 {
        return Err(FormatError::UnsupportedTimeDivision(header.ticks_per_quarter));
    }
    Ok(header)
}

fn read_track_chunk<'a>(cursor: &mut ByteCursor<'a>) -> Result<TrackChunk<'a>, FormatError> {
    let offset = cursor.offset();
    let tag = cursor.read_tag()?;
    if tag != TRACK_TAG {
        return Err(FormatError::InvalidChunkHeader {
            offset,
            expected: TRACK_TAG,
            found: tag,
        });
    }
    let length = cursor.read_u32_be()? as usize;
    let base = cursor.offset();
    let body = cursor.read_bytes(length)?;
    Ok(TrackChunk { base, body })
}

#[cfg(feature = "parallel")]
fn decode_tracks(chunks: &[TrackChunk]) -> Result<Vec<RawTrack>, FormatError> {
    use rayon::prelude::*;
    // Gather every result so the reported error is the lowest failing track
    let results: Vec<Result<RawTrack, FormatError>> = chunks
        .par_iter()
        .enumerate()
        .map(|(index, chunk)| TrackDecoder::new(index, chunk).decode())
        .collect();
    results.into_iter().collect()
}

#[cfg(not(feature = "parallel"))]
fn decode_tracks(chunks: &[TrackChunk]) -> Result<Vec<RawTrack>, FormatError> {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| TrackDecoder::new(index, chunk).decode())
        .collect()
}

/// Per-track decode context.
struct TrackDecoder<'a> {
    index: usize,
    cursor: ByteCursor<'a>,
    tick: u64,
    last_status: Option<u8>,
}

impl<'a> TrackDecoder<'a> {
    fn new(index: usize, chunk: &TrackChunk<'a>) -> Self {
        Self {
            index,
            cursor: ByteCursor::with_base(chunk.body, chunk.base),
            tick: 0,
            last_status: None,
        }
    }

    fn decode(mut self) -> Result<RawTrack, FormatError> {
        let mut track = RawTrack::new();
        while !self.cursor.is_empty() {
            let start = self.cursor.offset();
            let event = self.next_event().map_err(|e| {
                let e = match e {
                    FormatError::TruncatedInput { .. } => FormatError::TruncatedEvent { offset: start },
                    other => other,
                };
                e.in_track(self.index)
            })?;
            track.events.push(event);
        }
        track.name = track.meta_name().map(String::from);
        Ok(track)
    }

    fn next_event(&mut self) -> Result<RawEvent, FormatError> {
        let delta = self.cursor.read_varint()?;
        self.tick += u64::from(delta);
        let position = Position::Tick(self.tick);

        let status_offset = self.cursor.offset();
        let status = match self.cursor.peek_u8()? {
            byte if byte & 0x80 != 0 => {
                self.cursor.read_u8()?;
                // System messages do not become the running status
                if byte < 0xF0 {
                    self.last_status = Some(byte);
                }
                byte
            }
            _ => self
                .last_status
                .ok_or(FormatError::RunningStatusUnavailable { offset: status_offset })?,
        };

        match status {
            0xFF => self.read_meta(position),
            0xF0 | 0xF7 => {
                let length = self.cursor.read_varint()? as usize;
                self.cursor.skip(length)?;
                Ok(RawEvent {
                    track: self.index,
                    position,
                    channel: None,
                    kind: EventKind::SystemExclusive,
                })
            }
            0xF1..=0xFE => Err(FormatError::UnsupportedStatus {
                offset: status_offset,
                status,
            }),
            _ => {
                let kind = self.read_channel_message(status)?;
                Ok(RawEvent::channel(self.index, position, status & 0x0F, kind))
            }
        }
    }

    fn read_channel_message(&mut self, status: u8) -> Result<EventKind, FormatError> {
        let first = self.cursor.read_u8()?;
        let kind = match status >> 4 {
            0x8 => EventKind::NoteOff {
                note: first,
                velocity: self.cursor.read_u8()?,
            },
            0x9 => EventKind::note_on(first, self.cursor.read_u8()?),
            0xA => EventKind::PolyPressure {
                note: first,
                pressure: self.cursor.read_u8()?,
            },
            0xB => EventKind::ControlChange {
                controller: first,
                value: self.cursor.read_u8()?,
            },
            0xC => EventKind::ProgramChange { program: first },
            0xD => EventKind::ChannelPressure { pressure: first },
            _ => {
                let msb = self.cursor.read_u8()?;
                EventKind::PitchBend {
                    value: (u16::from(msb & 0x7F) << 7) | u16::from(first & 0x7F),
                }
            }
        };
        Ok(kind)
    }

    fn read_meta(&mut self, position: Position) -> Result<RawEvent, FormatError> {
        let subtype = self.cursor.read_u8()?;
        let length = self.cursor.read_varint()? as usize;
        let data = self.cursor.read_bytes(length)?;

        let meta = match (subtype, data) {
            (META_SET_TEMPO, &[a, b, c]) => MetaEvent::SetTempo {
                micros_per_quarter: u32::from_be_bytes([0, a, b, c]),
            },
            (META_TRACK_NAME, _) => MetaEvent::TrackName(String::from_utf8_lossy(data).into_owned()),
            (META_END_OF_TRACK, _) => MetaEvent::EndOfTrack,
            _ => MetaEvent::Other {
                subtype,
                data: data.to_vec(),
            },
        };
        Ok(RawEvent::meta(self.index, position, meta))
    }
}
