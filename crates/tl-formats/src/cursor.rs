//! Bounds-checked sequential reader over a byte slice.

use crate::FormatError;

/// Longest accepted variable-length quantity, in bytes (32 payload bits).
const MAX_VARINT_BYTES: usize = 5;

/// Cursor over a byte slice.
///
/// `base` is the absolute offset of `data[0]` in the file, so errors from a
/// cursor over one chunk still point into the whole buffer.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Cursor over a sub-slice that starts at absolute offset `base`.
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Absolute offset of the next byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn ensure(&self, n: usize) -> Result<(), FormatError> {
        if n > self.remaining() {
            return Err(FormatError::TruncatedInput {
                offset: self.offset(),
                needed: n - self.remaining(),
            });
        }
        Ok(())
    }

    pub fn peek_u8(&self) -> Result<u8, FormatError> {
        self.ensure(1)?;
        Ok(self.data[self.pos])
    }

    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        let v = self.peek_u8()?;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), FormatError> {
        self.read_bytes(n).map(|_| ())
    }

    pub fn read_tag(&mut self) -> Result<[u8; 4], FormatError> {
        let b = self.read_bytes(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    pub fn read_u16_be(&mut self) -> Result<u16, FormatError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, FormatError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a big-endian variable-length quantity: 7 bits per byte, high
    /// bit set on every byte but the last.
    pub fn read_varint(&mut self) -> Result<u32, FormatError> {
        let start = self.offset();
        let mut value: u32 = 0;
        for _ in 0..MAX_VARINT_BYTES {
            let byte = self.read_u8()?;
            if value > (u32::MAX >> 7) {
                return Err(FormatError::MalformedVarint { offset: start });
            }
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(FormatError::MalformedVarint { offset: start })
    }
}
