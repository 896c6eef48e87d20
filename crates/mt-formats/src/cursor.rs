//! Sequential byte cursor over a track body.

use crate::FormatError;

/// Forward-only reader over a byte slice, tracking the absolute file
/// offset of the slice so errors can point into the original stream.
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor over `data`, which starts at absolute file
    /// offset `base`.
    pub fn new(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Absolute file offset of the next unread byte.
    pub fn pos(&self) -> usize {
        self.base + self.pos
    }

    /// True while unread bytes remain.
    pub fn has_more(&self) -> bool {
        self.pos < self.data.len()
    }

    /// Read one byte.
    pub fn next_u8(&mut self) -> Result<u8, FormatError> {
        if self.pos >= self.data.len() {
            return Err(FormatError::EndOfTrack { offset: self.pos() });
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Read one byte that must have the data-byte role (high bit clear).
    pub fn data_byte(&mut self) -> Result<u8, FormatError> {
        let byte = self.next_u8()?;
        self.assert_data_byte(byte)?;
        Ok(byte)
    }

    /// Check that an already-read byte has the data-byte role.
    pub fn assert_data_byte(&self, byte: u8) -> Result<(), FormatError> {
        if byte & 0x80 != 0 {
            return Err(FormatError::MalformedEvent {
                offset: self.pos() - 1,
                byte,
            });
        }
        Ok(())
    }

    /// Read exactly `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        if self.pos + n > self.data.len() {
            return Err(FormatError::TruncatedStream {
                offset: self.pos(),
                wanted: n,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}
