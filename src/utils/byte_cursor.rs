use crate::err::{Result, TnefError};

/// A lightweight cursor over an attribute payload that is already in memory.
///
/// All reads are little-endian and advance the cursor on success. Errors report absolute stream
/// offsets: `base` is the offset of the first payload byte in the source stream.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    base: u64,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(buf: &'a [u8], base: u64) -> Self {
        ByteCursor { buf, pos: 0, base }
    }

    #[inline]
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    /// Absolute offset of the cursor in the source stream.
    #[inline]
    pub(crate) fn position(&self) -> u64 {
        self.base + self.pos as u64
    }

    #[inline]
    pub(crate) fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Bytes between `start` and the current position.
    #[inline]
    pub(crate) fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.buf[start..self.pos]
    }

    #[inline]
    fn truncated(&self, what: &'static str, need: usize) -> TnefError {
        TnefError::TruncatedStream {
            what,
            offset: self.position(),
            need,
            have: self.buf.len().saturating_sub(self.pos),
        }
    }

    #[inline]
    pub(crate) fn take_bytes(&mut self, len: usize, what: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| self.truncated(what, len))?;

        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    #[inline]
    pub(crate) fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]> {
        let bytes = self.take_bytes(N, what)?;
        let mut out = [0_u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    #[inline]
    pub(crate) fn u16_named(&mut self, what: &'static str) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array::<2>(what)?))
    }

    #[inline]
    pub(crate) fn u32_named(&mut self, what: &'static str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array::<4>(what)?))
    }

    #[inline]
    pub(crate) fn u64_named(&mut self, what: &'static str) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array::<8>(what)?))
    }

    /// Skips the padding that aligns a value of `len` bytes to a 4 byte boundary.
    #[inline]
    pub(crate) fn skip_padding(&mut self, len: usize, what: &'static str) -> Result<()> {
        self.take_bytes(padding_for(len), what).map(|_| ())
    }

    /// Reads a `u32` length, that many bytes, and the padding following them.
    pub(crate) fn len_prefixed_padded(&mut self, what: &'static str) -> Result<&'a [u8]> {
        let len = self.u32_named(what)? as usize;
        let bytes = self.take_bytes(len, what)?;
        self.skip_padding(len, what)?;
        Ok(bytes)
    }
}

/// Number of padding bytes needed to align `len` to 4 bytes.
#[inline]
pub(crate) fn padding_for(len: usize) -> usize {
    (4 - len % 4) % 4
}
