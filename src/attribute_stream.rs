//! Forward-only primitives shared by the TNEF reader and writer.
//!
//! The reader side wraps any [`Read`] and keeps track of the absolute offset so errors can point
//! at the offending bytes. The writer side buffers its sink and only reports success once every
//! byte has been flushed.

use std::io::{self, BufWriter, ErrorKind, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::err::{Result, TnefError};

/// Running TNEF checksum: the sum of all payload bytes, modulo 2^16.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum(u16);

impl Checksum {
    pub fn of(bytes: &[u8]) -> Self {
        let mut checksum = Checksum::default();
        checksum.update(bytes);
        checksum
    }

    #[inline]
    pub fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_add(u16::from(b));
        }
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

pub(crate) struct AttributeReader<R: Read> {
    inner: R,
    offset: u64,
}

impl<R: Read> AttributeReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        AttributeReader { inner, offset: 0 }
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    fn map_read_err(&self, e: io::Error, what: &'static str, need: usize) -> TnefError {
        if e.kind() == ErrorKind::UnexpectedEof {
            TnefError::TruncatedStream {
                what,
                offset: self.offset,
                need,
                have: 0,
            }
        } else {
            TnefError::ReadFailed {
                what,
                offset: self.offset,
                source: e,
            }
        }
    }

    /// Reads a single byte, returning `None` on a clean end of stream.
    pub(crate) fn try_u8_or_eof(&mut self, what: &'static str) -> Result<Option<u8>> {
        let mut buf = [0_u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.map_read_err(e, what, 1)),
            }
        }
    }

    pub(crate) fn try_u16_named(&mut self, what: &'static str) -> Result<u16> {
        let v = self
            .inner
            .read_u16::<LittleEndian>()
            .map_err(|e| self.map_read_err(e, what, 2))?;
        self.offset += 2;
        Ok(v)
    }

    pub(crate) fn try_u32_named(&mut self, what: &'static str) -> Result<u32> {
        let v = self
            .inner
            .read_u32::<LittleEndian>()
            .map_err(|e| self.map_read_err(e, what, 4))?;
        self.offset += 4;
        Ok(v)
    }

    /// Reads exactly `len` bytes into `buf`.
    ///
    /// The buffer grows with the data actually available, a bogus length prefix near the end of
    /// the stream does not cause a large allocation up front. On a short read `buf` keeps the
    /// bytes that were there.
    pub(crate) fn try_blob_into(
        &mut self,
        len: u32,
        buf: &mut Vec<u8>,
        what: &'static str,
    ) -> Result<()> {
        let need = len as usize;
        let offset = self.offset;
        let result = (&mut self.inner).take(u64::from(len)).read_to_end(buf);
        let read = result.map_err(|e| self.map_read_err(e, what, need))?;
        self.offset += read as u64;

        if read < need {
            return Err(TnefError::TruncatedStream {
                what,
                offset,
                need,
                have: read,
            });
        }

        Ok(())
    }
}

pub(crate) struct AttributeWriter<W: Write> {
    inner: BufWriter<W>,
    offset: u64,
}

impl<W: Write> AttributeWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        AttributeWriter {
            inner: BufWriter::new(inner),
            offset: 0,
        }
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn write_u8(&mut self, v: u8) -> Result<()> {
        self.inner.write_u8(v).map_err(TnefError::WriteFailed)?;
        self.offset += 1;
        Ok(())
    }

    pub(crate) fn write_u16(&mut self, v: u16) -> Result<()> {
        self.inner
            .write_u16::<LittleEndian>(v)
            .map_err(TnefError::WriteFailed)?;
        self.offset += 2;
        Ok(())
    }

    pub(crate) fn write_u32(&mut self, v: u32) -> Result<()> {
        self.inner
            .write_u32::<LittleEndian>(v)
            .map_err(TnefError::WriteFailed)?;
        self.offset += 4;
        Ok(())
    }

    /// Writes `bytes` preceded by their `u32` length.
    pub(crate) fn write_len_prefixed(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            TnefError::WriteFailed(io::Error::new(
                ErrorKind::InvalidInput,
                "attribute payload exceeds 4GiB",
            ))
        })?;
        self.write_u32(len)?;
        self.inner.write_all(bytes).map_err(TnefError::WriteFailed)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    /// Flushes every buffered byte and hands back the sink.
    pub(crate) fn finish(mut self) -> Result<W> {
        self.inner.flush().map_err(TnefError::WriteFailed)?;
        self.inner
            .into_inner()
            .map_err(|e| TnefError::WriteFailed(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_checksum_wraps() {
        let bytes = vec![0xFF; 300];
        assert_eq!(Checksum::of(&bytes).value(), (300 * 0xFF % 65536) as u16);
        assert_eq!(Checksum::of(&[]).value(), 0);
    }

    #[test]
    fn test_reads_little_endian_primitives() {
        let mut reader = AttributeReader::new(Cursor::new(vec![
            0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xAA, 0xBB,
        ]));

        assert_eq!(reader.try_u8_or_eof("level").unwrap(), Some(1));
        assert_eq!(reader.try_u16_named("word").unwrap(), 0x1234);
        assert_eq!(reader.try_u32_named("dword").unwrap(), 0x1234_5678);
        let mut blob = Vec::new();
        reader.try_blob_into(2, &mut blob, "blob").unwrap();
        assert_eq!(blob, vec![0xAA, 0xBB]);
        assert_eq!(reader.offset(), 9);
        assert_eq!(reader.try_u8_or_eof("level").unwrap(), None);
    }

    #[test]
    fn test_short_blob_is_truncation() {
        let mut reader = AttributeReader::new(Cursor::new(vec![1, 2, 3]));
        let mut blob = Vec::new();
        match reader.try_blob_into(10, &mut blob, "payload") {
            Err(TnefError::TruncatedStream {
                what, need, have, ..
            }) => {
                assert_eq!(what, "payload");
                assert_eq!(need, 10);
                assert_eq!(have, 3);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
        assert_eq!(blob, vec![1, 2, 3]);
        assert_eq!(reader.offset(), 3);
    }

    #[test]
    fn test_short_integer_is_truncation() {
        let mut reader = AttributeReader::new(Cursor::new(vec![1, 2]));
        assert!(matches!(
            reader.try_u32_named("length"),
            Err(TnefError::TruncatedStream { what: "length", .. })
        ));
    }

    #[test]
    fn test_writer_prefixes_length() {
        let mut out = Vec::new();
        let mut writer = AttributeWriter::new(&mut out);
        writer.write_u8(2).unwrap();
        writer.write_len_prefixed(b"abc").unwrap();
        writer.write_u16(0x0126).unwrap();
        assert_eq!(writer.offset(), 10);
        writer.finish().unwrap();

        assert_eq!(out, vec![2, 3, 0, 0, 0, b'a', b'b', b'c', 0x26, 0x01]);
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::Other, "sink rejected write"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(ErrorKind::Other, "sink rejected flush"))
        }
    }

    #[test]
    fn test_flush_failure_is_write_failed() {
        let mut writer = AttributeWriter::new(FailingSink);
        // Buffered, so the failure only shows up when flushing.
        writer.write_u32(7).unwrap();
        assert!(matches!(writer.finish(), Err(TnefError::WriteFailed(_))));
    }
}
