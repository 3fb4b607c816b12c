//! Bounds-checked byte cursors used by the packet builders and parsers.

use crate::error::Error;
use heapless::Vec;

/// Reads big-endian fields from a borrowed byte slice, failing with
/// [`Error::Truncated`] instead of running past the end.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let byte = *self.buf.get(self.pos).ok_or(Error::Truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read a big-endian 16-bit integer.
    pub fn read_u16(&mut self) -> Result<u16, Error> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < len {
            return Err(Error::Truncated);
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Consume and return everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..];
        self.pos = self.buf.len();
        bytes
    }
}

/// Writes big-endian fields into a fixed-capacity buffer, failing with
/// [`Error::BufferOverflow`] instead of overrunning it.
#[derive(Debug)]
pub struct Writer<'a, const N: usize> {
    buf: &'a mut Vec<u8, N>,
}

impl<'a, const N: usize> Writer<'a, N> {
    /// Append to the end of `buf`.
    pub fn new(buf: &'a mut Vec<u8, N>) -> Self {
        Self { buf }
    }

    /// Write a single byte.
    pub fn put_u8(&mut self, value: u8) -> Result<(), Error> {
        self.buf.push(value).map_err(|_| Error::BufferOverflow)
    }

    /// Write a big-endian 16-bit integer.
    pub fn put_u16(&mut self, value: u16) -> Result<(), Error> {
        self.put_slice(&value.to_be_bytes())
    }

    /// Write raw bytes.
    pub fn put_slice(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.buf
            .extend_from_slice(bytes)
            .map_err(|_| Error::BufferOverflow)
    }

    /// Write a UTF-8 string as a 2-byte length prefix followed by its bytes.
    pub fn put_str(&mut self, value: &str) -> Result<(), Error> {
        let bytes = value.as_bytes();
        if bytes.len() > u16::MAX as usize {
            return Err(Error::InvalidParameters);
        }
        self.put_u16(bytes.len() as u16)?;
        self.put_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_stops_at_the_end() {
        let mut reader = Reader::new(&[0x01, 0x02, 0x03]);
        assert_eq!(reader.read_u8(), Ok(0x01));
        assert_eq!(reader.read_u16(), Ok(0x0203));
        assert_eq!(reader.read_u8(), Err(Error::Truncated));
    }

    #[test]
    fn reader_rest_consumes_everything() {
        let mut reader = Reader::new(&[0x01, 0x02, 0x03]);
        reader.read_u8().unwrap();
        assert_eq!(reader.rest(), &[0x02, 0x03]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn writer_reports_overflow() {
        let mut buf: Vec<u8, 4> = Vec::new();
        let mut writer = Writer::new(&mut buf);
        writer.put_u16(0xbeef).unwrap();
        assert_eq!(writer.put_slice(&[0, 1, 2]), Err(Error::BufferOverflow));
    }

    #[test]
    fn writer_length_prefixes_strings() {
        let mut buf: Vec<u8, 16> = Vec::new();
        Writer::new(&mut buf).put_str("ab").unwrap();
        assert_eq!(&buf[..], &[0x00, 0x02, b'a', b'b']);
    }
}
