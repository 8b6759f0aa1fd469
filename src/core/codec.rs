//! Little-endian binary reader/writer with CompactSize length prefixes

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of data reading {0}")]
    UnexpectedEof(&'static str),
    #[error("non-canonical length prefix")]
    NonCanonical,
    #[error("length {0} exceeds limit")]
    TooLong(u64),
}

/// Upper bound on any single length prefix we accept
pub const MAX_VAR_LENGTH: u64 = 1 << 20;

#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    pub fn var_int(&mut self, v: u64) {
        match v {
            0..=0xFC => self.u8(v as u8),
            0xFD..=0xFFFF => {
                self.u8(0xFD);
                self.u16(v as u16);
            }
            0x1_0000..=0xFFFF_FFFF => {
                self.u8(0xFE);
                self.u32(v as u32);
            }
            _ => {
                self.u8(0xFF);
                self.buf.extend_from_slice(&v.to_le_bytes());
            }
        }
    }

    pub fn var_bytes(&mut self, v: &[u8]) {
        self.var_int(v.len() as u64);
        self.bytes(v);
    }
}

#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(CodecError::UnexpectedEof(what))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    pub fn u8(&mut self, what: &'static str) -> Result<u8, CodecError> {
        Ok(self.take(1, what)?[0])
    }

    pub fn u16(&mut self, what: &'static str) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.array(what)?))
    }

    pub fn u32(&mut self, what: &'static str) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    pub fn i64(&mut self, what: &'static str) -> Result<i64, CodecError> {
        Ok(i64::from_le_bytes(self.array(what)?))
    }

    pub fn var_int(&mut self, what: &'static str) -> Result<u64, CodecError> {
        let (value, min) = match self.u8(what)? {
            0xFD => (self.u16(what)? as u64, 0xFD),
            0xFE => (self.u32(what)? as u64, 0x1_0000),
            0xFF => (u64::from_le_bytes(self.array(what)?), 0x1_0000_0000),
            b => return Ok(b as u64),
        };
        if value < min {
            return Err(CodecError::NonCanonical);
        }
        Ok(value)
    }

    /// Length prefix bounded by [`MAX_VAR_LENGTH`]
    pub fn length(&mut self, what: &'static str) -> Result<usize, CodecError> {
        let len = self.var_int(what)?;
        if len > MAX_VAR_LENGTH {
            return Err(CodecError::TooLong(len));
        }
        Ok(len as usize)
    }

    pub fn var_bytes(&mut self, what: &'static str) -> Result<&'a [u8], CodecError> {
        let len = self.length(what)?;
        self.take(len, what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_int_boundaries() {
        for (value, len) in [(0u64, 1), (0xFC, 1), (0xFD, 3), (0xFFFF, 3), (0x1_0000, 5)] {
            let mut w = Writer::new();
            w.var_int(value);
            let bytes = w.into_bytes();
            assert_eq!(bytes.len(), len);
            assert_eq!(Reader::new(&bytes).var_int("v").unwrap(), value);
        }
    }

    #[test]
    fn test_non_canonical_rejected() {
        let bytes = [0xFD, 0x10, 0x00];
        assert_eq!(
            Reader::new(&bytes).var_int("v"),
            Err(CodecError::NonCanonical)
        );
    }

    #[test]
    fn test_truncated_read() {
        let mut r = Reader::new(&[0x05, 0x01]);
        assert_eq!(
            r.var_bytes("code"),
            Err(CodecError::UnexpectedEof("code"))
        );
    }
}
