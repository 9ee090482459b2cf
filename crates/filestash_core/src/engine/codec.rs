//! Little-endian helpers shared by the schema manifest and the record log.

use crate::engine::error::{EngineError, EngineResult};

/// Bounds-checked reader over a byte slice.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> ByteReader<'a> {
    /// `what` names the structure being decoded in error messages.
    pub(crate) fn new(data: &'a [u8], what: &'static str) -> Self {
        Self { data, pos: 0, what }
    }

    pub(crate) fn take(&mut self, len: usize) -> EngineResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| EngineError::corrupted(format!("{} too short", self.what)))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub(crate) fn u8(&mut self) -> EngineResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> EngineResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> EngineResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u64(&mut self) -> EngineResult<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a `u16`-length-prefixed UTF-8 string.
    pub(crate) fn short_str(&mut self) -> EngineResult<String> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| EngineError::corrupted(format!("{} holds invalid UTF-8", self.what)))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }
}

/// Writes a `u16`-length-prefixed string.
///
/// Names longer than `u16::MAX` bytes are rejected.
pub(crate) fn put_short_str(buf: &mut Vec<u8>, s: &str) -> EngineResult<()> {
    let len = u16::try_from(s.len())
        .map_err(|_| EngineError::InvalidArgument(format!("name too long: {} bytes", s.len())))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_in_order() {
        let mut buf = vec![7u8];
        buf.extend_from_slice(&513u16.to_le_bytes());
        buf.extend_from_slice(&70_000u32.to_le_bytes());
        buf.extend_from_slice(&u64::MAX.to_le_bytes());
        put_short_str(&mut buf, "fileObjects").unwrap();

        let mut r = ByteReader::new(&buf, "test");
        assert_eq!(r.u8().unwrap(), 7);
        assert_eq!(r.u16().unwrap(), 513);
        assert_eq!(r.u32().unwrap(), 70_000);
        assert_eq!(r.u64().unwrap(), u64::MAX);
        assert_eq!(r.short_str().unwrap(), "fileObjects");
        assert!(r.is_empty());
    }

    #[test]
    fn short_input_is_corruption() {
        let mut r = ByteReader::new(&[1, 2], "frame");
        assert!(matches!(r.u32(), Err(EngineError::Corrupted(m)) if m == "frame too short"));
    }

    #[test]
    fn oversized_name_rejected() {
        let long = "x".repeat(u16::MAX as usize + 1);
        assert!(put_short_str(&mut Vec::new(), &long).is_err());
    }
}
