//! Byte readers shared by the decoders
//!
//! Fixed header fields are read with `nom` number parsers; bodies are walked
//! with [`BodyCursor`], which returns `None` instead of failing when a record
//! runs past the end of its region.

use super::FormatError;
use nom::bytes::complete::tag;
use nom::number::complete::{le_u16, le_u32, u8 as byte};
use nom::IResult;

type NomError<'a> = nom::error::Error<&'a [u8]>;

/// Read a little-endian u16 at `offset`, if present
pub(crate) fn le16_at(data: &[u8], offset: usize) -> Option<u16> {
    let input = data.get(offset..)?;
    le_u16::<_, NomError>(input).ok().map(|(_, value)| value)
}

/// Read a little-endian u32 at `offset`, if present
pub(crate) fn le32_at(data: &[u8], offset: usize) -> Option<u32> {
    let input = data.get(offset..)?;
    le_u32::<_, NomError>(input).ok().map(|(_, value)| value)
}

/// Field reader bound to one format, producing `Truncated` diagnostics
#[derive(Debug, Clone, Copy)]
pub(crate) struct HeaderReader<'a> {
    data: &'a [u8],
    format: &'static str,
}

impl<'a> HeaderReader<'a> {
    pub(crate) fn new(data: &'a [u8], format: &'static str) -> Self {
        HeaderReader { data, format }
    }

    fn truncated(&self, context: &'static str, needed: usize) -> FormatError {
        FormatError::Truncated {
            format: self.format,
            context,
            needed,
            available: self.data.len(),
        }
    }

    /// Check `magic` at `offset`
    pub(crate) fn expect_magic(
        &self,
        offset: usize,
        magic: &'static [u8],
        expected: &'static str,
    ) -> Result<(), FormatError> {
        let input = self.data.get(offset..).unwrap_or_default();
        tag::<_, _, NomError>(magic)(input)
            .map(|_| ())
            .map_err(|_| FormatError::BadMagic {
                format: self.format,
                expected,
            })
    }

    pub(crate) fn u8(&self, offset: usize, context: &'static str) -> Result<u8, FormatError> {
        self.parse(offset, 1, context, byte)
    }

    pub(crate) fn u16(&self, offset: usize, context: &'static str) -> Result<u16, FormatError> {
        self.parse(offset, 2, context, le_u16)
    }

    pub(crate) fn u32(&self, offset: usize, context: &'static str) -> Result<u32, FormatError> {
        self.parse(offset, 4, context, le_u32)
    }

    /// `len` bytes starting at `offset`
    pub(crate) fn bytes(
        &self,
        offset: usize,
        len: usize,
        context: &'static str,
    ) -> Result<&'a [u8], FormatError> {
        let end = offset.saturating_add(len);
        self.data
            .get(offset..end)
            .ok_or_else(|| self.truncated(context, end))
    }

    fn parse<T>(
        &self,
        offset: usize,
        width: usize,
        context: &'static str,
        parser: fn(&'a [u8]) -> IResult<&'a [u8], T, NomError<'a>>,
    ) -> Result<T, FormatError> {
        let needed = offset.saturating_add(width);
        let input = self
            .data
            .get(offset..)
            .ok_or_else(|| self.truncated(context, needed))?;
        parser(input)
            .map(|(_, value)| value)
            .map_err(|_| self.truncated(context, needed))
    }
}

/// Forward-only cursor over a body region
#[derive(Debug, Clone)]
pub(crate) struct BodyCursor<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> BodyCursor<'a> {
    /// Cursor over `data[start..end]`, both clamped to the buffer
    pub(crate) fn new(data: &'a [u8], start: usize, end: usize) -> Self {
        let end = end.min(data.len());
        BodyCursor {
            data,
            pos: start.min(end),
            end,
        }
    }

    /// Absolute offset of the next byte
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Move to an absolute offset (clamped to the region end)
    pub(crate) fn seek(&mut self, offset: usize) {
        self.pos = offset.min(self.end);
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.end
    }

    pub(crate) fn u8(&mut self) -> Option<u8> {
        if self.pos >= self.end {
            return None;
        }
        let value = self.data[self.pos];
        self.pos += 1;
        Some(value)
    }

    pub(crate) fn le16(&mut self) -> Option<u16> {
        if self.end - self.pos < 2 {
            self.pos = self.end;
            return None;
        }
        let value = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Some(value)
    }

    /// Two consecutive bytes
    pub(crate) fn pair(&mut self) -> Option<(u8, u8)> {
        if self.end - self.pos < 2 {
            self.pos = self.end;
            return None;
        }
        let pair = (self.data[self.pos], self.data[self.pos + 1]);
        self.pos += 2;
        Some(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_le_helpers() {
        let data = [0x34, 0x12, 0x78, 0x56];
        assert_eq!(le16_at(&data, 0), Some(0x1234));
        assert_eq!(le32_at(&data, 0), Some(0x5678_1234));
        assert_eq!(le16_at(&data, 3), None);
        assert_eq!(le32_at(&data, 8), None);
    }

    #[test]
    fn test_header_reader_truncation() {
        let reader = HeaderReader::new(&[1, 2, 3], "TEST");
        assert_eq!(reader.u8(2, "byte").unwrap(), 3);
        let err = reader.u32(0, "word").unwrap_err();
        assert_eq!(
            err,
            FormatError::Truncated {
                format: "TEST",
                context: "word",
                needed: 4,
                available: 3,
            }
        );
    }

    #[test]
    fn test_header_reader_magic() {
        let reader = HeaderReader::new(b"RAWADATA", "RAW");
        assert!(reader.expect_magic(0, b"RAWA", "RAWA").is_ok());
        assert!(reader.expect_magic(4, b"DATA", "DATA").is_ok());
        assert!(reader.expect_magic(4, b"RAWA", "RAWA").is_err());
        assert!(reader.expect_magic(16, b"RAWA", "RAWA").is_err());
    }

    #[test]
    fn test_body_cursor_stops_at_region_end() {
        let data = [1, 2, 3, 4, 5];
        let mut cursor = BodyCursor::new(&data, 1, 4);
        assert_eq!(cursor.pair(), Some((2, 3)));
        assert_eq!(cursor.le16(), None);
        assert!(cursor.is_at_end());
        assert_eq!(cursor.u8(), None);
    }
}
