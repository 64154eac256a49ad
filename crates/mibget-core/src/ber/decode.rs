//! BER decoder.

use super::{tag, DecodeError, DecodeErrorKind};
use crate::model::Oid;
use alloc::vec::Vec;

/// Cursor over a BER byte slice.
///
/// Offsets in errors are absolute: a nested decoder created by
/// [`Decoder::read_constructed`] remembers where its slice began.
#[derive(Clone, Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Decoder<'a> {
    /// Start decoding at the beginning of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Absolute offset of the next unread byte.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Check if all input has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn err(&self, at: usize, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(self.base + at, kind)
    }

    /// Look at the next tag without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeErrorKind::Truncated`] at end of input.
    pub fn peek_tag(&self) -> Result<u8, DecodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.err(self.pos, DecodeErrorKind::Truncated))
    }

    /// Read any TLV, returning its tag and content.
    ///
    /// # Errors
    ///
    /// Fails on truncated input and on indefinite or oversized lengths.
    pub fn read_any(&mut self) -> Result<(u8, &'a [u8]), DecodeError> {
        let start = self.pos;
        let tag = self.peek_tag()?;
        self.pos += 1;
        let len = self.read_length(start)?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.err(start, DecodeErrorKind::Truncated))?;
        let content = &self.data[self.pos..end];
        self.pos = end;
        Ok((tag, content))
    }

    fn read_length(&mut self, tlv_start: usize) -> Result<usize, DecodeError> {
        let first = *self
            .data
            .get(self.pos)
            .ok_or_else(|| self.err(tlv_start, DecodeErrorKind::Truncated))?;
        self.pos += 1;
        if first & 0x80 == 0 {
            return Ok(usize::from(first));
        }
        let count = usize::from(first & 0x7F);
        if count == 0 {
            return Err(self.err(tlv_start, DecodeErrorKind::IndefiniteLength));
        }
        if count > core::mem::size_of::<usize>() {
            return Err(self.err(tlv_start, DecodeErrorKind::LengthOverflow));
        }
        let bytes = self
            .data
            .get(self.pos..self.pos + count)
            .ok_or_else(|| self.err(tlv_start, DecodeErrorKind::Truncated))?;
        self.pos += count;
        Ok(bytes.iter().fold(0usize, |acc, &b| (acc << 8) | usize::from(b)))
    }

    /// Read a TLV that must carry `expected` as its tag.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeErrorKind::UnexpectedTag`] on a tag mismatch.
    pub fn read_expected(&mut self, expected: u8) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        let found = self.peek_tag()?;
        if found != expected {
            return Err(self.err(start, DecodeErrorKind::UnexpectedTag { expected, found }));
        }
        let (_, content) = self.read_any()?;
        Ok(content)
    }

    /// Read a constructed TLV and return a decoder over its content.
    ///
    /// # Errors
    ///
    /// Fails as [`Decoder::read_expected`] does.
    pub fn read_constructed(&mut self, expected: u8) -> Result<Decoder<'a>, DecodeError> {
        let content = self.read_expected(expected)?;
        let base = self.offset() - content.len();
        Ok(Decoder {
            data: content,
            pos: 0,
            base,
        })
    }

    /// Read a signed INTEGER (or application integer) into an `i64`.
    ///
    /// # Errors
    ///
    /// Fails on a tag mismatch, empty content, or more than eight bytes.
    pub fn read_integer(&mut self, expected: u8) -> Result<i64, DecodeError> {
        let start = self.pos;
        let content = self.read_expected(expected)?;
        if content.is_empty() {
            return Err(self.err(start, DecodeErrorKind::EmptyInteger));
        }
        if content.len() > 8 {
            return Err(self.err(start, DecodeErrorKind::IntegerOverflow));
        }
        let sign = if content[0] & 0x80 != 0 { -1i64 } else { 0 };
        Ok(content
            .iter()
            .fold(sign, |acc, &b| (acc << 8) | i64::from(b)))
    }

    /// Read a signed INTEGER that must fit in 32 bits.
    ///
    /// # Errors
    ///
    /// As [`Decoder::read_integer`], plus overflow of `i32`.
    pub fn read_i32(&mut self, expected: u8) -> Result<i32, DecodeError> {
        let start = self.pos;
        let value = self.read_integer(expected)?;
        i32::try_from(value).map_err(|_| self.err(start, DecodeErrorKind::IntegerOverflow))
    }

    /// Read an unsigned integer of at most 64 bits.
    ///
    /// # Errors
    ///
    /// Fails on a tag mismatch, empty content, or a value wider than 64 bits.
    pub fn read_unsigned(&mut self, expected: u8) -> Result<u64, DecodeError> {
        let start = self.pos;
        let content = self.read_expected(expected)?;
        if content.is_empty() {
            return Err(self.err(start, DecodeErrorKind::EmptyInteger));
        }
        let digits = match content {
            [0, rest @ ..] => rest,
            all => all,
        };
        if digits.len() > 8 {
            return Err(self.err(start, DecodeErrorKind::IntegerOverflow));
        }
        Ok(digits.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Read an unsigned integer that must fit in 32 bits.
    ///
    /// # Errors
    ///
    /// As [`Decoder::read_unsigned`], plus overflow of `u32`.
    pub fn read_u32(&mut self, expected: u8) -> Result<u32, DecodeError> {
        let start = self.pos;
        let value = self.read_unsigned(expected)?;
        u32::try_from(value).map_err(|_| self.err(start, DecodeErrorKind::IntegerOverflow))
    }

    /// Read an OCTET STRING (or an application type with the same shape).
    ///
    /// # Errors
    ///
    /// Fails on a tag mismatch or truncated input.
    pub fn read_octets(&mut self, expected: u8) -> Result<&'a [u8], DecodeError> {
        self.read_expected(expected)
    }

    /// Read a NULL (or a NULL-shaped exception).
    ///
    /// # Errors
    ///
    /// Fails on a tag mismatch or non-empty content.
    pub fn read_null(&mut self, expected: u8) -> Result<(), DecodeError> {
        let start = self.pos;
        let content = self.read_expected(expected)?;
        if content.is_empty() {
            Ok(())
        } else {
            Err(self.err(start, DecodeErrorKind::InvalidNull))
        }
    }

    /// Read an OBJECT IDENTIFIER.
    ///
    /// # Errors
    ///
    /// Fails on a tag mismatch, empty content, an unterminated subidentifier,
    /// or an arc that does not fit in 32 bits.
    pub fn read_oid(&mut self) -> Result<Oid, DecodeError> {
        let start = self.pos;
        let content = self.read_expected(tag::OBJECT_IDENTIFIER)?;
        let invalid = || self.err(start, DecodeErrorKind::InvalidOid);
        if content.is_empty() {
            return Err(invalid());
        }

        let mut subids = Vec::with_capacity(content.len());
        let mut value: u64 = 0;
        let mut in_subid = false;
        for &b in content {
            // A subidentifier may not start with 0x80 (non-minimal).
            if !in_subid && b == 0x80 {
                return Err(invalid());
            }
            value = (value << 7) | u64::from(b & 0x7F);
            if value > u64::from(u32::MAX) + 80 {
                return Err(invalid());
            }
            in_subid = b & 0x80 != 0;
            if !in_subid {
                subids.push(value);
                value = 0;
            }
        }
        if in_subid {
            return Err(invalid());
        }

        let mut arcs = Vec::with_capacity(subids.len() + 1);
        let first = subids[0];
        let (a, b) = match first {
            0..=39 => (0, first),
            40..=79 => (1, first - 40),
            _ => (2, first - 80),
        };
        arcs.push(a as u32);
        arcs.push(u32::try_from(b).map_err(|_| invalid())?);
        for &subid in &subids[1..] {
            arcs.push(u32::try_from(subid).map_err(|_| invalid())?);
        }
        Ok(Oid::new(arcs))
    }

    /// Fail unless every byte has been consumed.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeErrorKind::TrailingData`] at the first unread byte.
    pub fn finish(&self) -> Result<(), DecodeError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.err(self.pos, DecodeErrorKind::TrailingData))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::Encoder;

    #[test]
    fn test_read_integer_signs() {
        assert_eq!(Decoder::new(&[0x02, 0x01, 0x7F]).read_integer(tag::INTEGER), Ok(127));
        assert_eq!(Decoder::new(&[0x02, 0x01, 0xFF]).read_integer(tag::INTEGER), Ok(-1));
        assert_eq!(
            Decoder::new(&[0x02, 0x02, 0x00, 0x80]).read_integer(tag::INTEGER),
            Ok(128)
        );
        assert_eq!(
            Decoder::new(&[0x02, 0x02, 0xFF, 0x7F]).read_integer(tag::INTEGER),
            Ok(-129)
        );
    }

    #[test]
    fn test_read_integer_errors() {
        let err = Decoder::new(&[0x02, 0x00]).read_integer(tag::INTEGER).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::EmptyInteger);

        let err = Decoder::new(&[0x04, 0x01, 0x00]).read_integer(tag::INTEGER).unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::UnexpectedTag {
                expected: tag::INTEGER,
                found: tag::OCTET_STRING
            }
        );

        let err = Decoder::new(&[0x02, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00])
            .read_i32(tag::INTEGER)
            .unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::IntegerOverflow);
    }

    #[test]
    fn test_read_unsigned_leading_zero() {
        let bytes = [0x41, 0x05, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(Decoder::new(&bytes).read_u32(tag::COUNTER32), Ok(u32::MAX));
    }

    #[test]
    fn test_truncated() {
        let err = Decoder::new(&[0x04, 0x05, b'a', b'b']).read_octets(tag::OCTET_STRING).unwrap_err();
        assert_eq!(err, DecodeError::new(0, DecodeErrorKind::Truncated));

        let err = Decoder::new(&[]).peek_tag().unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::Truncated);
    }

    #[test]
    fn test_indefinite_length_rejected() {
        let err = Decoder::new(&[0x30, 0x80, 0x00, 0x00]).read_any().unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::IndefiniteLength);
    }

    #[test]
    fn test_long_form_length() {
        let mut bytes = vec![0x04, 0x82, 0x01, 0x00];
        bytes.extend(core::iter::repeat(b'x').take(256));
        let content = Decoder::new(&bytes).read_octets(tag::OCTET_STRING).unwrap();
        assert_eq!(content.len(), 256);
    }

    #[test]
    fn test_read_oid() {
        let bytes = [0x06, 0x08, 0x2B, 0x06, 0x01, 0x02, 0x01, 0x01, 0x01, 0x00];
        let oid = Decoder::new(&bytes).read_oid().unwrap();
        assert_eq!(oid.to_dotted(), "1.3.6.1.2.1.1.1.0");
    }

    #[test]
    fn test_read_oid_joint_iso_ccitt() {
        // 2.999 -> 1079 -> 0x88 0x37
        let bytes = [0x06, 0x02, 0x88, 0x37];
        let oid = Decoder::new(&bytes).read_oid().unwrap();
        assert_eq!(oid.arcs(), &[2, 999]);
    }

    #[test]
    fn test_read_oid_rejects_malformed() {
        // unterminated subidentifier
        let err = Decoder::new(&[0x06, 0x02, 0x2B, 0x86]).read_oid().unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidOid);
        // non-minimal leading 0x80
        let err = Decoder::new(&[0x06, 0x03, 0x2B, 0x80, 0x01]).read_oid().unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidOid);
        let err = Decoder::new(&[0x06, 0x00]).read_oid().unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidOid);
    }

    #[test]
    fn test_oid_matches_encoder() {
        for text in ["0.0", "1.3.6.1.4.1.9.1.1208", "2.25.4294967295"] {
            let oid = Oid::parse(text).unwrap();
            let mut enc = Encoder::new();
            enc.write_oid(&oid).unwrap();
            let bytes = enc.finish();
            assert_eq!(Decoder::new(&bytes).read_oid().unwrap(), oid);
        }
    }

    #[test]
    fn test_nested_offsets_are_absolute() {
        // SEQUENCE { INTEGER 1, OCTET STRING <truncated> }
        let bytes = [0x30, 0x05, 0x02, 0x01, 0x01, 0x05, 0x01];
        let mut seq = Decoder::new(&bytes).read_constructed(tag::SEQUENCE).unwrap();
        assert_eq!(seq.read_integer(tag::INTEGER), Ok(1));
        let err = seq.read_null(tag::NULL).unwrap_err();
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn test_finish_reports_trailing_data() {
        let mut dec = Decoder::new(&[0x05, 0x00, 0xFF]);
        dec.read_null(tag::NULL).unwrap();
        assert_eq!(dec.finish().unwrap_err().kind, DecodeErrorKind::TrailingData);
    }
}
