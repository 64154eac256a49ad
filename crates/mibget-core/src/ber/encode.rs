//! BER encoder.

use super::{tag, EncodeError};
use crate::model::Oid;
use alloc::vec::Vec;

/// Appends TLVs to a byte buffer.
///
/// Constructed values are built with [`Encoder::constructed`], which encodes
/// the content first so the length is known when the header is written.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Create an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the encoder, returning the encoded bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn write_header(&mut self, tag: u8, len: usize) {
        self.buf.push(tag);
        if len < 0x80 {
            self.buf.push(len as u8);
        } else {
            let bytes = len.to_be_bytes();
            let skip = bytes.iter().take_while(|&&b| b == 0).count();
            let significant = &bytes[skip..];
            self.buf.push(0x80 | significant.len() as u8);
            self.buf.extend_from_slice(significant);
        }
    }

    /// Write a primitive TLV with the given content.
    pub fn write_raw(&mut self, tag: u8, content: &[u8]) {
        self.write_header(tag, content.len());
        self.buf.extend_from_slice(content);
    }

    /// Write a constructed TLV whose content is produced by `body`.
    ///
    /// # Errors
    ///
    /// Propagates any error from `body`.
    pub fn constructed<F>(&mut self, tag: u8, body: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut Encoder) -> Result<(), EncodeError>,
    {
        let mut inner = Encoder::new();
        body(&mut inner)?;
        self.write_raw(tag, &inner.buf);
        Ok(())
    }

    /// Write a signed integer in minimal two's-complement form.
    pub fn write_integer(&mut self, tag: u8, value: i64) {
        let bytes = value.to_be_bytes();
        let mut start = 0;
        // Drop redundant sign-extension bytes.
        while start < bytes.len() - 1 {
            let (b, next) = (bytes[start], bytes[start + 1]);
            if (b == 0x00 && next & 0x80 == 0) || (b == 0xFF && next & 0x80 != 0) {
                start += 1;
            } else {
                break;
            }
        }
        self.write_raw(tag, &bytes[start..]);
    }

    /// Write an unsigned integer, adding a leading zero when the high bit is set.
    pub fn write_unsigned(&mut self, tag: u8, value: u64) {
        let bytes = value.to_be_bytes();
        let skip = bytes
            .iter()
            .take_while(|&&b| b == 0)
            .count()
            .min(bytes.len() - 1);
        let significant = &bytes[skip..];
        if significant[0] & 0x80 != 0 {
            self.write_header(tag, significant.len() + 1);
            self.buf.push(0);
            self.buf.extend_from_slice(significant);
        } else {
            self.write_raw(tag, significant);
        }
    }

    /// Write an OCTET STRING (or an application type with the same shape).
    pub fn write_octets(&mut self, tag: u8, value: &[u8]) {
        self.write_raw(tag, value);
    }

    /// Write a NULL (or a NULL-shaped exception).
    pub fn write_null(&mut self, tag: u8) {
        self.write_raw(tag, &[]);
    }

    /// Write an OBJECT IDENTIFIER.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::InvalidOid`] if the OID has fewer than two arcs
    /// or its first two arcs cannot be combined into one subidentifier.
    pub fn write_oid(&mut self, oid: &Oid) -> Result<(), EncodeError> {
        if !oid.is_ber_encodable() {
            return Err(EncodeError::InvalidOid(oid.clone()));
        }
        let [first, second, rest @ ..] = oid.arcs() else {
            return Err(EncodeError::InvalidOid(oid.clone()));
        };
        let mut content = Vec::with_capacity(rest.len() + 6);
        push_subid(&mut content, u64::from(*first) * 40 + u64::from(*second));
        for &arc in rest {
            push_subid(&mut content, u64::from(arc));
        }
        self.write_raw(tag::OBJECT_IDENTIFIER, &content);
        Ok(())
    }
}

/// Base-128, most significant group first, continuation bit on all but the last.
fn push_subid(out: &mut Vec<u8>, value: u64) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    let mut v = value;
    loop {
        groups[n] = (v & 0x7F) as u8;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(groups[i] | continuation);
    }
}
