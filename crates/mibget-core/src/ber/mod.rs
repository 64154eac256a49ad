//! BER (Basic Encoding Rules) primitives for SNMP messages.
//!
//! Only the subset SNMPv1/v2c uses: definite lengths, primitive INTEGER,
//! OCTET STRING, NULL and OBJECT IDENTIFIER, application-tagged integers,
//! and constructed SEQUENCE / PDU containers.

mod decode;
mod encode;

pub use decode::Decoder;
pub use encode::Encoder;

use core::fmt;

/// Universal and application tags used by SNMP.
pub mod tag {
    /// INTEGER.
    pub const INTEGER: u8 = 0x02;
    /// OCTET STRING.
    pub const OCTET_STRING: u8 = 0x04;
    /// NULL.
    pub const NULL: u8 = 0x05;
    /// OBJECT IDENTIFIER.
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    /// SEQUENCE (constructed).
    pub const SEQUENCE: u8 = 0x30;
    /// IpAddress (application 0).
    pub const IP_ADDRESS: u8 = 0x40;
    /// Counter32 (application 1).
    pub const COUNTER32: u8 = 0x41;
    /// Gauge32 / Unsigned32 (application 2).
    pub const GAUGE32: u8 = 0x42;
    /// TimeTicks (application 3).
    pub const TIMETICKS: u8 = 0x43;
    /// Opaque (application 4).
    pub const OPAQUE: u8 = 0x44;
    /// Counter64 (application 6).
    pub const COUNTER64: u8 = 0x46;
    /// noSuchObject exception (context 0).
    pub const NO_SUCH_OBJECT: u8 = 0x80;
    /// noSuchInstance exception (context 1).
    pub const NO_SUCH_INSTANCE: u8 = 0x81;
    /// endOfMibView exception (context 2).
    pub const END_OF_MIB_VIEW: u8 = 0x82;
    /// GetRequest-PDU (context 0, constructed).
    pub const GET_REQUEST: u8 = 0xA0;
    /// GetNextRequest-PDU (context 1, constructed).
    pub const GET_NEXT_REQUEST: u8 = 0xA1;
    /// Response-PDU (context 2, constructed).
    pub const RESPONSE: u8 = 0xA2;
}

/// The kind of decoding failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Input ended inside a TLV.
    Truncated,
    /// A different tag was expected at this position.
    UnexpectedTag {
        /// Tag the grammar requires.
        expected: u8,
        /// Tag found.
        found: u8,
    },
    /// Indefinite length form (0x80), never valid in SNMP.
    IndefiniteLength,
    /// Length field wider than the platform can address.
    LengthOverflow,
    /// Zero-length INTEGER.
    EmptyInteger,
    /// INTEGER does not fit the target type.
    IntegerOverflow,
    /// NULL with content.
    InvalidNull,
    /// Malformed OBJECT IDENTIFIER content.
    InvalidOid,
    /// IpAddress that is not four bytes.
    InvalidIpAddress,
    /// Bytes left over after a complete structure.
    TrailingData,
    /// Message version other than SNMPv1 or SNMPv2c.
    UnsupportedVersion(i64),
    /// PDU type this codec does not handle.
    UnsupportedPdu(u8),
}

/// Decoding failure at a byte offset of the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeError {
    /// Offset of the TLV (or byte) that failed.
    pub offset: usize,
    /// What went wrong.
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub(crate) const fn new(offset: usize, kind: DecodeErrorKind) -> Self {
        Self { offset, kind }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BER decode error at offset {}: ", self.offset)?;
        match self.kind {
            DecodeErrorKind::Truncated => write!(f, "truncated input"),
            DecodeErrorKind::UnexpectedTag { expected, found } => {
                write!(f, "expected tag 0x{expected:02X}, found 0x{found:02X}")
            }
            DecodeErrorKind::IndefiniteLength => write!(f, "indefinite length"),
            DecodeErrorKind::LengthOverflow => write!(f, "length overflow"),
            DecodeErrorKind::EmptyInteger => write!(f, "empty integer"),
            DecodeErrorKind::IntegerOverflow => write!(f, "integer overflow"),
            DecodeErrorKind::InvalidNull => write!(f, "NULL with content"),
            DecodeErrorKind::InvalidOid => write!(f, "invalid object identifier"),
            DecodeErrorKind::InvalidIpAddress => write!(f, "IpAddress is not 4 bytes"),
            DecodeErrorKind::TrailingData => write!(f, "trailing data"),
            DecodeErrorKind::UnsupportedVersion(v) => write!(f, "unsupported version {v}"),
            DecodeErrorKind::UnsupportedPdu(t) => write!(f, "unsupported PDU type 0x{t:02X}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Encoding failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// OID cannot be represented in BER (see [`crate::model::Oid::is_ber_encodable`]).
    InvalidOid(crate::model::Oid),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOid(oid) => write!(f, "OID {oid} cannot be BER-encoded"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}
