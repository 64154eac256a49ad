//! SNMPv1/v2c messages and PDUs.
//!
//! ```text
//! Message ::= SEQUENCE { version INTEGER, community OCTET STRING, data PDU }
//! PDU     ::= [tag] { request-id, error-status, error-index, SEQUENCE OF VarBind }
//! VarBind ::= SEQUENCE { name OBJECT IDENTIFIER, value }
//! ```

use crate::ber::{tag, DecodeError, DecodeErrorKind, Decoder, EncodeError, Encoder};
use crate::model::Oid;
use crate::value::Value;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Protocol version on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Version {
    /// SNMPv1 (wire value 0).
    #[default]
    V1,
    /// SNMPv2c (wire value 1).
    V2c,
}

impl Version {
    /// The INTEGER carried in the message header.
    #[must_use]
    pub const fn wire_value(self) -> i64 {
        match self {
            Self::V1 => 0,
            Self::V2c => 1,
        }
    }

    /// Map a header INTEGER back to a version.
    #[must_use]
    pub const fn from_wire(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::V1),
            1 => Some(Self::V2c),
            _ => None,
        }
    }

    /// Short name as used on command lines (`1`, `2c`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "1",
            Self::V2c => "2c",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown version name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownVersion;

impl fmt::Display for UnknownVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown SNMP version (expected 1 or 2c)")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownVersion {}

impl core::str::FromStr for Version {
    type Err = UnknownVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" | "v1" => Ok(Self::V1),
            "2c" | "v2c" => Ok(Self::V2c),
            _ => Err(UnknownVersion),
        }
    }
}

/// PDU types this codec handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PduType {
    /// GetRequest.
    GetRequest,
    /// GetNextRequest.
    GetNextRequest,
    /// Response (GetResponse in v1).
    Response,
}

impl PduType {
    /// Context tag of the PDU.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::GetRequest => tag::GET_REQUEST,
            Self::GetNextRequest => tag::GET_NEXT_REQUEST,
            Self::Response => tag::RESPONSE,
        }
    }

    /// Map a context tag back to a PDU type.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            tag::GET_REQUEST => Some(Self::GetRequest),
            tag::GET_NEXT_REQUEST => Some(Self::GetNextRequest),
            tag::RESPONSE => Some(Self::Response),
            _ => None,
        }
    }
}

/// Error status of a response PDU (RFC 3416 section 3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorStatus {
    /// 0
    NoError,
    /// 1
    TooBig,
    /// 2
    NoSuchName,
    /// 3
    BadValue,
    /// 4
    ReadOnly,
    /// 5
    GenErr,
    /// 6
    NoAccess,
    /// 7
    WrongType,
    /// 8
    WrongLength,
    /// 9
    WrongEncoding,
    /// 10
    WrongValue,
    /// 11
    NoCreation,
    /// 12
    InconsistentValue,
    /// 13
    ResourceUnavailable,
    /// 14
    CommitFailed,
    /// 15
    UndoFailed,
    /// 16
    AuthorizationError,
    /// 17
    NotWritable,
    /// 18
    InconsistentName,
    /// Any code outside the defined range.
    Unknown(i32),
}

impl ErrorStatus {
    /// Map a wire code to a status.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::TooBig,
            2 => Self::NoSuchName,
            3 => Self::BadValue,
            4 => Self::ReadOnly,
            5 => Self::GenErr,
            6 => Self::NoAccess,
            7 => Self::WrongType,
            8 => Self::WrongLength,
            9 => Self::WrongEncoding,
            10 => Self::WrongValue,
            11 => Self::NoCreation,
            12 => Self::InconsistentValue,
            13 => Self::ResourceUnavailable,
            14 => Self::CommitFailed,
            15 => Self::UndoFailed,
            16 => Self::AuthorizationError,
            17 => Self::NotWritable,
            18 => Self::InconsistentName,
            other => Self::Unknown(other),
        }
    }

    /// The wire code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::TooBig => 1,
            Self::NoSuchName => 2,
            Self::BadValue => 3,
            Self::ReadOnly => 4,
            Self::GenErr => 5,
            Self::NoAccess => 6,
            Self::WrongType => 7,
            Self::WrongLength => 8,
            Self::WrongEncoding => 9,
            Self::WrongValue => 10,
            Self::NoCreation => 11,
            Self::InconsistentValue => 12,
            Self::ResourceUnavailable => 13,
            Self::CommitFailed => 14,
            Self::UndoFailed => 15,
            Self::AuthorizationError => 16,
            Self::NotWritable => 17,
            Self::InconsistentName => 18,
            Self::Unknown(code) => code,
        }
    }

    /// The status name from RFC 3416.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoError => "noError",
            Self::TooBig => "tooBig",
            Self::NoSuchName => "noSuchName",
            Self::BadValue => "badValue",
            Self::ReadOnly => "readOnly",
            Self::GenErr => "genErr",
            Self::NoAccess => "noAccess",
            Self::WrongType => "wrongType",
            Self::WrongLength => "wrongLength",
            Self::WrongEncoding => "wrongEncoding",
            Self::WrongValue => "wrongValue",
            Self::NoCreation => "noCreation",
            Self::InconsistentValue => "inconsistentValue",
            Self::ResourceUnavailable => "resourceUnavailable",
            Self::CommitFailed => "commitFailed",
            Self::UndoFailed => "undoFailed",
            Self::AuthorizationError => "authorizationError",
            Self::NotWritable => "notWritable",
            Self::InconsistentName => "inconsistentName",
            Self::Unknown(_) => "unknownError",
        }
    }

    /// Check for the success status.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::NoError)
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknownError({code})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// One variable binding.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarBind {
    /// Bound OID.
    pub oid: Oid,
    /// Bound value.
    pub value: Value,
}

impl VarBind {
    /// Create a binding.
    #[must_use]
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    /// A request binding: the OID with a NULL placeholder.
    #[must_use]
    pub fn null(oid: Oid) -> Self {
        Self::new(oid, Value::Null)
    }
}

impl fmt::Display for VarBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}: {}", self.oid, self.value.type_name(), self.value)
    }
}

/// A protocol data unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pdu {
    /// PDU type.
    pub pdu_type: PduType,
    /// Correlation identifier.
    pub request_id: i32,
    /// Raw error-status code.
    pub error_status: i32,
    /// 1-based index of the failing binding, 0 if none.
    pub error_index: i32,
    /// Variable bindings.
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    /// A GetRequest for a single OID.
    #[must_use]
    pub fn get_request(request_id: i32, oid: Oid) -> Self {
        Self {
            pdu_type: PduType::GetRequest,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds: vec![VarBind::null(oid)],
        }
    }

    /// A Response with the given status and bindings.
    #[must_use]
    pub fn response(
        request_id: i32,
        status: ErrorStatus,
        error_index: i32,
        varbinds: Vec<VarBind>,
    ) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id,
            error_status: status.code(),
            error_index,
            varbinds,
        }
    }

    /// The decoded error status.
    #[must_use]
    pub fn status(&self) -> ErrorStatus {
        ErrorStatus::from_code(self.error_status)
    }

    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.constructed(self.pdu_type.tag(), |pdu| {
            pdu.write_integer(tag::INTEGER, i64::from(self.request_id));
            pdu.write_integer(tag::INTEGER, i64::from(self.error_status));
            pdu.write_integer(tag::INTEGER, i64::from(self.error_index));
            pdu.constructed(tag::SEQUENCE, |list| {
                for vb in &self.varbinds {
                    list.constructed(tag::SEQUENCE, |item| {
                        item.write_oid(&vb.oid)?;
                        vb.value.encode(item)
                    })?;
                }
                Ok(())
            })
        })
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let start = dec.offset();
        let pdu_tag = dec.peek_tag()?;
        let pdu_type = PduType::from_tag(pdu_tag)
            .ok_or_else(|| DecodeError::new(start, DecodeErrorKind::UnsupportedPdu(pdu_tag)))?;

        let mut body = dec.read_constructed(pdu_tag)?;
        let request_id = body.read_i32(tag::INTEGER)?;
        let error_status = body.read_i32(tag::INTEGER)?;
        let error_index = body.read_i32(tag::INTEGER)?;

        let mut list = body.read_constructed(tag::SEQUENCE)?;
        let mut varbinds = Vec::new();
        while !list.is_empty() {
            let mut item = list.read_constructed(tag::SEQUENCE)?;
            let oid = item.read_oid()?;
            let value = Value::decode(&mut item)?;
            item.finish()?;
            varbinds.push(VarBind::new(oid, value));
        }
        body.finish()?;

        Ok(Self {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }
}

/// A complete SNMPv1/v2c message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Protocol version.
    pub version: Version,
    /// Community string.
    pub community: Vec<u8>,
    /// The PDU.
    pub pdu: Pdu,
}

impl Message {
    /// Create a message.
    #[must_use]
    pub fn new(version: Version, community: impl Into<Vec<u8>>, pdu: Pdu) -> Self {
        Self {
            version,
            community: community.into(),
            pdu,
        }
    }

    /// Encode to a datagram.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if a bound OID cannot be BER-encoded.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut enc = Encoder::new();
        enc.constructed(tag::SEQUENCE, |msg| {
            msg.write_integer(tag::INTEGER, self.version.wire_value());
            msg.write_octets(tag::OCTET_STRING, &self.community);
            self.pdu.encode(msg)
        })?;
        Ok(enc.finish())
    }

    /// Decode a datagram.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] for malformed BER, unknown versions, PDU types
    /// other than Get/GetNext/Response, or trailing bytes.
    pub fn decode(datagram: &[u8]) -> Result<Self, DecodeError> {
        let mut outer = Decoder::new(datagram);
        let mut msg = outer.read_constructed(tag::SEQUENCE)?;
        outer.finish()?;

        let version = read_version(&mut msg)?;
        let community = msg.read_octets(tag::OCTET_STRING)?.to_vec();
        let pdu = Pdu::decode(&mut msg)?;
        msg.finish()?;

        Ok(Self {
            version,
            community,
            pdu,
        })
    }
}

fn read_version(msg: &mut Decoder<'_>) -> Result<Version, DecodeError> {
    let start = msg.offset();
    let raw = msg.read_integer(tag::INTEGER)?;
    Version::from_wire(raw)
        .ok_or_else(|| DecodeError::new(start, DecodeErrorKind::UnsupportedVersion(raw)))
}

/// Extract the request-id from a datagram without decoding the bindings.
///
/// Used to route replies when several transactions share one socket.
///
/// # Errors
///
/// Returns [`DecodeError`] if the header up to the request-id is malformed.
pub fn peek_request_id(datagram: &[u8]) -> Result<i32, DecodeError> {
    let mut outer = Decoder::new(datagram);
    let mut msg = outer.read_constructed(tag::SEQUENCE)?;
    read_version(&mut msg)?;
    msg.read_octets(tag::OCTET_STRING)?;

    let start = msg.offset();
    let pdu_tag = msg.peek_tag()?;
    if PduType::from_tag(pdu_tag).is_none() {
        return Err(DecodeError::new(
            start,
            DecodeErrorKind::UnsupportedPdu(pdu_tag),
        ));
    }
    let mut body = msg.read_constructed(pdu_tag)?;
    body.read_i32(tag::INTEGER)
}

#[cfg(test)]
mod tests {
    use super::*;

    // GetRequest, v1, community "public", request-id 1, 1.3.6.1.2.1.1.1.0
    const GET_SYS_DESCR: [u8; 39] = [
        0x30, 0x25, // SEQUENCE
        0x02, 0x01, 0x00, // version 0
        0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c', // community
        0xA0, 0x18, // GetRequest
        0x02, 0x01, 0x01, // request-id 1
        0x02, 0x01, 0x00, // error-status
        0x02, 0x01, 0x00, // error-index
        0x30, 0x0D, // varbind list
        0x30, 0x0B, // varbind
        0x06, 0x07, 0x2B, 0x06, 0x01, 0x02, 0x01, 0x01, 0x01, // 1.3.6.1.2.1.1.1
        0x05, 0x00, // NULL
    ];

    fn sys_descr() -> Oid {
        Oid::parse("1.3.6.1.2.1.1.1").unwrap()
    }

    #[test]
    fn test_encode_get_request_bytes() {
        let msg = Message::new(Version::V1, "public", Pdu::get_request(1, sys_descr()));
        assert_eq!(msg.encode().unwrap(), GET_SYS_DESCR);
    }

    #[test]
    fn test_decode_get_request_bytes() {
        let msg = Message::decode(&GET_SYS_DESCR).unwrap();
        assert_eq!(msg.version, Version::V1);
        assert_eq!(msg.community, b"public");
        assert_eq!(msg.pdu.pdu_type, PduType::GetRequest);
        assert_eq!(msg.pdu.request_id, 1);
        assert_eq!(msg.pdu.varbinds, vec![VarBind::null(sys_descr())]);
    }

    #[test]
    fn test_response_with_value() {
        let oid = Oid::parse("1.3.6.1.2.1.1.1.0").unwrap();
        let pdu = Pdu::response(
            -7,
            ErrorStatus::NoError,
            0,
            vec![VarBind::new(oid.clone(), Value::OctetString(b"router".to_vec()))],
        );
        let bytes = Message::new(Version::V2c, "private", pdu.clone()).encode().unwrap();
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded.version, Version::V2c);
        assert_eq!(decoded.pdu, pdu);
        assert_eq!(decoded.pdu.status(), ErrorStatus::NoError);
    }

    #[test]
    fn test_peek_request_id() {
        assert_eq!(peek_request_id(&GET_SYS_DESCR), Ok(1));

        let pdu = Pdu::response(0x1234_5678, ErrorStatus::TooBig, 1, Vec::new());
        let bytes = Message::new(Version::V1, "public", pdu).encode().unwrap();
        assert_eq!(peek_request_id(&bytes), Ok(0x1234_5678));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut bytes = GET_SYS_DESCR;
        bytes[4] = 3; // SNMPv3
        let err = Message::decode(&bytes).unwrap_err();
        assert_eq!(err, DecodeError::new(2, DecodeErrorKind::UnsupportedVersion(3)));
    }

    #[test]
    fn test_decode_rejects_trap_pdu() {
        let mut bytes = GET_SYS_DESCR;
        bytes[13] = 0xA7; // SNMPv2-Trap
        let err = Message::decode(&bytes).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnsupportedPdu(0xA7));
        assert!(peek_request_id(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Message::decode(b"hello").is_err());
        assert!(Message::decode(&GET_SYS_DESCR[..20]).is_err());
        assert!(Message::decode(&[]).is_err());
    }

    #[test]
    fn test_error_status_codes() {
        for code in 0..=18 {
            assert_eq!(ErrorStatus::from_code(code).code(), code);
        }
        assert_eq!(ErrorStatus::from_code(2).as_str(), "noSuchName");
        assert_eq!(ErrorStatus::from_code(99), ErrorStatus::Unknown(99));
        assert_eq!(ErrorStatus::Unknown(99).to_string(), "unknownError(99)");
        assert!(ErrorStatus::NoError.is_ok());
    }

    #[test]
    fn test_version_parse() {
        assert_eq!("1".parse::<Version>(), Ok(Version::V1));
        assert_eq!("2c".parse::<Version>(), Ok(Version::V2c));
        assert_eq!("3".parse::<Version>(), Err(UnknownVersion));
    }
}
