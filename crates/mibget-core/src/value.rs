//! SNMP variable binding values.

use crate::ber::{tag, DecodeError, DecodeErrorKind, Decoder, EncodeError, Encoder};
use crate::model::Oid;
use alloc::vec::Vec;
use core::fmt;

/// A value carried in a variable binding.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// INTEGER / Integer32.
    Integer(i32),
    /// OCTET STRING.
    OctetString(Vec<u8>),
    /// NULL, the placeholder value in requests.
    Null,
    /// OBJECT IDENTIFIER.
    ObjectIdentifier(Oid),
    /// IpAddress.
    IpAddress([u8; 4]),
    /// Counter32.
    Counter32(u32),
    /// Gauge32 / Unsigned32.
    Gauge32(u32),
    /// TimeTicks, hundredths of a second.
    TimeTicks(u32),
    /// Opaque.
    Opaque(Vec<u8>),
    /// Counter64.
    Counter64(u64),
    /// noSuchObject exception (v2c).
    NoSuchObject,
    /// noSuchInstance exception (v2c).
    NoSuchInstance,
    /// endOfMibView exception (v2c).
    EndOfMibView,
}

impl Value {
    /// Check if this is one of the v2c exception values.
    #[must_use]
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView
        )
    }

    /// Name of the value's SMI type, as agents and tools print it.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "INTEGER",
            Self::OctetString(_) => "STRING",
            Self::Null => "NULL",
            Self::ObjectIdentifier(_) => "OID",
            Self::IpAddress(_) => "IpAddress",
            Self::Counter32(_) => "Counter32",
            Self::Gauge32(_) => "Gauge32",
            Self::TimeTicks(_) => "Timeticks",
            Self::Opaque(_) => "Opaque",
            Self::Counter64(_) => "Counter64",
            Self::NoSuchObject => "noSuchObject",
            Self::NoSuchInstance => "noSuchInstance",
            Self::EndOfMibView => "endOfMibView",
        }
    }

    pub(crate) fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            Self::Integer(v) => enc.write_integer(tag::INTEGER, i64::from(*v)),
            Self::OctetString(v) => enc.write_octets(tag::OCTET_STRING, v),
            Self::Null => enc.write_null(tag::NULL),
            Self::ObjectIdentifier(oid) => enc.write_oid(oid)?,
            Self::IpAddress(v) => enc.write_octets(tag::IP_ADDRESS, v),
            Self::Counter32(v) => enc.write_unsigned(tag::COUNTER32, u64::from(*v)),
            Self::Gauge32(v) => enc.write_unsigned(tag::GAUGE32, u64::from(*v)),
            Self::TimeTicks(v) => enc.write_unsigned(tag::TIMETICKS, u64::from(*v)),
            Self::Opaque(v) => enc.write_octets(tag::OPAQUE, v),
            Self::Counter64(v) => enc.write_unsigned(tag::COUNTER64, *v),
            Self::NoSuchObject => enc.write_null(tag::NO_SUCH_OBJECT),
            Self::NoSuchInstance => enc.write_null(tag::NO_SUCH_INSTANCE),
            Self::EndOfMibView => enc.write_null(tag::END_OF_MIB_VIEW),
        }
        Ok(())
    }

    pub(crate) fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let start = dec.offset();
        let value = match dec.peek_tag()? {
            tag::INTEGER => Self::Integer(dec.read_i32(tag::INTEGER)?),
            tag::OCTET_STRING => Self::OctetString(dec.read_octets(tag::OCTET_STRING)?.to_vec()),
            tag::NULL => {
                dec.read_null(tag::NULL)?;
                Self::Null
            }
            tag::OBJECT_IDENTIFIER => Self::ObjectIdentifier(dec.read_oid()?),
            tag::IP_ADDRESS => {
                let bytes = dec.read_octets(tag::IP_ADDRESS)?;
                let addr = <[u8; 4]>::try_from(bytes)
                    .map_err(|_| DecodeError::new(start, DecodeErrorKind::InvalidIpAddress))?;
                Self::IpAddress(addr)
            }
            tag::COUNTER32 => Self::Counter32(dec.read_u32(tag::COUNTER32)?),
            tag::GAUGE32 => Self::Gauge32(dec.read_u32(tag::GAUGE32)?),
            tag::TIMETICKS => Self::TimeTicks(dec.read_u32(tag::TIMETICKS)?),
            tag::OPAQUE => Self::Opaque(dec.read_octets(tag::OPAQUE)?.to_vec()),
            tag::COUNTER64 => Self::Counter64(dec.read_unsigned(tag::COUNTER64)?),
            tag::NO_SUCH_OBJECT => {
                dec.read_null(tag::NO_SUCH_OBJECT)?;
                Self::NoSuchObject
            }
            tag::NO_SUCH_INSTANCE => {
                dec.read_null(tag::NO_SUCH_INSTANCE)?;
                Self::NoSuchInstance
            }
            tag::END_OF_MIB_VIEW => {
                dec.read_null(tag::END_OF_MIB_VIEW)?;
                Self::EndOfMibView
            }
            // Unknown application types are kept as raw bytes.
            other => Self::Opaque(dec.read_octets(other)?.to_vec()),
        };
        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::OctetString(v) | Self::Opaque(v) => match core::str::from_utf8(v) {
                Ok(s) if !s.chars().any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t') => {
                    write!(f, "{s}")
                }
                _ => {
                    for (i, b) in v.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        write!(f, "{b:02X}")?;
                    }
                    Ok(())
                }
            },
            Self::Null => f.write_str("NULL"),
            Self::ObjectIdentifier(oid) => write!(f, "{oid}"),
            Self::IpAddress([a, b, c, d]) => write!(f, "{a}.{b}.{c}.{d}"),
            Self::Counter32(v) | Self::Gauge32(v) => write!(f, "{v}"),
            Self::TimeTicks(v) => {
                let (days, rem) = (v / 8_640_000, v % 8_640_000);
                let (hours, rem) = (rem / 360_000, rem % 360_000);
                let (mins, rem) = (rem / 6_000, rem % 6_000);
                let (secs, centis) = (rem / 100, rem % 100);
                write!(f, "({v}) {days}d {hours:02}:{mins:02}:{secs:02}.{centis:02}")
            }
            Self::Counter64(v) => write!(f, "{v}"),
            Self::NoSuchObject => f.write_str("No Such Object available on this agent at this OID"),
            Self::NoSuchInstance => f.write_str("No Such Instance currently exists at this OID"),
            Self::EndOfMibView => f.write_str("No more variables left in this MIB View"),
        }
    }
}
