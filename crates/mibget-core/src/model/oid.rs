//! OID (Object Identifier) representation.

use alloc::string::String;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::fmt::{self, Write};
use core::str::FromStr;

/// Why a dotted OID string was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OidError {
    /// The input has no arcs at all.
    Empty,
    /// Two dots in a row, or a trailing dot (0-based arc position).
    EmptyArc {
        /// Position of the empty arc.
        position: usize,
    },
    /// An arc is not a decimal number that fits in 32 bits.
    InvalidArc {
        /// Position of the offending arc.
        position: usize,
    },
}

impl fmt::Display for OidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty OID"),
            Self::EmptyArc { position } => write!(f, "empty arc at position {position}"),
            Self::InvalidArc { position } => {
                write!(f, "arc at position {position} is not an unsigned 32-bit number")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for OidError {}

/// A numeric OID.
///
/// Ordering is component-wise lexicographic, so a parent sorts directly
/// before its subtree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Oid {
    arcs: Vec<u32>,
}

impl Oid {
    /// Create a new OID from a vector of arcs.
    #[must_use]
    pub fn new(arcs: Vec<u32>) -> Self {
        Self { arcs }
    }

    /// Create an OID from a slice of arcs.
    #[must_use]
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: arcs.to_vec(),
        }
    }

    /// Parse an OID from dotted notation (e.g., "1.3.6.1.2.1").
    ///
    /// A single leading dot is accepted (`.1.3.6.1`). Every arc must be a
    /// plain decimal number.
    ///
    /// # Errors
    ///
    /// Returns [`OidError`] for empty input, empty arcs, or arcs that are not
    /// unsigned 32-bit decimals.
    pub fn parse(s: &str) -> Result<Self, OidError> {
        let s = s.strip_prefix('.').unwrap_or(s);
        if s.is_empty() {
            return Err(OidError::Empty);
        }

        let mut arcs = Vec::with_capacity(s.len() / 2 + 1);
        for (position, part) in s.split('.').enumerate() {
            if part.is_empty() {
                return Err(OidError::EmptyArc { position });
            }
            // u32::from_str also takes a leading '+', which is not an OID arc.
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(OidError::InvalidArc { position });
            }
            let arc = part
                .parse::<u32>()
                .map_err(|_| OidError::InvalidArc { position })?;
            arcs.push(arc);
        }
        Ok(Self::new(arcs))
    }

    /// Convert to dotted notation string.
    #[must_use]
    pub fn to_dotted(&self) -> String {
        // avg ~3 chars per arc + 1 for dots
        let mut result = String::with_capacity(self.arcs.len() * 4);
        // write! to String is infallible
        let _ = write!(result, "{self}");
        result
    }

    /// Get the parent OID (all arcs except the last).
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.arcs.len() <= 1 {
            None
        } else {
            Some(Self::from_slice(&self.arcs[..self.arcs.len() - 1]))
        }
    }

    /// Get the last arc.
    #[must_use]
    pub fn last_arc(&self) -> Option<u32> {
        self.arcs.last().copied()
    }

    /// Check if this OID is a prefix of another, or equal to it.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.arcs.starts_with(&self.arcs)
    }

    /// Check if this OID is a strict ancestor of another.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.arcs.len() < other.arcs.len() && self.is_prefix_of(other)
    }

    /// Get the number of arcs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Check if the OID is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Get the arcs as a slice.
    #[must_use]
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Create a new OID with one more trailing arc.
    #[must_use]
    pub fn append(&self, arc: u32) -> Self {
        let mut arcs = Vec::with_capacity(self.arcs.len() + 1);
        arcs.extend_from_slice(&self.arcs);
        arcs.push(arc);
        Self::new(arcs)
    }

    /// Check whether BER can carry this OID.
    ///
    /// The first two arcs share one subidentifier (`40 * a + b`), which
    /// needs at least two arcs, limits the first arc to 0..=2 and, below 2,
    /// the second arc to 0..40.
    #[must_use]
    pub fn is_ber_encodable(&self) -> bool {
        match self.arcs.as_slice() {
            [] | [_] => false,
            [first, second, ..] => match first {
                0 | 1 => *second < 40,
                2 => u64::from(*second) + 80 <= u64::from(u32::MAX),
                _ => false,
            },
        }
    }
}

impl FromStr for Oid {
    type Err = OidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Vec and slice ordering agree, so the map can be probed with raw arcs.
impl Borrow<[u32]> for Oid {
    fn borrow(&self) -> &[u32] {
        &self.arcs
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.arcs.iter();
        if let Some(first) = iter.next() {
            write!(f, "{first}")?;
            for arc in iter {
                write!(f, ".{arc}")?;
            }
        }
        Ok(())
    }
}
