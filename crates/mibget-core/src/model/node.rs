//! OID tree node types.

use super::ids::{NodeId, SymbolId};
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

/// Classification of a symbol, as reported by the fragment that defines it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymbolKind {
    /// OBJECT-IDENTITY, MODULE-IDENTITY, or plain value assignment.
    #[default]
    Node,
    /// OBJECT-TYPE not in a table.
    Scalar,
    /// SYNTAX is SEQUENCE OF.
    Table,
    /// Has INDEX or AUGMENTS clause.
    Row,
    /// Parent is a row.
    Column,
    /// NOTIFICATION-TYPE or TRAP-TYPE.
    Notification,
    /// OBJECT-GROUP, NOTIFICATION-GROUP, MODULE-COMPLIANCE.
    Group,
}

impl SymbolKind {
    /// Check if this is an OBJECT-TYPE kind.
    #[must_use]
    pub fn is_object_type(&self) -> bool {
        matches!(self, Self::Scalar | Self::Table | Self::Row | Self::Column)
    }

    /// Keyword used in symbol listings.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Scalar => "scalar",
            Self::Table => "table",
            Self::Row => "row",
            Self::Column => "column",
            Self::Notification => "notification",
            Self::Group => "group",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised symbol kind keyword.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownKind;

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown symbol kind")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownKind {}

impl FromStr for SymbolKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(Self::Node),
            "scalar" => Ok(Self::Scalar),
            "table" => Ok(Self::Table),
            "row" => Ok(Self::Row),
            "column" => Ok(Self::Column),
            "notification" => Ok(Self::Notification),
            "group" => Ok(Self::Group),
            _ => Err(UnknownKind),
        }
    }
}

/// A node in the OID tree.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OidNode {
    /// The arc (subidentifier) at this position.
    pub subid: u32,
    /// Parent node, if any.
    pub parent: Option<NodeId>,
    /// Child nodes, in creation order.
    pub children: Vec<NodeId>,
    /// Symbols bound to this OID, in load order (may be from multiple fragments).
    pub symbols: Vec<SymbolId>,
}

impl OidNode {
    /// Create a new internal node.
    #[must_use]
    pub fn new(subid: u32, parent: Option<NodeId>) -> Self {
        Self {
            subid,
            parent,
            children: Vec::new(),
            symbols: Vec::new(),
        }
    }

    /// Get the primary symbol (first one loaded).
    #[must_use]
    pub fn primary_symbol(&self) -> Option<SymbolId> {
        self.symbols.first().copied()
    }

    /// Check if any symbol is bound to this node.
    #[must_use]
    pub fn has_symbol(&self) -> bool {
        !self.symbols.is_empty()
    }

    /// Check if this is a leaf node.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Add a child node.
    pub fn add_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    /// Bind a symbol to this node.
    pub fn add_symbol(&mut self, symbol: SymbolId) {
        self.symbols.push(symbol);
    }
}
