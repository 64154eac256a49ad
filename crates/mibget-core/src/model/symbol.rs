//! Symbol and fragment types.

use super::ids::{FragmentId, NodeId, StrId, SymbolId};
use super::node::SymbolKind;
use super::oid::Oid;
use alloc::string::String;
use alloc::vec::Vec;

/// One symbol as supplied by a fragment source, before indexing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolDef {
    /// Symbol name.
    pub name: String,
    /// Absolute OID.
    pub oid: Oid,
    /// Classification.
    pub kind: SymbolKind,
}

impl SymbolDef {
    /// Create a symbol definition.
    #[must_use]
    pub fn new(name: impl Into<String>, oid: Oid, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            oid,
            kind,
        }
    }
}

/// A fragment (one loaded unit of symbol definitions) before indexing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FragmentDef {
    /// Fragment name, usually the module name (e.g. `SNMPv2-MIB`).
    pub name: String,
    /// Symbols in definition order.
    pub symbols: Vec<SymbolDef>,
}

impl FragmentDef {
    /// Create an empty fragment.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbols: Vec::new(),
        }
    }

    /// Append a symbol definition.
    pub fn push(&mut self, name: impl Into<String>, oid: Oid, kind: SymbolKind) {
        self.symbols.push(SymbolDef::new(name, oid, kind));
    }

    /// Builder form of [`FragmentDef::push`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, oid: Oid, kind: SymbolKind) -> Self {
        self.push(name, oid, kind);
        self
    }
}

/// Why a symbol definition was dropped while loading a fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The definition has no arcs.
    EmptyOid,
    /// The fragment already defines this name.
    DuplicateInFragment,
}

/// An indexed symbol.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Symbol {
    /// Symbol identifier.
    pub id: SymbolId,
    /// Defining fragment.
    pub fragment: FragmentId,
    /// Symbol name.
    pub name: StrId,
    /// Node in OID tree.
    pub node: NodeId,
    /// Classification.
    pub kind: SymbolKind,
}

/// An indexed fragment.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fragment {
    /// Fragment identifier.
    pub id: FragmentId,
    /// Fragment name.
    pub name: StrId,
    /// Symbols kept from this fragment, in definition order.
    pub symbols: Vec<SymbolId>,
}

impl Fragment {
    /// Create an empty fragment record.
    #[must_use]
    pub fn new(id: FragmentId, name: StrId) -> Self {
        Self {
            id,
            name,
            symbols: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_def_builder_keeps_order() {
        let def = FragmentDef::new("TEST-MIB")
            .with("b", Oid::from_slice(&[1, 2]), SymbolKind::Node)
            .with("a", Oid::from_slice(&[1, 1]), SymbolKind::Scalar);

        let names: Vec<_> = def.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(def.symbols[1].kind, SymbolKind::Scalar);
    }
}
