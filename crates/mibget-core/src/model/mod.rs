//! Symbol table model.
//!
//! The symbol table is built once from one or more fragments and then only
//! queried:
//!
//! ```text
//! Fragment sources → [SymbolTable] → Resolver → GET request
//! ```
//!
//! # Features
//!
//! - Arena-based storage with stable index IDs
//! - Deduplicating string interner for names
//! - OID tree with multiple symbols per OID
//! - Lookups by name (first loaded fragment wins), exact OID, nearest
//!   enclosing OID, and `FRAGMENT::name`
//!
//! # Usage
//!
//! ```ignore
//! let mut table = SymbolTable::new();
//! table.load(&smi_fragment())?;
//! table.load(&my_fragment)?;
//!
//! if let Some(sym) = table.find_by_name("sysDescr") {
//!     println!("{} = {}", sym, sym.oid());
//! }
//! ```

mod ids;
mod interner;
mod node;
mod oid;
mod symbol;

pub use ids::{FragmentId, NodeId, StrId, SymbolId};
pub use interner::{InternerFull, StringInterner};
pub use node::{OidNode, SymbolKind, UnknownKind};
pub use oid::{Oid, OidError};
pub use symbol::{Fragment, FragmentDef, SkipReason, Symbol, SymbolDef};

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "tracing")]
use crate::resolver::tracing::{TraceEvent, TraceLevel, Tracer};

/// Error returned when symbol table storage capacity is exceeded.
///
/// The table uses `NonZeroU32` IDs, limiting each collection to `u32::MAX - 1` items.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityError {
    /// The kind of storage that exceeded capacity.
    pub kind: CapacityErrorKind,
}

/// The kind of storage that exceeded capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapacityErrorKind {
    /// Too many distinct names.
    Strings,
    /// Too many fragments.
    Fragments,
    /// Too many OID nodes.
    Nodes,
    /// Too many symbols.
    Symbols,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            CapacityErrorKind::Strings => "strings",
            CapacityErrorKind::Fragments => "fragments",
            CapacityErrorKind::Nodes => "nodes",
            CapacityErrorKind::Symbols => "symbols",
        };
        write!(f, "symbol table capacity exceeded: too many {kind} (limit: {})", u32::MAX - 1)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CapacityError {}

impl From<InternerFull> for CapacityError {
    fn from(_: InternerFull) -> Self {
        Self {
            kind: CapacityErrorKind::Strings,
        }
    }
}

const fn capacity(kind: CapacityErrorKind) -> CapacityError {
    CapacityError { kind }
}

/// Error returned by [`SymbolTable::from_parts`] when ids do not line up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorruptParts;

impl fmt::Display for CorruptParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inconsistent symbol table parts")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CorruptParts {}

/// Decomposed symbol table for serialization.
///
/// Lookup indices are not stored; they are rebuilt by
/// [`SymbolTable::from_parts`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableParts {
    /// String interner data (concatenated strings).
    pub strings_data: String,
    /// String interner offsets.
    pub strings_offsets: Vec<u32>,
    /// Fragments in load order.
    pub fragments: Vec<Fragment>,
    /// All OID tree nodes.
    pub nodes: Vec<OidNode>,
    /// All symbols in load order.
    pub symbols: Vec<Symbol>,
    /// Root node IDs.
    pub roots: Vec<NodeId>,
}

/// Hooks called while a fragment is indexed.
///
/// Methods default to no-ops so the untraced path compiles down to the bare
/// indexing loop.
trait LoadTracer {
    fn fragment_start(&mut self, _fragment: &str, _symbols: usize) {}

    fn fragment_loaded(&mut self, _fragment: &str, _id: FragmentId, _kept: usize, _skipped: usize) {
    }

    fn symbol_indexed(&mut self, _name: &str, _oid: &Oid, _symbol: SymbolId) {}

    fn name_shadowed(&mut self, _name: &str, _kept: FragmentId, _shadowed: FragmentId) {}

    fn oid_shared(&mut self, _name: &str, _oid: &Oid, _primary: SymbolId) {}

    fn symbol_skipped(&mut self, _fragment: &str, _name: &str, _reason: SkipReason) {}
}

struct NoopLoadTracer;

impl LoadTracer for NoopLoadTracer {}

#[cfg(feature = "tracing")]
struct TracingWrapper<'a, T: Tracer>(&'a mut T);

#[cfg(feature = "tracing")]
impl<T: Tracer> LoadTracer for TracingWrapper<'_, T> {
    fn fragment_start(&mut self, fragment: &str, symbols: usize) {
        crate::trace_event!(
            self.0,
            TraceLevel::Info,
            TraceEvent::FragmentStart { fragment, symbols }
        );
    }

    fn fragment_loaded(&mut self, fragment: &str, fragment_id: FragmentId, kept: usize, skipped: usize) {
        crate::trace_event!(
            self.0,
            TraceLevel::Info,
            TraceEvent::FragmentLoaded {
                fragment,
                fragment_id,
                kept,
                skipped,
            }
        );
    }

    fn symbol_indexed(&mut self, name: &str, oid: &Oid, symbol: SymbolId) {
        if TraceLevel::Trace <= self.0.level() {
            let oid = oid.to_dotted();
            self.0.trace(
                TraceLevel::Trace,
                TraceEvent::SymbolIndexed {
                    name,
                    oid: &oid,
                    symbol,
                },
            );
        }
    }

    fn name_shadowed(&mut self, name: &str, kept: FragmentId, shadowed: FragmentId) {
        crate::trace_event!(
            self.0,
            TraceLevel::Debug,
            TraceEvent::NameShadowed {
                name,
                kept,
                shadowed,
            }
        );
    }

    fn oid_shared(&mut self, name: &str, oid: &Oid, primary: SymbolId) {
        if TraceLevel::Debug <= self.0.level() {
            let oid = oid.to_dotted();
            self.0.trace(
                TraceLevel::Debug,
                TraceEvent::OidShared {
                    name,
                    oid: &oid,
                    primary,
                },
            );
        }
    }

    fn symbol_skipped(&mut self, fragment: &str, name: &str, reason: SkipReason) {
        crate::trace_event!(
            self.0,
            TraceLevel::Warn,
            TraceEvent::SymbolSkipped {
                fragment,
                name,
                reason,
            }
        );
    }
}

/// The symbol table.
///
/// Fragments are appended with [`SymbolTable::load`] in the configured order;
/// that order decides which definition a name lookup returns. After loading
/// the table is only read.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    // Storage
    strings: StringInterner,
    fragments: Vec<Fragment>,
    nodes: Vec<OidNode>,
    symbols: Vec<Symbol>,
    roots: Vec<NodeId>,

    // Lookup indices (rebuilt on load)
    oid_to_node: BTreeMap<Oid, NodeId>,
    /// Load-ordered candidates per name; the first entry answers lookups.
    name_index: BTreeMap<StrId, Vec<SymbolId>>,
}

impl SymbolTable {
    /// Create a new empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Loading ===

    /// Append a fragment.
    ///
    /// Names already defined by an earlier fragment stay bound to the earlier
    /// definition for name lookup; the new definition is still reachable by
    /// OID. Within one fragment, a repeated name keeps its first definition.
    /// Definitions with an empty OID are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if an id space would overflow. The check is
    /// made before anything is indexed.
    pub fn load(&mut self, fragment: &FragmentDef) -> Result<FragmentId, CapacityError> {
        self.load_inner(fragment, &mut NoopLoadTracer)
    }

    /// Append a fragment, reporting shadowing and dropped definitions.
    ///
    /// # Errors
    ///
    /// See [`SymbolTable::load`].
    #[cfg(feature = "tracing")]
    pub fn load_traced<T: Tracer>(
        &mut self,
        fragment: &FragmentDef,
        tracer: &mut T,
    ) -> Result<FragmentId, CapacityError> {
        self.load_inner(fragment, &mut TracingWrapper(tracer))
    }

    fn load_inner<TR: LoadTracer>(
        &mut self,
        def: &FragmentDef,
        tracer: &mut TR,
    ) -> Result<FragmentId, CapacityError> {
        self.check_capacity(def)?;
        tracer.fragment_start(&def.name, def.symbols.len());

        let fragment_id =
            FragmentId::from_index(self.fragments.len()).ok_or(capacity(CapacityErrorKind::Fragments))?;
        let fragment_name = self.strings.intern(&def.name)?;
        let mut fragment = Fragment::new(fragment_id, fragment_name);

        let mut seen = BTreeSet::new();
        let mut skipped = 0;

        for sym in &def.symbols {
            let name = self.strings.intern(&sym.name)?;
            if !seen.insert(name) {
                tracer.symbol_skipped(&def.name, &sym.name, SkipReason::DuplicateInFragment);
                skipped += 1;
                continue;
            }
            let Some(node_id) = self.ensure_node(sym.oid.arcs())? else {
                tracer.symbol_skipped(&def.name, &sym.name, SkipReason::EmptyOid);
                skipped += 1;
                continue;
            };

            let symbol_id =
                SymbolId::from_index(self.symbols.len()).ok_or(capacity(CapacityErrorKind::Symbols))?;

            let node = &mut self.nodes[node_id.to_index()];
            if let Some(primary) = node.primary_symbol() {
                tracer.oid_shared(&sym.name, &sym.oid, primary);
            }
            node.add_symbol(symbol_id);

            let candidates = self.name_index.entry(name).or_default();
            if let Some(&winner) = candidates.first() {
                tracer.name_shadowed(&sym.name, self.symbols[winner.to_index()].fragment, fragment_id);
            }
            candidates.push(symbol_id);

            self.symbols.push(Symbol {
                id: symbol_id,
                fragment: fragment_id,
                name,
                node: node_id,
                kind: sym.kind,
            });
            fragment.symbols.push(symbol_id);
            tracer.symbol_indexed(&sym.name, &sym.oid, symbol_id);
        }

        let kept = fragment.symbols.len();
        self.fragments.push(fragment);
        tracer.fragment_loaded(&def.name, fragment_id, kept, skipped);
        Ok(fragment_id)
    }

    /// Worst-case id consumption of a fragment, checked up front so a
    /// failed load leaves the table untouched.
    fn check_capacity(&self, def: &FragmentDef) -> Result<(), CapacityError> {
        let new_nodes: usize = def.symbols.iter().map(|s| s.oid.len()).sum();
        let checks = [
            (self.fragments.len(), CapacityErrorKind::Fragments),
            (self.symbols.len() + def.symbols.len(), CapacityErrorKind::Symbols),
            (self.nodes.len() + new_nodes, CapacityErrorKind::Nodes),
            (self.strings.len() + def.symbols.len() + 1, CapacityErrorKind::Strings),
        ];
        for (index, kind) in checks {
            if NodeId::from_index(index).is_none() {
                return Err(capacity(kind));
            }
        }
        Ok(())
    }

    /// Find or create the node for `arcs`, creating internal nodes on the way.
    /// Returns `None` for an empty path.
    fn ensure_node(&mut self, arcs: &[u32]) -> Result<Option<NodeId>, CapacityError> {
        if let Some(&id) = self.oid_to_node.get(arcs) {
            return Ok(Some(id));
        }

        let mut parent = None;
        for depth in 1..=arcs.len() {
            let subid = arcs[depth - 1];
            let id = match self.child_with_subid(parent, subid) {
                Some(id) => id,
                None => {
                    let id = NodeId::from_index(self.nodes.len())
                        .ok_or(capacity(CapacityErrorKind::Nodes))?;
                    self.nodes.push(OidNode::new(subid, parent));
                    match parent {
                        Some(p) => self.nodes[p.to_index()].add_child(id),
                        None => self.roots.push(id),
                    }
                    self.oid_to_node.insert(Oid::from_slice(&arcs[..depth]), id);
                    id
                }
            };
            parent = Some(id);
        }
        Ok(parent)
    }

    fn child_with_subid(&self, parent: Option<NodeId>, subid: u32) -> Option<NodeId> {
        let siblings = match parent {
            Some(p) => &self.nodes[p.to_index()].children,
            None => &self.roots,
        };
        siblings
            .iter()
            .copied()
            .find(|id| self.nodes[id.to_index()].subid == subid)
    }

    // === Lookups ===

    /// Look up a symbol by name.
    ///
    /// When several fragments define the name, the one loaded first wins.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<SymbolRef<'_>> {
        let id = self.strings.find(name)?;
        let first = *self.name_index.get(&id)?.first()?;
        self.symbol(first)
    }

    /// All definitions of a name, in load order.
    pub fn find_all_by_name<'a>(&'a self, name: &str) -> impl Iterator<Item = SymbolRef<'a>> + 'a {
        self.strings
            .find(name)
            .and_then(|id| self.name_index.get(&id))
            .into_iter()
            .flatten()
            .filter_map(|id| self.symbol(*id))
    }

    /// Look up the symbol whose OID is exactly `oid`.
    ///
    /// When several fragments bind the OID, the one loaded first wins.
    #[must_use]
    pub fn find_by_oid(&self, oid: &Oid) -> Option<SymbolRef<'_>> {
        let node = self.get_node(*self.oid_to_node.get(oid)?)?;
        self.symbol(node.primary_symbol()?)
    }

    /// Look up the symbol at `oid` or, failing that, at its nearest ancestor
    /// that has one.
    ///
    /// This walks the OID tree arc by arc, so instance OIDs such as
    /// `sysDescr.0` or `ifDescr.3` name their object.
    #[must_use]
    pub fn find_enclosing(&self, oid: &Oid) -> Option<SymbolRef<'_>> {
        let mut best = None;
        let mut parent = None;
        for &arc in oid.arcs() {
            let Some(id) = self.child_with_subid(parent, arc) else {
                break;
            };
            if let Some(symbol) = self.get_node(id).and_then(OidNode::primary_symbol) {
                best = Some(symbol);
            }
            parent = Some(id);
        }
        self.symbol(best?)
    }

    /// Look up a name as defined by a specific fragment.
    ///
    /// If the fragment name was loaded more than once, the first copy that
    /// defines the name wins.
    #[must_use]
    pub fn find_qualified(&self, fragment: &str, name: &str) -> Option<SymbolRef<'_>> {
        let fragment_name = self.strings.find(fragment)?;
        self.find_all_by_name(name)
            .find(|sym| self.fragments[sym.fragment_id().to_index()].name == fragment_name)
    }

    // === Accessors ===

    /// Get a symbol view by id.
    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> Option<SymbolRef<'_>> {
        self.symbols
            .get(id.to_index())
            .map(|symbol| SymbolRef { table: self, symbol })
    }

    /// Iterate over all symbols in load order.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolRef<'_>> {
        self.symbols.iter().map(|symbol| SymbolRef { table: self, symbol })
    }

    /// Get the number of symbols.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Get a fragment by id.
    #[must_use]
    pub fn fragment(&self, id: FragmentId) -> Option<&Fragment> {
        self.fragments.get(id.to_index())
    }

    /// Iterate over fragments in load order.
    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    /// Get the number of loaded fragments.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Get a fragment's name.
    #[must_use]
    pub fn fragment_name(&self, id: FragmentId) -> Option<&str> {
        self.fragment(id).map(|f| self.strings.get(f.name))
    }

    /// Get a node by ID.
    #[must_use]
    pub fn get_node(&self, id: NodeId) -> Option<&OidNode> {
        self.nodes.get(id.to_index())
    }

    /// Get the number of OID tree nodes, including internal ones.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over root nodes.
    pub fn roots(&self) -> impl Iterator<Item = &OidNode> {
        self.roots.iter().filter_map(|id| self.get_node(*id))
    }

    /// Get a string by its ID.
    #[must_use]
    pub fn get_str(&self, id: StrId) -> &str {
        self.strings.get(id)
    }

    /// Compute the full OID for a node.
    #[must_use]
    pub fn get_oid(&self, node: NodeId) -> Oid {
        let mut arcs = Vec::new();
        let mut current = self.get_node(node);
        // A well-formed tree is never deeper than the node count.
        while let Some(n) = current {
            if arcs.len() > self.nodes.len() {
                break;
            }
            arcs.push(n.subid);
            current = n.parent.and_then(|id| self.get_node(id));
        }
        arcs.reverse();
        Oid::new(arcs)
    }

    /// Get the OID a symbol is bound to.
    #[must_use]
    pub fn oid_of(&self, id: SymbolId) -> Option<Oid> {
        self.symbols.get(id.to_index()).map(|s| self.get_oid(s.node))
    }

    // === Serialization ===

    /// Decompose the table into parts for serialization.
    #[must_use]
    pub fn into_parts(self) -> TableParts {
        let (strings_data, strings_offsets) = self.strings.into_parts();
        TableParts {
            strings_data,
            strings_offsets,
            fragments: self.fragments,
            nodes: self.nodes,
            symbols: self.symbols,
            roots: self.roots,
        }
    }

    /// Reconstruct a table from serialized parts, rebuilding all indices.
    ///
    /// # Errors
    ///
    /// Returns [`CorruptParts`] if any stored id points outside its arena.
    pub fn from_parts(parts: TableParts) -> Result<Self, CorruptParts> {
        let strings =
            StringInterner::from_parts(parts.strings_data, parts.strings_offsets).ok_or(CorruptParts)?;
        let mut table = Self {
            strings,
            fragments: parts.fragments,
            nodes: parts.nodes,
            symbols: parts.symbols,
            roots: parts.roots,
            oid_to_node: BTreeMap::new(),
            name_index: BTreeMap::new(),
        };
        table.validate()?;
        table.rebuild_indices();
        Ok(table)
    }

    fn validate(&self) -> Result<(), CorruptParts> {
        let node_ok = |id: &NodeId| id.to_index() < self.nodes.len();
        let symbol_ok = |id: &SymbolId| id.to_index() < self.symbols.len();
        let str_ok = |id: &StrId| id.to_index() < self.strings.len();

        let fragments_ok = self.fragments.iter().enumerate().all(|(idx, f)| {
            f.id.to_index() == idx && str_ok(&f.name) && f.symbols.iter().all(symbol_ok)
        });
        let nodes_ok = self.nodes.iter().enumerate().all(|(idx, n)| {
            n.parent.map_or(true, |p| node_ok(&p) && p.to_index() < idx)
                && n.children.iter().all(node_ok)
                && n.symbols.iter().all(symbol_ok)
        });
        let symbols_ok = self.symbols.iter().enumerate().all(|(idx, s)| {
            s.id.to_index() == idx
                && s.fragment.to_index() < self.fragments.len()
                && str_ok(&s.name)
                && node_ok(&s.node)
        });
        let roots_ok = self.roots.iter().all(node_ok);

        if fragments_ok && nodes_ok && symbols_ok && roots_ok {
            Ok(())
        } else {
            Err(CorruptParts)
        }
    }

    fn rebuild_indices(&mut self) {
        self.oid_to_node.clear();
        self.name_index.clear();

        for idx in 0..self.nodes.len() {
            if let Some(id) = NodeId::from_index(idx) {
                let oid = self.get_oid(id);
                self.oid_to_node.insert(oid, id);
            }
        }

        // Symbols are stored in load order, which restores first-wins.
        for symbol in &self.symbols {
            self.name_index.entry(symbol.name).or_default().push(symbol.id);
        }
    }
}

/// A symbol together with the table that owns it.
#[derive(Clone, Copy)]
pub struct SymbolRef<'a> {
    table: &'a SymbolTable,
    symbol: &'a Symbol,
}

impl<'a> SymbolRef<'a> {
    /// Symbol id.
    #[must_use]
    pub fn id(&self) -> SymbolId {
        self.symbol.id
    }

    /// Symbol name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.table.get_str(self.symbol.name)
    }

    /// Classification.
    #[must_use]
    pub fn kind(&self) -> SymbolKind {
        self.symbol.kind
    }

    /// Absolute OID.
    #[must_use]
    pub fn oid(&self) -> Oid {
        self.table.get_oid(self.symbol.node)
    }

    /// Node in the OID tree.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.symbol.node
    }

    /// Defining fragment.
    #[must_use]
    pub fn fragment_id(&self) -> FragmentId {
        self.symbol.fragment
    }

    /// Defining fragment's name.
    #[must_use]
    pub fn fragment_name(&self) -> &'a str {
        self.table.fragment_name(self.symbol.fragment).unwrap_or("")
    }

    /// The underlying record.
    #[must_use]
    pub fn raw(&self) -> &'a Symbol {
        self.symbol
    }
}

impl fmt::Display for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.fragment_name(), self.name())
    }
}

impl fmt::Debug for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolRef")
            .field("fragment", &self.fragment_name())
            .field("name", &self.name())
            .field("oid", &self.oid().to_dotted())
            .field("kind", &self.kind())
            .finish()
    }
}
