//! Resolution of user input to the OID a GET request carries.
//!
//! Input is either a symbol name, looked up in a [`SymbolTable`], or a dotted
//! numeric OID. Either way the result is normalized to a scalar instance by
//! appending `.0` unless the OID already ends in `0`.
//!
//! ```text
//! Query::Name("sysDescr")           → 1.3.6.1.2.1.1.1.0
//! Query::Numeric("1.3.6.1.2.1.1.1") → 1.3.6.1.2.1.1.1.0
//! Query::Numeric("1.3.6.1.2.1.1.1.0") unchanged
//! ```
//!
//! The resolver only reads the table and keeps no state between calls.

#[cfg(feature = "tracing")]
pub mod tracing;

use crate::model::{Oid, OidError, SymbolTable};
use alloc::string::String;
use core::fmt;

#[cfg(feature = "tracing")]
use self::tracing::{TraceEvent, TraceLevel, Tracer};

/// What the caller asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    /// A symbol name such as `sysDescr`.
    Name(String),
    /// A dotted numeric OID such as `1.3.6.1.2.1.1.1`.
    Numeric(String),
}

impl Query {
    /// The raw input text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Name(s) | Self::Numeric(s) => s,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// The numeric input (or a resolved OID) is unusable.
    MalformedOid {
        /// The rejected input.
        input: String,
        /// What is wrong with it.
        reason: MalformedReason,
    },
    /// No loaded fragment defines the name.
    UnknownSymbol {
        /// The name looked up.
        name: String,
    },
}

/// Why an OID was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MalformedReason {
    /// Dotted-notation syntax error.
    Syntax(OidError),
    /// The first two arcs cannot be BER-encoded.
    NotEncodable,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedOid { input, reason } => match reason {
                MalformedReason::Syntax(e) => write!(f, "malformed OID '{input}': {e}"),
                MalformedReason::NotEncodable => {
                    write!(f, "malformed OID '{input}': cannot be BER-encoded")
                }
            },
            Self::UnknownSymbol { name } => write!(f, "unknown symbol '{name}'"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedOid {
                reason: MalformedReason::Syntax(e),
                ..
            } => Some(e),
            _ => None,
        }
    }
}

/// Append the scalar instance suffix unless the OID already ends in `0`.
#[must_use]
pub fn normalize_instance(oid: Oid) -> Oid {
    if oid.last_arc() == Some(0) {
        oid
    } else {
        oid.append(0)
    }
}

/// Hooks called during resolution; no-ops unless tracing is enabled.
trait ResolveTracer {
    fn symbol_found(&mut self, _table: &SymbolTable, _name: &str) {}

    fn instance_appended(&mut self, _oid: &Oid) {}

    fn resolve_failed(&mut self, _input: &str, _error: &ResolveError) {}
}

struct NoopResolveTracer;

impl ResolveTracer for NoopResolveTracer {}

#[cfg(feature = "tracing")]
struct TracingWrapper<'a, T: Tracer>(&'a mut T);

#[cfg(feature = "tracing")]
impl<T: Tracer> ResolveTracer for TracingWrapper<'_, T> {
    fn symbol_found(&mut self, table: &SymbolTable, name: &str) {
        if let Some(sym) = table.find_by_name(name) {
            crate::trace_event!(
                self.0,
                TraceLevel::Debug,
                TraceEvent::SymbolFound {
                    name,
                    symbol: sym.id(),
                    fragment: sym.fragment_id(),
                }
            );
        }
    }

    fn instance_appended(&mut self, oid: &Oid) {
        if TraceLevel::Debug <= self.0.level() {
            let oid = oid.to_dotted();
            self.0
                .trace(TraceLevel::Debug, TraceEvent::InstanceAppended { oid: &oid });
        }
    }

    fn resolve_failed(&mut self, input: &str, error: &ResolveError) {
        crate::trace_event!(
            self.0,
            TraceLevel::Warn,
            TraceEvent::ResolveFailed { input, error }
        );
    }
}

/// Turns a [`Query`] into a request OID against a loaded table.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    table: &'a SymbolTable,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over a loaded table.
    #[must_use]
    pub fn new(table: &'a SymbolTable) -> Self {
        Self { table }
    }

    /// The table lookups go through.
    #[must_use]
    pub fn table(&self) -> &'a SymbolTable {
        self.table
    }

    /// Resolve a query to the OID to fetch.
    ///
    /// # Errors
    ///
    /// [`ResolveError::MalformedOid`] for bad numeric input or an OID that
    /// cannot be encoded; [`ResolveError::UnknownSymbol`] when no loaded
    /// fragment defines the name.
    pub fn resolve(&self, query: &Query) -> Result<Oid, ResolveError> {
        self.resolve_inner(query, &mut NoopResolveTracer)
    }

    /// Resolve a query, reporting the winning symbol and normalization.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    #[cfg(feature = "tracing")]
    pub fn resolve_traced<T: Tracer>(
        &self,
        query: &Query,
        tracer: &mut T,
    ) -> Result<Oid, ResolveError> {
        self.resolve_inner(query, &mut TracingWrapper(tracer))
    }

    fn resolve_inner<TR: ResolveTracer>(
        &self,
        query: &Query,
        tracer: &mut TR,
    ) -> Result<Oid, ResolveError> {
        let result = self.lookup(query, tracer).and_then(|base| {
            let appended = base.last_arc() != Some(0);
            let oid = normalize_instance(base);
            if !oid.is_ber_encodable() {
                return Err(ResolveError::MalformedOid {
                    input: String::from(query.as_str()),
                    reason: MalformedReason::NotEncodable,
                });
            }
            if appended {
                tracer.instance_appended(&oid);
            }
            Ok(oid)
        });
        if let Err(ref error) = result {
            tracer.resolve_failed(query.as_str(), error);
        }
        result
    }

    fn lookup<TR: ResolveTracer>(&self, query: &Query, tracer: &mut TR) -> Result<Oid, ResolveError> {
        match query {
            Query::Numeric(text) => Oid::parse(text).map_err(|e| ResolveError::MalformedOid {
                input: text.clone(),
                reason: MalformedReason::Syntax(e),
            }),
            Query::Name(name) => {
                let sym = self
                    .table
                    .find_by_name(name)
                    .ok_or_else(|| ResolveError::UnknownSymbol { name: name.clone() })?;
                tracer.symbol_found(self.table, name);
                Ok(sym.oid())
            }
        }
    }
}
