//! Resolve-and-fetch: the one operation the command line is built on.

use crate::engine::{self, Outcome};
use crate::logging::LogTracer;
use crate::params::TransactionParams;
use crate::transport::Transport;
use mibget_core::model::{Oid, SymbolTable};
use mibget_core::resolver::{Query, ResolveError, Resolver};

/// A completed transaction together with the OID it asked for.
#[derive(Debug)]
pub struct Fetched {
    /// The normalized OID sent to the agent.
    pub oid: Oid,
    /// How the transaction ended.
    pub outcome: Outcome,
}

/// Resolve `query` against `table`, then GET the result from the agent.
///
/// # Errors
///
/// Returns [`ResolveError`] if the query cannot be resolved; nothing is sent
/// in that case. Network failures are reported in [`Fetched::outcome`].
pub async fn fetch<T: Transport>(
    table: &SymbolTable,
    query: &Query,
    params: &TransactionParams,
    transport: &mut T,
) -> Result<Fetched, ResolveError> {
    let oid = Resolver::new(table).resolve_traced(query, &mut LogTracer)?;
    tracing::info!(snmp.query = %query, snmp.oid = %oid, "resolved");
    let outcome = engine::get(transport, &oid, params).await;
    Ok(Fetched { oid, outcome })
}
