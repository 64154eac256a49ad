//! Logging setup and the bridge from core trace events to `tracing`.

use mibget_core::resolver::tracing::{TraceEvent, TraceLevel, Tracer};
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "mibget=info,mibget_std=info";

/// Install the global `fmt` subscriber, filtered by `RUST_LOG`.
///
/// Logs go to stderr so command output on stdout stays parseable.
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// `tracing::event!` needs a constant level, so each arm expands separately.
macro_rules! emit {
    ($level:expr, $event:expr) => {
        match $event {
            TraceEvent::FragmentStart { fragment, symbols } => {
                tracing::event!($level, mib.fragment = fragment, mib.symbols = symbols, "indexing fragment");
            }
            TraceEvent::FragmentLoaded {
                fragment,
                fragment_id,
                kept,
                skipped,
            } => {
                tracing::event!(
                    $level,
                    mib.fragment = fragment,
                    mib.fragment_id = fragment_id.to_raw(),
                    mib.kept = kept,
                    mib.skipped = skipped,
                    "fragment loaded"
                );
            }
            TraceEvent::SymbolIndexed { name, oid, symbol } => {
                tracing::event!($level, mib.symbol = name, mib.oid = oid, mib.symbol_id = symbol.to_raw(), "symbol indexed");
            }
            TraceEvent::NameShadowed {
                name,
                kept,
                shadowed,
            } => {
                tracing::event!(
                    $level,
                    mib.symbol = name,
                    mib.kept = kept.to_raw(),
                    mib.shadowed = shadowed.to_raw(),
                    "name already defined by an earlier fragment"
                );
            }
            TraceEvent::OidShared { name, oid, primary } => {
                tracing::event!($level, mib.symbol = name, mib.oid = oid, mib.primary = primary.to_raw(), "OID already bound");
            }
            TraceEvent::SymbolSkipped {
                fragment,
                name,
                reason,
            } => {
                tracing::event!($level, mib.fragment = fragment, mib.symbol = name, mib.reason = ?reason, "symbol skipped");
            }
            TraceEvent::SymbolFound {
                name,
                symbol,
                fragment,
            } => {
                tracing::event!($level, mib.symbol = name, mib.symbol_id = symbol.to_raw(), mib.fragment_id = fragment.to_raw(), "symbol found");
            }
            TraceEvent::InstanceAppended { oid } => {
                tracing::event!($level, snmp.oid = oid, "instance suffix appended");
            }
            TraceEvent::ResolveFailed { input, error } => {
                tracing::event!($level, mib.input = input, error = %error, "resolution failed");
            }
        }
    };
}

/// Forwards core [`TraceEvent`]s to the `tracing` crate.
///
/// The reported level follows whatever `tracing` has enabled, so filtered-out
/// events are never built.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn level(&self) -> TraceLevel {
        if tracing::enabled!(tracing::Level::TRACE) {
            TraceLevel::Trace
        } else if tracing::enabled!(tracing::Level::DEBUG) {
            TraceLevel::Debug
        } else if tracing::enabled!(tracing::Level::INFO) {
            TraceLevel::Info
        } else if tracing::enabled!(tracing::Level::WARN) {
            TraceLevel::Warn
        } else {
            TraceLevel::Error
        }
    }

    fn trace(&mut self, level: TraceLevel, event: TraceEvent<'_>) {
        match level {
            TraceLevel::Error => emit!(tracing::Level::ERROR, event),
            TraceLevel::Warn => emit!(tracing::Level::WARN, event),
            TraceLevel::Info => emit!(tracing::Level::INFO, event),
            TraceLevel::Debug => emit!(tracing::Level::DEBUG, event),
            TraceLevel::Trace => emit!(tracing::Level::TRACE, event),
        }
    }
}
