//! Load and resolution tracing support (feature-gated).
//!
//! Provides structured trace events for debugging which fragment a name came
//! from and how an input was turned into a request OID.
//! Zero overhead when the `tracing` feature is disabled.

pub use crate::model::SkipReason;
use crate::model::{FragmentId, SymbolId};
use crate::resolver::ResolveError;

/// Trace verbosity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    /// Critical errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational messages (fragment boundaries, summary stats).
    Info,
    /// Detailed debugging (shadowing decisions, normalization).
    Debug,
    /// Verbose tracing (every symbol).
    Trace,
}

/// Structured trace events emitted during loading and resolution.
#[derive(Clone, Debug)]
pub enum TraceEvent<'a> {
    // === Load events ===
    /// A fragment is being indexed.
    FragmentStart {
        /// Fragment name.
        fragment: &'a str,
        /// Number of symbol definitions supplied.
        symbols: usize,
    },
    /// A fragment has been indexed.
    FragmentLoaded {
        /// Fragment name.
        fragment: &'a str,
        /// Assigned id (load position).
        fragment_id: FragmentId,
        /// Symbols kept.
        kept: usize,
        /// Symbols dropped.
        skipped: usize,
    },
    /// A symbol was indexed.
    SymbolIndexed {
        /// Symbol name.
        name: &'a str,
        /// Dotted OID.
        oid: &'a str,
        /// Assigned id.
        symbol: SymbolId,
    },
    /// A name was defined again by a later fragment; the earlier one keeps
    /// answering name lookups.
    NameShadowed {
        /// Symbol name.
        name: &'a str,
        /// Fragment whose definition wins.
        kept: FragmentId,
        /// Fragment whose definition is only reachable by OID.
        shadowed: FragmentId,
    },
    /// A symbol was bound to an OID that already carries another symbol.
    OidShared {
        /// Symbol name.
        name: &'a str,
        /// Dotted OID.
        oid: &'a str,
        /// The symbol that stays primary for the OID.
        primary: SymbolId,
    },
    /// A symbol definition was dropped.
    SymbolSkipped {
        /// Fragment name.
        fragment: &'a str,
        /// Symbol name.
        name: &'a str,
        /// Why it was dropped.
        reason: SkipReason,
    },

    // === Resolve events ===
    /// A name lookup found a symbol.
    SymbolFound {
        /// Looked-up name.
        name: &'a str,
        /// Winning symbol.
        symbol: SymbolId,
        /// Its defining fragment.
        fragment: FragmentId,
    },
    /// The scalar instance suffix was appended.
    InstanceAppended {
        /// Dotted OID after normalization.
        oid: &'a str,
    },
    /// Resolution failed.
    ResolveFailed {
        /// Raw input.
        input: &'a str,
        /// Failure.
        error: &'a ResolveError,
    },
}

/// Trait for receiving trace events during loading and resolution.
///
/// The tracer can filter events by returning a minimum trace level
/// from `level()`.
pub trait Tracer {
    /// Returns the minimum trace level to emit.
    ///
    /// Events below this level will not be passed to `trace()`.
    /// Default: `TraceLevel::Info`.
    fn level(&self) -> TraceLevel {
        TraceLevel::Info
    }

    /// Called for each trace event at or above the configured level.
    fn trace(&mut self, level: TraceLevel, event: TraceEvent<'_>);
}

/// A no-op tracer that discards all events.
#[derive(Default, Clone, Copy, Debug)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn level(&self) -> TraceLevel {
        TraceLevel::Error
    }

    fn trace(&mut self, _level: TraceLevel, _event: TraceEvent<'_>) {}
}

/// Emit a trace event if the tracer level permits.
///
/// The level is checked before the event is constructed, so disabled levels
/// cost one comparison.
#[macro_export]
macro_rules! trace_event {
    ($tracer:expr, $level:expr, $event:expr) => {
        if $level <= $tracer.level() {
            $tracer.trace($level, $event);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;

    struct TestTracer {
        events: Vec<(TraceLevel, String)>,
        min_level: TraceLevel,
    }

    impl TestTracer {
        fn new(level: TraceLevel) -> Self {
            Self {
                events: Vec::new(),
                min_level: level,
            }
        }
    }

    impl Tracer for TestTracer {
        fn level(&self) -> TraceLevel {
            self.min_level
        }

        fn trace(&mut self, level: TraceLevel, event: TraceEvent<'_>) {
            self.events.push((level, format!("{event:?}")));
        }
    }

    #[test]
    fn test_trace_level_ordering() {
        assert!(TraceLevel::Error < TraceLevel::Warn);
        assert!(TraceLevel::Warn < TraceLevel::Info);
        assert!(TraceLevel::Info < TraceLevel::Debug);
        assert!(TraceLevel::Debug < TraceLevel::Trace);
    }

    #[test]
    fn test_trace_event_macro_filters_by_level() {
        let mut tracer = TestTracer::new(TraceLevel::Info);

        trace_event!(
            tracer,
            TraceLevel::Info,
            TraceEvent::FragmentStart {
                fragment: "IF-MIB",
                symbols: 3
            }
        );
        assert_eq!(tracer.events.len(), 1);

        trace_event!(
            tracer,
            TraceLevel::Debug,
            TraceEvent::InstanceAppended { oid: "1.3.6.1.2.1.1.1.0" }
        );
        assert_eq!(tracer.events.len(), 1);
    }

    #[test]
    fn test_noop_tracer_filters_everything_but_errors() {
        let mut tracer = NoopTracer;
        assert_eq!(tracer.level(), TraceLevel::Error);
        trace_event!(
            tracer,
            TraceLevel::Warn,
            TraceEvent::InstanceAppended { oid: "1.3" }
        );
    }
}
