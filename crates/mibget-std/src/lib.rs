//! mibget-std: fragment loading, caching and the GET transaction engine
//!
//! This crate adds everything that touches the outside world to
//! `mibget-core`: fragment files, the symbol-table cache, UDP transports,
//! timers and the `mibget` command line.
//!
//! ```ignore
//! let report = Loader::new(LoaderConfig::default()).load();
//! let params = TransactionParams::new("192.0.2.1").community("public");
//! let mut transport = UdpTransport::for_target(params.resolve_target().await?).await?;
//! let fetched = fetch(&report.table, &Query::Name("sysDescr".into()), &params, &mut transport).await?;
//! println!("{}", fetched.outcome);
//! ```

pub mod cache;
pub mod engine;
pub mod fetch;
pub mod loader;
pub mod logging;
pub mod params;
pub mod transport;

pub use engine::{get, Outcome};
pub use fetch::{fetch, Fetched};
pub use loader::{LoadError, LoadReport, Loader, LoaderConfig};
pub use params::TransactionParams;
pub use transport::{SharedUdpHandle, SharedUdpTransport, Transport, TransportError, UdpTransport};

pub use mibget_core;
