//! Per-transaction parameters.

use crate::transport::TransportError;
use mibget_core::pdu::Version;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Default agent port.
pub const DEFAULT_PORT: u16 = 161;

/// Everything one GET transaction needs besides the OID and a transport.
///
/// Built once by the caller and passed by reference; nothing is read from
/// global state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionParams {
    /// Agent host name or IP literal.
    pub host: String,
    /// Agent UDP port.
    pub port: u16,
    /// Community string.
    pub community: Vec<u8>,
    /// Protocol version.
    pub version: Version,
    /// How long to wait for a reply to each send.
    pub timeout: Duration,
    /// Resends after the first send; total sends are `retries + 1`.
    pub retries: u32,
}

impl Default for TransactionParams {
    fn default() -> Self {
        Self {
            host: String::from("localhost"),
            port: DEFAULT_PORT,
            community: b"public".to_vec(),
            version: Version::V1,
            timeout: Duration::from_secs(1),
            retries: 2,
        }
    }
}

impl TransactionParams {
    /// Parameters for `host` with all other fields at their defaults.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Set the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the community string.
    #[must_use]
    pub fn community(mut self, community: impl Into<Vec<u8>>) -> Self {
        self.community = community.into();
        self
    }

    /// Set the protocol version.
    #[must_use]
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry count.
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Total number of sends the engine may make.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Resolve host and port to a socket address.
    ///
    /// IP literals are used directly; names go through the system resolver
    /// and the first address wins.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unresolved`] if the name has no address.
    pub async fn resolve_target(&self) -> Result<SocketAddr, TransportError> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }

        let unresolved = || TransportError::Unresolved {
            target: format!("{}:{}", self.host, self.port),
        };
        let mut addrs = tokio::net::lookup_host((host, self.port))
            .await
            .map_err(|_| unresolved())?;
        addrs.next().ok_or_else(unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = TransactionParams::default();
        assert_eq!(params.host, "localhost");
        assert_eq!(params.port, 161);
        assert_eq!(params.community, b"public");
        assert_eq!(params.version, Version::V1);
        assert_eq!(params.timeout, Duration::from_secs(1));
        assert_eq!(params.max_attempts(), 3);
    }

    #[test]
    fn test_builder() {
        let params = TransactionParams::new("10.0.0.1")
            .port(1161)
            .community("private")
            .version(Version::V2c)
            .timeout(Duration::from_millis(250))
            .retries(0);
        assert_eq!(params.port, 1161);
        assert_eq!(params.community, b"private");
        assert_eq!(params.max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_resolve_ip_literals() {
        let v4 = TransactionParams::new("127.0.0.1").port(1161);
        assert_eq!(v4.resolve_target().await.unwrap(), "127.0.0.1:1161".parse().unwrap());

        let v6 = TransactionParams::new("[::1]");
        assert_eq!(v6.resolve_target().await.unwrap(), "[::1]:161".parse().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_failure() {
        let params = TransactionParams::new("no-such-host.invalid");
        assert!(matches!(
            params.resolve_target().await,
            Err(TransportError::Unresolved { .. })
        ));
    }
}
