//! Datagram transports.
//!
//! The engine talks to a [`Transport`]: something that hands out request ids,
//! sends a datagram and yields received datagrams. Two UDP implementations:
//!
//! - [`UdpTransport`]: one socket, one transaction at a time. Built with
//!   [`UdpTransport::for_target`] the socket is connected, so an agent that
//!   refuses the datagram (ICMP port unreachable) fails the transaction
//!   instead of letting it time out.
//! - [`SharedUdpTransport`]: one socket shared by many concurrent
//!   transactions. A router task reads every datagram, peeks its request id
//!   and forwards it to the [`SharedUdpHandle`] that sent that id. Replies for
//!   ids nobody is waiting on are dropped.

use mibget_core::ber::EncodeError;
use mibget_core::pdu::peek_request_id;
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Largest datagram we accept.
const MAX_DATAGRAM: usize = 65_535;

/// Queue depth per shared handle.
const HANDLE_QUEUE: usize = 16;

/// Transport failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Socket error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Host name did not resolve.
    #[error("could not resolve {target}")]
    Unresolved {
        /// `host:port` as given.
        target: String,
    },
    /// The request could not be encoded.
    #[error("cannot encode request: {0}")]
    Encode(#[from] EncodeError),
    /// The shared socket's router has stopped.
    #[error("transport closed")]
    Closed,
}

/// A datagram and its sender.
pub type Datagram = (Vec<u8>, SocketAddr);

/// What the transaction engine needs from the network.
pub trait Transport: Send {
    /// A request id not used by any recent transaction on this transport.
    fn next_request_id(&self) -> i32;

    /// Send one datagram to `target`.
    fn send(
        &mut self,
        datagram: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Wait for the next datagram.
    fn recv(&mut self) -> impl Future<Output = Result<Datagram, TransportError>> + Send;
}

/// Monotonic request-id counter.
///
/// Ids stay positive: after `i32::MAX` the counter wraps to 1.
#[derive(Debug)]
pub struct RequestIds {
    next: AtomicI32,
}

impl RequestIds {
    /// Start at a clock-derived value so consecutive runs do not reuse ids.
    #[must_use]
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let seed = (nanos ^ std::process::id().rotate_left(16)) & 0x3FFF_FFFF;
        Self::starting_at(seed as i32)
    }

    /// Start at a fixed id; non-positive values start at 1.
    #[must_use]
    pub fn starting_at(first: i32) -> Self {
        Self {
            next: AtomicI32::new(first.max(1)),
        }
    }

    /// Take the next id.
    pub fn next_id(&self) -> i32 {
        let result = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                Some(if id == i32::MAX { 1 } else { id + 1 })
            });
        // The closure always returns Some, so both arms carry the old value.
        match result {
            Ok(id) | Err(id) => id,
        }
    }
}

impl Default for RequestIds {
    fn default() -> Self {
        Self::new()
    }
}

fn unspecified_for(target: SocketAddr) -> SocketAddr {
    if target.is_ipv6() {
        SocketAddr::from(([0u16; 8], 0))
    } else {
        SocketAddr::from(([0u8; 4], 0))
    }
}

/// A UDP socket used by one transaction at a time.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
    ids: RequestIds,
}

impl UdpTransport {
    /// Bind to a local address.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the socket cannot be bound.
    pub async fn bind(local: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local).await?;
        Ok(Self {
            socket,
            peer: None,
            ids: RequestIds::new(),
        })
    }

    /// Bind an ephemeral port of the same address family as `target` and
    /// connect it there.
    ///
    /// Only datagrams from `target` are received. A refused or unreachable
    /// agent surfaces as [`TransportError::Io`] from `send` or `recv`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the socket cannot be bound or
    /// connected.
    pub async fn for_target(target: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(unspecified_for(target)).await?;
        socket.connect(target).await?;
        Ok(Self {
            socket,
            peer: Some(target),
            ids: RequestIds::new(),
        })
    }

    /// The bound local address.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the OS cannot report it.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn next_request_id(&self) -> i32 {
        self.ids.next_id()
    }

    async fn send(&mut self, datagram: &[u8], target: SocketAddr) -> Result<(), TransportError> {
        match self.peer {
            Some(peer) if peer == target => self.socket.send(datagram).await?,
            _ => self.socket.send_to(datagram, target).await?,
        };
        Ok(())
    }

    async fn recv(&mut self) -> Result<Datagram, TransportError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, from) = match self.peer {
            Some(peer) => (self.socket.recv(&mut buf).await?, peer),
            None => self.socket.recv_from(&mut buf).await?,
        };
        buf.truncate(len);
        Ok((buf, from))
    }
}

type Routes = HashMap<i32, mpsc::Sender<Datagram>>;

#[derive(Debug)]
struct Shared {
    socket: UdpSocket,
    routes: Mutex<Routes>,
    ids: RequestIds,
}

impl Shared {
    fn routes(&self) -> std::sync::MutexGuard<'_, Routes> {
        // The map stays consistent even if a holder panicked.
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A UDP socket shared by concurrent transactions.
///
/// Dropping the transport stops the router; outstanding handles then get
/// [`TransportError::Closed`] from `recv`. The router also stops on a socket
/// error other than a stray ICMP report.
#[derive(Debug)]
pub struct SharedUdpTransport {
    shared: Arc<Shared>,
    router: JoinHandle<()>,
    closed: watch::Receiver<bool>,
}

impl SharedUdpTransport {
    /// Bind to a local address and start the router task.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the socket cannot be bound.
    pub async fn bind(local: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local).await?;
        let shared = Arc::new(Shared {
            socket,
            routes: Mutex::new(HashMap::new()),
            ids: RequestIds::new(),
        });
        let (closed_tx, closed) = watch::channel(false);
        let router = tokio::spawn(route(Arc::clone(&shared), closed_tx));
        Ok(Self {
            shared,
            router,
            closed,
        })
    }

    /// The bound local address.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the OS cannot report it.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.shared.socket.local_addr()?)
    }

    /// A handle for one transaction at a time.
    ///
    /// A handle may be reused; sending a new request id retires the previous
    /// one.
    #[must_use]
    pub fn handle(&self) -> SharedUdpHandle {
        let (tx, rx) = mpsc::channel(HANDLE_QUEUE);
        SharedUdpHandle {
            shared: Arc::clone(&self.shared),
            tx,
            rx,
            closed: self.closed.clone(),
            registered: None,
        }
    }

    /// Number of request ids currently routed to a live handle.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.routes().len()
    }
}

impl Drop for SharedUdpTransport {
    fn drop(&mut self) {
        self.router.abort();
    }
}

/// Errors a datagram socket reports for one peer without being broken.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused | io::ErrorKind::Interrupted
    )
}

async fn route(shared: Arc<Shared>, closed: watch::Sender<bool>) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, from) = match shared.socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) if is_transient(&e) => {
                tracing::debug!(error = %e, "shared socket receive failed");
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, "shared socket failed, stopping router");
                break;
            }
        };
        let datagram = &buf[..len];

        let request_id = match peek_request_id(datagram) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(snmp.source = %from, error = %e, "dropping undecodable datagram");
                continue;
            }
        };

        let sender = shared.routes().get(&request_id).cloned();
        match sender {
            Some(tx) => {
                if tx.try_send((datagram.to_vec(), from)).is_err() {
                    tracing::debug!(snmp.request_id = request_id, "handle queue full or closed, dropping");
                }
            }
            None => {
                tracing::debug!(
                    snmp.source = %from,
                    snmp.request_id = request_id,
                    "no transaction waiting for response"
                );
            }
        }
    }
    shared.routes().clear();
    closed.send_replace(true);
}

/// One transaction's view of a [`SharedUdpTransport`].
///
/// The request id the handle last sent is routed back to it. Sending a new
/// id retires the old one and discards its queued replies; dropping the
/// handle retires the current one, so late replies reach nobody.
#[derive(Debug)]
pub struct SharedUdpHandle {
    shared: Arc<Shared>,
    tx: mpsc::Sender<Datagram>,
    rx: mpsc::Receiver<Datagram>,
    closed: watch::Receiver<bool>,
    registered: Option<i32>,
}

impl SharedUdpHandle {
    fn router_stopped(&self) -> bool {
        let closed = *self.closed.borrow();
        closed || self.closed.has_changed().is_err()
    }

    fn register(&mut self, id: i32) {
        if self.registered == Some(id) {
            return;
        }
        {
            let mut routes = self.shared.routes();
            if let Some(previous) = self.registered.replace(id) {
                routes.remove(&previous);
            }
            routes.insert(id, self.tx.clone());
        }
        while self.rx.try_recv().is_ok() {}
    }
}

impl Transport for SharedUdpHandle {
    fn next_request_id(&self) -> i32 {
        self.shared.ids.next_id()
    }

    async fn send(&mut self, datagram: &[u8], target: SocketAddr) -> Result<(), TransportError> {
        if self.router_stopped() {
            return Err(TransportError::Closed);
        }
        // Register before sending so a fast reply cannot beat the route.
        if let Ok(id) = peek_request_id(datagram) {
            self.register(id);
        }
        self.shared.socket.send_to(datagram, target).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Datagram, TransportError> {
        tokio::select! {
            biased;
            datagram = self.rx.recv() => datagram.ok_or(TransportError::Closed),
            () = wait_closed(&mut self.closed) => Err(TransportError::Closed),
        }
    }
}

/// Resolves once the router has stopped or been dropped.
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    loop {
        let stopped = *closed.borrow_and_update();
        if stopped || closed.changed().await.is_err() {
            return;
        }
    }
}

impl Drop for SharedUdpHandle {
    fn drop(&mut self) {
        if let Some(id) = self.registered {
            self.shared.routes().remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_increase() {
        let ids = RequestIds::starting_at(41);
        assert_eq!(ids.next_id(), 41);
        assert_eq!(ids.next_id(), 42);
    }

    #[test]
    fn test_request_ids_wrap_positive() {
        let ids = RequestIds::starting_at(i32::MAX);
        assert_eq!(ids.next_id(), i32::MAX);
        assert_eq!(ids.next_id(), 1);

        let ids = RequestIds::starting_at(-5);
        assert_eq!(ids.next_id(), 1);
    }

    #[test]
    fn test_seeded_ids_are_positive() {
        let ids = RequestIds::new();
        assert!(ids.next_id() > 0);
    }

    #[tokio::test]
    async fn test_udp_transport_loopback() {
        let mut a = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let mut b = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let b_addr = b.local_addr().unwrap();

        a.send(b"ping", b_addr).await.unwrap();
        let (bytes, from) = b.recv().await.unwrap();
        assert_eq!(bytes, b"ping");
        assert_eq!(from, a.local_addr().unwrap());
    }

    #[test]
    fn test_icmp_reports_are_transient() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert!(is_transient(&refused));
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert!(is_transient(&reset));
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(!is_transient(&denied));
    }

    #[tokio::test]
    async fn test_connected_transport_reports_refusal() {
        let closed = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = closed.local_addr().unwrap();
        drop(closed);

        let mut transport = UdpTransport::for_target(target).await.unwrap();
        transport.send(b"ping", target).await.unwrap();
        let err = tokio::time::timeout(std::time::Duration::from_secs(2), transport.recv())
            .await
            .expect("refusal arrives before the deadline")
            .unwrap_err();
        match err {
            TransportError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionRefused),
            other => panic!("expected I/O error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropping_shared_transport_closes_handles() {
        let shared = SharedUdpTransport::bind("127.0.0.1:0").await.unwrap();
        let mut handle = shared.handle();
        drop(shared);

        let received = tokio::time::timeout(std::time::Duration::from_secs(2), handle.recv())
            .await
            .expect("handle notices the router stopping");
        assert!(matches!(received, Err(TransportError::Closed)));

        let target = SocketAddr::from(([127, 0, 0, 1], 9));
        assert!(matches!(
            handle.send(b"ping", target).await,
            Err(TransportError::Closed)
        ));
    }
}
