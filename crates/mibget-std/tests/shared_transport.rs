//! Concurrent transactions over one shared socket, against a loopback agent.

use std::net::SocketAddr;
use std::time::Duration;

use mibget_core::model::Oid;
use mibget_core::pdu::{ErrorStatus, Message, Pdu, VarBind, Version};
use mibget_core::value::Value;
use mibget_std::transport::Datagram;
use mibget_std::{get, Outcome, SharedUdpTransport, TransactionParams, Transport};
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Answer every GET with the requested OID bound to its own dotted text.
async fn spawn_echo_agent() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 1500];
        loop {
            let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let Ok(request) = Message::decode(&buf[..len]) else {
                continue;
            };
            let oid = request.pdu.varbinds[0].oid.clone();
            let value = Value::OctetString(oid.to_dotted().into_bytes());
            let reply = Message::new(
                request.version,
                request.community,
                Pdu::response(request.pdu.request_id, ErrorStatus::NoError, 0, vec![VarBind::new(oid, value)]),
            );
            let _ = socket.send_to(&reply.encode().unwrap(), from).await;
        }
    });
    addr
}

fn params(agent: SocketAddr, timeout_ms: u64) -> TransactionParams {
    TransactionParams::new(agent.ip().to_string())
        .port(agent.port())
        .timeout(Duration::from_millis(timeout_ms))
        .retries(0)
}

fn oid(s: &str) -> Oid {
    Oid::parse(s).unwrap()
}

#[tokio::test]
async fn concurrent_transactions_get_their_own_replies() {
    let agent = spawn_echo_agent().await;
    let shared = SharedUdpTransport::bind("127.0.0.1:0").await.unwrap();
    let params = params(agent, 2000);

    let descr = oid("1.3.6.1.2.1.1.1.0");
    let name = oid("1.3.6.1.2.1.1.5.0");
    let mut a = shared.handle();
    let mut b = shared.handle();

    let (first, second) = tokio::join!(get(&mut a, &descr, &params), get(&mut b, &name, &params));

    for (outcome, expected) in [(first, &descr), (second, &name)] {
        match outcome {
            Outcome::Success(vb) => {
                assert_eq!(&vb.oid, expected);
                assert_eq!(vb.value, Value::OctetString(expected.to_dotted().into_bytes()));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    drop(a);
    drop(b);
    assert_eq!(shared.pending(), 0);
}

#[tokio::test]
async fn late_reply_to_dropped_handle_is_discarded() {
    // An agent that never answers on its own; the test replies by hand.
    let agent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let agent_addr = agent.local_addr().unwrap();
    let shared = SharedUdpTransport::bind("127.0.0.1:0").await.unwrap();
    let shared_addr = shared.local_addr().unwrap();

    let mut handle = shared.handle();
    let outcome = get(&mut handle, &oid("1.3.6.1.2.1.1.3.0"), &params(agent_addr, 50)).await;
    assert!(matches!(outcome, Outcome::Timeout { attempts: 1 }), "{outcome:?}");
    assert_eq!(shared.pending(), 1);
    drop(handle);
    assert_eq!(shared.pending(), 0);

    let mut buf = vec![0u8; 1500];
    let (len, _) = agent.recv_from(&mut buf).await.unwrap();
    let request = Message::decode(&buf[..len]).unwrap();
    let late = Message::new(
        Version::V1,
        "public",
        Pdu::response(request.pdu.request_id, ErrorStatus::NoError, 0, Vec::new()),
    );
    agent.send_to(&late.encode().unwrap(), shared_addr).await.unwrap();

    let mut other = shared.handle();
    let received: Result<Result<Datagram, _>, _> =
        timeout(Duration::from_millis(100), other.recv()).await;
    assert!(received.is_err(), "late reply reached an unrelated handle");
}

#[tokio::test]
async fn reused_handle_keeps_only_its_current_request() {
    let agent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let agent_addr = agent.local_addr().unwrap();
    let shared = SharedUdpTransport::bind("127.0.0.1:0").await.unwrap();
    let shared_addr = shared.local_addr().unwrap();
    let params = params(agent_addr, 50);

    let mut handle = shared.handle();
    for _ in 0..3 {
        let outcome = get(&mut handle, &oid("1.3.6.1.2.1.1.3.0"), &params).await;
        assert!(matches!(outcome, Outcome::Timeout { attempts: 1 }), "{outcome:?}");
        assert_eq!(shared.pending(), 1);
    }

    // Answer the first, long abandoned, request.
    let mut buf = vec![0u8; 1500];
    let (len, _) = agent.recv_from(&mut buf).await.unwrap();
    let first = Message::decode(&buf[..len]).unwrap();
    let stale = Message::new(
        Version::V1,
        "public",
        Pdu::response(first.pdu.request_id, ErrorStatus::NoError, 0, Vec::new()),
    );
    agent.send_to(&stale.encode().unwrap(), shared_addr).await.unwrap();

    let received: Result<Result<Datagram, _>, _> =
        timeout(Duration::from_millis(100), handle.recv()).await;
    assert!(received.is_err(), "reply to a retired request was delivered");
}

