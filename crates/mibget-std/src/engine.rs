//! The GET transaction engine.
//!
//! One call to [`get`] performs one transaction:
//!
//! ```text
//! Built ──send──▶ AwaitingResponse ──matching reply──▶ Success / ProtocolError
//!                   │        ▲
//!                   │ timeout, retries left: resend same datagram
//!                   │
//!                   ├─ timeout, no retries left ──▶ Timeout
//!                   └─ transport failure ─────────▶ TransportError
//! ```
//!
//! Replies whose request id does not match, that fail to decode, or that are
//! not Response PDUs are discarded without restarting the timer. The engine
//! keeps no state between calls; dropping the returned future cancels the
//! transaction and its timer.

use crate::params::TransactionParams;
use crate::transport::{Transport, TransportError};
use mibget_core::model::Oid;
use mibget_core::pdu::{ErrorStatus, Message, Pdu, PduType, VarBind};
use std::fmt;
use std::net::SocketAddr;
use tokio::time::{timeout_at, Instant};

/// The result of one transaction.
#[derive(Debug)]
pub enum Outcome {
    /// The agent answered with noError.
    Success(VarBind),
    /// The agent answered with an error status.
    ProtocolError {
        /// Decoded error status.
        status: ErrorStatus,
        /// 1-based index of the offending binding (0 if none).
        index: i32,
        /// Status description.
        text: String,
    },
    /// No matching reply after every attempt.
    Timeout {
        /// Sends made.
        attempts: u32,
    },
    /// The transport failed or the request could not be put on the wire.
    TransportError(TransportError),
}

impl Outcome {
    /// Check for [`Outcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The fetched binding, if successful.
    #[must_use]
    pub fn varbind(&self) -> Option<&VarBind> {
        match self {
            Self::Success(vb) => Some(vb),
            _ => None,
        }
    }

    fn protocol_error(status: ErrorStatus, index: i32) -> Self {
        Self::ProtocolError {
            status,
            index,
            text: status.to_string(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(vb) => write!(f, "{vb}"),
            Self::ProtocolError {
                status,
                index,
                text,
            } => write!(f, "agent returned {text} (status {}) at index {index}", status.code()),
            Self::Timeout { attempts } => {
                write!(f, "no response after {attempts} attempt(s)")
            }
            Self::TransportError(e) => write!(f, "transport error: {e}"),
        }
    }
}

/// What to do with one received datagram.
enum Reply {
    Discard(&'static str),
    Done(Outcome),
}

fn classify(datagram: &[u8], request_id: i32) -> Reply {
    let message = match Message::decode(datagram) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "undecodable datagram");
            return Reply::Discard("undecodable");
        }
    };
    let pdu = message.pdu;
    if pdu.pdu_type != PduType::Response {
        return Reply::Discard("not a response");
    }
    if pdu.request_id != request_id {
        tracing::debug!(
            snmp.request_id = request_id,
            snmp.received_id = pdu.request_id,
            "stale response"
        );
        return Reply::Discard("request id mismatch");
    }

    let status = pdu.status();
    if !status.is_ok() {
        return Reply::Done(Outcome::protocol_error(status, pdu.error_index));
    }
    match pdu.varbinds.into_iter().next() {
        Some(vb) => Reply::Done(Outcome::Success(vb)),
        None => Reply::Discard("noError response without bindings"),
    }
}

/// Run one GET transaction for `oid`.
///
/// The OID is sent as given; scalar normalization is the resolver's job.
/// Retries happen only on timeout and reuse the original request id.
pub async fn get<T: Transport>(transport: &mut T, oid: &Oid, params: &TransactionParams) -> Outcome {
    let target = match params.resolve_target().await {
        Ok(target) => target,
        Err(e) => return Outcome::TransportError(e),
    };
    get_at(transport, oid, params, target).await
}

/// Like [`get`], with the target address already resolved.
pub async fn get_at<T: Transport>(
    transport: &mut T,
    oid: &Oid,
    params: &TransactionParams,
    target: SocketAddr,
) -> Outcome {
    let request_id = transport.next_request_id();
    let request = Message::new(
        params.version,
        params.community.clone(),
        Pdu::get_request(request_id, oid.clone()),
    );
    let datagram = match request.encode() {
        Ok(bytes) => bytes,
        Err(e) => return Outcome::TransportError(e.into()),
    };

    let attempts = params.max_attempts();
    for attempt in 1..=attempts {
        tracing::debug!(
            snmp.target = %target,
            snmp.request_id = request_id,
            snmp.oid = %oid,
            snmp.attempt = attempt,
            "sending GET"
        );
        if let Err(e) = transport.send(&datagram, target).await {
            return Outcome::TransportError(e);
        }

        let deadline = Instant::now() + params.timeout;
        loop {
            let received = match timeout_at(deadline, transport.recv()).await {
                Ok(Ok(received)) => received,
                Ok(Err(e)) => return Outcome::TransportError(e),
                Err(_elapsed) => break,
            };
            match classify(&received.0, request_id) {
                Reply::Done(outcome) => {
                    tracing::debug!(
                        snmp.source = %received.1,
                        snmp.request_id = request_id,
                        snmp.attempt = attempt,
                        "transaction complete"
                    );
                    return outcome;
                }
                Reply::Discard(reason) => {
                    tracing::debug!(snmp.source = %received.1, reason, "discarding datagram");
                }
            }
        }

        if attempt < attempts {
            tracing::debug!(snmp.request_id = request_id, snmp.attempt = attempt, "timeout, retrying");
        }
    }

    tracing::warn!(snmp.target = %target, snmp.request_id = request_id, attempts, "request timed out");
    Outcome::Timeout { attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mibget_core::value::Value;

    fn response(request_id: i32, status: ErrorStatus, index: i32, varbinds: Vec<VarBind>) -> Vec<u8> {
        Message::new(
            mibget_core::pdu::Version::V1,
            "public",
            Pdu::response(request_id, status, index, varbinds),
        )
        .encode()
        .unwrap()
    }

    fn sys_descr() -> Oid {
        Oid::parse("1.3.6.1.2.1.1.1.0").unwrap()
    }

    #[test]
    fn test_classify_success() {
        let vb = VarBind::new(sys_descr(), Value::OctetString(b"router".to_vec()));
        match classify(&response(7, ErrorStatus::NoError, 0, vec![vb.clone()]), 7) {
            Reply::Done(Outcome::Success(got)) => assert_eq!(got, vb),
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn test_classify_protocol_error() {
        let vb = VarBind::null(sys_descr());
        match classify(&response(7, ErrorStatus::NoSuchName, 1, vec![vb]), 7) {
            Reply::Done(Outcome::ProtocolError {
                status,
                index,
                text,
            }) => {
                assert_eq!(status, ErrorStatus::NoSuchName);
                assert_eq!(index, 1);
                assert_eq!(text, "noSuchName");
            }
            _ => panic!("expected protocol error"),
        }
    }

    #[test]
    fn test_classify_discards() {
        assert!(matches!(classify(b"junk", 7), Reply::Discard(_)));
        assert!(matches!(
            classify(&response(8, ErrorStatus::NoError, 0, vec![VarBind::null(sys_descr())]), 7),
            Reply::Discard(_)
        ));
        assert!(matches!(
            classify(&response(7, ErrorStatus::NoError, 0, Vec::new()), 7),
            Reply::Discard(_)
        ));

        let request = Message::new(
            mibget_core::pdu::Version::V1,
            "public",
            Pdu::get_request(7, sys_descr()),
        )
        .encode()
        .unwrap();
        assert!(matches!(classify(&request, 7), Reply::Discard(_)));
    }

    #[test]
    fn test_outcome_display() {
        let outcome = Outcome::protocol_error(ErrorStatus::TooBig, 1);
        assert_eq!(outcome.to_string(), "agent returned tooBig (status 1) at index 1");
        assert_eq!(
            Outcome::Timeout { attempts: 3 }.to_string(),
            "no response after 3 attempt(s)"
        );
    }
}
