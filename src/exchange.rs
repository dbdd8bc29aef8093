//! One ping, just one ping
//!
//! The exchange sends a single echo request over a caller-owned [`Transport`] and waits for the
//! matching reply. Every attempt ends in exactly one [`EchoOutcome`]: packet loss is an outcome,
//! never an error. Only a broken transport surfaces as [`Error::TransportFailure`].

use std::io;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::packet::{self, EchoKind};

/// Payload size used when the caller does not pick one
pub const DEFAULT_PAYLOAD_SIZE: usize = 64;

/// Identifier used when the caller does not pick one
pub const DEFAULT_IDENTIFIER: u16 = 1;

/// Sequence number carried by every request
///
/// Requests are correlated by identifier and payload, so the sequence number stays fixed.
pub const ECHO_SEQUENCE: u16 = 1999;

/// Shortest wait worth handing to a transport
///
/// Raw sockets take their receive timeout in whole microseconds and treat zero as "block
/// forever", so anything shorter counts as an expired deadline.
pub const MIN_WAIT: Duration = Duration::from_micros(1);

/// A datagram handed up by the transport, time-stamped on receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub datagram: Vec<u8>,
    pub at: Instant,
}

/// A raw network endpoint bound to a single destination
///
/// `send` hands an ICMP message to the network and reports how many bytes went out. `recv` blocks
/// for at most `wait` and returns the next inbound IPv4 datagram, or `None` once the wait expired.
pub trait Transport {
    /// Destination every message is sent to
    fn peer(&self) -> Ipv4Addr;

    /// How long an exchange waits for its reply
    fn timeout(&self) -> Duration;

    fn send(&mut self, message: &[u8]) -> io::Result<usize>;

    fn recv(&mut self, wait: Duration) -> io::Result<Option<Arrival>>;
}

/// Why a reply that did arrive was not accepted
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Corruption {
    /// Echo reply for our identifier, but the payload differs
    PayloadMismatch,
    /// Echo reply from the destination carrying someone else's identifier
    ForeignIdentifier,
    /// Inbound bytes did not decode as an IPv4/ICMP echo message
    Malformed,
}

/// Result of a single exchange
///
/// A reply that arrived always carries its elapsed time, whether it was usable or not. A timeout
/// never does.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EchoOutcome {
    Success {
        elapsed: Duration,
        identifier: u16,
    },
    Corrupt {
        elapsed: Duration,
        identifier: Option<u16>,
        cause: Corruption,
    },
    TimedOut,
}

impl EchoOutcome {
    /// Round-trip time, present whenever a reply physically arrived
    pub fn elapsed(&self) -> Option<Duration> {
        match *self {
            Self::Success { elapsed, .. } | Self::Corrupt { elapsed, .. } => Some(elapsed),
            Self::TimedOut => None,
        }
    }

    /// Return `true` if the reply echoed the request's payload exactly
    pub fn payload_matched(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }

    /// Identifier echoed back by the destination
    pub fn reply_identifier(&self) -> Option<u16> {
        match *self {
            Self::Success { identifier, .. } => Some(identifier),
            Self::Corrupt { identifier, .. } => identifier,
            Self::TimedOut => None,
        }
    }

    /// Cause of corruption, if the reply was rejected
    pub fn corruption(&self) -> Option<Corruption> {
        match *self {
            Self::Corrupt { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Perform one blocking request/reply cycle
///
/// A fresh request with `size` random payload bytes is sent to the transport's peer. The exchange
/// then waits up to the transport's timeout for an echo reply from that peer. Datagrams from other
/// hosts and echo requests (our own, looped back) are skipped without extending the wait.
///
/// # Errors
///
/// Returns `TransportFailure` if the transport reports an error or stops accepting bytes while
/// sending. Timeouts and corrupted replies are outcomes, not errors.
pub fn ping_once<T: Transport + ?Sized>(
    transport: &mut T,
    size: usize,
    identifier: u16,
) -> Result<EchoOutcome, Error> {
    let peer = transport.peer();
    let (payload, message) = packet::encode(identifier, ECHO_SEQUENCE, size)?;

    // Stop time and send packet out into the aether
    let start = Instant::now();
    send_all(transport, &message)?;

    let deadline = start + transport.timeout();
    loop {
        let wait = match deadline.checked_duration_since(Instant::now()) {
            Some(wait) if wait >= MIN_WAIT => wait,
            _ => return Ok(EchoOutcome::TimedOut),
        };

        let arrival = match transport
            .recv(wait)
            .map_err(Error::TransportFailure)?
        {
            Some(arrival) => arrival,
            None => return Ok(EchoOutcome::TimedOut),
        };

        // Raw sockets see every ICMP datagram addressed to this host
        if let Some(source) = packet::source_of(&arrival.datagram) {
            if source != peer {
                trace!("Ignoring datagram from {}", source);
                continue;
            }
        }

        let elapsed = arrival.at.saturating_duration_since(start);
        let reply = match packet::decode(&arrival.datagram) {
            Ok(reply) => reply,
            Err(e) => {
                debug!("Unusable reply from {} after {:?}: {}", peer, elapsed, e);
                return Ok(EchoOutcome::Corrupt {
                    elapsed,
                    identifier: None,
                    cause: Corruption::Malformed,
                });
            }
        };

        if reply.kind() == EchoKind::Request {
            trace!("Ignoring echo request id={}", reply.identifier());
            continue;
        }

        let outcome = if reply.identifier() != identifier {
            EchoOutcome::Corrupt {
                elapsed,
                identifier: Some(reply.identifier()),
                cause: Corruption::ForeignIdentifier,
            }
        } else if reply.payload() != &payload[..] {
            EchoOutcome::Corrupt {
                elapsed,
                identifier: Some(reply.identifier()),
                cause: Corruption::PayloadMismatch,
            }
        } else {
            EchoOutcome::Success {
                elapsed,
                identifier: reply.identifier(),
            }
        };
        debug!("{} bytes from {}: {:?}", reply.payload().len(), peer, outcome);

        return Ok(outcome);
    }
}

/// Hand the whole message to the transport, retrying partial writes
fn send_all<T: Transport + ?Sized>(transport: &mut T, message: &[u8]) -> Result<(), Error> {
    let mut sent = 0;
    while sent < message.len() {
        match transport.send(&message[sent..]) {
            Ok(0) => {
                return Err(Error::TransportFailure(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "raw socket stopped accepting data",
                )))
            }
            Ok(n) => sent += n,
            Err(e) => return Err(Error::TransportFailure(e)),
        }
    }
    Ok(())
}
