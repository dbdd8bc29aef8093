//! Failure conditions of a ping sweep
//!
//! Expected packet loss is not an error. Timeouts and corrupted replies are reported as
//! [`EchoOutcome`](crate::exchange::EchoOutcome) variants and only the conditions below ever
//! travel through a `Result`.

use std::io;
use thiserror::Error;

/// Errors raised while setting up or running a sweep
#[derive(Error, Debug)]
pub enum Error {
    /// The destination could not be turned into an IPv4 address
    #[error("unable to resolve host {host}: {reason}")]
    UnresolvableHost { host: String, reason: String },

    /// The process lacks the privileges to open a raw socket
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The raw ICMP endpoint could not be created
    #[error("raw ICMP transport unavailable: {0}")]
    TransportUnavailable(#[source] io::Error),

    /// Sending or receiving failed for a reason other than a timeout
    #[error("transport failure: {0}")]
    TransportFailure(#[source] io::Error),

    /// Inbound bytes do not form an IPv4/ICMP echo message
    #[error("malformed packet: {0}")]
    MalformedPacket(&'static str),

    /// The sweep options are inconsistent
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an `UnresolvableHost` error
    pub fn unresolvable<H: Into<String>, R: ToString>(host: H, reason: R) -> Self {
        Self::UnresolvableHost {
            host: host.into(),
            reason: reason.to_string(),
        }
    }

    /// Classify a failure to open the raw socket
    ///
    /// The operating system reports missing privileges as `PermissionDenied`; everything else
    /// means the platform cannot give us a raw ICMP socket at all.
    pub fn from_open(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::TransportUnavailable(err),
        }
    }

    /// Return `true` if the error ends the whole sweep rather than a single payload size
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::TransportFailure(_) | Self::MalformedPacket(_))
    }
}
