//! # Ping sweep
//!
//! This crate measures round-trip latency and packet loss to a remote host across a sweep of ICMP
//! echo payload sizes. It is organised in layers, each handing structured results to the one
//! above:
//! - The `packet` codec builds echo requests and parses inbound IPv4/ICMP datagrams
//! - The `exchange` performs one request/reply cycle over a raw `Transport`
//! - The `sampler` repeats the exchange at one payload size and counts losses
//! - The `sweep` runs the sampler for every configured size and computes summary statistics
//!
//! Everything runs on a single thread with one packet in flight at a time, so that timings are not
//! distorted by competing sends. Each packet is timestamped right before it is handed to the
//! transport and again right after the transport returns the reply.

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

use std::net::IpAddr;
use std::time::Duration;

pub mod cli;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod logger;
pub mod packet;
pub mod privilege;
pub mod report;
pub mod sampler;
pub mod stats;
pub mod sweep;

pub use error::Error;
use report::Layout;

/// Payload sizes swept by default
pub const DEFAULT_SIZES: [usize; 7] = [32, 64, 128, 256, 512, 1024, 1472];

/// Payload sizes swept when large payloads are requested
pub const LARGE_SIZES: [usize; 11] = [
    32, 64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768,
];

/// Sweep configuration
///
/// The single place where sweep options and their defaults live. The `Config` is consumed by the
/// [`Sweep`](sweep::Sweep).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub dest: Dest,
    /// Payload sizes in sweep order
    pub sizes: Vec<usize>,
    /// Pings per payload size
    pub count: usize,
    /// Pause between consecutive pings
    pub pause: Duration,
    /// How long to wait for each reply
    pub timeout: Duration,
    /// Identifier carried by every echo request
    pub identifier: u16,
    /// How the results table is laid out
    pub layout: Layout,
}

impl Config {
    /// Create a configuration with default options for `dest`
    pub fn new(dest: Dest) -> Self {
        Self {
            dest,
            sizes: DEFAULT_SIZES.to_vec(),
            count: 25,
            pause: Duration::from_millis(5),
            timeout: Duration::from_millis(1000),
            identifier: exchange::DEFAULT_IDENTIFIER,
            layout: Layout::default(),
        }
    }

    /// Check the options for consistency
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if no sizes are configured, a size exceeds what fits into one IPv4
    /// datagram, the count is zero or the timeout is shorter than a millisecond.
    pub fn validate(&self) -> Result<(), Error> {
        if self.sizes.is_empty() {
            return Err(Error::InvalidConfig("no payload sizes to sweep".into()));
        }
        if let Some(size) = self.sizes.iter().find(|&&size| size > packet::MAX_PAYLOAD) {
            return Err(Error::InvalidConfig(format!(
                "payload size {} exceeds the maximum of {} bytes",
                size,
                packet::MAX_PAYLOAD
            )));
        }
        if self.count == 0 {
            return Err(Error::InvalidConfig("ping count must be at least 1".into()));
        }
        if self.timeout < Duration::from_millis(1) {
            return Err(Error::InvalidConfig("timeout must be at least 1 ms".into()));
        }
        Ok(())
    }
}

/// Destination for ping
///
/// The user can choose to either provide an IP-address or a host name as destination for the ping.
/// The application automatically then handles dns lookup or reverse dns lookup based on the
/// provided argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dest {
    Ip(IpAddr),
    Host(String),
}

impl Dest {
    /// Interpret user input as an address literal, or else as a host name
    pub fn parse(input: &str) -> Self {
        match input.parse::<IpAddr>() {
            Ok(ip) => Self::Ip(ip),

            // If the input provided is not a valid destination, it will fail during dns resolution
            Err(_) => Self::Host(input.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn default_config_is_valid() {
        let config = Config::new(Dest::parse("192.168.1.254"));
        assert_eq!(config.dest, Dest::Ip(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 254))));
        assert_eq!(config.sizes, DEFAULT_SIZES.to_vec());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn destinations() {
        assert_eq!(Dest::parse("::1"), Dest::Ip("::1".parse().unwrap()));
        assert_eq!(Dest::parse("example.com"), Dest::Host("example.com".into()));
    }

    #[test]
    fn validation() {
        let base = Config::new(Dest::parse("127.0.0.1"));

        let mut config = base.clone();
        config.sizes.clear();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = base.clone();
        config.sizes = vec![16, packet::MAX_PAYLOAD + 1];
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = base.clone();
        config.timeout = Duration::from_secs(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = base.clone();
        config.timeout = Duration::from_nanos(1);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = base.clone();
        config.timeout = Duration::from_millis(1);
        assert!(config.validate().is_ok());

        let mut config = base;
        config.sizes = vec![0, packet::MAX_PAYLOAD];
        config.pause = Duration::from_secs(0);
        assert!(config.validate().is_ok());
    }
}
