use pnet::packet::{icmp::IcmpPacket, ip::IpNextHeaderProtocols, Packet};
use pnet::transport::{TransportReceiver, TransportSender};
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::exchange::{Arrival, Transport, MIN_WAIT};
use crate::Dest;

/// Receive buffer, large enough for any reassembled IPv4 datagram
const RECV_BUFFER: usize = 1 << 16;

/// A resolved ping destination
///
/// Keeps the name the user asked for, or the reverse lookup of the address they gave, for display
/// purposes. The address is what the rest of the sweep works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    addr: Ipv4Addr,
}

impl Target {
    pub fn new<H: Into<String>>(host: H, addr: Ipv4Addr) -> Self {
        Self {
            host: host.into(),
            addr,
        }
    }

    /// Resolve a destination to an IPv4 address
    ///
    /// Host names are looked up and the first IPv4 address wins. Literal addresses are reverse
    /// resolved for display only; a failing reverse lookup falls back to the literal.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvableHost` if the name does not resolve, resolves to IPv6 only, or if an
    /// IPv6 literal was given.
    pub fn resolve(dest: &Dest) -> Result<Self, Error> {
        // These functions are not used anywhere else in the application
        use dns_lookup::{lookup_addr, lookup_host};

        match dest {
            Dest::Ip(IpAddr::V4(addr)) => {
                let host = lookup_addr(&IpAddr::V4(*addr)).unwrap_or_else(|e| {
                    debug!("Reverse lookup of {} failed: {}", addr, e);
                    addr.to_string()
                });

                info!("Resolved IP {} to host {}", addr, host);

                Ok(Self::new(host, *addr))
            }
            Dest::Ip(IpAddr::V6(addr)) => Err(Error::unresolvable(
                addr.to_string(),
                "ICMP echo over IPv6 is not supported",
            )),
            Dest::Host(host) => {
                let addrs = lookup_host(host).map_err(|e| Error::unresolvable(host.as_str(), e))?;
                let addr = addrs
                    .into_iter()
                    .find_map(|addr| match addr {
                        IpAddr::V4(v4) => Some(v4),
                        IpAddr::V6(_) => None,
                    })
                    .ok_or_else(|| Error::unresolvable(host.as_str(), "no IPv4 address"))?;

                info!("Resolved host {} to IP {}", host, addr);

                Ok(Self::new(host.as_str(), addr))
            }
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }
}

/// Raw ICMP endpoint for a single destination
///
/// Outgoing messages travel over a layer 4 channel, so the kernel writes the IPv4 header and
/// fragments large payloads. Replies are read from a second, layer 3 channel which hands out whole
/// IPv4 datagrams including their header.
///
/// Both sockets are closed when the endpoint is dropped.
pub struct RawEndpoint {
    peer: Ipv4Addr,
    timeout: Duration,
    tx: TransportSender,
    rx: TransportReceiver,
}

impl RawEndpoint {
    /// Open new raw channels to `peer`
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if the process may not open raw sockets and
    /// `TransportUnavailable` for any other failure reported by the operating system.
    pub fn open(peer: Ipv4Addr, timeout: Duration) -> Result<Self, Error> {
        use pnet::transport::{self, TransportChannelType::*, TransportProtocol::*};

        trace!("Opening raw ICMP channels to {}", peer);

        let (tx, _) = transport::transport_channel(RECV_BUFFER, Layer4(Ipv4(IpNextHeaderProtocols::Icmp)))
            .map_err(Error::from_open)?;
        let (_, rx) = transport::transport_channel(RECV_BUFFER, Layer3(IpNextHeaderProtocols::Icmp))
            .map_err(Error::from_open)?;

        Ok(Self {
            peer,
            timeout,
            tx,
            rx,
        })
    }
}

impl Transport for RawEndpoint {
    fn peer(&self) -> Ipv4Addr {
        self.peer
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn send(&mut self, message: &[u8]) -> io::Result<usize> {
        let packet = IcmpPacket::new(message)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "truncated ICMP message"))?;
        self.tx.send_to(packet, IpAddr::V4(self.peer))
    }

    fn recv(&mut self, wait: Duration) -> io::Result<Option<Arrival>> {
        use pnet::transport::ipv4_packet_iter;

        let mut incoming = ipv4_packet_iter(&mut self.rx);
        match incoming.next_with_timeout(socket_wait(wait))? {
            // Timestamp before anything else
            Some((packet, _)) => {
                let at = Instant::now();
                Ok(Some(Arrival {
                    datagram: packet.packet().to_vec(),
                    at,
                }))
            }
            None => Ok(None),
        }
    }
}

/// Receive timeout handed to the socket
///
/// The socket counts in whole microseconds, and a zero timeout would block without bound.
fn socket_wait(wait: Duration) -> Duration {
    wait.max(MIN_WAIT)
}

impl Drop for RawEndpoint {
    fn drop(&mut self) {
        trace!("Closing raw ICMP channels to {}", self.peer);
    }
}
