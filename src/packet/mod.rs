use pnet::packet::{
    icmp::{checksum, echo_reply::EchoReplyPacket, echo_request::EchoRequestPacket, IcmpPacket, IcmpTypes},
    ip::IpNextHeaderProtocols,
    ipv4::Ipv4Packet,
    Packet,
};
use std::net::Ipv4Addr;

use crate::error::Error;
pub use request::EchoRequest;

mod request;

/// Length of the ICMP echo header: type, code, checksum, identifier and sequence number
pub const ICMP_HEADER_LEN: usize = 8;

/// Largest payload an echo message can carry inside a single IPv4 datagram
pub const MAX_PAYLOAD: usize = 65_535 - 20 - ICMP_HEADER_LEN;

/// Build a fresh echo request
///
/// Returns the random payload, for comparison against the reply, together with the encoded ICMP
/// message ready to be handed to the transport.
pub fn encode(identifier: u16, sequence: u16, size: usize) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let request = EchoRequest::new(identifier, sequence, size);
    let wire = request.to_bytes()?;
    Ok((request.payload().to_vec(), wire))
}

/// Direction of an echo message
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EchoKind {
    Request,
    Reply,
}

/// An echo message after receipt
///
/// Retains only what is needed to correlate the message with the request that caused it: the
/// sender, the direction, the identifier, the sequence number and the payload. The checksum is
/// verified while decoding and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoMessage {
    source: Ipv4Addr,
    kind: EchoKind,
    identifier: u16,
    sequence: u16,
    payload: Vec<u8>,
}

impl EchoMessage {
    /// Get the IPv4 address the message came from
    pub fn source(&self) -> Ipv4Addr {
        self.source
    }

    /// Get whether this is an echo request or an echo reply
    pub fn kind(&self) -> EchoKind {
        self.kind
    }

    /// Get the identifier of the message
    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Get the sequence number of the message
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Get the echoed payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Parse an inbound IPv4 datagram carrying an ICMP echo message
///
/// # Errors
///
/// Returns `MalformedPacket` if the bytes are not an IPv4 datagram, if the datagram does not carry
/// ICMP, if the ICMP message is not an echo request or reply, or if its checksum does not verify.
pub fn decode(datagram: &[u8]) -> Result<EchoMessage, Error> {
    let ip = Ipv4Packet::new(datagram).ok_or(Error::MalformedPacket("truncated IPv4 header"))?;
    if ip.get_version() != 4 {
        return Err(Error::MalformedPacket("not an IPv4 datagram"));
    }

    let header_len = usize::from(ip.get_header_length()) * 4;
    if header_len < 20 || header_len > datagram.len() {
        return Err(Error::MalformedPacket("invalid IPv4 header length"));
    }
    if ip.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
        return Err(Error::MalformedPacket("not an ICMP datagram"));
    }

    // Some stacks hand out the total length in host order or without the header; fall back to
    // the received length when it does not add up.
    let total_len = usize::from(ip.get_total_length());
    let end = if total_len >= header_len && total_len <= datagram.len() {
        total_len
    } else {
        datagram.len()
    };

    decode_icmp(ip.get_source(), &datagram[header_len..end])
}

/// Peek at the IPv4 source address without validating the rest of the datagram
pub fn source_of(datagram: &[u8]) -> Option<Ipv4Addr> {
    Ipv4Packet::new(datagram)
        .filter(|ip| ip.get_version() == 4)
        .map(|ip| ip.get_source())
}

fn decode_icmp(source: Ipv4Addr, message: &[u8]) -> Result<EchoMessage, Error> {
    let icmp = IcmpPacket::new(message).ok_or(Error::MalformedPacket("truncated ICMP header"))?;
    if checksum(&icmp) != icmp.get_checksum() {
        return Err(Error::MalformedPacket("ICMP checksum mismatch"));
    }

    let truncated = Error::MalformedPacket("truncated echo header");
    let (kind, identifier, sequence, payload) = match icmp.get_icmp_type() {
        IcmpTypes::EchoReply => {
            let echo = EchoReplyPacket::new(message).ok_or(truncated)?;
            (
                EchoKind::Reply,
                echo.get_identifier(),
                echo.get_sequence_number(),
                echo.payload().to_vec(),
            )
        }
        IcmpTypes::EchoRequest => {
            let echo = EchoRequestPacket::new(message).ok_or(truncated)?;
            (
                EchoKind::Request,
                echo.get_identifier(),
                echo.get_sequence_number(),
                echo.payload().to_vec(),
            )
        }
        _ => return Err(Error::MalformedPacket("not an ICMP echo message")),
    };

    Ok(EchoMessage {
        source,
        kind,
        identifier,
        sequence,
        payload,
    })
}

/// Wrap an ICMP message into a minimal IPv4 datagram, as the kernel hands it to a raw socket
#[cfg(test)]
pub(crate) fn wrap_ipv4(source: Ipv4Addr, message: &[u8]) -> Vec<u8> {
    use pnet::packet::ipv4::MutableIpv4Packet;

    let mut buffer = vec![0u8; 20 + message.len()];
    let mut ip = MutableIpv4Packet::new(&mut buffer).unwrap();
    ip.set_version(4);
    ip.set_header_length(5);
    ip.set_total_length((20 + message.len()) as u16);
    ip.set_ttl(64);
    ip.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
    ip.set_source(source);
    ip.set_destination(Ipv4Addr::new(127, 0, 0, 1));
    ip.set_payload(message);
    buffer
}

/// Rewrite an encoded echo request into the reply a well-behaved host would send back
#[cfg(test)]
pub(crate) fn as_reply(request: &[u8]) -> Vec<u8> {
    use pnet::packet::icmp::MutableIcmpPacket;

    let mut reply = request.to_vec();
    let mut icmp = MutableIcmpPacket::new(&mut reply).unwrap();
    icmp.set_icmp_type(IcmpTypes::EchoReply);
    icmp.set_checksum(0);
    let sum = checksum(&icmp.to_immutable());
    icmp.set_checksum(sum);
    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEER: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 254);

    #[test]
    fn encode_returns_payload_and_message() {
        let (payload, wire) = encode(1, 1999, 64).unwrap();
        assert_eq!(payload.len(), 64);
        assert_eq!(wire.len(), 64 + ICMP_HEADER_LEN);
        assert_eq!(&wire[ICMP_HEADER_LEN..], &payload[..]);
    }

    #[test]
    fn decode_wrapped_request() {
        let (payload, wire) = encode(42, 1999, 16).unwrap();
        let message = decode(&wrap_ipv4(PEER, &wire)).expect("Failed decoding echo request");

        assert_eq!(message.kind(), EchoKind::Request);
        assert_eq!(message.source(), PEER);
        assert_eq!(message.identifier(), 42);
        assert_eq!(message.sequence(), 1999);
        assert_eq!(message.payload(), &payload[..]);
    }

    #[test]
    fn decode_reply() {
        let (payload, wire) = encode(3, 4, 100).unwrap();
        let message = decode(&wrap_ipv4(PEER, &as_reply(&wire))).unwrap();

        assert_eq!(message.kind(), EchoKind::Reply);
        assert_eq!(message.identifier(), 3);
        assert_eq!(message.sequence(), 4);
        assert_eq!(message.payload(), &payload[..]);
    }

    #[test]
    fn reject_garbage() {
        assert!(matches!(decode(&[]), Err(Error::MalformedPacket(_))));
        assert!(matches!(decode(&[0x45, 0, 0]), Err(Error::MalformedPacket(_))));

        // IPv6 version nibble
        let mut datagram = wrap_ipv4(PEER, &encode(1, 1, 8).unwrap().1);
        datagram[0] = 0x65;
        assert!(matches!(decode(&datagram), Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn reject_corrupted_checksum() {
        let (_, wire) = encode(1, 1999, 32).unwrap();
        let mut datagram = wrap_ipv4(PEER, &as_reply(&wire));
        let last = datagram.len() - 1;
        datagram[last] ^= 0x20;

        assert!(matches!(
            decode(&datagram),
            Err(Error::MalformedPacket("ICMP checksum mismatch"))
        ));
    }

    #[test]
    fn reject_non_echo_messages() {
        use pnet::packet::icmp::MutableIcmpPacket;

        let mut message = vec![0u8; 8];
        let mut icmp = MutableIcmpPacket::new(&mut message).unwrap();
        icmp.set_icmp_type(IcmpTypes::DestinationUnreachable);
        let sum = checksum(&icmp.to_immutable());
        icmp.set_checksum(sum);

        assert!(matches!(
            decode(&wrap_ipv4(PEER, &message)),
            Err(Error::MalformedPacket("not an ICMP echo message"))
        ));
    }

    #[test]
    fn peek_source() {
        let datagram = wrap_ipv4(PEER, &encode(1, 1, 0).unwrap().1);
        assert_eq!(source_of(&datagram), Some(PEER));
        assert_eq!(source_of(&[1, 2]), None);
    }
}
