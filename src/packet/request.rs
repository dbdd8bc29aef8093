use pnet::packet::{
    icmp::{checksum, echo_request::MutableEchoRequestPacket, IcmpPacket, IcmpTypes},
    Packet,
};
use rand::Rng;

use super::ICMP_HEADER_LEN;
use crate::error::Error;

/// An echo request before send-out
///
/// Low-level description of one outgoing ping. The request owns its payload so that the reply can
/// be compared against it byte for byte once it comes back. Requests are built fresh for every
/// exchange and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoRequest {
    identifier: u16,
    sequence: u16,
    payload: Vec<u8>,
}

impl EchoRequest {
    /// Create a new echo request carrying `size` bytes of random uppercase letters
    pub fn new(identifier: u16, sequence: u16, size: usize) -> Self {
        Self::with_payload(identifier, sequence, random_payload(size))
    }

    /// Create a new echo request around a caller-supplied payload
    pub fn with_payload(identifier: u16, sequence: u16, payload: Vec<u8>) -> Self {
        Self {
            identifier,
            sequence,
            payload,
        }
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Serialize into an ICMP echo request message
    ///
    /// The first byte is the type field (8 for echo request), followed by the zeroed code, the
    /// 16-bit checksum, the identifier and the sequence number, all in network byte order. The
    /// payload follows the 8-byte header.
    ///
    /// The checksum is the 16-bit one's complement of the one's complement sum of the message,
    /// computed with the checksum field itself zeroed.
    ///
    /// # Errors
    ///
    /// Only fails if the buffer were smaller than the echo header, which cannot happen since the
    /// header length is always added on top of the payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut packet =
            MutableEchoRequestPacket::owned(vec![0u8; ICMP_HEADER_LEN + self.payload.len()])
                .ok_or(Error::MalformedPacket("echo request buffer too small"))?;
        packet.set_icmp_type(IcmpTypes::EchoRequest);
        packet.set_identifier(self.identifier);
        packet.set_sequence_number(self.sequence);
        packet.set_payload(&self.payload);

        let sum = IcmpPacket::new(packet.packet())
            .map(|icmp| checksum(&icmp))
            .ok_or(Error::MalformedPacket("echo request buffer too small"))?;
        packet.set_checksum(sum);

        Ok(packet.packet().to_vec())
    }
}

/// Fill a payload with letters from `A` to `Z`
fn random_payload(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen_range(b'A', b'Z' + 1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_uppercase_ascii() {
        for &size in &[0usize, 1, 26, 1472] {
            let request = EchoRequest::new(1, 1999, size);
            assert_eq!(request.payload().len(), size);
            assert!(request.payload().iter().all(|b| b.is_ascii_uppercase()));
        }
    }

    #[test]
    fn create_echo_request_packet() {
        let request = EchoRequest::with_payload(0x0102, 0x0304, b"HELLO".to_vec());
        let packet = request.to_bytes().expect("Failed encoding echo request");

        // 5 bytes payload + 8 bytes header
        assert_eq!(packet.len(), 13);

        // Type 8, code 0
        assert_eq!(packet[0], 8);
        assert_eq!(packet[1], 0);

        // The 5 - 6th byte are reserved for the identifier
        assert_eq!(&packet[4..6], &[0x01, 0x02]);

        // The 7 - 8th byte are reserved for the sequence number
        assert_eq!(&packet[6..8], &[0x03, 0x04]);
        assert_eq!(&packet[8..], b"HELLO");
    }

    #[test]
    fn checksum_folds_to_zero() {
        let request = EchoRequest::new(7, 1999, 33);
        let packet = request.to_bytes().unwrap();

        // Summing a message including its valid checksum yields all ones
        let mut sum = 0u32;
        for chunk in packet.chunks(2) {
            let word = match chunk {
                [hi, lo] => u16::from_be_bytes([*hi, *lo]),
                [hi] => u16::from_be_bytes([*hi, 0]),
                _ => unreachable!(),
            };
            sum += u32::from(word);
        }
        while sum > 0xffff {
            sum = (sum & 0xffff) + (sum >> 16);
        }
        assert_eq!(sum, 0xffff);
    }
}
