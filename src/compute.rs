/*! Computed-field registry.

Fields whose action is `compute` carry nothing on the wire; the
decompressor re-derives them from already-decompressed neighbors. Each
registered field pairs a function with the identifiers it reads, so the
decompressor can order computations when one computed field feeds another
(UDP checksum reads UDP length, IPv4 header checksum reads the total
length).

A compute function sees the decompressed `(id, value)` pairs (with the
trailing payload appended under [`crate::PAYLOAD_ID`]) and the position
of the field it is reconstructing.
*/

use crate::buffer::Buffer;
use crate::{ipv4, ipv6, sctp, udp};

/// Reconstruct one field from the decompressed fields around it.
pub type ComputeFn = fn(fields: &[(String, Buffer)], position: usize) -> Buffer;

// field id → (function, identifiers it depends on).
static REGISTRY: &[(&str, ComputeFn, &[&str])] = &[
    (ipv4::TOTAL_LENGTH, ipv4::compute_total_length, &[]),
    (
        ipv4::HEADER_CHECKSUM,
        ipv4::compute_header_checksum,
        &[
            ipv4::VERSION,
            ipv4::HEADER_LENGTH,
            ipv4::TYPE_OF_SERVICE,
            ipv4::TOTAL_LENGTH,
            ipv4::IDENTIFICATION,
            ipv4::FLAGS,
            ipv4::FRAGMENT_OFFSET,
            ipv4::TIME_TO_LIVE,
            ipv4::PROTOCOL,
            ipv4::SRC_ADDRESS,
            ipv4::DST_ADDRESS,
        ],
    ),
    (ipv6::PAYLOAD_LENGTH, ipv6::compute_payload_length, &[]),
    (udp::LENGTH, udp::compute_length, &[]),
    (
        udp::CHECKSUM,
        udp::compute_checksum,
        &[
            udp::LENGTH,
            ipv6::SRC_ADDRESS,
            ipv6::DST_ADDRESS,
            ipv4::SRC_ADDRESS,
            ipv4::DST_ADDRESS,
        ],
    ),
    (
        sctp::CHECKSUM,
        sctp::compute_checksum,
        &[sctp::SOURCE_PORT, sctp::DESTINATION_PORT, sctp::VERIFICATION_TAG],
    ),
];

/// Look up the computation registered for a field id.
pub fn function(field_id: &str) -> Option<(ComputeFn, &'static [&'static str])> {
    REGISTRY
        .iter()
        .find(|(id, _, _)| *id == field_id)
        .map(|&(_, f, deps)| (f, deps))
}

/// 16-bit ones'-complement checksum over a buffer, zero-padded to a
/// 16-bit boundary (the IPv4/UDP/TCP family checksum).
pub(crate) fn ones_complement(buffer: &Buffer) -> u16 {
    let mut sum: u32 = 0;
    for chunk in buffer.chunks(16, true) {
        sum += chunk.uint() as u32;
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Padding;

    #[test]
    fn registry_lookup() {
        assert!(function(udp::CHECKSUM).is_some());
        assert!(function(udp::SOURCE_PORT).is_none());
        let (_, deps) = function(udp::CHECKSUM).unwrap();
        assert!(deps.contains(&udp::LENGTH));
    }

    #[test]
    fn ones_complement_checksum() {
        // RFC 1071 example: 00 01 f2 03 f4 f5 f6 f7 sums to ddf2.
        let b = Buffer::from_bytes(b"\x00\x01\xf2\x03\xf4\xf5\xf6\xf7");
        assert_eq!(ones_complement(&b), !0xddf2);
        // Odd-length data is zero padded.
        let b = Buffer::from_bytes(b"\x00\x01\xf2");
        assert_eq!(ones_complement(&b), !0xf201);
    }

    #[test]
    fn ones_complement_carry_wraps() {
        let b = Buffer::new(b"\xff\xff\x00\x02", 32, Padding::Left);
        assert_eq!(ones_complement(&b), !0x0002);
    }
}
