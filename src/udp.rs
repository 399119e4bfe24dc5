/*! UDP header parser (RFC 768).

Length and checksum are the classic computed fields: both can be elided
entirely and re-derived at decompression, the checksum from a pseudo
header assembled out of the enclosing IPv4 or IPv6 header.
*/

use crate::buffer::{Buffer, Padding};
use crate::compute::ones_complement;
use crate::parser::{parse_error, HeaderParser};
use crate::registry::ProtocolId;
use crate::rule::{FieldDescriptor, HeaderDescriptor};
use crate::{ipv4, ipv6, Result};

/// Header id / field prefix.
pub const HEADER_ID: &str = "UDP";

/// Source Port field id.
pub const SOURCE_PORT: &str = "UDP:Source Port";
/// Destination Port field id.
pub const DESTINATION_PORT: &str = "UDP:Destination Port";
/// Length field id.
pub const LENGTH: &str = "UDP:Length";
/// Checksum field id.
pub const CHECKSUM: &str = "UDP:Checksum";

/// Header layout, for building rules with
/// [`crate::target_value::rule_fields`].
pub const BASE_HEADER: &[(&str, usize)] = &[
    (SOURCE_PORT, 16),
    (DESTINATION_PORT, 16),
    (LENGTH, 16),
    (CHECKSUM, 16),
];

const HEADER_LENGTH: usize = 64;

// Protocols a destination port may chain into.
const PAYLOAD_PROTOCOLS: &[ProtocolId] = &[ProtocolId::Coap, ProtocolId::Sctp];

/// RFC 768 header parser.
pub struct UdpParser {
    predict_next: bool,
}

impl UdpParser {
    /// With `predict_next`, a registered destination port chains the next
    /// protocol's parser onto this header's field list.
    pub fn new(predict_next: bool) -> Self {
        Self { predict_next }
    }
}

impl HeaderParser for UdpParser {
    fn name(&self) -> &'static str {
        HEADER_ID
    }

    fn matches(&self, buffer: &Buffer) -> bool {
        buffer.len() >= HEADER_LENGTH
    }

    fn parse(&self, buffer: &Buffer) -> Result<HeaderDescriptor> {
        //  0      7 8     15 16    23 24    31
        // +--------+--------+--------+--------+
        // |     Source      |   Destination   |
        // |      Port       |      Port       |
        // +--------+--------+--------+--------+
        // |                 |                 |
        // |     Length      |    Checksum     |
        // +--------+--------+--------+--------+
        if buffer.len() < HEADER_LENGTH {
            return Err(parse_error(
                buffer.len(),
                format!("UDP header needs {HEADER_LENGTH} bits, got {}", buffer.len()),
            ));
        }
        let destination_port = buffer.slice(16..32);
        let mut header = HeaderDescriptor {
            id: HEADER_ID.to_string(),
            length: HEADER_LENGTH,
            fields: vec![
                FieldDescriptor::new(SOURCE_PORT, buffer.slice(0..16)),
                FieldDescriptor::new(DESTINATION_PORT, destination_port.clone()),
                FieldDescriptor::new(LENGTH, buffer.slice(32..48)),
                FieldDescriptor::new(CHECKSUM, buffer.slice(48..64)),
            ],
        };
        if self.predict_next
            && let Some(next) = ProtocolId::from_number(destination_port.uint())
            && PAYLOAD_PROTOCOLS.contains(&next)
        {
            let inner = next.parser(true).parse(&buffer.slice(HEADER_LENGTH..))?;
            header.fields.extend(inner.fields);
            header.length += inner.length;
        }
        Ok(header)
    }
}

// The UDP datagram as decompressed so far: source port onward. The
// length field sits two positions after the source port, the checksum
// three.
fn datagram(fields: &[(String, Buffer)], length_position: usize) -> Buffer {
    fields
        .iter()
        .skip(length_position.saturating_sub(2))
        .fold(Buffer::empty(Padding::Right), |acc, (_, v)| acc + v)
}

/// Reconstruct Length: the byte count of header plus payload.
pub(crate) fn compute_length(fields: &[(String, Buffer)], position: usize) -> Buffer {
    let bytes = datagram(fields, position).len().div_ceil(8);
    Buffer::new(&(bytes as u16).to_be_bytes(), 16, Padding::Left)
}

/// Reconstruct Checksum: ones'-complement sum over the pseudo header and
/// the datagram (RFC 768). The pseudo header branches on the protocol
/// that precedes UDP in the decompressed field list:
///
/// ```text
/// IPv4:  src(32) dst(32) zero(8) protocol(8) udp length(16)
/// IPv6:  src(128) dst(128) upper-layer length(32) zero(24) next hdr(8)
/// ```
///
/// A computed sum of zero is transmitted as all ones.
pub(crate) fn compute_checksum(fields: &[(String, Buffer)], position: usize) -> Buffer {
    let udp = datagram(fields, position.saturating_sub(1));
    let udp_bytes = udp.len().div_ceil(8) as u64;

    // The last field of the enclosing protocol sits just before the UDP
    // header's four fields.
    let enclosing = position.saturating_sub(4);
    let mut pseudo = Buffer::empty(Padding::Right);
    if fields[enclosing].0.starts_with(ipv6::HEADER_ID) {
        let src = fields[..=enclosing]
            .iter()
            .rposition(|(id, _)| id == ipv6::SRC_ADDRESS)
            .expect("IPv6 header without source address");
        pseudo += &fields[src].1;
        pseudo += &fields[src + 1].1;
        pseudo += &Buffer::new(&(udp_bytes as u32).to_be_bytes(), 32, Padding::Left);
        pseudo += &Buffer::zeroes(24, Padding::Left);
        pseudo += &Buffer::new(&[ProtocolId::Udp.number() as u8], 8, Padding::Left);
    } else {
        let src = fields[..=enclosing]
            .iter()
            .rposition(|(id, _)| id == ipv4::SRC_ADDRESS)
            .expect("IPv4 header without source address");
        pseudo += &fields[src].1;
        pseudo += &fields[src + 1].1;
        pseudo += &Buffer::zeroes(8, Padding::Left);
        pseudo += &Buffer::new(&[ProtocolId::Udp.number() as u8], 8, Padding::Left);
        pseudo += &Buffer::new(&(udp_bytes as u16).to_be_bytes(), 16, Padding::Left);
    }

    pseudo += &udp;
    let mut checksum = ones_complement(&pseudo);
    if checksum == 0 {
        checksum = 0xffff;
    }
    Buffer::new(&checksum.to_be_bytes(), 16, Padding::Left)
}
