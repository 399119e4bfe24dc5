/*! IPv6 base header parser (RFC 8200).

Extension headers are not parsed: hop-by-hop, routing, and the security
headers are out of scope, and fragmentation belongs to SCHC-F rather than
the compression core.
*/

use crate::buffer::{Buffer, Padding};
use crate::parser::{parse_error, HeaderParser};
use crate::registry::ProtocolId;
use crate::rule::{FieldDescriptor, HeaderDescriptor};
use crate::Result;

/// Header id / field prefix.
pub const HEADER_ID: &str = "IPv6";

/// Version field id.
pub const VERSION: &str = "IPv6:Version";
/// Traffic Class field id.
pub const TRAFFIC_CLASS: &str = "IPv6:Traffic Class";
/// Flow Label field id.
pub const FLOW_LABEL: &str = "IPv6:Flow Label";
/// Payload Length field id.
pub const PAYLOAD_LENGTH: &str = "IPv6:Payload Length";
/// Next Header field id.
pub const NEXT_HEADER: &str = "IPv6:Next Header";
/// Hop Limit field id.
pub const HOP_LIMIT: &str = "IPv6:Hop Limit";
/// Source Address field id.
pub const SRC_ADDRESS: &str = "IPv6:Source Address";
/// Destination Address field id.
pub const DST_ADDRESS: &str = "IPv6:Destination Address";

/// Base-header layout, for building rules with
/// [`crate::target_value::rule_fields`].
pub const BASE_HEADER: &[(&str, usize)] = &[
    (VERSION, 4),
    (TRAFFIC_CLASS, 8),
    (FLOW_LABEL, 20),
    (PAYLOAD_LENGTH, 16),
    (NEXT_HEADER, 8),
    (HOP_LIMIT, 8),
    (SRC_ADDRESS, 128),
    (DST_ADDRESS, 128),
];

const HEADER_LENGTH: usize = 320;

// Protocols an IPv6 next-header value may chain into.
const PAYLOAD_PROTOCOLS: &[ProtocolId] = &[ProtocolId::Udp, ProtocolId::Sctp];

/// RFC 8200 base header parser.
pub struct Ipv6Parser {
    predict_next: bool,
}

impl Ipv6Parser {
    /// With `predict_next`, a registered Next Header value chains the
    /// next protocol's parser onto this header's field list.
    pub fn new(predict_next: bool) -> Self {
        Self { predict_next }
    }
}

impl HeaderParser for Ipv6Parser {
    fn name(&self) -> &'static str {
        HEADER_ID
    }

    fn matches(&self, buffer: &Buffer) -> bool {
        buffer.len() >= HEADER_LENGTH && buffer.slice(0..4).uint() == 6
    }

    fn parse(&self, buffer: &Buffer) -> Result<HeaderDescriptor> {
        //  0                   1                   2                   3
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |Version| Traffic Class |           Flow Label                  |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |         Payload Length        |  Next Header  |   Hop Limit   |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |                         Source Address (128)                  |
        // |                      Destination Address (128)                |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        if buffer.len() < HEADER_LENGTH {
            return Err(parse_error(
                buffer.len(),
                format!("IPv6 header needs {HEADER_LENGTH} bits, got {}", buffer.len()),
            ));
        }
        let version = buffer.slice(0..4);
        if version.uint() != 6 {
            return Err(parse_error(0, format!("IPv6 version mismatch: {}", version.uint())));
        }
        let next_header = buffer.slice(48..56);
        let mut header = HeaderDescriptor {
            id: HEADER_ID.to_string(),
            length: HEADER_LENGTH,
            fields: vec![
                FieldDescriptor::new(VERSION, version),
                FieldDescriptor::new(TRAFFIC_CLASS, buffer.slice(4..12)),
                FieldDescriptor::new(FLOW_LABEL, buffer.slice(12..32)),
                FieldDescriptor::new(PAYLOAD_LENGTH, buffer.slice(32..48)),
                FieldDescriptor::new(NEXT_HEADER, next_header.clone()),
                FieldDescriptor::new(HOP_LIMIT, buffer.slice(56..64)),
                FieldDescriptor::new(SRC_ADDRESS, buffer.slice(64..192)),
                FieldDescriptor::new(DST_ADDRESS, buffer.slice(192..320)),
            ],
        };
        if self.predict_next
            && let Some(protocol) = ProtocolId::from_number(next_header.uint())
            && PAYLOAD_PROTOCOLS.contains(&protocol)
        {
            let next = protocol.parser(true).parse(&buffer.slice(HEADER_LENGTH..))?;
            header.fields.extend(next.fields);
            header.length += next.length;
        }
        Ok(header)
    }
}

/// Reconstruct Payload Length: the byte count of everything after the
/// base header. The four remaining IPv6 fields sit right after this one,
/// so the payload starts five positions further on.
pub(crate) fn compute_payload_length(fields: &[(String, Buffer)], position: usize) -> Buffer {
    let bits: usize = fields.iter().skip(position + 5).map(|(_, v)| v.len()).sum();
    Buffer::new(&(bits.div_ceil(8) as u16).to_be_bytes(), 16, Padding::Left)
}
