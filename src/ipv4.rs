/*! IPv4 header parser (RFC 791).

Options are not parsed; headers are taken at their 20-byte base layout
(IHL > 5 packets should be routed to a no-compression rule).
*/

use crate::buffer::{Buffer, Padding};
use crate::compute::ones_complement;
use crate::parser::{parse_error, HeaderParser};
use crate::registry::ProtocolId;
use crate::rule::{FieldDescriptor, HeaderDescriptor};
use crate::Result;

/// Header id / field prefix.
pub const HEADER_ID: &str = "IPv4";

/// Version field id.
pub const VERSION: &str = "IPv4:Version";
/// Header Length (IHL) field id.
pub const HEADER_LENGTH: &str = "IPv4:Header Length";
/// Type of Service field id.
pub const TYPE_OF_SERVICE: &str = "IPv4:Type of Service";
/// Total Length field id.
pub const TOTAL_LENGTH: &str = "IPv4:Total Length";
/// Identification field id.
pub const IDENTIFICATION: &str = "IPv4:Identification";
/// Flags field id.
pub const FLAGS: &str = "IPv4:Flags";
/// Fragment Offset field id.
pub const FRAGMENT_OFFSET: &str = "IPv4:Fragment Offset";
/// Time To Live field id.
pub const TIME_TO_LIVE: &str = "IPv4:Time To Live";
/// Protocol field id.
pub const PROTOCOL: &str = "IPv4:Protocol";
/// Header Checksum field id.
pub const HEADER_CHECKSUM: &str = "IPv4:Header Checksum";
/// Source Address field id.
pub const SRC_ADDRESS: &str = "IPv4:Source Address";
/// Destination Address field id.
pub const DST_ADDRESS: &str = "IPv4:Destination Address";

/// Base-header layout, for building rules with
/// [`crate::target_value::rule_fields`].
pub const BASE_HEADER: &[(&str, usize)] = &[
    (VERSION, 4),
    (HEADER_LENGTH, 4),
    (TYPE_OF_SERVICE, 8),
    (TOTAL_LENGTH, 16),
    (IDENTIFICATION, 16),
    (FLAGS, 3),
    (FRAGMENT_OFFSET, 13),
    (TIME_TO_LIVE, 8),
    (PROTOCOL, 8),
    (HEADER_CHECKSUM, 16),
    (SRC_ADDRESS, 32),
    (DST_ADDRESS, 32),
];

const BASE_LENGTH: usize = 160;

const PAYLOAD_PROTOCOLS: &[ProtocolId] = &[ProtocolId::Udp, ProtocolId::Sctp];

/// RFC 791 base header parser.
pub struct Ipv4Parser {
    predict_next: bool,
}

impl Ipv4Parser {
    /// With `predict_next`, a registered Protocol value chains the next
    /// protocol's parser onto this header's field list.
    pub fn new(predict_next: bool) -> Self {
        Self { predict_next }
    }
}

impl HeaderParser for Ipv4Parser {
    fn name(&self) -> &'static str {
        HEADER_ID
    }

    fn matches(&self, buffer: &Buffer) -> bool {
        buffer.len() >= BASE_LENGTH && buffer.slice(0..4).uint() == 4
    }

    fn parse(&self, buffer: &Buffer) -> Result<HeaderDescriptor> {
        //  0                   1                   2                   3
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |Version|  IHL  |Type of Service|          Total Length         |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |         Identification        |Flags|      Fragment Offset    |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |  Time to Live |    Protocol   |         Header Checksum       |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |                       Source Address                          |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |                    Destination Address                        |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        if buffer.len() < BASE_LENGTH {
            return Err(parse_error(
                buffer.len(),
                format!("IPv4 header needs {BASE_LENGTH} bits, got {}", buffer.len()),
            ));
        }
        let version = buffer.slice(0..4);
        if version.uint() != 4 {
            return Err(parse_error(0, format!("IPv4 version mismatch: {}", version.uint())));
        }
        let protocol = buffer.slice(72..80);
        let mut header = HeaderDescriptor {
            id: HEADER_ID.to_string(),
            length: BASE_LENGTH,
            fields: vec![
                FieldDescriptor::new(VERSION, version),
                FieldDescriptor::new(HEADER_LENGTH, buffer.slice(4..8)),
                FieldDescriptor::new(TYPE_OF_SERVICE, buffer.slice(8..16)),
                FieldDescriptor::new(TOTAL_LENGTH, buffer.slice(16..32)),
                FieldDescriptor::new(IDENTIFICATION, buffer.slice(32..48)),
                FieldDescriptor::new(FLAGS, buffer.slice(48..51)),
                FieldDescriptor::new(FRAGMENT_OFFSET, buffer.slice(51..64)),
                FieldDescriptor::new(TIME_TO_LIVE, buffer.slice(64..72)),
                FieldDescriptor::new(PROTOCOL, protocol.clone()),
                FieldDescriptor::new(HEADER_CHECKSUM, buffer.slice(80..96)),
                FieldDescriptor::new(SRC_ADDRESS, buffer.slice(96..128)),
                FieldDescriptor::new(DST_ADDRESS, buffer.slice(128..160)),
            ],
        };
        if self.predict_next
            && let Some(next) = ProtocolId::from_number(protocol.uint())
            && PAYLOAD_PROTOCOLS.contains(&next)
        {
            let inner = next.parser(true).parse(&buffer.slice(BASE_LENGTH..))?;
            header.fields.extend(inner.fields);
            header.length += inner.length;
        }
        Ok(header)
    }
}

/// Reconstruct Total Length: the byte count of the datagram from the
/// header's first bit on. Version and IHL precede the field by three
/// positions; starting two before it only drops version's four bits,
/// which the byte rounding absorbs.
pub(crate) fn compute_total_length(fields: &[(String, Buffer)], position: usize) -> Buffer {
    let bits: usize = fields
        .iter()
        .skip(position.saturating_sub(2))
        .map(|(_, v)| v.len())
        .sum();
    Buffer::new(&(bits.div_ceil(8) as u16).to_be_bytes(), 16, Padding::Left)
}

/// Reconstruct Header Checksum: ones'-complement sum over the twelve
/// header fields (the checksum itself decompresses as an empty
/// placeholder, equivalent to a zeroed field under this sum).
pub(crate) fn compute_header_checksum(fields: &[(String, Buffer)], position: usize) -> Buffer {
    let header = fields
        .iter()
        .skip(position.saturating_sub(9))
        .take(12)
        .fold(Buffer::empty(Padding::Right), |acc, (_, v)| acc + v);
    let mut checksum = ones_complement(&header);
    if checksum == 0 {
        checksum = 0xffff;
    }
    Buffer::new(&checksum.to_be_bytes(), 16, Padding::Left)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 20-byte header with a correct checksum (0xb8f0).
    const HEADER: &[u8] =
        b"\x45\x00\x00\x54\x00\x00\x40\x00\x40\x01\xb8\xf0\xc0\xa8\x00\x67\xc0\xa8\x00\x01";

    #[test]
    fn parse_base_header() {
        let header = Ipv4Parser::new(false).parse(&Buffer::from_bytes(HEADER)).unwrap();
        assert_eq!(header.length, 160);
        assert_eq!(header.fields.len(), 12);
        let get = |id: &str| header.fields.iter().find(|f| f.id == id).unwrap().value.uint();
        assert_eq!(get(VERSION), 4);
        assert_eq!(get(HEADER_LENGTH), 5);
        assert_eq!(get(TOTAL_LENGTH), 0x54);
        assert_eq!(get(FLAGS), 0b010);
        assert_eq!(get(FRAGMENT_OFFSET), 0);
        assert_eq!(get(TIME_TO_LIVE), 64);
        assert_eq!(get(HEADER_CHECKSUM), 0xb8f0);
        assert_eq!(get(SRC_ADDRESS), 0xc0a80067);
    }

    #[test]
    fn rejects_wrong_version() {
        let mut bytes = HEADER.to_vec();
        bytes[0] = 0x65;
        assert!(Ipv4Parser::new(false).parse(&Buffer::from_bytes(&bytes)).is_err());
    }

    #[test]
    fn header_checksum_computation() {
        // Decompressed view of the header above, checksum still a zeroed
        // placeholder as the decompressor leaves it.
        let header = Ipv4Parser::new(false).parse(&Buffer::from_bytes(HEADER)).unwrap();
        let fields: Vec<(String, Buffer)> = header
            .fields
            .iter()
            .map(|f| {
                let value = if f.id == HEADER_CHECKSUM {
                    Buffer::zeroes(16, Padding::Left)
                } else {
                    f.value.clone()
                };
                (f.id.clone(), value)
            })
            .collect();
        let checksum = compute_header_checksum(&fields, 9);
        assert_eq!(checksum.uint(), 0xb8f0);
    }

    #[test]
    fn total_length_computation() {
        let header = Ipv4Parser::new(false).parse(&Buffer::from_bytes(HEADER)).unwrap();
        let mut fields: Vec<(String, Buffer)> = header
            .fields
            .iter()
            .map(|f| {
                let value = if f.id == TOTAL_LENGTH {
                    Buffer::zeroes(16, Padding::Left)
                } else {
                    f.value.clone()
                };
                (f.id.clone(), value)
            })
            .collect();
        // 64 payload bytes, as the original total length declares.
        fields.push((crate::PAYLOAD_ID.to_string(), Buffer::zeroes(64 * 8, Padding::Left)));
        let total = compute_total_length(&fields, 3);
        assert_eq!(total.uint(), 0x54);
    }
}
