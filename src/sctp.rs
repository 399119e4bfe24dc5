/*! SCTP parser (RFC 9260).

Common header plus the chunk types of the base protocol, including the
32-bit chunk and parameter padding. Chunk bodies with variable-length
parameters (INIT, HEARTBEAT, ABORT, ERROR and friends) decompose into
parameter TLV runs; unrecognized chunk types keep their value as one
opaque field.
*/

use crate::buffer::{Buffer, Padding};
use crate::parser::{parse_error, HeaderParser};
use crate::rule::{FieldDescriptor, HeaderDescriptor};
use crate::Result;

/// Header id / field prefix.
pub const HEADER_ID: &str = "SCTP";

/// Source Port field id.
pub const SOURCE_PORT: &str = "SCTP:Source Port";
/// Destination Port field id.
pub const DESTINATION_PORT: &str = "SCTP:Destination Port";
/// Verification Tag field id.
pub const VERIFICATION_TAG: &str = "SCTP:Verification Tag";
/// Checksum field id.
pub const CHECKSUM: &str = "SCTP:Checksum";

/// Chunk Type field id.
pub const CHUNK_TYPE: &str = "SCTP:Chunk Type";
/// Chunk Flags field id.
pub const CHUNK_FLAGS: &str = "SCTP:Chunk Flags";
/// Chunk Length field id.
pub const CHUNK_LENGTH: &str = "SCTP:Chunk Length";
/// Opaque value of an unrecognized chunk.
pub const CHUNK_VALUE: &str = "SCTP:Chunk Value";
/// Chunk padding up to the 32-bit boundary.
pub const CHUNK_PADDING: &str = "SCTP:Chunk Padding";

/// DATA chunk TSN field id.
pub const DATA_TSN: &str = "SCTP:Data TSN";
/// DATA chunk Stream Identifier field id.
pub const DATA_STREAM_IDENTIFIER: &str = "SCTP:Data Stream Identifier S";
/// DATA chunk Stream Sequence Number field id.
pub const DATA_STREAM_SEQUENCE_NUMBER: &str = "SCTP:Data Stream Sequence Number n";
/// DATA chunk Payload Protocol Identifier field id.
pub const DATA_PAYLOAD_PROTOCOL_IDENTIFIER: &str = "SCTP:Data Payload Protocol Identifier";
/// DATA chunk user data field id.
pub const DATA_PAYLOAD: &str = "SCTP:Data Payload";

/// INIT chunk Initiate Tag field id.
pub const INIT_INITIATE_TAG: &str = "SCTP:Init Initiate Tag";
/// INIT chunk a_rwnd field id.
pub const INIT_A_RWND: &str = "SCTP:Init Advertised Receiver Window Credit";
/// INIT chunk outbound stream count field id.
pub const INIT_OUTBOUND_STREAMS: &str = "SCTP:Init Number of Outbound Streams";
/// INIT chunk inbound stream count field id.
pub const INIT_INBOUND_STREAMS: &str = "SCTP:Init Number of Inbound Streams";
/// INIT chunk Initial TSN field id.
pub const INIT_INITIAL_TSN: &str = "SCTP:Init Initial TSN";

/// INIT ACK chunk Initiate Tag field id.
pub const INIT_ACK_INITIATE_TAG: &str = "SCTP:Init Ack Initiate Tag";
/// INIT ACK chunk a_rwnd field id.
pub const INIT_ACK_A_RWND: &str = "SCTP:Init Ack Advertised Receiver Window Credit";
/// INIT ACK chunk outbound stream count field id.
pub const INIT_ACK_OUTBOUND_STREAMS: &str = "SCTP:Init Ack Number of Outbound Streams";
/// INIT ACK chunk inbound stream count field id.
pub const INIT_ACK_INBOUND_STREAMS: &str = "SCTP:Init Ack Number of Inbound Streams";
/// INIT ACK chunk Initial TSN field id.
pub const INIT_ACK_INITIAL_TSN: &str = "SCTP:Init Ack Initial TSN";

/// SACK chunk Cumulative TSN Ack field id.
pub const SACK_CUMULATIVE_TSN_ACK: &str = "SCTP:Selective Ack Cumulative TSN Ack";
/// SACK chunk a_rwnd field id.
pub const SACK_A_RWND: &str = "SCTP:Selective Ack Advertised Receiver Window Credit";
/// SACK chunk gap block count field id.
pub const SACK_NUMBER_GAP_ACK_BLOCKS: &str = "SCTP:Selective Ack Number Gap Ack Blocks";
/// SACK chunk duplicate TSN count field id.
pub const SACK_NUMBER_DUPLICATE_TSNS: &str = "SCTP:Selective Ack Number Duplicate TSNs";
/// SACK chunk gap block start field id.
pub const SACK_GAP_ACK_BLOCK_START: &str = "SCTP:Selective Ack Gap Ack Block Start";
/// SACK chunk gap block end field id.
pub const SACK_GAP_ACK_BLOCK_END: &str = "SCTP:Selective Ack Gap Ack Block End";
/// SACK chunk duplicate TSN field id.
pub const SACK_DUPLICATE_TSN: &str = "SCTP:Selective Ack Duplicate TSN";

/// SHUTDOWN chunk Cumulative TSN Ack field id.
pub const SHUTDOWN_CUMULATIVE_TSN_ACK: &str = "SCTP:Shutdown Cumulative TSN";

/// COOKIE ECHO chunk cookie field id.
pub const COOKIE_ECHO_COOKIE: &str = "SCTP:Cookie Echo Cookie";

/// Parameter TLV type field id.
pub const PARAMETER_TYPE: &str = "SCTP:Parameter Type";
/// Parameter TLV length field id.
pub const PARAMETER_LENGTH: &str = "SCTP:Parameter Length";
/// Parameter TLV value field id.
pub const PARAMETER_VALUE: &str = "SCTP:Parameter Value";
/// Parameter padding up to the 32-bit boundary.
pub const PARAMETER_PADDING: &str = "SCTP:Parameter Padding";

/// Common-header layout, for building rules with
/// [`crate::target_value::rule_fields`]. Chunk fields vary per packet
/// and are described rule by rule.
pub const BASE_HEADER: &[(&str, usize)] = &[
    (SOURCE_PORT, 16),
    (DESTINATION_PORT, 16),
    (VERIFICATION_TAG, 32),
    (CHECKSUM, 32),
];

const COMMON_HEADER_LENGTH: usize = 96;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
enum ChunkType {
    Data = 0,
    Init = 1,
    InitAck = 2,
    Sack = 3,
    Heartbeat = 4,
    HeartbeatAck = 5,
    Abort = 6,
    Shutdown = 7,
    ShutdownAck = 8,
    Error = 9,
    CookieEcho = 10,
    CookieAck = 11,
    ShutdownComplete = 14,
}

impl ChunkType {
    fn from_wire(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Data),
            1 => Some(Self::Init),
            2 => Some(Self::InitAck),
            3 => Some(Self::Sack),
            4 => Some(Self::Heartbeat),
            5 => Some(Self::HeartbeatAck),
            6 => Some(Self::Abort),
            7 => Some(Self::Shutdown),
            8 => Some(Self::ShutdownAck),
            9 => Some(Self::Error),
            10 => Some(Self::CookieEcho),
            11 => Some(Self::CookieAck),
            14 => Some(Self::ShutdownComplete),
            _ => None,
        }
    }
}

/// RFC 9260 parser: common header plus all chunks in the packet.
pub struct SctpParser {}

impl SctpParser {
    /// SCTP announces no follow-on protocols, so `predict_next` is
    /// accepted for registry uniformity but has nothing to chain into.
    pub fn new(_predict_next: bool) -> Self {
        Self {}
    }
}

impl HeaderParser for SctpParser {
    fn name(&self) -> &'static str {
        HEADER_ID
    }

    fn matches(&self, buffer: &Buffer) -> bool {
        buffer.len() >= COMMON_HEADER_LENGTH
    }

    fn parse(&self, buffer: &Buffer) -> Result<HeaderDescriptor> {
        //  0                   1                   2                   3
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |     Source Port Number        |     Destination Port Number   |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |                      Verification Tag                         |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |                           Checksum                            |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |                        Chunk #1 ... #n                        |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        if buffer.len() < COMMON_HEADER_LENGTH {
            return Err(parse_error(
                buffer.len(),
                format!("SCTP header needs {COMMON_HEADER_LENGTH} bits, got {}", buffer.len()),
            ));
        }
        let mut fields = vec![
            FieldDescriptor::new(SOURCE_PORT, buffer.slice(0..16)),
            FieldDescriptor::new(DESTINATION_PORT, buffer.slice(16..32)),
            FieldDescriptor::new(VERIFICATION_TAG, buffer.slice(32..64)),
            FieldDescriptor::new(CHECKSUM, buffer.slice(64..96)),
        ];
        let mut chunks = buffer.slice(COMMON_HEADER_LENGTH..);
        let mut offset = COMMON_HEADER_LENGTH;
        while !chunks.is_empty() {
            let (chunk_fields, consumed) =
                parse_chunk(&chunks).map_err(|e| rebase(e, offset))?;
            fields.extend(chunk_fields);
            chunks = chunks.slice(consumed..);
            offset += consumed;
        }
        Ok(HeaderDescriptor {
            id: HEADER_ID.to_string(),
            length: buffer.len(),
            fields,
        })
    }
}

fn rebase(e: crate::Error, offset: usize) -> crate::Error {
    match e {
        crate::Error::Parse { position, reason } => crate::Error::Parse {
            position: position + offset,
            reason,
        },
        other => other,
    }
}

// One chunk: type, flags, length, a typed body, 32-bit padding.
fn parse_chunk(buffer: &Buffer) -> Result<(Vec<FieldDescriptor>, usize)> {
    if buffer.len() < 32 {
        return Err(parse_error(buffer.len(), "SCTP chunk header truncated"));
    }
    let chunk_type = buffer.slice(0..8);
    let chunk_flags = buffer.slice(8..16);
    let chunk_length = buffer.slice(16..32);
    let length_bits = chunk_length.uint() as usize * 8;
    if length_bits < 32 || length_bits > buffer.len() {
        return Err(parse_error(
            16,
            format!("SCTP chunk length {} outside the buffer", chunk_length.uint()),
        ));
    }

    let mut fields = vec![
        FieldDescriptor::new(CHUNK_TYPE, chunk_type.clone()),
        FieldDescriptor::new(CHUNK_FLAGS, chunk_flags),
        FieldDescriptor::new(CHUNK_LENGTH, chunk_length),
    ];

    let value = buffer.slice(32..length_bits);
    if !value.is_empty() {
        let body = match ChunkType::from_wire(chunk_type.uint()) {
            Some(ChunkType::Data) => parse_chunk_data(&value)?,
            Some(ChunkType::Init) => parse_chunk_init(&value, false)?,
            Some(ChunkType::InitAck) => parse_chunk_init(&value, true)?,
            Some(ChunkType::Sack) => parse_chunk_sack(&value)?,
            Some(ChunkType::Heartbeat)
            | Some(ChunkType::HeartbeatAck)
            | Some(ChunkType::Abort)
            | Some(ChunkType::Error) => parse_parameters(&value)?,
            Some(ChunkType::Shutdown) => vec![FieldDescriptor::new(
                SHUTDOWN_CUMULATIVE_TSN_ACK,
                value.slice(0..32),
            )],
            Some(ChunkType::CookieEcho) => {
                vec![FieldDescriptor::new(COOKIE_ECHO_COOKIE, value.clone())]
            }
            Some(ChunkType::ShutdownAck)
            | Some(ChunkType::CookieAck)
            | Some(ChunkType::ShutdownComplete) => Vec::new(),
            None => vec![FieldDescriptor::new(CHUNK_VALUE, value.clone())],
        };
        fields.extend(body);
    }

    let padding_bits = (32 - length_bits % 32) % 32;
    let padding = buffer.slice(length_bits..length_bits + padding_bits);
    // Some implementations take the final chunk's padding liberally.
    if !padding.is_empty() {
        fields.push(FieldDescriptor::new(CHUNK_PADDING, padding.clone()));
    }

    Ok((fields, length_bits + padding.len()))
}

fn parse_chunk_data(value: &Buffer) -> Result<Vec<FieldDescriptor>> {
    // | TSN (32) | Stream Identifier (16) | Stream Sequence Number (16) |
    // | Payload Protocol Identifier (32) | User Data ...
    if value.len() < 96 {
        return Err(parse_error(value.len(), "SCTP DATA chunk truncated"));
    }
    let mut fields = vec![
        FieldDescriptor::new(DATA_TSN, value.slice(0..32)),
        FieldDescriptor::new(DATA_STREAM_IDENTIFIER, value.slice(32..48)),
        FieldDescriptor::new(DATA_STREAM_SEQUENCE_NUMBER, value.slice(48..64)),
        FieldDescriptor::new(DATA_PAYLOAD_PROTOCOL_IDENTIFIER, value.slice(64..96)),
    ];
    let user_data = value.slice(96..);
    if !user_data.is_empty() {
        fields.push(FieldDescriptor::new(DATA_PAYLOAD, user_data));
    }
    Ok(fields)
}

fn parse_chunk_init(value: &Buffer, ack: bool) -> Result<Vec<FieldDescriptor>> {
    // | Initiate Tag (32) | a_rwnd (32) | Outbound (16) | Inbound (16) |
    // | Initial TSN (32) | parameters ...
    if value.len() < 128 {
        return Err(parse_error(value.len(), "SCTP INIT chunk truncated"));
    }
    let ids = if ack {
        [
            INIT_ACK_INITIATE_TAG,
            INIT_ACK_A_RWND,
            INIT_ACK_OUTBOUND_STREAMS,
            INIT_ACK_INBOUND_STREAMS,
            INIT_ACK_INITIAL_TSN,
        ]
    } else {
        [
            INIT_INITIATE_TAG,
            INIT_A_RWND,
            INIT_OUTBOUND_STREAMS,
            INIT_INBOUND_STREAMS,
            INIT_INITIAL_TSN,
        ]
    };
    let mut fields = vec![
        FieldDescriptor::new(ids[0], value.slice(0..32)),
        FieldDescriptor::new(ids[1], value.slice(32..64)),
        FieldDescriptor::new(ids[2], value.slice(64..80)),
        FieldDescriptor::new(ids[3], value.slice(80..96)),
        FieldDescriptor::new(ids[4], value.slice(96..128)),
    ];
    fields.extend(parse_parameters(&value.slice(128..))?);
    Ok(fields)
}

fn parse_chunk_sack(value: &Buffer) -> Result<Vec<FieldDescriptor>> {
    // | Cumulative TSN Ack (32) | a_rwnd (32) | N gap blocks (16) |
    // | M duplicate TSNs (16) | N × (start, end) | M × TSN |
    if value.len() < 96 {
        return Err(parse_error(value.len(), "SCTP SACK chunk truncated"));
    }
    let gap_blocks = value.slice(64..80);
    let duplicates = value.slice(80..96);
    let mut fields = vec![
        FieldDescriptor::new(SACK_CUMULATIVE_TSN_ACK, value.slice(0..32)),
        FieldDescriptor::new(SACK_A_RWND, value.slice(32..64)),
        FieldDescriptor::new(SACK_NUMBER_GAP_ACK_BLOCKS, gap_blocks.clone()),
        FieldDescriptor::new(SACK_NUMBER_DUPLICATE_TSNS, duplicates.clone()),
    ];
    let mut rest = value.slice(96..);
    for _ in 0..gap_blocks.uint() {
        if rest.len() < 32 {
            return Err(parse_error(value.len(), "SCTP SACK gap blocks truncated"));
        }
        fields.push(FieldDescriptor::new(SACK_GAP_ACK_BLOCK_START, rest.slice(0..16)));
        fields.push(FieldDescriptor::new(SACK_GAP_ACK_BLOCK_END, rest.slice(16..32)));
        rest = rest.slice(32..);
    }
    for _ in 0..duplicates.uint() {
        if rest.len() < 32 {
            return Err(parse_error(value.len(), "SCTP SACK duplicate TSNs truncated"));
        }
        fields.push(FieldDescriptor::new(SACK_DUPLICATE_TSN, rest.slice(0..32)));
        rest = rest.slice(32..);
    }
    Ok(fields)
}

// A run of parameter TLVs, each 32-bit padded:
// | Parameter Type (16) | Parameter Length (16) | Value ... | padding |
fn parse_parameters(buffer: &Buffer) -> Result<Vec<FieldDescriptor>> {
    let mut fields = Vec::new();
    let mut rest = buffer.clone();
    while !rest.is_empty() {
        if rest.len() < 32 {
            return Err(parse_error(rest.len(), "SCTP parameter truncated"));
        }
        let parameter_type = rest.slice(0..16);
        let parameter_length = rest.slice(16..32);
        let length_bits = parameter_length.uint() as usize * 8;
        if length_bits < 32 || length_bits > rest.len() {
            return Err(parse_error(
                16,
                format!("SCTP parameter length {} outside the buffer", parameter_length.uint()),
            ));
        }
        fields.push(FieldDescriptor::new(PARAMETER_TYPE, parameter_type));
        fields.push(FieldDescriptor::new(PARAMETER_LENGTH, parameter_length));
        let value = rest.slice(32..length_bits);
        if !value.is_empty() {
            fields.push(FieldDescriptor::new(PARAMETER_VALUE, value));
        }
        let padding_bits = (32 - length_bits % 32) % 32;
        let padding = rest.slice(length_bits..length_bits + padding_bits);
        if !padding.is_empty() {
            fields.push(FieldDescriptor::new(PARAMETER_PADDING, padding.clone()));
        }
        rest = rest.slice(length_bits + padding.len()..);
    }
    Ok(fields)
}

// Castagnoli CRC-32 over bytes, bitwise with the reflected polynomial.
fn crc32c(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xffff_ffff;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0x82f6_3b78 } else { crc >> 1 };
        }
    }
    !crc
}

/// Reconstruct Checksum: CRC-32C from the source port through the end of
/// the chunks, the checksum field itself zeroed (its placeholder already
/// is), transmitted in little-endian byte order per RFC 9260.
pub(crate) fn compute_checksum(fields: &[(String, Buffer)], position: usize) -> Buffer {
    let packet = fields
        .iter()
        .skip(position.saturating_sub(3))
        .fold(Buffer::empty(Padding::Right), |acc, (_, v)| acc + v);
    let crc = crc32c(packet.pad(Padding::Left).content());
    Buffer::from_bytes(&crc.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Common header (checksum zeroed) + one DATA chunk with 3 bytes of
    // user data and one byte of chunk padding.
    const DATA_PACKET: &[u8] = b"\x0b\x59\x0b\x59\xde\xad\xbe\xef\x00\x00\x00\x00\
        \x00\x03\x00\x13\x00\x00\x00\x07\x00\x05\x00\x01\x00\x00\x00\x33\x61\x62\x63\x00";

    #[test]
    fn parse_data_chunk() {
        let header = SctpParser::new(false).parse(&Buffer::from_bytes(DATA_PACKET)).unwrap();
        assert_eq!(header.length, DATA_PACKET.len() * 8);
        let ids: Vec<&str> = header.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                SOURCE_PORT,
                DESTINATION_PORT,
                VERIFICATION_TAG,
                CHECKSUM,
                CHUNK_TYPE,
                CHUNK_FLAGS,
                CHUNK_LENGTH,
                DATA_TSN,
                DATA_STREAM_IDENTIFIER,
                DATA_STREAM_SEQUENCE_NUMBER,
                DATA_PAYLOAD_PROTOCOL_IDENTIFIER,
                DATA_PAYLOAD,
                CHUNK_PADDING,
            ]
        );
        let get = |id: &str| header.fields.iter().find(|f| f.id == id).unwrap();
        assert_eq!(get(CHUNK_LENGTH).value.uint(), 19);
        assert_eq!(get(DATA_TSN).value.uint(), 7);
        assert_eq!(get(DATA_PAYLOAD).value, Buffer::from_bytes(b"abc"));
        assert_eq!(get(CHUNK_PADDING).value.len(), 8);
        // Fields reassemble the packet bit for bit.
        let total: usize = header.fields.iter().map(|f| f.value.len()).sum();
        assert_eq!(total, header.length);
    }

    #[test]
    fn parse_init_with_parameter() {
        // INIT chunk, fixed part + one parameter (type 0xc000, 6 bytes +
        // 2 bytes padding).
        let packet: Vec<u8> = [
            &b"\x0b\x59\x0b\x59\x00\x00\x00\x00\x00\x00\x00\x00"[..],
            b"\x01\x00\x00\x1c",
            b"\x00\x00\x00\x2a",
            b"\x00\x01\x00\x00",
            b"\x00\x08\x00\x08",
            b"\x00\x00\x00\x01",
            b"\xc0\x00\x00\x06\xaa\xbb\x00\x00",
        ]
        .concat();
        let header = SctpParser::new(false).parse(&Buffer::from_bytes(&packet)).unwrap();
        let get = |id: &str| header.fields.iter().find(|f| f.id == id).unwrap();
        assert_eq!(get(INIT_INITIATE_TAG).value.uint(), 0x2a);
        assert_eq!(get(INIT_OUTBOUND_STREAMS).value.uint(), 8);
        assert_eq!(get(PARAMETER_TYPE).value.uint(), 0xc000);
        assert_eq!(get(PARAMETER_VALUE).value, Buffer::from_bytes(b"\xaa\xbb"));
        assert_eq!(get(PARAMETER_PADDING).value.len(), 16);
    }

    #[test]
    fn abort_and_shutdown_bodies() {
        // SHUTDOWN carries a cumulative TSN, SHUTDOWN ACK nothing.
        let packet: Vec<u8> = [
            &b"\x0b\x59\x0b\x59\x00\x00\x00\x00\x00\x00\x00\x00"[..],
            b"\x07\x00\x00\x08\x00\x00\x01\x00",
            b"\x08\x00\x00\x04",
        ]
        .concat();
        let header = SctpParser::new(false).parse(&Buffer::from_bytes(&packet)).unwrap();
        let get = |id: &str| header.fields.iter().find(|f| f.id == id).unwrap();
        assert_eq!(get(SHUTDOWN_CUMULATIVE_TSN_ACK).value.uint(), 0x100);
        let chunk_types: Vec<u64> = header
            .fields
            .iter()
            .filter(|f| f.id == CHUNK_TYPE)
            .map(|f| f.value.uint())
            .collect();
        assert_eq!(chunk_types, vec![7, 8]);
    }

    #[test]
    fn bogus_chunk_length_is_a_parse_error() {
        let mut packet = DATA_PACKET.to_vec();
        packet[15] = 0xff;
        assert!(SctpParser::new(false).parse(&Buffer::from_bytes(&packet)).is_err());
        packet[15] = 0x02;
        assert!(SctpParser::new(false).parse(&Buffer::from_bytes(&packet)).is_err());
    }

    #[test]
    fn crc32c_check_value() {
        // iSCSI / RFC 3720 reference vector.
        assert_eq!(crc32c(b"123456789"), 0xe306_9283);
        assert_eq!(crc32c(&[0u8; 32]), 0x8a91_36aa);
    }

    #[test]
    fn checksum_computation() {
        let header = SctpParser::new(false).parse(&Buffer::from_bytes(DATA_PACKET)).unwrap();
        let fields: Vec<(String, Buffer)> = header
            .fields
            .iter()
            .map(|f| {
                let value = if f.id == CHECKSUM {
                    Buffer::zeroes(32, Padding::Left)
                } else {
                    f.value.clone()
                };
                (f.id.clone(), value)
            })
            .collect();
        let checksum = compute_checksum(&fields, 3);
        assert_eq!(checksum, Buffer::from_bytes(&crc32c(DATA_PACKET).to_le_bytes()));
    }
}
