/*! CoAP header parser (RFC 7252, plus the RFC 7959 block options).

CoAP is the odd one out for SCHC: compressing option values well means
*interpreting* the wire, because option identities are encoded as deltas
from one option to the next. Two modes are offered, chosen at parser
construction:

- *Syntactic* (the default): expose the raw `(delta, length, value)`
  triplets and their extension bytes exactly as they sit on the wire.
- *Semantic*: accumulate the running option number and emit one field per
  option, named for what it is (`Option Uri-Path`, `Option Block2`, and so on).
  Unrecognized numbers become `Option Unknown(n)`. The inverse,
  [`CoapParser::unparse`], rebuilds deltas and lengths from consecutive
  semantic options with the narrowest valid encoding.
*/

use std::collections::HashMap;

use crate::buffer::{Buffer, Padding};
use crate::parser::{parse_error, HeaderParser};
use crate::rule::{FieldDescriptor, HeaderDescriptor};
use crate::{Error, Result};

/// Header id / field prefix.
pub const HEADER_ID: &str = "CoAP";

/// Version field id.
pub const VERSION: &str = "CoAP:Version";
/// Type field id.
pub const TYPE: &str = "CoAP:Type";
/// Token Length field id.
pub const TOKEN_LENGTH: &str = "CoAP:Token Length";
/// Code field id.
pub const CODE: &str = "CoAP:Code";
/// Message ID field id.
pub const MESSAGE_ID: &str = "CoAP:Message ID";
/// Token field id.
pub const TOKEN: &str = "CoAP:Token";
/// Payload marker (0xff) field id.
pub const PAYLOAD_MARKER: &str = "CoAP:Payload Marker";

/// Syntactic option delta nibble field id.
pub const OPTION_DELTA: &str = "CoAP:Option Delta";
/// Syntactic option length nibble field id.
pub const OPTION_LENGTH: &str = "CoAP:Option Length";
/// Syntactic extended option delta field id.
pub const OPTION_DELTA_EXTENDED: &str = "CoAP:Option Delta Extended";
/// Syntactic extended option length field id.
pub const OPTION_LENGTH_EXTENDED: &str = "CoAP:Option Length Extended";
/// Syntactic option value field id.
pub const OPTION_VALUE: &str = "CoAP:Option Value";

// Semantic option field ids, one per known option number.
/// If-Match (1).
pub const OPTION_IF_MATCH: &str = "CoAP:Option If-Match";
/// Uri-Host (3).
pub const OPTION_URI_HOST: &str = "CoAP:Option Uri-Host";
/// ETag (4).
pub const OPTION_ETAG: &str = "CoAP:Option ETag";
/// If-None-Match (5).
pub const OPTION_IF_NONE_MATCH: &str = "CoAP:Option If-None-Match";
/// Uri-Port (7).
pub const OPTION_URI_PORT: &str = "CoAP:Option Uri-Port";
/// Location-Path (8).
pub const OPTION_LOCATION_PATH: &str = "CoAP:Option Location-Path";
/// Uri-Path (11).
pub const OPTION_URI_PATH: &str = "CoAP:Option Uri-Path";
/// Content-Format (12).
pub const OPTION_CONTENT_FORMAT: &str = "CoAP:Option Content-Format";
/// Max-Age (14).
pub const OPTION_MAX_AGE: &str = "CoAP:Option Max-Age";
/// Uri-Query (15).
pub const OPTION_URI_QUERY: &str = "CoAP:Option Uri-Query";
/// Accept (17).
pub const OPTION_ACCEPT: &str = "CoAP:Option Accept";
/// Location-Query (20).
pub const OPTION_LOCATION_QUERY: &str = "CoAP:Option Location-Query";
/// Block2 (23, RFC 7959).
pub const OPTION_BLOCK2: &str = "CoAP:Option Block2";
/// Block1 (27, RFC 7959).
pub const OPTION_BLOCK1: &str = "CoAP:Option Block1";
/// Proxy-Uri (35).
pub const OPTION_PROXY_URI: &str = "CoAP:Option Proxy-Uri";
/// Proxy-Scheme (39).
pub const OPTION_PROXY_SCHEME: &str = "CoAP:Option Proxy-Scheme";
/// Size1 (60).
pub const OPTION_SIZE1: &str = "CoAP:Option Size1";
/// Prefix for option numbers outside the vocabulary; the full id is
/// `CoAP:Option Unknown(<number>)`.
pub const OPTION_UNKNOWN: &str = "CoAP:Option Unknown";

const OPTIONS: &[(u64, &str)] = &[
    (1, OPTION_IF_MATCH),
    (3, OPTION_URI_HOST),
    (4, OPTION_ETAG),
    (5, OPTION_IF_NONE_MATCH),
    (7, OPTION_URI_PORT),
    (8, OPTION_LOCATION_PATH),
    (11, OPTION_URI_PATH),
    (12, OPTION_CONTENT_FORMAT),
    (14, OPTION_MAX_AGE),
    (15, OPTION_URI_QUERY),
    (17, OPTION_ACCEPT),
    (20, OPTION_LOCATION_QUERY),
    (23, OPTION_BLOCK2),
    (27, OPTION_BLOCK1),
    (35, OPTION_PROXY_URI),
    (39, OPTION_PROXY_SCHEME),
    (60, OPTION_SIZE1),
];

fn option_name(number: u64) -> Option<&'static str> {
    OPTIONS.iter().find(|(n, _)| *n == number).map(|&(_, name)| name)
}

// Inverse of option_name, accepting the Unknown(n) spelling.
fn option_number(id: &str) -> Option<u64> {
    if let Some(&(number, _)) = OPTIONS.iter().find(|(_, name)| *name == id) {
        return Some(number);
    }
    id.strip_prefix(OPTION_UNKNOWN)?
        .strip_prefix('(')?
        .strip_suffix(')')?
        .parse()
        .ok()
}

/// Fixed-part layout, for building rules with
/// [`crate::target_value::rule_fields`]. Token and option fields vary
/// per packet and are described rule by rule.
pub const BASE_HEADER: &[(&str, usize)] = &[
    (VERSION, 2),
    (TYPE, 2),
    (TOKEN_LENGTH, 4),
    (CODE, 8),
    (MESSAGE_ID, 16),
];

const PAYLOAD_MARKER_BYTE: u64 = 0xff;

/// How option fields are exposed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CoapOptionMode {
    /// Raw `(delta, length, value)` triplets and extension bytes.
    Syntactic,
    /// One field per option, named for the option it represents.
    Semantic,
}

/// RFC 7252 parser.
pub struct CoapParser {
    mode: CoapOptionMode,
}

impl CoapParser {
    /// Parser with the given option mode.
    pub fn new(mode: CoapOptionMode) -> Self {
        Self { mode }
    }
}

impl HeaderParser for CoapParser {
    fn name(&self) -> &'static str {
        HEADER_ID
    }

    fn matches(&self, buffer: &Buffer) -> bool {
        buffer.len() >= 32
    }

    fn parse(&self, buffer: &Buffer) -> Result<HeaderDescriptor> {
        //  0                   1                   2                   3
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |Ver| T |  TKL  |      Code     |          Message ID           |
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |   Token (if any, TKL bytes) ...
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |   Options (if any) ...
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        // |1 1 1 1 1 1 1 1|    Payload (if any) ...
        // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
        if buffer.len() < 32 {
            return Err(parse_error(
                buffer.len(),
                format!("CoAP header needs 32 bits, got {}", buffer.len()),
            ));
        }
        let token_length = buffer.slice(4..8);
        let token_bits = token_length.uint() as usize * 8;
        if buffer.len() < 32 + token_bits {
            return Err(parse_error(32, "CoAP token extends past the buffer"));
        }
        let mut fields = vec![
            FieldDescriptor::new(VERSION, buffer.slice(0..2)),
            FieldDescriptor::new(TYPE, buffer.slice(2..4)),
            FieldDescriptor::new(TOKEN_LENGTH, token_length),
            FieldDescriptor::new(CODE, buffer.slice(8..16)),
            FieldDescriptor::new(MESSAGE_ID, buffer.slice(16..32)),
        ];
        if token_bits > 0 {
            fields.push(FieldDescriptor::new(TOKEN, buffer.slice(32..32 + token_bits)));
        }
        let options = buffer.slice(32 + token_bits..);
        let (option_fields, option_bits) =
            parse_options(&options, self.mode).map_err(|e| offset(e, 32 + token_bits))?;
        fields.extend(option_fields);
        Ok(HeaderDescriptor {
            id: HEADER_ID.to_string(),
            length: 32 + token_bits + option_bits,
            fields,
        })
    }

    /// Semantic mode only: rewrite runs of semantic option fields into
    /// syntactic `(delta, length, value)` triplets, choosing the
    /// narrowest delta and length encoding for each option.
    fn unparse(&self, fields: Vec<(String, Buffer)>) -> Result<Vec<(String, Buffer)>> {
        if self.mode == CoapOptionMode::Syntactic {
            return Ok(fields);
        }
        let mut out = Vec::with_capacity(fields.len());
        let mut previous = 0u64;
        for (id, value) in fields {
            if !id.starts_with("CoAP:Option ") {
                out.push((id, value));
                continue;
            }
            let number = option_number(&id)
                .ok_or_else(|| Error::Unparse(format!("unrecognized option field {id:?}")))?;
            if number < previous {
                return Err(Error::Unparse(format!(
                    "option {id:?} out of order: {number} after {previous}"
                )));
            }
            let delta = number - previous;
            previous = number;
            let length = (value.len() / 8) as u64;

            out.push((OPTION_DELTA.to_string(), nibble(delta)));
            out.push((OPTION_LENGTH.to_string(), nibble(length)));
            if let Some(extended) = extended(delta) {
                out.push((OPTION_DELTA_EXTENDED.to_string(), extended));
            }
            if let Some(extended) = extended(length) {
                out.push((OPTION_LENGTH_EXTENDED.to_string(), extended));
            }
            if !value.is_empty() {
                out.push((OPTION_VALUE.to_string(), value));
            }
        }
        Ok(out)
    }
}

// Base nibble of a delta or length: the value itself, or the escape to
// an 8- or 16-bit extension (RFC 7252 section 3.1).
fn nibble(value: u64) -> Buffer {
    let nibble = if value < 13 {
        value as u8
    } else if value < 269 {
        13
    } else {
        14
    };
    Buffer::new(&[nibble], 4, Padding::Left)
}

fn extended(value: u64) -> Option<Buffer> {
    if value < 13 {
        None
    } else if value < 269 {
        Some(Buffer::new(&[(value - 13) as u8], 8, Padding::Left))
    } else {
        Some(Buffer::new(&((value - 269) as u16).to_be_bytes(), 16, Padding::Left))
    }
}

fn offset(e: Error, bits: usize) -> Error {
    match e {
        Error::Parse { position, reason } => Error::Parse {
            position: position + bits,
            reason,
        },
        other => other,
    }
}

//     0   1   2   3   4   5   6   7
// +---------------+---------------+
// |  Option Delta | Option Length |   1 byte
// +---------------+---------------+
// |      Option Delta extended    |   0-2 bytes
// |      Option Length extended   |   0-2 bytes
// |      Option Value             |   0 or more bytes
// +-------------------------------+
fn parse_options(
    buffer: &Buffer,
    mode: CoapOptionMode,
) -> Result<(Vec<FieldDescriptor>, usize)> {
    let mut fields = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut position = |id: &str| -> usize {
        let slot = positions.entry(id.to_string()).or_insert(0);
        *slot += 1;
        *slot
    };
    let mut cursor = 0;
    let mut option_number_acc = 0u64;

    while cursor < buffer.len() && buffer.slice(cursor..cursor + 8).uint() != PAYLOAD_MARKER_BYTE {
        if buffer.len() - cursor < 8 {
            return Err(parse_error(cursor, "CoAP option truncated"));
        }
        let delta = buffer.slice(cursor..cursor + 4);
        let length = buffer.slice(cursor + 4..cursor + 8);
        let mut offset = cursor + 8;

        let delta_extended = match delta.uint() {
            13 => Some(buffer.slice(offset..offset + 8)),
            14 => Some(buffer.slice(offset..offset + 16)),
            _ => None,
        };
        if let Some(extended) = &delta_extended {
            offset += extended.len();
        }
        let length_extended = match length.uint() {
            13 => Some(buffer.slice(offset..offset + 8)),
            14 => Some(buffer.slice(offset..offset + 16)),
            _ => None,
        };
        if let Some(extended) = &length_extended {
            offset += extended.len();
        }

        let value_bits = decode(&length, &length_extended)? as usize * 8;
        if offset + value_bits > buffer.len() {
            return Err(parse_error(
                offset,
                format!("CoAP option value of {value_bits} bits exceeds the buffer"),
            ));
        }
        let value = buffer.slice(offset..offset + value_bits);
        offset += value_bits;

        match mode {
            CoapOptionMode::Syntactic => {
                fields.push(FieldDescriptor {
                    id: OPTION_DELTA.to_string(),
                    position: position(OPTION_DELTA),
                    value: delta.clone(),
                });
                fields.push(FieldDescriptor {
                    id: OPTION_LENGTH.to_string(),
                    position: position(OPTION_LENGTH),
                    value: length,
                });
                if let Some(extended) = delta_extended.clone() {
                    fields.push(FieldDescriptor {
                        id: OPTION_DELTA_EXTENDED.to_string(),
                        position: position(OPTION_DELTA_EXTENDED),
                        value: extended,
                    });
                }
                if let Some(extended) = length_extended {
                    fields.push(FieldDescriptor {
                        id: OPTION_LENGTH_EXTENDED.to_string(),
                        position: position(OPTION_LENGTH_EXTENDED),
                        value: extended,
                    });
                }
                if !value.is_empty() {
                    fields.push(FieldDescriptor {
                        id: OPTION_VALUE.to_string(),
                        position: position(OPTION_VALUE),
                        value,
                    });
                }
            }
            CoapOptionMode::Semantic => {
                option_number_acc += decode(&delta, &delta_extended)?;
                let id = match option_name(option_number_acc) {
                    Some(name) => name.to_string(),
                    None => format!("{OPTION_UNKNOWN}({option_number_acc})"),
                };
                fields.push(FieldDescriptor {
                    position: position(&id),
                    id,
                    value,
                });
            }
        }
        cursor = offset;
    }

    if cursor < buffer.len() {
        fields.push(FieldDescriptor::new(
            PAYLOAD_MARKER,
            buffer.slice(cursor..cursor + 8),
        ));
        cursor += 8;
    }
    Ok((fields, cursor))
}

// A delta or length from its base nibble and extension: 0-12 plain,
// 13 + 8 more bits, or 269 + 16 more bits.
fn decode(base: &Buffer, extended: &Option<Buffer>) -> Result<u64> {
    match (base.uint(), extended) {
        (13, Some(extended)) => Ok(13 + extended.uint()),
        (14, Some(extended)) => Ok(269 + extended.uint()),
        (15, _) => Err(parse_error(0, "reserved CoAP option nibble 15")),
        (value, _) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Header with an 8-byte token, one Content-Format option, marker,
    // two payload bytes (the CoAP layer of a real sensor report).
    const TOKENED: &[u8] =
        b"\x68\x45\x22\xf6\xb8\x30\x0e\xfe\xe6\x62\x91\x22\xc1\x6e\xff\x5b\x7b";

    // Token-less header exercising plain, 8-bit and 16-bit extended
    // deltas: Uri-Path "temp", empty Content-Format, Size1, option 2000.
    const RAGGED: &[u8] =
        b"\x40\x01\x00\x01\xb4\x74\x65\x6d\x70\x10\xd1\x23\x44\xe1\x06\x87\x55\xff\x68\x69";

    #[test]
    fn parse_syntactic() {
        let header = CoapParser::new(CoapOptionMode::Syntactic)
            .parse(&Buffer::from_bytes(TOKENED))
            .unwrap();
        // 4 header bytes + 8 token + 2 option + 1 marker.
        assert_eq!(header.length, 15 * 8);
        let pairs: Vec<(&str, u64)> = header
            .fields
            .iter()
            .filter(|f| f.value.len() <= 64)
            .map(|f| (f.id.as_str(), f.value.uint()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (VERSION, 1),
                (TYPE, 2),
                (TOKEN_LENGTH, 8),
                (CODE, 0x45),
                (MESSAGE_ID, 0x22f6),
                (TOKEN, 0xb8300efee6629122),
                (OPTION_DELTA, 12),
                (OPTION_LENGTH, 1),
                (OPTION_VALUE, 0x6e),
                (PAYLOAD_MARKER, 0xff),
            ]
        );
    }

    #[test]
    fn parse_semantic() {
        let header = CoapParser::new(CoapOptionMode::Semantic)
            .parse(&Buffer::from_bytes(RAGGED))
            .unwrap();
        let options: Vec<(&str, usize, &Buffer)> = header
            .fields
            .iter()
            .filter(|f| f.id.starts_with("CoAP:Option "))
            .map(|f| (f.id.as_str(), f.position, &f.value))
            .collect();
        assert_eq!(options.len(), 4);
        assert_eq!(options[0].0, OPTION_URI_PATH);
        assert_eq!(options[0].2, &Buffer::from_bytes(b"temp"));
        assert_eq!(options[1].0, OPTION_CONTENT_FORMAT);
        assert!(options[1].2.is_empty());
        assert_eq!(options[2].0, OPTION_SIZE1);
        assert_eq!(options[2].2.uint(), 0x44);
        // 60 + 14-escape extension 0x0687 lands on option 2000.
        assert_eq!(options[3].0, "CoAP:Option Unknown(2000)");
        assert_eq!(options[3].1, 1);
        assert_eq!(options[3].2.uint(), 0x55);
    }

    #[test]
    fn semantic_unparse_matches_syntactic_parse() {
        for packet in [TOKENED, RAGGED] {
            let semantic = CoapParser::new(CoapOptionMode::Semantic);
            let parsed = semantic.parse(&Buffer::from_bytes(packet)).unwrap();
            let unparsed = semantic
                .unparse(parsed.fields.into_iter().map(|f| (f.id, f.value)).collect())
                .unwrap();
            let syntactic = CoapParser::new(CoapOptionMode::Syntactic)
                .parse(&Buffer::from_bytes(packet))
                .unwrap();
            let want: Vec<(String, Buffer)> =
                syntactic.fields.into_iter().map(|f| (f.id, f.value)).collect();
            assert_eq!(unparsed, want);
        }
    }

    #[test]
    fn unparse_passes_foreign_fields_through() {
        let fields = vec![
            ("IPv6:Version".to_string(), Buffer::new(b"\x06", 4, Padding::Left)),
            (OPTION_URI_PATH.to_string(), Buffer::from_bytes(b"x")),
        ];
        let out = CoapParser::new(CoapOptionMode::Semantic).unparse(fields).unwrap();
        assert_eq!(out[0].0, "IPv6:Version");
        assert_eq!(out[1].0, OPTION_DELTA);
        assert_eq!(out[1].1.uint(), 11);
    }

    #[test]
    fn unparse_rejects_unknown_names() {
        let fields = vec![("CoAP:Option Bogus".to_string(), Buffer::from_bytes(b"x"))];
        assert!(matches!(
            CoapParser::new(CoapOptionMode::Semantic).unparse(fields),
            Err(Error::Unparse(_))
        ));
    }

    #[test]
    fn repeated_options_take_positions() {
        // Two Uri-Path segments: "a" then "b" (delta 11, then 0).
        let packet = b"\x40\x01\x00\x01\xb1\x61\x01\x62";
        let header = CoapParser::new(CoapOptionMode::Semantic)
            .parse(&Buffer::from_bytes(packet))
            .unwrap();
        let paths: Vec<usize> = header
            .fields
            .iter()
            .filter(|f| f.id == OPTION_URI_PATH)
            .map(|f| f.position)
            .collect();
        assert_eq!(paths, vec![1, 2]);
    }

    #[test]
    fn truncated_token_is_a_parse_error() {
        // TKL says 8 bytes, only 2 present.
        let packet = b"\x68\x45\x22\xf6\xb8\x30";
        assert!(CoapParser::new(CoapOptionMode::Syntactic)
            .parse(&Buffer::from_bytes(packet))
            .is_err());
    }
}
