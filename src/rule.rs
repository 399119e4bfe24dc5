/*! RFC 8724 data model.

Descriptors for parsed packets (field, header, packet) and for rules
(per-field descriptors, rule, nature), plus the direction, matching
operator and compression action vocabularies. The serde attribute names
follow the JSON context format, so a ruleset written by one peer loads
unchanged at the other.
*/

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::buffer::{Buffer, Padding};
use crate::target_value::TargetValue;

/// Traffic direction a packet or rule field applies to.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Direction {
    /// Device to network.
    #[serde(rename = "Up")]
    Up,
    /// Network to device.
    #[serde(rename = "Dw")]
    Down,
    /// Both directions.
    #[serde(rename = "Bi")]
    Bidirectional,
}

/// Per-field predicate deciding whether a rule field accepts a packet field.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum MatchingOperator {
    /// Field value equals the target value.
    #[serde(rename = "equal")]
    Equal,
    /// Always matches.
    #[serde(rename = "ignore")]
    Ignore,
    /// The leading bits of the field equal the target pattern.
    #[serde(rename = "most-significant-bits")]
    Msb,
    /// The field value is a key of the target mapping.
    #[serde(rename = "match-mapping")]
    MatchMapping,
}

/// Per-field wire contract: what the compressor sends for the field.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Action {
    /// Nothing on the wire, the target value is implicit.
    #[serde(rename = "not-sent")]
    NotSent,
    /// Bits not covered by the MSB pattern.
    #[serde(rename = "least-significant-bits")]
    Lsb,
    /// The mapping index of the field value.
    #[serde(rename = "mapping-sent")]
    MappingSent,
    /// The field value verbatim.
    #[serde(rename = "value-sent")]
    ValueSent,
    /// Nothing on the wire, re-derived from neighbors at decompression.
    #[serde(rename = "compute")]
    Compute,
}

/// Whether a rule compresses or passes packets through.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum RuleNature {
    /// Field-by-field compression.
    #[serde(rename = "compression")]
    Compression,
    /// Rule id prepended, packet forwarded untouched.
    #[serde(rename = "no-compression")]
    NoCompression,
}

/// One parsed packet field: identifier, raw bits, repetition index.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// `"<Protocol>:<Field Name>"`, disambiguating repeats across layers.
    pub id: String,
    /// Field bits as they appear on the wire.
    pub value: Buffer,
    /// 1-based index among same-id fields of the packet; 0 when unique.
    pub position: usize,
}

impl FieldDescriptor {
    /// Field with position 0 (the only one of its id).
    pub fn new(id: &str, value: Buffer) -> Self {
        Self {
            id: id.to_string(),
            value,
            position: 0,
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}|{}]", self.id, self.value)
    }
}

/// One parsed protocol header: its fields in wire order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeaderDescriptor {
    /// Protocol name, e.g. `"IPv6"`.
    pub id: String,
    /// Header length in bits; equals the sum of the field lengths.
    pub length: usize,
    /// Fields in wire order.
    pub fields: Vec<FieldDescriptor>,
}

/// A fully parsed packet: header fields, trailing payload, raw bits.
#[derive(Clone, Serialize, Deserialize)]
pub struct PacketDescriptor {
    /// Direction the packet travels in.
    pub direction: Direction,
    /// All header fields, outermost protocol first.
    pub fields: Vec<FieldDescriptor>,
    /// Bits not covered by any header field.
    pub payload: Buffer,
    /// The original packet; fields ‖ payload reassembles it.
    pub raw: Buffer,
}

impl PacketDescriptor {
    /// Assemble a descriptor, recomputing `raw` from fields and payload.
    pub fn new(direction: Direction, fields: Vec<FieldDescriptor>, payload: Buffer) -> Self {
        let mut raw = Buffer::empty(Padding::Right);
        for field in &fields {
            raw += &field.value;
        }
        raw += &payload;
        Self {
            direction,
            fields,
            payload,
            raw,
        }
    }
}

impl fmt::Debug for PacketDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}|{}]",
            self.direction,
            self.fields.iter().map(|fd| format!("{fd:?}")).join(",")
        )
    }
}

/// One field of a compression rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleFieldDescriptor {
    /// Field identifier this descriptor applies to.
    pub id: String,
    /// Declared field length in bits; 0 means variable length, in which
    /// case value-sent and LSB residues are length-prefixed on the wire.
    pub length: usize,
    /// 1-based repetition index, 0 when the field is unique in the packet.
    #[serde(default)]
    pub position: usize,
    /// Direction filter for this field.
    pub direction: Direction,
    /// Literal or mapping matched against and substituted back in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<TargetValue>,
    /// Predicate used by the ruler.
    pub matching_operator: MatchingOperator,
    /// Wire contract used by the compressor and decompressor.
    #[serde(rename = "compression_decompression_action")]
    pub action: Action,
}

/// A rule: bit-string identifier, nature, ordered field descriptors.
///
/// Field descriptors are listed in the same order as the fields of the
/// packets the rule targets, so residues line up positionally.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleDescriptor {
    /// Rule identifier, prefix-free within its ruleset, not necessarily
    /// byte-aligned.
    pub id: Buffer,
    /// Compression or pass-through.
    #[serde(default = "default_nature")]
    pub nature: RuleNature,
    /// Per-field descriptors; empty for no-compression rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_descriptors: Vec<RuleFieldDescriptor>,
}

fn default_nature() -> RuleNature {
    RuleNature::Compression
}

impl RuleDescriptor {
    /// A compression rule over the given field descriptors.
    pub fn compression(id: Buffer, field_descriptors: Vec<RuleFieldDescriptor>) -> Self {
        Self {
            id,
            nature: RuleNature::Compression,
            field_descriptors,
        }
    }

    /// A pass-through rule carrying only its identifier.
    pub fn no_compression(id: Buffer) -> Self {
        Self {
            id,
            nature: RuleNature::NoCompression,
            field_descriptors: Vec::new(),
        }
    }
}
