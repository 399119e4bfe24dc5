/*! Target values: what a rule field matches against and substitutes back.

A target value is either a fixed bit pattern or a finite bijective mapping
between field values and short indices. The mapping direction used on the
wire is value → index (compression); the reverse map is derived once at
construction and both lookups run on buffer hash.
*/

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::buffer::Buffer;
use crate::compute;
use crate::rule::{Action, Direction, MatchingOperator, RuleFieldDescriptor};
use crate::{Error, Result};

/// Fixed bit pattern or finite value↔index mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetValue {
    /// A literal bit string, used by equal/MSB matching and
    /// not-sent/LSB actions.
    Literal(Buffer),
    /// A finite mapping, used by match-mapping and mapping-sent.
    Mapping(MatchMapping),
}

impl TargetValue {
    /// Literal from an integer, range-checked against the bit length.
    pub fn from_uint(value: u64, length: usize) -> Result<Self> {
        Ok(Self::Literal(Buffer::from_uint(value, length)?))
    }

    /// Literal from bytes (length = 8 × byte count).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::Literal(Buffer::from_bytes(bytes))
    }

    /// The literal pattern, if this is one.
    pub fn literal(&self) -> Option<&Buffer> {
        match self {
            Self::Literal(buffer) => Some(buffer),
            Self::Mapping(_) => None,
        }
    }

    /// The mapping, if this is one.
    pub fn mapping(&self) -> Option<&MatchMapping> {
        match self {
            Self::Literal(_) => None,
            Self::Mapping(mapping) => Some(mapping),
        }
    }
}

impl From<MatchMapping> for TargetValue {
    fn from(mapping: MatchMapping) -> Self {
        Self::Mapping(mapping)
    }
}

impl From<Buffer> for TargetValue {
    fn from(buffer: Buffer) -> Self {
        Self::Literal(buffer)
    }
}

/// Finite bijection between field values and index buffers.
#[derive(Clone, Debug)]
pub struct MatchMapping {
    forward: HashMap<Buffer, Buffer>,
    reverse: HashMap<Buffer, Buffer>,
}

impl MatchMapping {
    /// Mapping from explicit (value, index) pairs.
    pub fn new(pairs: impl IntoIterator<Item = (Buffer, Buffer)>) -> Self {
        let forward: HashMap<Buffer, Buffer> = pairs.into_iter().collect();
        let reverse = forward.iter().map(|(v, i)| (i.clone(), v.clone())).collect();
        Self { forward, reverse }
    }

    /// Mapping over a value list with auto-assigned indices of minimal
    /// width: `ceil(log2(n))` bits for `n` values.
    pub fn from_values(values: impl IntoIterator<Item = Buffer>) -> Result<Self> {
        let values: Vec<Buffer> = values.into_iter().collect();
        if values.is_empty() {
            return Err(Error::ContextConfig("empty mapping".to_string()));
        }
        let width = (usize::BITS - (values.len() - 1).leading_zeros()) as usize;
        Ok(Self::new(values.into_iter().enumerate().map(|(i, value)| {
            let index = Buffer::from_uint(i as u64, width).expect("index fits by construction");
            (value, index)
        })))
    }

    /// Index for a field value.
    pub fn index_of(&self, value: &Buffer) -> Option<&Buffer> {
        self.forward.get(value)
    }

    /// Field value for an index.
    pub fn value_of(&self, index: &Buffer) -> Option<&Buffer> {
        self.reverse.get(index)
    }

    /// True when the field value is a mapping key.
    pub fn contains(&self, value: &Buffer) -> bool {
        self.forward.contains_key(value)
    }

    /// Bit width of the index buffers.
    pub fn index_length(&self) -> usize {
        self.reverse.keys().map(Buffer::len).max().unwrap_or(0)
    }

    /// (value, index) pairs, unordered.
    pub fn iter(&self) -> impl Iterator<Item = (&Buffer, &Buffer)> {
        self.forward.iter()
    }
}

impl PartialEq for MatchMapping {
    fn eq(&self, other: &Self) -> bool {
        self.forward == other.forward
    }
}

// JSON shape: a list of {index, value} records, sorted by index so the
// output is deterministic.
#[derive(Serialize, Deserialize)]
struct MappingEntry {
    index: Buffer,
    value: Buffer,
}

impl Serialize for MatchMapping {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut entries: Vec<MappingEntry> = self
            .forward
            .iter()
            .map(|(value, index)| MappingEntry {
                index: index.clone(),
                value: value.clone(),
            })
            .collect();
        entries.sort_by_key(|e| (e.index.len(), e.index.content().to_vec()));
        entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MatchMapping {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries = Vec::<MappingEntry>::deserialize(deserializer)?;
        Ok(Self::new(entries.into_iter().map(|e| (e.value, e.index))))
    }
}

/// Matching operator a target value implies for a field of the given
/// length: mappings match by mapping, shorter literals by their leading
/// bits, exact-length literals by equality, anything else is ignored.
pub fn select_mo(target_value: Option<&TargetValue>, field_length: usize) -> MatchingOperator {
    match target_value {
        None => MatchingOperator::Ignore,
        Some(TargetValue::Mapping(_)) => MatchingOperator::MatchMapping,
        Some(TargetValue::Literal(literal)) => {
            if literal.len() < field_length {
                MatchingOperator::Msb
            } else if literal.len() == field_length {
                MatchingOperator::Equal
            } else {
                MatchingOperator::Ignore
            }
        }
    }
}

/// Action the matching operator implies: equal fields are elided, MSB
/// fields send their tail, mapped fields send the index. Ignored fields
/// send their value, unless a compute function is registered for the id.
pub fn select_cda(matching_operator: MatchingOperator, field_id: &str) -> Action {
    match matching_operator {
        MatchingOperator::MatchMapping => Action::MappingSent,
        MatchingOperator::Msb => Action::Lsb,
        MatchingOperator::Equal => Action::NotSent,
        MatchingOperator::Ignore => {
            if compute::function(field_id).is_some() {
                Action::Compute
            } else {
                Action::ValueSent
            }
        }
    }
}

/// Rule field descriptors over a header layout (a protocol module's
/// `BASE_HEADER` table), deriving each field's matching operator and
/// action from its target value: pinned values are elided, prefixes go
/// MSB/LSB, value sets go through the mapping, everything else is sent
/// as-is, or recomputed when the field id has a registered
/// computation. Fields come out bidirectional; adjust afterwards for
/// direction-split rules.
pub fn rule_fields(
    layout: &[(&str, usize)],
    targets: &[(&str, TargetValue)],
) -> Vec<RuleFieldDescriptor> {
    layout
        .iter()
        .map(|&(id, length)| {
            let target_value = targets
                .iter()
                .find(|(target_id, _)| *target_id == id)
                .map(|(_, tv)| tv.clone());
            let matching_operator = select_mo(target_value.as_ref(), length);
            let action = select_cda(matching_operator, id);
            RuleFieldDescriptor {
                id: id.to_string(),
                length,
                position: 0,
                direction: Direction::Bidirectional,
                target_value,
                matching_operator,
                action,
            }
        })
        .collect()
}
