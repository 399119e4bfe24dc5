/*! SCHC packet compression (RFC 8724 section 7.2).

The compressed packet is the rule identifier, the per-field residues in
rule order, and the uncovered payload, packed bit-exactly with no
alignment between parts. Residues of variable-length fields carry the
7.4.2 length prefix.
*/

use log::trace;

use crate::buffer::{Buffer, Padding};
use crate::rule::{Action, Direction, PacketDescriptor, RuleDescriptor, RuleFieldDescriptor, RuleNature};
use crate::target_value::TargetValue;

/// Compress a parsed packet with a rule the ruler matched against it.
///
/// For a no-compression rule the output is the rule id followed by the
/// raw packet. For a compression rule, residues are computed against the
/// rule fields applicable to the packet's direction: the same filtered
/// view the match was made on, so fields pair up positionally.
pub fn compress(packet: &PacketDescriptor, rule: &RuleDescriptor) -> Buffer {
    let mut out = Buffer::empty(Padding::Right);
    out += &rule.id;

    if rule.nature == RuleNature::NoCompression {
        out += &packet.raw;
        return out;
    }

    let rule_fields = directional(rule, packet.direction);
    debug_assert_eq!(packet.fields.len(), rule_fields.len(), "rule does not fit packet");

    for (pf, rf) in packet.fields.iter().zip(rule_fields) {
        let residue = match rf.action {
            Action::NotSent | Action::Compute => continue,
            Action::ValueSent => pf.value.clone(),
            Action::MappingSent => {
                let mapping = rf
                    .target_value
                    .as_ref()
                    .and_then(TargetValue::mapping)
                    .expect("mapping-sent rule field without mapping");
                mapping
                    .index_of(&pf.value)
                    .expect("field matched the mapping")
                    .clone()
            }
            Action::Lsb => {
                let pattern = rf
                    .target_value
                    .as_ref()
                    .and_then(TargetValue::literal)
                    .expect("LSB rule field without pattern");
                pf.value.slice(pattern.len()..)
            }
        };
        // Mapping indices have a known width; only value-sent and LSB
        // residues of variable-length fields carry a length prefix.
        if rf.length == 0 && matches!(rf.action, Action::ValueSent | Action::Lsb) {
            out += &encode_length(residue.len());
        }
        trace!("residue {}: {} bits", pf.id, residue.len());
        out += &residue;
    }

    out += &packet.payload;
    out
}

/// The rule fields applicable to a direction, in declared order.
pub(crate) fn directional(rule: &RuleDescriptor, direction: Direction) -> Vec<&RuleFieldDescriptor> {
    rule.field_descriptors
        .iter()
        .filter(|rf| rf.direction == direction || rf.direction == Direction::Bidirectional)
        .collect()
}

// Variable-length residue prefix (RFC 8724 section 7.4.2): 4 bits up to
// 14, an escape to 8 bits up to 254, a second escape to 16 bits beyond.
pub(crate) fn encode_length(length: usize) -> Buffer {
    debug_assert!(length < 1 << 16);
    if length < 15 {
        Buffer::new(&[length as u8], 4, Padding::Left)
    } else if length < 255 {
        Buffer::new(&[0x0f, length as u8], 12, Padding::Left)
    } else {
        let [hi, lo] = (length as u16).to_be_bytes();
        Buffer::new(&[0x0f, 0xff, hi, lo], 28, Padding::Left)
    }
}
