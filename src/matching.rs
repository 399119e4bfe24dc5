/*! Matching operators (RFC 8724 section 7.3).

A packet field matches a rule field when the identifiers agree and the
rule's matching operator accepts the value. Rule fields are assumed to be
listed in packet order, which makes a separate position check unnecessary.
*/

use crate::rule::{FieldDescriptor, MatchingOperator, RuleFieldDescriptor};
use crate::target_value::TargetValue;

/// Does this packet field satisfy this rule field's predicate?
pub fn field_match(packet_field: &FieldDescriptor, rule_field: &RuleFieldDescriptor) -> bool {
    if packet_field.id != rule_field.id {
        return false;
    }
    match rule_field.matching_operator {
        MatchingOperator::Ignore => true,
        MatchingOperator::Equal => matches!(
            &rule_field.target_value,
            Some(TargetValue::Literal(literal)) if *literal == packet_field.value
        ),
        MatchingOperator::Msb => most_significant_bits(packet_field, rule_field),
        MatchingOperator::MatchMapping => matches!(
            &rule_field.target_value,
            Some(TargetValue::Mapping(mapping)) if mapping.contains(&packet_field.value)
        ),
    }
}

// MSB(x): the pattern length leading bits of the field equal the target
// pattern. A fixed rule length must also match the field length, so the
// LSB residue width is unambiguous.
fn most_significant_bits(packet_field: &FieldDescriptor, rule_field: &RuleFieldDescriptor) -> bool {
    if rule_field.length != 0 && rule_field.length != packet_field.value.len() {
        return false;
    }
    match &rule_field.target_value {
        Some(TargetValue::Literal(pattern)) => {
            packet_field.value.slice(..pattern.len()) == *pattern
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Buffer, Padding};
    use crate::rule::{Action, Direction};
    use crate::target_value::MatchMapping;

    fn rule_field(id: &str, length: usize, mo: MatchingOperator, tv: Option<TargetValue>) -> RuleFieldDescriptor {
        RuleFieldDescriptor {
            id: id.to_string(),
            length,
            position: 0,
            direction: Direction::Bidirectional,
            target_value: tv,
            matching_operator: mo,
            action: Action::ValueSent,
        }
    }

    #[test]
    fn equal() {
        let pf = FieldDescriptor::new("X:f", Buffer::new(b"\x06", 4, Padding::Left));
        let rf = rule_field("X:f", 4, MatchingOperator::Equal, Some(TargetValue::from_uint(6, 4).unwrap()));
        assert!(field_match(&pf, &rf));
        let rf = rule_field("X:f", 4, MatchingOperator::Equal, Some(TargetValue::from_uint(7, 4).unwrap()));
        assert!(!field_match(&pf, &rf));
        // Identifier mismatch short-circuits even under ignore.
        let rf = rule_field("X:g", 4, MatchingOperator::Ignore, None);
        assert!(!field_match(&pf, &rf));
    }

    #[test]
    fn ignore() {
        let pf = FieldDescriptor::new("X:f", Buffer::from_bytes(b"\xde\xad"));
        let rf = rule_field("X:f", 16, MatchingOperator::Ignore, None);
        assert!(field_match(&pf, &rf));
    }

    #[test]
    fn msb() {
        // 38-bit field, 17-bit pattern 0x019ff9.
        let pattern = Buffer::new(b"\x01\x9f\xf9", 17, Padding::Left);
        let field = Buffer::new(b"\x33\xff\x2d\x88\x2d", 38, Padding::Left);
        let pf = FieldDescriptor::new("X:f", field.clone());
        let rf = rule_field("X:f", 38, MatchingOperator::Msb, Some(TargetValue::Literal(pattern.clone())));
        assert!(field_match(&pf, &rf));
        // Same bytes, wrong declared length.
        let rf = rule_field("X:f", 40, MatchingOperator::Msb, Some(TargetValue::Literal(pattern)));
        assert!(!field_match(&pf, &rf));
        // Pattern differs in its last bit.
        let pattern = Buffer::new(b"\x01\x9f\xf8", 17, Padding::Left);
        let rf = rule_field("X:f", 38, MatchingOperator::Msb, Some(TargetValue::Literal(pattern)));
        assert!(!field_match(&pf, &rf));
    }

    #[test]
    fn match_mapping() {
        let mapping = MatchMapping::from_values([
            Buffer::from_bytes(b"\x16\x33"),
            Buffer::from_bytes(b"\x16\x34"),
        ])
        .unwrap();
        let rf = rule_field("X:f", 16, MatchingOperator::MatchMapping, Some(mapping.into()));
        let hit = FieldDescriptor::new("X:f", Buffer::from_bytes(b"\x16\x34"));
        assert!(field_match(&hit, &rf));
        let miss = FieldDescriptor::new("X:f", Buffer::from_bytes(b"\x16\x35"));
        assert!(!field_match(&miss, &rf));
    }
}
