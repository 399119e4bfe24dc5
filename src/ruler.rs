/*! Rule selection.

Matches a parsed packet against a ruleset (field by field, in declared
order, restricted to the packet's direction), and recovers a rule from
the identifier prefix of a compressed packet. Identifiers are required
to be prefix-free within a ruleset, which the context loader enforces,
so prefix matching is unambiguous.
*/

use log::debug;

use crate::buffer::Buffer;
use crate::compressor::directional;
use crate::matching::field_match;
use crate::rule::{PacketDescriptor, RuleDescriptor, RuleNature};
use crate::{Error, Result};

/// A borrowing view over a ruleset.
pub struct Ruler<'a> {
    rules: &'a [RuleDescriptor],
}

impl<'a> Ruler<'a> {
    /// View over the rules, in their declared (priority) order.
    pub fn new(rules: &'a [RuleDescriptor]) -> Self {
        Self { rules }
    }

    /// The first rule whose direction-filtered field descriptors match
    /// the packet's fields pairwise. A no-compression rule matches any
    /// packet.
    pub fn match_packet(&self, packet: &PacketDescriptor) -> Result<&'a RuleDescriptor> {
        for rule in self.rules {
            if rule.nature == RuleNature::NoCompression {
                debug!("matched no-compression rule {}", rule.id);
                return Ok(rule);
            }
            let rule_fields = directional(rule, packet.direction);
            if rule_fields.len() != packet.fields.len() {
                continue;
            }
            if packet
                .fields
                .iter()
                .zip(&rule_fields)
                .all(|(pf, rf)| field_match(pf, rf))
            {
                debug!("matched rule {}", rule.id);
                return Ok(rule);
            }
        }
        Err(Error::NoRuleMatch(format!("{packet:?}")))
    }

    /// The rule whose identifier is a bit prefix of the compressed
    /// packet.
    pub fn match_schc_packet(&self, schc_packet: &Buffer) -> Result<&'a RuleDescriptor> {
        self.rules
            .iter()
            .find(|rule| {
                rule.id.len() <= schc_packet.len() && rule.id == schc_packet.slice(..rule.id.len())
            })
            .ok_or(Error::NoRuleIdMatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Padding;
    use crate::rule::{Action, Direction, FieldDescriptor, MatchingOperator, RuleFieldDescriptor};
    use crate::target_value::TargetValue;

    fn equal_field(id: &str, length: usize, value: u64, direction: Direction) -> RuleFieldDescriptor {
        RuleFieldDescriptor {
            id: id.to_string(),
            length,
            position: 0,
            direction,
            target_value: Some(TargetValue::from_uint(value, length).unwrap()),
            matching_operator: MatchingOperator::Equal,
            action: Action::NotSent,
        }
    }

    fn packet(direction: Direction, values: &[(&str, u64, usize)]) -> PacketDescriptor {
        PacketDescriptor::new(
            direction,
            values
                .iter()
                .map(|&(id, v, bits)| FieldDescriptor::new(id, Buffer::from_uint(v, bits).unwrap()))
                .collect(),
            Buffer::empty(Padding::Left),
        )
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = vec![
            RuleDescriptor::compression(
                Buffer::new(b"\x00", 2, Padding::Left),
                vec![equal_field("X:a", 8, 1, Direction::Bidirectional)],
            ),
            RuleDescriptor::compression(
                Buffer::new(b"\x01", 2, Padding::Left),
                vec![equal_field("X:a", 8, 2, Direction::Bidirectional)],
            ),
            RuleDescriptor::no_compression(Buffer::new(b"\x02", 2, Padding::Left)),
        ];
        let ruler = Ruler::new(&rules);
        let rule = ruler.match_packet(&packet(Direction::Up, &[("X:a", 2, 8)])).unwrap();
        assert_eq!(rule.id.uint(), 1);
        // Nothing matches field-wise, the no-compression rule catches.
        let rule = ruler.match_packet(&packet(Direction::Up, &[("X:a", 3, 8)])).unwrap();
        assert_eq!(rule.id.uint(), 2);
    }

    #[test]
    fn no_rule_match_is_an_error() {
        let rules = vec![RuleDescriptor::compression(
            Buffer::new(b"\x00", 2, Padding::Left),
            vec![equal_field("X:a", 8, 1, Direction::Bidirectional)],
        )];
        let ruler = Ruler::new(&rules);
        assert!(matches!(
            ruler.match_packet(&packet(Direction::Up, &[("X:a", 3, 8)])),
            Err(Error::NoRuleMatch(_))
        ));
    }

    #[test]
    fn direction_filtering() {
        // One up-only field: an up packet must carry it, a down packet
        // must not, even when every byte value agrees.
        let rules = vec![RuleDescriptor::compression(
            Buffer::new(b"\x00", 2, Padding::Left),
            vec![
                equal_field("X:a", 8, 1, Direction::Up),
                equal_field("X:b", 8, 2, Direction::Bidirectional),
            ],
        )];
        let ruler = Ruler::new(&rules);
        assert!(ruler
            .match_packet(&packet(Direction::Up, &[("X:a", 1, 8), ("X:b", 2, 8)]))
            .is_ok());
        assert!(ruler
            .match_packet(&packet(Direction::Down, &[("X:a", 1, 8), ("X:b", 2, 8)]))
            .is_err());
        assert!(ruler
            .match_packet(&packet(Direction::Down, &[("X:b", 2, 8)]))
            .is_ok());
    }

    #[test]
    fn prefix_match_on_rule_ids() {
        // Two- and three-bit identifiers, not byte aligned.
        let rules = vec![
            RuleDescriptor::no_compression(Buffer::new(b"\x00", 2, Padding::Left)),
            RuleDescriptor::no_compression(Buffer::new(b"\x05", 3, Padding::Left)),
        ];
        let ruler = Ruler::new(&rules);
        // 101xxxxx -> rule 0b101.
        let packet = Buffer::new(b"\xbe", 8, Padding::Left);
        assert_eq!(ruler.match_schc_packet(&packet).unwrap().id.len(), 3);
        // 00xxxxxx -> rule 0b00.
        let packet = Buffer::new(b"\x13", 8, Padding::Left);
        assert_eq!(ruler.match_schc_packet(&packet).unwrap().id.len(), 2);
        // 01xxxxxx -> nothing.
        let packet = Buffer::new(b"\x53", 8, Padding::Left);
        assert!(matches!(ruler.match_schc_packet(&packet), Err(Error::NoRuleIdMatch)));
    }
}
