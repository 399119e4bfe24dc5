/*! Contexts and the per-context processing pipeline.

A [`Context`] is the unit both peers share: a ruleset, the parser stack
its rules are written against, and the interface it serves. Contexts are
validated once at load time (prefix-free rule identifiers, coherent
target values, registered and acyclic computed fields) so packet
processing never meets a configuration error.

A [`ContextManager`] drives one context: parse → match → compress on the
way out, prefix-match → decompress → unparse on the way back.
*/

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buffer::{Buffer, Padding};
use crate::compressor::compress;
use crate::compute;
use crate::decompressor::decompress;
use crate::parser::PacketParser;
use crate::registry;
use crate::rule::{Action, Direction, MatchingOperator, RuleDescriptor, RuleNature};
use crate::ruler::Ruler;
use crate::target_value::TargetValue;
use crate::{Error, Result};

/// A shared ruleset with its parser and interface bindings.
#[derive(Clone, Serialize, Deserialize)]
pub struct Context {
    /// Context identifier.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Interface this context serves; the facade dispatches on it.
    pub interface_id: String,
    /// Parser stack identifier, resolved through [`registry`].
    pub parser_id: String,
    /// Rules in priority order.
    pub ruleset: Vec<RuleDescriptor>,
}

impl Context {
    /// Load a context from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    /// Write the context as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        Ok(std::fs::write(path, serde_json::to_string_pretty(self)?)?)
    }
}

/// One context, its parser instance, and the ruler over its ruleset.
pub struct ContextManager {
    context: Context,
    parser: PacketParser,
}

impl ContextManager {
    /// Validate the context and resolve its parser from `parser_id`.
    pub fn new(context: Context) -> Result<Self> {
        let parser = registry::packet_parser(&context.parser_id)?;
        Self::with_parser(context, parser)
    }

    /// Validate the context, using a caller-built parser (e.g. a CoAP
    /// stack in semantic option mode).
    pub fn with_parser(context: Context, parser: PacketParser) -> Result<Self> {
        validate(&context)?;
        Ok(Self { context, parser })
    }

    /// The managed context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Parse a packet, match a rule, emit rule id ‖ residues ‖ payload.
    pub fn compress(&self, packet: &Buffer, direction: Direction) -> Result<Buffer> {
        let descriptor = self.parser.parse(packet, direction)?;
        let rule = Ruler::new(&self.context.ruleset).match_packet(&descriptor)?;
        Ok(compress(&descriptor, rule))
    }

    /// Recover the rule from the packet's identifier prefix, rebuild the
    /// fields, and reassemble the original bits (running the parser's
    /// `unparse` for stacks with semantic field forms).
    pub fn decompress(&self, schc_packet: &Buffer) -> Result<Buffer> {
        let rule = Ruler::new(&self.context.ruleset).match_schc_packet(schc_packet)?;
        let decompressed = decompress(schc_packet, rule);
        let fields = self.parser.unparse(decompressed.fields)?;
        let mut out = Buffer::empty(Padding::Right);
        for (_, value) in &fields {
            out += value;
        }
        out += &decompressed.payload;
        Ok(out)
    }
}

// Load-time validation: everything the hot path takes for granted.
fn validate(context: &Context) -> Result<()> {
    let ids: Vec<&Buffer> = context.ruleset.iter().map(|r| &r.id).collect();
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
            if long.slice(..short.len()) == **short {
                return Err(Error::ContextConfig(format!(
                    "rule ids are not prefix-free: {a} and {b}"
                )));
            }
        }
    }
    for rule in &context.ruleset {
        if rule.nature == RuleNature::NoCompression {
            continue;
        }
        for rf in &rule.field_descriptors {
            validate_field(rf)?;
        }
        validate_compute_order(rule)?;
    }
    Ok(())
}

fn validate_field(rf: &crate::rule::RuleFieldDescriptor) -> Result<()> {
    let literal = rf.target_value.as_ref().and_then(TargetValue::literal);
    let mapping = rf.target_value.as_ref().and_then(TargetValue::mapping);
    match rf.matching_operator {
        MatchingOperator::Equal => {
            let literal = literal.ok_or_else(|| {
                Error::ContextConfig(format!("{}: equal without a literal target", rf.id))
            })?;
            if rf.length != 0 && literal.len() > rf.length {
                return Err(Error::ContextConfig(format!(
                    "{}: equal target of {} bits exceeds the {}-bit field",
                    rf.id,
                    literal.len(),
                    rf.length
                )));
            }
        }
        MatchingOperator::Msb => {
            let literal = literal.ok_or_else(|| {
                Error::ContextConfig(format!("{}: MSB without a pattern", rf.id))
            })?;
            if rf.length != 0 && literal.len() > rf.length {
                return Err(Error::ContextConfig(format!(
                    "{}: MSB pattern of {} bits exceeds the {}-bit field",
                    rf.id,
                    literal.len(),
                    rf.length
                )));
            }
        }
        MatchingOperator::MatchMapping => {
            if mapping.is_none() {
                return Err(Error::ContextConfig(format!(
                    "{}: match-mapping without a mapping",
                    rf.id
                )));
            }
        }
        MatchingOperator::Ignore => {}
    }
    match rf.action {
        Action::NotSent if literal.is_none() => Err(Error::ContextConfig(format!(
            "{}: not-sent without a literal to restore",
            rf.id
        ))),
        Action::Lsb if literal.is_none() => Err(Error::ContextConfig(format!(
            "{}: LSB without a pattern to restore",
            rf.id
        ))),
        Action::MappingSent if mapping.is_none() => Err(Error::ContextConfig(format!(
            "{}: mapping-sent without a mapping",
            rf.id
        ))),
        Action::Compute if compute::function(&rf.id).is_none() => Err(Error::ContextConfig(
            format!("{}: no compute function registered", rf.id),
        )),
        _ => Ok(()),
    }
}

// Computed fields must admit an order: repeatedly peel off fields whose
// dependencies name no other still-pending computed field. Leftovers
// form a cycle.
fn validate_compute_order(rule: &RuleDescriptor) -> Result<()> {
    let mut pending: Vec<&str> = rule
        .field_descriptors
        .iter()
        .filter(|rf| rf.action == Action::Compute)
        .map(|rf| rf.id.as_str())
        .collect();
    loop {
        let ready = pending.iter().position(|id| {
            let (_, deps) = compute::function(id).expect("validated above");
            !deps.iter().any(|d| pending.contains(d) && d != id)
        });
        match ready {
            Some(i) => {
                pending.remove(i);
            }
            None if pending.is_empty() => return Ok(()),
            None => {
                return Err(Error::ContextConfig(format!(
                    "computed fields form a dependency cycle: {}",
                    pending.join(", ")
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::udp;

    fn context(ruleset: Vec<RuleDescriptor>) -> Context {
        Context {
            id: "test".to_string(),
            description: String::new(),
            interface_id: "eth0".to_string(),
            parser_id: "IPv6-UDP-CoAP".to_string(),
            ruleset,
        }
    }

    fn rule_field(
        id: &str,
        length: usize,
        mo: MatchingOperator,
        action: Action,
        tv: Option<TargetValue>,
    ) -> crate::rule::RuleFieldDescriptor {
        crate::rule::RuleFieldDescriptor {
            id: id.to_string(),
            length,
            position: 0,
            direction: Direction::Bidirectional,
            target_value: tv,
            matching_operator: mo,
            action,
        }
    }

    #[test]
    fn rejects_prefix_colliding_ids() {
        let ctx = context(vec![
            RuleDescriptor::no_compression(Buffer::new(b"\x01", 2, Padding::Left)),
            RuleDescriptor::no_compression(Buffer::new(b"\x02", 3, Padding::Left)),
        ]);
        // 0b01 is a prefix of 0b010.
        assert!(matches!(ContextManager::new(ctx), Err(Error::ContextConfig(_))));
    }

    #[test]
    fn rejects_oversized_equal_target() {
        let ctx = context(vec![RuleDescriptor::compression(
            Buffer::new(b"\x00", 2, Padding::Left),
            vec![rule_field(
                "X:a",
                4,
                MatchingOperator::Equal,
                Action::NotSent,
                Some(TargetValue::from_bytes(b"\xff")),
            )],
        )]);
        assert!(matches!(ContextManager::new(ctx), Err(Error::ContextConfig(_))));
    }

    #[test]
    fn rejects_unregistered_compute_field() {
        let ctx = context(vec![RuleDescriptor::compression(
            Buffer::new(b"\x00", 2, Padding::Left),
            vec![rule_field("X:a", 16, MatchingOperator::Ignore, Action::Compute, None)],
        )]);
        assert!(matches!(ContextManager::new(ctx), Err(Error::ContextConfig(_))));
    }

    #[test]
    fn accepts_registered_compute_fields() {
        let ctx = context(vec![RuleDescriptor::compression(
            Buffer::new(b"\x00", 2, Padding::Left),
            vec![
                rule_field(udp::LENGTH, 16, MatchingOperator::Ignore, Action::Compute, None),
                rule_field(udp::CHECKSUM, 16, MatchingOperator::Ignore, Action::Compute, None),
            ],
        )]);
        assert!(ContextManager::new(ctx).is_ok());
    }

    #[test]
    fn rejects_unknown_parser_id() {
        let ctx = Context {
            parser_id: "QUIC".to_string(),
            ..context(Vec::new())
        };
        assert!(ContextManager::new(ctx).is_err());
    }

    #[test]
    fn json_file_round_trip() {
        let ctx = context(vec![RuleDescriptor::no_compression(Buffer::new(
            b"\x02",
            2,
            Padding::Left,
        ))]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        ctx.save(&path).unwrap();
        let loaded = Context::load(&path).unwrap();
        assert_eq!(loaded.id, ctx.id);
        assert_eq!(loaded.ruleset.len(), 1);
        assert_eq!(loaded.ruleset[0].nature, RuleNature::NoCompression);
        assert_eq!(loaded.ruleset[0].id, ctx.ruleset[0].id);
    }
}
