/*! The facade: per-interface dispatch over ordered contexts.

An interface may carry several contexts; the engine tries each in order
and falls through on the recoverable failures (a parser that rejects the
packet, a ruleset with no matching rule or identifier). When every
context declines, the packet is returned unchanged: the no-compression
fallback at the facade level, applied even without an explicit
no-compression rule.
*/

use std::collections::HashMap;

use log::debug;

use crate::buffer::Buffer;
use crate::context::{Context, ContextManager};
use crate::rule::Direction;
use crate::{Error, Result};

/// Dispatches packets to the contexts of their interface.
pub struct Engine {
    managers: HashMap<String, Vec<ContextManager>>,
}

impl Engine {
    /// Build and validate one manager per context, grouped by interface
    /// in the given order.
    pub fn new(contexts: impl IntoIterator<Item = Context>) -> Result<Self> {
        let mut managers: HashMap<String, Vec<ContextManager>> = HashMap::new();
        for context in contexts {
            let interface = context.interface_id.clone();
            managers.entry(interface).or_default().push(ContextManager::new(context)?);
        }
        Ok(Self { managers })
    }

    fn contexts(&self, interface_id: &str) -> impl Iterator<Item = &ContextManager> {
        self.managers.get(interface_id).into_iter().flatten()
    }

    /// Compress with the first context of the interface that accepts the
    /// packet; an unparseable or unmatched packet passes through
    /// unchanged.
    pub fn compress(&self, packet: &Buffer, interface_id: &str, direction: Direction) -> Result<Buffer> {
        for manager in self.contexts(interface_id) {
            match manager.compress(packet, direction) {
                Ok(compressed) => return Ok(compressed),
                Err(e @ (Error::Parse { .. } | Error::NoRuleMatch(_))) => {
                    debug!("context {}: {e}, falling through", manager.context().id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(packet.clone())
    }

    /// Decompress with the first context recognizing the rule identifier
    /// prefix; an unrecognized packet passes through unchanged.
    pub fn decompress(&self, packet: &Buffer, interface_id: &str) -> Result<Buffer> {
        for manager in self.contexts(interface_id) {
            match manager.decompress(packet) {
                Ok(decompressed) => return Ok(decompressed),
                Err(e @ Error::NoRuleIdMatch) => {
                    debug!("context {}: {e}, falling through", manager.context().id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(packet.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Padding;
    use crate::rule::RuleDescriptor;

    fn no_compression_context(interface: &str, id_bits: u8) -> Context {
        Context {
            id: format!("ctx-{interface}-{id_bits}"),
            description: String::new(),
            interface_id: interface.to_string(),
            parser_id: "IPv6-UDP-CoAP".to_string(),
            ruleset: vec![RuleDescriptor::no_compression(Buffer::new(
                &[id_bits],
                2,
                Padding::Left,
            ))],
        }
    }

    #[test]
    fn unknown_interface_passes_through() {
        let engine = Engine::new([no_compression_context("eth0", 2)]).unwrap();
        let packet = Buffer::from_bytes(b"\x12\x34");
        assert_eq!(engine.compress(&packet, "wlan0", Direction::Up).unwrap(), packet);
        assert_eq!(engine.decompress(&packet, "wlan0").unwrap(), packet);
    }

    #[test]
    fn unparseable_packet_passes_through() {
        // Two bytes cannot be an IPv6 packet; the facade hands them back.
        let engine = Engine::new([no_compression_context("eth0", 2)]).unwrap();
        let packet = Buffer::from_bytes(b"\x12\x34");
        assert_eq!(engine.compress(&packet, "eth0", Direction::Up).unwrap(), packet);
    }

    #[test]
    fn unmatched_rule_id_passes_through() {
        let engine = Engine::new([no_compression_context("eth0", 2)]).unwrap();
        // Prefix 0b01 matches no rule id (the context holds 0b10).
        let packet = Buffer::new(b"\x55", 8, Padding::Left);
        assert_eq!(engine.decompress(&packet, "eth0").unwrap(), packet);
    }
}
