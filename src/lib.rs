#![warn(missing_docs)]
/*! Static Context Header Compression (SCHC) engine.

This crate implements the compression core of [RFC 8724][rfc8724]: sender
and receiver share a numbered ruleset (the *context*), and instead of full
IPv6/UDP/CoAP-style headers only a rule identifier plus the per-field
*residues* travel on the wire. Fields whose values the context pins down
cost zero bits; everything else is reconstructed at the peer from the same
rule, including computed fields such as lengths and checksums.

# Architecture overview

A packet flows through four stages:

```text
   [ raw bytes ]
        ↓
   [ PacketParser: decompose into bit-granular fields ]
        ↓
   [ Ruler: select the matching rule ]
        ↓
   [ compress: rule id ‖ residues ‖ payload ]
```

and back through the inverse pipeline, where the rule is recovered from its
identifier prefix and computed fields are re-derived from their neighbors.

Everything is expressed over [`Buffer`], a bit string of arbitrary length
with an explicit padding side. Rulesets load from JSON into [`Context`]
values, a [`ContextManager`] drives one context end to end, and the
[`Engine`] facade dispatches across the contexts of an interface.

# Example

A context with a single no-compression rule passes packets through with
only the two-bit rule identifier prepended:

```
use schc::{Buffer, Context, ContextManager, Direction};

let context: Context = serde_json::from_str(
    r#"{"id": "demo", "description": "pass-through",
        "interface_id": "lo", "parser_id": "IPv6-UDP-CoAP",
        "ruleset": [{"id": {"content": "02", "length": 2, "padding": "left"},
                     "nature": "no-compression"}]}"#,
)?;
let manager = ContextManager::new(context)?;

let packet = Buffer::from_hex(
    "60000000000c114020010db8000a0000000000000000000120010db8000a0000\
     000000000000000ad1001633000c000040010001",
)?;
let compressed = manager.compress(&packet, Direction::Up)?;
assert_eq!(compressed.len(), packet.len() + 2);
let restored = manager.decompress(&compressed)?;
assert_eq!(restored, packet);
# Ok::<(), anyhow::Error>(())
```

Fragmentation/reassembly (SCHC-F) is out of scope, as are packet capture
and CLI front ends: the engine consumes and produces bit buffers.

[rfc8724]: https://datatracker.ietf.org/doc/html/rfc8724
*/

pub mod buffer;
pub mod coap;
pub mod compressor;
pub mod compute;
pub mod context;
pub mod decompressor;
pub mod engine;
pub mod ipv4;
pub mod ipv6;
pub mod matching;
pub mod parser;
pub mod registry;
pub mod rule;
pub mod ruler;
pub mod sctp;
pub mod target_value;
pub mod udp;

pub use buffer::{Buffer, Padding};
pub use context::{Context, ContextManager};
pub use engine::Engine;
pub use parser::{HeaderParser, PacketParser};
pub use rule::{
    Action, Direction, FieldDescriptor, HeaderDescriptor, MatchingOperator, PacketDescriptor,
    RuleDescriptor, RuleFieldDescriptor, RuleNature,
};
pub use target_value::{MatchMapping, TargetValue};

/// Field identifier for the packet payload, used when compute functions
/// need to see the bits trailing the last rule field.
pub const PAYLOAD_ID: &str = "Payload";

/// SCHC engine error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A header parser ran out of buffer or met an impossible field value.
    #[error("parse error at bit {position}: {reason}")]
    Parse {
        /// Bit offset into the buffer handed to the failing parser.
        position: usize,
        /// What the parser objected to.
        reason: String,
    },

    /// No rule in the ruleset matches the parsed packet.
    #[error("no rule matches packet: {0}")]
    NoRuleMatch(String),

    /// No rule identifier is a prefix of the compressed packet.
    #[error("no rule id matches SCHC packet prefix")]
    NoRuleIdMatch,

    /// A semantic field name could not be mapped back to wire syntax.
    #[error("unparse error: {0}")]
    Unparse(String),

    /// The context is malformed; raised at load time, never per packet.
    #[error("context configuration error: {0}")]
    ContextConfig(String),

    /// Text decoding of a buffer failed.
    #[error("text decode error")]
    Text(#[from] std::string::FromUtf8Error),

    /// Context (de)serialization failed.
    #[error("context JSON error")]
    Json(#[from] serde_json::Error),

    /// Reading or writing a context file failed.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// SCHC engine result.
pub type Result<T, E = Error> = std::result::Result<T, E>;
