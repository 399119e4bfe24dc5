/*! Header parsers and parser stacks.

A header parser decomposes the front of a bit buffer into the syntactic
fields of one protocol header; a [`PacketParser`] chains several of them
and hands whatever remains to the packet descriptor as payload. Parsers
never interpret bytes into abstract semantics: field values are the bits
as they sit on the wire (the CoAP semantic option mode is the one
documented exception, see [`crate::coap`]).
*/

use crate::buffer::Buffer;
use crate::rule::{Direction, HeaderDescriptor, PacketDescriptor};
use crate::{Error, Result};

/// One protocol header's parser.
///
/// Implementations are stateless apart from construction-time options, so
/// parser stacks can be shared across threads.
pub trait HeaderParser: Send + Sync {
    /// Protocol name, used as the field id prefix (`"IPv6"`, `"CoAP"`, ...).
    fn name(&self) -> &'static str;

    /// Cheap test whether the buffer can be this protocol's header, used
    /// by stack composition. Does not validate the whole header.
    fn matches(&self, buffer: &Buffer) -> bool;

    /// Decompose the front of the buffer into the header's fields.
    fn parse(&self, buffer: &Buffer) -> Result<HeaderDescriptor>;

    /// Rewrite decompressed semantic fields back into wire syntax. The
    /// default is the identity: most parsers emit wire syntax already.
    fn unparse(&self, fields: Vec<(String, Buffer)>) -> Result<Vec<(String, Buffer)>> {
        Ok(fields)
    }
}

/// An ordered pipeline of header parsers forming a protocol stack.
///
/// Either a statically declared pipeline (`IPv6 → UDP → CoAP`) or a
/// single entry parser constructed with `predict_next`, which chains
/// follow-on parsers by itself.
pub struct PacketParser {
    id: String,
    parsers: Vec<Box<dyn HeaderParser>>,
}

impl PacketParser {
    /// A named pipeline over the given parsers.
    pub fn new(id: &str, parsers: Vec<Box<dyn HeaderParser>>) -> Self {
        Self {
            id: id.to_string(),
            parsers,
        }
    }

    /// Stack identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run every parser in order; the bits no header claimed become the
    /// payload. Error positions are absolute within `buffer`.
    pub fn parse(&self, buffer: &Buffer, direction: Direction) -> Result<PacketDescriptor> {
        let mut fields = Vec::new();
        let mut rest = buffer.clone();
        let mut consumed = 0;
        for parser in &self.parsers {
            let header = parser.parse(&rest).map_err(|e| at_offset(e, consumed))?;
            rest = rest.slice(header.length..);
            consumed += header.length;
            fields.extend(header.fields);
        }
        Ok(PacketDescriptor {
            direction,
            fields,
            payload: rest,
            raw: buffer.clone(),
        })
    }

    /// Chain the parsers' `unparse` over a decompressed field list.
    pub fn unparse(&self, mut fields: Vec<(String, Buffer)>) -> Result<Vec<(String, Buffer)>> {
        for parser in &self.parsers {
            fields = parser.unparse(fields)?;
        }
        Ok(fields)
    }
}

// Rebase a parse error's position onto the packet start.
fn at_offset(e: Error, offset: usize) -> Error {
    match e {
        Error::Parse { position, reason } => Error::Parse {
            position: position + offset,
            reason,
        },
        other => other,
    }
}

/// Shorthand for the parse-failure variant.
pub(crate) fn parse_error(position: usize, reason: impl Into<String>) -> Error {
    Error::Parse {
        position,
        reason: reason.into(),
    }
}
