/*! Protocol numbers, stacks, and the parser factory.

The set of per-protocol parsers is a closed variant: the registry is a
match over protocol identifiers, used both by `predict_next` chaining
(IPv4 `Protocol`, IPv6 `Next Header`, UDP destination port) and by the
context loader resolving a `parser_id` string into a parser stack.
*/

use crate::coap::{CoapOptionMode, CoapParser};
use crate::ipv4::Ipv4Parser;
use crate::ipv6::Ipv6Parser;
use crate::parser::{HeaderParser, PacketParser};
use crate::sctp::SctpParser;
use crate::udp::UdpParser;
use crate::{Error, Result};

/// Identifier of a supported protocol, valued as it appears in the
/// preceding header's next-protocol field (a port number for CoAP).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProtocolId {
    /// RFC 791.
    Ipv4,
    /// RFC 8200.
    Ipv6,
    /// RFC 768.
    Udp,
    /// RFC 9260.
    Sctp,
    /// RFC 7252, over its default UDP port.
    Coap,
}

impl ProtocolId {
    /// Wire value announcing the protocol in the enclosing header.
    pub fn number(self) -> u64 {
        match self {
            Self::Ipv4 => 4,
            Self::Ipv6 => 6,
            Self::Udp => 17,
            Self::Sctp => 132,
            Self::Coap => 5683,
        }
    }

    /// Reverse of [`ProtocolId::number`].
    pub fn from_number(number: u64) -> Option<Self> {
        match number {
            4 => Some(Self::Ipv4),
            6 => Some(Self::Ipv6),
            17 => Some(Self::Udp),
            132 => Some(Self::Sctp),
            5683 => Some(Self::Coap),
            _ => None,
        }
    }

    /// Header id prefix / parser name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ipv4 => "IPv4",
            Self::Ipv6 => "IPv6",
            Self::Udp => "UDP",
            Self::Sctp => "SCTP",
            Self::Coap => "CoAP",
        }
    }

    /// Reverse of [`ProtocolId::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "IPv4" => Some(Self::Ipv4),
            "IPv6" => Some(Self::Ipv6),
            "UDP" => Some(Self::Udp),
            "SCTP" => Some(Self::Sctp),
            "CoAP" => Some(Self::Coap),
            _ => None,
        }
    }

    /// Instantiate the protocol's header parser. CoAP comes up in
    /// syntactic option mode; build a [`CoapParser`] directly for the
    /// semantic mode.
    pub fn parser(self, predict_next: bool) -> Box<dyn HeaderParser> {
        match self {
            Self::Ipv4 => Box::new(Ipv4Parser::new(predict_next)),
            Self::Ipv6 => Box::new(Ipv6Parser::new(predict_next)),
            Self::Udp => Box::new(UdpParser::new(predict_next)),
            Self::Sctp => Box::new(SctpParser::new(predict_next)),
            Self::Coap => Box::new(CoapParser::new(CoapOptionMode::Syntactic)),
        }
    }
}

// Statically declared stacks resolvable by name.
const STACKS: &[(&str, &[ProtocolId])] = &[
    ("IPv6-UDP-CoAP", &[ProtocolId::Ipv6, ProtocolId::Udp, ProtocolId::Coap]),
    ("IPv4-UDP-CoAP", &[ProtocolId::Ipv4, ProtocolId::Udp, ProtocolId::Coap]),
];

/// Resolve a context's `parser_id` into a parser stack: either a declared
/// pipeline name, or a single protocol name that predicts the rest of the
/// stack from next-protocol indicators.
pub fn packet_parser(parser_id: &str) -> Result<PacketParser> {
    if let Some((_, protocols)) = STACKS.iter().find(|(name, _)| *name == parser_id) {
        let parsers = protocols.iter().map(|p| p.parser(false)).collect();
        return Ok(PacketParser::new(parser_id, parsers));
    }
    match ProtocolId::from_name(parser_id) {
        Some(protocol) => Ok(PacketParser::new(parser_id, vec![protocol.parser(true)])),
        None => Err(Error::ContextConfig(format!("unknown parser id {parser_id:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_name_round_trip() {
        for p in [ProtocolId::Ipv4, ProtocolId::Ipv6, ProtocolId::Udp, ProtocolId::Sctp, ProtocolId::Coap] {
            assert_eq!(ProtocolId::from_number(p.number()), Some(p));
            assert_eq!(ProtocolId::from_name(p.name()), Some(p));
        }
        assert_eq!(ProtocolId::from_number(99), None);
    }

    #[test]
    fn parser_id_resolution() {
        assert_eq!(packet_parser("IPv6-UDP-CoAP").unwrap().id(), "IPv6-UDP-CoAP");
        assert_eq!(packet_parser("IPv6").unwrap().id(), "IPv6");
        assert!(packet_parser("QUIC").is_err());
    }
}
