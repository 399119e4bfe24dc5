/*! SCHC packet decompression (RFC 8724 section 7.2).

The inverse of [`crate::compressor`]: strip the rule identifier, rebuild
each field from its residue (or from the rule's target value), and treat
whatever bits remain as payload. Computed fields are first emitted as
zero-filled placeholders, then resolved in dependency order once every
other field is in place, so a checksum can fold over the length field it
depends on.
*/

use log::trace;

use crate::buffer::{Buffer, Padding};
use crate::compute;
use crate::rule::{Action, RuleDescriptor, RuleNature};
use crate::target_value::TargetValue;
use crate::PAYLOAD_ID;

/// The decompressed form of one SCHC packet: the reconstructed fields in
/// rule order and the trailing payload.
pub struct DecompressedPacket {
    /// `(field id, reconstructed value)` pairs.
    pub fields: Vec<(String, Buffer)>,
    /// Bits following the last residue.
    pub payload: Buffer,
}

impl DecompressedPacket {
    /// Reassemble the packet: fields in order, payload last.
    pub fn to_buffer(&self) -> Buffer {
        let mut out = Buffer::empty(Padding::Right);
        for (_, value) in &self.fields {
            out += value;
        }
        out += &self.payload;
        out
    }
}

/// Decompress a packet against the rule whose identifier prefixes it.
pub fn decompress(schc_packet: &Buffer, rule: &RuleDescriptor) -> DecompressedPacket {
    let mut rest = schc_packet.slice(rule.id.len()..);

    if rule.nature == RuleNature::NoCompression {
        return DecompressedPacket {
            fields: Vec::new(),
            payload: rest,
        };
    }

    let mut fields: Vec<(String, Buffer)> = Vec::with_capacity(rule.field_descriptors.len() + 1);
    // (field index, compute function, dependency ids) awaiting pass two.
    let mut deferred = Vec::new();

    for rf in &rule.field_descriptors {
        let value = match rf.action {
            Action::NotSent => rf
                .target_value
                .as_ref()
                .and_then(TargetValue::literal)
                .expect("not-sent rule field without literal")
                .clone(),
            Action::MappingSent => {
                let mapping = rf
                    .target_value
                    .as_ref()
                    .and_then(TargetValue::mapping)
                    .expect("mapping-sent rule field without mapping");
                let mut decompressed = Buffer::empty(Padding::Right);
                for (value, index) in mapping.iter() {
                    if *index == rest.slice(..index.len()) {
                        rest = rest.slice(index.len()..);
                        decompressed = value.clone();
                        break;
                    }
                }
                decompressed
            }
            Action::Lsb => {
                let pattern = rf
                    .target_value
                    .as_ref()
                    .and_then(TargetValue::literal)
                    .expect("LSB rule field without pattern");
                let residue_bits = if rf.length == 0 {
                    let (bits, consumed) = decode_length(&rest);
                    rest = rest.slice(consumed..);
                    bits
                } else {
                    rf.length - pattern.len()
                };
                let value = pattern + &rest.slice(..residue_bits);
                rest = rest.slice(residue_bits..);
                value
            }
            Action::ValueSent if rf.length > 0 => {
                let value = rest.slice(..rf.length);
                rest = rest.slice(rf.length..);
                value
            }
            Action::ValueSent => {
                let (residue_bits, consumed) = decode_length(&rest);
                let value = rest.slice(consumed..consumed + residue_bits);
                rest = rest.slice(consumed + residue_bits..);
                value
            }
            Action::Compute => {
                // Zero-filled placeholder of the declared width, so
                // neighbors keep their offsets for pass two.
                let (function, dependencies) =
                    compute::function(&rf.id).expect("compute field without registration");
                deferred.push((fields.len(), function, dependencies));
                Buffer::zeroes(rf.length, Padding::Left)
            }
        };
        trace!("field {}: {} bits", rf.id, value.len());
        fields.push((rf.id.clone(), value));
    }

    // Compute pass: the payload joins the field list so length and
    // checksum functions can fold over it, then leaves again.
    fields.push((PAYLOAD_ID.to_string(), rest));
    resolve_computed(&mut fields, deferred);
    let payload = fields.pop().expect("payload entry just pushed").1;

    DecompressedPacket { fields, payload }
}

type Deferred = (usize, compute::ComputeFn, &'static [&'static str]);

// Run deferred computations, postponing any whose dependencies are
// themselves still placeholders. The loader rejects dependency cycles,
// so every round resolves at least one entry.
fn resolve_computed(fields: &mut Vec<(String, Buffer)>, mut deferred: Vec<Deferred>) {
    while !deferred.is_empty() {
        let unresolved: Vec<&str> = deferred
            .iter()
            .map(|&(position, _, _)| fields[position].0.as_str())
            .collect();
        let ready = deferred
            .iter()
            .position(|(_, _, deps)| !deps.iter().any(|d| unresolved.contains(d)));
        let Some(ready) = ready else {
            debug_assert!(false, "compute dependency cycle escaped load-time validation");
            return;
        };
        let (position, function, _) = deferred.remove(ready);
        let value = function(fields, position);
        fields[position].1 = value;
    }
}

// Inverse of the compressor's length encoding: 4 bits, or 4+8, or
// 4+8+16 when each stage is saturated.
fn decode_length(buffer: &Buffer) -> (usize, usize) {
    let short = buffer.slice(..4).uint() as usize;
    if short < 15 {
        return (short, 4);
    }
    let medium = buffer.slice(4..12).uint() as usize;
    if medium < 255 {
        return (medium, 12);
    }
    (buffer.slice(12..28).uint() as usize, 28)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::compress;
    use crate::rule::{Direction, FieldDescriptor, MatchingOperator, PacketDescriptor, RuleFieldDescriptor};
    use crate::target_value::MatchMapping;

    fn rule_field(id: &str, length: usize, mo: MatchingOperator, action: Action, tv: Option<TargetValue>) -> RuleFieldDescriptor {
        RuleFieldDescriptor {
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
    fn length_decoding() {
        for (encoded, bits, want_length, want_consumed) in [
            (&b"\x05"[..], 4, 5usize, 4usize),
            (b"\x0e", 4, 14, 4),
            (b"\x0f\x0f", 12, 15, 12),
            (b"\x0f\xfe", 12, 254, 12),
            (b"\x0f\xff\x00\xff", 28, 255, 28),
            (b"\x0f\xff\xff\xff", 28, 65535, 28),
        ] {
            let buffer = Buffer::new(encoded, bits, Padding::Left);
            assert_eq!(decode_length(&buffer), (want_length, want_consumed));
        }
    }

    #[test]
    fn lsb_reconstruction() {
        // 17-bit pattern, 21-bit residue, 38-bit field back.
        let field = Buffer::new(b"\x33\xff\x2d\x88\x2d", 38, Padding::Left);
        let pattern = Buffer::new(b"\x01\x9f\xf9", 17, Padding::Left);
        let rule = RuleDescriptor::compression(
            Buffer::new(b"\x00", 2, Padding::Left),
            vec![rule_field(
                "X:f",
                38,
                MatchingOperator::Msb,
                Action::Lsb,
                Some(TargetValue::Literal(pattern)),
            )],
        );
        let packet = PacketDescriptor::new(
            Direction::Up,
            vec![FieldDescriptor::new("X:f", field.clone())],
            Buffer::empty(Padding::Left),
        );
        let out = decompress(&compress(&packet, &rule), &rule);
        assert_eq!(out.fields.len(), 1);
        assert_eq!(out.fields[0].1, field);
        assert_eq!(out.to_buffer(), packet.raw);
    }

    #[test]
    fn mapping_and_not_sent_reconstruction() {
        let dst = Buffer::from_bytes(b"\x20\x01\x0d\xb8\x00\x0a\x00\x00\x00\x00\x00\x00\x00\x00\x00\x20");
        let mapping = MatchMapping::new([(dst.clone(), Buffer::from_uint(0, 2).unwrap())]);
        let rule = RuleDescriptor::compression(
            Buffer::new(b"\x03", 2, Padding::Left),
            vec![
                rule_field(
                    "X:a",
                    4,
                    MatchingOperator::Equal,
                    Action::NotSent,
                    Some(TargetValue::from_uint(6, 4).unwrap()),
                ),
                rule_field("X:b", 128, MatchingOperator::MatchMapping, Action::MappingSent, Some(mapping.into())),
            ],
        );
        let packet = PacketDescriptor::new(
            Direction::Up,
            vec![
                FieldDescriptor::new("X:a", Buffer::from_uint(6, 4).unwrap()),
                FieldDescriptor::new("X:b", dst.clone()),
            ],
            Buffer::from_bytes(b"\x99"),
        );
        let compressed = compress(&packet, &rule);
        // id (2) + mapping index (2) + payload (8).
        assert_eq!(compressed.len(), 12);
        let out = decompress(&compressed, &rule);
        assert_eq!(out.fields[0].1.uint(), 6);
        assert_eq!(out.fields[1].1, dst);
        assert_eq!(out.payload, Buffer::from_bytes(b"\x99"));
        assert_eq!(out.to_buffer(), packet.raw);
    }

    #[test]
    fn variable_length_round_trip() {
        let rule = RuleDescriptor::compression(
            Buffer::new(b"\x01", 3, Padding::Left),
            vec![rule_field("X:v", 0, MatchingOperator::Ignore, Action::ValueSent, None)],
        );
        for bits in [5usize, 14, 255] {
            let value = Buffer::new(&vec![0xa5; bits.div_ceil(8)], bits, Padding::Left);
            let packet = PacketDescriptor::new(
                Direction::Up,
                vec![FieldDescriptor::new("X:v", value.clone())],
                Buffer::empty(Padding::Left),
            );
            let out = decompress(&compress(&packet, &rule), &rule);
            assert_eq!(out.fields[0].1, value, "residue of {bits} bits");
        }
    }

    #[test]
    fn no_compression_round_trip() {
        let rule_id = Buffer::new(b"\x02", 2, Padding::Left);
        let payload = Buffer::from_bytes(b"\x20\x01\x0d\xb8\x00\x0a\x00\x00\x00\x00\x00\x00\x00\x00\x00\x20");
        let schc_packet = &rule_id + &payload;
        let rule = RuleDescriptor::no_compression(rule_id);
        let out = decompress(&schc_packet, &rule);
        assert!(out.fields.is_empty());
        assert_eq!(out.to_buffer(), payload);
    }
}
