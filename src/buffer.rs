/*! Bit-granular buffers.

A [`Buffer`] is an immutable-by-convention bit string of arbitrary length,
stored in whole bytes with a declared *padding side*: the unused bits of the
storage sit either before the first logical bit (left padding) or after the
last one (right padding). Parsers slice packets into left-padded field
values, the compressor packs residues into a right-padded stream, and
equality/hashing ignore the padding side entirely.

Storage is kept canonical: exactly `ceil(len/8)` bytes, padding bits zero.
*/

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, BitAnd, BitOr, Bound, RangeBounds};

use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Side of the byte storage holding the unused bits.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    /// Unused bits before the first logical bit.
    Left,
    /// Unused bits after the last logical bit.
    Right,
}

/// A bit string of arbitrary length with a declared padding side.
#[derive(Clone)]
pub struct Buffer {
    content: Vec<u8>,
    length: usize,
    padding: Padding,
}

// Read up to 8 bits starting at bit offset `off`, right-aligned in the
// returned byte. Reads past the end of `src` see zeros.
fn read_bits(src: &[u8], off: usize, n: usize) -> u8 {
    debug_assert!(n >= 1 && n <= 8);
    let hi = u16::from(src.get(off / 8).copied().unwrap_or(0)) << 8;
    let lo = u16::from(src.get(off / 8 + 1).copied().unwrap_or(0));
    (((hi | lo) >> (16 - off % 8 - n)) & ((1 << n) - 1)) as u8
}

// Bit-blit: OR `n` bits of `src` starting at `src_off` into `dst` starting
// at `dst_off`. Destination bits must be zero beforehand.
fn copy_bits(dst: &mut [u8], mut dst_off: usize, src: &[u8], mut src_off: usize, mut n: usize) {
    while n > 0 {
        let take = (8 - dst_off % 8).min(n);
        let chunk = read_bits(src, src_off, take);
        dst[dst_off / 8] |= chunk << (8 - dst_off % 8 - take);
        dst_off += take;
        src_off += take;
        n -= take;
    }
}

impl Buffer {
    /// Buffer over the `length` non-padding bits of `content`, padding
    /// on the given side.
    ///
    /// Storage wider than needed is trimmed, storage too narrow is extended
    /// with zero bits on the padding side, and padding bits are zeroed, so
    /// two buffers with the same logical bits compare byte-equal.
    pub fn new(content: &[u8], length: usize, padding: Padding) -> Self {
        let bytes = length.div_ceil(8);
        let pad = bytes * 8 - length;
        let mut out = vec![0u8; bytes];
        match padding {
            Padding::Left => {
                let skip = content.len().saturating_sub(bytes);
                let missing = bytes - (content.len() - skip);
                out[missing..].copy_from_slice(&content[skip..]);
                if pad > 0 {
                    out[0] &= 0xff >> pad;
                }
            }
            Padding::Right => {
                let keep = content.len().min(bytes);
                out[..keep].copy_from_slice(&content[..keep]);
                if pad > 0 {
                    out[bytes - 1] &= 0xff << pad;
                }
            }
        }
        Self {
            content: out,
            length,
            padding,
        }
    }

    /// Whole-byte buffer, left padded (no padding bits).
    pub fn from_bytes(content: &[u8]) -> Self {
        Self::new(content, content.len() * 8, Padding::Left)
    }

    /// Buffer from a hex string, one byte per digit pair.
    pub fn from_hex(hex: &str) -> Result<Self> {
        Ok(Self::from_bytes(&hex_decode(hex)?))
    }

    /// The empty buffer.
    pub fn empty(padding: Padding) -> Self {
        Self {
            content: Vec::new(),
            length: 0,
            padding,
        }
    }

    /// `length` zero bits.
    pub fn zeroes(length: usize, padding: Padding) -> Self {
        Self {
            content: vec![0u8; length.div_ceil(8)],
            length,
            padding,
        }
    }

    /// Big-endian unsigned integer as a `length`-bit buffer, left padded.
    /// Fails when the value does not fit.
    pub fn from_uint(value: u64, length: usize) -> Result<Self> {
        if length < 64 && value >> length != 0 {
            return Err(Error::ContextConfig(format!(
                "value {value} does not fit in {length} bits"
            )));
        }
        Ok(Self::new(&value.to_be_bytes(), length, Padding::Left))
    }

    /// Length in bits.
    pub fn len(&self) -> usize {
        self.length
    }

    /// True when the buffer holds no bits.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Declared padding side.
    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Byte storage, canonical for the padding side (padding bits zero).
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    // Number of padding bits, always < 8 on canonical storage.
    fn pad_count(&self) -> usize {
        self.content.len() * 8 - self.length
    }

    // Absolute bit position of logical bit 0 inside the storage.
    fn offset(&self) -> usize {
        match self.padding {
            Padding::Left => self.pad_count(),
            Padding::Right => 0,
        }
    }

    fn bit(&self, i: usize) -> bool {
        let abs = self.offset() + i;
        self.content[abs / 8] >> (7 - abs % 8) & 1 == 1
    }

    // Storage offset a fresh buffer of `length` bits gets for this side.
    fn offset_for(padding: Padding, length: usize) -> usize {
        match padding {
            Padding::Left => length.div_ceil(8) * 8 - length,
            Padding::Right => 0,
        }
    }

    /// Bits `[start, end)` of the logical sequence as a new buffer with the
    /// same padding side. Out-of-range bounds clamp to the buffer length.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Self {
        let start = match range.start_bound() {
            Bound::Included(&v) => v,
            Bound::Excluded(&v) => v + 1,
            Bound::Unbounded => 0,
        }
        .min(self.length);
        let end = match range.end_bound() {
            Bound::Included(&v) => v + 1,
            Bound::Excluded(&v) => v,
            Bound::Unbounded => self.length,
        }
        .clamp(start, self.length);
        let n = end - start;
        let mut out = vec![0u8; n.div_ceil(8)];
        copy_bits(
            &mut out,
            Self::offset_for(self.padding, n),
            &self.content,
            self.offset() + start,
            n,
        );
        Self {
            content: out,
            length: n,
            padding: self.padding,
        }
    }

    /// The last `n` bits (the counted-from-the-end slice).
    pub fn tail(&self, n: usize) -> Self {
        self.slice(self.length.saturating_sub(n)..)
    }

    /// Replace bits `[start, end)` with the bits of `src`, growing the
    /// buffer (with zero bits) when `end` lies past the current length.
    pub fn set_slice(&mut self, start: usize, end: usize, src: &Buffer) {
        assert_eq!(end - start, src.length, "slice/source length mismatch");
        let length = self.length.max(end);
        let mut out = vec![0u8; length.div_ceil(8)];
        let off = Self::offset_for(self.padding, length);
        copy_bits(&mut out, off, &self.content, self.offset(), start.min(self.length));
        copy_bits(&mut out, off + start, &src.content, src.offset(), src.length);
        if end < self.length {
            copy_bits(
                &mut out,
                off + end,
                &self.content,
                self.offset() + end,
                self.length - end,
            );
        }
        self.content = out;
        self.length = length;
    }

    /// Append the bits of `other`; the padding side stays this buffer's.
    pub fn extend(&mut self, other: &Buffer) {
        let length = self.length + other.length;
        match self.padding {
            Padding::Right => {
                // Bits already start at storage position 0, grow in place.
                self.content.resize(length.div_ceil(8), 0);
                copy_bits(&mut self.content, self.length, &other.content, other.offset(), other.length);
            }
            Padding::Left => {
                let mut out = vec![0u8; length.div_ceil(8)];
                let off = Self::offset_for(Padding::Left, length);
                copy_bits(&mut out, off, &self.content, self.offset(), self.length);
                copy_bits(&mut out, off + self.length, &other.content, other.offset(), other.length);
                self.content = out;
            }
        }
        self.length = length;
    }

    /// Shift: positive drops the `n` low-order bits (the length shrinks),
    /// negative appends `|n|` zero bits on the right (the length grows).
    pub fn shift(&self, n: isize) -> Self {
        if n >= 0 {
            let n = (n as usize).min(self.length);
            self.slice(..self.length - n)
        } else {
            let mut out = self.clone();
            out.extend(&Self::zeroes(n.unsigned_abs(), self.padding));
            out
        }
    }

    /// The same bits under the requested padding side.
    pub fn pad(&self, side: Padding) -> Self {
        if side == self.padding {
            return self.clone();
        }
        let mut out = vec![0u8; self.length.div_ceil(8)];
        copy_bits(
            &mut out,
            Self::offset_for(side, self.length),
            &self.content,
            self.offset(),
            self.length,
        );
        Self {
            content: out,
            length: self.length,
            padding: side,
        }
    }

    /// Successive `size`-bit sub-buffers; the last one is shorter unless
    /// `pad_last` extends it with zero bits.
    pub fn chunks(&self, size: usize, pad_last: bool) -> impl Iterator<Item = Buffer> + '_ {
        assert!(size > 0);
        (0..self.length).step_by(size).map(move |start| {
            let end = (start + size).min(self.length);
            let mut chunk = self.slice(start..end);
            if pad_last && end - start < size {
                chunk.extend(&Self::zeroes(size - (end - start), self.padding));
            }
            chunk
        })
    }

    /// Big-endian unsigned integer over the logical bits (at most 64).
    pub fn uint(&self) -> u64 {
        assert!(self.length <= 64, "buffer too long for uint: {} bits", self.length);
        self.pad(Padding::Left)
            .content
            .iter()
            .fold(0u64, |acc, &b| acc << 8 | u64::from(b))
    }

    /// The byte content decoded as UTF-8 text.
    pub fn text(&self) -> Result<String> {
        Ok(String::from_utf8(self.pad(Padding::Left).content)?)
    }

    /// Logical bits, most significant first, padding excluded.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.length).map(move |i| self.bit(i))
    }
}

impl PartialEq for Buffer {
    /// Equal iff the lengths match and the non-padding bits match; the
    /// padding side is a view, not a value.
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length
            && if self.padding == other.padding {
                self.content == other.content
            } else {
                self.content == other.pad(self.padding).content
            }
    }
}

impl Eq for Buffer {}

impl Hash for Buffer {
    /// Hash of the canonical left-padded representation, so semantically
    /// equal buffers hash equally.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        match self.padding {
            Padding::Left => self.content.hash(state),
            Padding::Right => self.pad(Padding::Left).content.hash(state),
        }
    }
}

impl Add<&Buffer> for Buffer {
    type Output = Buffer;
    fn add(mut self, rhs: &Buffer) -> Buffer {
        self.extend(rhs);
        self
    }
}

impl Add for &Buffer {
    type Output = Buffer;
    fn add(self, rhs: &Buffer) -> Buffer {
        let mut out = self.clone();
        out.extend(rhs);
        out
    }
}

impl AddAssign<&Buffer> for Buffer {
    fn add_assign(&mut self, rhs: &Buffer) {
        self.extend(rhs);
    }
}

impl BitOr for &Buffer {
    type Output = Buffer;
    fn bitor(self, rhs: &Buffer) -> Buffer {
        assert_eq!(self.len(), rhs.len(), "or: length mismatch");
        let rhs = rhs.pad(self.padding);
        Buffer {
            content: self.content.iter().zip(&rhs.content).map(|(a, b)| a | b).collect(),
            length: self.length,
            padding: self.padding,
        }
    }
}

impl BitAnd for &Buffer {
    type Output = Buffer;
    fn bitand(self, rhs: &Buffer) -> Buffer {
        assert_eq!(self.len(), rhs.len(), "and: length mismatch");
        let rhs = rhs.pad(self.padding);
        Buffer {
            content: self.content.iter().zip(&rhs.content).map(|(a, b)| a & b).collect(),
            length: self.length,
            padding: self.padding,
        }
    }
}

impl fmt::Display for Buffer {
    /// Byte-aligned buffers print as hex, ragged ones bit by bit with `-`
    /// marking the padding positions: `[---01000 00101000](13)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.length % 8 == 0 {
            let hex = self.content.iter().map(|b| format!("{b:02x}")).join("");
            return write!(f, "[{hex}]({})", self.length);
        }
        let pad = self.pad_count();
        let groups = self
            .content
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let bits = format!("{b:08b}");
                if i == 0 && self.padding == Padding::Left {
                    format!("{}{}", "-".repeat(pad), &bits[pad..])
                } else if i == self.content.len() - 1 && self.padding == Padding::Right {
                    format!("{}{}", &bits[..8 - pad], "-".repeat(pad))
                } else {
                    bits
                }
            })
            .join(" ");
        write!(f, "[{groups}]({})", self.length)
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.padding {
            Padding::Left => "left",
            Padding::Right => "right",
        };
        write!(f, "{self} {side}")
    }
}

#[derive(Serialize, Deserialize)]
struct BufferRepr {
    content: String,
    length: usize,
    padding: Padding,
}

impl Serialize for Buffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        BufferRepr {
            content: hex_encode(&self.content),
            length: self.length,
            padding: self.padding,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Buffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = BufferRepr::deserialize(deserializer)?;
        let bytes = hex_decode(&repr.content).map_err(serde::de::Error::custom)?;
        Ok(Buffer::new(&bytes, repr.length, repr.padding))
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(hex: &str) -> Result<Vec<u8>> {
    let hex: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if hex.len() % 2 != 0 {
        return Err(Error::ContextConfig(format!("odd hex length: {hex:?}")));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| Error::ContextConfig(format!("bad hex {:?}: {e}", &hex[i..i + 2])))
        })
        .collect()
}
