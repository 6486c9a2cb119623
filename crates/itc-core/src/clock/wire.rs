//! Compact binary encoding of stamps.
//!
//! A stamp is its identity bits followed by its event bits, packed MSB-first
//! and zero-padded to a whole byte.
//!
//! Identity, 2-bit tag:
//!
//! ```text
//! 00 b      leaf with value b
//! 01 <r>    (0, r)
//! 10 <l>    (l, 0)
//! 11 <l><r> (l, r)
//! ```
//!
//! Event, 1-bit tag:
//!
//! ```text
//! 1 nat            leaf, natural with base width 2
//! 0 00 <r>         (0, 0, r)
//! 0 01 <l>         (0, l, 0)
//! 0 10 <l><r>      (0, l, r)
//! 0 11 00 1 nat <r>     (n, 0, r)
//! 0 11 01 1 nat <l>     (n, l, 0)
//! 0 11 1  1 nat <l><r>  (n, l, r)
//! ```
//!
//! In the last three rows the node value travels as a leaf encoding (`1`
//! plus natural) ahead of the children.

use tracing::debug;

use super::event::Event;
use super::id::Id;
use super::stamp::Stamp;
use crate::bits::{BitReader, BitWriter, decode_natural, encode_natural};
use crate::config::CodecConfig;
use crate::error::DecodeError;

/// Base width for every natural in the event encoding.
const NATURAL_BASE: u32 = 2;

/// Word size that padded encoders round their output up to.
const PADDING_WORD_BYTES: usize = 4;

/// Append the encoding of an identity tree.
pub fn encode_id(id: &Id, out: &mut BitWriter) {
    match id {
        Id::Zero => {
            out.push(0, 2);
            out.push(0, 1);
        }
        Id::One => {
            out.push(0, 2);
            out.push(1, 1);
        }
        Id::Node(l, r) if l.is_zero() => {
            out.push(1, 2);
            encode_id(r, out);
        }
        Id::Node(l, r) if r.is_zero() => {
            out.push(2, 2);
            encode_id(l, out);
        }
        Id::Node(l, r) => {
            out.push(3, 2);
            encode_id(l, out);
            encode_id(r, out);
        }
    }
}

fn is_zero_leaf(event: &Event) -> bool {
    matches!(event, Event::Leaf(0))
}

/// Append the encoding of an event tree.
pub fn encode_event(event: &Event, out: &mut BitWriter) {
    let (value, l, r) = match event {
        Event::Leaf(n) => {
            out.push(1, 1);
            encode_natural(*n, NATURAL_BASE, out);
            return;
        }
        Event::Node(n, l, r) => (*n, l, r),
    };

    out.push(0, 1);
    if value == 0 {
        if is_zero_leaf(l) {
            out.push(0, 2);
            encode_event(r, out);
        } else if is_zero_leaf(r) {
            out.push(1, 2);
            encode_event(l, out);
        } else {
            out.push(2, 2);
            encode_event(l, out);
            encode_event(r, out);
        }
        return;
    }

    out.push(3, 2);
    if is_zero_leaf(l) {
        out.push(0, 1);
        out.push(0, 1);
        encode_event(&Event::leaf(value), out);
        encode_event(r, out);
    } else if is_zero_leaf(r) {
        out.push(0, 1);
        out.push(1, 1);
        encode_event(&Event::leaf(value), out);
        encode_event(l, out);
    } else {
        out.push(1, 1);
        encode_event(&Event::leaf(value), out);
        encode_event(l, out);
        encode_event(r, out);
    }
}

/// Recursive-descent decoder with a nesting limit.
struct Decoder<'r, 'a> {
    bits: &'r mut BitReader<'a>,
    max_depth: usize,
}

impl Decoder<'_, '_> {
    const fn enter(&self, depth: usize) -> Result<usize, DecodeError> {
        if depth >= self.max_depth {
            return Err(DecodeError::DepthExceeded(self.max_depth));
        }
        Ok(depth + 1)
    }

    fn id(&mut self, depth: usize) -> Result<Id, DecodeError> {
        match self.bits.pop(2)? {
            0 => Ok(if self.bits.pop(1)? == 0 {
                Id::Zero
            } else {
                Id::One
            }),
            1 => {
                let right = self.id(self.enter(depth)?)?;
                Ok(Id::collapse(Id::zero(), right))
            }
            2 => {
                let left = self.id(self.enter(depth)?)?;
                Ok(Id::collapse(left, Id::zero()))
            }
            _ => {
                let next = self.enter(depth)?;
                let left = self.id(next)?;
                let right = self.id(next)?;
                Ok(Id::collapse(left, right))
            }
        }
    }

    /// Decode an event subtree along with its largest effective count,
    /// which must fit a `u32` for the tree to be usable.
    fn event(&mut self, depth: usize) -> Result<(Event, u32), DecodeError> {
        if self.bits.pop(1)? == 1 {
            let value = decode_natural(NATURAL_BASE, self.bits)?;
            return Ok((Event::leaf(value), value));
        }

        let next = self.enter(depth)?;
        let zero = || (Event::zero(), 0);
        match self.bits.pop(2)? {
            0 => assemble(0, zero(), self.event(next)?),
            1 => assemble(0, self.event(next)?, zero()),
            2 => {
                let left = self.event(next)?;
                let right = self.event(next)?;
                assemble(0, left, right)
            }
            _ => {
                if self.bits.pop(1)? == 1 {
                    let value = self.node_value()?;
                    let left = self.event(next)?;
                    let right = self.event(next)?;
                    return assemble(value, left, right);
                }
                if self.bits.pop(1)? == 0 {
                    let value = self.node_value()?;
                    assemble(value, zero(), self.event(next)?)
                } else {
                    let value = self.node_value()?;
                    assemble(value, self.event(next)?, zero())
                }
            }
        }
    }

    /// The value of a nonzero-valued node, carried as a leaf encoding.
    fn node_value(&mut self) -> Result<u32, DecodeError> {
        let position = self.bits.position();
        if self.bits.pop(1)? != 1 {
            return Err(DecodeError::InconsistentTag {
                position,
                detail: "node value must be encoded as a leaf",
            });
        }
        decode_natural(NATURAL_BASE, self.bits)
    }
}

/// Normal node over decoded children, rejecting counts past `u32::MAX`.
fn assemble(
    value: u32,
    (left, left_max): (Event, u32),
    (right, right_max): (Event, u32),
) -> Result<(Event, u32), DecodeError> {
    let max = value
        .checked_add(left_max.max(right_max))
        .ok_or(DecodeError::NaturalOverflow)?;
    Ok((Event::collapse(value, left, right), max))
}

/// Decode one identity tree from `bits`.
///
/// # Errors
///
/// Any [`DecodeError`] raised by truncated input or by nesting deeper than
/// `config.max_depth`.
pub fn decode_id(bits: &mut BitReader<'_>, config: &CodecConfig) -> Result<Id, DecodeError> {
    Decoder {
        bits,
        max_depth: config.max_depth,
    }
    .id(0)
}

/// Decode one event tree from `bits`.
///
/// # Errors
///
/// Any [`DecodeError`] raised by truncated input, overflowing counters,
/// inconsistent tags or nesting deeper than `config.max_depth`.
pub fn decode_event(bits: &mut BitReader<'_>, config: &CodecConfig) -> Result<Event, DecodeError> {
    Decoder {
        bits,
        max_depth: config.max_depth,
    }
    .event(0)
    .map(|(event, _)| event)
}

impl Stamp {
    /// Append this stamp's encoding to `out`, field log included.
    pub fn encode_into(&self, out: &mut BitWriter) {
        encode_id(self.id(), out);
        encode_event(self.history(), out);
    }

    /// Encode to the compact binary form.
    #[must_use]
    pub fn marshal(&self) -> Vec<u8> {
        let mut out = BitWriter::new();
        self.encode_into(&mut out);
        out.into_bytes()
    }

    /// Decode a stamp with the default [`CodecConfig`].
    ///
    /// # Errors
    ///
    /// See [`Stamp::unmarshal_with`].
    pub fn unmarshal(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::unmarshal_with(bytes, &CodecConfig::default())
    }

    /// Decode a stamp, enforcing the limits in `config`.
    ///
    /// Bits after the stamp must be zero. Whole zero bytes past the last
    /// meaningful byte are accepted only up to the next 32-bit word, and
    /// only when `config.allow_word_padding` is set.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::InputTooLarge`] when `bytes` exceeds
    ///   `config.max_input_bytes`.
    /// - [`DecodeError::TrailingData`] when anything but permitted padding
    ///   follows the stamp.
    /// - Any error from [`decode_id`] or [`decode_event`].
    pub fn unmarshal_with(bytes: &[u8], config: &CodecConfig) -> Result<Self, DecodeError> {
        if bytes.len() > config.max_input_bytes {
            return Err(DecodeError::InputTooLarge {
                actual: bytes.len(),
                max: config.max_input_bytes,
            });
        }

        let mut bits = BitReader::new(bytes);
        let id = decode_id(&mut bits, config)?;
        let event = decode_event(&mut bits, config)?;

        let used_bytes = bits.position().div_ceil(8);
        let allowed_bytes = if config.allow_word_padding {
            used_bytes.next_multiple_of(PADDING_WORD_BYTES)
        } else {
            used_bytes
        };
        if !bits.rest_is_zero() || bytes.len() > allowed_bytes {
            debug!(
                consumed_bits = bits.position(),
                input_bytes = bytes.len(),
                "rejecting stamp with trailing data"
            );
            return Err(DecodeError::TrailingData(bits.remaining()));
        }

        Ok(Self::from_normal(id, event))
    }
}
