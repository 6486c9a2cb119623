//! MSB-first bit packing over byte buffers.
//!
//! [`BitWriter`] appends fixed-width fields, [`BitReader`] consumes them in
//! the same order. On top of these sits a universal code for naturals
//! ([`encode_natural`] / [`decode_natural`]): a run of `1` bits announces
//! how many times the payload width grew past the base width, a `0` bit
//! ends the run and the payload follows.
//!
//! ```text
//! encode_natural(5, 2):  1 0 001
//!                        │ │ └── 5 - 4 in 3 bits
//!                        │ └──── terminal
//!                        └────── 5 >= 2^2, widen to 3
//! ```

use std::fmt;

use crate::error::DecodeError;

/// Growth step of the backing buffer, in bytes.
const CHUNK_BYTES: usize = 4;

/// Widest field a single push/pop may carry.
pub const MAX_FIELD_BITS: u32 = 32;

/// One logged `(value, width)` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub value: u32,
    pub width: u32,
}

/// Appends fields to a packed MSB-first bit stream.
///
/// Every pushed field is also kept in an ordered log so encoded stamps can
/// be inspected as `<<value:width, ...>>`.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
    fields: Vec<Field>,
}

impl BitWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the low `width` bits of `value`.
    ///
    /// # Panics
    ///
    /// Panics if `width` exceeds [`MAX_FIELD_BITS`].
    pub fn push(&mut self, value: u32, width: u32) {
        assert!(
            width <= MAX_FIELD_BITS,
            "push: field width {width} exceeds {MAX_FIELD_BITS}"
        );
        self.fields.push(Field { value, width });
        for shift in (0..width).rev() {
            self.push_bit((value >> shift) & 1 == 1);
        }
    }

    fn push_bit(&mut self, bit: bool) {
        let byte_index = self.bit_len / 8;
        if byte_index == self.bytes.len() {
            self.bytes.resize(self.bytes.len() + CHUNK_BYTES, 0);
        }
        if bit {
            self.bytes[byte_index] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    /// Number of meaningful bits written so far.
    #[must_use]
    pub const fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// The field log, in push order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Meaningful bits rendered as `0`/`1` characters.
    #[must_use]
    pub fn bit_string(&self) -> String {
        (0..self.bit_len)
            .map(|idx| {
                if self.bytes[idx / 8] & (0x80 >> (idx % 8)) == 0 {
                    '0'
                } else {
                    '1'
                }
            })
            .collect()
    }

    /// The packed stream, trimmed to whole bytes. Unused low bits of the
    /// last byte are zero.
    #[must_use]
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.bytes.truncate(self.bit_len.div_ceil(8));
        self.bytes
    }
}

impl fmt::Display for BitWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<<")?;
        for (idx, field) in self.fields.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", field.value, field.width)?;
        }
        write!(f, ">>")
    }
}

/// Consumes fields from a packed MSB-first bit stream.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> BitReader<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    /// Read the next `width` bits as an unsigned integer.
    ///
    /// # Errors
    ///
    /// [`DecodeError::WidthTooLarge`] for widths over 32 bits and
    /// [`DecodeError::UnexpectedEof`] when fewer than `width` bits remain.
    /// The cursor does not move on error.
    pub fn pop(&mut self, width: u32) -> Result<u32, DecodeError> {
        if width > MAX_FIELD_BITS {
            return Err(DecodeError::WidthTooLarge(width));
        }
        let remaining = self.remaining();
        if (width as usize) > remaining {
            return Err(DecodeError::UnexpectedEof {
                needed: width,
                remaining,
            });
        }

        let mut value = 0u32;
        for _ in 0..width {
            let bit = (self.bytes[self.cursor / 8] >> (7 - (self.cursor % 8))) & 1;
            value = (value << 1) | u32::from(bit);
            self.cursor += 1;
        }
        Ok(value)
    }

    /// Bits consumed so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.cursor
    }

    /// Bits left in the buffer, padding included.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() * 8 - self.cursor
    }

    /// Whether every unread bit is zero.
    #[must_use]
    pub fn rest_is_zero(&self) -> bool {
        let byte_index = self.cursor / 8;
        if byte_index >= self.bytes.len() {
            return true;
        }
        let partial_mask = 0xffu8 >> (self.cursor % 8);
        self.bytes[byte_index] & partial_mask == 0
            && self.bytes[byte_index + 1..].iter().all(|byte| *byte == 0)
    }
}

/// Encode `value` with the universal code starting at `base` bits.
///
/// Widths grow by one per `1` prefix bit until the remainder fits.
pub fn encode_natural(value: u32, base: u32, out: &mut BitWriter) {
    let mut rest = value;
    let mut width = base;
    loop {
        match 1u32.checked_shl(width) {
            Some(span) if rest >= span => {
                out.push(1, 1);
                rest -= span;
                width += 1;
            }
            _ => {
                out.push(0, 1);
                out.push(rest, width);
                return;
            }
        }
    }
}

/// Decode a natural written by [`encode_natural`] with the same `base`.
///
/// # Errors
///
/// [`DecodeError::NaturalOverflow`] when the prefix implies a value beyond
/// `u32::MAX`, or any [`BitReader::pop`] error on truncated input.
pub fn decode_natural(base: u32, bits: &mut BitReader<'_>) -> Result<u32, DecodeError> {
    let mut offset = 0u32;
    let mut width = base;
    loop {
        if bits.pop(1)? == 0 {
            let payload = bits.pop(width)?;
            return offset
                .checked_add(payload)
                .ok_or(DecodeError::NaturalOverflow);
        }
        let span = 1u32
            .checked_shl(width)
            .ok_or(DecodeError::NaturalOverflow)?;
        offset = offset
            .checked_add(span)
            .ok_or(DecodeError::NaturalOverflow)?;
        width += 1;
    }
}
