// SPDX-License-Identifier: Apache-2.0
//! Streaming and synchronous MessagePack readers.
//!
//! [`Reader`] is the streaming core: every operation returns a
//! [`Decoded`] outcome and consumes no bytes unless it returns
//! [`Decoded::Value`]. The reader is `Copy`, so forking an independent
//! cursor for look-ahead costs two machine words.
//!
//! [`SyncReader`] shares the same decode logic and collapses the
//! streaming outcomes into `Result`, turning missing input into
//! [`ReadError::EndOfStream`].

use crate::code::{self, Family};
use crate::error::{try_decoded, Decoded, ReadError};

/// Structural depth counter with a hard ceiling.
#[derive(Debug, Clone)]
pub struct Depth {
    current: usize,
    limit: usize,
}

impl Depth {
    /// Creates a counter with the given ceiling.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self { current: 0, limit }
    }

    /// Enters one nesting level.
    ///
    /// # Errors
    /// Returns [`ReadError::DepthLimitExceeded`] when the ceiling would be
    /// crossed.
    pub fn enter(&mut self) -> Result<(), ReadError> {
        if self.current >= self.limit {
            return Err(ReadError::DepthLimitExceeded { limit: self.limit });
        }
        self.current += 1;
        Ok(())
    }

    /// Leaves one nesting level.
    pub fn exit(&mut self) {
        debug_assert!(self.current > 0, "unbalanced depth exit");
        self.current = self.current.saturating_sub(1);
    }

    /// Current nesting level.
    #[must_use]
    pub const fn current(&self) -> usize {
        self.current
    }

    /// Configured ceiling.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

/// A decoded integer token before narrowing.
///
/// Negative values are sign-extended to `i64` at decode time; everything
/// else is widened to `u64`. The split keeps the full 64-bit unsigned
/// range representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInt {
    /// Zero or positive value.
    Unsigned(u64),
    /// Strictly negative value.
    Negative(i64),
}

impl RawInt {
    /// Checked conversion to `u64`.
    #[must_use]
    pub const fn as_u64(self) -> Option<u64> {
        match self {
            Self::Unsigned(v) => Some(v),
            Self::Negative(_) => None,
        }
    }

    /// Checked conversion to `i64`.
    #[must_use]
    pub const fn as_i64(self) -> Option<i64> {
        match self {
            Self::Unsigned(v) if v <= i64::MAX as u64 => Some(v as i64),
            Self::Unsigned(_) => None,
            Self::Negative(v) => Some(v),
        }
    }

    /// Lossless conversion to `f64` (widening, per the float read ops).
    #[must_use]
    pub fn widen_f64(self) -> f64 {
        match self {
            Self::Unsigned(v) => v as f64,
            Self::Negative(v) => v as f64,
        }
    }
}

/// Integer types that a decoded [`RawInt`] can narrow into.
pub trait FromMsgInt: Sized {
    /// Checked narrowing; `None` signals overflow.
    fn from_raw(raw: RawInt) -> Option<Self>;
}

macro_rules! impl_from_msg_int {
    ($($t:ty),*) => {$(
        impl FromMsgInt for $t {
            fn from_raw(raw: RawInt) -> Option<Self> {
                match raw {
                    RawInt::Unsigned(v) => Self::try_from(v).ok(),
                    RawInt::Negative(v) => Self::try_from(v).ok(),
                }
            }
        }
    )*};
}

impl_from_msg_int!(u8, u16, u32, u64, i8, i16, i32, i64);

/// Parsed extension-token header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionHeader {
    /// Signed 8-bit application type code; negative codes are reserved.
    pub type_code: i8,
    /// Payload length in bytes.
    pub len: u32,
}

/// One decoded MessagePack token.
///
/// String, binary and extension payloads borrow from the input buffer and
/// are only valid while it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    /// Nil.
    Nil,
    /// Boolean.
    Bool(bool),
    /// Any integer encoding.
    Int(RawInt),
    /// float32.
    F32(f32),
    /// float64.
    F64(f64),
    /// UTF-8 payload of a str-family token (not yet validated).
    Str(&'a [u8]),
    /// Payload of a bin-family token.
    Bin(&'a [u8]),
    /// Array header; the next `n` tokens are the elements.
    Array(u32),
    /// Map header; the next `2n` tokens alternate keys and values.
    Map(u32),
    /// Extension token with its payload.
    Ext {
        /// Signed 8-bit type code.
        type_code: i8,
        /// Opaque payload bytes.
        data: &'a [u8],
    },
}

/// Streaming MessagePack reader over a byte slice.
///
/// All operations follow the same contract: on [`Decoded::Value`] the
/// cursor has advanced past the token; on any other outcome the cursor is
/// exactly where it was before the call.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader over `buf` starting at offset zero.
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Byte offset of the cursor from the start of the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// The complete input buffer, independent of the cursor.
    #[must_use]
    pub const fn input(&self) -> &'a [u8] {
        self.buf
    }

    /// Unread remainder of the input.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Number of unread bytes.
    #[must_use]
    pub const fn remaining_len(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns the next `n` bytes without consuming them.
    fn need(&self, n: usize) -> Decoded<&'a [u8]> {
        let have = self.remaining_len();
        if have < n {
            Decoded::Insufficient(n - have)
        } else {
            Decoded::Value(&self.buf[self.pos..self.pos + n])
        }
    }

    fn take(&mut self, n: usize) -> Decoded<&'a [u8]> {
        let bytes = try_decoded!(self.need(n));
        self.pos += n;
        Decoded::Value(bytes)
    }

    fn take_u8(&mut self) -> Decoded<u8> {
        self.take(1).map(|b| b[0])
    }

    fn take_u16(&mut self) -> Decoded<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn take_u32(&mut self) -> Decoded<u32> {
        self.take(4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_u64(&mut self) -> Decoded<u64> {
        self.take(8).map(|b| {
            u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        })
    }

    /// Returns the lead byte of the next token without consuming it.
    pub fn peek_code(&self) -> Decoded<u8> {
        self.need(1).map(|b| b[0])
    }

    /// Consumes a Nil token.
    ///
    /// Mismatch means the next token is something other than Nil and was
    /// left in place.
    pub fn try_read_nil(&mut self) -> Decoded<()> {
        let lead = try_decoded!(self.peek_code());
        if lead == code::NIL {
            self.pos += 1;
            Decoded::Value(())
        } else {
            Decoded::Mismatch(lead)
        }
    }

    /// Reads a boolean token.
    pub fn read_bool(&mut self) -> Decoded<bool> {
        let lead = try_decoded!(self.peek_code());
        match lead {
            code::FALSE => {
                self.pos += 1;
                Decoded::Value(false)
            }
            code::TRUE => {
                self.pos += 1;
                Decoded::Value(true)
            }
            other => Decoded::Mismatch(other),
        }
    }

    /// Reads any integer encoding without narrowing.
    ///
    /// Negative fixints are sign-extended before being reported.
    pub fn read_int_raw(&mut self) -> Decoded<RawInt> {
        let mut p = *self;
        let lead = try_decoded!(p.take_u8());
        let raw = match lead {
            0x00..=0x7f => RawInt::Unsigned(u64::from(lead)),
            0xe0..=0xff => RawInt::Negative(i64::from(lead as i8)),
            code::UINT8 => RawInt::Unsigned(u64::from(try_decoded!(p.take_u8()))),
            code::UINT16 => RawInt::Unsigned(u64::from(try_decoded!(p.take_u16()))),
            code::UINT32 => RawInt::Unsigned(u64::from(try_decoded!(p.take_u32()))),
            code::UINT64 => RawInt::Unsigned(try_decoded!(p.take_u64())),
            code::INT8 => {
                let v = i64::from(try_decoded!(p.take_u8()) as i8);
                if v < 0 {
                    RawInt::Negative(v)
                } else {
                    RawInt::Unsigned(v as u64)
                }
            }
            code::INT16 => {
                let v = i64::from(try_decoded!(p.take_u16()) as i16);
                if v < 0 {
                    RawInt::Negative(v)
                } else {
                    RawInt::Unsigned(v as u64)
                }
            }
            code::INT32 => {
                let v = i64::from(try_decoded!(p.take_u32()) as i32);
                if v < 0 {
                    RawInt::Negative(v)
                } else {
                    RawInt::Unsigned(v as u64)
                }
            }
            code::INT64 => {
                let v = try_decoded!(p.take_u64()) as i64;
                if v < 0 {
                    RawInt::Negative(v)
                } else {
                    RawInt::Unsigned(v as u64)
                }
            }
            other => return Decoded::Mismatch(other),
        };
        *self = p;
        Decoded::Value(raw)
    }

    /// Reads any integer encoding and narrows it to `T` with an overflow
    /// check.
    pub fn read_int<T: FromMsgInt>(&mut self) -> Decoded<T> {
        let snap = *self;
        let raw = try_decoded!(self.read_int_raw());
        match T::from_raw(raw) {
            Some(v) => Decoded::Value(v),
            None => {
                *self = snap;
                Decoded::Invalid(ReadError::Overflow)
            }
        }
    }

    /// Reads a float32 token, widening integer tokens when encountered.
    pub fn read_f32(&mut self) -> Decoded<f32> {
        let mut p = *self;
        let lead = try_decoded!(p.peek_code());
        let value = match lead {
            code::FLOAT32 => {
                p.pos += 1;
                f32::from_bits(try_decoded!(p.take_u32()))
            }
            _ if Family::of(lead) == Family::Integer => {
                try_decoded!(p.read_int_raw()).widen_f64() as f32
            }
            other => return Decoded::Mismatch(other),
        };
        *self = p;
        Decoded::Value(value)
    }

    /// Reads a float64 token, widening float32 and integer tokens when
    /// encountered.
    pub fn read_f64(&mut self) -> Decoded<f64> {
        let mut p = *self;
        let lead = try_decoded!(p.peek_code());
        let value = match lead {
            code::FLOAT64 => {
                p.pos += 1;
                f64::from_bits(try_decoded!(p.take_u64()))
            }
            code::FLOAT32 => {
                p.pos += 1;
                f64::from(f32::from_bits(try_decoded!(p.take_u32())))
            }
            _ if Family::of(lead) == Family::Integer => {
                try_decoded!(p.read_int_raw()).widen_f64()
            }
            other => return Decoded::Mismatch(other),
        };
        *self = p;
        Decoded::Value(value)
    }

    /// Reads an array header and returns the element count.
    ///
    /// Guards against over-allocation: the remaining buffer must hold at
    /// least one byte per declared element, otherwise the token is
    /// reported as incomplete.
    pub fn read_array_header(&mut self) -> Decoded<u32> {
        let mut p = *self;
        let lead = try_decoded!(p.take_u8());
        let count = match lead {
            0x90..=0x9f => u32::from(lead & 0x0f),
            code::ARRAY16 => u32::from(try_decoded!(p.take_u16())),
            code::ARRAY32 => try_decoded!(p.take_u32()),
            other => return Decoded::Mismatch(other),
        };
        let needed = count as usize;
        if p.remaining_len() < needed {
            return Decoded::Insufficient(needed - p.remaining_len());
        }
        *self = p;
        Decoded::Value(count)
    }

    /// Reads a map header and returns the pair count.
    ///
    /// Guards against over-allocation: the remaining buffer must hold at
    /// least two bytes per declared pair.
    pub fn read_map_header(&mut self) -> Decoded<u32> {
        let mut p = *self;
        let lead = try_decoded!(p.take_u8());
        let count = match lead {
            0x80..=0x8f => u32::from(lead & 0x0f),
            code::MAP16 => u32::from(try_decoded!(p.take_u16())),
            code::MAP32 => try_decoded!(p.take_u32()),
            other => return Decoded::Mismatch(other),
        };
        let needed = (count as usize).saturating_mul(2);
        if p.remaining_len() < needed {
            return Decoded::Insufficient(needed - p.remaining_len());
        }
        *self = p;
        Decoded::Value(count)
    }

    /// Reads a str-family token and returns its UTF-8 payload bytes.
    ///
    /// Validation is deferred; use [`Reader::read_str`] to validate.
    pub fn read_str_slice(&mut self) -> Decoded<&'a [u8]> {
        let mut p = *self;
        let lead = try_decoded!(p.take_u8());
        let len = match lead {
            0xa0..=0xbf => usize::from(lead & 0x1f),
            code::STR8 => usize::from(try_decoded!(p.take_u8())),
            code::STR16 => usize::from(try_decoded!(p.take_u16())),
            code::STR32 => try_decoded!(p.take_u32()) as usize,
            other => return Decoded::Mismatch(other),
        };
        let payload = try_decoded!(p.take(len));
        *self = p;
        Decoded::Value(payload)
    }

    /// Reads a str-family token as validated UTF-8.
    pub fn read_str(&mut self) -> Decoded<&'a str> {
        let snap = *self;
        let bytes = try_decoded!(self.read_str_slice());
        match std::str::from_utf8(bytes) {
            Ok(s) => Decoded::Value(s),
            Err(_) => {
                *self = snap;
                Decoded::Invalid(ReadError::InvalidUtf8)
            }
        }
    }

    /// Reads a bin-family token and returns its payload.
    ///
    /// Str-family tokens are accepted as well: encoders predating the bin
    /// formats used raw strings for binary data.
    pub fn read_bin_slice(&mut self) -> Decoded<&'a [u8]> {
        let mut p = *self;
        let lead = try_decoded!(p.take_u8());
        let len = match lead {
            code::BIN8 => usize::from(try_decoded!(p.take_u8())),
            code::BIN16 => usize::from(try_decoded!(p.take_u16())),
            code::BIN32 => try_decoded!(p.take_u32()) as usize,
            0xa0..=0xbf => usize::from(lead & 0x1f),
            code::STR8 => usize::from(try_decoded!(p.take_u8())),
            code::STR16 => usize::from(try_decoded!(p.take_u16())),
            code::STR32 => try_decoded!(p.take_u32()) as usize,
            other => return Decoded::Mismatch(other),
        };
        let payload = try_decoded!(p.take(len));
        *self = p;
        Decoded::Value(payload)
    }

    /// Reads an extension header, leaving the payload unconsumed.
    pub fn read_ext_header(&mut self) -> Decoded<ExtensionHeader> {
        let mut p = *self;
        let lead = try_decoded!(p.take_u8());
        let len = match lead {
            code::FIXEXT1 => 1,
            code::FIXEXT2 => 2,
            code::FIXEXT4 => 4,
            code::FIXEXT8 => 8,
            code::FIXEXT16 => 16,
            code::EXT8 => u32::from(try_decoded!(p.take_u8())),
            code::EXT16 => u32::from(try_decoded!(p.take_u16())),
            code::EXT32 => try_decoded!(p.take_u32()),
            other => return Decoded::Mismatch(other),
        };
        let type_code = try_decoded!(p.take_u8()) as i8;
        *self = p;
        Decoded::Value(ExtensionHeader { type_code, len })
    }

    /// Reads a whole extension token: type code plus payload.
    pub fn read_ext(&mut self) -> Decoded<(i8, &'a [u8])> {
        let mut p = *self;
        let header = try_decoded!(p.read_ext_header());
        let payload = try_decoded!(p.take(header.len as usize));
        *self = p;
        Decoded::Value((header.type_code, payload))
    }

    /// Decodes the next token, whatever it is.
    pub fn read_token(&mut self) -> Decoded<Token<'a>> {
        let lead = try_decoded!(self.peek_code());
        match Family::of(lead) {
            Family::Nil => self.try_read_nil().map(|()| Token::Nil),
            Family::Boolean => self.read_bool().map(Token::Bool),
            Family::Integer => self.read_int_raw().map(Token::Int),
            Family::Float32 => self.read_f32().map(Token::F32),
            Family::Float64 => self.read_f64().map(Token::F64),
            Family::Str => self.read_str_slice().map(Token::Str),
            Family::Bin => self.read_bin_slice().map(Token::Bin),
            Family::Array => self.read_array_header().map(Token::Array),
            Family::Map => self.read_map_header().map(Token::Map),
            Family::Ext => self
                .read_ext()
                .map(|(type_code, data)| Token::Ext { type_code, data }),
            Family::NeverUsed => Decoded::Invalid(ReadError::Malformed("reserved lead byte 0xc1")),
        }
    }

    /// Advances past the next value, including all nested children.
    ///
    /// On any non-`Value` outcome the cursor is restored to where it was
    /// before the call, as with every other operation.
    pub fn skip(&mut self, depth: &mut Depth) -> Decoded<()> {
        let snap = *self;
        let out = self.skip_inner(depth);
        if !out.is_value() {
            *self = snap;
        }
        out
    }

    fn skip_inner(&mut self, depth: &mut Depth) -> Decoded<()> {
        let token = try_decoded!(self.read_token());
        let children = match token {
            Token::Array(n) => u64::from(n),
            Token::Map(n) => u64::from(n) * 2,
            _ => return Decoded::Value(()),
        };
        if let Err(e) = depth.enter() {
            return Decoded::Invalid(e);
        }
        for _ in 0..children {
            let out = self.skip_inner(depth);
            if !out.is_value() {
                depth.exit();
                return out;
            }
        }
        depth.exit();
        Decoded::Value(())
    }
}

/// Synchronous reader: same decode logic, `Result`-shaped surface.
///
/// Underflow is fatal here ([`ReadError::EndOfStream`]); callers that can
/// refill their buffer should use [`Reader`] directly.
#[derive(Debug, Clone, Copy)]
pub struct SyncReader<'a> {
    inner: Reader<'a>,
}

impl<'a> SyncReader<'a> {
    /// Wraps a byte slice.
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self {
            inner: Reader::new(buf),
        }
    }

    /// Byte offset of the cursor from the start of the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.inner.position()
    }

    /// Number of unread bytes.
    #[must_use]
    pub const fn remaining_len(&self) -> usize {
        self.inner.remaining_len()
    }

    /// Forks an independent streaming cursor at the current position,
    /// for look-ahead that must not consume input.
    #[must_use]
    pub const fn fork(&self) -> Reader<'a> {
        self.inner
    }

    /// Direct access to the streaming core.
    pub fn streaming(&mut self) -> &mut Reader<'a> {
        &mut self.inner
    }

    /// Lead byte of the next token.
    pub fn peek_code(&self) -> Result<u8, ReadError> {
        self.inner.peek_code().into_result("any value")
    }

    /// Consumes a Nil token if one is next; reports whether it did.
    pub fn try_read_nil(&mut self) -> Result<bool, ReadError> {
        match self.inner.try_read_nil() {
            Decoded::Value(()) => Ok(true),
            Decoded::Mismatch(_) => Ok(false),
            other => other.map(|()| true).into_result("nil"),
        }
    }

    /// Reads a boolean.
    pub fn read_bool(&mut self) -> Result<bool, ReadError> {
        self.inner.read_bool().into_result("boolean")
    }

    /// Reads an integer, narrowing to `T` with an overflow check.
    pub fn read_int<T: FromMsgInt>(&mut self) -> Result<T, ReadError> {
        self.inner.read_int().into_result("integer")
    }

    /// Reads a float32 (integers widen).
    pub fn read_f32(&mut self) -> Result<f32, ReadError> {
        self.inner.read_f32().into_result("float32")
    }

    /// Reads a float64 (float32 and integers widen).
    pub fn read_f64(&mut self) -> Result<f64, ReadError> {
        self.inner.read_f64().into_result("float64")
    }

    /// Reads an array header.
    pub fn read_array_header(&mut self) -> Result<u32, ReadError> {
        self.inner.read_array_header().into_result("array")
    }

    /// Reads a map header.
    pub fn read_map_header(&mut self) -> Result<u32, ReadError> {
        self.inner.read_map_header().into_result("map")
    }

    /// Reads a str-family payload without UTF-8 validation.
    pub fn read_str_slice(&mut self) -> Result<&'a [u8], ReadError> {
        self.inner.read_str_slice().into_result("string")
    }

    /// Reads a validated UTF-8 string slice.
    pub fn read_str(&mut self) -> Result<&'a str, ReadError> {
        self.inner.read_str().into_result("string")
    }

    /// Reads a bin-family (or legacy str-family) payload.
    pub fn read_bin_slice(&mut self) -> Result<&'a [u8], ReadError> {
        self.inner.read_bin_slice().into_result("binary")
    }

    /// Reads an extension header, leaving the payload in place.
    pub fn read_ext_header(&mut self) -> Result<ExtensionHeader, ReadError> {
        self.inner.read_ext_header().into_result("extension")
    }

    /// Reads a whole extension token.
    pub fn read_ext(&mut self) -> Result<(i8, &'a [u8]), ReadError> {
        self.inner.read_ext().into_result("extension")
    }

    /// Decodes the next token, whatever it is.
    pub fn read_token(&mut self) -> Result<Token<'a>, ReadError> {
        self.inner.read_token().into_result("any value")
    }

    /// Advances past the next value, including nested children.
    pub fn skip(&mut self, depth: &mut Depth) -> Result<(), ReadError> {
        self.inner.skip(depth).into_result("any value")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixint_boundaries() {
        let mut r = Reader::new(&[0x00, 0x7f, 0xe0, 0xff]);
        assert_eq!(r.read_int::<u8>(), Decoded::Value(0));
        assert_eq!(r.read_int::<u8>(), Decoded::Value(127));
        assert_eq!(r.read_int::<i8>(), Decoded::Value(-32));
        assert_eq!(r.read_int::<i32>(), Decoded::Value(-1));
    }

    #[test]
    fn negative_fixint_sign_extends() {
        let mut r = Reader::new(&[0xff]);
        assert_eq!(r.read_int_raw(), Decoded::Value(RawInt::Negative(-1)));
    }

    #[test]
    fn sized_integers_roundtrip_boundaries() {
        // uint16 65535, int32 -2147483648, uint64 max
        let bytes = [
            0xcd, 0xff, 0xff, //
            0xd2, 0x80, 0x00, 0x00, 0x00, //
            0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        ];
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_int::<u16>(), Decoded::Value(65535));
        assert_eq!(r.read_int::<i32>(), Decoded::Value(i32::MIN));
        assert_eq!(r.read_int::<u64>(), Decoded::Value(u64::MAX));
    }

    #[test]
    fn narrowing_overflow_is_fatal_and_non_consuming() {
        let bytes = [0xcd, 0x01, 0x00]; // uint16 256
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_int::<u8>(), Decoded::Invalid(ReadError::Overflow));
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_int::<u16>(), Decoded::Value(256));
    }

    #[test]
    fn mismatch_consumes_nothing() {
        let mut r = Reader::new(&[0xc0]);
        assert_eq!(r.read_bool(), Decoded::Mismatch(0xc0));
        assert_eq!(r.position(), 0);
        assert_eq!(r.try_read_nil(), Decoded::Value(()));
    }

    #[test]
    fn truncated_token_reports_missing_bytes() {
        // uint32 with only two payload bytes present.
        let mut r = Reader::new(&[0xce, 0x00, 0x01]);
        assert_eq!(r.read_int::<u32>(), Decoded::Insufficient(2));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn array_header_guards_against_overallocation() {
        // Claims 2^32-1 elements with an empty remainder.
        let mut r = Reader::new(&[0xdd, 0xff, 0xff, 0xff, 0xff]);
        assert!(matches!(r.read_array_header(), Decoded::Insufficient(_)));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn map_header_requires_two_bytes_per_pair() {
        // fixmap of 2 pairs but only 3 bytes remain.
        let mut r = Reader::new(&[0x82, 0x01, 0x02, 0x03]);
        assert_eq!(r.read_map_header(), Decoded::Insufficient(1));
        let mut ok = Reader::new(&[0x82, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(ok.read_map_header(), Decoded::Value(2));
    }

    #[test]
    fn str_and_bin_payloads_borrow_from_input() {
        let bytes = [0xa3, b'A', b'd', b'a', 0xc4, 0x02, 0xab, 0xcd];
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_str(), Decoded::Value("Ada"));
        assert_eq!(r.read_bin_slice(), Decoded::Value(&[0xab, 0xcd][..]));
    }

    #[test]
    fn legacy_str_accepted_for_binary() {
        let bytes = [0xa2, 0x01, 0x02];
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_bin_slice(), Decoded::Value(&[0x01, 0x02][..]));
    }

    #[test]
    fn invalid_utf8_is_fatal_and_non_consuming() {
        let bytes = [0xa2, 0xff, 0xfe];
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_str(), Decoded::Invalid(ReadError::InvalidUtf8));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn ext_header_forms() {
        let mut r = Reader::new(&[0xd6, 0xff, 0, 0, 0, 0]);
        assert_eq!(
            r.read_ext_header(),
            Decoded::Value(ExtensionHeader {
                type_code: -1,
                len: 4
            })
        );
        let mut r = Reader::new(&[0xc7, 0x03, 0x05, 1, 2, 3]);
        assert_eq!(r.read_ext(), Decoded::Value((5, &[1u8, 2, 3][..])));
    }

    #[test]
    fn float_reads_widen_integers() {
        let mut r = Reader::new(&[0x07]);
        assert_eq!(r.read_f64(), Decoded::Value(7.0));
        let mut r = Reader::new(&[0xca, 0x3f, 0x80, 0x00, 0x00]);
        assert_eq!(r.read_f64(), Decoded::Value(1.0));
    }

    #[test]
    fn skip_covers_nested_structures() {
        // [1, {"a": [2, 3]}, "x"]
        let bytes = [
            0x93, 0x01, 0x81, 0xa1, b'a', 0x92, 0x02, 0x03, 0xa1, b'x',
        ];
        let mut r = Reader::new(&bytes);
        let mut depth = Depth::new(16);
        assert_eq!(r.skip(&mut depth), Decoded::Value(()));
        assert_eq!(r.position(), bytes.len());
        assert_eq!(depth.current(), 0);
    }

    #[test]
    fn skip_honours_depth_limit() {
        // [[[1]]] at limit 2 fails, at 3 succeeds.
        let bytes = [0x91, 0x91, 0x91, 0x01];
        let mut shallow = Reader::new(&bytes);
        assert_eq!(
            shallow.skip(&mut Depth::new(2)),
            Decoded::Invalid(ReadError::DepthLimitExceeded { limit: 2 })
        );
        assert_eq!(shallow.position(), 0);
        let mut deep = Reader::new(&bytes);
        assert_eq!(deep.skip(&mut Depth::new(3)), Decoded::Value(()));
    }

    #[test]
    fn sync_reader_maps_underflow_to_end_of_stream() {
        let mut r = SyncReader::new(&[0xce, 0x00]);
        assert_eq!(r.read_int::<u32>(), Err(ReadError::EndOfStream));
    }

    #[test]
    fn fork_does_not_advance_the_parent() {
        let mut r = SyncReader::new(&[0x92, 0x01, 0x02]);
        let mut peek = r.fork();
        assert_eq!(peek.read_array_header(), Decoded::Value(2));
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_array_header(), Ok(2));
    }
}
