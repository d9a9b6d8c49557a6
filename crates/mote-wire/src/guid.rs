// SPDX-License-Identifier: Apache-2.0
//! GUID parsing and formatting.
//!
//! Accepts the five canonical textual forms plus the 16-byte
//! little-endian binary layout:
//! ```text
//! N  32 contiguous hex digits
//! D  8-4-4-4-12 with dashes
//! B  D wrapped in braces
//! P  D wrapped in parentheses
//! X  {0xAAAAAAAA,0xBBBB,0xCCCC,{0xDD,...,0xDD}}
//! ```
//! Parsing walks the input byte-by-byte and never allocates; malformed
//! input is rejected at the first offending byte.

use std::fmt;

use thiserror::Error;

/// A 128-bit globally unique identifier.
///
/// Stored in textual (big-endian field) order; use
/// [`Guid::to_bytes_le`]/[`Guid::from_bytes_le`] for the mixed-endian
/// binary layout used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Guid([u8; 16]);

/// Error returned for text that is not a recognizable GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("malformed GUID text")]
pub struct GuidParseError;

const fn hex_nibble(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Incremental hex reader over a byte slice.
struct HexCursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> HexCursor<'a> {
    const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn expect(&mut self, b: u8) -> Result<(), GuidParseError> {
        if self.input.get(self.pos) == Some(&b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(GuidParseError)
        }
    }

    fn expect_str(&mut self, s: &[u8]) -> Result<(), GuidParseError> {
        for &b in s {
            self.expect(b)?;
        }
        Ok(())
    }

    fn byte(&mut self) -> Result<u8, GuidParseError> {
        let hi = self
            .input
            .get(self.pos)
            .copied()
            .and_then(hex_nibble)
            .ok_or(GuidParseError)?;
        let lo = self
            .input
            .get(self.pos + 1)
            .copied()
            .and_then(hex_nibble)
            .ok_or(GuidParseError)?;
        self.pos += 2;
        Ok((hi << 4) | lo)
    }

    fn bytes(&mut self, out: &mut [u8]) -> Result<(), GuidParseError> {
        for slot in out {
            *slot = self.byte()?;
        }
        Ok(())
    }

    fn finished(&self) -> Result<(), GuidParseError> {
        if self.pos == self.input.len() {
            Ok(())
        } else {
            Err(GuidParseError)
        }
    }
}

impl Guid {
    /// The all-zero GUID.
    pub const NIL: Self = Self([0; 16]);

    /// Constructs from textual (big-endian) field order.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Textual (big-endian) field order bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Encodes the mixed-endian binary layout: the first three fields
    /// little-endian, the final eight bytes verbatim.
    #[must_use]
    pub fn to_bytes_le(&self) -> [u8; 16] {
        let b = self.0;
        [
            b[3], b[2], b[1], b[0], //
            b[5], b[4], //
            b[7], b[6], //
            b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15],
        ]
    }

    /// Decodes the mixed-endian binary layout.
    #[must_use]
    pub fn from_bytes_le(bytes: [u8; 16]) -> Self {
        let b = bytes;
        Self([
            b[3], b[2], b[1], b[0], //
            b[5], b[4], //
            b[7], b[6], //
            b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15],
        ])
    }

    /// Parses any of the five textual forms.
    ///
    /// # Errors
    /// Returns [`GuidParseError`] at the first byte that breaks the form.
    pub fn parse_str(text: &str) -> Result<Self, GuidParseError> {
        let input = text.as_bytes();
        match input.first() {
            Some(b'{') if input.get(1) == Some(&b'0') => Self::parse_x(input),
            Some(b'{') => Self::parse_wrapped(input, b'{', b'}'),
            Some(b'(') => Self::parse_wrapped(input, b'(', b')'),
            Some(_) if input.len() == 32 => Self::parse_n(input),
            Some(_) => Self::parse_d(input),
            None => Err(GuidParseError),
        }
    }

    fn parse_n(input: &[u8]) -> Result<Self, GuidParseError> {
        let mut cur = HexCursor::new(input);
        let mut out = [0u8; 16];
        cur.bytes(&mut out)?;
        cur.finished()?;
        Ok(Self(out))
    }

    fn parse_d(input: &[u8]) -> Result<Self, GuidParseError> {
        let mut cur = HexCursor::new(input);
        let guid = Self::parse_d_body(&mut cur)?;
        cur.finished()?;
        Ok(guid)
    }

    fn parse_d_body(cur: &mut HexCursor<'_>) -> Result<Self, GuidParseError> {
        let mut out = [0u8; 16];
        cur.bytes(&mut out[0..4])?;
        cur.expect(b'-')?;
        cur.bytes(&mut out[4..6])?;
        cur.expect(b'-')?;
        cur.bytes(&mut out[6..8])?;
        cur.expect(b'-')?;
        cur.bytes(&mut out[8..10])?;
        cur.expect(b'-')?;
        cur.bytes(&mut out[10..16])?;
        Ok(Self(out))
    }

    fn parse_wrapped(input: &[u8], open: u8, close: u8) -> Result<Self, GuidParseError> {
        let mut cur = HexCursor::new(input);
        cur.expect(open)?;
        let guid = Self::parse_d_body(&mut cur)?;
        cur.expect(close)?;
        cur.finished()?;
        Ok(guid)
    }

    fn parse_x(input: &[u8]) -> Result<Self, GuidParseError> {
        let mut cur = HexCursor::new(input);
        let mut out = [0u8; 16];
        cur.expect_str(b"{0x")?;
        cur.bytes(&mut out[0..4])?;
        cur.expect_str(b",0x")?;
        cur.bytes(&mut out[4..6])?;
        cur.expect_str(b",0x")?;
        cur.bytes(&mut out[6..8])?;
        cur.expect_str(b",{")?;
        for i in 8..16 {
            cur.expect_str(b"0x")?;
            out[i] = cur.byte()?;
            if i < 15 {
                cur.expect(b',')?;
            }
        }
        cur.expect_str(b"}}")?;
        cur.finished()?;
        Ok(Self(out))
    }
}

impl fmt::Display for Guid {
    /// Formats in the dashed `D` form, lowercase.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12],
            b[13], b[14], b[15]
        )
    }
}

impl std::str::FromStr for Guid {
    type Err = GuidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}
