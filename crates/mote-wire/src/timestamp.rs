// SPDX-License-Identifier: Apache-2.0
//! The reserved timestamp extension (type code −1).
//!
//! Wire forms, shortest chosen on write:
//! ```text
//! fixext4  −1  u32 seconds                        (0 ≤ sec < 2^32, nanos = 0)
//! fixext8  −1  u64 = nanos(30 bits) ∥ sec(34 bits) (0 ≤ sec < 2^34)
//! ext8(12) −1  u32 nanos, i64 seconds              (everything else)
//! ```

use crate::code;
use crate::error::{try_decoded, Decoded, ReadError};
use crate::reader::Reader;
use crate::writer::Writer;

/// Nanoseconds per second; the nanos field must stay below this.
pub const NANOS_PER_SEC: u32 = 1_000_000_000;

/// An instant as seconds since the Unix epoch plus a nanosecond offset.
///
/// `nanos` is always in `0..NANOS_PER_SEC`; the represented instant is
/// `seconds + nanos / 1e9`, so instants before the epoch use a smaller
/// `seconds` and a positive `nanos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    seconds: i64,
    nanos: u32,
}

impl Timestamp {
    /// Creates a timestamp, normalizing out-of-range nanoseconds into the
    /// seconds field.
    #[must_use]
    pub const fn new(seconds: i64, nanos: u32) -> Self {
        let carry = (nanos / NANOS_PER_SEC) as i64;
        Self {
            seconds: seconds + carry,
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    /// A timestamp with no fractional part.
    #[must_use]
    pub const fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Seconds since the Unix epoch.
    #[must_use]
    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Nanosecond offset, in `0..1_000_000_000`.
    #[must_use]
    pub const fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Encodes into the shortest timestamp extension payload.
    #[must_use]
    pub fn to_ext_payload(&self) -> TimestampPayload {
        let mut buf = [0u8; 12];
        if self.nanos == 0 && u32::try_from(self.seconds).is_ok() {
            buf[..4].copy_from_slice(&(self.seconds as u32).to_be_bytes());
            TimestampPayload { buf, len: 4 }
        } else if (0..1i64 << 34).contains(&self.seconds) {
            let packed = (u64::from(self.nanos) << 34) | self.seconds as u64;
            buf[..8].copy_from_slice(&packed.to_be_bytes());
            TimestampPayload { buf, len: 8 }
        } else {
            buf[..4].copy_from_slice(&self.nanos.to_be_bytes());
            buf[4..].copy_from_slice(&self.seconds.to_be_bytes());
            TimestampPayload { buf, len: 12 }
        }
    }

    /// Decodes a timestamp extension payload of length 4, 8 or 12.
    ///
    /// # Errors
    /// Returns [`ReadError::Malformed`] for any other length or for a
    /// nanoseconds field of one billion or more.
    pub fn from_ext_payload(payload: &[u8]) -> Result<Self, ReadError> {
        match payload.len() {
            4 => {
                let sec = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                Ok(Self::from_seconds(i64::from(sec)))
            }
            8 => {
                let packed = u64::from_be_bytes([
                    payload[0], payload[1], payload[2], payload[3], payload[4], payload[5],
                    payload[6], payload[7],
                ]);
                let nanos = (packed >> 34) as u32;
                let seconds = (packed & ((1 << 34) - 1)) as i64;
                if nanos >= NANOS_PER_SEC {
                    return Err(ReadError::Malformed("timestamp nanoseconds out of range"));
                }
                Ok(Self { seconds, nanos })
            }
            12 => {
                let nanos = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                let mut sec = [0u8; 8];
                sec.copy_from_slice(&payload[4..12]);
                let seconds = i64::from_be_bytes(sec);
                if nanos >= NANOS_PER_SEC {
                    return Err(ReadError::Malformed("timestamp nanoseconds out of range"));
                }
                Ok(Self { seconds, nanos })
            }
            _ => Err(ReadError::Malformed("timestamp payload must be 4, 8 or 12 bytes")),
        }
    }
}

/// Encoded timestamp payload bytes (4, 8 or 12 of them).
#[derive(Debug, Clone, Copy)]
pub struct TimestampPayload {
    buf: [u8; 12],
    len: usize,
}

impl TimestampPayload {
    /// The payload bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl Writer<'_> {
    /// Writes a timestamp as the reserved extension, shortest form first.
    pub fn write_timestamp(&mut self, ts: Timestamp) {
        let payload = ts.to_ext_payload();
        self.write_ext(code::TIMESTAMP_EXT_CODE, payload.as_slice());
    }
}

impl Reader<'_> {
    /// Reads a timestamp extension token.
    ///
    /// Mismatch is reported when the next token is not an extension or
    /// carries a different type code.
    pub fn read_timestamp(&mut self) -> Decoded<Timestamp> {
        let snap = *self;
        let lead = try_decoded!(self.peek_code());
        let (type_code, payload) = try_decoded!(self.read_ext());
        if type_code != code::TIMESTAMP_EXT_CODE {
            *self = snap;
            return Decoded::Mismatch(lead);
        }
        match Timestamp::from_ext_payload(payload) {
            Ok(ts) => Decoded::Value(ts),
            Err(e) => {
                *self = snap;
                Decoded::Invalid(e)
            }
        }
    }
}

impl crate::reader::SyncReader<'_> {
    /// Reads a timestamp extension token.
    pub fn read_timestamp(&mut self) -> Result<Timestamp, ReadError> {
        self.streaming().read_timestamp().into_result("timestamp")
    }
}
