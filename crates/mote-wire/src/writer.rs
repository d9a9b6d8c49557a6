// SPDX-License-Identifier: Apache-2.0
//! Buffered MessagePack writer.
//!
//! Writing is strictly forward-only: committed bytes are never rewritten.
//! Every numeric encoder picks the shortest legal wire form for the value
//! (fix-forms first, then the 8/16/32/64-bit variants in ascending
//! order).

use crate::code;

/// A forward-only byte sink.
///
/// In-memory sinks ignore `flush`; sinks that front a downstream pipe or
/// stream commit their buffered bytes there.
pub trait Sink {
    /// Appends bytes to the sink.
    fn put(&mut self, bytes: &[u8]);

    /// Hints that roughly `additional` more bytes are coming.
    fn reserve(&mut self, additional: usize) {
        let _ = additional;
    }

    /// Commits buffered bytes downstream.
    fn flush(&mut self) {}
}

impl Sink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    fn reserve(&mut self, additional: usize) {
        Vec::reserve(self, additional);
    }
}

impl Sink for bytes::BytesMut {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    fn reserve(&mut self, additional: usize) {
        bytes::BytesMut::reserve(self, additional);
    }
}

/// MessagePack token writer over a [`Sink`].
///
/// Tracks the number of bytes written since the last flush so callers can
/// apply a pending-bytes threshold at suspension points.
pub struct Writer<'a> {
    sink: &'a mut dyn Sink,
    pending: usize,
}

impl std::fmt::Debug for Writer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("pending", &self.pending)
            .finish()
    }
}

impl<'a> Writer<'a> {
    /// Wraps a sink.
    pub fn new(sink: &'a mut dyn Sink) -> Self {
        Self { sink, pending: 0 }
    }

    fn put(&mut self, bytes: &[u8]) {
        self.sink.put(bytes);
        self.pending += bytes.len();
    }

    /// Bytes written since construction or the last flush.
    #[must_use]
    pub const fn bytes_pending(&self) -> usize {
        self.pending
    }

    /// Flushes the sink when the pending-bytes count has reached
    /// `threshold`; reports whether it did.
    ///
    /// This is the only point in the writing path where a stream-backed
    /// sink may block or an async adapter may yield.
    pub fn flush_if_appropriate(&mut self, threshold: usize) -> bool {
        if self.pending >= threshold {
            self.sink.flush();
            self.pending = 0;
            true
        } else {
            false
        }
    }

    /// Writes a Nil token.
    pub fn write_nil(&mut self) {
        self.put(&[code::NIL]);
    }

    /// Writes a boolean token.
    pub fn write_bool(&mut self, value: bool) {
        self.put(&[if value { code::TRUE } else { code::FALSE }]);
    }

    /// Writes an unsigned integer in its shortest legal encoding.
    pub fn write_uint(&mut self, value: u64) {
        if value <= code::POS_FIXINT_MAX {
            self.put(&[value as u8]);
        } else if value <= u64::from(u8::MAX) {
            self.put(&[code::UINT8, value as u8]);
        } else if value <= u64::from(u16::MAX) {
            let b = (value as u16).to_be_bytes();
            self.put(&[code::UINT16, b[0], b[1]]);
        } else if value <= u64::from(u32::MAX) {
            let b = (value as u32).to_be_bytes();
            self.put(&[code::UINT32, b[0], b[1], b[2], b[3]]);
        } else {
            let b = value.to_be_bytes();
            self.put(&[code::UINT64, b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]);
        }
    }

    /// Writes a signed integer in its shortest legal encoding.
    ///
    /// Non-negative values take the unsigned forms, so `3` is one byte.
    pub fn write_int(&mut self, value: i64) {
        if value >= 0 {
            self.write_uint(value as u64);
        } else if value >= code::NEG_FIXINT_MIN {
            self.put(&[value as u8]);
        } else if value >= i64::from(i8::MIN) {
            self.put(&[code::INT8, value as u8]);
        } else if value >= i64::from(i16::MIN) {
            let b = (value as i16).to_be_bytes();
            self.put(&[code::INT16, b[0], b[1]]);
        } else if value >= i64::from(i32::MIN) {
            let b = (value as i32).to_be_bytes();
            self.put(&[code::INT32, b[0], b[1], b[2], b[3]]);
        } else {
            let b = value.to_be_bytes();
            self.put(&[code::INT64, b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]);
        }
    }

    /// Writes a float32 token.
    pub fn write_f32(&mut self, value: f32) {
        let b = value.to_bits().to_be_bytes();
        self.put(&[code::FLOAT32, b[0], b[1], b[2], b[3]]);
    }

    /// Writes a float64 token.
    pub fn write_f64(&mut self, value: f64) {
        let b = value.to_bits().to_be_bytes();
        self.put(&[code::FLOAT64, b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]);
    }

    /// Writes a string token (header plus UTF-8 payload).
    pub fn write_str(&mut self, value: &str) {
        self.write_str_bytes(value.as_bytes());
    }

    /// Writes a string token from pre-validated UTF-8 bytes.
    pub fn write_str_bytes(&mut self, utf8: &[u8]) {
        let len = utf8.len();
        self.sink.reserve(len + 5);
        if len <= code::FIXSTR_MAX_LEN {
            self.put(&[code::FIXSTR_LO | len as u8]);
        } else if len <= usize::from(u8::MAX) {
            self.put(&[code::STR8, len as u8]);
        } else if len <= usize::from(u16::MAX) {
            let b = (len as u16).to_be_bytes();
            self.put(&[code::STR16, b[0], b[1]]);
        } else {
            let b = (len as u32).to_be_bytes();
            self.put(&[code::STR32, b[0], b[1], b[2], b[3]]);
        }
        self.put(utf8);
    }

    /// Writes a binary token.
    pub fn write_bin(&mut self, bytes: &[u8]) {
        let len = bytes.len();
        self.sink.reserve(len + 5);
        if len <= usize::from(u8::MAX) {
            self.put(&[code::BIN8, len as u8]);
        } else if len <= usize::from(u16::MAX) {
            let b = (len as u16).to_be_bytes();
            self.put(&[code::BIN16, b[0], b[1]]);
        } else {
            let b = (len as u32).to_be_bytes();
            self.put(&[code::BIN32, b[0], b[1], b[2], b[3]]);
        }
        self.put(bytes);
    }

    /// Writes an array header for `count` elements.
    pub fn write_array_header(&mut self, count: u32) {
        if count as usize <= code::FIX_CONTAINER_MAX {
            self.put(&[code::FIXARRAY_LO | count as u8]);
        } else if count <= u32::from(u16::MAX) {
            let b = (count as u16).to_be_bytes();
            self.put(&[code::ARRAY16, b[0], b[1]]);
        } else {
            let b = count.to_be_bytes();
            self.put(&[code::ARRAY32, b[0], b[1], b[2], b[3]]);
        }
    }

    /// Writes a map header for `count` key/value pairs.
    pub fn write_map_header(&mut self, count: u32) {
        if count as usize <= code::FIX_CONTAINER_MAX {
            self.put(&[code::FIXMAP_LO | count as u8]);
        } else if count <= u32::from(u16::MAX) {
            let b = (count as u16).to_be_bytes();
            self.put(&[code::MAP16, b[0], b[1]]);
        } else {
            let b = count.to_be_bytes();
            self.put(&[code::MAP32, b[0], b[1], b[2], b[3]]);
        }
    }

    /// Writes an extension token, preferring the fixext forms.
    pub fn write_ext(&mut self, type_code: i8, payload: &[u8]) {
        let len = payload.len();
        self.sink.reserve(len + 6);
        match len {
            1 => self.put(&[code::FIXEXT1, type_code as u8]),
            2 => self.put(&[code::FIXEXT2, type_code as u8]),
            4 => self.put(&[code::FIXEXT4, type_code as u8]),
            8 => self.put(&[code::FIXEXT8, type_code as u8]),
            16 => self.put(&[code::FIXEXT16, type_code as u8]),
            _ if len <= usize::from(u8::MAX) => {
                self.put(&[code::EXT8, len as u8, type_code as u8]);
            }
            _ if len <= usize::from(u16::MAX) => {
                let b = (len as u16).to_be_bytes();
                self.put(&[code::EXT16, b[0], b[1], type_code as u8]);
            }
            _ => {
                let b = (len as u32).to_be_bytes();
                self.put(&[code::EXT32, b[0], b[1], b[2], b[3], type_code as u8]);
            }
        }
        self.put(payload);
    }

    /// Appends already-encoded MessagePack bytes verbatim.
    pub fn write_raw(&mut self, encoded: &[u8]) {
        self.put(encoded);
    }
}
