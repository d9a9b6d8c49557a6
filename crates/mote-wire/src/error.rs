// SPDX-License-Identifier: Apache-2.0
//! Decode outcomes and wire-level errors.

use thiserror::Error;

/// Fatal wire-level decode errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The input ended inside a token (synchronous reading only; the
    /// streaming reader reports [`Decoded::Insufficient`] instead).
    #[error("unexpected end of input")]
    EndOfStream,

    /// The next token is not a legal encoding for the requested kind.
    #[error("expected {expected}, found lead byte 0x{code:02x}")]
    Mismatch {
        /// The offending lead byte.
        code: u8,
        /// What the caller asked for.
        expected: &'static str,
    },

    /// An integer token does not fit the requested width.
    #[error("integer does not fit the requested type")]
    Overflow,

    /// A string payload is not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    /// Structural nesting exceeded the configured ceiling.
    #[error("nesting depth exceeded the limit of {limit}")]
    DepthLimitExceeded {
        /// The configured depth limit.
        limit: usize,
    },

    /// A token violated the format grammar (reserved byte, bad extension
    /// length, out-of-range nanoseconds, ...).
    #[error("malformed token: {0}")]
    Malformed(&'static str),
}

/// Outcome of one streaming decode operation.
///
/// `Mismatch` and `Insufficient` are resumable: the reader consumes no
/// bytes, so the caller may retry the same operation (after providing more
/// input, for `Insufficient`). `Invalid` is fatal and also consumes
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decoded<T> {
    /// The token decoded; the reader advanced past it.
    Value(T),
    /// The lead byte is not a legal encoding for the requested kind.
    Mismatch(u8),
    /// At least this many further bytes are needed to finish the token.
    Insufficient(usize),
    /// The token is illegal regardless of how much input arrives.
    Invalid(ReadError),
}

impl<T> Decoded<T> {
    /// Maps the success value, passing the other outcomes through.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        match self {
            Self::Value(v) => Decoded::Value(f(v)),
            Self::Mismatch(c) => Decoded::Mismatch(c),
            Self::Insufficient(n) => Decoded::Insufficient(n),
            Self::Invalid(e) => Decoded::Invalid(e),
        }
    }

    /// Collapses the outcome into a `Result`, labelling mismatches with
    /// `expected` and treating missing input as [`ReadError::EndOfStream`].
    pub fn into_result(self, expected: &'static str) -> Result<T, ReadError> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Mismatch(code) => Err(ReadError::Mismatch { code, expected }),
            Self::Insufficient(_) => Err(ReadError::EndOfStream),
            Self::Invalid(e) => Err(e),
        }
    }

    /// Returns `true` for [`Decoded::Value`].
    pub const fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

/// Propagates non-`Value` outcomes out of the enclosing function.
///
/// The streaming decoders are written against [`Decoded`] rather than
/// `Result`, so `?` is unavailable; this macro plays the same role.
macro_rules! try_decoded {
    ($expr:expr) => {
        match $expr {
            $crate::error::Decoded::Value(v) => v,
            $crate::error::Decoded::Mismatch(c) => {
                return $crate::error::Decoded::Mismatch(c);
            }
            $crate::error::Decoded::Insufficient(n) => {
                return $crate::error::Decoded::Insufficient(n);
            }
            $crate::error::Decoded::Invalid(e) => {
                return $crate::error::Decoded::Invalid(e);
            }
        }
    };
}

pub(crate) use try_decoded;
