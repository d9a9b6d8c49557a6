// SPDX-License-Identifier: Apache-2.0
//! Serialization error taxonomy.
//!
//! Converters surface every domain failure through [`Error`]; the
//! machine-readable [`ErrorKind`] lets callers branch without matching on
//! message text. Wire-level failures from the primitive codec are wrapped
//! rather than translated, so the offending lead byte survives into the
//! message. Nothing in this crate retries an error.

use mote_wire::ReadError;
use thiserror::Error;

/// Machine-readable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input ended inside a token.
    EndOfStream,
    /// A token was not legal for the requested operation.
    TokenMismatch,
    /// An integer did not fit its target type.
    Overflow,
    /// Structural nesting exceeded the configured ceiling.
    DepthLimitExceeded,
    /// Cancellation was observed at a container boundary.
    OperationCancelled,
    /// A cycle was found while serializing in reject-cycles mode.
    ReferenceCycleDetected,
    /// A cycle could not be resolved while deserializing.
    CycleNotReconstructible,
    /// A union payload matched zero or several candidate cases.
    AmbiguousOrUnknownSubtype,
    /// A required constructor argument was absent.
    MissingRequiredProperty,
    /// A delayed converter was invoked before installation.
    ConverterNotYetBuilt,
    /// A type shape cannot be turned into a converter.
    InvalidShape,
    /// Structurally valid bytes that violate a value-level constraint.
    InvalidData,
}

/// Any failure raised while serializing or deserializing.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Wire-level decode failure, carried verbatim.
    #[error("wire decode failed: {0}")]
    Read(#[from] ReadError),

    /// Structural nesting exceeded the configured ceiling.
    #[error("nesting depth exceeded the limit of {limit}")]
    DepthLimitExceeded {
        /// The configured maximum depth.
        limit: usize,
    },

    /// Cancellation was observed at a container boundary.
    ///
    /// Bytes already committed to the sink are not rolled back; the
    /// output is structurally incomplete and should be discarded.
    #[error("operation cancelled")]
    OperationCancelled,

    /// About to emit a back-reference to an object whose serialization
    /// has not completed, in reject-cycles mode.
    #[error("reference cycle detected while serializing `{type_name}`")]
    ReferenceCycleDetected {
        /// Type at which the cycle closed.
        type_name: &'static str,
    },

    /// A back-reference pointed at an object that is still being
    /// constructed and cannot be published early.
    #[error("reference cycle in `{type_name}` cannot be reconstructed")]
    CycleNotReconstructible {
        /// Type at which the cycle failed to close.
        type_name: &'static str,
    },

    /// A union payload narrowed to zero or to several candidate cases.
    #[error("cannot identify a union case of `{type_name}`: {detail}")]
    AmbiguousOrUnknownSubtype {
        /// The union base type.
        type_name: &'static str,
        /// Why identification failed.
        detail: String,
    },

    /// A parameterized constructor finished with a required argument
    /// missing from the input.
    #[error("missing required property `{name}` of `{type_name}`")]
    MissingRequiredProperty {
        /// The type being constructed.
        type_name: &'static str,
        /// The absent parameter.
        name: &'static str,
    },

    /// A delayed placeholder was invoked before its real converter was
    /// installed. This indicates a bug in converter construction.
    #[error("converter for `{type_name}` was invoked before it was built")]
    ConverterNotYetBuilt {
        /// The type whose converter is incomplete.
        type_name: &'static str,
    },

    /// The declared shape cannot be turned into a converter.
    #[error("shape of `{type_name}` is unusable: {detail}")]
    InvalidShape {
        /// The offending type.
        type_name: &'static str,
        /// What is wrong with the shape.
        detail: &'static str,
    },

    /// Structurally valid input that violates a value-level constraint
    /// (unknown enum name, zero denominator, wrong-length fixed array, ...).
    #[error("invalid data for `{type_name}`: {detail}")]
    InvalidData {
        /// The type being read.
        type_name: &'static str,
        /// The violated constraint.
        detail: String,
    },
}

impl Error {
    /// Machine-readable kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read(ReadError::EndOfStream) => ErrorKind::EndOfStream,
            Self::Read(ReadError::Mismatch { .. }) => ErrorKind::TokenMismatch,
            Self::Read(ReadError::Overflow) => ErrorKind::Overflow,
            Self::Read(ReadError::InvalidUtf8 | ReadError::Malformed(_)) => ErrorKind::InvalidData,
            Self::Read(ReadError::DepthLimitExceeded { .. })
            | Self::DepthLimitExceeded { .. } => ErrorKind::DepthLimitExceeded,
            Self::OperationCancelled => ErrorKind::OperationCancelled,
            Self::ReferenceCycleDetected { .. } => ErrorKind::ReferenceCycleDetected,
            Self::CycleNotReconstructible { .. } => ErrorKind::CycleNotReconstructible,
            Self::AmbiguousOrUnknownSubtype { .. } => ErrorKind::AmbiguousOrUnknownSubtype,
            Self::MissingRequiredProperty { .. } => ErrorKind::MissingRequiredProperty,
            Self::ConverterNotYetBuilt { .. } => ErrorKind::ConverterNotYetBuilt,
            Self::InvalidShape { .. } => ErrorKind::InvalidShape,
            Self::InvalidData { .. } => ErrorKind::InvalidData,
        }
    }
}
