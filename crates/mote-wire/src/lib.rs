// SPDX-License-Identifier: Apache-2.0
//! mote-wire: the primitive MessagePack codec.
//!
//! This crate owns the byte level of the format and nothing above it:
//! - [`Reader`], a streaming decoder whose operations report
//!   [`Decoded::Insufficient`] instead of failing when the buffer ends
//!   mid-token, and its `Result`-shaped twin [`SyncReader`];
//! - [`Writer`], a forward-only encoder that always picks the shortest
//!   legal wire form;
//! - the pooled [`BufferPool`]/[`ScratchSink`] machinery behind the
//!   serialize-to-vec fast path;
//! - the byte codecs for the reserved timestamp extension and for GUIDs.
//!
//! Value-level concerns (shapes, converters, policies) live in the `mote`
//! crate.
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_must_use)]

pub mod code;
mod error;
mod guid;
mod reader;
mod timestamp;
mod writer;

/// Buffer pool and thread-local scratch plumbing.
pub mod buffer;

pub use buffer::{BufferPool, PooledSequence, ScratchSink, SCRATCH_SIZE};
pub use code::Family;
pub use error::{Decoded, ReadError};
pub use guid::{Guid, GuidParseError};
pub use reader::{Depth, ExtensionHeader, FromMsgInt, RawInt, Reader, SyncReader, Token};
pub use timestamp::{Timestamp, TimestampPayload, NANOS_PER_SEC};
pub use writer::{Sink, Writer};
