// SPDX-License-Identifier: Apache-2.0
//! mote: a schema-driven MessagePack serializer.
//!
//! Types describe their structure through the [`Shaped`] trait; the
//! serializer synthesizes a converter per type from that shape, caches
//! it, and drives the primitive codec in `mote-wire` to produce or
//! consume bytes. Policies (reference preservation, default elision,
//! naming, enum layout) are fixed per serializer: [`MsgPacker`] is
//! immutable once built, and [`MsgPacker::reconfigure`] returns a copy
//! with a fresh converter cache instead of mutating anything shared.
//!
//! ```
//! use mote::MsgPacker;
//!
//! let packer = MsgPacker::new();
//! let bytes = packer.serialize(&vec![1u32, 2, 3]).unwrap();
//! assert_eq!(bytes, [0x93, 0x01, 0x02, 0x03]);
//! let back: Vec<u32> = packer.deserialize(&bytes).unwrap();
//! assert_eq!(back, [1, 2, 3]);
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_must_use)]

mod builders;
mod cache;
mod context;
mod convert;
mod error;
mod interner;
mod options;
mod refs;
mod serializer;
mod wellknown;

/// Type-shape interface: how user types describe their structure.
pub mod shape;

pub use cache::ConverterCache;
pub use context::{CancellationToken, ReadContext, WriteContext};
pub use convert::{erase, unerase, ArcConverter, Converter, ErasedConverter};
pub use error::{Error, ErrorKind};
pub use options::{
    DefaultsPolicy, MultiDimFormat, NamingPolicy, RefMode, SerializerOptions,
};
pub use serializer::{MsgPacker, MsgPackerBuilder};
pub use shape::{Shape, Shaped};
pub use wellknown::{Rational, RawMsgPack, SharedStr, VersionId, VersionParseError};

// The primitive codec types that appear in this crate's public API.
pub use mote_wire::{Guid, GuidParseError, Sink, SyncReader, Timestamp, Writer};
