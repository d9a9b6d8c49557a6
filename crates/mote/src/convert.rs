// SPDX-License-Identifier: Apache-2.0
//! The converter abstraction.
//!
//! A converter is a paired writer and reader for one concrete type,
//! synthesized from that type's shape. Converters are built once, cached
//! behind `Arc`, immutable afterwards, and freely shared across threads.

use std::any::Any;
use std::sync::Arc;

use mote_wire::{SyncReader, Writer};

use crate::context::{ReadContext, WriteContext};
use crate::error::Error;

/// Paired MessagePack writer and reader for values of type `T`.
pub trait Converter<T>: Send + Sync + 'static {
    /// Encodes `value` into the writer.
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error>;

    /// Decodes one value from the reader.
    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<T, Error>;
}

/// Shared handle to a built converter.
pub type ArcConverter<T> = Arc<dyn Converter<T>>;

/// Type-erased converter handle, as stored by the cache.
///
/// The concealed value is always an [`ArcConverter<T>`] for the `T` the
/// slot was keyed under; [`erase`] and [`unerase`] are the only two ways
/// it is produced and consumed.
pub type ErasedConverter = Arc<dyn Any + Send + Sync>;

/// Erases an [`ArcConverter<T>`] for storage in a heterogeneous map.
#[must_use]
pub fn erase<T: 'static>(converter: ArcConverter<T>) -> ErasedConverter {
    Arc::new(converter)
}

/// Recovers the typed handle from an erased slot.
///
/// Returns `None` when the slot was keyed under a different type, which
/// would indicate cache corruption.
#[must_use]
pub fn unerase<T: 'static>(erased: &ErasedConverter) -> Option<ArcConverter<T>> {
    erased.downcast_ref::<ArcConverter<T>>().cloned()
}
