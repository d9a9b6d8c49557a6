// SPDX-License-Identifier: Apache-2.0
//! The serializer facade.
//!
//! A [`MsgPacker`] pairs a policy snapshot with a converter cache. It is
//! immutable after construction: configuration happens on the builder,
//! and [`MsgPacker::reconfigure`] produces a structurally copied
//! serializer (same user converters, new policies, fresh cache) rather
//! than mutating anything the existing one shares.

use std::any::TypeId;
use std::sync::Arc;

use bytes::Bytes;
use mote_wire::{ScratchSink, Sink, SyncReader, Writer};
use tracing::trace;

use crate::cache::{ConverterCache, UserConverters};
use crate::context::{CancellationToken, ReadContext, WriteContext};
use crate::convert::{ArcConverter, Converter, ErasedConverter};
use crate::error::Error;
use crate::options::SerializerOptions;
use crate::shape::Shaped;

/// Configures and constructs a [`MsgPacker`].
#[derive(Default)]
pub struct MsgPackerBuilder {
    options: SerializerOptions,
    user: UserConverters,
}

impl MsgPackerBuilder {
    /// Adjusts the policy snapshot.
    #[must_use]
    pub fn configure(mut self, f: impl FnOnce(&mut SerializerOptions)) -> Self {
        f(&mut self.options);
        self
    }

    /// Registers a converter instance for `T`, overriding its shape.
    #[must_use]
    pub fn with_converter<T: 'static>(mut self, converter: ArcConverter<T>) -> Self {
        self.user.register_instance(converter);
        self
    }

    /// Registers a converter factory for `T`; `F::default()` is invoked
    /// the first time `T` is needed.
    #[must_use]
    pub fn with_converter_factory<T, F>(mut self) -> Self
    where
        T: 'static,
        F: Converter<T> + Default,
    {
        self.user.register_factory::<T, F>();
        self
    }

    /// Adds a factory delegate, consulted in registration order for
    /// types with no registered instance or factory.
    #[must_use]
    pub fn with_factory_delegate(
        mut self,
        delegate: impl Fn(TypeId) -> Option<ErasedConverter> + Send + Sync + 'static,
    ) -> Self {
        self.user.register_delegate(Arc::new(delegate));
        self
    }

    /// Builds the serializer.
    #[must_use]
    pub fn build(self) -> MsgPacker {
        MsgPacker {
            cache: Arc::new(ConverterCache::new(self.options, self.user)),
        }
    }
}

/// Schema-driven MessagePack serializer.
#[derive(Clone)]
pub struct MsgPacker {
    cache: Arc<ConverterCache>,
}

impl Default for MsgPacker {
    fn default() -> Self {
        Self::new()
    }
}

impl MsgPacker {
    /// A serializer with default policies.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a serializer.
    #[must_use]
    pub fn builder() -> MsgPackerBuilder {
        MsgPackerBuilder::default()
    }

    /// The policy snapshot this serializer runs under.
    #[must_use]
    pub fn options(&self) -> &SerializerOptions {
        self.cache.options()
    }

    /// A structural copy with adjusted policies and a fresh cache.
    ///
    /// User-registered converters carry over; nothing shared with this
    /// serializer is mutated.
    #[must_use]
    pub fn reconfigure(&self, f: impl FnOnce(&mut SerializerOptions)) -> Self {
        let mut options = self.cache.options().clone();
        f(&mut options);
        Self {
            cache: Arc::new(ConverterCache::new(options, self.cache.user().clone())),
        }
    }

    /// Serializes `value` into a fresh byte vector.
    pub fn serialize<T: Shaped>(&self, value: &T) -> Result<Vec<u8>, Error> {
        self.serialize_with(value, &CancellationToken::none())
    }

    /// Serializes `value`, observing `cancel` at container boundaries.
    pub fn serialize_with<T: Shaped>(
        &self,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, Error> {
        let converter = self.cache.resolve::<T>()?;
        let mut sink = ScratchSink::acquire();
        {
            let mut w = Writer::new(&mut sink);
            let mut cx = WriteContext::new(self.cache.options(), cancel.clone());
            converter.write(&mut w, value, &mut cx)?;
        }
        trace!(bytes = sink.len(), "serialized value");
        Ok(sink.into_vec())
    }

    /// Serializes `value` into a caller-provided sink.
    pub fn serialize_into<T: Shaped>(
        &self,
        sink: &mut dyn Sink,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let converter = self.cache.resolve::<T>()?;
        let mut w = Writer::new(sink);
        let mut cx = WriteContext::new(self.cache.options(), cancel.clone());
        converter.write(&mut w, value, &mut cx)?;
        w.flush_if_appropriate(0);
        Ok(())
    }

    /// Deserializes one value of type `T` from `bytes`.
    ///
    /// Trailing bytes after the value are ignored.
    pub fn deserialize<T: Shaped>(&self, bytes: &[u8]) -> Result<T, Error> {
        self.deserialize_with(bytes, &CancellationToken::none())
    }

    /// Deserializes, observing `cancel` at container boundaries.
    pub fn deserialize_with<T: Shaped>(
        &self,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<T, Error> {
        let converter = self.cache.resolve::<T>()?;
        let mut r = SyncReader::new(bytes);
        let mut cx = ReadContext::new(self.cache.options(), cancel.clone(), None);
        converter.read(&mut r, &mut cx)
    }

    /// Deserializes from a shared buffer; byte-range values slice the
    /// buffer instead of copying out of it.
    pub fn deserialize_shared<T: Shaped>(&self, bytes: &Bytes) -> Result<T, Error> {
        let converter = self.cache.resolve::<T>()?;
        let mut r = SyncReader::new(bytes);
        let mut cx = ReadContext::new(
            self.cache.options(),
            CancellationToken::none(),
            Some(bytes.clone()),
        );
        converter.read(&mut r, &mut cx)
    }
}
