// SPDX-License-Identifier: Apache-2.0
//! Surrogate converters: serialize `T` through an intermediate `S`.

use std::sync::Arc;

use mote_wire::{SyncReader, Writer};

use crate::cache::ConverterCache;
use crate::context::{ReadContext, WriteContext};
use crate::convert::{ArcConverter, Converter};
use crate::error::Error;
use crate::options::RefMode;
use crate::refs::RefPreservingConverter;
use crate::shape::{ConverterBinding, MappedShape, ProjectedShape, SharedShape, Shaped};

impl<T: Send + Sync + 'static, S: Shaped> ConverterBinding<T> for MappedShape<T, S> {
    fn build(&self, cache: &ConverterCache) -> Result<ArcConverter<T>, Error> {
        Ok(Arc::new(MappedConverter {
            inner: cache.resolve::<S>()?,
            to: self.to,
            from: self.from,
        }))
    }
}

struct MappedConverter<T: 'static, S> {
    inner: ArcConverter<S>,
    to: fn(&T) -> S,
    from: fn(S) -> Result<T, Error>,
}

impl<T: Send + Sync + 'static, S: Shaped> Converter<T> for MappedConverter<T, S> {
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        self.inner.write(w, &(self.to)(value), cx)
    }

    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<T, Error> {
        (self.from)(self.inner.read(r, cx)?)
    }
}

impl<T: Send + Sync + 'static, S: Shaped> ConverterBinding<T> for ProjectedShape<T, S> {
    fn build(&self, cache: &ConverterCache) -> Result<ArcConverter<T>, Error> {
        Ok(Arc::new(ProjectedConverter {
            inner: cache.resolve::<S>()?,
            project: self.project,
            unproject: self.unproject,
        }))
    }
}

struct ProjectedConverter<T: 'static, S> {
    inner: ArcConverter<S>,
    project: for<'a> fn(&'a T) -> &'a S,
    unproject: fn(S) -> T,
}

impl<T: Send + Sync + 'static, S: Shaped> Converter<T> for ProjectedConverter<T, S> {
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        self.inner.write(w, (self.project)(value), cx)
    }

    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<T, Error> {
        Ok((self.unproject)(self.inner.read(r, cx)?))
    }
}

impl<T: Clone + Send + Sync + 'static, S: Shaped> ConverterBinding<T> for SharedShape<T, S> {
    fn build(&self, cache: &ConverterCache) -> Result<ArcConverter<T>, Error> {
        let base: ArcConverter<T> = Arc::new(ProjectedConverter {
            inner: cache.resolve::<S>()?,
            project: self.project,
            unproject: self.unproject,
        });
        if cache.options().preserve_references == RefMode::Off {
            return Ok(base);
        }
        Ok(Arc::new(RefPreservingConverter {
            type_name: self.type_name,
            identity: self.identity,
            inner: base,
        }))
    }
}
