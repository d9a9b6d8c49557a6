// SPDX-License-Identifier: Apache-2.0
//! Nullable converter: Nil on the wire for `None`, the element encoding
//! otherwise.

use std::sync::Arc;

use mote_wire::{SyncReader, Writer};

use crate::cache::ConverterCache;
use crate::context::{ReadContext, WriteContext};
use crate::convert::{ArcConverter, Converter};
use crate::error::Error;
use crate::shape::{ConverterBinding, OptionShape, Shaped};

impl<U: Shaped> ConverterBinding<Option<U>> for OptionShape<U> {
    fn build(&self, cache: &ConverterCache) -> Result<ArcConverter<Option<U>>, Error> {
        Ok(Arc::new(OptionConverter {
            inner: cache.resolve::<U>()?,
        }))
    }
}

struct OptionConverter<U> {
    inner: ArcConverter<U>,
}

impl<U: Shaped> Converter<Option<U>> for OptionConverter<U> {
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &Option<U>,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        match value {
            None => {
                w.write_nil();
                Ok(())
            }
            Some(present) => self.inner.write(w, present, cx),
        }
    }

    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<Option<U>, Error> {
        if r.try_read_nil()? {
            return Ok(None);
        }
        Ok(Some(self.inner.read(r, cx)?))
    }
}
