// SPDX-License-Identifier: Apache-2.0
//! Dictionary converter: a map of key encodings to value encodings.

use std::sync::Arc;

use mote_wire::{SyncReader, Writer};

use crate::cache::ConverterCache;
use crate::context::{ReadContext, WriteContext};
use crate::convert::{ArcConverter, Converter};
use crate::error::Error;
use crate::shape::{ConverterBinding, DictionaryInit, DictionaryShape, Shaped};

impl<T: Send + Sync + 'static, K: Shaped, V: Shaped> ConverterBinding<T>
    for DictionaryShape<T, K, V>
{
    fn build(&self, cache: &ConverterCache) -> Result<ArcConverter<T>, Error> {
        Ok(Arc::new(DictionaryConverter {
            key: cache.resolve::<K>()?,
            value: cache.resolve::<V>()?,
            len: self.len,
            iter: self.iter,
            init: self.init.clone(),
        }))
    }
}

impl<T, K, V> Clone for DictionaryInit<T, K, V> {
    fn clone(&self) -> Self {
        match self {
            Self::WriteOnly => Self::WriteOnly,
            Self::Insert { new, insert } => Self::Insert {
                new: *new,
                insert: *insert,
            },
            Self::FromVec { finish } => Self::FromVec { finish: *finish },
        }
    }
}

struct DictionaryConverter<T: 'static, K: 'static, V: 'static> {
    key: ArcConverter<K>,
    value: ArcConverter<V>,
    len: fn(&T) -> usize,
    iter: for<'a> fn(&'a T) -> Box<dyn Iterator<Item = (&'a K, &'a V)> + 'a>,
    init: DictionaryInit<T, K, V>,
}

impl<T: Send + Sync + 'static, K: Shaped, V: Shaped> Converter<T>
    for DictionaryConverter<T, K, V>
{
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        cx.enter()?;
        w.write_map_header((self.len)(value) as u32);
        for (entry_key, entry_value) in (self.iter)(value) {
            self.key.write(w, entry_key, cx)?;
            self.value.write(w, entry_value, cx)?;
        }
        w.flush_if_appropriate(cx.options().flush_threshold);
        cx.exit();
        Ok(())
    }

    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<T, Error> {
        cx.enter()?;
        let entries = r.read_map_header()? as usize;
        let result = match &self.init {
            DictionaryInit::WriteOnly => Err(Error::InvalidShape {
                type_name: std::any::type_name::<T>(),
                detail: "dictionary is declared write-only",
            }),
            DictionaryInit::Insert { new, insert } => {
                let mut target = new(entries);
                for _ in 0..entries {
                    let entry_key = self.key.read(r, cx)?;
                    let entry_value = self.value.read(r, cx)?;
                    insert(&mut target, entry_key, entry_value);
                }
                Ok(target)
            }
            DictionaryInit::FromVec { finish } => {
                let mut buffer = Vec::with_capacity(entries);
                for _ in 0..entries {
                    let entry_key = self.key.read(r, cx)?;
                    let entry_value = self.value.read(r, cx)?;
                    buffer.push((entry_key, entry_value));
                }
                finish(buffer)
            }
        };
        cx.exit();
        result
    }
}
