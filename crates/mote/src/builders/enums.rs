// SPDX-License-Identifier: Apache-2.0
//! Enum converter.
//!
//! Ordinal layout (the default) writes the value in its underlying
//! integer type. Name layout writes the declared name as a string;
//! values with no declared name (flag combinations) fall back to ordinal
//! encoding even in name mode. Reading always accepts both layouts.
//! Name lookup is case-insensitive, except for names that differ only in
//! case, which must match exactly.

use std::sync::Arc;

use mote_wire::{Family, SyncReader, Writer};
use rustc_hash::FxHashMap;

use crate::context::{ReadContext, WriteContext};
use crate::convert::{ArcConverter, Converter};
use crate::error::Error;
use crate::shape::EnumShape;

pub(crate) fn build<T: Send + Sync + 'static>(shape: &EnumShape<T>) -> ArcConverter<T> {
    let mut exact = FxHashMap::default();
    let mut folded: FxHashMap<String, Option<i64>> = FxHashMap::default();
    let mut names = FxHashMap::default();
    for (name, ordinal) in shape.entries {
        exact.insert(*name, *ordinal);
        names.entry(*ordinal).or_insert(*name);
        folded
            .entry(name.to_ascii_lowercase())
            .and_modify(|slot| *slot = None) // case-colliding names: exact match only
            .or_insert(Some(*ordinal));
    }
    Arc::new(EnumConverter {
        type_name: shape.type_name,
        to_ordinal: shape.to_ordinal,
        from_ordinal: shape.from_ordinal,
        exact,
        folded,
        names,
    })
}

struct EnumConverter<T: 'static> {
    type_name: &'static str,
    to_ordinal: fn(&T) -> i64,
    from_ordinal: fn(i64) -> Option<T>,
    exact: FxHashMap<&'static str, i64>,
    folded: FxHashMap<String, Option<i64>>,
    names: FxHashMap<i64, &'static str>,
}

impl<T: 'static> EnumConverter<T> {
    fn ordinal_of_name(&self, name: &str) -> Result<i64, Error> {
        if let Some(ordinal) = self.exact.get(name) {
            return Ok(*ordinal);
        }
        match self.folded.get(&name.to_ascii_lowercase()) {
            Some(Some(ordinal)) => Ok(*ordinal),
            Some(None) => Err(Error::InvalidData {
                type_name: self.type_name,
                detail: format!("name `{name}` is ambiguous without exact case"),
            }),
            None => Err(Error::InvalidData {
                type_name: self.type_name,
                detail: format!("unknown name `{name}`"),
            }),
        }
    }

    fn value_of_ordinal(&self, ordinal: i64) -> Result<T, Error> {
        (self.from_ordinal)(ordinal).ok_or_else(|| Error::InvalidData {
            type_name: self.type_name,
            detail: format!("unknown ordinal {ordinal}"),
        })
    }
}

impl<T: Send + Sync + 'static> Converter<T> for EnumConverter<T> {
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        let ordinal = (self.to_ordinal)(value);
        if cx.options().enum_by_name {
            if let Some(name) = self.names.get(&ordinal) {
                w.write_str(name);
                return Ok(());
            }
        }
        w.write_int(ordinal);
        Ok(())
    }

    fn read(&self, r: &mut SyncReader<'_>, _cx: &mut ReadContext<'_>) -> Result<T, Error> {
        let lead = r.peek_code()?;
        let ordinal = if Family::of(lead) == Family::Str {
            self.ordinal_of_name(r.read_str()?)?
        } else {
            r.read_int::<i64>()?
        };
        self.value_of_ordinal(ordinal)
    }
}
