// SPDX-License-Identifier: Apache-2.0
//! Structural (duck-typed) union converter.
//!
//! Used when no case declares an alias. The payload is written bare, as
//! the concrete case's own encoding; identification on read is
//! structural:
//!
//! 1. every case starts as a candidate;
//! 2. the payload must be a map, or identification fails;
//! 3. one look-ahead scan collects the payload's key set;
//! 4. cases whose required properties are not all present drop out;
//! 5. exactly one survivor wins; zero or several is an error, never a
//!    guess.
//!
//! Only the required-property filter is applied; value-kind filtering is
//! deliberately not attempted.

use std::sync::Arc;

use mote_wire::{Depth, Reader, SyncReader, Writer};
use rustc_hash::FxHashSet;

use crate::cache::ConverterCache;
use crate::context::{ReadContext, WriteContext};
use crate::convert::{ArcConverter, Converter};
use crate::error::Error;
use crate::shape::UnionShape;

use super::union::{bind_cases, BoundCase};

pub(crate) fn build<T: Send + Sync + 'static>(
    shape: UnionShape<T>,
    cache: &ConverterCache,
) -> Result<ArcConverter<T>, Error> {
    let cases = bind_cases(&shape, cache)?;
    Ok(Arc::new(DuckUnionConverter {
        type_name: shape.type_name,
        cases,
    }))
}

struct DuckUnionConverter<T> {
    type_name: &'static str,
    cases: Vec<BoundCase<T>>,
}

impl<T> DuckUnionConverter<T> {
    /// Scans the map payload ahead of the cursor and collects its keys.
    fn scan_keys<'a>(
        &self,
        mut peek: Reader<'a>,
        max_depth: usize,
    ) -> Result<FxHashSet<&'a [u8]>, Error> {
        let entries = peek
            .read_map_header()
            .into_result("map")
            .map_err(|_| self.unidentifiable("payload is not a map"))?;
        let mut keys = FxHashSet::default();
        let mut depth = Depth::new(max_depth);
        for _ in 0..entries {
            let key = peek
                .read_str_slice()
                .into_result("string key")
                .map_err(|_| self.unidentifiable("payload has a non-string key"))?;
            keys.insert(key);
            peek.skip(&mut depth).into_result("value")?;
        }
        Ok(keys)
    }

    fn unidentifiable(&self, detail: &str) -> Error {
        Error::AmbiguousOrUnknownSubtype {
            type_name: self.type_name,
            detail: detail.to_string(),
        }
    }
}

impl<T: Send + Sync + 'static> Converter<T> for DuckUnionConverter<T> {
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        let case = self
            .cases
            .iter()
            .find(|case| case.bound.matches(value))
            .ok_or_else(|| self.unidentifiable("no declared case accepts this value"))?;
        case.bound.write_payload(w, value, cx)
    }

    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<T, Error> {
        let keys = self.scan_keys(r.fork(), cx.options().max_depth)?;

        let mut winner: Option<usize> = None;
        for (idx, case) in self.cases.iter().enumerate() {
            let satisfied = case
                .bound
                .required_keys()
                .iter()
                .all(|required| keys.contains(required.as_slice()));
            if !satisfied {
                continue;
            }
            if let Some(previous) = winner {
                return Err(self.unidentifiable(&format!(
                    "payload satisfies both `{}` and `{}`",
                    self.cases[previous].name, case.name
                )));
            }
            winner = Some(idx);
        }

        match winner {
            Some(idx) => self.cases[idx].bound.read_payload(r, cx),
            None => Err(self.unidentifiable("no case's required properties are all present")),
        }
    }
}
