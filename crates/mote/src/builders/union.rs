// SPDX-License-Identifier: Apache-2.0
//! Alias-discriminated union converter, plus the shared case-binding
//! bridge used by both union layouts.
//!
//! Alias layout: a two-element array of `(alias, payload)`. The alias is
//! the case's declared string name, or its numeric code when one is
//! declared and the compact-alias policy is on. Writing selects the case
//! by runtime identity (the first case whose projection accepts the
//! value); reading looks the alias up and defers to the case converter
//! for the payload.

use std::sync::Arc;

use mote_wire::{Family, SyncReader, Writer};
use rustc_hash::FxHashMap;

use crate::cache::ConverterCache;
use crate::context::{ReadContext, WriteContext};
use crate::convert::{ArcConverter, Converter};
use crate::error::Error;
use crate::shape::{
    BoundUnionCase, CaseIo, Shape, Shaped, UnionCaseIo, UnionShape,
};

pub(crate) struct BoundCase<T> {
    pub(crate) name: &'static str,
    pub(crate) code: Option<u32>,
    pub(crate) bound: Box<dyn BoundUnionCase<T>>,
}

pub(crate) fn bind_cases<T: 'static>(
    shape: &UnionShape<T>,
    cache: &ConverterCache,
) -> Result<Vec<BoundCase<T>>, Error> {
    shape
        .cases
        .iter()
        .map(|case| {
            Ok(BoundCase {
                name: case.name,
                code: case.code,
                bound: case.io.bind(cache)?,
            })
        })
        .collect()
}

pub(crate) fn build<T: Send + Sync + 'static>(
    shape: UnionShape<T>,
    cache: &ConverterCache,
) -> Result<ArcConverter<T>, Error> {
    if shape.cases.is_empty() {
        return Err(Error::InvalidShape {
            type_name: shape.type_name,
            detail: "union declares no cases",
        });
    }
    let aliased = shape.cases.iter().filter(|c| c.aliased).count();
    if aliased == 0 {
        return super::duck::build(shape, cache);
    }
    if aliased != shape.cases.len() {
        return Err(Error::InvalidShape {
            type_name: shape.type_name,
            detail: "either every union case declares an alias or none does",
        });
    }

    let cases = bind_cases(&shape, cache)?;
    let mut by_name = FxHashMap::default();
    let mut by_code = FxHashMap::default();
    for (idx, case) in cases.iter().enumerate() {
        if by_name.insert(case.name, idx).is_some() {
            return Err(Error::InvalidShape {
                type_name: shape.type_name,
                detail: "duplicate union alias name",
            });
        }
        if let Some(code) = case.code {
            if by_code.insert(code, idx).is_some() {
                return Err(Error::InvalidShape {
                    type_name: shape.type_name,
                    detail: "duplicate union alias code",
                });
            }
        }
    }

    Ok(Arc::new(AliasUnionConverter {
        type_name: shape.type_name,
        cases,
        by_name,
        by_code,
    }))
}

struct AliasUnionConverter<T> {
    type_name: &'static str,
    cases: Vec<BoundCase<T>>,
    by_name: FxHashMap<&'static str, usize>,
    by_code: FxHashMap<u32, usize>,
}

impl<T: Send + Sync + 'static> Converter<T> for AliasUnionConverter<T> {
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        cx.enter()?;
        let case = self
            .cases
            .iter()
            .find(|case| case.bound.matches(value))
            .ok_or_else(|| Error::AmbiguousOrUnknownSubtype {
                type_name: self.type_name,
                detail: "no declared case accepts this value".to_string(),
            })?;
        w.write_array_header(2);
        match case.code {
            Some(code) if cx.options().prefer_compact_aliases => w.write_uint(u64::from(code)),
            _ => w.write_str(case.name),
        }
        case.bound.write_payload(w, value, cx)?;
        cx.exit();
        Ok(())
    }

    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<T, Error> {
        cx.enter()?;
        let len = r.read_array_header()?;
        if len != 2 {
            cx.exit();
            return Err(Error::InvalidData {
                type_name: self.type_name,
                detail: format!("union envelope must have 2 elements, found {len}"),
            });
        }
        let lead = r.peek_code()?;
        let case = if Family::of(lead) == Family::Str {
            let alias = r.read_str()?;
            self.by_name.get(alias).copied().ok_or_else(|| {
                Error::AmbiguousOrUnknownSubtype {
                    type_name: self.type_name,
                    detail: format!("unknown alias `{alias}`"),
                }
            })
        } else {
            let alias: u32 = r.read_int()?;
            self.by_code.get(&alias).copied().ok_or_else(|| {
                Error::AmbiguousOrUnknownSubtype {
                    type_name: self.type_name,
                    detail: format!("unknown alias code {alias}"),
                }
            })
        };
        let result = match case {
            Ok(idx) => self.cases[idx].bound.read_payload(r, cx),
            Err(e) => Err(e),
        };
        cx.exit();
        result
    }
}

// ── Case binding bridge ─────────────────────────────────────────────

impl<T: Send + Sync + 'static, C: Shaped> UnionCaseIo<T> for CaseIo<T, C> {
    fn bind(&self, cache: &ConverterCache) -> Result<Box<dyn BoundUnionCase<T>>, Error> {
        // Structural identification needs the case's demanded keys; they
        // come from the subtype's own shape, with the naming policy
        // already applied.
        let required_keys = match C::shape() {
            Shape::Object(object) => {
                object.required_wire_names(cache.options().naming_policy)
            }
            _ => Vec::new(),
        };
        Ok(Box::new(BoundCaseImpl {
            converter: cache.resolve::<C>()?,
            pick: self.pick,
            make: self.make,
            required_keys,
        }))
    }
}

struct BoundCaseImpl<T: 'static, C> {
    converter: ArcConverter<C>,
    pick: for<'a> fn(&'a T) -> Option<&'a C>,
    make: fn(C) -> T,
    required_keys: Vec<Vec<u8>>,
}

impl<T: Send + Sync + 'static, C: Shaped> BoundUnionCase<T> for BoundCaseImpl<T, C> {
    fn matches(&self, value: &T) -> bool {
        (self.pick)(value).is_some()
    }

    fn write_payload(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        let payload = (self.pick)(value).ok_or_else(|| Error::AmbiguousOrUnknownSubtype {
            type_name: std::any::type_name::<T>(),
            detail: "case no longer accepts the value it matched".to_string(),
        })?;
        self.converter.write(w, payload, cx)
    }

    fn read_payload(
        &self,
        r: &mut SyncReader<'_>,
        cx: &mut ReadContext<'_>,
    ) -> Result<T, Error> {
        Ok((self.make)(self.converter.read(r, cx)?))
    }

    fn required_keys(&self) -> &[Vec<u8>] {
        &self.required_keys
    }
}
