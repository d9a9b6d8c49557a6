// SPDX-License-Identifier: Apache-2.0
//! Map-keyed object converter.
//!
//! Wire layout: a map of string keys to property values. Keys are
//! precomputed once at build time, with the naming policy already
//! applied and the full string token pre-encoded. Reading dispatches
//! each key through a byte-keyed table; unknown keys are skipped along
//! with their value, and key order on the wire is irrelevant.

use std::any::Any;
use std::marker::PhantomData;

use mote_wire::{SyncReader, Writer};
use rustc_hash::FxHashMap;

use crate::cache::ConverterCache;
use crate::context::{ReadContext, WriteContext};
use crate::convert::{ArcConverter, Converter};
use crate::error::Error;
use crate::options::{pascal_variant, DefaultsPolicy, NamingPolicy};
use crate::shape::{
    BoundCtor, BoundParam, BoundProperty, Construction, CtorBinding, CtorShape, FieldIo,
    ObjectShape, ParamInfo, ParamIo, ParamSetter, Property, PropertyIo, Shaped,
};

use std::sync::Arc;

/// A property bound to its converter plus its precomputed wire key.
pub(crate) struct WireProperty<T> {
    /// Raw UTF-8 wire name (policy applied).
    pub(crate) key: Vec<u8>,
    /// Complete pre-encoded string token for the key.
    pub(crate) key_token: Vec<u8>,
    pub(crate) required: bool,
    pub(crate) bound: Box<dyn BoundProperty<T>>,
}

impl<T> WireProperty<T> {
    pub(crate) fn include(&self, value: &T, policy: DefaultsPolicy) -> bool {
        match policy {
            DefaultsPolicy::Always => true,
            DefaultsPolicy::Required => self.required || !self.bound.is_default(value),
            DefaultsPolicy::NeverNull => !self.bound.is_nil(value),
        }
    }
}

/// Binds properties and precomputes their wire keys.
pub(crate) fn bind_properties<T: 'static>(
    properties: &[Property<T>],
    policy: NamingPolicy,
    cache: &ConverterCache,
) -> Result<Vec<WireProperty<T>>, Error> {
    properties
        .iter()
        .map(|property| {
            let name = property.wire_name(policy);
            let mut key_token = Vec::with_capacity(name.len() + 5);
            {
                let mut w = Writer::new(&mut key_token);
                w.write_str(&name);
            }
            Ok(WireProperty {
                key: name.into_bytes(),
                key_token,
                required: property.required,
                bound: property.io.bind(cache)?,
            })
        })
        .collect()
}

fn key_table<T>(props: &[WireProperty<T>]) -> FxHashMap<Box<[u8]>, usize> {
    props
        .iter()
        .enumerate()
        .map(|(i, p)| (p.key.clone().into_boxed_slice(), i))
        .collect()
}

/// Builds the object converter, choosing the array layout when every
/// property declares a wire index.
pub(crate) fn build<T: Send + Sync + 'static>(
    shape: ObjectShape<T>,
    cache: &ConverterCache,
) -> Result<ArcConverter<T>, Error> {
    let indexed = !shape.properties.is_empty()
        && shape.properties.iter().all(|p| p.index.is_some());
    if indexed {
        return super::object_array::build(shape, cache);
    }

    let policy = cache.options().naming_policy;
    let props = bind_properties(&shape.properties, policy, cache)?;
    let lookup = key_table(&props);

    let reader = match shape.construction {
        Construction::Fields { default } => MapReader::Fields { default },
        Construction::Parameterized(ctor) => {
            let bound = ctor.bind(cache)?;
            let mut params = FxHashMap::default();
            for (idx, info) in bound.infos().iter().enumerate() {
                let declared = policy.apply(info.name).into_bytes().into_boxed_slice();
                params.entry(declared).or_insert(idx);
                // Positional records written by PascalCase producers must
                // still bind, whatever the declared spelling.
                let pascal = pascal_variant(info.name).into_bytes().into_boxed_slice();
                params.entry(pascal).or_insert(idx);
            }
            MapReader::Ctor {
                ctor: bound,
                params,
            }
        }
    };

    Ok(Arc::new(ObjectMapConverter {
        type_name: shape.type_name,
        props,
        lookup,
        reader,
    }))
}

enum MapReader<T> {
    Fields { default: fn() -> T },
    Ctor {
        ctor: Box<dyn BoundCtor<T>>,
        params: FxHashMap<Box<[u8]>, usize>,
    },
}

struct ObjectMapConverter<T> {
    type_name: &'static str,
    props: Vec<WireProperty<T>>,
    lookup: FxHashMap<Box<[u8]>, usize>,
    reader: MapReader<T>,
}

impl<T: Send + Sync + 'static> Converter<T> for ObjectMapConverter<T> {
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        cx.enter()?;
        let policy = cx.options().serialize_defaults;
        let included: Vec<&WireProperty<T>> = self
            .props
            .iter()
            .filter(|p| p.include(value, policy))
            .collect();
        w.write_map_header(included.len() as u32);
        for prop in included {
            w.write_raw(&prop.key_token);
            prop.bound.write_value(w, value, cx)?;
        }
        w.flush_if_appropriate(cx.options().flush_threshold);
        cx.exit();
        Ok(())
    }

    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<T, Error> {
        cx.enter()?;
        let entries = r.read_map_header()?;
        let result = match &self.reader {
            MapReader::Fields { default } => {
                self.read_into_fields(r, cx, entries, *default)
            }
            MapReader::Ctor { ctor, params } => {
                self.read_via_ctor(r, cx, entries, ctor.as_ref(), params)
            }
        };
        cx.exit();
        result
    }
}

impl<T: Send + Sync + 'static> ObjectMapConverter<T> {
    fn read_into_fields(
        &self,
        r: &mut SyncReader<'_>,
        cx: &mut ReadContext<'_>,
        entries: u32,
        default: fn() -> T,
    ) -> Result<T, Error> {
        let mut target = default();
        for _ in 0..entries {
            let key = r.read_str_slice()?;
            match self.lookup.get(key) {
                Some(&idx) if self.props[idx].bound.writable() => {
                    self.props[idx].bound.read_into(r, cx, &mut target)?;
                }
                _ => r.skip(cx.depth_mut())?,
            }
        }
        Ok(target)
    }

    fn read_via_ctor(
        &self,
        r: &mut SyncReader<'_>,
        cx: &mut ReadContext<'_>,
        entries: u32,
        ctor: &dyn BoundCtor<T>,
        params: &FxHashMap<Box<[u8]>, usize>,
    ) -> Result<T, Error> {
        let mut state = ctor.new_state();
        let mut present = vec![false; ctor.infos().len()];
        for _ in 0..entries {
            let key = r.read_str_slice()?;
            match params.get(key) {
                Some(&idx) => {
                    ctor.read_param(idx, state.as_mut(), r, cx)?;
                    present[idx] = true;
                }
                None => r.skip(cx.depth_mut())?,
            }
        }
        for (idx, info) in ctor.infos().iter().enumerate() {
            if info.required && !present[idx] {
                return Err(Error::MissingRequiredProperty {
                    type_name: self.type_name,
                    name: info.name,
                });
            }
        }
        ctor.finish(state)
    }
}

// ── Erasure bridges for the shape layer ─────────────────────────────

impl<T: Send + Sync + 'static, U: Shaped> PropertyIo<T> for FieldIo<T, U> {
    fn bind(&self, cache: &ConverterCache) -> Result<Box<dyn BoundProperty<T>>, Error> {
        Ok(Box::new(BoundField {
            converter: cache.resolve::<U>()?,
            get: self.get,
            set: self.set,
            is_default: self.is_default,
            is_nil: self.is_nil,
        }))
    }
}

struct BoundField<T: 'static, U> {
    converter: ArcConverter<U>,
    get: for<'a> fn(&'a T) -> &'a U,
    set: Option<fn(&mut T, U)>,
    is_default: Option<fn(&U) -> bool>,
    is_nil: Option<fn(&U) -> bool>,
}

impl<T: Send + Sync + 'static, U: Shaped> BoundProperty<T> for BoundField<T, U> {
    fn write_value(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        self.converter.write(w, (self.get)(value), cx)
    }

    fn is_default(&self, value: &T) -> bool {
        self.is_default
            .is_some_and(|check| check((self.get)(value)))
    }

    fn is_nil(&self, value: &T) -> bool {
        self.is_nil.is_some_and(|check| check((self.get)(value)))
    }

    fn writable(&self) -> bool {
        self.set.is_some()
    }

    fn read_into(
        &self,
        r: &mut SyncReader<'_>,
        cx: &mut ReadContext<'_>,
        target: &mut T,
    ) -> Result<(), Error> {
        let decoded = self.converter.read(r, cx)?;
        if let Some(set) = self.set {
            set(target, decoded);
        }
        Ok(())
    }
}

impl<S: Send + 'static, U: Shaped> ParamIo<S> for ParamSetter<S, U> {
    fn bind(&self, cache: &ConverterCache) -> Result<Box<dyn BoundParam<S>>, Error> {
        Ok(Box::new(BoundParamImpl {
            converter: cache.resolve::<U>()?,
            set: self.set,
        }))
    }
}

struct BoundParamImpl<S, U> {
    converter: ArcConverter<U>,
    set: fn(&mut S, U),
}

impl<S: Send + 'static, U: Shaped> BoundParam<S> for BoundParamImpl<S, U> {
    fn read_into(
        &self,
        r: &mut SyncReader<'_>,
        cx: &mut ReadContext<'_>,
        state: &mut S,
    ) -> Result<(), Error> {
        let decoded = self.converter.read(r, cx)?;
        (self.set)(state, decoded);
        Ok(())
    }
}

impl<S: Send + 'static, T: 'static> CtorBinding<T> for CtorShape<S, T> {
    fn bind(&self, cache: &ConverterCache) -> Result<Box<dyn BoundCtor<T>>, Error> {
        let bound = self
            .params
            .iter()
            .map(|param| {
                Ok((
                    ParamInfo {
                        name: param.name,
                        required: param.required,
                    },
                    param.io.bind(cache)?,
                ))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let (infos, params): (Vec<_>, Vec<_>) = bound.into_iter().unzip();
        Ok(Box::new(BoundCtorImpl {
            new_state: self.new_state,
            finish: self.finish,
            infos,
            params,
            _marker: PhantomData,
        }))
    }

    fn param_infos(&self) -> Vec<ParamInfo> {
        self.params
            .iter()
            .map(|param| ParamInfo {
                name: param.name,
                required: param.required,
            })
            .collect()
    }
}

struct BoundCtorImpl<S: 'static, T> {
    new_state: fn() -> S,
    finish: fn(S) -> Result<T, Error>,
    infos: Vec<ParamInfo>,
    params: Vec<Box<dyn BoundParam<S>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<S: Send + 'static, T: 'static> BoundCtor<T> for BoundCtorImpl<S, T> {
    fn infos(&self) -> &[ParamInfo] {
        &self.infos
    }

    fn new_state(&self) -> Box<dyn Any + Send> {
        Box::new((self.new_state)())
    }

    fn read_param(
        &self,
        idx: usize,
        state: &mut (dyn Any + Send),
        r: &mut SyncReader<'_>,
        cx: &mut ReadContext<'_>,
    ) -> Result<(), Error> {
        let state = state.downcast_mut::<S>().ok_or(Error::InvalidShape {
            type_name: std::any::type_name::<T>(),
            detail: "constructor state type confusion",
        })?;
        match self.params.get(idx) {
            Some(param) => param.read_into(r, cx, state),
            None => Err(Error::InvalidShape {
                type_name: std::any::type_name::<T>(),
                detail: "constructor parameter index out of range",
            }),
        }
    }

    fn finish(&self, state: Box<dyn Any + Send>) -> Result<T, Error> {
        let state = state.downcast::<S>().map_err(|_| Error::InvalidShape {
            type_name: std::any::type_name::<T>(),
            detail: "constructor state type confusion",
        })?;
        (self.finish)(*state)
    }
}
