// SPDX-License-Identifier: Apache-2.0
//! Object shapes: properties, constructors, and their erased bindings.

use std::any::Any;
use std::marker::PhantomData;

use mote_wire::{SyncReader, Writer};

use crate::cache::ConverterCache;
use crate::context::{ReadContext, WriteContext};
use crate::error::Error;
use crate::options::NamingPolicy;
use crate::shape::Shaped;

/// Shape of an object type: named properties plus a construction recipe.
///
/// When every property carries a wire index the object serializes as an
/// array keyed by position; otherwise it serializes as a string-keyed
/// map.
pub struct ObjectShape<T: 'static> {
    pub(crate) type_name: &'static str,
    pub(crate) properties: Vec<Property<T>>,
    pub(crate) construction: Construction<T>,
}

/// How an object is rebuilt during deserialization.
pub(crate) enum Construction<T> {
    /// Start from a default instance, assign through property setters.
    Fields {
        /// Produces the instance that setters populate.
        default: fn() -> T,
    },
    /// Accumulate arguments, then invoke a parameterized constructor.
    Parameterized(Box<dyn CtorBinding<T>>),
}

impl<T: 'static> ObjectShape<T> {
    /// An object rebuilt by populating a default instance.
    pub fn with_default(type_name: &'static str, default: fn() -> T) -> Self {
        Self {
            type_name,
            properties: Vec::new(),
            construction: Construction::Fields { default },
        }
    }

    /// An object rebuilt through a parameterized constructor.
    pub fn with_ctor<S: Send + 'static>(
        type_name: &'static str,
        ctor: CtorShape<S, T>,
    ) -> Self {
        Self {
            type_name,
            properties: Vec::new(),
            construction: Construction::Parameterized(Box::new(ctor)),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn property(mut self, property: Property<T>) -> Self {
        self.properties.push(property);
        self
    }

    /// Wire names of the properties a payload must contain for this
    /// object to be a structural-union candidate: required constructor
    /// parameters, or properties explicitly marked required.
    pub(crate) fn required_wire_names(&self, policy: NamingPolicy) -> Vec<Vec<u8>> {
        match &self.construction {
            Construction::Parameterized(ctor) => ctor
                .param_infos()
                .into_iter()
                .filter(|p| p.required)
                .map(|p| policy.apply(p.name).into_bytes())
                .collect(),
            Construction::Fields { .. } => self
                .properties
                .iter()
                .filter(|p| p.required)
                .map(|p| p.wire_name(policy).into_bytes())
                .collect(),
        }
    }
}

/// One property of an object shape, element type erased.
pub struct Property<T: 'static> {
    pub(crate) name: &'static str,
    pub(crate) rename: Option<&'static str>,
    pub(crate) index: Option<u32>,
    pub(crate) required: bool,
    pub(crate) io: Box<dyn PropertyIo<T>>,
}

impl<T: 'static> Property<T> {
    /// The name this property uses on the wire under `policy`.
    ///
    /// Explicit renames bypass the policy.
    pub(crate) fn wire_name(&self, policy: NamingPolicy) -> String {
        match self.rename {
            Some(explicit) => explicit.to_string(),
            None => policy.apply(self.name),
        }
    }
}

/// Typed builder for a [`Property`].
pub struct PropertyDef<T: 'static, U: Shaped> {
    name: &'static str,
    get: for<'a> fn(&'a T) -> &'a U,
    set: Option<fn(&mut T, U)>,
    is_default: Option<fn(&U) -> bool>,
    is_nil: Option<fn(&U) -> bool>,
    rename: Option<&'static str>,
    index: Option<u32>,
    required: bool,
}

impl<T: Send + Sync + 'static, U: Shaped> PropertyDef<T, U> {
    /// A read-only property projecting `U` out of `T`.
    pub fn new(name: &'static str, get: for<'a> fn(&'a T) -> &'a U) -> Self {
        Self {
            name,
            get,
            set: None,
            is_default: None,
            is_nil: None,
            rename: None,
            index: None,
            required: false,
        }
    }

    /// Makes the property writable during deserialization.
    #[must_use]
    pub fn with_setter(mut self, set: fn(&mut T, U)) -> Self {
        self.set = Some(set);
        self
    }

    /// Fixes the wire name, bypassing the naming policy.
    #[must_use]
    pub fn renamed(mut self, wire_name: &'static str) -> Self {
        self.rename = Some(wire_name);
        self
    }

    /// Assigns a stable wire index for the array-keyed layout.
    #[must_use]
    pub fn indexed(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// Marks the property required: always written under the
    /// required-only defaults policy, and demanded of structural-union
    /// payloads.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declares the default-value test used by the required-only
    /// defaults policy.
    #[must_use]
    pub fn default_when(mut self, is_default: fn(&U) -> bool) -> Self {
        self.is_default = Some(is_default);
        self
    }

    /// Declares the null test used by the never-null defaults policy.
    #[must_use]
    pub fn nil_when(mut self, is_nil: fn(&U) -> bool) -> Self {
        self.is_nil = Some(is_nil);
        self
    }

    /// Erases the element type.
    #[must_use]
    pub fn finish(self) -> Property<T> {
        Property {
            name: self.name,
            rename: self.rename,
            index: self.index,
            required: self.required,
            io: Box::new(FieldIo {
                get: self.get,
                set: self.set,
                is_default: self.is_default,
                is_nil: self.is_nil,
                _marker: PhantomData,
            }),
        }
    }
}

/// Typed field accessors behind [`PropertyIo`].
pub(crate) struct FieldIo<T: 'static, U: Shaped> {
    pub(crate) get: for<'a> fn(&'a T) -> &'a U,
    pub(crate) set: Option<fn(&mut T, U)>,
    pub(crate) is_default: Option<fn(&U) -> bool>,
    pub(crate) is_nil: Option<fn(&U) -> bool>,
    pub(crate) _marker: PhantomData<fn() -> U>,
}

/// Erased property: resolves its element converter through the cache.
pub trait PropertyIo<T>: Send + Sync {
    /// Binds the property to its element converter.
    fn bind(&self, cache: &ConverterCache) -> Result<Box<dyn BoundProperty<T>>, Error>;
}

/// A property bound to its element converter, ready for use.
pub trait BoundProperty<T>: Send + Sync {
    /// Writes the property's value (not its key).
    fn write_value(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error>;

    /// Whether the current value equals the declared default. Returns
    /// `false` when no default test was declared.
    fn is_default(&self, value: &T) -> bool;

    /// Whether the current value is null. Returns `false` when no null
    /// test was declared.
    fn is_nil(&self, value: &T) -> bool;

    /// Whether the property has a setter.
    fn writable(&self) -> bool;

    /// Reads the next value into the property of `target`.
    fn read_into(
        &self,
        r: &mut SyncReader<'_>,
        cx: &mut ReadContext<'_>,
        target: &mut T,
    ) -> Result<(), Error>;
}

/// Parameterized-constructor shape: an argument-state struct `S`, typed
/// parameter slots, and a finish step producing `T`.
pub struct CtorShape<S: 'static, T: 'static> {
    pub(crate) new_state: fn() -> S,
    pub(crate) finish: fn(S) -> Result<T, Error>,
    pub(crate) params: Vec<CtorParam<S>>,
}

impl<S: Send + 'static, T: 'static> CtorShape<S, T> {
    /// Declares the argument state and the finishing constructor call.
    pub fn new(new_state: fn() -> S, finish: fn(S) -> Result<T, Error>) -> Self {
        Self {
            new_state,
            finish,
            params: Vec::new(),
        }
    }

    /// Adds a constructor parameter.
    #[must_use]
    pub fn param(mut self, param: CtorParam<S>) -> Self {
        self.params.push(param);
        self
    }
}

/// One constructor parameter, element type erased.
pub struct CtorParam<S: 'static> {
    pub(crate) name: &'static str,
    pub(crate) required: bool,
    pub(crate) io: Box<dyn ParamIo<S>>,
}

impl<S: Send + 'static> CtorParam<S> {
    /// A parameter decoded as `U` and stored into the argument state.
    pub fn new<U: Shaped>(name: &'static str, set: fn(&mut S, U)) -> Self {
        Self {
            name,
            required: false,
            io: Box::new(ParamSetter {
                set,
                _marker: PhantomData,
            }),
        }
    }

    /// Marks the parameter required; its absence fails deserialization.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Typed parameter setter behind [`ParamIo`].
pub(crate) struct ParamSetter<S: 'static, U: Shaped> {
    pub(crate) set: fn(&mut S, U),
    pub(crate) _marker: PhantomData<fn() -> U>,
}

/// Erased constructor parameter.
pub(crate) trait ParamIo<S>: Send + Sync {
    fn bind(&self, cache: &ConverterCache) -> Result<Box<dyn BoundParam<S>>, Error>;
}

/// A parameter bound to its element converter.
pub(crate) trait BoundParam<S>: Send + Sync {
    fn read_into(
        &self,
        r: &mut SyncReader<'_>,
        cx: &mut ReadContext<'_>,
        state: &mut S,
    ) -> Result<(), Error>;
}

/// Name and requiredness of a constructor parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamInfo {
    /// Declared parameter name.
    pub name: &'static str,
    /// Whether absence is an error.
    pub required: bool,
}

/// Erased constructor recipe.
pub trait CtorBinding<T>: Send + Sync {
    /// Binds every parameter to its element converter.
    fn bind(&self, cache: &ConverterCache) -> Result<Box<dyn BoundCtor<T>>, Error>;

    /// Parameter metadata, available without binding.
    fn param_infos(&self) -> Vec<ParamInfo>;
}

/// A constructor bound to its parameter converters.
pub trait BoundCtor<T>: Send + Sync {
    /// Parameter metadata, index-aligned with `read_param`.
    fn infos(&self) -> &[ParamInfo];

    /// Fresh argument state for one deserialization.
    fn new_state(&self) -> Box<dyn Any + Send>;

    /// Decodes the next value into parameter `idx` of `state`.
    fn read_param(
        &self,
        idx: usize,
        state: &mut (dyn Any + Send),
        r: &mut SyncReader<'_>,
        cx: &mut ReadContext<'_>,
    ) -> Result<(), Error>;

    /// Invokes the constructor over the accumulated arguments.
    fn finish(&self, state: Box<dyn Any + Send>) -> Result<T, Error>;
}
