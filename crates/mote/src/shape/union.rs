// SPDX-License-Identifier: Apache-2.0
//! Union shapes: alias-discriminated and structural polymorphism.

use std::marker::PhantomData;

use mote_wire::{SyncReader, Writer};

use crate::cache::ConverterCache;
use crate::context::{ReadContext, WriteContext};
use crate::error::Error;
use crate::shape::Shaped;

/// Shape of a closed polymorphic set.
///
/// Either every case declares an alias (wire layout: a two-element array
/// of alias and payload) or none does (structural identification by
/// required properties). Mixing the two is rejected at build time.
pub struct UnionShape<T: 'static> {
    pub(crate) type_name: &'static str,
    pub(crate) cases: Vec<UnionCase<T>>,
}

impl<T: 'static> UnionShape<T> {
    /// An empty union for `type_name`; add cases with
    /// [`UnionShape::case`].
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            cases: Vec::new(),
        }
    }

    /// Adds a case.
    #[must_use]
    pub fn case(mut self, case: UnionCase<T>) -> Self {
        self.cases.push(case);
        self
    }
}

/// Projects a union value onto one case's payload, when it is that case.
pub type CasePick<T, C> = for<'a> fn(&'a T) -> Option<&'a C>;

/// One union case, subtype erased.
pub struct UnionCase<T: 'static> {
    pub(crate) name: &'static str,
    pub(crate) code: Option<u32>,
    pub(crate) aliased: bool,
    pub(crate) io: Box<dyn UnionCaseIo<T>>,
}

impl<T: Send + Sync + 'static> UnionCase<T> {
    /// A case discriminated by the string alias `name` (and optionally a
    /// numeric alias via [`UnionCase::with_code`]).
    pub fn aliased<C: Shaped>(
        name: &'static str,
        pick: CasePick<T, C>,
        make: fn(C) -> T,
    ) -> Self {
        Self {
            name,
            code: None,
            aliased: true,
            io: Box::new(CaseIo {
                pick,
                make,
                _marker: PhantomData,
            }),
        }
    }

    /// Adds a numeric alias, preferred when the compact-alias policy is
    /// on.
    #[must_use]
    pub fn with_code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }

    /// A case with no alias, identified structurally by the required
    /// properties of `C`'s shape. `name` is used in diagnostics only.
    pub fn structural<C: Shaped>(
        name: &'static str,
        pick: CasePick<T, C>,
        make: fn(C) -> T,
    ) -> Self {
        Self {
            name,
            code: None,
            aliased: false,
            io: Box::new(CaseIo {
                pick,
                make,
                _marker: PhantomData,
            }),
        }
    }
}

/// Typed case accessors behind [`UnionCaseIo`].
pub(crate) struct CaseIo<T: 'static, C: Shaped> {
    pub(crate) pick: CasePick<T, C>,
    pub(crate) make: fn(C) -> T,
    pub(crate) _marker: PhantomData<fn() -> C>,
}

/// Erased union case: resolves the subtype converter through the cache.
pub trait UnionCaseIo<T>: Send + Sync {
    /// Binds the case to its subtype converter.
    fn bind(&self, cache: &ConverterCache) -> Result<Box<dyn BoundUnionCase<T>>, Error>;
}

/// A union case bound to its subtype converter.
pub trait BoundUnionCase<T>: Send + Sync {
    /// Whether `value` is this case.
    fn matches(&self, value: &T) -> bool;

    /// Writes the case payload (without any alias envelope).
    fn write_payload(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error>;

    /// Reads the case payload and lifts it into the union type.
    fn read_payload(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>)
        -> Result<T, Error>;

    /// Wire names of properties a payload must contain to be this case
    /// (structural identification). Empty when the subtype declares no
    /// required properties.
    fn required_keys(&self) -> &[Vec<u8>];
}
