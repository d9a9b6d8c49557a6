// SPDX-License-Identifier: Apache-2.0
//! The type-shape interface.
//!
//! A shape is a structural description of a user type: what kind of thing
//! it is (object, sequence, dictionary, nullable, enum, union, surrogate,
//! grid) and how to navigate it. The converter layer consumes shapes; it
//! never produces them. Types advertise their shape through [`Shaped`],
//! and the cache keys converters on `std::any::TypeId`, so each type has
//! exactly one canonical shape per program.
//!
//! Shapes erase their element types: a `Property<T>` knows internally
//! that it projects a `U`, but exposes only object-safe operations. The
//! erasure bridge is the family of `*Io`/`Bound*` traits in this module,
//! whose generic implementations live beside the converter builders.

mod collections;
mod object;
mod surrogate;
mod union;

pub use collections::{
    DictionaryInit, DictionaryShape, GridShape, OptionShape, SequenceInit, SequenceShape,
};
pub use object::{
    BoundCtor, BoundProperty, CtorBinding, CtorParam, CtorShape, ObjectShape, ParamInfo,
    Property, PropertyDef, PropertyIo,
};
pub(crate) use object::{BoundParam, Construction, FieldIo, ParamIo, ParamSetter};
pub use surrogate::{MappedShape, ProjectedShape, SharedShape};
pub use union::{BoundUnionCase, CasePick, UnionCase, UnionCaseIo, UnionShape};
pub(crate) use union::CaseIo;

use crate::cache::ConverterCache;
use crate::convert::ArcConverter;
use crate::error::Error;

/// Types that describe their own structure.
///
/// Shape discovery (derive macros, code generation) is out of scope for
/// this crate; implementations are written by hand or generated
/// externally.
pub trait Shaped: Sized + Send + Sync + 'static {
    /// The canonical shape of this type.
    fn shape() -> Shape<Self>;
}

/// An erased shape binding that can produce the converter for `T`.
///
/// Implemented by the generic shape structs ([`SequenceShape`],
/// [`DictionaryShape`], [`MappedShape`], ...) next to the converter
/// builders they delegate to.
pub trait ConverterBinding<T>: Send + Sync {
    /// Builds the converter, resolving element converters through the
    /// cache.
    fn build(&self, cache: &ConverterCache) -> Result<ArcConverter<T>, Error>;
}

/// Enum description: a name/ordinal table plus conversion hooks.
pub struct EnumShape<T: 'static> {
    /// Diagnostic type name.
    pub type_name: &'static str,
    /// Declared `(name, ordinal)` pairs. Values without a declared name
    /// (flag combinations) are legal and fall back to ordinal encoding.
    pub entries: &'static [(&'static str, i64)],
    /// Projects a value to its ordinal in the underlying integer type.
    pub to_ordinal: fn(&T) -> i64,
    /// Rebuilds a value from an ordinal; `None` for unknown ordinals.
    pub from_ordinal: fn(i64) -> Option<T>,
}

/// Structural description of a user type.
pub enum Shape<T: 'static> {
    /// A leaf type with a self-contained converter.
    Scalar(ArcConverter<T>),
    /// String-keyed or index-keyed object with properties.
    Object(ObjectShape<T>),
    /// Homogeneous sequence.
    Enumerable(Box<dyn ConverterBinding<T>>),
    /// Key/value collection.
    Dictionary(Box<dyn ConverterBinding<T>>),
    /// Optional value; Nil on the wire when absent.
    Nullable(Box<dyn ConverterBinding<T>>),
    /// Named integral constants.
    Enum(EnumShape<T>),
    /// Closed polymorphic set, alias-discriminated or structural.
    Union(UnionShape<T>),
    /// Type converted through an intermediate representation.
    Surrogate(Box<dyn ConverterBinding<T>>),
    /// Array of rank greater than one.
    MultiDim(Box<dyn ConverterBinding<T>>),
}

impl<T: Send + Sync + 'static> Shape<T> {
    /// Wraps a sequence description.
    pub fn enumerable<E: Shaped>(shape: SequenceShape<T, E>) -> Self {
        Self::Enumerable(Box::new(shape))
    }

    /// Wraps a dictionary description.
    pub fn dictionary<K: Shaped, V: Shaped>(shape: DictionaryShape<T, K, V>) -> Self {
        Self::Dictionary(Box::new(shape))
    }

    /// Wraps a by-value surrogate mapping.
    pub fn mapped<S: Shaped>(shape: MappedShape<T, S>) -> Self {
        Self::Surrogate(Box::new(shape))
    }

    /// Wraps a borrowing surrogate projection (smart pointers).
    pub fn projected<S: Shaped>(shape: ProjectedShape<T, S>) -> Self {
        Self::Surrogate(Box::new(shape))
    }

    /// Wraps a grid description (an array of rank two or more).
    pub fn multi_dim<E: Shaped>(shape: GridShape<T, E>) -> Self {
        Self::MultiDim(Box::new(shape))
    }
}

impl<T: Clone + Send + Sync + 'static> Shape<T> {
    /// Wraps a projection whose values have shareable identity; such
    /// types participate in reference preservation.
    pub fn shared<S: Shaped>(shape: SharedShape<T, S>) -> Self {
        Self::Surrogate(Box::new(shape))
    }
}

impl<U: Shaped> Shape<Option<U>> {
    /// The canonical nullable shape for `Option<U>`.
    #[must_use]
    pub fn nullable() -> Self {
        Self::Nullable(Box::new(OptionShape::<U>::default()))
    }
}
