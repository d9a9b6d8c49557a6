// SPDX-License-Identifier: Apache-2.0
//! Shape-to-converter synthesis.
//!
//! Each submodule builds one converter variant; [`build_from_shape`] is
//! the dispatch the cache calls on a cache miss. Builders resolve member
//! converters back through the cache, which is what makes recursion and
//! memoization work.

pub(crate) mod duck;
pub(crate) mod enums;
pub(crate) mod map;
pub(crate) mod nullable;
pub(crate) mod object;
pub(crate) mod object_array;
pub(crate) mod seq;
pub(crate) mod surrogate;
pub(crate) mod union;

use crate::cache::ConverterCache;
use crate::convert::ArcConverter;
use crate::error::Error;
use crate::shape::{Shape, Shaped};

/// Builds the converter for `T` from its declared shape.
pub(crate) fn build_from_shape<T: Shaped>(
    cache: &ConverterCache,
) -> Result<ArcConverter<T>, Error> {
    match T::shape() {
        Shape::Scalar(converter) => Ok(converter),
        Shape::Object(shape) => object::build(shape, cache),
        Shape::Enum(shape) => Ok(enums::build(&shape)),
        Shape::Union(shape) => union::build(shape, cache),
        Shape::Enumerable(binding)
        | Shape::Dictionary(binding)
        | Shape::Nullable(binding)
        | Shape::Surrogate(binding)
        | Shape::MultiDim(binding) => binding.build(cache),
    }
}
