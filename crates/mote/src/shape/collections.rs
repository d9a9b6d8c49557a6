// SPDX-License-Identifier: Apache-2.0
//! Collection shapes: sequences, dictionaries, nullables and grids.

use std::marker::PhantomData;

use crate::error::Error;
use crate::shape::Shaped;

/// Shape of a homogeneous sequence of `E` values.
pub struct SequenceShape<T: 'static, E: Shaped> {
    /// Element count, known up front.
    pub len: fn(&T) -> usize,
    /// In-order borrowing iteration.
    pub iter: for<'a> fn(&'a T) -> Box<dyn Iterator<Item = &'a E> + 'a>,
    /// How instances are rebuilt during deserialization.
    pub init: SequenceInit<T, E>,
}

/// Sequence construction strategies.
pub enum SequenceInit<T, E> {
    /// Serialization only; deserialization fails.
    WriteOnly,
    /// Build a default instance sized for `n`, append decoded elements.
    Push {
        /// Creates the empty instance (capacity hint provided).
        new: fn(usize) -> T,
        /// Appends one element.
        push: fn(&mut T, E),
    },
    /// Decode all elements into a contiguous buffer, hand it over whole.
    FromVec {
        /// Consumes the filled buffer.
        finish: fn(Vec<E>) -> Result<T, Error>,
    },
    /// Hand a lazy decoding iterator to the constructor.
    FromIter {
        /// Consumes the iterator; elements it does not pull are decoded
        /// and discarded afterwards.
        finish: fn(&mut dyn Iterator<Item = Result<E, Error>>) -> Result<T, Error>,
    },
}

/// Shape of a key/value collection.
pub struct DictionaryShape<T: 'static, K: Shaped, V: Shaped> {
    /// Entry count, known up front.
    pub len: fn(&T) -> usize,
    /// Borrowing iteration over entries.
    pub iter: for<'a> fn(&'a T) -> Box<dyn Iterator<Item = (&'a K, &'a V)> + 'a>,
    /// How instances are rebuilt during deserialization.
    pub init: DictionaryInit<T, K, V>,
}

/// Dictionary construction strategies.
pub enum DictionaryInit<T, K, V> {
    /// Serialization only; deserialization fails.
    WriteOnly,
    /// Build a default instance sized for `n`, insert decoded entries.
    Insert {
        /// Creates the empty instance (capacity hint provided).
        new: fn(usize) -> T,
        /// Inserts one entry.
        insert: fn(&mut T, K, V),
    },
    /// Decode all entries into a buffer, hand it over whole.
    FromVec {
        /// Consumes the filled buffer.
        finish: fn(Vec<(K, V)>) -> Result<T, Error>,
    },
}

/// The canonical nullable shape, tied to `Option<U>`.
pub struct OptionShape<U: Shaped> {
    pub(crate) _marker: PhantomData<fn() -> U>,
}

impl<U: Shaped> Default for OptionShape<U> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

/// Shape of an array of rank greater than one, stored row-major.
pub struct GridShape<T: 'static, E: Shaped> {
    /// Number of dimensions; fixed per type.
    pub rank: usize,
    /// Extent of each dimension for a given value.
    pub dims: fn(&T) -> Vec<usize>,
    /// Row-major borrowing iteration over all elements.
    pub iter: for<'a> fn(&'a T) -> Box<dyn Iterator<Item = &'a E> + 'a>,
    /// Rebuilds a value from dimensions plus row-major elements.
    pub from_parts: fn(Vec<usize>, Vec<E>) -> Result<T, Error>,
}
