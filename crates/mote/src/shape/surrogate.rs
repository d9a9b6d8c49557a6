// SPDX-License-Identifier: Apache-2.0
//! Surrogate shapes: serialize `T` through an intermediate `S`.

use crate::error::Error;
use crate::shape::Shaped;

/// By-value surrogate: convert to `S` on write, back from `S` on read.
///
/// Use this when `T` has no serializable structure of its own (foreign
/// types, validated wrappers).
pub struct MappedShape<T: 'static, S: Shaped> {
    /// Produces the surrogate for a value.
    pub to: fn(&T) -> S,
    /// Rebuilds the value, failing when the surrogate is out of range.
    pub from: fn(S) -> Result<T, Error>,
}

/// Borrowing surrogate: `T` dereferences to an `S` it owns.
///
/// The canonical use is smart pointers (`Box<S>`), where writing needs
/// no conversion at all.
pub struct ProjectedShape<T: 'static, S: Shaped> {
    /// Borrows the inner value.
    pub project: for<'a> fn(&'a T) -> &'a S,
    /// Wraps an owned inner value.
    pub unproject: fn(S) -> T,
}

/// A projection whose values have shareable identity (`Arc<S>`).
///
/// `identity` returns the address that defines "same object"; values of
/// such shapes participate in reference preservation when it is enabled.
pub struct SharedShape<T: Clone + 'static, S: Shaped> {
    /// Diagnostic type name, reported by cycle errors.
    pub type_name: &'static str,
    /// Borrows the inner value.
    pub project: for<'a> fn(&'a T) -> &'a S,
    /// Wraps an owned inner value.
    pub unproject: fn(S) -> T,
    /// Address of the shared payload.
    pub identity: fn(&T) -> usize,
}
