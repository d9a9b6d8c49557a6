// SPDX-License-Identifier: Apache-2.0
//! Shapes and converters for the common scalar and container types.
//!
//! Integers and floats map to their MessagePack tokens directly, strings
//! to str tokens, [`Bytes`] to bin tokens (sliced zero-copy when the
//! input buffer is shared), timestamps to the reserved extension, GUIDs
//! to a 16-byte little-endian bin token (any of the five textual forms
//! is accepted on read). `Vec<E>` and friends are ordinary sequences;
//! note that this makes `Vec<u8>` an array of integers, so binary blobs
//! should use [`Bytes`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use mote_wire::{Family, Guid, SyncReader, Timestamp, Writer};

use crate::context::{ReadContext, WriteContext};
use crate::convert::Converter;
use crate::error::Error;
use crate::shape::{
    DictionaryInit, DictionaryShape, ProjectedShape, SequenceInit, SequenceShape, Shape, Shaped,
    SharedShape,
};

macro_rules! unsigned_shapes {
    ($($t:ty),*) => {$(
        impl Shaped for $t {
            fn shape() -> Shape<Self> {
                struct C;
                impl Converter<$t> for C {
                    fn write(
                        &self,
                        w: &mut Writer<'_>,
                        value: &$t,
                        _cx: &mut WriteContext<'_>,
                    ) -> Result<(), Error> {
                        w.write_uint(u64::from(*value));
                        Ok(())
                    }

                    fn read(
                        &self,
                        r: &mut SyncReader<'_>,
                        _cx: &mut ReadContext<'_>,
                    ) -> Result<$t, Error> {
                        Ok(r.read_int::<$t>()?)
                    }
                }
                Shape::Scalar(Arc::new(C))
            }
        }
    )*};
}

macro_rules! signed_shapes {
    ($($t:ty),*) => {$(
        impl Shaped for $t {
            fn shape() -> Shape<Self> {
                struct C;
                impl Converter<$t> for C {
                    fn write(
                        &self,
                        w: &mut Writer<'_>,
                        value: &$t,
                        _cx: &mut WriteContext<'_>,
                    ) -> Result<(), Error> {
                        w.write_int(i64::from(*value));
                        Ok(())
                    }

                    fn read(
                        &self,
                        r: &mut SyncReader<'_>,
                        _cx: &mut ReadContext<'_>,
                    ) -> Result<$t, Error> {
                        Ok(r.read_int::<$t>()?)
                    }
                }
                Shape::Scalar(Arc::new(C))
            }
        }
    )*};
}

unsigned_shapes!(u8, u16, u32, u64);
signed_shapes!(i8, i16, i32, i64);

impl Shaped for bool {
    fn shape() -> Shape<Self> {
        struct C;
        impl Converter<bool> for C {
            fn write(
                &self,
                w: &mut Writer<'_>,
                value: &bool,
                _cx: &mut WriteContext<'_>,
            ) -> Result<(), Error> {
                w.write_bool(*value);
                Ok(())
            }

            fn read(
                &self,
                r: &mut SyncReader<'_>,
                _cx: &mut ReadContext<'_>,
            ) -> Result<bool, Error> {
                Ok(r.read_bool()?)
            }
        }
        Shape::Scalar(Arc::new(C))
    }
}

impl Shaped for f32 {
    fn shape() -> Shape<Self> {
        struct C;
        impl Converter<f32> for C {
            fn write(
                &self,
                w: &mut Writer<'_>,
                value: &f32,
                _cx: &mut WriteContext<'_>,
            ) -> Result<(), Error> {
                w.write_f32(*value);
                Ok(())
            }

            fn read(
                &self,
                r: &mut SyncReader<'_>,
                _cx: &mut ReadContext<'_>,
            ) -> Result<f32, Error> {
                Ok(r.read_f32()?)
            }
        }
        Shape::Scalar(Arc::new(C))
    }
}

impl Shaped for f64 {
    fn shape() -> Shape<Self> {
        struct C;
        impl Converter<f64> for C {
            fn write(
                &self,
                w: &mut Writer<'_>,
                value: &f64,
                _cx: &mut WriteContext<'_>,
            ) -> Result<(), Error> {
                w.write_f64(*value);
                Ok(())
            }

            fn read(
                &self,
                r: &mut SyncReader<'_>,
                _cx: &mut ReadContext<'_>,
            ) -> Result<f64, Error> {
                Ok(r.read_f64()?)
            }
        }
        Shape::Scalar(Arc::new(C))
    }
}

impl Shaped for char {
    fn shape() -> Shape<Self> {
        struct C;
        impl Converter<char> for C {
            fn write(
                &self,
                w: &mut Writer<'_>,
                value: &char,
                _cx: &mut WriteContext<'_>,
            ) -> Result<(), Error> {
                let mut buf = [0u8; 4];
                w.write_str(value.encode_utf8(&mut buf));
                Ok(())
            }

            fn read(
                &self,
                r: &mut SyncReader<'_>,
                _cx: &mut ReadContext<'_>,
            ) -> Result<char, Error> {
                let text = r.read_str()?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(ch),
                    _ => Err(Error::InvalidData {
                        type_name: "char",
                        detail: format!("expected exactly one character, found {:?}", text),
                    }),
                }
            }
        }
        Shape::Scalar(Arc::new(C))
    }
}

impl Shaped for String {
    fn shape() -> Shape<Self> {
        struct C;
        impl Converter<String> for C {
            fn write(
                &self,
                w: &mut Writer<'_>,
                value: &String,
                _cx: &mut WriteContext<'_>,
            ) -> Result<(), Error> {
                w.write_str(value);
                Ok(())
            }

            fn read(
                &self,
                r: &mut SyncReader<'_>,
                _cx: &mut ReadContext<'_>,
            ) -> Result<String, Error> {
                Ok(r.read_str()?.to_string())
            }
        }
        Shape::Scalar(Arc::new(C))
    }
}

/// A cheaply clonable string that participates in interning.
///
/// When the interning policy is on, equal `SharedStr` values decoded in
/// one operation share a single allocation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SharedStr(Arc<str>);

impl SharedStr {
    /// The text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether two values share one allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<&str> for SharedStr {
    fn from(text: &str) -> Self {
        Self(Arc::from(text))
    }
}

impl std::ops::Deref for SharedStr {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SharedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Shaped for SharedStr {
    fn shape() -> Shape<Self> {
        struct C;
        impl Converter<SharedStr> for C {
            fn write(
                &self,
                w: &mut Writer<'_>,
                value: &SharedStr,
                _cx: &mut WriteContext<'_>,
            ) -> Result<(), Error> {
                w.write_str(value);
                Ok(())
            }

            fn read(
                &self,
                r: &mut SyncReader<'_>,
                cx: &mut ReadContext<'_>,
            ) -> Result<SharedStr, Error> {
                let text = r.read_str()?;
                Ok(SharedStr(cx.intern(text)))
            }
        }
        Shape::Scalar(Arc::new(C))
    }
}

impl Shaped for Bytes {
    fn shape() -> Shape<Self> {
        struct C;
        impl Converter<Bytes> for C {
            fn write(
                &self,
                w: &mut Writer<'_>,
                value: &Bytes,
                _cx: &mut WriteContext<'_>,
            ) -> Result<(), Error> {
                w.write_bin(value);
                Ok(())
            }

            fn read(
                &self,
                r: &mut SyncReader<'_>,
                cx: &mut ReadContext<'_>,
            ) -> Result<Bytes, Error> {
                let payload = r.read_bin_slice()?;
                let end = r.position();
                let start = end - payload.len();
                match cx.backing() {
                    Some(shared) => Ok(shared.slice(start..end)),
                    None => Ok(Bytes::copy_from_slice(payload)),
                }
            }
        }
        Shape::Scalar(Arc::new(C))
    }
}

impl Shaped for Timestamp {
    fn shape() -> Shape<Self> {
        struct C;
        impl Converter<Timestamp> for C {
            fn write(
                &self,
                w: &mut Writer<'_>,
                value: &Timestamp,
                _cx: &mut WriteContext<'_>,
            ) -> Result<(), Error> {
                w.write_timestamp(*value);
                Ok(())
            }

            fn read(
                &self,
                r: &mut SyncReader<'_>,
                _cx: &mut ReadContext<'_>,
            ) -> Result<Timestamp, Error> {
                Ok(r.read_timestamp()?)
            }
        }
        Shape::Scalar(Arc::new(C))
    }
}

impl Shaped for Guid {
    fn shape() -> Shape<Self> {
        struct C;
        impl Converter<Guid> for C {
            fn write(
                &self,
                w: &mut Writer<'_>,
                value: &Guid,
                _cx: &mut WriteContext<'_>,
            ) -> Result<(), Error> {
                w.write_bin(&value.to_bytes_le());
                Ok(())
            }

            fn read(
                &self,
                r: &mut SyncReader<'_>,
                _cx: &mut ReadContext<'_>,
            ) -> Result<Guid, Error> {
                let lead = r.peek_code()?;
                if Family::of(lead) == Family::Str {
                    let text = r.read_str()?;
                    return Guid::parse_str(text).map_err(|_| Error::InvalidData {
                        type_name: "Guid",
                        detail: format!("unrecognized GUID text `{text}`"),
                    });
                }
                let payload = r.read_bin_slice()?;
                let bytes: [u8; 16] = payload.try_into().map_err(|_| Error::InvalidData {
                    type_name: "Guid",
                    detail: format!("binary GUID must be 16 bytes, found {}", payload.len()),
                })?;
                Ok(Guid::from_bytes_le(bytes))
            }
        }
        Shape::Scalar(Arc::new(C))
    }
}

/// An exact ratio of two integers, encoded as a two-element array of
/// numerator and denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    numer: i64,
    denom: u64,
}

impl Rational {
    /// Creates a ratio; `None` when the denominator is zero.
    #[must_use]
    pub const fn new(numer: i64, denom: u64) -> Option<Self> {
        if denom == 0 {
            None
        } else {
            Some(Self { numer, denom })
        }
    }

    /// The numerator.
    #[must_use]
    pub const fn numer(&self) -> i64 {
        self.numer
    }

    /// The denominator (never zero).
    #[must_use]
    pub const fn denom(&self) -> u64 {
        self.denom
    }
}

impl Shaped for Rational {
    fn shape() -> Shape<Self> {
        struct C;
        impl Converter<Rational> for C {
            fn write(
                &self,
                w: &mut Writer<'_>,
                value: &Rational,
                cx: &mut WriteContext<'_>,
            ) -> Result<(), Error> {
                cx.enter()?;
                w.write_array_header(2);
                w.write_int(value.numer);
                w.write_uint(value.denom);
                cx.exit();
                Ok(())
            }

            fn read(
                &self,
                r: &mut SyncReader<'_>,
                cx: &mut ReadContext<'_>,
            ) -> Result<Rational, Error> {
                cx.enter()?;
                let len = r.read_array_header()?;
                let result = if len == 2 {
                    let numer = r.read_int::<i64>()?;
                    let denom = r.read_int::<u64>()?;
                    Rational::new(numer, denom).ok_or_else(|| Error::InvalidData {
                        type_name: "Rational",
                        detail: "zero denominator".to_string(),
                    })
                } else {
                    Err(Error::InvalidData {
                        type_name: "Rational",
                        detail: format!("expected 2 elements, found {len}"),
                    })
                };
                cx.exit();
                result
            }
        }
        Shape::Scalar(Arc::new(C))
    }
}

/// A dotted version identifier with two to four components, encoded as
/// its textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId {
    parts: [u32; 4],
    len: u8,
}

impl VersionId {
    /// Creates a version from 2–4 components.
    #[must_use]
    pub fn new(parts: &[u32]) -> Option<Self> {
        if !(2..=4).contains(&parts.len()) {
            return None;
        }
        let mut stored = [0u32; 4];
        stored[..parts.len()].copy_from_slice(parts);
        Some(Self {
            parts: stored,
            len: parts.len() as u8,
        })
    }

    /// The components, in order.
    #[must_use]
    pub fn components(&self) -> &[u32] {
        &self.parts[..usize::from(self.len)]
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.components().iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Error returned for text that is not a dotted version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("malformed version text")]
pub struct VersionParseError;

impl FromStr for VersionId {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split('.')
            .map(|part| part.parse::<u32>().map_err(|_| VersionParseError))
            .collect::<Result<Vec<u32>, _>>()?;
        Self::new(&parts).ok_or(VersionParseError)
    }
}

impl Shaped for VersionId {
    fn shape() -> Shape<Self> {
        struct C;
        impl Converter<VersionId> for C {
            fn write(
                &self,
                w: &mut Writer<'_>,
                value: &VersionId,
                _cx: &mut WriteContext<'_>,
            ) -> Result<(), Error> {
                w.write_str(&value.to_string());
                Ok(())
            }

            fn read(
                &self,
                r: &mut SyncReader<'_>,
                _cx: &mut ReadContext<'_>,
            ) -> Result<VersionId, Error> {
                let text = r.read_str()?;
                text.parse().map_err(|_| Error::InvalidData {
                    type_name: "VersionId",
                    detail: format!("unrecognized version `{text}`"),
                })
            }
        }
        Shape::Scalar(Arc::new(C))
    }
}

/// Already-encoded MessagePack carried through untouched.
///
/// Writing emits the bytes verbatim; the caller is responsible for their
/// validity. Reading captures the extent of exactly one value. When the
/// input buffer is shared the capture borrows it (`is_owned` is false
/// and the bytes die with the buffer); [`RawMsgPack::to_owned_raw`]
/// clones into a self-contained allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMsgPack {
    bytes: Bytes,
    owned: bool,
}

impl RawMsgPack {
    /// Wraps caller-provided encoded bytes (owned by construction).
    pub fn from_encoded(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            owned: true,
        }
    }

    /// The encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether the bytes are self-contained rather than borrowed from a
    /// deserialization input buffer.
    #[must_use]
    pub const fn is_owned(&self) -> bool {
        self.owned
    }

    /// Clones into a self-contained allocation.
    #[must_use]
    pub fn to_owned_raw(&self) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(&self.bytes),
            owned: true,
        }
    }
}

impl Shaped for RawMsgPack {
    fn shape() -> Shape<Self> {
        struct C;
        impl Converter<RawMsgPack> for C {
            fn write(
                &self,
                w: &mut Writer<'_>,
                value: &RawMsgPack,
                _cx: &mut WriteContext<'_>,
            ) -> Result<(), Error> {
                w.write_raw(&value.bytes);
                Ok(())
            }

            fn read(
                &self,
                r: &mut SyncReader<'_>,
                cx: &mut ReadContext<'_>,
            ) -> Result<RawMsgPack, Error> {
                let start = r.position();
                r.skip(cx.depth_mut())?;
                let end = r.position();
                match cx.backing() {
                    Some(shared) => Ok(RawMsgPack {
                        bytes: shared.slice(start..end),
                        owned: false,
                    }),
                    None => Ok(RawMsgPack {
                        bytes: Bytes::copy_from_slice(&r.fork().input()[start..end]),
                        owned: true,
                    }),
                }
            }
        }
        Shape::Scalar(Arc::new(C))
    }
}

// ── Standard containers ─────────────────────────────────────────────

fn vec_iter<E>(v: &Vec<E>) -> Box<dyn Iterator<Item = &E> + '_> {
    Box::new(v.iter())
}

fn deque_iter<E>(v: &VecDeque<E>) -> Box<dyn Iterator<Item = &E> + '_> {
    Box::new(v.iter())
}

fn hash_set_iter<E>(v: &HashSet<E>) -> Box<dyn Iterator<Item = &E> + '_> {
    Box::new(v.iter())
}

fn btree_set_iter<E>(v: &BTreeSet<E>) -> Box<dyn Iterator<Item = &E> + '_> {
    Box::new(v.iter())
}

fn array_iter<E, const N: usize>(v: &[E; N]) -> Box<dyn Iterator<Item = &E> + '_> {
    Box::new(v.iter())
}

fn hash_map_iter<K, V>(m: &HashMap<K, V>) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
    Box::new(m.iter())
}

fn btree_map_iter<K, V>(m: &BTreeMap<K, V>) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
    Box::new(m.iter())
}

fn deref_box<U>(b: &Box<U>) -> &U {
    b
}

fn deref_arc<U>(a: &Arc<U>) -> &U {
    a
}

impl<U: Shaped> Shaped for Option<U> {
    fn shape() -> Shape<Self> {
        Shape::nullable()
    }
}

impl<E: Shaped> Shaped for Vec<E> {
    fn shape() -> Shape<Self> {
        Shape::enumerable(SequenceShape {
            len: Vec::len,
            iter: vec_iter,
            init: SequenceInit::FromVec { finish: Ok },
        })
    }
}

impl<E: Shaped> Shaped for VecDeque<E> {
    fn shape() -> Shape<Self> {
        Shape::enumerable(SequenceShape {
            len: VecDeque::len,
            iter: deque_iter,
            init: SequenceInit::Push {
                new: VecDeque::with_capacity,
                push: |v, e| v.push_back(e),
            },
        })
    }
}

impl<E: Shaped + Eq + Hash> Shaped for HashSet<E> {
    fn shape() -> Shape<Self> {
        Shape::enumerable(SequenceShape {
            len: HashSet::len,
            iter: hash_set_iter,
            init: SequenceInit::Push {
                new: HashSet::with_capacity,
                push: |v, e| {
                    v.insert(e);
                },
            },
        })
    }
}

impl<E: Shaped + Ord> Shaped for BTreeSet<E> {
    fn shape() -> Shape<Self> {
        Shape::enumerable(SequenceShape {
            len: BTreeSet::len,
            iter: btree_set_iter,
            init: SequenceInit::Push {
                new: |_| BTreeSet::new(),
                push: |v, e| {
                    v.insert(e);
                },
            },
        })
    }
}

impl<E: Shaped, const N: usize> Shaped for [E; N] {
    fn shape() -> Shape<Self> {
        Shape::enumerable(SequenceShape {
            len: |_| N,
            iter: array_iter,
            init: SequenceInit::FromVec {
                finish: |v| {
                    let found = v.len();
                    <[E; N]>::try_from(v).map_err(|_| Error::InvalidData {
                        type_name: std::any::type_name::<[E; N]>(),
                        detail: format!("expected {N} elements, found {found}"),
                    })
                },
            },
        })
    }
}

impl<K: Shaped + Eq + Hash, V: Shaped> Shaped for HashMap<K, V> {
    fn shape() -> Shape<Self> {
        Shape::dictionary(DictionaryShape {
            len: HashMap::len,
            iter: hash_map_iter,
            init: DictionaryInit::Insert {
                new: HashMap::with_capacity,
                insert: |m, k, v| {
                    m.insert(k, v);
                },
            },
        })
    }
}

impl<K: Shaped + Ord, V: Shaped> Shaped for BTreeMap<K, V> {
    fn shape() -> Shape<Self> {
        Shape::dictionary(DictionaryShape {
            len: BTreeMap::len,
            iter: btree_map_iter,
            init: DictionaryInit::Insert {
                new: |_| BTreeMap::new(),
                insert: |m, k, v| {
                    m.insert(k, v);
                },
            },
        })
    }
}

impl<U: Shaped> Shaped for Box<U> {
    fn shape() -> Shape<Self> {
        Shape::projected(ProjectedShape {
            project: deref_box,
            unproject: Box::new,
        })
    }
}

impl<U: Shaped> Shaped for Arc<U> {
    fn shape() -> Shape<Self> {
        Shape::shared(SharedShape {
            type_name: std::any::type_name::<Arc<U>>(),
            project: deref_arc,
            unproject: Arc::new,
            identity: |a| Arc::as_ptr(a) as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_rejects_zero_denominator() {
        assert!(Rational::new(1, 0).is_none());
        assert_eq!(Rational::new(-3, 4).map(|r| r.numer()), Some(-3));
    }

    #[test]
    fn version_id_parses_and_formats() {
        let v: VersionId = "1.2.3.4".parse().expect("parse");
        assert_eq!(v.components(), &[1, 2, 3, 4]);
        assert_eq!(v.to_string(), "1.2.3.4");
        assert!("1".parse::<VersionId>().is_err());
        assert!("1.2.3.4.5".parse::<VersionId>().is_err());
        assert!("1.x".parse::<VersionId>().is_err());
    }

    #[test]
    fn raw_msgpack_to_owned_detaches() {
        let raw = RawMsgPack::from_encoded(vec![0x01]);
        assert!(raw.is_owned());
        let copy = raw.to_owned_raw();
        assert_eq!(copy.as_bytes(), raw.as_bytes());
        assert!(copy.is_owned());
    }
}
