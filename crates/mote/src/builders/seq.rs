// SPDX-License-Identifier: Apache-2.0
//! Sequence and grid converters.
//!
//! Sequences write an array header followed by the elements. Reading
//! dispatches on the declared construction strategy: append into a
//! default instance, fill a buffer and hand it over whole, or feed a
//! lazy decoding iterator to the constructor.

use std::sync::Arc;

use mote_wire::{SyncReader, Writer};

use crate::cache::ConverterCache;
use crate::context::{ReadContext, WriteContext};
use crate::convert::{ArcConverter, Converter};
use crate::error::Error;
use crate::options::MultiDimFormat;
use crate::shape::{ConverterBinding, GridShape, SequenceInit, SequenceShape, Shaped};

impl<T: Send + Sync + 'static, E: Shaped> ConverterBinding<T> for SequenceShape<T, E> {
    fn build(&self, cache: &ConverterCache) -> Result<ArcConverter<T>, Error> {
        Ok(Arc::new(SequenceConverter {
            element: cache.resolve::<E>()?,
            shape: self.clone(),
        }))
    }
}

impl<T, E: Shaped> Clone for SequenceShape<T, E> {
    fn clone(&self) -> Self {
        Self {
            len: self.len,
            iter: self.iter,
            init: self.init.clone(),
        }
    }
}

impl<T, E> Clone for SequenceInit<T, E> {
    fn clone(&self) -> Self {
        match self {
            Self::WriteOnly => Self::WriteOnly,
            Self::Push { new, push } => Self::Push {
                new: *new,
                push: *push,
            },
            Self::FromVec { finish } => Self::FromVec { finish: *finish },
            Self::FromIter { finish } => Self::FromIter { finish: *finish },
        }
    }
}

struct SequenceConverter<T: 'static, E: Shaped> {
    element: ArcConverter<E>,
    shape: SequenceShape<T, E>,
}

impl<T: Send + Sync + 'static, E: Shaped> Converter<T> for SequenceConverter<T, E> {
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        cx.enter()?;
        w.write_array_header((self.shape.len)(value) as u32);
        for element in (self.shape.iter)(value) {
            self.element.write(w, element, cx)?;
        }
        w.flush_if_appropriate(cx.options().flush_threshold);
        cx.exit();
        Ok(())
    }

    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<T, Error> {
        cx.enter()?;
        let len = r.read_array_header()? as usize;
        let result = match &self.shape.init {
            SequenceInit::WriteOnly => Err(Error::InvalidShape {
                type_name: std::any::type_name::<T>(),
                detail: "sequence is declared write-only",
            }),
            SequenceInit::Push { new, push } => {
                let mut target = new(len);
                for _ in 0..len {
                    push(&mut target, self.element.read(r, cx)?);
                }
                Ok(target)
            }
            SequenceInit::FromVec { finish } => {
                let mut buffer = Vec::with_capacity(len);
                for _ in 0..len {
                    buffer.push(self.element.read(r, cx)?);
                }
                finish(buffer)
            }
            SequenceInit::FromIter { finish } => {
                let mut pulled = 0usize;
                let result = {
                    let mut iter = DecodeIter {
                        element: &self.element,
                        r: &mut *r,
                        cx: &mut *cx,
                        remaining: len,
                        pulled: &mut pulled,
                        failed: false,
                    };
                    finish(&mut iter)
                };
                // Elements the constructor did not pull still belong to
                // this value on the wire; decode and discard them.
                for _ in pulled..len {
                    let _ = self.element.read(r, cx)?;
                }
                result
            }
        };
        cx.exit();
        result
    }
}

/// Lazy decoding iterator handed to enumerable-initialized constructors.
struct DecodeIter<'a, 'r, 'cx, E> {
    element: &'a ArcConverter<E>,
    r: &'a mut SyncReader<'r>,
    cx: &'a mut ReadContext<'cx>,
    remaining: usize,
    pulled: &'a mut usize,
    failed: bool,
}

impl<E: 'static> Iterator for DecodeIter<'_, '_, '_, E> {
    type Item = Result<E, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.failed {
            return None;
        }
        self.remaining -= 1;
        *self.pulled += 1;
        let decoded = self.element.read(self.r, self.cx);
        if decoded.is_err() {
            self.failed = true;
        }
        Some(decoded)
    }
}

// ── Grids (rank > 1) ────────────────────────────────────────────────

impl<T: Send + Sync + 'static, E: Shaped> ConverterBinding<T> for GridShape<T, E> {
    fn build(&self, cache: &ConverterCache) -> Result<ArcConverter<T>, Error> {
        if self.rank < 2 {
            return Err(Error::InvalidShape {
                type_name: std::any::type_name::<T>(),
                detail: "grid shapes need at least two dimensions",
            });
        }
        Ok(Arc::new(GridConverter {
            element: cache.resolve::<E>()?,
            rank: self.rank,
            dims: self.dims,
            iter: self.iter,
            from_parts: self.from_parts,
        }))
    }
}

struct GridConverter<T: 'static, E> {
    element: ArcConverter<E>,
    rank: usize,
    dims: fn(&T) -> Vec<usize>,
    iter: for<'a> fn(&'a T) -> Box<dyn Iterator<Item = &'a E> + 'a>,
    from_parts: fn(Vec<usize>, Vec<E>) -> Result<T, Error>,
}

impl<T: Send + Sync + 'static, E: Shaped> GridConverter<T, E> {
    fn write_nested(
        &self,
        w: &mut Writer<'_>,
        dims: &[usize],
        elements: &mut dyn Iterator<Item = &E>,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        cx.enter()?;
        let (head, rest) = match dims.split_first() {
            Some(split) => split,
            None => {
                cx.exit();
                return Ok(());
            }
        };
        w.write_array_header(*head as u32);
        for _ in 0..*head {
            if rest.is_empty() {
                match elements.next() {
                    Some(element) => self.element.write(w, element, cx)?,
                    None => {
                        cx.exit();
                        return Err(Error::InvalidData {
                            type_name: std::any::type_name::<T>(),
                            detail: "grid iterator shorter than its dimensions".to_string(),
                        });
                    }
                }
            } else {
                self.write_nested(w, rest, elements, cx)?;
            }
        }
        cx.exit();
        Ok(())
    }

    fn read_nested(
        &self,
        r: &mut SyncReader<'_>,
        cx: &mut ReadContext<'_>,
        level: usize,
        dims: &mut Vec<usize>,
        out: &mut Vec<E>,
    ) -> Result<(), Error> {
        cx.enter()?;
        let len = r.read_array_header()? as usize;
        if let Some(&expected) = dims.get(level) {
            if expected != len {
                cx.exit();
                return Err(Error::InvalidData {
                    type_name: std::any::type_name::<T>(),
                    detail: "ragged nested array cannot fill a grid".to_string(),
                });
            }
        } else {
            dims.push(len);
        }
        for _ in 0..len {
            if level + 1 == self.rank {
                out.push(self.element.read(r, cx)?);
            } else {
                self.read_nested(r, cx, level + 1, dims, out)?;
            }
        }
        // An empty level leaves inner extents unknown; pin them to zero.
        while dims.len() < self.rank {
            dims.push(0);
        }
        cx.exit();
        Ok(())
    }
}

impl<T: Send + Sync + 'static, E: Shaped> Converter<T> for GridConverter<T, E> {
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        let dims = (self.dims)(value);
        if dims.len() != self.rank {
            return Err(Error::InvalidData {
                type_name: std::any::type_name::<T>(),
                detail: "grid value disagrees with its declared rank".to_string(),
            });
        }
        match cx.options().multi_dim_format {
            MultiDimFormat::Nested => {
                let mut elements = (self.iter)(value);
                self.write_nested(w, &dims, &mut elements, cx)
            }
            MultiDimFormat::Flat => {
                cx.enter()?;
                let total: usize = dims.iter().product();
                w.write_array_header(total as u32 + 1);
                w.write_array_header(dims.len() as u32);
                for dim in &dims {
                    w.write_uint(*dim as u64);
                }
                for element in (self.iter)(value) {
                    self.element.write(w, element, cx)?;
                }
                w.flush_if_appropriate(cx.options().flush_threshold);
                cx.exit();
                Ok(())
            }
        }
    }

    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<T, Error> {
        match cx.options().multi_dim_format {
            MultiDimFormat::Nested => {
                let mut dims = Vec::with_capacity(self.rank);
                let mut out = Vec::new();
                self.read_nested(r, cx, 0, &mut dims, &mut out)?;
                (self.from_parts)(dims, out)
            }
            MultiDimFormat::Flat => {
                cx.enter()?;
                let total_len = r.read_array_header()? as usize;
                let rank = r.read_array_header()? as usize;
                if rank != self.rank {
                    cx.exit();
                    return Err(Error::InvalidData {
                        type_name: std::any::type_name::<T>(),
                        detail: "flat grid declares the wrong rank".to_string(),
                    });
                }
                let mut dims = Vec::with_capacity(rank);
                for _ in 0..rank {
                    dims.push(r.read_int::<u64>()? as usize);
                }
                let expected: usize = dims.iter().product();
                if total_len != expected + 1 {
                    cx.exit();
                    return Err(Error::InvalidData {
                        type_name: std::any::type_name::<T>(),
                        detail: "flat grid length disagrees with its dimensions".to_string(),
                    });
                }
                let mut out = Vec::with_capacity(expected);
                for _ in 0..expected {
                    out.push(self.element.read(r, cx)?);
                }
                cx.exit();
                (self.from_parts)(dims, out)
            }
        }
    }
}
