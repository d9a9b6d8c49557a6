// SPDX-License-Identifier: Apache-2.0
//! Index-keyed object converter.
//!
//! Wire layout: an array of `max_index + 1` slots, one per declared wire
//! index, with Nil in every hole. Smaller and faster than the map
//! layout, at the cost of schema brittleness. Reading tolerates shorter
//! arrays (the missing tail keeps its defaults) and longer ones (the
//! excess is skipped).

use std::sync::Arc;

use mote_wire::{SyncReader, Writer};

use crate::cache::ConverterCache;
use crate::context::{ReadContext, WriteContext};
use crate::convert::{ArcConverter, Converter};
use crate::error::Error;
use crate::shape::{Construction, ObjectShape};

use super::object::{bind_properties, WireProperty};

pub(crate) fn build<T: Send + Sync + 'static>(
    shape: ObjectShape<T>,
    cache: &ConverterCache,
) -> Result<ArcConverter<T>, Error> {
    let default = match shape.construction {
        Construction::Fields { default } => default,
        Construction::Parameterized(_) => {
            return Err(Error::InvalidShape {
                type_name: shape.type_name,
                detail: "index-keyed objects require field construction",
            });
        }
    };

    let bound = bind_properties(&shape.properties, cache.options().naming_policy, cache)?;

    let mut max_index = 0u32;
    for property in &shape.properties {
        match property.index {
            Some(index) => max_index = max_index.max(index),
            None => {
                return Err(Error::InvalidShape {
                    type_name: shape.type_name,
                    detail: "every property of an index-keyed object needs an index",
                });
            }
        }
    }

    let mut slots: Vec<Option<usize>> = vec![None; max_index as usize + 1];
    for (position, property) in shape.properties.iter().enumerate() {
        let index = property.index.unwrap_or_default() as usize;
        if slots[index].is_some() {
            return Err(Error::InvalidShape {
                type_name: shape.type_name,
                detail: "duplicate property index",
            });
        }
        slots[index] = Some(position);
    }

    Ok(Arc::new(ObjectArrayConverter {
        props: bound,
        slots,
        default,
    }))
}

struct ObjectArrayConverter<T> {
    props: Vec<WireProperty<T>>,
    /// Wire slot → property position; `None` slots are holes.
    slots: Vec<Option<usize>>,
    default: fn() -> T,
}

impl<T: Send + Sync + 'static> Converter<T> for ObjectArrayConverter<T> {
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        cx.enter()?;
        w.write_array_header(self.slots.len() as u32);
        for slot in &self.slots {
            match slot {
                Some(position) => self.props[*position].bound.write_value(w, value, cx)?,
                None => w.write_nil(),
            }
        }
        w.flush_if_appropriate(cx.options().flush_threshold);
        cx.exit();
        Ok(())
    }

    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<T, Error> {
        cx.enter()?;
        let len = r.read_array_header()? as usize;
        let mut target = (self.default)();
        for wire_index in 0..len {
            let property = self
                .slots
                .get(wire_index)
                .copied()
                .flatten()
                .map(|position| &self.props[position]);
            match property {
                Some(prop) if prop.bound.writable() => {
                    prop.bound.read_into(r, cx, &mut target)?;
                }
                _ => r.skip(cx.depth_mut())?,
            }
        }
        cx.exit();
        Ok(target)
    }
}
