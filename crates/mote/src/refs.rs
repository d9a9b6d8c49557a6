// SPDX-License-Identifier: Apache-2.0
//! Reference preservation: identity tracking and back-reference tokens.
//!
//! With preservation on, the first encounter of a shared object writes it
//! in full and assigns it the next sequential id (from 0, in encounter
//! order); later encounters write an extension token whose payload is the
//! id. Identity is captured as an `(address, type)` pair at insertion
//! time, so distinct types at one address never collide.

use std::any::{Any, TypeId};

use rustc_hash::FxHashMap;

use mote_wire::{code, Reader, SyncReader, Writer};

use crate::context::{ReadContext, WriteContext};
use crate::convert::{ArcConverter, Converter};
use crate::error::Error;
use crate::options::RefMode;

/// What the serialize-side tracker knew about an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Seen {
    /// First encounter; the object was assigned this id.
    New(u32),
    /// Encountered while its own serialization is still on the stack.
    InProgress(u32),
    /// Fully serialized earlier under this id.
    Completed(u32),
}

/// Serialize-side identity map.
#[derive(Debug, Default)]
pub(crate) struct WriteTracker {
    entries: FxHashMap<(usize, TypeId), (u32, bool)>,
    next: u32,
}

impl WriteTracker {
    pub(crate) fn observe(&mut self, addr: usize, ty: TypeId) -> Seen {
        if let Some(&(id, completed)) = self.entries.get(&(addr, ty)) {
            return if completed {
                Seen::Completed(id)
            } else {
                Seen::InProgress(id)
            };
        }
        let id = self.next;
        self.next += 1;
        self.entries.insert((addr, ty), (id, false));
        Seen::New(id)
    }

    pub(crate) fn complete(&mut self, addr: usize, ty: TypeId) {
        if let Some(entry) = self.entries.get_mut(&(addr, ty)) {
            entry.1 = true;
        }
    }
}

/// Deserialize-side slot list, indexed by reference id.
#[derive(Default)]
pub(crate) struct ReadTracker {
    slots: Vec<Option<Box<dyn Any + Send>>>,
}

impl std::fmt::Debug for ReadTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadTracker")
            .field("slots", &self.slots.len())
            .finish()
    }
}

impl ReadTracker {
    /// Reserves the next id slot for the object about to be read.
    pub(crate) fn reserve(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    /// Publishes the finished object into its reserved slot.
    pub(crate) fn publish(&mut self, slot: usize, value: Box<dyn Any + Send>) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(value);
        }
    }

    /// Looks up a previously published object.
    pub(crate) fn get(&self, id: u32) -> Option<&(dyn Any + Send)> {
        self.slots
            .get(id as usize)
            .and_then(|slot| slot.as_deref())
    }

    /// Whether the id names a reserved slot (published or not).
    pub(crate) fn is_reserved(&self, id: u32) -> bool {
        (id as usize) < self.slots.len()
    }
}

/// Wraps a converter with identity tracking for a shareable type.
///
/// `identity` projects a value to the address that defines "same object"
/// for it (for `Arc<T>`, the payload address).
pub(crate) struct RefPreservingConverter<T: Clone> {
    pub(crate) type_name: &'static str,
    pub(crate) identity: fn(&T) -> usize,
    pub(crate) inner: ArcConverter<T>,
}

impl<T: Clone> RefPreservingConverter<T> {
    fn ref_code(options: &crate::options::SerializerOptions) -> Result<i8, Error> {
        let code = options.ref_ext_code;
        if code >= 0 || code == code::TIMESTAMP_EXT_CODE {
            return Err(Error::InvalidShape {
                type_name: "SerializerOptions",
                detail: "ref_ext_code must be negative and distinct from the timestamp code",
            });
        }
        Ok(code)
    }

    fn write_backref(w: &mut Writer<'_>, ext_code: i8, id: u32) {
        let mut payload = Vec::with_capacity(5);
        {
            let mut pw = Writer::new(&mut payload);
            pw.write_uint(u64::from(id));
        }
        w.write_ext(ext_code, &payload);
    }
}

impl<T: Clone + Send + Sync + 'static> Converter<T> for RefPreservingConverter<T> {
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        let mode = cx.options().preserve_references;
        let addr = (self.identity)(value);
        let ty = TypeId::of::<T>();
        let seen = cx.tracker_mut().map(|tracker| tracker.observe(addr, ty));
        let Some(seen) = seen else {
            return self.inner.write(w, value, cx);
        };
        let ext_code = Self::ref_code(cx.options())?;
        match seen {
            Seen::Completed(id) => {
                Self::write_backref(w, ext_code, id);
                Ok(())
            }
            Seen::InProgress(id) => {
                if mode == RefMode::RejectCycles {
                    return Err(Error::ReferenceCycleDetected {
                        type_name: self.type_name,
                    });
                }
                Self::write_backref(w, ext_code, id);
                Ok(())
            }
            Seen::New(_) => {
                self.inner.write(w, value, cx)?;
                if let Some(tracker) = cx.tracker_mut() {
                    tracker.complete(addr, ty);
                }
                Ok(())
            }
        }
    }

    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<T, Error> {
        if cx.tracker_mut().is_none() {
            return self.inner.read(r, cx);
        }
        let ext_code = Self::ref_code(cx.options())?;

        let mut peek: Reader<'_> = r.fork();
        let is_backref = matches!(
            peek.read_ext_header(),
            mote_wire::Decoded::Value(header) if header.type_code == ext_code
        );

        if is_backref {
            let (_, payload) = r.read_ext()?;
            let mut pr = SyncReader::new(payload);
            let id: u32 = pr.read_int()?;
            let looked_up = cx.tracker_mut().map(|tracker| {
                let reserved = tracker.is_reserved(id);
                let value = tracker
                    .get(id)
                    .and_then(|any| any.downcast_ref::<T>())
                    .cloned();
                (reserved, value)
            });
            return match looked_up {
                Some((_, Some(value))) => Ok(value),
                Some((true, None)) => Err(Error::CycleNotReconstructible {
                    type_name: self.type_name,
                }),
                _ => Err(Error::InvalidData {
                    type_name: self.type_name,
                    detail: format!("back-reference to unknown id {id}"),
                }),
            };
        }

        let slot = cx.tracker_mut().map(ReadTracker::reserve);
        let value = self.inner.read(r, cx)?;
        if let (Some(slot), Some(tracker)) = (slot, cx.tracker_mut()) {
            tracker.publish(slot, Box::new(value.clone()));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_in_encounter_order() {
        let mut tracker = WriteTracker::default();
        let ty = TypeId::of::<u32>();
        assert_eq!(tracker.observe(0x10, ty), Seen::New(0));
        assert_eq!(tracker.observe(0x20, ty), Seen::New(1));
        assert_eq!(tracker.observe(0x10, ty), Seen::InProgress(0));
        tracker.complete(0x10, ty);
        assert_eq!(tracker.observe(0x10, ty), Seen::Completed(0));
    }

    #[test]
    fn same_address_different_type_gets_a_fresh_id() {
        let mut tracker = WriteTracker::default();
        assert_eq!(tracker.observe(0x10, TypeId::of::<u32>()), Seen::New(0));
        assert_eq!(tracker.observe(0x10, TypeId::of::<u64>()), Seen::New(1));
    }

    #[test]
    fn read_tracker_distinguishes_reserved_from_unknown() {
        let mut tracker = ReadTracker::default();
        let slot = tracker.reserve();
        assert!(tracker.is_reserved(0));
        assert!(!tracker.is_reserved(1));
        assert!(tracker.get(0).is_none());
        tracker.publish(slot, Box::new(7u32));
        assert_eq!(
            tracker.get(0).and_then(|any| any.downcast_ref::<u32>()),
            Some(&7)
        );
    }
}
