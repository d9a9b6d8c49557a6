// SPDX-License-Identifier: Apache-2.0
//! The converter cache.
//!
//! Converters are memoized per `TypeId` for the lifetime of the cache.
//! Lookups are lock-light (a one-slot most-recently-used fast path, then
//! a short map probe); construction is serialized through a re-entrant
//! gate so exactly one thread builds at a time while recursion within
//! the building thread stays legal. Cyclic type graphs terminate because
//! a delayed placeholder is registered before descending into members.
//!
//! The cache captures its policy snapshot at construction and is never
//! reconfigured; a policy change means a new cache.

use std::any::{type_name, TypeId};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};

use mote_wire::{SyncReader, Writer};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::context::{ReadContext, WriteContext};
use crate::convert::{erase, unerase, ArcConverter, Converter, ErasedConverter};
use crate::error::Error;
use crate::options::SerializerOptions;
use crate::shape::Shaped;

fn relock<'a, T>(
    result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

/// Placeholder converter registered while a type's real converter is
/// under construction, so cyclic type graphs can resolve.
///
/// Calls dispatch to the installed converter; a call that arrives before
/// installation is a construction-order bug and fails accordingly.
pub(crate) struct DelayedConverter<T> {
    inner: OnceLock<ArcConverter<T>>,
}

impl<T> Default for DelayedConverter<T> {
    fn default() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }
}

impl<T: 'static> DelayedConverter<T> {
    pub(crate) fn install(&self, converter: ArcConverter<T>) {
        let _ = self.inner.set(converter);
    }

    fn resolved(&self) -> Result<&ArcConverter<T>, Error> {
        self.inner.get().ok_or(Error::ConverterNotYetBuilt {
            type_name: type_name::<T>(),
        })
    }
}

impl<T: Send + Sync + 'static> Converter<T> for DelayedConverter<T> {
    fn write(
        &self,
        w: &mut Writer<'_>,
        value: &T,
        cx: &mut WriteContext<'_>,
    ) -> Result<(), Error> {
        self.resolved()?.write(w, value, cx)
    }

    fn read(&self, r: &mut SyncReader<'_>, cx: &mut ReadContext<'_>) -> Result<T, Error> {
        self.resolved()?.read(r, cx)
    }
}

/// User-supplied converter sources, consulted before shape-driven
/// construction: registered instances, registered factories, then
/// factory delegates in registration order.
#[derive(Default, Clone)]
pub(crate) struct UserConverters {
    instances: FxHashMap<TypeId, ErasedConverter>,
    factories: FxHashMap<TypeId, fn() -> ErasedConverter>,
    delegates: Vec<Arc<dyn Fn(TypeId) -> Option<ErasedConverter> + Send + Sync>>,
}

impl UserConverters {
    pub(crate) fn register_instance<T: 'static>(&mut self, converter: ArcConverter<T>) {
        self.instances.insert(TypeId::of::<T>(), erase(converter));
    }

    pub(crate) fn register_factory<T, F>(&mut self)
    where
        T: 'static,
        F: Converter<T> + Default,
    {
        fn construct<T: 'static, F: Converter<T> + Default>() -> ErasedConverter {
            erase::<T>(Arc::new(F::default()))
        }
        self.factories.insert(TypeId::of::<T>(), construct::<T, F>);
    }

    pub(crate) fn register_delegate(
        &mut self,
        delegate: Arc<dyn Fn(TypeId) -> Option<ErasedConverter> + Send + Sync>,
    ) {
        self.delegates.push(delegate);
    }

    fn find(&self, key: TypeId) -> Option<ErasedConverter> {
        if let Some(instance) = self.instances.get(&key) {
            return Some(instance.clone());
        }
        if let Some(factory) = self.factories.get(&key) {
            return Some(factory());
        }
        self.delegates.iter().find_map(|delegate| delegate(key))
    }
}

#[derive(Clone)]
enum Slot {
    Ready(ErasedConverter),
    Building(ErasedConverter),
}

#[derive(Default)]
struct GateState {
    owner: Option<ThreadId>,
    depth: usize,
}

/// Re-entrant build gate: one thread constructs converters at a time;
/// that thread may re-enter freely while recursing through member types.
struct BuildGate {
    state: Mutex<GateState>,
    unlocked: Condvar,
}

impl BuildGate {
    fn new() -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            unlocked: Condvar::new(),
        }
    }

    fn enter(&self) {
        let me = thread::current().id();
        let mut state = relock(self.state.lock());
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    return;
                }
                Some(owner) if owner == me => {
                    state.depth += 1;
                    return;
                }
                Some(_) => {
                    state = relock(self.unlocked.wait(state));
                }
            }
        }
    }

    fn exit(&self) {
        let mut state = relock(self.state.lock());
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.owner = None;
            self.unlocked.notify_all();
        }
    }

    fn owned_by_me(&self) -> bool {
        relock(self.state.lock()).owner == Some(thread::current().id())
    }
}

struct GatePass<'a>(&'a BuildGate);

impl Drop for GatePass<'_> {
    fn drop(&mut self) {
        self.0.exit();
    }
}

fn typed<T: 'static>(erased: &ErasedConverter) -> Result<ArcConverter<T>, Error> {
    unerase::<T>(erased).ok_or(Error::InvalidShape {
        type_name: type_name::<T>(),
        detail: "cache slot holds a converter for a different type",
    })
}

/// Per-serializer converter registry.
pub struct ConverterCache {
    options: SerializerOptions,
    user: UserConverters,
    slots: Mutex<FxHashMap<TypeId, Slot>>,
    last: Mutex<Option<(TypeId, ErasedConverter)>>,
    gate: BuildGate,
}

impl ConverterCache {
    pub(crate) fn new(options: SerializerOptions, user: UserConverters) -> Self {
        Self {
            options,
            user,
            slots: Mutex::new(FxHashMap::default()),
            last: Mutex::new(None),
            gate: BuildGate::new(),
        }
    }

    /// The policy snapshot captured at construction.
    #[must_use]
    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    /// The user-supplied converter sources, for structural copies.
    pub(crate) fn user(&self) -> &UserConverters {
        &self.user
    }

    /// Returns the converter for `T`, building (and memoizing) it on
    /// first use.
    pub fn resolve<T: Shaped>(&self) -> Result<ArcConverter<T>, Error> {
        let key = TypeId::of::<T>();

        if let Some(hit) = self.last_lookup::<T>(key) {
            trace!(type_name = type_name::<T>(), "converter fast-path hit");
            return Ok(hit);
        }
        if let Some(found) = self.slot_lookup::<T>(key, self.gate.owned_by_me())? {
            return Ok(found);
        }

        self.gate.enter();
        let pass = GatePass(&self.gate);
        let built = self.build_locked::<T>(key);
        drop(pass);
        built
    }

    /// Untyped lookup of an already-built converter.
    ///
    /// Construction needs the static type, so this can only observe
    /// converters some typed call has already produced.
    #[must_use]
    pub fn get_erased(&self, key: TypeId) -> Option<ErasedConverter> {
        match relock(self.slots.lock()).get(&key) {
            Some(Slot::Ready(erased)) => Some(erased.clone()),
            _ => None,
        }
    }

    fn last_lookup<T: 'static>(&self, key: TypeId) -> Option<ArcConverter<T>> {
        let last = relock(self.last.lock());
        match last.as_ref() {
            Some((id, erased)) if *id == key => unerase::<T>(erased),
            _ => None,
        }
    }

    fn remember(&self, key: TypeId, erased: ErasedConverter) {
        *relock(self.last.lock()) = Some((key, erased));
    }

    /// Map probe. `allow_building` admits placeholder slots, which is
    /// only correct for the thread that owns the build gate (recursion
    /// during its own build); other threads must wait for the real
    /// converter instead.
    fn slot_lookup<T: 'static>(
        &self,
        key: TypeId,
        allow_building: bool,
    ) -> Result<Option<ArcConverter<T>>, Error> {
        let slot = relock(self.slots.lock()).get(&key).cloned();
        match slot {
            Some(Slot::Ready(erased)) => {
                let converter = typed::<T>(&erased)?;
                self.remember(key, erased);
                Ok(Some(converter))
            }
            Some(Slot::Building(erased)) if allow_building => Ok(Some(typed::<T>(&erased)?)),
            _ => Ok(None),
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        relock(self.slots.lock()).len()
    }

    fn build_locked<T: Shaped>(&self, key: TypeId) -> Result<ArcConverter<T>, Error> {
        // Double-check: another thread may have finished this converter
        // while we waited at the gate, or we may be recursing into a
        // type whose placeholder is already registered.
        if let Some(found) = self.slot_lookup::<T>(key, true)? {
            return Ok(found);
        }

        if let Some(user) = self.user.find(key) {
            debug!(type_name = type_name::<T>(), "using user-supplied converter");
            let converter = typed::<T>(&user)?;
            relock(self.slots.lock()).insert(key, Slot::Ready(user.clone()));
            self.remember(key, user);
            return Ok(converter);
        }

        debug!(type_name = type_name::<T>(), "building converter");
        let delayed = Arc::new(DelayedConverter::<T>::default());
        let placeholder: ArcConverter<T> = delayed.clone();
        relock(self.slots.lock()).insert(key, Slot::Building(erase(placeholder)));

        let built = match crate::builders::build_from_shape::<T>(self) {
            Ok(converter) => converter,
            Err(e) => {
                relock(self.slots.lock()).remove(&key);
                return Err(e);
            }
        };

        delayed.install(built.clone());
        relock(self.slots.lock()).insert(key, Slot::Ready(erase(built.clone())));
        self.remember(key, erase(built.clone()));
        Ok(built)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delayed_converter_fails_before_installation() {
        let delayed = DelayedConverter::<u32>::default();
        match delayed.resolved() {
            Err(err) => assert!(matches!(err, Error::ConverterNotYetBuilt { .. })),
            Ok(_) => panic!("nothing installed yet"),
        }
    }

    #[test]
    fn gate_is_reentrant_for_its_owner() {
        let gate = BuildGate::new();
        gate.enter();
        assert!(gate.owned_by_me());
        gate.enter();
        gate.exit();
        assert!(gate.owned_by_me(), "owner keeps the gate until depth 0");
        gate.exit();
        assert!(!gate.owned_by_me());
    }

    #[test]
    fn gate_excludes_other_threads_until_released() {
        let gate = Arc::new(BuildGate::new());
        let in_section = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let in_section = Arc::clone(&in_section);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    for _ in 0..50 {
                        gate.enter();
                        let now = in_section.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        in_section.fetch_sub(1, Ordering::SeqCst);
                        gate.exit();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker");
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1, "one owner at a time");
    }

    #[test]
    fn resolve_memoizes_and_fills_the_slot_map() {
        let cache = ConverterCache::new(SerializerOptions::default(), UserConverters::default());
        assert_eq!(cache.slot_count(), 0);
        cache.resolve::<u32>().expect("build");
        assert_eq!(cache.slot_count(), 1);
        cache.resolve::<u32>().expect("cached");
        assert_eq!(cache.slot_count(), 1);
        assert!(cache.get_erased(TypeId::of::<u32>()).is_some());
        assert!(cache.get_erased(TypeId::of::<u16>()).is_none());
    }
}
