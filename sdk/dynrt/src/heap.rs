//! ManagedHeap - reference-counted object heap
//!
//! A generational slot arena implementing [`HostRuntime`]. Each slot stores
//! the reference count next to the object body, so no pointer arithmetic is
//! needed to reach an object's header.
//!
//! The heap is single-threaded (`RefCell` inside, hence `!Sync`): the
//! runtime's own serialization is what makes count mutation safe.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::config::HeapConfig;
use crate::host::{HostError, HostResult, HostRuntime};
use crate::object::{ObjectBody, ObjectValue, WrappedPayload};
use crate::type_system::{Handle, ObjectKind};

/// Counters describing heap activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
    /// Objects currently alive, including the none singleton
    pub live: usize,
    /// Objects allocated since the heap was created
    pub allocated: u64,
    /// Objects destroyed since the heap was created
    pub freed: u64,
}

const MAX_SLOTS: usize = u32::MAX as usize;

struct Entry {
    refcount: usize,
    body: ObjectBody,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Default)]
struct HeapInner {
    slots: Vec<Slot>,
    free: Vec<u32>,
    stats: HeapStats,
}

impl HeapInner {
    /// Slot indices must stay below `u32::MAX` so `slot + 1` fits the low
    /// half of a handle
    fn is_exhausted(&self) -> bool {
        self.free.is_empty() && self.slots.len() >= MAX_SLOTS
    }

    fn insert(&mut self, body: ObjectBody) -> Handle {
        let entry = Entry { refcount: 1, body };

        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                Handle::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, entry: Some(entry) });
                Handle::new(index, 0)
            }
        };

        self.stats.live += 1;
        self.stats.allocated += 1;
        handle
    }

    fn entry(&self, handle: Handle) -> HostResult<&Entry> {
        let index = handle.slot().ok_or(HostError::NullHandle)?;
        self.slots
            .get(index as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(HostError::InvalidHandle { handle })
    }

    fn entry_mut(&mut self, handle: Handle) -> HostResult<(usize, &mut Entry)> {
        let index = handle.slot().ok_or(HostError::NullHandle)? as usize;
        self.slots
            .get_mut(index)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.entry.as_mut())
            .map(|entry| (index, entry))
            .ok_or(HostError::InvalidHandle { handle })
    }

    /// Empty a slot and hand its body back to the caller for dropping
    fn release(&mut self, index: usize) -> Option<ObjectBody> {
        let slot = self.slots.get_mut(index)?;
        let entry = slot.entry.take()?;

        // A slot whose generation is exhausted is retired instead of reused,
        // so a stale handle can never alias a later object
        match slot.generation.checked_add(1) {
            Some(next) => {
                slot.generation = next;
                self.free.push(index as u32);
            }
            None => log::debug!("[Heap] retiring slot {} after {} generations", index, u32::MAX),
        }

        self.stats.live -= 1;
        self.stats.freed += 1;
        Some(entry.body)
    }
}

/// In-process dynamic runtime heap
pub struct ManagedHeap {
    inner: RefCell<HeapInner>,
    none: Handle,
    config: HeapConfig,
}

impl ManagedHeap {
    /// Create a heap with the default configuration
    pub fn new() -> Self {
        Self::with_config(HeapConfig::default())
    }

    /// Create a heap configured from the environment, see
    /// [`HeapConfig::from_env`]
    pub fn from_env() -> Self {
        Self::with_config(HeapConfig::from_env())
    }

    /// Create a heap with an explicit configuration
    ///
    /// The none singleton is allocated here and owned by the heap; it does
    /// not count against `max_objects` admission.
    pub fn with_config(config: HeapConfig) -> Self {
        let mut inner = HeapInner {
            slots: Vec::with_capacity(config.initial_capacity),
            ..Default::default()
        };
        let none = inner.insert(ObjectBody::None);

        Self {
            inner: RefCell::new(inner),
            none,
            config,
        }
    }

    /// Configuration this heap was built with
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Snapshot of the heap counters
    pub fn stats(&self) -> HeapStats {
        self.inner.borrow().stats
    }

    fn alloc(&self, body: ObjectBody) -> HostResult<Handle> {
        let mut inner = self.inner.borrow_mut();

        let refused = match self.config.max_objects {
            Some(limit) if inner.stats.live >= limit => Some(limit),
            _ if inner.is_exhausted() => Some(MAX_SLOTS),
            _ => None,
        };
        if let Some(limit) = refused {
            // Release the borrow before `body` drops: a wrapped payload's
            // destructor may call back into the heap.
            drop(inner);
            drop(body);
            return Err(HostError::AllocationFailed { limit });
        }

        let kind = body.kind();
        let handle = inner.insert(body);
        drop(inner);

        if kind == ObjectKind::Wrapped {
            log::debug!("[Heap] allocated wrapped object {}", handle);
        } else if self.config.trace_refcounts {
            log::trace!("[Heap] alloc {} {} refcount=1", kind, handle);
        }
        Ok(handle)
    }
}

impl Default for ManagedHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManagedHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedHeap")
            .field("stats", &self.stats())
            .field("config", &self.config)
            .finish()
    }
}

impl Drop for ManagedHeap {
    fn drop(&mut self) {
        let live = self.inner.get_mut().stats.live;
        if live > 1 {
            log::debug!("[Heap] dropped with {} live objects besides none", live - 1);
        }
    }
}

impl HostRuntime for ManagedHeap {
    fn none(&self) -> Handle {
        self.none
    }

    fn new_bool(&self, value: bool) -> HostResult<Handle> {
        self.alloc(ObjectBody::Bool(value))
    }

    fn new_int(&self, value: i64) -> HostResult<Handle> {
        self.alloc(ObjectBody::Int(value))
    }

    fn new_uint(&self, value: u64) -> HostResult<Handle> {
        self.alloc(ObjectBody::UInt(value))
    }

    fn new_float(&self, value: f64) -> HostResult<Handle> {
        self.alloc(ObjectBody::Float(value))
    }

    fn new_str(&self, bytes: &[u8]) -> HostResult<Handle> {
        self.alloc(ObjectBody::Str(bytes.into()))
    }

    fn new_wrapped(&self, payload: WrappedPayload) -> HostResult<Handle> {
        self.alloc(ObjectBody::Wrapped(Rc::new(payload)))
    }

    fn incref(&self, handle: Handle) {
        let mut inner = self.inner.borrow_mut();
        let count = match inner.entry_mut(handle) {
            Ok((_, entry)) => {
                entry.refcount += 1;
                entry.refcount
            }
            Err(err) => panic!("incref on {}: {}", handle, err),
        };
        drop(inner);

        if self.config.trace_refcounts {
            log::trace!("[Heap] incref {} refcount={}", handle, count);
        }
    }

    fn decref(&self, handle: Handle) {
        let released = {
            let mut inner = self.inner.borrow_mut();
            let (index, entry) = match inner.entry_mut(handle) {
                Ok(found) => found,
                Err(err) => panic!("decref on {}: {}", handle, err),
            };

            entry.refcount -= 1;
            let remaining = entry.refcount;

            if self.config.trace_refcounts {
                log::trace!("[Heap] decref {} refcount={}", handle, remaining);
            }

            if remaining > 0 {
                None
            } else if handle == self.none {
                panic!("decref on {}: the none singleton was released more times than acquired", handle);
            } else {
                inner.release(index)
            }
        };

        // Drop outside the borrow so payload destructors may re-enter the heap
        if let Some(body) = released {
            if let ObjectBody::Wrapped(payload) = &body {
                log::debug!("[Heap] destroying wrapped object {} ({})", handle, payload.type_name());
            } else if self.config.trace_refcounts {
                log::trace!("[Heap] free {} {}", body.kind(), handle);
            }
            drop(body);
        }
    }

    fn kind(&self, handle: Handle) -> HostResult<ObjectKind> {
        let inner = self.inner.borrow();
        inner.entry(handle).map(|entry| entry.body.kind())
    }

    fn inspect(&self, handle: Handle) -> HostResult<ObjectValue> {
        let inner = self.inner.borrow();
        inner.entry(handle).map(|entry| entry.body.snapshot())
    }

    fn with_wrapped<R, F>(&self, handle: Handle, f: F) -> HostResult<R>
    where
        F: FnOnce(&WrappedPayload) -> R,
    {
        let payload = {
            let inner = self.inner.borrow();
            match &inner.entry(handle)?.body {
                ObjectBody::Wrapped(payload) => Rc::clone(payload),
                other => return Err(HostError::NotWrapped { found: other.kind() }),
            }
        };

        // `f` runs without the heap borrow; if it releases the object, the
        // payload lives on until `f` returns
        Ok(f(&payload))
    }

    fn refcount(&self, handle: Handle) -> HostResult<usize> {
        let inner = self.inner.borrow();
        inner.entry(handle).map(|entry| entry.refcount)
    }

    fn live_objects(&self) -> usize {
        self.inner.borrow().stats.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_singleton_is_live() {
        let heap = ManagedHeap::new();
        let none = heap.none();

        assert_eq!(heap.live_objects(), 1);
        assert_eq!(heap.kind(none), Ok(ObjectKind::None));
        assert_eq!(heap.refcount(none), Ok(1));
    }

    #[test]
    fn test_alloc_and_free() {
        let heap = ManagedHeap::new();
        let h = heap.new_int(42).unwrap();

        assert_eq!(heap.live_objects(), 2);
        assert_eq!(heap.inspect(h), Ok(ObjectValue::Int(42)));

        heap.decref(h);
        assert_eq!(heap.live_objects(), 1);
        assert_eq!(heap.inspect(h), Err(HostError::InvalidHandle { handle: h }));
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let heap = ManagedHeap::new();
        let first = heap.new_float(1.5).unwrap();
        heap.decref(first);

        let second = heap.new_float(2.5).unwrap();
        assert_eq!(first.slot(), second.slot());
        assert_ne!(first.generation(), second.generation());

        // The stale handle must not alias the new object
        assert!(heap.kind(first).is_err());
        assert_eq!(heap.inspect(second), Ok(ObjectValue::Float(2.5)));
        heap.decref(second);
    }

    #[test]
    fn test_incref_keeps_object_alive() {
        let heap = ManagedHeap::new();
        let h = heap.new_str(b"abc").unwrap();

        heap.incref(h);
        assert_eq!(heap.refcount(h), Ok(2));

        heap.decref(h);
        assert_eq!(heap.inspect(h), Ok(ObjectValue::Str(b"abc".to_vec())));

        heap.decref(h);
        assert_eq!(heap.live_objects(), 1);
    }

    #[test]
    fn test_with_wrapped_rejects_primitives() {
        let heap = ManagedHeap::new();
        let h = heap.new_bool(true).unwrap();

        let result = heap.with_wrapped(h, |_| ());
        assert_eq!(result, Err(HostError::NotWrapped { found: ObjectKind::Bool }));
        heap.decref(h);
    }

    #[test]
    fn test_with_wrapped_closure_may_use_heap() {
        let heap = ManagedHeap::new();
        let h = heap.new_wrapped(WrappedPayload::new(Box::new(21i64))).unwrap();

        let doubled = heap
            .with_wrapped(h, |p| {
                let value = **p.downcast_ref::<Box<i64>>().unwrap();
                heap.new_int(value * 2)
            })
            .unwrap()
            .unwrap();
        assert_eq!(heap.inspect(doubled), Ok(ObjectValue::Int(42)));

        // Releasing the object from inside the closure keeps the payload
        // readable until the closure returns
        let seen = heap.with_wrapped(h, |p| {
            heap.decref(h);
            p.downcast_ref::<Box<i64>>().map(|b| **b)
        });
        assert_eq!(seen, Ok(Some(21)));
        assert!(heap.kind(h).is_err());

        heap.decref(doubled);
        assert_eq!(heap.live_objects(), 1);
    }

    #[test]
    fn test_exhausted_generation_retires_slot() {
        let heap = ManagedHeap::new();
        let h = heap.new_int(1).unwrap();
        let index = h.slot().unwrap() as usize;
        heap.inner.borrow_mut().slots[index].generation = u32::MAX;
        let last = Handle::new(index as u32, u32::MAX);

        heap.decref(last);
        let next = heap.new_int(2).unwrap();

        assert_ne!(next.slot(), last.slot());
        assert!(heap.kind(last).is_err());
        heap.decref(next);
    }

    #[test]
    fn test_stats() {
        let heap = ManagedHeap::new();
        let a = heap.new_int(1).unwrap();
        let b = heap.new_uint(2).unwrap();
        heap.decref(a);

        let stats = heap.stats();
        assert_eq!(stats.live, 2);
        assert_eq!(stats.allocated, 3);
        assert_eq!(stats.freed, 1);
        heap.decref(b);
    }

    #[test]
    #[should_panic(expected = "decref on #null")]
    fn test_decref_null_panics() {
        let heap = ManagedHeap::new();
        heap.decref(Handle::NULL);
    }

    #[test]
    #[should_panic(expected = "was released or never existed")]
    fn test_double_decref_panics() {
        let heap = ManagedHeap::new();
        let h = heap.new_int(5).unwrap();
        heap.decref(h);
        heap.decref(h);
    }

    #[test]
    #[should_panic(expected = "none singleton")]
    fn test_over_releasing_none_panics() {
        let heap = ManagedHeap::new();
        heap.decref(heap.none());
    }
}
