//! Global and weak-global handles.
//!
//! The global table is shared by every native thread. Slots are guarded by a
//! short read/write lock; released slot indices are recycled through a
//! lock-free queue. Each slot carries a generation that is bumped on release,
//! so a stale handle to a recycled slot never resolves to the new occupant.
//! A slot whose generation wraps is retired instead of recycled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use core_types::{ContractViolation, RefKind};
use crossbeam::queue::SegQueue;
use object_model::{ObjectRef, WeakObjectRef};
use parking_lot::RwLock;

use crate::handle::{next_generation, AllocError, Handle, MAX_INDEX};

enum Referent {
    Free,
    Strong(ObjectRef),
    Weak(WeakObjectRef),
}

struct Slot {
    generation: u32,
    referent: Referent,
}

/// Shared table of global and weak-global handles.
pub struct GlobalTable {
    slots: RwLock<Vec<Slot>>,
    free: SegQueue<usize>,
    live: AtomicUsize,
    limit: usize,
}

impl GlobalTable {
    /// Creates an empty table holding at most `limit` handles.
    pub fn new(limit: usize) -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
            free: SegQueue::new(),
            live: AtomicUsize::new(0),
            limit: limit.min(MAX_INDEX),
        }
    }

    /// Creates a strong global handle. Null maps to the null handle.
    pub fn create_global(&self, object: Option<ObjectRef>) -> Result<Handle, AllocError> {
        match object {
            Some(object) => self.insert(Referent::Strong(object), RefKind::Global),
            None => Ok(Handle::NULL),
        }
    }

    /// Creates a weak global handle. Null maps to the null handle.
    pub fn create_weak(&self, object: Option<ObjectRef>) -> Result<Handle, AllocError> {
        match object {
            Some(object) => self.insert(Referent::Weak(Arc::downgrade(&object)), RefKind::WeakGlobal),
            None => Ok(Handle::NULL),
        }
    }

    fn insert(&self, referent: Referent, kind: RefKind) -> Result<Handle, AllocError> {
        if self.live.fetch_add(1, Ordering::AcqRel) >= self.limit {
            self.live.fetch_sub(1, Ordering::AcqRel);
            return Err(AllocError::GlobalLimit { limit: self.limit });
        }
        let mut slots = self.slots.write();
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                slots.push(Slot {
                    generation: 0,
                    referent: Referent::Free,
                });
                slots.len() - 1
            }
        };
        let slot = &mut slots[index];
        slot.referent = referent;
        let handle = Handle::new(index, slot.generation, kind);
        log::trace!("new global {handle:?}");
        Ok(handle)
    }

    fn with_slot<R>(&self, handle: Handle, f: impl FnOnce(&Referent) -> R) -> Option<R> {
        let slots = self.slots.read();
        let slot = slots.get(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        Some(f(&slot.referent))
    }

    /// Returns true if `handle` is a live handle of its tagged kind.
    ///
    /// A weak handle whose referent was collected is still live until it is
    /// deleted.
    pub fn is_live(&self, handle: Handle) -> bool {
        let kind = handle.tag_kind();
        self.with_slot(handle, |r| {
            matches!(
                (kind, r),
                (RefKind::Global, Referent::Strong(_)) | (RefKind::WeakGlobal, Referent::Weak(_))
            )
        })
        .unwrap_or(false)
    }

    /// The object a handle stands for.
    ///
    /// `None` for null, deleted or foreign handles and for weak handles whose
    /// referent is gone.
    pub fn resolve(&self, handle: Handle) -> Option<ObjectRef> {
        let kind = handle.tag_kind();
        self.with_slot(handle, |r| match (kind, r) {
            (RefKind::Global, Referent::Strong(object)) => Some(Arc::clone(object)),
            (RefKind::WeakGlobal, Referent::Weak(weak)) => weak.upgrade(),
            _ => None,
        })
        .flatten()
    }

    /// Releases a global or weak-global handle.
    ///
    /// The handle's tag must match the slot's occupant; anything else is a
    /// contract violation.
    pub fn delete(&self, handle: Handle) -> Result<(), ContractViolation> {
        if !self.is_live(handle) {
            return Err(ContractViolation::InvalidHandle {
                handle: handle.raw(),
                expected: if handle.tag_kind() == RefKind::WeakGlobal {
                    "weak global"
                } else {
                    "global"
                },
            });
        }
        let mut slots = self.slots.write();
        let slot = &mut slots[handle.index()];
        if slot.generation != handle.generation() || matches!(slot.referent, Referent::Free) {
            // lost a race with another delete of the same handle
            return Err(ContractViolation::InvalidHandle {
                handle: handle.raw(),
                expected: "global",
            });
        }
        slot.referent = Referent::Free;
        slot.generation = next_generation(slot.generation);
        let retired = slot.generation == 0;
        drop(slots);
        if retired {
            log::debug!("retiring global slot {} after generation wrap", handle.index());
        } else {
            self.free.push(handle.index());
        }
        self.live.fetch_sub(1, Ordering::AcqRel);
        log::trace!("deleted global {handle:?}");
        Ok(())
    }

    /// Number of live global and weak-global handles.
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Configured handle limit.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for GlobalTable {
    fn default() -> Self {
        Self::new(65_536)
    }
}
