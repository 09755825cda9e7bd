//! Exception relay.
//!
//! Each native context owns one pending-exception slot. Entry points that
//! raise a guest error park the throwable here and return their type's
//! default value; native code checks the slot separately. Setting an already
//! occupied slot overwrites it.

use std::cell::RefCell;

use object_model::ObjectRef;

/// The pending-exception slot of one native context.
#[derive(Default)]
pub struct PendingException {
    slot: RefCell<Option<ObjectRef>>,
}

impl PendingException {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `throwable` the pending exception, replacing any other.
    pub fn set(&self, throwable: ObjectRef) {
        let previous = self.slot.replace(Some(throwable));
        if let Some(previous) = previous {
            log::trace!("pending {} overwritten", previous.class().name());
        }
    }

    /// The pending exception, if any.
    pub fn get(&self) -> Option<ObjectRef> {
        self.slot.borrow().clone()
    }

    /// Returns true if an exception is pending.
    pub fn is_pending(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Clears the slot. Clearing an empty slot does nothing.
    pub fn clear(&self) {
        self.slot.replace(None);
    }

    /// Removes and returns the pending exception.
    pub fn take(&self) -> Option<ObjectRef> {
        self.slot.take()
    }

    /// Runs a probe that may clear or replace the pending exception, then
    /// puts the exception that was pending beforehand back.
    ///
    /// The probe runs with an empty slot. Whatever it leaves behind is
    /// discarded when there was an exception to restore.
    pub fn preserve<R>(&self, probe: impl FnOnce() -> R) -> R {
        let saved = self.take();
        let result = probe();
        if let Some(saved) = saved {
            if let Some(stray) = self.slot.replace(Some(saved)) {
                log::debug!("discarding {} raised while probing", stray.class().name());
            }
        }
        result
    }
}
