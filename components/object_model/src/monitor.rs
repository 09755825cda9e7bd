//! Intrinsic object monitors.
//!
//! Every guest object owns one reentrant [`Monitor`]. Enter and exit are
//! separate calls (native code brackets a region with two entry points), so
//! the lock is tracked by owner thread and recursion count rather than by
//! a guard object.

use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Exit by a thread that does not hold the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("current thread does not own the monitor")]
pub struct NotOwner;

#[derive(Debug, Default)]
struct MonitorState {
    owner: Option<ThreadId>,
    count: usize,
}

/// A reentrant lock owned by a guest object.
#[derive(Debug, Default)]
pub struct Monitor {
    state: Mutex<MonitorState>,
    released: Condvar,
}

impl Monitor {
    /// Creates an unowned monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the monitor, blocking while another thread owns it.
    ///
    /// Reentrant: the owning thread may enter again, and must exit once per
    /// enter.
    pub fn enter(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.count = 1;
                    return;
                }
                Some(owner) if owner == me => {
                    state.count += 1;
                    return;
                }
                Some(_) => self.released.wait(&mut state),
            }
        }
    }

    /// Acquires the monitor only if it is free or already ours.
    pub fn try_enter(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.state.lock();
        match state.owner {
            None => {
                state.owner = Some(me);
                state.count = 1;
                true
            }
            Some(owner) if owner == me => {
                state.count += 1;
                true
            }
            Some(_) => false,
        }
    }

    /// Releases one level of ownership.
    pub fn exit(&self) -> Result<(), NotOwner> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return Err(NotOwner);
        }
        state.count -= 1;
        if state.count == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_one();
        }
        Ok(())
    }

    /// Returns true if the calling thread owns the monitor.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    /// Recursion depth of the current owner (0 when free).
    pub fn entry_count(&self) -> usize {
        self.state.lock().count
    }
}
