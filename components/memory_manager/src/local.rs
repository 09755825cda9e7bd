//! Local handles and the frame stack.
//!
//! Local handles belong to the innermost frame that was open when they were
//! created. Popping a frame releases all of them at once, optionally
//! promoting one result into the parent frame. The table is confined to its
//! thread: the bridge keeps one per native context.
//!
//! The root frame always exists and guarantees room for
//! [`MIN_LOCAL_CAPACITY`] handles; storage grows past any capacity hint up to
//! the configured limit.
//!
//! Every slot keeps a generation that moves on whenever the slot is released,
//! whether by delete, frame pop or reset. Handles carry the generation they
//! were issued with and stop resolving once it moves.

use core_types::{ContractViolation, RefKind};
use object_model::ObjectRef;
use thiserror::Error;

use crate::handle::{next_generation, AllocError, Handle, MAX_INDEX};

/// Locals every native call may create without asking for capacity.
pub const MIN_LOCAL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy)]
struct Frame {
    /// Slot count when the frame was pushed
    mark: usize,
    /// Capacity reserved for this frame
    capacity: usize,
}

/// Why a frame could not be popped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Pop without a matching push
    #[error(transparent)]
    Unbalanced(#[from] ContractViolation),
    /// The frame was popped but the result found no room in the parent
    #[error("cannot promote frame result: {0}")]
    Promotion(#[from] AllocError),
}

/// Per-thread local handle table with its frame stack.
pub struct LocalFrames {
    slots: Vec<Option<ObjectRef>>,
    /// Current generation per slot index; never shrinks
    generations: Vec<u32>,
    /// Deleted slots above the current frame's mark, reusable
    free: Vec<usize>,
    frames: Vec<Frame>,
    limit: usize,
}

impl LocalFrames {
    /// Creates a table with only the root frame.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of local slots across all frames; never
    ///   lower than [`MIN_LOCAL_CAPACITY`]
    pub fn new(limit: usize) -> Self {
        let limit = limit.clamp(MIN_LOCAL_CAPACITY, MAX_INDEX);
        Self {
            slots: Vec::with_capacity(MIN_LOCAL_CAPACITY),
            generations: Vec::with_capacity(MIN_LOCAL_CAPACITY),
            free: Vec::new(),
            frames: vec![Frame {
                mark: 0,
                capacity: MIN_LOCAL_CAPACITY,
            }],
            limit,
        }
    }

    /// Creates a local handle for `object`. Null maps to the null handle.
    pub fn handlify(&mut self, object: Option<ObjectRef>) -> Result<Handle, AllocError> {
        let Some(object) = object else {
            return Ok(Handle::NULL);
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(object);
                index
            }
            None => {
                if self.slots.len() >= self.limit {
                    return Err(AllocError::LocalLimit { limit: self.limit });
                }
                self.slots.push(Some(object));
                self.slots.len() - 1
            }
        };
        if index == self.generations.len() {
            self.generations.push(0);
        }
        let handle = Handle::new(index, self.generations[index], RefKind::Local);
        log::trace!("new local {handle:?}");
        Ok(handle)
    }

    /// Returns true if `handle` is a live local of this table.
    pub fn is_live(&self, handle: Handle) -> bool {
        self.issued(handle) && matches!(self.slots.get(handle.index()), Some(Some(_)))
    }

    fn issued(&self, handle: Handle) -> bool {
        handle.tag_kind() == RefKind::Local && self.generations.get(handle.index()) == Some(&handle.generation())
    }

    /// The object a local handle stands for; `None` for null, deleted or
    /// foreign handles.
    pub fn resolve(&self, handle: Handle) -> Option<ObjectRef> {
        if !self.issued(handle) {
            return None;
        }
        self.slots.get(handle.index()).cloned().flatten()
    }

    /// Releases one local handle before its frame is popped.
    pub fn delete(&mut self, handle: Handle) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        let index = handle.index();
        self.slots[index] = None;
        self.retire(index..index + 1);
        // slots below the mark belong to an outer frame and are reclaimed when it is current again
        if index >= self.current_mark() {
            if index + 1 == self.slots.len() {
                self.slots.pop();
            } else {
                self.free.push(index);
            }
        }
        log::trace!("deleted local {handle:?}");
        true
    }

    /// Opens a new frame with room for at least `capacity` locals.
    pub fn push_frame(&mut self, capacity: usize) -> Result<(), AllocError> {
        self.reserve(capacity)?;
        self.frames.push(Frame {
            mark: self.slots.len(),
            capacity,
        });
        self.free.clear();
        log::trace!("pushed local frame {} (capacity {capacity})", self.frames.len() - 1);
        Ok(())
    }

    /// Makes sure the current frame can hold `capacity` more locals.
    pub fn ensure_capacity(&mut self, capacity: usize) -> Result<(), AllocError> {
        self.reserve(capacity)?;
        if let Some(frame) = self.frames.last_mut() {
            frame.capacity = frame.capacity.max(capacity);
        }
        Ok(())
    }

    fn reserve(&mut self, capacity: usize) -> Result<(), AllocError> {
        if self.slots.len().saturating_add(capacity) > self.limit {
            return Err(AllocError::LocalLimit { limit: self.limit });
        }
        self.slots.reserve(capacity);
        Ok(())
    }

    /// Closes the innermost frame, releasing every local it created.
    ///
    /// `result` is the object to carry over: it receives a fresh handle in
    /// the parent frame, which is returned (null when `result` is `None`).
    /// The root frame cannot be popped.
    ///
    /// # Errors
    ///
    /// [`FrameError::Unbalanced`] when only the root frame is open, and
    /// [`FrameError::Promotion`] when the parent frame has no room left for
    /// the result. The frame is popped in the latter case.
    pub fn pop_frame(&mut self, result: Option<ObjectRef>) -> Result<Handle, FrameError> {
        if self.frames.len() <= 1 {
            return Err(ContractViolation::UnbalancedFrame.into());
        }
        let frame = self.frames.pop().ok_or(ContractViolation::UnbalancedFrame)?;
        self.retire(frame.mark..self.slots.len());
        self.slots.truncate(frame.mark);
        self.rebuild_free_list();
        log::trace!("popped local frame {}", self.frames.len());
        Ok(self.handlify(result)?)
    }

    /// Pops every frame above the root and clears the root frame.
    pub fn reset(&mut self) {
        self.retire(0..self.slots.len());
        self.frames.truncate(1);
        self.slots.clear();
        self.free.clear();
    }

    fn retire(&mut self, range: std::ops::Range<usize>) {
        for generation in &mut self.generations[range] {
            *generation = next_generation(*generation);
        }
    }

    fn current_mark(&self) -> usize {
        self.frames.last().map_or(0, |f| f.mark)
    }

    fn rebuild_free_list(&mut self) {
        let mark = self.current_mark();
        self.free = (mark..self.slots.len()).filter(|&i| self.slots[i].is_none()).collect();
    }

    /// Number of frames, the root frame included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Number of live local handles across all frames.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Capacity reserved by the innermost frame.
    pub fn frame_capacity(&self) -> usize {
        self.frames.last().map_or(MIN_LOCAL_CAPACITY, |f| f.capacity)
    }

    /// Configured slot limit.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for LocalFrames {
    fn default() -> Self {
        Self::new(MIN_LOCAL_CAPACITY * 64)
    }
}
