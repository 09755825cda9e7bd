//! Handle encoding.
//!
//! A [`Handle`] is the opaque integer native code holds in place of a guest
//! reference. The low two bits carry the reference kind, so every raw value
//! names exactly one kind; zero is the null handle.
//!
//! ```text
//!   63 .............. 26 | 25 ...... 2 | 1 0
//!   slot index           | generation  | tag (1 local, 2 global, 3 weak)
//! ```
//!
//! The generation changes every time a slot is released, so a handle kept
//! past its release never names the slot's next occupant.

use std::fmt;

use core_types::RefKind;
use thiserror::Error;

const TAG_BITS: u32 = 2;
const TAG_MASK: usize = (1 << TAG_BITS) - 1;
#[cfg(target_pointer_width = "64")]
const GENERATION_BITS: u32 = 24;
#[cfg(not(target_pointer_width = "64"))]
const GENERATION_BITS: u32 = 12;
const GENERATION_MASK: usize = (1 << GENERATION_BITS) - 1;
const INDEX_SHIFT: u32 = TAG_BITS + GENERATION_BITS;

/// Last generation before a slot's counter wraps.
pub(crate) const MAX_GENERATION: u32 = GENERATION_MASK as u32;

/// Largest slot index a handle can encode.
pub const MAX_INDEX: usize = usize::MAX >> INDEX_SHIFT;

/// Handle or buffer exhaustion. Surfaces to the guest as out-of-memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// Local handle table is full
    #[error("local reference table overflow (limit {limit})")]
    LocalLimit {
        /// Configured capacity
        limit: usize,
    },
    /// Global handle table is full
    #[error("global reference table overflow (limit {limit})")]
    GlobalLimit {
        /// Configured capacity
        limit: usize,
    },
    /// A native buffer would exceed the configured byte budget
    #[error("native buffer of {requested} bytes exceeds budget ({in_use} of {limit} in use)")]
    BufferLimit {
        /// Bytes asked for
        requested: usize,
        /// Bytes already handed out
        in_use: usize,
        /// Configured budget
        limit: usize,
    },
    /// The host allocator failed
    #[error("host allocation of {0} bytes failed")]
    OutOfMemory(usize),
}

/// An opaque reference handle.
///
/// # Examples
///
/// ```
/// use core_types::RefKind;
/// use memory_manager::Handle;
///
/// assert!(Handle::NULL.is_null());
/// assert_eq!(Handle::NULL.tag_kind(), RefKind::Invalid);
/// assert_eq!(Handle::from_raw(0x401).tag_kind(), RefKind::Local);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Handle(usize);

impl Handle {
    /// The null handle.
    pub const NULL: Handle = Handle(0);

    /// Reinterprets a raw value received from native code.
    pub const fn from_raw(raw: usize) -> Self {
        Handle(raw)
    }

    /// The raw value handed to native code.
    pub const fn raw(self) -> usize {
        self.0
    }

    /// Returns true for the null handle.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn new(index: usize, generation: u32, kind: RefKind) -> Self {
        debug_assert!(index <= MAX_INDEX);
        let generation = generation as usize & GENERATION_MASK;
        Handle((index << INDEX_SHIFT) | (generation << TAG_BITS) | kind.code() as usize)
    }

    /// The kind encoded in the tag bits. Says nothing about liveness.
    pub fn tag_kind(self) -> RefKind {
        RefKind::from_code((self.0 & TAG_MASK) as i32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 >> INDEX_SHIFT
    }

    pub(crate) fn generation(self) -> u32 {
        ((self.0 >> TAG_BITS) & GENERATION_MASK) as u32
    }
}

/// The generation a slot moves to when released. Wraps to zero once the
/// generation field is exhausted.
pub(crate) fn next_generation(generation: u32) -> u32 {
    (generation.wrapping_add(1) as usize & GENERATION_MASK) as u32
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "Handle(null)");
        }
        write!(f, "Handle({:?} #{} g{})", self.tag_kind(), self.index(), self.generation())
    }
}
