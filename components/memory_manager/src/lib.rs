//! Memory Manager - reference handles and native buffers
//!
//! This component provides:
//! - [`Handle`] - the tagged integer native code holds in place of a reference
//! - [`LocalFrames`] - per-thread local handles and the frame stack
//! - [`GlobalTable`] - shared global and weak-global handles
//! - [`NativeBufferRegistry`] - host memory blocks surfaced to native code
//!
//! Local handles are thread-confined; the global table and the buffer
//! registry are safe to share between native threads.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffers;
pub mod global;
pub mod handle;
pub mod local;

pub use buffers::NativeBufferRegistry;
pub use global::GlobalTable;
pub use handle::{AllocError, Handle};
pub use local::{FrameError, LocalFrames, MIN_LOCAL_CAPACITY};
