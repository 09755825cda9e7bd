//! Native buffer registry.
//!
//! Every raw pointer handed to native code (array elements, string chars,
//! critical regions) is a block allocated here, and every release must hand
//! the same address back exactly once. The registry is shared by all native
//! threads.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::collections::{HashMap, HashSet};
use std::ptr::{self, NonNull};

use core_types::ContractViolation;
use parking_lot::Mutex;

use crate::handle::AllocError;

const BLOCK_ALIGN: usize = 8;

/// Released addresses remembered for double-release detection.
const RELEASED_HISTORY: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Block {
    len: usize,
    layout: Layout,
}

#[derive(Default)]
struct State {
    blocks: HashMap<usize, Block>,
    released: HashSet<usize>,
    in_use: usize,
}

/// Tracks host memory blocks surfaced to native code.
///
/// # Examples
///
/// ```
/// use memory_manager::NativeBufferRegistry;
///
/// let registry = NativeBufferRegistry::new(1 << 20);
/// let block = registry.allocate_from(&[1, 2, 3]).unwrap();
/// assert_eq!(registry.contents(block.as_ptr() as usize).unwrap(), vec![1, 2, 3]);
/// assert_eq!(registry.release(block.as_ptr() as usize).unwrap(), 3);
/// assert!(registry.release(block.as_ptr() as usize).is_err());
/// ```
pub struct NativeBufferRegistry {
    state: Mutex<State>,
    limit: usize,
}

impl NativeBufferRegistry {
    /// Creates a registry that hands out at most `limit` bytes at a time.
    pub fn new(limit: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            limit,
        }
    }

    /// Allocates a zeroed block of `len` bytes.
    ///
    /// Zero-length requests still produce a unique, releasable address.
    pub fn allocate(&self, len: usize) -> Result<NonNull<u8>, AllocError> {
        let mut state = self.state.lock();
        if state.in_use.saturating_add(len) > self.limit {
            return Err(AllocError::BufferLimit {
                requested: len,
                in_use: state.in_use,
                limit: self.limit,
            });
        }
        let layout = Layout::from_size_align(len.max(1), BLOCK_ALIGN).map_err(|_| AllocError::OutOfMemory(len))?;
        // SAFETY: layout has a non-zero size
        let ptr = NonNull::new(unsafe { alloc_zeroed(layout) }).ok_or(AllocError::OutOfMemory(len))?;
        let addr = ptr.as_ptr() as usize;
        state.released.remove(&addr);
        state.blocks.insert(addr, Block { len, layout });
        state.in_use += len;
        log::trace!("native buffer {addr:#x} ({len} bytes)");
        Ok(ptr)
    }

    /// Allocates a block holding a copy of `bytes`.
    pub fn allocate_from(&self, bytes: &[u8]) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.allocate(bytes.len())?;
        // SAFETY: the block was just allocated with at least bytes.len() bytes
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len()) };
        Ok(ptr)
    }

    /// Length of the block at `addr`, if it is live.
    pub fn len_of(&self, addr: usize) -> Option<usize> {
        self.state.lock().blocks.get(&addr).map(|b| b.len)
    }

    /// Copies the current contents of the block at `addr`.
    pub fn contents(&self, addr: usize) -> Result<Vec<u8>, ContractViolation> {
        let state = self.state.lock();
        let block = state.blocks.get(&addr).ok_or_else(|| unknown(&state, addr))?;
        let mut out = vec![0u8; block.len];
        // SAFETY: addr is a live block of block.len bytes owned by this registry
        unsafe { ptr::copy_nonoverlapping(addr as *const u8, out.as_mut_ptr(), block.len) };
        Ok(out)
    }

    /// Releases the block at `addr`, returning its length.
    ///
    /// Releasing an address twice, or one never handed out, is a contract
    /// violation.
    pub fn release(&self, addr: usize) -> Result<usize, ContractViolation> {
        let mut state = self.state.lock();
        let Some(block) = state.blocks.remove(&addr) else {
            return Err(unknown(&state, addr));
        };
        state.in_use -= block.len;
        if state.released.len() >= RELEASED_HISTORY {
            state.released.clear();
        }
        state.released.insert(addr);
        drop(state);
        // SAFETY: the block was allocated by allocate() with this layout and
        // has just been removed from the registry
        unsafe { dealloc(addr as *mut u8, block.layout) };
        log::trace!("released native buffer {addr:#x}");
        Ok(block.len)
    }

    /// Number of blocks currently handed out.
    pub fn live_blocks(&self) -> usize {
        self.state.lock().blocks.len()
    }

    /// Bytes currently handed out.
    pub fn bytes_in_use(&self) -> usize {
        self.state.lock().in_use
    }
}

fn unknown(state: &State, addr: usize) -> ContractViolation {
    if state.released.contains(&addr) {
        ContractViolation::DoubleRelease(addr)
    } else {
        ContractViolation::UnknownBuffer(addr)
    }
}

impl Default for NativeBufferRegistry {
    fn default() -> Self {
        Self::new(256 << 20)
    }
}

impl Drop for NativeBufferRegistry {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.blocks.is_empty() {
            log::debug!("freeing {} unreleased native buffers", state.blocks.len());
        }
        for (addr, block) in state.blocks.drain() {
            // SAFETY: every block in the map was allocated with its layout
            unsafe { dealloc(addr as *mut u8, block.layout) };
        }
    }
}
