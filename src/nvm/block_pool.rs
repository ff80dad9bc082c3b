#![allow(unsafe_code)]

use core::{
    marker::PhantomData,
    ptr::NonNull,
    sync::atomic::{AtomicU32, Ordering},
};

use crate::nvm::Error;

const BITS_PER_WORD: usize = u32::BITS as usize;

/// Index of the first block of an acquired run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub(crate) u16);

impl BlockId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Number of `AtomicU32` lock words needed for `n_blocks` blocks.
pub const fn lock_words(n_blocks: usize) -> usize {
    n_blocks.div_ceil(BITS_PER_WORD)
}

/// Pool of fixed-size blocks handed out in contiguous runs.
///
/// Each block is guarded by one lock bit. Locking a bit is a single atomic
/// test-and-set, so `acquire` and `release` may be called from interrupt
/// context without any wider exclusion. The run logic only relies on the
/// atomicity of each individual bit.
pub struct BlockPool<'a> {
    memory: NonNull<u8>,
    locks: &'a [AtomicU32],
    n_blocks: usize,
    block_size: usize,
    _memory: PhantomData<&'a mut [u8]>,
}

// SAFETY: block memory is only reachable through ids whose lock bit the
// caller holds; the lock bits themselves are atomics.
unsafe impl Send for BlockPool<'_> {}
unsafe impl Sync for BlockPool<'_> {}

impl<'a> BlockPool<'a> {
    /// Partitions `memory` into `n_blocks` blocks of `block_size` bytes.
    ///
    /// `locks` must provide one bit per block, see [`lock_words`]. Existing
    /// lock bits are cleared.
    pub fn new(
        memory: &'a mut [u8],
        locks: &'a [AtomicU32],
        n_blocks: usize,
        block_size: usize,
    ) -> Result<Self, Error> {
        if n_blocks == 0 || block_size == 0 || n_blocks > u16::MAX as usize {
            return Err(Error::InvalidParameter);
        }
        let needed = n_blocks
            .checked_mul(block_size)
            .ok_or(Error::InvalidParameter)?;
        if memory.len() < needed || locks.len() < lock_words(n_blocks) {
            return Err(Error::InvalidParameter);
        }

        for word in locks {
            word.store(0, Ordering::Relaxed);
        }

        Ok(Self {
            memory: NonNull::from(memory).cast(),
            locks,
            n_blocks,
            block_size,
            _memory: PhantomData,
        })
    }

    pub fn block_count(&self) -> usize {
        self.n_blocks
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn bit(&self, index: usize) -> (&AtomicU32, u32) {
        (
            &self.locks[index / BITS_PER_WORD],
            1 << (index % BITS_PER_WORD),
        )
    }

    /// Returns true if this call flipped the bit from free to held.
    fn try_lock(&self, index: usize) -> bool {
        let (word, mask) = self.bit(index);
        word.fetch_or(mask, Ordering::AcqRel) & mask == 0
    }

    fn unlock(&self, index: usize) {
        let (word, mask) = self.bit(index);
        word.fetch_and(!mask, Ordering::Release);
    }

    fn is_held(&self, index: usize) -> bool {
        let (word, mask) = self.bit(index);
        word.load(Ordering::Acquire) & mask != 0
    }

    /// Locks the first run of `n` consecutive free blocks.
    ///
    /// Returns `None` if no such run exists. Blocks locked while building a
    /// run that fails to reach `n` are released before the scan moves on.
    pub fn acquire(&self, n: usize) -> Option<BlockId> {
        if n == 0 || n > self.n_blocks {
            return None;
        }

        let mut first: Option<usize> = None;
        for i in 0..self.n_blocks {
            if self.try_lock(i) {
                let start = *first.get_or_insert(i);
                if i - start + 1 == n {
                    return Some(BlockId(start as u16));
                }
            } else if let Some(start) = first.take() {
                for j in start..i {
                    self.unlock(j);
                }
            }
        }

        // Scan ran out with a partial run still held.
        if let Some(start) = first {
            for j in start..self.n_blocks {
                self.unlock(j);
            }
        }
        None
    }

    /// Clears the lock bit of `id`. Free or out-of-range ids are ignored.
    pub fn release(&self, id: BlockId) {
        let index = id.index();
        if index < self.n_blocks && self.is_held(index) {
            self.unlock(index);
        }
    }

    /// Releases `n` blocks starting at `id`, stopping at the end of the pool.
    pub fn release_run(&self, id: BlockId, n: usize) {
        let end = id.index().saturating_add(n).min(self.n_blocks);
        for index in id.index()..end {
            self.release(BlockId(index as u16));
        }
    }

    pub fn is_locked(&self, id: BlockId) -> bool {
        id.index() < self.n_blocks && self.is_held(id.index())
    }

    /// Address of block `id` if it is currently held.
    pub fn pointer_for(&self, id: BlockId) -> Option<NonNull<u8>> {
        if !self.is_locked(id) {
            return None;
        }
        // SAFETY: index < n_blocks, so the offset stays inside `memory`.
        Some(unsafe { self.memory.add(id.index() * self.block_size) })
    }

    /// Mutable view of `len` bytes starting at block `id`.
    ///
    /// # Safety
    /// The caller must own the run covering `len` bytes from `id` (it came
    /// from `acquire` and has not been released) and must not create a
    /// second live view of the same blocks.
    pub(crate) unsafe fn bytes_mut(&self, id: BlockId, len: usize) -> Option<&mut [u8]> {
        let blocks = len.div_ceil(self.block_size);
        if id.index() + blocks > self.n_blocks {
            return None;
        }
        let ptr = self.pointer_for(id)?;
        // SAFETY: range checked above; exclusivity is the caller's contract.
        Some(unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), len) })
    }

    /// Shared view of `len` bytes starting at block `id`.
    ///
    /// # Safety
    /// Same contract as [`Self::bytes_mut`], with no live mutable view.
    pub(crate) unsafe fn bytes(&self, id: BlockId, len: usize) -> Option<&[u8]> {
        let blocks = len.div_ceil(self.block_size);
        if id.index() + blocks > self.n_blocks {
            return None;
        }
        let ptr = self.pointer_for(id)?;
        // SAFETY: see `bytes_mut`.
        Some(unsafe { core::slice::from_raw_parts(ptr.as_ptr(), len) })
    }
}
