use std::sync::Mutex;

use bit_set::BitSet;
use log::warn;

/// In-memory free-block accounting. Seeded full at mount, then every block
/// the directory tree reaches is claimed back out; from there the engine
/// allocates and releases as operations run. Never touches the disk.
pub struct FreeList {
    inner: Mutex<FreeSet>,
}

struct FreeSet {
    free: BitSet,
    remaining: usize,
}

impl FreeList {
    /// Every block in `[0, blocks)` starts out free.
    pub fn new_full(blocks: usize) -> FreeList {
        let mut free = BitSet::with_capacity(blocks);
        for block in 0..blocks {
            free.insert(block);
        }
        FreeList {
            inner: Mutex::new(FreeSet {
                free,
                remaining: blocks,
            }),
        }
    }

    /// Mark a block allocated during the mount traversal. False if the
    /// block was already claimed, which means the tree references it twice.
    pub fn claim(&self, block: u32) -> bool {
        let mut set = self.inner.lock().unwrap();
        if set.free.remove(block as usize) {
            set.remaining -= 1;
            true
        } else {
            false
        }
    }

    pub fn allocate(&self) -> Option<u32> {
        let mut set = self.inner.lock().unwrap();
        let block = set.free.iter().next()?;
        set.free.remove(block);
        set.remaining -= 1;
        Some(block as u32)
    }

    /// All-or-nothing: either `count` fresh blocks or none.
    pub fn allocate_n(&self, count: usize) -> Option<Vec<u32>> {
        let mut set = self.inner.lock().unwrap();
        if set.remaining < count {
            return None;
        }
        let blocks: Vec<u32> = set.free.iter().take(count).map(|b| b as u32).collect();
        for &block in &blocks {
            set.free.remove(block as usize);
        }
        set.remaining -= count;
        Some(blocks)
    }

    pub fn release(&self, block: u32) {
        let mut set = self.inner.lock().unwrap();
        if set.free.insert(block as usize) {
            set.remaining += 1;
        } else {
            warn!("block {} released twice", block);
        }
    }

    pub fn remaining(&self) -> usize {
        self.inner.lock().unwrap().remaining
    }

    /// Free block numbers, for diagnostics and invariant checks.
    pub fn snapshot(&self) -> Vec<u32> {
        let set = self.inner.lock().unwrap();
        set.free.iter().map(|b| b as u32).collect()
    }
}
