use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::sync::rw_lock::{Access, RwMutex};

/// One reader/writer lock per allocated inode block. The table mutex
/// guards only the lookup; waiting happens on the per-inode lock after the
/// table is released.
pub struct LockTable {
    locks: Mutex<HashMap<u32, Arc<RwMutex>>>,
}

/// Holds one inode lock; unlocks on drop. Walk code moves the guard from
/// parent to child, which releases the parent only after the child lock is
/// already held.
pub struct BlockGuard {
    lock: Arc<RwMutex>,
    access: Access,
}

impl LockTable {
    pub fn new() -> LockTable {
        LockTable {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Register a lock for a freshly written inode block. Called while the
    /// parent directory's write lock is held, before the directory entry
    /// publishing the inode goes to disk.
    pub fn insert(&self, block: u32) {
        let mut locks = self.locks.lock().unwrap();
        locks.insert(block, Arc::new(RwMutex::new()));
    }

    /// Remove a dead inode's lock. Only legal after the inode has vanished
    /// from its directory and its write lock has been released; the caller
    /// still holds the parent write lock, so no walker can be blocked here.
    pub fn remove(&self, block: u32) {
        let mut locks = self.locks.lock().unwrap();
        locks.remove(&block);
    }

    pub fn acquire(&self, block: u32, access: Access) -> BlockGuard {
        let lock = {
            let locks = self.locks.lock().unwrap();
            locks
                .get(&block)
                .expect("lock table out of sync with the directory tree")
                .clone()
        };
        lock.lock(access);
        BlockGuard { lock, access }
    }

    pub fn contains(&self, block: u32) -> bool {
        self.locks.lock().unwrap().contains_key(&block)
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LockTable {
    fn default() -> Self {
        LockTable::new()
    }
}

impl Drop for BlockGuard {
    fn drop(&mut self) {
        self.lock.unlock(self.access);
    }
}
