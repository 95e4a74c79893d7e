//! Per-tree locking for structural mutations
//!
//! Reads work on immutable forest snapshots and need no lock. Mutations take
//! the write lock of their tree, re-read the forest, re-validate and only then
//! apply, so two structural edits of the same tree never interleave within a
//! process. The two trees lock independently.

use crate::types::TreeKind;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Lock manager handing out one read-write lock per tree kind
pub struct TreeLockManager {
    locks: HashMap<TreeKind, Arc<RwLock<()>>>,
}

impl TreeLockManager {
    pub fn new() -> Self {
        let locks = TreeKind::ALL
            .iter()
            .map(|kind| (*kind, Arc::new(RwLock::new(()))))
            .collect();
        Self { locks }
    }

    /// Get the lock for a tree
    pub fn get_lock(&self, kind: TreeKind) -> Arc<RwLock<()>> {
        self.locks
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::new(RwLock::new(())))
    }
}

impl Default for TreeLockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_write_excludes_other_writes() {
        let manager = Arc::new(TreeLockManager::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..5 {
            let manager = manager.clone();
            let counter = counter.clone();
            handles.push(thread::spawn(move || {
                let lock = manager.get_lock(TreeKind::Organigram);
                let _guard = lock.write();
                let current = counter.load(Ordering::SeqCst);
                thread::yield_now();
                counter.store(current + 1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // No lost updates
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_trees_lock_independently() {
        let manager = TreeLockManager::new();
        let category = manager.get_lock(TreeKind::Category);
        let organigram = manager.get_lock(TreeKind::Organigram);
        let _held = category.write();
        assert!(organigram.try_write().is_some());
        assert!(manager.get_lock(TreeKind::Category).try_write().is_none());
    }
}
