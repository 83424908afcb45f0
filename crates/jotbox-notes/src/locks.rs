//! In-process per-key locks for coordinator operations.
//!
//! One async mutex per key, created on first use and dropped once nobody
//! holds or waits for it. Keys come in two kinds: a note id and an
//! (owner, filename) name. Callers take the note key first and name keys
//! last, several name keys in ascending filename order, which keeps the
//! acquisition order acyclic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jotbox_core::{Error, NoteId, Result};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Note(NoteId),
    Name { owner: String, filename: String },
}

/// Held lock on one key; released on drop.
pub struct NoteLockGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Registry of per-key exclusive locks.
#[derive(Default)]
pub struct NoteLocks {
    locks: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl NoteLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock a note by id.
    pub async fn lock_note(&self, id: NoteId) -> Result<NoteLockGuard> {
        self.acquire(LockKey::Note(id)).await
    }

    /// Lock an (owner, filename) name.
    pub async fn lock_name(&self, owner: &str, filename: &str) -> Result<NoteLockGuard> {
        self.acquire(LockKey::Name {
            owner: owner.to_string(),
            filename: filename.to_string(),
        })
        .await
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    async fn acquire(&self, key: LockKey) -> Result<NoteLockGuard> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| Error::Internal("note lock registry poisoned".into()))?;
            // Entries only referenced by the map are idle
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        Ok(NoteLockGuard {
            _guard: lock.lock_owned().await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(NoteLocks::new());
        let id = Uuid::now_v7();

        let guard = locks.lock_note(id).await.unwrap();

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.lock_note(id).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = NoteLocks::new();
        let _a = locks.lock_name("alice", "todo").await.unwrap();
        let _b = locks.lock_name("alice", "done").await.unwrap();
        let _c = locks.lock_name("bob", "todo").await.unwrap();
        let _d = locks.lock_note(Uuid::now_v7()).await.unwrap();
        assert_eq!(locks.tracked_keys(), 4);
    }

    #[tokio::test]
    async fn test_idle_keys_are_pruned() {
        let locks = NoteLocks::new();
        for i in 0..10 {
            let _guard = locks.lock_name("alice", &format!("note-{}", i)).await.unwrap();
        }
        let _held = locks.lock_note(Uuid::now_v7()).await.unwrap();
        assert_eq!(locks.tracked_keys(), 1);
    }
}
