use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily created async mutex per scope key.
///
/// An entry lives while some caller holds or waits for it and is dropped with the last lease.
#[derive(Debug, Default)]
pub struct ScopeLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Exclusive access to one scope key; released on drop.
#[derive(Debug)]
pub struct ScopeLease<'a> {
    locks: &'a ScopeLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> ScopeLease<'_> {
        let guard = self.lock_for(key).lock_owned().await;
        ScopeLease {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Clones are only handed out under the map lock, so a count of one means nobody else
    // holds or awaits this mutex.
    fn release(&self, key: &str) {
        let mut locks = self.locks.lock();
        if locks
            .get(key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(key);
        }
    }
}

impl Drop for ScopeLease<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn same_key_returns_same_lock() {
        let locks = ScopeLocks::new();
        let a = locks.lock_for("sale/H25S");
        let b = locks.lock_for("sale/H25S");
        let c = locks.lock_for("sale/K25S");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn entries_are_dropped_with_the_last_lease() {
        let locks = ScopeLocks::new();
        let lease = locks.acquire("sale/H25S").await;
        assert_eq!(locks.len(), 1);
        drop(lease);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn waiting_acquirer_keeps_the_entry() {
        let locks = Arc::new(ScopeLocks::new());
        let lease = locks.acquire("ledger/L").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _lease = locks.acquire("ledger/L").await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(lease);
        assert_eq!(locks.len(), 1);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn holder_blocks_second_acquirer() {
        let locks = Arc::new(ScopeLocks::new());
        let guard = locks.acquire("ledger/L").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("ledger/L").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let locks = ScopeLocks::new();
        let _a = locks.acquire("sale/H25S").await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.acquire("sale/K25S"))
            .await
            .unwrap();
    }
}
