use crate::models::canonical_pair_id;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Dead entries are swept once the table grows past this
const PRUNE_THRESHOLD: usize = 1024;

/// In-process locks keyed by the unordered pair of users
///
/// `lock("a", "b")` and `lock("b", "a")` contend on the same mutex. Entries are
/// held weakly: a lock exists only while someone holds or waits on it.
#[derive(Debug, Default)]
pub struct PairLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, a: &str, b: &str) -> OwnedMutexGuard<()> {
        let key = canonical_pair_id(a, b);
        let mutex = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };

            match locks.get(&key).and_then(Weak::upgrade) {
                Some(mutex) => mutex,
                None => {
                    let mutex = Arc::new(AsyncMutex::new(()));
                    locks.insert(key, Arc::downgrade(&mutex));
                    if locks.len() > PRUNE_THRESHOLD {
                        locks.retain(|_, weak| weak.strong_count() > 0);
                    }
                    mutex
                }
            }
        };

        mutex.lock_owned().await
    }

    /// Number of pairs currently locked or awaited
    pub fn active(&self) -> usize {
        match self.locks.lock() {
            Ok(locks) => locks.values().filter(|weak| weak.strong_count() > 0).count(),
            Err(poisoned) => poisoned
                .into_inner()
                .values()
                .filter(|weak| weak.strong_count() > 0)
                .count(),
        }
    }
}
