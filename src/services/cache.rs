use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type ServedSet = Arc<Mutex<HashSet<String>>>;

/// Per-user discovery sessions
///
/// Remembers which profile ids were already served to a user so successive
/// batches never repeat, even for profiles the user has not swiped yet.
/// A session ends when it sits idle past the configured timeout or when
/// `reset` is called.
#[derive(Clone)]
pub struct SessionCache {
    sessions: Cache<String, ServedSet>,
}

impl SessionCache {
    pub fn new(max_sessions: u64, idle_secs: u64) -> Self {
        let sessions = moka::future::CacheBuilder::new(max_sessions)
            .time_to_idle(Duration::from_secs(idle_secs))
            .build();

        Self { sessions }
    }

    async fn session(&self, user_id: &str) -> ServedSet {
        self.sessions
            .get_with(user_id.to_string(), async { Arc::new(Mutex::new(HashSet::new())) })
            .await
    }

    /// Ids already served to `user_id` in the current session
    pub async fn served(&self, user_id: &str) -> HashSet<String> {
        match self.sessions.get(user_id).await {
            Some(set) => set.lock().map(|s| s.clone()).unwrap_or_default(),
            None => HashSet::new(),
        }
    }

    /// Claims up to `limit` ids, in order, that were not served before.
    /// Claiming happens under the session lock, so two concurrent batches for
    /// the same user never receive the same id.
    pub async fn claim<I>(&self, user_id: &str, ids: I, limit: usize) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let session = self.session(user_id).await;
        let mut served = match session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        ids.into_iter()
            .filter(|id| served.insert(id.clone()))
            .take(limit)
            .collect()
    }

    pub async fn reset(&self, user_id: &str) {
        self.sessions.invalidate(user_id).await;
        tracing::debug!("Reset discovery session for {}", user_id);
    }

    /// Get cache statistics
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            active_sessions: self.sessions.entry_count(),
        }
    }
}

/// Session cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub active_sessions: u64,
}
