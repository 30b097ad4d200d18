use crate::models::{CachedProfile, Match, Profile, SwipeRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur with local store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Write conflict: {0}")]
    Conflict(String),
}

/// Outcome of a conditional match insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchInsert {
    Created(Match),
    Existing(Match),
}

/// Durable cache of profiles, swipe mirror, matches and block snapshots
///
/// Every purge runs as one atomic step so a concurrent reader observes either
/// the table before the purge or after it, never a half-deleted state.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn upsert_profiles(
        &self,
        profiles: &[Profile],
        cached_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<CachedProfile>, StoreError>;

    /// Cached profiles with `cached_at >= not_before`
    async fn fresh_profiles(
        &self,
        not_before: DateTime<Utc>,
    ) -> Result<Vec<CachedProfile>, StoreError>;

    /// Upserts the swipe unless a newer record for the pair is already stored.
    /// Returns whether the stored row changed.
    async fn mirror_swipe(&self, record: &SwipeRecord) -> Result<bool, StoreError>;

    async fn get_swipe(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<SwipeRecord>, StoreError>;

    /// Everyone `user_id` swiped on, synced or not
    async fn get_swiped_targets(&self, user_id: &str) -> Result<HashSet<String>, StoreError>;

    async fn pending_swipes(&self, limit: usize) -> Result<Vec<SwipeRecord>, StoreError>;

    /// Flags the row synced only if it still holds this record's timestamp
    async fn mark_swipe_synced(&self, record: &SwipeRecord) -> Result<(), StoreError>;

    async fn insert_match_if_absent(&self, m: &Match) -> Result<MatchInsert, StoreError>;

    async fn get_match(&self, match_id: &str) -> Result<Option<Match>, StoreError>;

    async fn pending_matches(&self, limit: usize) -> Result<Vec<Match>, StoreError>;

    async fn mark_match_synced(&self, match_id: &str) -> Result<(), StoreError>;

    async fn save_blocks(
        &self,
        user_id: &str,
        blocked: &HashSet<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn get_blocks(&self, user_id: &str) -> Result<HashSet<String>, StoreError>;

    /// Removes profiles cached before `cutoff`
    async fn purge_profiles_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Removes synced swipes older than `cutoff`; unsynced rows are kept
    async fn purge_swipes_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone)]
struct MirroredSwipe {
    record: SwipeRecord,
    synced: bool,
}

#[derive(Debug, Clone)]
struct StoredMatch {
    m: Match,
    synced: bool,
}

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<String, CachedProfile>,
    swipes: HashMap<(String, String), MirroredSwipe>,
    matches: HashMap<String, StoredMatch>,
    blocks: HashMap<String, HashSet<String>>,
}

/// In-process store behind a single `RwLock`
///
/// Used by tests and when no database is configured. Reads clone out of a
/// read guard, purges run under the write guard, so they never interleave.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn upsert_profiles(
        &self,
        profiles: &[Profile],
        cached_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        for profile in profiles {
            tables.profiles.insert(
                profile.user_id.clone(),
                CachedProfile {
                    profile: profile.clone(),
                    cached_at,
                },
            );
        }
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<CachedProfile>, StoreError> {
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }

    async fn fresh_profiles(
        &self,
        not_before: DateTime<Utc>,
    ) -> Result<Vec<CachedProfile>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .values()
            .filter(|entry| entry.cached_at >= not_before)
            .cloned()
            .collect())
    }

    async fn mirror_swipe(&self, record: &SwipeRecord) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (record.actor_id.clone(), record.target_id.clone());

        if let Some(existing) = tables.swipes.get(&key) {
            if existing.record.timestamp > record.timestamp {
                return Ok(false);
            }
            if existing.record == *record {
                return Ok(false);
            }
        }

        tables.swipes.insert(
            key,
            MirroredSwipe {
                record: record.clone(),
                synced: false,
            },
        );
        Ok(true)
    }

    async fn get_swipe(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<SwipeRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .swipes
            .get(&(actor_id.to_string(), target_id.to_string()))
            .map(|row| row.record.clone()))
    }

    async fn get_swiped_targets(&self, user_id: &str) -> Result<HashSet<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .swipes
            .keys()
            .filter(|(actor, _)| actor == user_id)
            .map(|(_, target)| target.clone())
            .collect())
    }

    async fn pending_swipes(&self, limit: usize) -> Result<Vec<SwipeRecord>, StoreError> {
        let tables = self.tables.read().await;
        let mut pending: Vec<SwipeRecord> = tables
            .swipes
            .values()
            .filter(|row| !row.synced)
            .map(|row| row.record.clone())
            .collect();
        pending.sort_by_key(|record| record.timestamp);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_swipe_synced(&self, record: &SwipeRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let key = (record.actor_id.clone(), record.target_id.clone());
        if let Some(row) = tables.swipes.get_mut(&key) {
            if row.record.timestamp == record.timestamp {
                row.synced = true;
            }
        }
        Ok(())
    }

    async fn insert_match_if_absent(&self, m: &Match) -> Result<MatchInsert, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.matches.get(&m.id) {
            return Ok(MatchInsert::Existing(existing.m.clone()));
        }
        tables.matches.insert(
            m.id.clone(),
            StoredMatch {
                m: m.clone(),
                synced: false,
            },
        );
        Ok(MatchInsert::Created(m.clone()))
    }

    async fn get_match(&self, match_id: &str) -> Result<Option<Match>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .matches
            .get(match_id)
            .map(|row| row.m.clone()))
    }

    async fn pending_matches(&self, limit: usize) -> Result<Vec<Match>, StoreError> {
        let tables = self.tables.read().await;
        let mut pending: Vec<Match> = tables
            .matches
            .values()
            .filter(|row| !row.synced)
            .map(|row| row.m.clone())
            .collect();
        pending.sort_by_key(|m| m.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_match_synced(&self, match_id: &str) -> Result<(), StoreError> {
        if let Some(row) = self.tables.write().await.matches.get_mut(match_id) {
            row.synced = true;
        }
        Ok(())
    }

    async fn save_blocks(
        &self,
        user_id: &str,
        blocked: &HashSet<String>,
        _at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .blocks
            .insert(user_id.to_string(), blocked.clone());
        Ok(())
    }

    async fn get_blocks(&self, user_id: &str) -> Result<HashSet<String>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .blocks
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn purge_profiles_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.profiles.len();
        tables.profiles.retain(|_, entry| entry.cached_at >= cutoff);
        Ok((before - tables.profiles.len()) as u64)
    }

    async fn purge_swipes_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.swipes.len();
        tables
            .swipes
            .retain(|_, row| !row.synced || row.record.timestamp >= cutoff);
        Ok((before - tables.swipes.len()) as u64)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
