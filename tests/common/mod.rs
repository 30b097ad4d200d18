// Shared fixtures for the engine tests: in-memory fakes of the remote
// collaborators, a store whose writes can be made to fail, and a harness
// wiring them into an Engine driven by a manual clock.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use lume_discovery::core::{Collaborators, Engine, EngineSettings, ManualClock};
use lume_discovery::models::{
    CachedProfile, Gender, GeoPoint, Location, Match, Preferences, Profile, ProfileFilter,
    ProfilePage, SwipeRecord,
};
use lume_discovery::services::{
    BlockSource, LocalStore, MatchAuthority, MatchInsert, MemoryStore, ProfileSource,
    RemoteError, StoreError, SwipeAuthority,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const NYC: GeoPoint = GeoPoint {
    latitude: 40.7128,
    longitude: -74.0060,
};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn profile(id: &str, age: u8, gender: Gender, lat: f64, lon: f64) -> Profile {
    Profile {
        user_id: id.to_string(),
        name: format!("User {}", id),
        age: Some(age),
        bio: None,
        gender,
        interests: Default::default(),
        photos: vec![format!("{}.jpg", id)],
        location: Some(Location {
            latitude: lat,
            longitude: lon,
            city: None,
            country: None,
        }),
        last_active: Some(start_time()),
        is_online: false,
    }
}

/// Female, 25, standing in Manhattan
pub fn nearby(id: &str) -> Profile {
    profile(id, 25, Gender::Female, 40.72, -74.01)
}

pub fn any_adult(max_distance_km: f64) -> Preferences {
    Preferences {
        genders: Gender::ALL.into_iter().collect(),
        min_age: 18,
        max_age: 99,
        max_distance_km,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Ok,
    Fail,
    Hang,
}

async fn apply(mode: Mode) -> Result<(), RemoteError> {
    match mode {
        Mode::Ok => Ok(()),
        Mode::Fail => Err(RemoteError::ApiError("injected failure".to_string())),
        Mode::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct FakeProfiles {
    profiles: Mutex<Vec<Profile>>,
    mode: Mutex<Option<Mode>>,
    pub calls: AtomicUsize,
    pub last_filter: Mutex<Option<ProfileFilter>>,
}

impl FakeProfiles {
    pub fn set(&self, profiles: Vec<Profile>) {
        *self.profiles.lock().unwrap() = profiles;
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = Some(mode);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileSource for FakeProfiles {
    async fn fetch_profiles(&self, filter: &ProfileFilter) -> Result<ProfilePage, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().unwrap() = Some(filter.clone());
        let mode = self.mode.lock().unwrap().unwrap_or(Mode::Ok);
        apply(mode).await?;

        // Like the directory: the viewer is filtered server-side, the page is
        // cut, and only then are excluded ids dropped
        let directory: Vec<Profile> = self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id != filter.viewer_id)
            .cloned()
            .collect();
        let has_more = directory.len() > filter.offset + filter.limit;

        let excluded: HashSet<&String> = filter.exclude_user_ids.iter().collect();
        let profiles = directory
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .filter(|p| !excluded.contains(&p.user_id))
            .collect();

        Ok(ProfilePage { profiles, has_more })
    }
}

#[derive(Default)]
pub struct FakeSwipes {
    pub records: Mutex<HashMap<(String, String), SwipeRecord>>,
    pub fail: AtomicBool,
}

impl FakeSwipes {
    pub fn insert(&self, record: SwipeRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((record.actor_id.clone(), record.target_id.clone()), record);
    }

    pub fn get(&self, actor: &str, target: &str) -> Option<SwipeRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(actor.to_string(), target.to_string()))
            .cloned()
    }
}

#[async_trait]
impl SwipeAuthority for FakeSwipes {
    async fn fetch_reciprocal_swipe(
        &self,
        target_id: &str,
        actor_id: &str,
    ) -> Result<Option<SwipeRecord>, RemoteError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::ApiError("swipes down".to_string()));
        }
        Ok(self.get(target_id, actor_id))
    }

    async fn persist_swipe(&self, record: &SwipeRecord) -> Result<(), RemoteError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::ApiError("swipes down".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        let key = (record.actor_id.clone(), record.target_id.clone());
        let newer = records
            .get(&key)
            .map(|existing| existing.timestamp <= record.timestamp)
            .unwrap_or(true);
        if newer {
            records.insert(key, record.clone());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMatches {
    pub stored: Mutex<HashMap<String, Match>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl MatchAuthority for FakeMatches {
    async fn persist_match(&self, m: &Match) -> Result<(), RemoteError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::ApiError("matches down".to_string()));
        }
        self.stored
            .lock()
            .unwrap()
            .entry(m.id.clone())
            .or_insert_with(|| m.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBlocks {
    pairs: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl FakeBlocks {
    pub fn block(&self, blocker: &str, blocked: &str) {
        self.pairs
            .lock()
            .unwrap()
            .push((blocker.to_string(), blocked.to_string()));
    }
}

#[async_trait]
impl BlockSource for FakeBlocks {
    async fn current_blocks(&self, user_id: &str) -> Result<HashSet<String>, RemoteError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::ApiError("blocks down".to_string()));
        }
        Ok(self
            .pairs
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(blocker, blocked)| {
                if blocker == user_id {
                    Some(blocked.clone())
                } else if blocked == user_id {
                    Some(blocker.clone())
                } else {
                    None
                }
            })
            .collect())
    }
}

/// MemoryStore with switchable failures
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    /// Number of upcoming match inserts that lose a write race
    pub match_conflicts: AtomicUsize,
}

impl FlakyStore {
    fn write_guard(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn read_guard(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for FlakyStore {
    async fn upsert_profiles(
        &self,
        profiles: &[Profile],
        cached_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.write_guard()?;
        self.inner.upsert_profiles(profiles, cached_at).await
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<CachedProfile>, StoreError> {
        self.read_guard()?;
        self.inner.get_profile(user_id).await
    }

    async fn fresh_profiles(
        &self,
        not_before: DateTime<Utc>,
    ) -> Result<Vec<CachedProfile>, StoreError> {
        self.read_guard()?;
        self.inner.fresh_profiles(not_before).await
    }

    async fn mirror_swipe(&self, record: &SwipeRecord) -> Result<bool, StoreError> {
        self.write_guard()?;
        self.inner.mirror_swipe(record).await
    }

    async fn get_swipe(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<SwipeRecord>, StoreError> {
        self.read_guard()?;
        self.inner.get_swipe(actor_id, target_id).await
    }

    async fn get_swiped_targets(&self, user_id: &str) -> Result<HashSet<String>, StoreError> {
        self.read_guard()?;
        self.inner.get_swiped_targets(user_id).await
    }

    async fn pending_swipes(&self, limit: usize) -> Result<Vec<SwipeRecord>, StoreError> {
        self.inner.pending_swipes(limit).await
    }

    async fn mark_swipe_synced(&self, record: &SwipeRecord) -> Result<(), StoreError> {
        self.inner.mark_swipe_synced(record).await
    }

    async fn insert_match_if_absent(&self, m: &Match) -> Result<MatchInsert, StoreError> {
        self.write_guard()?;
        let conflicted = self
            .match_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflicted {
            return Err(StoreError::Conflict(m.id.clone()));
        }
        self.inner.insert_match_if_absent(m).await
    }

    async fn get_match(&self, match_id: &str) -> Result<Option<Match>, StoreError> {
        self.read_guard()?;
        self.inner.get_match(match_id).await
    }

    async fn pending_matches(&self, limit: usize) -> Result<Vec<Match>, StoreError> {
        self.inner.pending_matches(limit).await
    }

    async fn mark_match_synced(&self, match_id: &str) -> Result<(), StoreError> {
        self.inner.mark_match_synced(match_id).await
    }

    async fn save_blocks(
        &self,
        user_id: &str,
        blocked: &HashSet<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.write_guard()?;
        self.inner.save_blocks(user_id, blocked, at).await
    }

    async fn get_blocks(&self, user_id: &str) -> Result<HashSet<String>, StoreError> {
        self.inner.get_blocks(user_id).await
    }

    async fn purge_profiles_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        self.inner.purge_profiles_before(cutoff).await
    }

    async fn purge_swipes_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        self.inner.purge_swipes_before(cutoff).await
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        self.read_guard()?;
        self.inner.health_check().await
    }
}

pub struct Harness {
    pub engine: Engine,
    pub store: Arc<FlakyStore>,
    pub clock: Arc<ManualClock>,
    pub profiles: Arc<FakeProfiles>,
    pub swipes: Arc<FakeSwipes>,
    pub matches: Arc<FakeMatches>,
    pub blocks: Arc<FakeBlocks>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(mut settings: EngineSettings) -> Self {
        settings.selector.remote_timeout = Duration::from_millis(50);

        let store = Arc::new(FlakyStore::default());
        let clock = Arc::new(ManualClock::new(start_time()));
        let profiles = Arc::new(FakeProfiles::default());
        let swipes = Arc::new(FakeSwipes::default());
        let matches = Arc::new(FakeMatches::default());
        let blocks = Arc::new(FakeBlocks::default());

        let collaborators = Collaborators {
            profiles: profiles.clone(),
            swipes: swipes.clone(),
            matches: matches.clone(),
            blocks: blocks.clone(),
        };
        let engine = Engine::new(store.clone(), collaborators, clock.clone(), settings);

        Self {
            engine,
            store,
            clock,
            profiles,
            swipes,
            matches,
            blocks,
        }
    }

    /// Let background sync tasks run
    pub async fn settle(&self) {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }
}
