use crate::config::DiscoverySettings;
use crate::core::clock::Clock;
use crate::core::events::{EngineEvent, EventBus};
use crate::core::filters::UnknownDistance;
use crate::core::locks::PairLocks;
use crate::core::match_builder::{MatchBuilder, MatchCreation};
use crate::core::matcher::Matcher;
use crate::core::selector::{CandidateSelector, DiscoveryBatch, SelectorSettings};
use crate::core::swipe::{SwipeOutcome, SwipeProcessor};
use crate::core::sync::{RemoteSync, SyncReport};
use crate::error::EngineResult;
use crate::models::{GeoPoint, Match, Preferences};
use crate::services::{
    BlockSource, LocalStore, MatchAuthority, ProfileSource, SessionCache, SessionStats,
    SwipeAuthority,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// The remote side of the engine
#[derive(Clone)]
pub struct Collaborators {
    pub profiles: Arc<dyn ProfileSource>,
    pub swipes: Arc<dyn SwipeAuthority>,
    pub matches: Arc<dyn MatchAuthority>,
    pub blocks: Arc<dyn BlockSource>,
}

impl Collaborators {
    /// One client serving every role, e.g. `AppwriteClient`
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: ProfileSource + SwipeAuthority + MatchAuthority + BlockSource + 'static,
    {
        Self {
            profiles: client.clone(),
            swipes: client.clone(),
            matches: client.clone(),
            blocks: client,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub selector: SelectorSettings,
    pub swipe_retention: chrono::Duration,
    pub unknown_distance: UnknownDistance,
    pub session_idle_secs: u64,
    pub max_sessions: u64,
    pub event_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&DiscoverySettings::default())
    }
}

impl From<&DiscoverySettings> for EngineSettings {
    fn from(discovery: &DiscoverySettings) -> Self {
        Self {
            selector: SelectorSettings {
                profile_ttl: chrono::Duration::seconds(discovery.profile_ttl_secs as i64),
                remote_timeout: Duration::from_millis(discovery.remote_timeout_ms),
                max_limit: discovery.max_limit,
                fetch_multiplier: discovery.fetch_multiplier,
                max_fetch_pages: discovery.max_fetch_pages,
            },
            swipe_retention: chrono::Duration::seconds(discovery.swipe_retention_secs as i64),
            unknown_distance: discovery.unknown_distance,
            session_idle_secs: discovery.session_idle_secs,
            max_sessions: discovery.max_sessions,
            event_capacity: discovery.event_capacity,
        }
    }
}

/// Rows removed by one purge pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub profiles: u64,
    pub swipes: u64,
}

/// Discovery & matching engine
///
/// Wires the selector, swipe processor and match builder around one local
/// store. Cheap to clone; every clone shares the same store, locks, sessions
/// and event bus.
#[derive(Clone)]
pub struct Engine {
    selector: CandidateSelector,
    swipes: SwipeProcessor,
    builder: MatchBuilder,
    sync: RemoteSync,
    store: Arc<dyn LocalStore>,
    sessions: SessionCache,
    events: EventBus,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        store: Arc<dyn LocalStore>,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let timeout = settings.selector.remote_timeout;
        let events = EventBus::new(settings.event_capacity);
        let sessions = SessionCache::new(settings.max_sessions, settings.session_idle_secs);

        let sync = RemoteSync::new(
            store.clone(),
            collaborators.swipes.clone(),
            collaborators.matches.clone(),
            timeout,
        );
        let builder = MatchBuilder::new(store.clone(), sync.clone(), clock.clone());
        let swipes = SwipeProcessor::new(
            store.clone(),
            collaborators.swipes.clone(),
            sync.clone(),
            builder.clone(),
            Arc::new(PairLocks::new()),
            events.clone(),
            clock.clone(),
            timeout,
        );
        let selector = CandidateSelector::new(
            store.clone(),
            collaborators.profiles.clone(),
            collaborators.blocks.clone(),
            sessions.clone(),
            Matcher::new(settings.unknown_distance),
            clock.clone(),
            settings.selector.clone(),
        );

        Self {
            selector,
            swipes,
            builder,
            sync,
            store,
            sessions,
            events,
            clock,
            settings,
        }
    }

    pub async fn next_batch(
        &self,
        user_id: &str,
        preferences: &Preferences,
        location: Option<GeoPoint>,
        exclude: &HashSet<String>,
        limit: usize,
    ) -> EngineResult<DiscoveryBatch> {
        self.selector
            .next_batch(user_id, preferences, location, exclude, limit)
            .await
    }

    pub async fn reset_session(&self, user_id: &str) {
        self.selector.reset_session(user_id).await;
    }

    pub async fn record_swipe(
        &self,
        actor_id: &str,
        target_id: &str,
        liking: bool,
        super_like: bool,
    ) -> EngineResult<SwipeOutcome> {
        self.swipes
            .record_swipe(actor_id, target_id, liking, super_like)
            .await
    }

    pub async fn get_or_create(&self, user_a: &str, user_b: &str) -> EngineResult<MatchCreation> {
        self.builder.get_or_create(user_a, user_b).await
    }

    pub async fn get_match(&self, user_a: &str, user_b: &str) -> EngineResult<Option<Match>> {
        self.builder.get(user_a, user_b).await
    }

    /// Drop expired profile snapshots and old synced swipes
    pub async fn purge_expired(&self) -> EngineResult<PurgeReport> {
        let now = self.clock.now();
        let profiles = self
            .store
            .purge_profiles_before(now - self.settings.selector.profile_ttl)
            .await?;
        let swipes = self
            .store
            .purge_swipes_before(now - self.settings.swipe_retention)
            .await?;

        tracing::info!("Purged {} profiles and {} swipes", profiles, swipes);
        Ok(PurgeReport { profiles, swipes })
    }

    pub async fn sync_pending(&self, batch: usize) -> EngineResult<SyncReport> {
        self.sync.sync_pending(batch).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub async fn health_check(&self) -> bool {
        match self.store.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!("Local store health check failed: {}", e);
                false
            }
        }
    }

    pub fn session_stats(&self) -> SessionStats {
        self.sessions.stats()
    }
}
