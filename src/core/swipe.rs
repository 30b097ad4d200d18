use crate::core::clock::Clock;
use crate::core::events::{EngineEvent, EventBus};
use crate::core::locks::PairLocks;
use crate::core::match_builder::MatchBuilder;
use crate::core::sync::RemoteSync;
use crate::error::{EngineError, EngineResult};
use crate::models::{Match, SwipeRecord};
use crate::services::{bounded, LocalStore, SwipeAuthority};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// What a swipe led to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwipeOutcome {
    pub mutual: bool,
    #[serde(rename = "match")]
    pub matched: Option<Match>,
    pub record: SwipeRecord,
}

/// Records swipes and detects mutual likes
#[derive(Clone)]
pub struct SwipeProcessor {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn SwipeAuthority>,
    sync: RemoteSync,
    builder: MatchBuilder,
    locks: Arc<PairLocks>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    remote_timeout: Duration,
}

impl SwipeProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn SwipeAuthority>,
        sync: RemoteSync,
        builder: MatchBuilder,
        locks: Arc<PairLocks>,
        events: EventBus,
        clock: Arc<dyn Clock>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            store,
            remote,
            sync,
            builder,
            locks,
            events,
            clock,
            remote_timeout,
        }
    }

    /// Record `actor_id`'s decision on `target_id`
    ///
    /// The swipe is durable in the local mirror before this returns; remote
    /// persistence happens in the background. A match is produced only while
    /// both directions are currently liking.
    pub async fn record_swipe(
        &self,
        actor_id: &str,
        target_id: &str,
        liking: bool,
        super_like: bool,
    ) -> EngineResult<SwipeOutcome> {
        if actor_id.is_empty() || target_id.is_empty() {
            return Err(EngineError::invalid("user ids must not be empty"));
        }
        if actor_id == target_id {
            return Err(EngineError::invalid("a user cannot swipe on themselves"));
        }
        if super_like && !liking {
            return Err(EngineError::invalid("a super-like must also be a like"));
        }

        // Serializes mirror -> reciprocal check -> match for this pair
        let _guard = self.locks.lock(actor_id, target_id).await;

        let record = SwipeRecord {
            actor_id: actor_id.to_string(),
            target_id: target_id.to_string(),
            liking,
            super_like,
            timestamp: self.clock.now(),
        };

        // A lost mirror write would let the profile resurface, so it is fatal
        let changed = self.store.mirror_swipe(&record).await.map_err(|e| {
            tracing::error!("Failed to mirror swipe {} -> {}: {}", actor_id, target_id, e);
            EngineError::Unavailable(format!("swipe mirror write failed: {}", e))
        })?;

        // A repeat of the stored decision is already published and queued
        if changed {
            self.events.publish(EngineEvent::SwipeRecorded(record.clone()));
            self.sync.spawn_swipe(record.clone());
        }

        tracing::debug!(
            "Recorded swipe {} -> {} (liking: {}, super: {}, changed: {})",
            actor_id,
            target_id,
            liking,
            super_like,
            changed
        );

        if !liking {
            return Ok(SwipeOutcome {
                mutual: false,
                matched: None,
                record,
            });
        }

        let reciprocal = self.reciprocal(actor_id, target_id).await?;
        if !reciprocal.map(|r| r.liking).unwrap_or(false) {
            return Ok(SwipeOutcome {
                mutual: false,
                matched: None,
                record,
            });
        }

        let creation = match self.builder.get_or_create(actor_id, target_id).await {
            Err(EngineError::Conflict(reason)) => {
                tracing::warn!("Match creation conflicted ({}), retrying once", reason);
                self.builder.get_or_create(actor_id, target_id).await?
            }
            other => other?,
        };

        if creation.created {
            tracing::info!("Mutual match {} -> {}", actor_id, target_id);
            self.events.publish(EngineEvent::MatchCreated(creation.m.clone()));
        }

        Ok(SwipeOutcome {
            mutual: true,
            matched: Some(creation.m),
            record,
        })
    }

    /// Latest swipe `target_id` made on `actor_id`, local mirror vs remote
    async fn reciprocal(&self, actor_id: &str, target_id: &str) -> EngineResult<Option<SwipeRecord>> {
        let local = self.store.get_swipe(target_id, actor_id).await?;

        let remote = match bounded(
            self.remote_timeout,
            self.remote.fetch_reciprocal_swipe(target_id, actor_id),
        )
        .await
        {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(
                    "Reciprocal lookup {} -> {} fell back to local mirror: {}",
                    target_id,
                    actor_id,
                    e
                );
                None
            }
        };

        Ok(SwipeRecord::latest(local, remote))
    }
}
