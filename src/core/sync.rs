use crate::error::EngineResult;
use crate::models::{Match, SwipeRecord};
use crate::services::{bounded, LocalStore, MatchAuthority, RemoteError, SwipeAuthority};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Counters from one pass over the unsynced rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub swipes_synced: usize,
    pub swipes_failed: usize,
    pub matches_synced: usize,
    pub matches_failed: usize,
}

/// Pushes locally mirrored swipes and matches to the remote authorities
///
/// The local row is flagged synced only after the remote write succeeded;
/// anything that failed stays pending for the next `sync_pending` pass.
#[derive(Clone)]
pub struct RemoteSync {
    store: Arc<dyn LocalStore>,
    swipes: Arc<dyn SwipeAuthority>,
    matches: Arc<dyn MatchAuthority>,
    timeout: Duration,
}

impl RemoteSync {
    pub fn new(
        store: Arc<dyn LocalStore>,
        swipes: Arc<dyn SwipeAuthority>,
        matches: Arc<dyn MatchAuthority>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            swipes,
            matches,
            timeout,
        }
    }

    pub async fn push_swipe(&self, record: &SwipeRecord) -> Result<(), RemoteError> {
        bounded(self.timeout, self.swipes.persist_swipe(record)).await?;

        if let Err(e) = self.store.mark_swipe_synced(record).await {
            // The remote write is idempotent, so a later retry is harmless
            tracing::warn!(
                "Swipe {} -> {} synced but not flagged: {}",
                record.actor_id,
                record.target_id,
                e
            );
        }
        Ok(())
    }

    pub async fn push_match(&self, m: &Match) -> Result<(), RemoteError> {
        bounded(self.timeout, self.matches.persist_match(m)).await?;

        if let Err(e) = self.store.mark_match_synced(&m.id).await {
            tracing::warn!("Match {} synced but not flagged: {}", m.id, e);
        }
        Ok(())
    }

    /// Push a swipe in the background
    pub fn spawn_swipe(&self, record: SwipeRecord) {
        let sync = self.clone();
        tokio::spawn(async move {
            if let Err(e) = sync.push_swipe(&record).await {
                tracing::warn!(
                    "Deferred sync of swipe {} -> {}: {}",
                    record.actor_id,
                    record.target_id,
                    e
                );
            }
        });
    }

    /// Push a match in the background
    pub fn spawn_match(&self, m: Match) {
        let sync = self.clone();
        tokio::spawn(async move {
            if let Err(e) = sync.push_match(&m).await {
                tracing::warn!("Deferred sync of match {}: {}", m.id, e);
            }
        });
    }

    /// Retry every pending swipe and match, up to `batch` of each
    pub async fn sync_pending(&self, batch: usize) -> EngineResult<SyncReport> {
        let mut report = SyncReport::default();

        for record in self.store.pending_swipes(batch).await? {
            match self.push_swipe(&record).await {
                Ok(()) => report.swipes_synced += 1,
                Err(e) => {
                    report.swipes_failed += 1;
                    tracing::debug!("Swipe {} -> {} still pending: {}", record.actor_id, record.target_id, e);
                }
            }
        }

        for m in self.store.pending_matches(batch).await? {
            match self.push_match(&m).await {
                Ok(()) => report.matches_synced += 1,
                Err(e) => {
                    report.matches_failed += 1;
                    tracing::debug!("Match {} still pending: {}", m.id, e);
                }
            }
        }

        if report.swipes_failed + report.matches_failed > 0 {
            tracing::warn!("Remote sync incomplete: {:?}", report);
        } else {
            tracing::debug!("Remote sync pass: {:?}", report);
        }

        Ok(report)
    }
}
