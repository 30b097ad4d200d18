use crate::core::clock::Clock;
use crate::core::sync::RemoteSync;
use crate::error::{EngineError, EngineResult};
use crate::models::{canonical_pair_id, Match};
use crate::services::{LocalStore, MatchInsert};
use std::sync::Arc;

/// Result of `get_or_create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCreation {
    pub m: Match,
    /// False when the match already existed
    pub created: bool,
}

/// Canonicalizes and persists matches
///
/// The storage-level conditional insert is what makes creation happen once;
/// in-process pair locks upstream only reduce how often it is contended.
#[derive(Clone)]
pub struct MatchBuilder {
    store: Arc<dyn LocalStore>,
    sync: RemoteSync,
    clock: Arc<dyn Clock>,
}

impl MatchBuilder {
    pub fn new(store: Arc<dyn LocalStore>, sync: RemoteSync, clock: Arc<dyn Clock>) -> Self {
        Self { store, sync, clock }
    }

    pub async fn get_or_create(&self, user_a: &str, user_b: &str) -> EngineResult<MatchCreation> {
        validate_pair(user_a, user_b)?;

        let candidate = Match::new(user_a, user_b, self.clock.now());

        match self.store.insert_match_if_absent(&candidate).await? {
            MatchInsert::Created(m) => {
                tracing::info!("Created match {}", m.id);
                self.sync.spawn_match(m.clone());
                Ok(MatchCreation { m, created: true })
            }
            MatchInsert::Existing(m) => {
                tracing::debug!("Match {} already exists", m.id);
                Ok(MatchCreation { m, created: false })
            }
        }
    }

    /// Look up a match without creating it
    pub async fn get(&self, user_a: &str, user_b: &str) -> EngineResult<Option<Match>> {
        validate_pair(user_a, user_b)?;
        Ok(self.store.get_match(&canonical_pair_id(user_a, user_b)).await?)
    }
}

fn validate_pair(user_a: &str, user_b: &str) -> EngineResult<()> {
    if user_a.is_empty() || user_b.is_empty() {
        return Err(EngineError::invalid("user ids must not be empty"));
    }
    if user_a == user_b {
        return Err(EngineError::invalid("a user cannot match with themselves"));
    }
    Ok(())
}
