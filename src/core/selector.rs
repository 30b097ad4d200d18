use crate::core::clock::Clock;
use crate::core::distance::calculate_bounding_box;
use crate::core::filters::UnknownDistance;
use crate::core::matcher::Matcher;
use crate::error::{EngineError, EngineResult};
use crate::models::{Candidate, GeoPoint, Preferences, Profile, ProfileFilter};
use crate::services::{bounded, BlockSource, LocalStore, ProfileSource, SessionCache};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// One page of the discovery feed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiscoveryBatch {
    /// At least one profile, in feed order
    Candidates { candidates: Vec<Candidate>, stale: bool },
    /// Nobody left to show
    Empty { stale: bool },
}

impl DiscoveryBatch {
    /// Whether any part of the answer came from degraded data
    pub fn is_stale(&self) -> bool {
        match self {
            DiscoveryBatch::Candidates { stale, .. } | DiscoveryBatch::Empty { stale } => *stale,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        match self {
            DiscoveryBatch::Candidates { candidates, .. } => candidates,
            DiscoveryBatch::Empty { .. } => &[],
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.candidates()
            .iter()
            .map(|c| c.profile.user_id.clone())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SelectorSettings {
    pub profile_ttl: chrono::Duration,
    pub remote_timeout: Duration,
    pub max_limit: usize,
    /// Remote over-fetch factor, to survive local filtering
    pub fetch_multiplier: usize,
    /// Upper bound on directory pages read for one batch
    pub max_fetch_pages: usize,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            profile_ttl: chrono::Duration::minutes(30),
            remote_timeout: Duration::from_millis(2000),
            max_limit: 100,
            fetch_multiplier: 5,
            max_fetch_pages: 20,
        }
    }
}

/// Builds the discovery feed from the profile cache and the remote directory
#[derive(Clone)]
pub struct CandidateSelector {
    store: Arc<dyn LocalStore>,
    profiles: Arc<dyn ProfileSource>,
    blocks: Arc<dyn BlockSource>,
    sessions: SessionCache,
    matcher: Matcher,
    clock: Arc<dyn Clock>,
    settings: SelectorSettings,
}

impl CandidateSelector {
    pub fn new(
        store: Arc<dyn LocalStore>,
        profiles: Arc<dyn ProfileSource>,
        blocks: Arc<dyn BlockSource>,
        sessions: SessionCache,
        matcher: Matcher,
        clock: Arc<dyn Clock>,
        settings: SelectorSettings,
    ) -> Self {
        Self {
            store,
            profiles,
            blocks,
            sessions,
            matcher,
            clock,
            settings,
        }
    }

    /// Next batch of unseen candidates for `user_id`
    ///
    /// Serves from fresh cache when it can fill the batch, otherwise pages
    /// through the profile source until the batch fills or it runs dry. A failing source degrades to fresh cache with
    /// `stale` set; only a failing source with nothing fresh cached is an error.
    pub async fn next_batch(
        &self,
        user_id: &str,
        preferences: &Preferences,
        location: Option<GeoPoint>,
        exclude: &HashSet<String>,
        limit: usize,
    ) -> EngineResult<DiscoveryBatch> {
        if user_id.is_empty() {
            return Err(EngineError::invalid("user id must not be empty"));
        }
        preferences.check().map_err(EngineError::InvalidArgument)?;
        if limit == 0 {
            return Err(EngineError::invalid("limit must be positive"));
        }
        let limit = limit.min(self.settings.max_limit);

        let (excluded, blocks_stale) = self.exclusions(user_id, exclude).await?;

        let now = self.clock.now();
        let cached = self
            .store
            .fresh_profiles(now - self.settings.profile_ttl)
            .await
            .map(|entries| entries.into_iter().map(|e| e.profile).collect::<Vec<_>>());

        if let Ok(profiles) = &cached {
            let candidates = self.matcher.find_candidates(
                preferences,
                location.as_ref(),
                profiles.iter().cloned(),
                &excluded,
            );
            if candidates.len() >= limit {
                tracing::debug!("Cache hit for {}: {} candidates", user_id, candidates.len());
                return Ok(self.claim(user_id, candidates, limit, blocks_stale).await);
            }
        }

        let cached_profiles: &[Profile] = cached.as_deref().unwrap_or(&[]);
        let page_size = limit.saturating_mul(self.settings.fetch_multiplier.max(1));
        let mut filter = ProfileFilter {
            viewer_id: user_id.to_string(),
            genders: preferences.genders.clone(),
            min_age: preferences.min_age,
            max_age: preferences.max_age,
            bounding_box: match (location, self.matcher.unknown_distance()) {
                (Some(point), UnknownDistance::Exclude) => {
                    Some(calculate_bounding_box(&point, preferences.max_distance_km))
                }
                _ => None,
            },
            exclude_user_ids: excluded.iter().cloned().collect(),
            offset: 0,
            limit: page_size,
        };

        // Pages stop once the batch can be filled or the directory runs out
        let mut fetched: Vec<Profile> = Vec::new();
        let mut remote_err = None;
        for _ in 0..self.settings.max_fetch_pages.max(1) {
            let page = match bounded(
                self.settings.remote_timeout,
                self.profiles.fetch_profiles(&filter),
            )
            .await
            {
                Ok(page) => page,
                Err(e) => {
                    remote_err = Some(e);
                    break;
                }
            };

            let profiles: Vec<Profile> = page.profiles.into_iter().map(Profile::normalized).collect();
            if let Err(e) = self.store.upsert_profiles(&profiles, now).await {
                tracing::warn!("Failed to cache {} profiles: {}", profiles.len(), e);
            }
            tracing::debug!(
                "Fetched {} profiles for {} at offset {}",
                profiles.len(),
                user_id,
                filter.offset
            );
            fetched.extend(profiles);

            if !page.has_more {
                break;
            }
            let found = self
                .matcher
                .find_candidates(
                    preferences,
                    location.as_ref(),
                    fetched.iter().chain(cached_profiles).cloned(),
                    &excluded,
                )
                .len();
            if found >= limit {
                break;
            }
            filter.offset += page_size;
        }

        match remote_err {
            None => {
                // Fresh remote copies take precedence over cached ones
                let pool = fetched.into_iter().chain(cached.unwrap_or_default());
                let candidates =
                    self.matcher
                        .find_candidates(preferences, location.as_ref(), pool, &excluded);

                Ok(self.claim(user_id, candidates, limit, blocks_stale).await)
            }
            Some(remote_err) if !fetched.is_empty() => {
                tracing::warn!(
                    "Profile source failed for {} after {} profiles, serving partial pages: {}",
                    user_id,
                    fetched.len(),
                    remote_err
                );
                let pool = fetched.into_iter().chain(cached.unwrap_or_default());
                let candidates =
                    self.matcher
                        .find_candidates(preferences, location.as_ref(), pool, &excluded);

                Ok(self.claim(user_id, candidates, limit, true).await)
            }
            Some(remote_err) => {
                tracing::warn!(
                    "Profile source failed for {}, serving from cache: {}",
                    user_id,
                    remote_err
                );

                match cached {
                    Ok(profiles) if !profiles.is_empty() => {
                        let candidates = self.matcher.find_candidates(
                            preferences,
                            location.as_ref(),
                            profiles,
                            &excluded,
                        );
                        Ok(self.claim(user_id, candidates, limit, true).await)
                    }
                    Ok(_) => Err(EngineError::Unavailable(format!(
                        "profile source failed ({}) and no fresh profiles are cached",
                        remote_err
                    ))),
                    Err(store_err) => Err(EngineError::Unavailable(format!(
                        "profile source failed ({}) and cache is unreadable ({})",
                        remote_err, store_err
                    ))),
                }
            }
        }
    }

    /// Start a new discovery session; previously served but unswiped
    /// profiles become eligible again
    pub async fn reset_session(&self, user_id: &str) {
        self.sessions.reset(user_id).await;
    }

    /// Self, caller exclusions, swiped, blocked and already served ids.
    /// The flag reports whether blocks came from the local snapshot.
    async fn exclusions(
        &self,
        user_id: &str,
        exclude: &HashSet<String>,
    ) -> EngineResult<(HashSet<String>, bool)> {
        let mut excluded = exclude.clone();
        excluded.insert(user_id.to_string());

        let swiped = self.store.get_swiped_targets(user_id).await.map_err(|e| {
            EngineError::Unavailable(format!("swipe mirror unreadable: {}", e))
        })?;
        excluded.extend(swiped);

        let (blocked, stale) = match bounded(
            self.settings.remote_timeout,
            self.blocks.current_blocks(user_id),
        )
        .await
        {
            Ok(blocked) => {
                if let Err(e) = self.store.save_blocks(user_id, &blocked, self.clock.now()).await {
                    tracing::warn!("Failed to save block snapshot for {}: {}", user_id, e);
                }
                (blocked, false)
            }
            Err(e) => {
                tracing::warn!("Block source failed for {}, using local snapshot: {}", user_id, e);
                let snapshot = self.store.get_blocks(user_id).await.map_err(|e| {
                    EngineError::Unavailable(format!("block list unavailable: {}", e))
                })?;
                (snapshot, true)
            }
        };
        excluded.extend(blocked);
        excluded.extend(self.sessions.served(user_id).await);

        Ok((excluded, stale))
    }

    async fn claim(
        &self,
        user_id: &str,
        candidates: Vec<Candidate>,
        limit: usize,
        stale: bool,
    ) -> DiscoveryBatch {
        let claimed: HashSet<String> = self
            .sessions
            .claim(
                user_id,
                candidates.iter().map(|c| c.profile.user_id.clone()),
                limit,
            )
            .await
            .into_iter()
            .collect();

        let candidates: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| claimed.contains(&c.profile.user_id))
            .collect();

        if candidates.is_empty() {
            tracing::debug!("No candidates left for {}", user_id);
            DiscoveryBatch::Empty { stale }
        } else {
            tracing::info!(
                "Serving {} candidates to {} (stale: {})",
                candidates.len(),
                user_id,
                stale
            );
            DiscoveryBatch::Candidates { candidates, stale }
        }
    }
}
