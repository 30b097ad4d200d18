//! Contracts of the remote collaborators the engine consumes.
//!
//! The engine only talks to these traits; `AppwriteClient` implements all of
//! them against the Appwrite REST API, and tests plug in-memory fakes.

use crate::models::{Match, ProfileFilter, ProfilePage, SwipeRecord};
use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to a remote collaborator
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

/// Authoritative profile directory and geo index
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// The page at `filter.offset`, most recently active first. Excluded ids
    /// may be dropped after paging, so a page can come back short while
    /// `has_more` is still set.
    async fn fetch_profiles(&self, filter: &ProfileFilter) -> Result<ProfilePage, RemoteError>;
}

/// Remote source of truth for swipes
#[async_trait]
pub trait SwipeAuthority: Send + Sync {
    /// Latest swipe `target_id` made on `actor_id`, if any
    async fn fetch_reciprocal_swipe(
        &self,
        target_id: &str,
        actor_id: &str,
    ) -> Result<Option<SwipeRecord>, RemoteError>;

    /// Stores the record, replacing any older one for the same pair
    async fn persist_swipe(&self, record: &SwipeRecord) -> Result<(), RemoteError>;
}

/// Remote source of truth for matches
#[async_trait]
pub trait MatchAuthority: Send + Sync {
    /// Must treat an already stored match id as success
    async fn persist_match(&self, m: &Match) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Every user on the other side of a block involving `user_id`
    async fn current_blocks(&self, user_id: &str) -> Result<HashSet<String>, RemoteError>;
}

/// Runs a remote call with an upper bound on its duration
pub async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(timeout.as_millis() as u64)),
    }
}
