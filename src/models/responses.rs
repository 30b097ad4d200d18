use crate::core::{DiscoveryBatch, PurgeReport, SwipeOutcome, SyncReport};
use crate::models::domain::{Candidate, Match};
use serde::{Deserialize, Serialize};

/// Response for the discovery endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    /// "candidates" or "empty"
    pub status: String,
    pub stale: bool,
    pub profiles: Vec<Candidate>,
}

impl From<DiscoveryBatch> for DiscoveryResponse {
    fn from(batch: DiscoveryBatch) -> Self {
        match batch {
            DiscoveryBatch::Candidates { candidates, stale } => Self {
                status: "candidates".to_string(),
                stale,
                profiles: candidates,
            },
            DiscoveryBatch::Empty { stale } => Self {
                status: "empty".to_string(),
                stale,
                profiles: vec![],
            },
        }
    }
}

/// Response for the swipe endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeResponse {
    pub mutual: bool,
    #[serde(rename = "match")]
    pub matched: Option<Match>,
}

impl From<SwipeOutcome> for SwipeResponse {
    fn from(outcome: SwipeOutcome) -> Self {
        Self {
            mutual: outcome.mutual,
            matched: outcome.matched,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub active_sessions: u64,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub profiles: u64,
    pub swipes: u64,
}

impl From<PurgeReport> for PurgeResponse {
    fn from(report: PurgeReport) -> Self {
        Self {
            profiles: report.profiles,
            swipes: report.swipes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub swipes_synced: usize,
    pub swipes_failed: usize,
    pub matches_synced: usize,
    pub matches_failed: usize,
}

impl From<SyncReport> for SyncResponse {
    fn from(report: SyncReport) -> Self {
        Self {
            swipes_synced: report.swipes_synced,
            swipes_failed: report.swipes_failed,
            matches_synced: report.matches_synced,
            matches_failed: report.matches_failed,
        }
    }
}
