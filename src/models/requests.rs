use crate::models::domain::{GeoPoint, Preferences};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request for the next discovery batch
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NextBatchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    pub preferences: Preferences,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    #[serde(alias = "exclude_user_ids", rename = "excludeUserIds")]
    pub exclude_user_ids: Vec<String>,
    /// Falls back to the configured default when absent
    #[validate(range(min = 1))]
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Request to start a fresh discovery session
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResetSessionRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

/// Request to record a like or a dislike
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordSwipeRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "actor_id", rename = "actorId")]
    pub actor_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "target_id", rename = "targetId")]
    pub target_id: String,
    pub liking: bool,
    #[serde(default)]
    #[serde(alias = "super_like", rename = "superLike")]
    pub super_like: bool,
}

/// Request to fetch or create the match for a pair
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMatchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_a", rename = "userA")]
    pub user_a: String,
    #[validate(length(min = 1))]
    #[serde(alias = "user_b", rename = "userB")]
    pub user_b: String,
}
