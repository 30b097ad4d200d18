// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    canonical_pair, canonical_pair_id, Block, BoundingBox, CachedProfile, Candidate, Gender,
    GeoPoint, Location, Match, Preferences, Profile, ProfileFilter, ProfilePage,
    SwipeRecord, MIN_LEGAL_AGE,
};
pub use requests::{CreateMatchRequest, NextBatchRequest, RecordSwipeRequest, ResetSessionRequest};
pub use responses::{
    DiscoveryResponse, ErrorResponse, HealthResponse, PurgeResponse, SwipeResponse, SyncResponse,
};
