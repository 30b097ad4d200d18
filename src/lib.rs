//! Lume Discovery - discovery and matching engine for the Lume dating app
//!
//! Serves batches of unseen, preference-matching candidate profiles, records
//! swipes, and turns mutual likes into exactly one match per pair. Remote
//! collaborators (profile directory, swipe and match authorities, block list)
//! sit behind the traits in [`services`]; a local store mirrors swipes and
//! matches and caches profiles so the engine degrades instead of failing.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    distance::{calculate_bounding_box, haversine_distance},
    Collaborators, DiscoveryBatch, Engine, EngineEvent, EngineSettings, Matcher, SwipeOutcome,
};
pub use error::{EngineError, EngineResult};
pub use models::{Candidate, GeoPoint, Match, Preferences, Profile, SwipeRecord};
