// Core engine exports
pub mod clock;
pub mod distance;
pub mod engine;
pub mod events;
pub mod filters;
pub mod locks;
pub mod match_builder;
pub mod matcher;
pub mod selector;
pub mod swipe;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use distance::{calculate_bounding_box, distance_km, haversine_distance, is_within_bounding_box};
pub use engine::{Collaborators, Engine, EngineSettings, PurgeReport};
pub use events::{EngineEvent, EventBus};
pub use filters::{admit_distance, matches_demographics, resolve_distance, UnknownDistance};
pub use locks::PairLocks;
pub use match_builder::{MatchBuilder, MatchCreation};
pub use matcher::{compare_candidates, Matcher};
pub use selector::{CandidateSelector, DiscoveryBatch, SelectorSettings};
pub use swipe::{SwipeOutcome, SwipeProcessor};
pub use sync::{RemoteSync, SyncReport};
