use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Minimum legal age, also assumed for profiles without an age
pub const MIN_LEGAL_AGE: u8 = 18;

/// Separator between the two user ids of a canonical pair id
pub const PAIR_SEPARATOR: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 4] = [Gender::Male, Gender::Female, Gender::NonBinary, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::NonBinary => "non_binary",
            Gender::Other => "other",
        }
    }
}

/// Where a profile says it lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Current position of the viewer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&Location> for GeoPoint {
    fn from(location: &Location) -> Self {
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
        }
    }
}

/// User profile as published by the remote profile directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub bio: Option<String>,
    pub gender: Gender,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(rename = "lastActive", default)]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(rename = "isOnline", default)]
    pub is_online: bool,
}

impl Profile {
    /// Age with the legal default applied when unset
    pub fn effective_age(&self) -> u8 {
        self.age.unwrap_or(MIN_LEGAL_AGE)
    }

    pub fn is_of_legal_age(&self) -> bool {
        self.effective_age() >= MIN_LEGAL_AGE
    }

    /// Drops repeated photo references, keeping the first occurrence of each
    pub fn normalized(mut self) -> Self {
        let mut seen = HashSet::with_capacity(self.photos.len());
        self.photos.retain(|photo| seen.insert(photo.clone()));
        self
    }
}

/// Read-only profile snapshot held by the local store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedProfile {
    pub profile: Profile,
    #[serde(rename = "cachedAt")]
    pub cached_at: DateTime<Utc>,
}

/// Discovery filter owned by the viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub genders: BTreeSet<Gender>,
    #[serde(rename = "minAge")]
    pub min_age: u8,
    #[serde(rename = "maxAge")]
    pub max_age: u8,
    #[serde(rename = "maxDistanceKm")]
    pub max_distance_km: f64,
}

impl Preferences {
    /// Any gender, any adult age, given radius
    pub fn open(max_distance_km: f64) -> Self {
        Self {
            genders: Gender::ALL.into_iter().collect(),
            min_age: MIN_LEGAL_AGE,
            max_age: u8::MAX,
            max_distance_km,
        }
    }

    /// Returns a description of the first broken constraint
    pub fn check(&self) -> Result<(), String> {
        if self.genders.is_empty() {
            return Err("gender preference must not be empty".to_string());
        }
        if self.min_age < MIN_LEGAL_AGE {
            return Err(format!("minimum age must be at least {}", MIN_LEGAL_AGE));
        }
        if self.min_age > self.max_age {
            return Err(format!(
                "age range is inverted: {} > {}",
                self.min_age, self.max_age
            ));
        }
        if !self.max_distance_km.is_finite() || self.max_distance_km < 0.0 {
            return Err(format!("invalid max distance: {}", self.max_distance_km));
        }
        Ok(())
    }
}

/// One swipe decision; the latest record per (actor, target) wins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeRecord {
    #[serde(rename = "actorId")]
    pub actor_id: String,
    #[serde(rename = "targetId")]
    pub target_id: String,
    pub liking: bool,
    #[serde(rename = "superLike", default)]
    pub super_like: bool,
    pub timestamp: DateTime<Utc>,
}

impl SwipeRecord {
    /// Picks whichever record was written last
    pub fn latest(a: Option<SwipeRecord>, b: Option<SwipeRecord>) -> Option<SwipeRecord> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if b.timestamp > a.timestamp { b } else { a }),
            (a, b) => a.or(b),
        }
    }
}

/// Mutual match between two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    #[serde(rename = "userA")]
    pub user_a: String,
    #[serde(rename = "userB")]
    pub user_b: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "lastMessageId", default)]
    pub last_message_id: Option<String>,
    #[serde(rename = "unreadCounts", default)]
    pub unread_counts: BTreeMap<String, u32>,
}

impl Match {
    /// Fresh match with no messages and zeroed unread counters
    pub fn new(a: &str, b: &str, created_at: DateTime<Utc>) -> Self {
        let (user_a, user_b) = canonical_pair(a, b);
        let unread_counts = [(user_a.to_string(), 0), (user_b.to_string(), 0)]
            .into_iter()
            .collect();

        Self {
            id: canonical_pair_id(a, b),
            user_a: user_a.to_string(),
            user_b: user_b.to_string(),
            created_at,
            last_message_id: None,
            unread_counts,
        }
    }
}

/// A block between two users, in either direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "blockerId")]
    pub blocker_id: String,
    #[serde(rename = "blockedUserId")]
    pub blocked_user_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Block {
    /// The party on the other side of the block from `user_id`
    pub fn counterpart(&self, user_id: &str) -> Option<&str> {
        if self.blocker_id == user_id {
            Some(&self.blocked_user_id)
        } else if self.blocked_user_id == user_id {
            Some(&self.blocker_id)
        } else {
            None
        }
    }
}

/// Orders two user ids lexicographically
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Order-independent identifier for a pair of users, e.g. `alice_bob`
pub fn canonical_pair_id(a: &str, b: &str) -> String {
    let (first, second) = canonical_pair(a, b);
    format!("{}{}{}", first, PAIR_SEPARATOR, second)
}

/// A profile surfaced to the viewer, with its distance when known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub profile: Profile,
    #[serde(rename = "distanceKm")]
    pub distance_km: Option<f64>,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Query pushed down to the remote profile directory
#[derive(Debug, Clone)]
pub struct ProfileFilter {
    pub viewer_id: String,
    pub genders: BTreeSet<Gender>,
    pub min_age: u8,
    pub max_age: u8,
    pub bounding_box: Option<BoundingBox>,
    pub exclude_user_ids: Vec<String>,
    /// Directory entries to skip, in the source's own order
    pub offset: usize,
    /// Page size, counted before `exclude_user_ids` is applied
    pub limit: usize,
}

/// One page of the remote profile directory
#[derive(Debug, Clone, Default)]
pub struct ProfilePage {
    pub profiles: Vec<Profile>,
    /// False once the directory has nothing past this page
    pub has_more: bool,
}
