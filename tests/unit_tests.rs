// Unit tests for Lume Discovery

use chrono::{Duration, TimeZone, Utc};
use lume_discovery::core::{
    distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box},
    filters::{admit_distance, matches_demographics},
    Matcher, PairLocks, UnknownDistance,
};
use lume_discovery::models::{
    canonical_pair_id, Gender, GeoPoint, Location, Match, Preferences, Profile, SwipeRecord,
};
use lume_discovery::services::{LocalStore, MatchInsert, MemoryStore, SessionCache};
use std::collections::HashSet;

const NYC: GeoPoint = GeoPoint {
    latitude: 40.7128,
    longitude: -74.0060,
};

fn create_profile(id: &str, age: u8, gender: Gender, lat: f64, lon: f64) -> Profile {
    Profile {
        user_id: id.to_string(),
        name: format!("User {}", id),
        age: Some(age),
        bio: None,
        gender,
        interests: Default::default(),
        photos: vec![],
        location: Some(Location {
            latitude: lat,
            longitude: lon,
            city: Some("New York".to_string()),
            country: None,
        }),
        last_active: None,
        is_online: false,
    }
}

fn create_preferences() -> Preferences {
    Preferences {
        genders: [Gender::Female].into_iter().collect(),
        min_age: 21,
        max_age: 35,
        max_distance_km: 50.0,
    }
}

fn swipe(actor: &str, target: &str, liking: bool, minute: i64) -> SwipeRecord {
    SwipeRecord {
        actor_id: actor.to_string(),
        target_id: target.to_string(),
        liking,
        super_like: false,
        timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute),
    }
}

#[test]
fn test_haversine_distance_zero() {
    let distance = haversine_distance(40.7128, -74.0060, 40.7128, -74.0060);
    assert!(distance < 0.01);
}

#[test]
fn test_haversine_distance_manhattan_to_brooklyn() {
    // Manhattan to Brooklyn is approximately 5-10 km
    let distance = haversine_distance(40.7580, -73.9855, 40.6782, -73.9442);
    assert!(distance > 5.0 && distance < 15.0);
}

#[test]
fn test_bounding_box_creation() {
    let bbox = calculate_bounding_box(&NYC, 10.0);

    assert!(bbox.min_lat < NYC.latitude);
    assert!(bbox.max_lat > NYC.latitude);
    assert!(bbox.min_lon < NYC.longitude);
    assert!(bbox.max_lon > NYC.longitude);

    // Roughly 0.18 degrees in latitude (10km / 111km per degree, both sides)
    let lat_span = bbox.max_lat - bbox.min_lat;
    assert!((lat_span - 0.18).abs() < 0.02);
}

#[test]
fn test_point_within_bbox() {
    let bbox = calculate_bounding_box(&NYC, 10.0);

    assert!(is_within_bounding_box(40.7128, -74.0060, &bbox));
    assert!(is_within_bounding_box(40.71, -74.0, &bbox));
    assert!(!is_within_bounding_box(50.0, -80.0, &bbox));
    assert!(!is_within_bounding_box(bbox.max_lat + 0.01, -74.0, &bbox));
}

#[test]
fn test_demographics_boundaries_inclusive() {
    let preferences = create_preferences();

    let youngest = create_profile("a", 21, Gender::Female, 40.72, -74.01);
    let oldest = create_profile("b", 35, Gender::Female, 40.72, -74.01);
    let too_old = create_profile("c", 36, Gender::Female, 40.72, -74.01);

    assert!(matches_demographics(&youngest, &preferences));
    assert!(matches_demographics(&oldest, &preferences));
    assert!(!matches_demographics(&too_old, &preferences));
}

#[test]
fn test_distance_exactly_at_limit_is_kept() {
    let preferences = create_preferences();
    assert_eq!(
        admit_distance(Some(50.0), &preferences, UnknownDistance::Exclude),
        Some(Some(50.0))
    );
}

#[test]
fn test_matcher_pipeline() {
    let matcher = Matcher::default();
    let preferences = create_preferences();

    let candidates = vec![
        create_profile("1", 25, Gender::Female, 40.72, -74.01), // Good match
        create_profile("2", 28, Gender::Female, 40.73, -74.02), // Good match
        create_profile("3", 40, Gender::Female, 40.72, -74.01), // Too old
        create_profile("4", 25, Gender::Male, 40.72, -74.01),   // Wrong gender
        create_profile("5", 25, Gender::Female, 41.5, -74.0),   // Too far
        create_profile("1", 25, Gender::Female, 40.72, -74.01), // Duplicate
        create_profile("6", 25, Gender::Female, 40.72, -74.01), // Excluded
    ];
    let excluded: HashSet<String> = ["6".to_string()].into_iter().collect();

    let result = matcher.find_candidates(&preferences, Some(&NYC), candidates, &excluded);

    let ids: Vec<&str> = result.iter().map(|c| c.profile.user_id.as_str()).collect();
    // Equal activity: nearest first
    assert_eq!(ids, vec!["1", "2"]);
}

#[test]
fn test_matcher_prefers_recent_activity() {
    let matcher = Matcher::default();
    let preferences = create_preferences();
    let now = Utc::now();

    let mut near_idle = create_profile("near", 25, Gender::Female, 40.713, -74.006);
    near_idle.last_active = Some(now - Duration::days(3));
    let mut far_active = create_profile("far", 25, Gender::Female, 40.9, -74.1);
    far_active.last_active = Some(now);

    let result = matcher.find_candidates(
        &preferences,
        Some(&NYC),
        vec![near_idle, far_active],
        &HashSet::new(),
    );

    assert_eq!(result[0].profile.user_id, "far");
    assert_eq!(result[1].profile.user_id, "near");
}

#[test]
fn test_canonical_pair_id() {
    assert_eq!(canonical_pair_id("alice", "bob"), "alice_bob");
    assert_eq!(canonical_pair_id("bob", "alice"), "alice_bob");

    let m = Match::new("bob", "alice", Utc::now());
    assert_eq!((m.user_a.as_str(), m.user_b.as_str()), ("alice", "bob"));
    assert_eq!(m.id, "alice_bob");
}

#[tokio::test]
async fn test_store_keeps_latest_swipe() {
    let store = MemoryStore::new();

    assert!(store.mirror_swipe(&swipe("alice", "bob", true, 5)).await.unwrap());
    // Older write loses
    assert!(!store.mirror_swipe(&swipe("alice", "bob", false, 1)).await.unwrap());
    assert!(store.get_swipe("alice", "bob").await.unwrap().unwrap().liking);

    assert!(store.mirror_swipe(&swipe("alice", "bob", false, 9)).await.unwrap());
    assert!(!store.get_swipe("alice", "bob").await.unwrap().unwrap().liking);
}

#[tokio::test]
async fn test_store_conditional_match_insert() {
    let store = MemoryStore::new();
    let at = Utc::now();

    let first = store
        .insert_match_if_absent(&Match::new("alice", "bob", at))
        .await
        .unwrap();
    let second = store
        .insert_match_if_absent(&Match::new("bob", "alice", at + Duration::seconds(1)))
        .await
        .unwrap();

    assert!(matches!(first, MatchInsert::Created(_)));
    assert!(matches!(second, MatchInsert::Existing(ref m) if m.created_at == at));
}

#[tokio::test]
async fn test_session_cache_claims_once() {
    let sessions = SessionCache::new(100, 60);
    let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];

    let first = sessions.claim("viewer", ids.clone(), 2).await;
    let second = sessions.claim("viewer", ids.clone(), 2).await;

    assert_eq!(first, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(second, vec!["c".to_string()]);

    sessions.reset("viewer").await;
    assert!(sessions.served("viewer").await.is_empty());
}

#[tokio::test]
async fn test_pair_locks_are_order_independent() {
    let locks = PairLocks::new();

    let guard = locks.lock("alice", "bob").await;
    let blocked = tokio::time::timeout(
        std::time::Duration::from_millis(20),
        locks.lock("bob", "alice"),
    )
    .await;
    assert!(blocked.is_err());

    drop(guard);
    let _guard = locks.lock("bob", "alice").await;
}
