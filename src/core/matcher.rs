use crate::core::filters::{admit_distance, matches_demographics, resolve_distance, UnknownDistance};
use crate::models::{Candidate, GeoPoint, Preferences, Profile};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Filtering and ordering pipeline for the discovery feed
///
/// # Pipeline Stages
/// 1. Exclusion (self, swiped, blocked, already served)
/// 2. Demographic filtering
/// 3. Distance filtering under the unknown-distance policy
/// 4. Ordering: known distance first, then most recently active,
///    then nearest, then id
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    unknown_distance: UnknownDistance,
}

impl Matcher {
    pub fn new(unknown_distance: UnknownDistance) -> Self {
        Self { unknown_distance }
    }

    pub fn unknown_distance(&self) -> UnknownDistance {
        self.unknown_distance
    }

    /// Filter and order candidates for a viewer
    ///
    /// # Arguments
    /// * `preferences` - The viewer's discovery preferences
    /// * `viewer` - The viewer's current position, if known
    /// * `profiles` - Candidate profiles, possibly containing duplicates
    /// * `excluded` - Ids that must never be returned
    ///
    /// # Returns
    /// Every eligible candidate, deduplicated and in feed order
    pub fn find_candidates<I>(
        &self,
        preferences: &Preferences,
        viewer: Option<&GeoPoint>,
        profiles: I,
        excluded: &HashSet<String>,
    ) -> Vec<Candidate>
    where
        I: IntoIterator<Item = Profile>,
    {
        let mut seen = HashSet::new();

        let mut candidates: Vec<Candidate> = profiles
            .into_iter()
            // Stage 1: exclusion and dedup
            .filter(|profile| !excluded.contains(&profile.user_id))
            .filter(|profile| seen.insert(profile.user_id.clone()))
            // Stage 2: demographics
            .filter(|profile| matches_demographics(profile, preferences))
            // Stage 3: distance
            .filter_map(|profile| {
                let distance = resolve_distance(&profile, viewer);
                admit_distance(distance, preferences, self.unknown_distance).map(|distance_km| {
                    Candidate {
                        profile,
                        distance_km,
                    }
                })
            })
            .collect();

        // Stage 4: ordering
        candidates.sort_by(compare_candidates);
        candidates
    }
}

/// Feed order; total so results are deterministic
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    // Known distances before unknown ones
    a.distance_km
        .is_none()
        .cmp(&b.distance_km.is_none())
        // Most recently active first; never-active sorts last
        .then_with(|| b.profile.last_active.cmp(&a.profile.last_active))
        .then_with(|| match (a.distance_km, b.distance_km) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        })
        .then_with(|| a.profile.user_id.cmp(&b.profile.user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Location};
    use chrono::{Duration, Utc};

    fn create_candidate(id: &str, age: u8, gender: Gender, position: Option<(f64, f64)>) -> Profile {
        Profile {
            user_id: id.to_string(),
            name: format!("User {}", id),
            age: Some(age),
            bio: None,
            gender,
            interests: Default::default(),
            photos: vec![],
            location: position.map(|(latitude, longitude)| Location {
                latitude,
                longitude,
                city: None,
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

    // New York
    const VIEWER: GeoPoint = GeoPoint { latitude: 40.7128, longitude: -74.0060 };

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.profile.user_id.as_str()).collect()
    }

    #[test]
    fn test_find_candidates_basic() {
        let matcher = Matcher::default();

        let profiles = vec![
            create_candidate("1", 25, Gender::Female, Some((40.72, -74.01))), // Close match
            create_candidate("2", 40, Gender::Female, Some((40.72, -74.01))), // Too old
            create_candidate("3", 25, Gender::Male, Some((40.72, -74.01))),   // Wrong gender
            create_candidate("4", 25, Gender::Female, Some((45.0, -74.0))),   // >400km away
        ];

        let result = matcher.find_candidates(&create_preferences(), Some(&VIEWER), profiles, &HashSet::new());

        assert_eq!(ids(&result), vec!["1"]);
        assert!(result[0].distance_km.unwrap() < 2.0);
    }

    #[test]
    fn test_excluded_and_duplicate_profiles_dropped() {
        let matcher = Matcher::default();
        let excluded: HashSet<String> = ["2".to_string()].into_iter().collect();

        let profiles = vec![
            create_candidate("1", 25, Gender::Female, Some((40.72, -74.01))),
            create_candidate("2", 25, Gender::Female, Some((40.72, -74.01))),
            create_candidate("1", 25, Gender::Female, Some((40.72, -74.01))),
        ];

        let result = matcher.find_candidates(&create_preferences(), Some(&VIEWER), profiles, &excluded);
        assert_eq!(ids(&result), vec!["1"]);
    }

    #[test]
    fn test_ordering_activity_then_distance_then_id() {
        let matcher = Matcher::default();
        let now = Utc::now();

        let mut near_idle = create_candidate("a", 25, Gender::Female, Some((40.7128, -74.0060)));
        near_idle.last_active = Some(now - Duration::hours(5));
        let mut far_recent = create_candidate("b", 25, Gender::Female, Some((40.9, -74.0)));
        far_recent.last_active = Some(now);
        let mut tie_far = create_candidate("d", 25, Gender::Female, Some((40.8, -74.0)));
        tie_far.last_active = Some(now - Duration::hours(1));
        let mut tie_near = create_candidate("e", 25, Gender::Female, Some((40.72, -74.0)));
        tie_near.last_active = Some(now - Duration::hours(1));
        let mut same_a = create_candidate("g", 25, Gender::Female, Some((40.75, -74.0)));
        same_a.last_active = Some(now - Duration::hours(2));
        let mut same_b = create_candidate("f", 25, Gender::Female, Some((40.75, -74.0)));
        same_b.last_active = Some(now - Duration::hours(2));

        let result = matcher.find_candidates(
            &create_preferences(),
            Some(&VIEWER),
            vec![near_idle, same_a, tie_far, far_recent, same_b, tie_near],
            &HashSet::new(),
        );

        assert_eq!(ids(&result), vec!["b", "e", "d", "f", "g", "a"]);
    }

    #[test]
    fn test_unknown_distance_placed_last() {
        let matcher = Matcher::new(UnknownDistance::PlaceLast);

        let mut nowhere = create_candidate("z", 25, Gender::Female, None);
        nowhere.last_active = Some(Utc::now());
        let somewhere = create_candidate("y", 25, Gender::Female, Some((40.72, -74.01)));

        let result = matcher.find_candidates(
            &create_preferences(),
            Some(&VIEWER),
            vec![nowhere, somewhere],
            &HashSet::new(),
        );

        assert_eq!(ids(&result), vec!["y", "z"]);
        assert!(result[1].distance_km.is_none());
    }

    #[test]
    fn test_unknown_distance_excluded() {
        let matcher = Matcher::new(UnknownDistance::Exclude);

        let profiles = vec![
            create_candidate("z", 25, Gender::Female, None),
            create_candidate("y", 25, Gender::Female, Some((40.72, -74.01))),
        ];

        let result = matcher.find_candidates(&create_preferences(), Some(&VIEWER), profiles.clone(), &HashSet::new());
        assert_eq!(ids(&result), vec!["y"]);

        // Without a viewer position every distance is unknown
        let result = matcher.find_candidates(&create_preferences(), None, profiles, &HashSet::new());
        assert!(result.is_empty());
    }
}
