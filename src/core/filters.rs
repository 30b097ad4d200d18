use crate::core::distance::distance_km;
use crate::models::{GeoPoint, Preferences, Profile};
use serde::Deserialize;

/// What to do with a profile whose distance cannot be computed
/// (no profile location, or the viewer's location is unknown)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownDistance {
    /// Keep it, ordered after every profile with a known distance
    PlaceLast,
    /// Drop it from the feed
    #[default]
    Exclude,
}

/// Check a profile against the viewer's demographic preferences
#[inline]
pub fn matches_demographics(profile: &Profile, preferences: &Preferences) -> bool {
    if !profile.is_of_legal_age() {
        return false;
    }

    if !preferences.genders.contains(&profile.gender) {
        return false;
    }

    let age = profile.effective_age();
    age >= preferences.min_age && age <= preferences.max_age
}

/// Distance from the viewer to the profile, when both positions are known
#[inline]
pub fn resolve_distance(profile: &Profile, viewer: Option<&GeoPoint>) -> Option<f64> {
    let viewer = viewer?;
    let location = profile.location.as_ref()?;
    Some(distance_km(viewer, &GeoPoint::from(location)))
}

/// Apply the distance filter under the given unknown-distance policy.
///
/// Returns `None` when the profile must be dropped, otherwise its distance
/// (itself `None` when unknown).
#[inline]
pub fn admit_distance(
    distance: Option<f64>,
    preferences: &Preferences,
    policy: UnknownDistance,
) -> Option<Option<f64>> {
    match distance {
        Some(km) if km <= preferences.max_distance_km => Some(Some(km)),
        Some(_) => None,
        None => match policy {
            UnknownDistance::PlaceLast => Some(None),
            UnknownDistance::Exclude => None,
        },
    }
}
