//! Noise scorer.
//!
//! Counts complaints within a fixed radius of a point using squared
//! Euclidean distance in degree space. At the ~150 m scale this is close
//! enough to geodesic distance and needs no trigonometry per pair.

use quiet_spaces_complaint_models::NoiseComplaint;
use quiet_spaces_places_models::PlaceCandidate;

/// Proximity radius in degrees (about 150 m).
pub const DEFAULT_RADIUS_DEGREES: f64 = 0.0015;

/// Number of located complaints with distance² ≤ `radius_degrees`² from
/// `(latitude, longitude)`.
#[must_use]
pub fn noise_score(
    latitude: f64,
    longitude: f64,
    complaints: &[NoiseComplaint],
    radius_degrees: f64,
) -> u32 {
    let radius_sq = radius_degrees * radius_degrees;
    let count = complaints
        .iter()
        .filter_map(NoiseComplaint::coordinates)
        .filter(|(lat, lng)| {
            let d_lat = lat - latitude;
            let d_lng = lng - longitude;
            d_lat.mul_add(d_lat, d_lng * d_lng) <= radius_sq
        })
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Scores a candidate against a complaint set.
#[must_use]
pub fn score(
    candidate: &PlaceCandidate,
    complaints: &[NoiseComplaint],
    radius_degrees: f64,
) -> u32 {
    noise_score(candidate.latitude, candidate.longitude, complaints, radius_degrees)
}
