use geo::{point, GeodesicDistance};

use crate::track_parser::Fix;

pub const METERS_PER_MILE: f64 = 1609.344;

/// Ellipsoidal (WGS84, Karney) distance between two fixes in meters.
pub fn segment_distance_m(a: &Fix, b: &Fix) -> f64 {
    let a = point!(x: a.longitude, y: a.latitude);
    let b = point!(x: b.longitude, y: b.latitude);
    a.geodesic_distance(&b)
}

/// Unrounded path length in miles.
pub fn path_length_miles(fixes: &[Fix]) -> f64 {
    fixes
        .windows(2)
        .map(|pair| segment_distance_m(&pair[0], &pair[1]))
        .sum::<f64>()
        / METERS_PER_MILE
}

/// Path length in miles rounded to two decimals. Fewer than two fixes is 0.00.
pub fn total_distance_miles(fixes: &[Fix]) -> f64 {
    round_to_hundredths(path_length_miles(fixes))
}

// Ties round away from zero (0.125 -> 0.13). Python's round(x, 2) rounds
// ties to even and would give 0.12; the away-from-zero result is intended.
fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
