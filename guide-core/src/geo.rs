//! Island bounds used to center the map listing.

pub const LAT_RANGE: (f64, f64) = (9.5, 10.5);
pub const LON_RANGE: (f64, f64) = (123.5, 125.0);

/// Trinidad, Bohol.
pub const DEFAULT_ANCHOR: (f64, f64) = (10.05, 124.35);

pub fn within_island(latitude: f64, longitude: f64) -> bool {
    (LAT_RANGE.0..=LAT_RANGE.1).contains(&latitude)
        && (LON_RANGE.0..=LON_RANGE.1).contains(&longitude)
}

/// The given point if it lies on the island, otherwise the default anchor.
pub fn island_anchor(latitude: f64, longitude: f64) -> (f64, f64) {
    if within_island(latitude, longitude) {
        (latitude, longitude)
    } else {
        DEFAULT_ANCHOR
    }
}
