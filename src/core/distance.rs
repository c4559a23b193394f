//! Great-circle distance for the map screen.

use serde::{Deserialize, Serialize};

/// Equatorial radius used by the map library, in metres.
const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// A point on the map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Degrees north
    pub latitude: f64,
    /// Degrees east
    pub longitude: f64,
}

/// Shown when the device position is unavailable or permission is denied.
pub const DEFAULT_LOCATION: Coordinates = Coordinates {
    latitude: 37.78825,
    longitude: -122.4324,
};

impl Coordinates {
    /// Device position, or [`DEFAULT_LOCATION`].
    #[must_use]
    pub fn or_default(position: Option<Self>) -> Self {
        position.unwrap_or(DEFAULT_LOCATION)
    }
}

/// Haversine distance in metres.
#[must_use]
pub fn distance_meters(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Distance in kilometres rounded to two decimals, as displayed.
#[must_use]
pub fn distance_km(from: Coordinates, to: Coordinates) -> f64 {
    (distance_meters(from, to) / 10.0).round() / 100.0
}
