//! Coordinate conversion between a local Cartesian plane (meters) and
//! geographic coordinates (degrees). Uses an equirectangular approximation
//! anchored on a reference point — adequate for the polygon sizes this
//! store targets (tens of kilometers), not a substitute for a full
//! geodesic projection.

use tps_core::Point;

use crate::FormatError;

/// Mean Earth radius in meters (WGS84 authalic radius, rounded).
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// The geographic point a Cartesian plane's origin is anchored to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoOrigin {
    pub lat0: f64,
    pub lon0: f64,
}

impl GeoOrigin {
    pub fn new(lat0: f64, lon0: f64) -> Result<Self, FormatError> {
        if !(-90.0..=90.0).contains(&lat0) {
            return Err(FormatError::OutOfDomain(format!(
                "latitude {lat0} is outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&lon0) {
            return Err(FormatError::OutOfDomain(format!(
                "longitude {lon0} is outside [-180, 180]"
            )));
        }
        Ok(Self { lat0, lon0 })
    }

    /// Converts a local Cartesian point (meters east/north of the origin)
    /// to `(lat, lon)` degrees, using the equirectangular approximation:
    /// `lon = lon0 + x / (R * cos(lat0))`, `lat = lat0 + y / R`.
    pub fn to_geographic(&self, p: Point) -> Point {
        let lat0_rad = self.lat0.to_radians();
        let lat = self.lat0 + (p.y / EARTH_RADIUS_METERS).to_degrees();
        let lon = self.lon0 + (p.x / (EARTH_RADIUS_METERS * lat0_rad.cos())).to_degrees();
        Point::new(lon, lat)
    }

    /// Inverse of [`Self::to_geographic`]: `(lon, lat)` degrees to local
    /// Cartesian meters.
    pub fn to_cartesian(&self, geographic: Point) -> Point {
        let lat0_rad = self.lat0.to_radians();
        let x = (geographic.x - self.lon0).to_radians() * EARTH_RADIUS_METERS * lat0_rad.cos();
        let y = (geographic.y - self.lat0).to_radians() * EARTH_RADIUS_METERS;
        Point::new(x, y)
    }
}

/// Great-circle distance in meters between two `(lon, lat)` points, via the
/// haversine formula.
pub fn haversine_distance_meters(a_lon_lat: Point, b_lon_lat: Point) -> f64 {
    let lat1 = a_lon_lat.y.to_radians();
    let lat2 = b_lon_lat.y.to_radians();
    let dlat = (b_lon_lat.y - a_lon_lat.y).to_radians();
    let dlon = (b_lon_lat.x - a_lon_lat.x).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}
