//! Geographic coordinate type and geodesic helpers.
//!
//! Everything here uses a **spherical** Earth of mean radius
//! [`EARTH_RADIUS_M`].  Segment lengths, bearings, and projected points all
//! come from the same model, so walking `distance_m(a, b)` metres from `a`
//! along `bearing_deg(a, b)` lands back on `b` (up to rounding).  Mixing in an
//! ellipsoidal formula anywhere would break that round trip and with it the
//! tick-distance bookkeeping in the motion engine.
//!
//! `GeoPoint` stores `f64` degrees.  A tick at walking speed moves well under
//! a metre, which `f32` cannot resolve at city-scale longitudes.

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS-84 geographic coordinate in degrees.
///
/// Field order follows the GeoJSON convention used by the route geometry
/// export: longitude first, latitude second.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Initial compass bearing from `self` towards `other`, in `[0, 360)`.
    ///
    /// Returns `0.0` for coincident points.
    pub fn bearing_deg(self, other: GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let y = d_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

        normalize_bearing(y.atan2(x).to_degrees())
    }

    /// Forward geodesic problem: the point reached by travelling
    /// `distance_m` metres from `self` on an initial bearing of
    /// `bearing_deg` degrees.
    ///
    /// NaN inputs propagate to a NaN result; no other validation is done.
    pub fn destination(self, distance_m: f64, bearing_deg: f64) -> GeoPoint {
        let delta = distance_m / EARTH_RADIUS_M;
        let theta = bearing_deg.to_radians();

        let lat1 = self.lat.to_radians();
        let lon1 = self.lon.to_radians();

        let sin_lat2 = lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos();
        let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();
        let lon2 = lon1
            + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * sin_lat2);

        GeoPoint {
            lon: normalize_lon(lon2.to_degrees()),
            lat: lat2.to_degrees(),
        }
    }

    /// `true` if both components are finite numbers.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lon, self.lat)
    }
}

/// Map any angle in degrees into `[0, 360)`.
#[inline]
pub fn normalize_bearing(deg: f64) -> f64 {
    let b = deg.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs.
    if b >= 360.0 { 0.0 } else { b }
}

#[inline]
fn normalize_lon(deg: f64) -> f64 {
    (deg + 540.0).rem_euclid(360.0) - 180.0
}
