use rand::Rng;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// A uniformly random point within `spread` degrees of `self` on both axes.
    pub fn jittered<R: Rng + ?Sized>(&self, spread: f64, rng: &mut R) -> Self {
        if spread <= 0.0 {
            return *self;
        }
        Self {
            lat: self.lat + rng.random_range(-spread..=spread),
            lng: self.lng + rng.random_range(-spread..=spread),
        }
    }

    pub fn distance_to(&self, other: &LatLng) -> f64 {
        distance(*self, *other)
    }
}

/// Great-circle distance in meters between two points given in degrees.
pub fn distance(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlng = (dlng * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}
