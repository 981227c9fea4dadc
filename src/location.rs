//! Location inference for segment endpoints.
//!
//! Place lookup goes through the [`LocationProvider`] trait so callers can plug
//! in their own gazetteer. [`KnownPlaces`] is an in-memory provider over a
//! list of labelled coordinates.

use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_distance;
use crate::{GpsPoint, Result};

/// A labelled place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(label: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            label: label.into(),
            latitude,
            longitude,
        }
    }

    /// Distance from this place to `point` in meters.
    pub fn distance_to(&self, point: &GpsPoint) -> f64 {
        let here = GpsPoint::new(self.latitude, self.longitude, point.time);
        haversine_distance(&here, point)
    }
}

/// Source of candidate places near a point.
pub trait LocationProvider {
    /// Up to `limit` places within `max_distance` meters of `point`, closest
    /// first.
    fn nearby(&self, point: &GpsPoint, max_distance: f64, limit: usize) -> Result<Vec<Location>>;
}

/// In-memory provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnownPlaces {
    places: Vec<Location>,
}

impl KnownPlaces {
    pub fn new(places: Vec<Location>) -> Self {
        Self { places }
    }

    pub fn add(&mut self, place: Location) {
        self.places.push(place);
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl LocationProvider for KnownPlaces {
    fn nearby(&self, point: &GpsPoint, max_distance: f64, limit: usize) -> Result<Vec<Location>> {
        let mut candidates: Vec<(f64, &Location)> = self
            .places
            .iter()
            .map(|place| (place.distance_to(point), place))
            .filter(|(distance, _)| *distance <= max_distance)
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(candidates
            .into_iter()
            .take(limit)
            .map(|(_, place)| place.clone())
            .collect())
    }
}
