//! # Track to Trip
//!
//! Turns raw GPS recordings into clean, segmented trips and compares two
//! recordings of the same journey.
//!
//! This library provides:
//! - A [`Track`] orchestrator that runs the raw track → trip pipeline
//!   (smoothing, spatio-temporal segmentation, simplification)
//! - Directional track similarity using an R-tree spatial join over segment
//!   bounding boxes
//! - Merge-and-fit of two recordings using the similarity correspondences
//! - GPX, JSON and LIFE itinerary adapters
//!
//! ## Features
//!
//! - **`parallel`** - Run per-segment stages and candidate scoring with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use track_to_trip::{GpsPoint, Segment, Track, TripConfig};
//!
//! let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
//! let points: Vec<GpsPoint> = (0..20)
//!     .map(|i| GpsPoint::new(51.5074 + i as f64 * 0.0002, -0.1278, start + chrono::Duration::seconds(i * 5)))
//!     .collect();
//!
//! let mut track = Track::new("", vec![Segment::new(points)]).unwrap();
//! let reference = track.clone();
//!
//! track.to_trip("", &TripConfig::default()).unwrap();
//! assert_eq!(track.name, "2024-05-01.gpx");
//!
//! let result = reference.similarity(&track);
//! assert_eq!(result.correspondences.len(), track.segments.len());
//! ```

use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TripError};

// Pipeline configuration
pub mod config;
pub use config::{LocationConfig, ModeConfig, PreprocessConfig, TripConfig};

// Geographic utilities (distance, bounds, interpolation)
pub mod geo_utils;

// Point-level filters (noise removal, smoothing)
pub mod filters;
pub use filters::SmoothStrategy;

// Douglas-Peucker simplification (topology-only and time-synchronised)
pub mod simplify;

// Stay-point detection used by spatio-temporal segmentation
pub mod stays;

// Transportation mode inference
pub mod modes;
pub use modes::{ModeClassifier, ModeFeatures, ModeSpan, SpeedClassifier};

// Location inference
pub mod location;
pub use location::{KnownPlaces, Location, LocationProvider};

// Segments and their derived metrics
pub mod segment;
pub use segment::{Segment, SegmentMetrics};

// Pairwise segment similarity
pub mod similarity;
pub use similarity::{
    AmdSimilarity, Correspondence, PointPair, SegmentDiff, SegmentSimilarity, SimilarityConfig,
    TrackSimilarity,
};

// R-tree over segment bounding boxes
pub mod spatial_index;
pub use spatial_index::SegmentIndex;

// Track orchestration
pub mod track;
pub use track::Track;

// Format adapters
pub mod gpx_io;
pub mod json_io;
pub use json_io::TrackJson;
pub mod life;

// ============================================================================
// Core Types
// ============================================================================

/// A timestamped GPS coordinate.
///
/// Equality is exact on all three fields; point lookups rely on it.
///
/// # Example
/// ```
/// use chrono::Utc;
/// use track_to_trip::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278, Utc::now()); // London
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub time: DateTime<Utc>,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64, time: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            time,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// The point as a `geo` point (x = longitude, y = latitude).
    pub fn to_geo(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// Seconds elapsed from `earlier` to this point. Negative if `earlier` is later.
    pub fn seconds_since(&self, earlier: &GpsPoint) -> f64 {
        (self.time - earlier.time).num_milliseconds() as f64 / 1000.0
    }
}

/// Axis-aligned bounding box in degrees.
///
/// An inverted box ([`Bounds::EMPTY`]) is the identity for [`Bounds::union`]
/// and is what an empty track reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// The inverted box `(+inf, +inf, -inf, -inf)`.
    pub const EMPTY: Bounds = Bounds {
        min_lat: f64::INFINITY,
        min_lng: f64::INFINITY,
        max_lat: f64::NEG_INFINITY,
        max_lng: f64::NEG_INFINITY,
    };

    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        }
    }

    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(
            points
                .iter()
                .fold(Bounds::EMPTY, |acc, p| acc.extend(p.latitude, p.longitude)),
        )
    }

    fn extend(self, lat: f64, lng: f64) -> Self {
        Self {
            min_lat: self.min_lat.min(lat),
            min_lng: self.min_lng.min(lng),
            max_lat: self.max_lat.max(lat),
            max_lng: self.max_lng.max(lng),
        }
    }

    /// Element-wise union of two boxes.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_lat: self.min_lat.min(other.min_lat),
            min_lng: self.min_lng.min(other.min_lng),
            max_lat: self.max_lat.max(other.max_lat),
            max_lng: self.max_lng.max(other.max_lng),
        }
    }

    /// True for inverted boxes such as [`Bounds::EMPTY`].
    pub fn is_empty(&self) -> bool {
        self.min_lat > self.max_lat || self.min_lng > self.max_lng
    }

    /// `(min_lat, min_lng, max_lat, max_lng)`.
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.min_lat, self.min_lng, self.max_lat, self.max_lng)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(51.5074, -0.1278, t0()).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0, t0()).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0, t0()).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0, t0()).is_valid());
    }

    #[test]
    fn test_bounds_from_points() {
        let points = vec![
            GpsPoint::new(51.50, -0.13, t0()),
            GpsPoint::new(51.51, -0.12, t0()),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.as_tuple(), (51.50, -0.13, 51.51, -0.12));
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_empty_bounds_is_union_identity() {
        let b = Bounds::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(Bounds::EMPTY.union(&b), b);
        assert!(Bounds::EMPTY.is_empty());
        assert!(!b.is_empty());
    }

    #[test]
    fn test_seconds_since() {
        let a = GpsPoint::new(0.0, 0.0, t0());
        let b = GpsPoint::new(0.0, 0.0, t0() + chrono::Duration::milliseconds(2500));
        assert_eq!(b.seconds_since(&a), 2.5);
    }
}
