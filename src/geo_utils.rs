//! # Geographic Utilities
//!
//! Geographic computations shared by the segment operations and the
//! similarity scorer.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a GPS track in meters |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//! | [`interpolate_at`] | Position between two points at a given time |
//! | [`mean_latitude`] | Reference latitude for degree conversions |
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees).

use chrono::{DateTime, Utc};
use geo::{Distance, Haversine};

use crate::GpsPoint;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two GPS points in meters (Haversine).
///
/// ```rust
/// use chrono::Utc;
/// use track_to_trip::{GpsPoint, geo_utils};
///
/// let now = Utc::now();
/// let london = GpsPoint::new(51.5074, -0.1278, now);
/// let paris = GpsPoint::new(48.8566, 2.3522, now);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    Haversine::distance(p1.to_geo(), p2.to_geo())
}

/// Total length of a polyline in meters. Empty or single-point input is 0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Average speed from `a` to `b` in m/s. Zero when no time elapses.
#[inline]
pub fn speed_between(a: &GpsPoint, b: &GpsPoint) -> f64 {
    let dt = b.seconds_since(a);
    if dt <= 0.0 {
        return 0.0;
    }
    haversine_distance(a, b) / dt
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitude scale (the smaller degree), so the result is a
/// conservative tolerance for both axes.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

/// Mean latitude of a track, 0 for empty input.
pub fn mean_latitude(points: &[GpsPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(|p| p.latitude).sum::<f64>() / points.len() as f64
}

// =============================================================================
// Interpolation
// =============================================================================

/// Linearly interpolate the position between `a` and `b` at `time`.
///
/// `time` outside `[a.time, b.time]` extrapolates along the same line. When
/// both points share a timestamp, `a` is returned.
pub fn interpolate_at(a: &GpsPoint, b: &GpsPoint, time: DateTime<Utc>) -> GpsPoint {
    let span = b.seconds_since(a);
    if span == 0.0 {
        return GpsPoint::new(a.latitude, a.longitude, time);
    }
    let ratio = (time - a.time).num_milliseconds() as f64 / 1000.0 / span;
    GpsPoint::new(
        a.latitude + ratio * (b.latitude - a.latitude),
        a.longitude + ratio * (b.longitude - a.longitude),
        time,
    )
}

/// Interpolate the point at `ratio` (0..=1) of the way from `a` to `b`,
/// position and time alike.
pub fn interpolate_ratio(a: &GpsPoint, b: &GpsPoint, ratio: f64) -> GpsPoint {
    let millis = ((b.time - a.time).num_milliseconds() as f64 * ratio).round() as i64;
    GpsPoint::new(
        a.latitude + ratio * (b.latitude - a.latitude),
        a.longitude + ratio * (b.longitude - a.longitude),
        a.time + chrono::Duration::milliseconds(millis),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GpsPoint::new(51.5074, -0.1278, t(0));
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_polyline_length() {
        assert_eq!(polyline_length(&[]), 0.0);
        assert_eq!(polyline_length(&[GpsPoint::new(51.5, -0.12, t(0))]), 0.0);

        let track = vec![
            GpsPoint::new(51.5074, -0.1278, t(0)),
            GpsPoint::new(51.5080, -0.1280, t(10)),
        ];
        let length = polyline_length(&track);
        assert!(length > 0.0 && length < 100.0); // about 68m
    }

    #[test]
    fn test_meters_to_degrees() {
        let deg = meters_to_degrees(111_320.0, 0.0);
        assert!(approx_eq(deg, 1.0, 0.01));

        // Same distance spans more degrees further from the equator
        assert!(meters_to_degrees(111_320.0, 45.0) > 1.0);
    }

    #[test]
    fn test_interpolate_at_midpoint() {
        let a = GpsPoint::new(0.0, 0.0, t(0));
        let b = GpsPoint::new(1.0, 2.0, t(10));
        let mid = interpolate_at(&a, &b, t(5));
        assert!(approx_eq(mid.latitude, 0.5, 1e-9));
        assert!(approx_eq(mid.longitude, 1.0, 1e-9));
        assert_eq!(mid.time, t(5));
    }

    #[test]
    fn test_interpolate_at_same_time() {
        let a = GpsPoint::new(1.0, 1.0, t(0));
        let b = GpsPoint::new(2.0, 2.0, t(0));
        assert_eq!(interpolate_at(&a, &b, t(0)), a);
    }

    #[test]
    fn test_interpolate_ratio() {
        let a = GpsPoint::new(0.0, 0.0, t(0));
        let b = GpsPoint::new(4.0, 0.0, t(40));
        let p = interpolate_ratio(&a, &b, 0.25);
        assert!(approx_eq(p.latitude, 1.0, 1e-9));
        assert_eq!(p.time, t(10));
    }
}
