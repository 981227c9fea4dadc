//! Douglas-Peucker simplification of segments.
//!
//! Two flavours:
//! - [`douglas_peucker`]: classic geometric simplification through `geo`.
//!   Keeps the shape, may distort speed between surviving points.
//! - [`time_synchronized`]: TD-TR. The deviation of a point is measured
//!   against the position interpolated *at its timestamp* between the
//!   endpoints, so speed between surviving points is preserved.
//!
//! The first and last point always survive.

use geo::{Coord, LineString, SimplifyIdx};

use crate::geo_utils::{haversine_distance, interpolate_at, mean_latitude, meters_to_degrees};
use crate::GpsPoint;

/// Geometric Douglas-Peucker with a tolerance in meters.
pub fn douglas_peucker(points: &[GpsPoint], dist_threshold: f64) -> Vec<GpsPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let epsilon = meters_to_degrees(dist_threshold, mean_latitude(points));
    let line: LineString<f64> = points
        .iter()
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect();

    line.simplify_idx(&epsilon)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// Time-synchronised Douglas-Peucker with a tolerance in meters.
pub fn time_synchronized(points: &[GpsPoint], dist_threshold: f64) -> Vec<GpsPoint> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let (a, b) = (&points[start], &points[end]);
        let (split, deviation) = (start + 1..end)
            .map(|k| {
                let expected = interpolate_at(a, b, points[k].time);
                (k, haversine_distance(&points[k], &expected))
            })
            .fold((start, 0.0), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });

        if deviation > dist_threshold {
            keep[split] = true;
            stack.push((start, split));
            stack.push((split, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter(|(_, kept)| *kept)
        .map(|(p, _)| *p)
        .collect()
}
