//! Point-level filters: speed outlier removal and Kalman smoothing.
//!
//! Both filters keep the first and last point of a segment and never change
//! timestamps, so segment start/end times survive them.

use serde::{Deserialize, Serialize};

use crate::geo_utils::speed_between;
use crate::GpsPoint;

/// Direction of the smoothing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmoothStrategy {
    /// Single pass from the first point to the last.
    Forward,
    /// Single pass from the last point to the first.
    Backward,
    /// Average of a forward and a backward pass. Cancels the lag each
    /// single pass introduces.
    Inverse,
}

/// Drop interior points reached and left at a speed more than `var` standard
/// deviations away from the mean speed of the segment.
pub fn remove_noise(points: &[GpsPoint], var: f64) -> Vec<GpsPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let speeds: Vec<f64> = points
        .windows(2)
        .map(|w| speed_between(&w[0], &w[1]))
        .collect();
    let n = speeds.len() as f64;
    let mean = speeds.iter().sum::<f64>() / n;
    let std = (speeds.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std < 1e-6 {
        return points.to_vec();
    }

    let is_outlier = |speed: f64| (speed - mean).abs() / std > var;
    let last = points.len() - 1;
    points
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            *i == 0 || *i == last || !(is_outlier(speeds[i - 1]) && is_outlier(speeds[*i]))
        })
        .map(|(_, p)| *p)
        .collect()
}

/// Smooth latitude and longitude independently with a constant-position
/// Kalman filter.
///
/// `noise` is the ratio of measurement noise to process noise; 0 leaves the
/// points untouched.
pub fn smooth(points: &[GpsPoint], strategy: SmoothStrategy, noise: f64) -> Vec<GpsPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let lats: Vec<f64> = points.iter().map(|p| p.latitude).collect();
    let lngs: Vec<f64> = points.iter().map(|p| p.longitude).collect();

    let (lats, lngs) = match strategy {
        SmoothStrategy::Forward => (forward_pass(&lats, noise), forward_pass(&lngs, noise)),
        SmoothStrategy::Backward => (backward_pass(&lats, noise), backward_pass(&lngs, noise)),
        SmoothStrategy::Inverse => (
            average(&forward_pass(&lats, noise), &backward_pass(&lats, noise)),
            average(&forward_pass(&lngs, noise), &backward_pass(&lngs, noise)),
        ),
    };

    let last = points.len() - 1;
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if i == 0 || i == last {
                *p
            } else {
                GpsPoint::new(lats[i], lngs[i], p.time)
            }
        })
        .collect()
}

fn forward_pass(values: &[f64], noise: f64) -> Vec<f64> {
    let process = 1.0;
    let measurement = noise.max(0.0);
    if measurement == 0.0 {
        return values.to_vec();
    }

    let mut estimate = values[0];
    let mut variance = measurement;
    let mut out = Vec::with_capacity(values.len());
    out.push(estimate);

    for &z in &values[1..] {
        variance += process;
        let gain = variance / (variance + measurement);
        estimate += gain * (z - estimate);
        variance *= 1.0 - gain;
        out.push(estimate);
    }
    out
}

fn backward_pass(values: &[f64], noise: f64) -> Vec<f64> {
    let reversed: Vec<f64> = values.iter().rev().copied().collect();
    let mut out = forward_pass(&reversed, noise);
    out.reverse();
    out
}

fn average(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| (x + y) / 2.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn line(n: usize) -> Vec<GpsPoint> {
        (0..n)
            .map(|i| GpsPoint::new(51.5 + i as f64 * 0.0001, -0.12, t(i as i64 * 5)))
            .collect()
    }

    #[test]
    fn test_remove_noise_drops_spike() {
        let mut points = line(20);
        // ~1.1km jump in 5s
        points[10].latitude += 0.01;
        let cleaned = remove_noise(&points, 2.0);
        assert_eq!(cleaned.len(), 19);
        assert!(!cleaned.contains(&points[10]));
        assert_eq!(cleaned[0], points[0]);
        assert_eq!(cleaned.last(), points.last());
    }

    #[test]
    fn test_remove_noise_keeps_uniform_track() {
        let points = line(10);
        assert_eq!(remove_noise(&points, 2.0), points);
    }

    #[test]
    fn test_smooth_zero_noise_is_identity() {
        let points = line(10);
        for strategy in [SmoothStrategy::Forward, SmoothStrategy::Backward, SmoothStrategy::Inverse] {
            assert_eq!(smooth(&points, strategy, 0.0), points);
        }
    }

    #[test]
    fn test_smooth_reduces_zigzag() {
        let points: Vec<GpsPoint> = (0..30)
            .map(|i| {
                let wobble = if i % 2 == 0 { 0.0002 } else { -0.0002 };
                GpsPoint::new(51.5 + i as f64 * 0.0001, -0.12 + wobble, t(i as i64 * 5))
            })
            .collect();
        let smoothed = smooth(&points, SmoothStrategy::Inverse, 4.0);

        let spread = |pts: &[GpsPoint]| {
            pts[1..pts.len() - 1]
                .iter()
                .map(|p| (p.longitude + 0.12).abs())
                .fold(0.0, f64::max)
        };
        assert!(spread(&smoothed) < spread(&points));
        assert_eq!(smoothed.len(), points.len());
        assert!(smoothed.iter().zip(&points).all(|(a, b)| a.time == b.time));
    }
}
