//! Transportation mode inference.
//!
//! Points are cut into time windows of `dt_threshold` seconds. Each window is
//! summarised as [`ModeFeatures`] and labelled by an injected
//! [`ModeClassifier`]; adjacent windows with the same label are merged into a
//! single [`ModeSpan`].

use serde::{Deserialize, Serialize};

use crate::GpsPoint;

/// Label [`SpeedClassifier`] gives to stationary windows.
pub const STOP_LABEL: &str = "stop";

/// Summary of a window of points fed to a classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeFeatures {
    /// Mean speed in m/s
    pub mean_speed: f64,
    /// Max speed in m/s
    pub max_speed: f64,
    /// Mean absolute acceleration in m/s²
    pub mean_abs_acc: f64,
    /// Window duration in seconds
    pub duration: f64,
}

/// Anything that can label a window of movement.
pub trait ModeClassifier {
    fn predict(&self, features: &ModeFeatures) -> String;
}

impl<F> ModeClassifier for F
where
    F: Fn(&ModeFeatures) -> String,
{
    fn predict(&self, features: &ModeFeatures) -> String {
        self(features)
    }
}

/// Threshold classifier on mean speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedClassifier {
    /// Below this mean speed the window is a stop (m/s). Default: 0.5
    pub stop_speed: f64,
    /// Upper bound for walking (m/s). Default: 2.5
    pub walk_speed: f64,
    /// Upper bound for cycling (m/s). Default: 8.0
    pub bike_speed: f64,
}

impl Default for SpeedClassifier {
    fn default() -> Self {
        Self {
            stop_speed: 0.5,
            walk_speed: 2.5,
            bike_speed: 8.0,
        }
    }
}

impl ModeClassifier for SpeedClassifier {
    fn predict(&self, features: &ModeFeatures) -> String {
        let label = if features.mean_speed < self.stop_speed {
            STOP_LABEL
        } else if features.mean_speed < self.walk_speed {
            "foot"
        } else if features.mean_speed < self.bike_speed {
            "bike"
        } else {
            "vehicle"
        };
        label.to_string()
    }
}

/// A labelled, inclusive range of point indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeSpan {
    pub label: String,
    pub from: usize,
    pub to: usize,
}

/// Label the points of a segment.
///
/// `speeds` and `accelerations` are the per-point metrics of the segment
/// (same length as `points`).
pub fn infer_modes(
    points: &[GpsPoint],
    speeds: &[f64],
    accelerations: &[f64],
    classifier: &dyn ModeClassifier,
    remove_stops: bool,
    dt_threshold: f64,
) -> Vec<ModeSpan> {
    let mut spans: Vec<ModeSpan> = Vec::new();

    for (from, to) in time_windows(points, dt_threshold) {
        let features = window_features(points, speeds, accelerations, from, to);
        let label = classifier.predict(&features);

        match spans.last_mut() {
            Some(last) if last.label == label => last.to = to,
            _ => spans.push(ModeSpan { label, from, to }),
        }
    }

    if remove_stops {
        spans.retain(|span| span.label != STOP_LABEL);
    }
    spans
}

/// Inclusive windows covering all points. Consecutive windows share their
/// boundary point so spans stay contiguous.
fn time_windows(points: &[GpsPoint], dt_threshold: f64) -> Vec<(usize, usize)> {
    let mut windows = Vec::new();
    if points.is_empty() {
        return windows;
    }

    let mut from = 0;
    for i in 1..points.len() {
        if points[i].seconds_since(&points[from]) >= dt_threshold {
            windows.push((from, i));
            from = i;
        }
    }
    if from < points.len() - 1 || windows.is_empty() {
        windows.push((from, points.len() - 1));
    }
    windows
}

fn window_features(
    points: &[GpsPoint],
    speeds: &[f64],
    accelerations: &[f64],
    from: usize,
    to: usize,
) -> ModeFeatures {
    // The speed stored at `from` belongs to the previous window
    let first = if to > from { from + 1 } else { from };
    let window_speeds = &speeds[first..=to];
    let window_accs = &accelerations[first..=to];
    let n = window_speeds.len().max(1) as f64;

    ModeFeatures {
        mean_speed: window_speeds.iter().sum::<f64>() / n,
        max_speed: window_speeds.iter().copied().fold(0.0, f64::max),
        mean_abs_acc: window_accs.iter().map(|a| a.abs()).sum::<f64>() / n,
        duration: points[to].seconds_since(&points[from]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::speed_between;
    use chrono::{DateTime, TimeZone, Utc};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    /// 60s on foot (~1.1 m/s), 60s standing, 60s by car (~22 m/s), 5s sampling.
    fn walk_stop_drive() -> (Vec<GpsPoint>, Vec<f64>, Vec<f64>) {
        let mut points = vec![GpsPoint::new(51.5, -0.12, t(0))];
        let mut lat = 51.5;
        for i in 1..=36 {
            let step = match i {
                1..=12 => 0.00005,
                13..=24 => 0.0,
                _ => 0.001,
            };
            lat += step;
            points.push(GpsPoint::new(lat, -0.12, t(i * 5)));
        }
        let mut speeds = vec![0.0];
        speeds.extend(points.windows(2).map(|w| speed_between(&w[0], &w[1])));
        let accelerations = vec![0.0; points.len()];
        (points, speeds, accelerations)
    }

    #[test]
    fn test_speed_classifier_labels() {
        let classifier = SpeedClassifier::default();
        let features = |mean_speed| ModeFeatures {
            mean_speed,
            max_speed: mean_speed,
            mean_abs_acc: 0.0,
            duration: 10.0,
        };
        assert_eq!(classifier.predict(&features(0.1)), "stop");
        assert_eq!(classifier.predict(&features(1.4)), "foot");
        assert_eq!(classifier.predict(&features(5.0)), "bike");
        assert_eq!(classifier.predict(&features(20.0)), "vehicle");
    }

    #[test]
    fn test_infer_modes_merges_windows() {
        let (points, speeds, accs) = walk_stop_drive();
        let spans = infer_modes(&points, &speeds, &accs, &SpeedClassifier::default(), false, 10.0);

        let labels: Vec<&str> = spans.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["foot", "stop", "vehicle"]);
        assert_eq!(spans[0].from, 0);
        assert_eq!(spans[2].to, points.len() - 1);
        for pair in spans.windows(2) {
            assert_eq!(pair[0].to, pair[1].from);
        }
    }

    #[test]
    fn test_infer_modes_remove_stops() {
        let (points, speeds, accs) = walk_stop_drive();
        let spans = infer_modes(&points, &speeds, &accs, &SpeedClassifier::default(), true, 10.0);
        assert!(spans.iter().all(|s| s.label != STOP_LABEL));
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn test_closure_classifier() {
        let (points, speeds, accs) = walk_stop_drive();
        let always_boat = |_: &ModeFeatures| "boat".to_string();
        let spans = infer_modes(&points, &speeds, &accs, &always_boat, false, 10.0);
        assert_eq!(
            spans,
            vec![ModeSpan {
                label: "boat".to_string(),
                from: 0,
                to: points.len() - 1
            }]
        );
    }
}
