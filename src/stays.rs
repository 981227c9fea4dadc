//! Stay-point detection for spatio-temporal segmentation.
//!
//! A stay is a run of consecutive points that remains within `eps` meters of
//! its first point for at least `min_time` seconds. Segments are cut at stays:
//! the piece before a stay ends at the stay's first point and the piece after
//! it starts at the stay's last point.

use crate::geo_utils::haversine_distance;
use crate::GpsPoint;

/// Inclusive index range of a detected stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stay {
    pub start: usize,
    pub end: usize,
}

/// Find stays in time order. Stays never overlap.
pub fn find_stays(points: &[GpsPoint], eps: f64, min_time: f64) -> Vec<Stay> {
    let mut stays = Vec::new();
    let mut i = 0;

    while i < points.len() {
        let anchor = &points[i];
        let mut j = i;
        while j + 1 < points.len() && haversine_distance(anchor, &points[j + 1]) <= eps {
            j += 1;
        }

        if j > i && points[j].seconds_since(anchor) >= min_time {
            stays.push(Stay { start: i, end: j });
            i = j + 1;
        } else {
            i += 1;
        }
    }

    stays
}

/// Split points at the given stays. Pieces shorter than two points are
/// dropped; if nothing usable remains the input is returned whole.
pub fn split_at_stays(points: &[GpsPoint], stays: &[Stay]) -> Vec<Vec<GpsPoint>> {
    let mut pieces = Vec::with_capacity(stays.len() + 1);
    let mut from = 0;

    for stay in stays {
        pieces.push(points[from..=stay.start].to_vec());
        from = stay.end;
    }
    if !points.is_empty() {
        pieces.push(points[from..].to_vec());
    }

    pieces.retain(|piece| piece.len() >= 2);
    if pieces.is_empty() {
        pieces.push(points.to_vec());
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    /// Walk north, wait 5 minutes, walk north again.
    fn walk_wait_walk() -> Vec<GpsPoint> {
        let mut points = Vec::new();
        let mut secs = 0;
        let mut lat = 51.5;
        for _ in 0..10 {
            points.push(GpsPoint::new(lat, -0.12, t(secs)));
            lat += 0.002; // ~220m
            secs += 60;
        }
        for _ in 0..10 {
            points.push(GpsPoint::new(lat, -0.12, t(secs)));
            secs += 30;
        }
        for _ in 0..10 {
            lat += 0.002;
            points.push(GpsPoint::new(lat, -0.12, t(secs)));
            secs += 60;
        }
        points
    }

    #[test]
    fn test_find_single_stay() {
        let points = walk_wait_walk();
        let stays = find_stays(&points, 150.0, 80.0);
        assert_eq!(stays, vec![Stay { start: 10, end: 19 }]);
    }

    #[test]
    fn test_short_pause_is_not_a_stay() {
        let points = walk_wait_walk();
        assert!(find_stays(&points, 150.0, 600.0).is_empty());
    }

    #[test]
    fn test_split_at_stays() {
        let points = walk_wait_walk();
        let stays = find_stays(&points, 150.0, 80.0);
        let pieces = split_at_stays(&points, &stays);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].len(), 11);
        assert_eq!(pieces[1].len(), 11);
        assert_eq!(pieces[0].first(), points.first());
        assert_eq!(pieces[1].last(), points.last());
    }

    #[test]
    fn test_split_without_stays_keeps_everything() {
        let points = walk_wait_walk();
        let pieces = split_at_stays(&points, &[]);
        assert_eq!(pieces, vec![points]);
    }

    #[test]
    fn test_whole_segment_stay() {
        let points: Vec<GpsPoint> = (0..10).map(|i| GpsPoint::new(51.5, -0.12, t(i * 30))).collect();
        let stays = find_stays(&points, 50.0, 80.0);
        assert_eq!(stays, vec![Stay { start: 0, end: 9 }]);
        // Nothing moving remains, the segment survives whole
        assert_eq!(split_at_stays(&points, &stays), vec![points]);
    }
}
