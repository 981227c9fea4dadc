//! Pairwise segment similarity and track-level match results.
//!
//! [`AmdSimilarity`] scores how well a *query* segment is explained by a
//! *candidate* segment using the Average Minimum Distance (AMD): both are
//! resampled to the same number of points, and for each query point the
//! distance to the nearest candidate point is averaged. The score is
//! directional; `similarity(a, b)` and `similarity(b, a)` differ when one
//! segment only covers part of the other.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::geo_utils::{haversine_distance, interpolate_ratio, polyline_length};
use crate::{GpsPoint, Segment};

/// Scores a query segment against a candidate segment.
///
/// Returns a score in `[0, 1]` (higher is better) and an opaque diff that
/// [`Segment::merge_and_fit`] or other consumers may use as alignment hints.
pub trait SegmentSimilarity {
    type Diff;

    fn similarity(&self, query: &Segment, candidate: &Segment) -> (f64, Self::Diff);
}

/// Configuration for [`AmdSimilarity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// AMD at or below which the score is 1.0, in meters.
    /// Default: 10.0
    pub perfect_threshold: f64,

    /// AMD at or above which the score is 0.0, in meters.
    /// Default: 100.0
    pub zero_threshold: f64,

    /// Number of points both segments are resampled to before comparison.
    /// Default: 50
    pub resample_count: u32,

    /// Query points closer than this to their nearest candidate point are
    /// paired in the diff, in meters.
    /// Default: 20.0
    pub match_threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            perfect_threshold: 10.0,
            zero_threshold: 100.0,
            resample_count: 50,
            match_threshold: 20.0,
        }
    }
}

/// A query point paired with its nearest candidate point (indices into the
/// original, not resampled, points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointPair {
    pub query: usize,
    pub candidate: usize,
}

/// Diff produced by [`AmdSimilarity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDiff {
    /// Average Minimum Distance from query to candidate in meters
    pub amd: f64,
    /// Nearest-point pairs within the match threshold, in query order
    pub pairs: Vec<PointPair>,
}

impl Default for SegmentDiff {
    fn default() -> Self {
        Self {
            amd: f64::INFINITY,
            pairs: Vec::new(),
        }
    }
}

/// AMD-based segment scorer.
#[derive(Debug, Clone, Default)]
pub struct AmdSimilarity {
    pub config: SimilarityConfig,
}

impl AmdSimilarity {
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }
}

impl SegmentSimilarity for AmdSimilarity {
    type Diff = SegmentDiff;

    fn similarity(&self, query: &Segment, candidate: &Segment) -> (f64, SegmentDiff) {
        if query.is_empty() || candidate.is_empty() {
            return (0.0, SegmentDiff::default());
        }

        let count = self.config.resample_count.max(2) as usize;
        let resampled_query = resample(query.points(), count);
        let resampled_candidate = resample(candidate.points(), count);

        let amd = average_min_distance(&resampled_query, &resampled_candidate);
        let score = amd_to_score(amd, self.config.perfect_threshold, self.config.zero_threshold);
        let pairs = nearest_pairs(query.points(), candidate.points(), self.config.match_threshold);

        (score, SegmentDiff { amd, pairs })
    }
}

// ============================================================================
// Track-level results
// ============================================================================

/// Best match of one segment of the compared track.
#[derive(Debug, Clone, PartialEq)]
pub struct Correspondence<D> {
    /// Index into the segments of the track `similarity` was called on
    pub self_index: usize,
    /// Index into the segments of the compared track
    pub other_index: usize,
    pub diff: D,
}

/// Result of [`Track::similarity`](crate::Track::similarity).
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSimilarity<D> {
    /// Mean of the per-segment best scores (unmatched segments count as 0)
    pub score: f64,
    /// One entry per segment of the compared track, in order; `None` where
    /// no segment's bounding box intersected
    pub correspondences: Vec<Option<Correspondence<D>>>,
}

impl<D> TrackSimilarity<D> {
    /// The matched entries only.
    pub fn matches(&self) -> impl Iterator<Item = &Correspondence<D>> {
        self.correspondences.iter().flatten()
    }

    pub fn match_count(&self) -> usize {
        self.matches().count()
    }
}

// ============================================================================
// AMD helpers
// ============================================================================

/// Average over `query` of the distance to the nearest point of `candidate`.
pub fn average_min_distance(query: &[GpsPoint], candidate: &[GpsPoint]) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return f64::INFINITY;
    }

    let total_min_dist: f64 = query
        .iter()
        .map(|q| {
            candidate
                .iter()
                .map(|c| haversine_distance(q, c))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();

    total_min_dist / query.len() as f64
}

/// Map an AMD to `[0, 1]`: 1 at or below `perfect`, 0 at or above `zero`,
/// linear in between.
pub fn amd_to_score(amd: f64, perfect: f64, zero: f64) -> f64 {
    if amd <= perfect {
        return 1.0;
    }
    if amd >= zero {
        return 0.0;
    }
    1.0 - (amd - perfect) / (zero - perfect)
}

/// Resample to `target_count` points evenly spaced by distance. Timestamps
/// are interpolated along with positions.
pub fn resample(points: &[GpsPoint], target_count: usize) -> Vec<GpsPoint> {
    if points.len() < 2 || points.len() == target_count || target_count < 2 {
        return points.to_vec();
    }

    let total_dist = polyline_length(points);
    if total_dist == 0.0 {
        return points[..target_count.min(points.len())].to_vec();
    }

    let step_dist = total_dist / (target_count - 1) as f64;
    let mut resampled = vec![points[0]];

    let mut accumulated = 0.0;
    let mut next_threshold = step_dist;

    for w in points.windows(2) {
        let (prev, curr) = (&w[0], &w[1]);
        let seg_dist = haversine_distance(prev, curr);

        while seg_dist > 0.0
            && accumulated + seg_dist >= next_threshold
            && resampled.len() < target_count - 1
        {
            let ratio = (next_threshold - accumulated) / seg_dist;
            resampled.push(interpolate_ratio(prev, curr, ratio));
            next_threshold += step_dist;
        }

        accumulated += seg_dist;
    }

    if let Some(last) = points.last() {
        resampled.push(*last);
    }
    resampled
}

/// Candidate point for nearest-neighbour lookups.
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlng = self.lng - point[1];
        dlat * dlat + dlng * dlng
    }
}

/// Pair each query point with its nearest candidate point when closer than
/// `threshold` meters.
fn nearest_pairs(query: &[GpsPoint], candidate: &[GpsPoint], threshold: f64) -> Vec<PointPair> {
    let tree = RTree::bulk_load(
        candidate
            .iter()
            .enumerate()
            .map(|(idx, p)| IndexedPoint {
                idx,
                lat: p.latitude,
                lng: p.longitude,
            })
            .collect(),
    );

    query
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            let nearest = tree.nearest_neighbor(&[p.latitude, p.longitude])?;
            let distance = haversine_distance(p, &candidate[nearest.idx]);
            (distance <= threshold).then_some(PointPair {
                query: i,
                candidate: nearest.idx,
            })
        })
        .collect()
}
