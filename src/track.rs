//! # Track
//!
//! A named, time-ordered collection of segments and the orchestration over
//! them:
//!
//! - Housekeeping: construction, bounds, point lookup, naming
//! - The raw track → trip pipeline ([`Track::to_trip`]) and its stages
//! - Directional similarity through an R-tree spatial join
//!   ([`Track::similarity`])
//! - Merge-and-fit of matched segments ([`Track::merge_and_fit`])
//!
//! ## Stage contract
//!
//! Every stage mutates the track in place and hands back `&mut Track` so
//! stages chain. Stages consuming metrics (`segment`, velocity-aware
//! `simplify`, `infer_transportation_modes`) fail with
//! [`TripError::MissingMetrics`] unless [`Track::compute_metrics`] ran after
//! the last structural change. The first failing segment aborts the stage.
//!
//! ## Ordering
//!
//! Segments are sorted by start time once, at construction. Stages that
//! rebuild the list (segmentation) concatenate results in parent order and
//! do not sort again.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{TripConfig, DEFAULT_NAME_FORMAT};
use crate::filters::SmoothStrategy;
use crate::location::LocationProvider;
use crate::modes::ModeClassifier;
use crate::similarity::{
    AmdSimilarity, Correspondence, SegmentDiff, SegmentSimilarity, TrackSimilarity,
};
use crate::spatial_index::SegmentIndex;
use crate::{Bounds, GpsPoint, OptionExt, Result, Segment, TripError};

/// Name given by [`Track::generate_name`] to a track without segments.
pub const EMPTY_TRACK_NAME: &str = "EmptyTrack";

/// A named collection of segments. `Clone` is a full deep copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    pub segments: Vec<Segment>,
    /// Set once [`Track::preprocess`] has run. Advisory only.
    pub preprocessed: bool,
}

impl Track {
    /// Create a track, sorting segments by start time (stable).
    ///
    /// Segments without points have no start time and are rejected.
    pub fn new(name: impl Into<String>, mut segments: Vec<Segment>) -> Result<Self> {
        if segments.iter().any(Segment::is_empty) {
            return Err(TripError::EmptySegment);
        }
        segments.sort_by_key(|s| s.start_time());

        Ok(Self {
            name: name.into(),
            segments,
            preprocessed: false,
        })
    }

    /// Segment at index `i`.
    pub fn segment_at(&self, i: usize) -> Result<&Segment> {
        self.segments.get(i).ok_or_out_of_range(i, self.segments.len())
    }

    /// Earliest segment start time, `None` without segments.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.segments.iter().filter_map(Segment::start_time).min()
    }

    /// `<time of first point>.gpx` using `format` (strftime), or
    /// `"EmptyTrack"`. An invalid format falls back to `%Y-%m-%d`.
    pub fn generate_name(&self, format: &str) -> String {
        let first = match self.segments.first().and_then(|s| s.points().first()) {
            Some(point) => point,
            None => return EMPTY_TRACK_NAME.to_string(),
        };

        let mut name = String::new();
        if write!(name, "{}", first.time.format(format)).is_err() {
            name = first.time.format(DEFAULT_NAME_FORMAT).to_string();
        }
        name.push_str(".gpx");
        name
    }

    /// Union of all segment bounds. A track without segments reports
    /// [`Bounds::EMPTY`], an inverted box callers must check for.
    pub fn bounds(&self) -> Bounds {
        self.segments
            .iter()
            .filter_map(Segment::bounds)
            .fold(Bounds::EMPTY, |acc, b| acc.union(&b))
    }

    /// `(segment index, point index)` of the first segment containing `point`.
    pub fn point_index(&self, point: &GpsPoint) -> Option<(usize, usize)> {
        self.segments
            .iter()
            .enumerate()
            .find_map(|(i, segment)| segment.point_index(point).map(|j| (i, j)))
    }

    pub fn has_point(&self, point: &GpsPoint) -> bool {
        self.point_index(point).is_some()
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Turn a raw track into a trip: smooth, segment, simplify, recomputing
    /// metrics between structural stages.
    ///
    /// A non-empty `name` becomes the track name; otherwise one is generated.
    /// Noise removal only runs when `config.enable_noise_removal` is set.
    pub fn to_trip(&mut self, name: &str, config: &TripConfig) -> Result<&mut Self> {
        let start = Instant::now();
        let points_before: usize = self.segments.iter().map(Segment::len).sum();

        let name = if name.is_empty() {
            self.generate_name(&config.name_format)
        } else {
            name.to_string()
        };

        if config.enable_noise_removal {
            self.remove_noise(config.noise_var);
        }

        self.smooth(config.smooth_strategy, config.smooth_noise)
            .compute_metrics()?
            .segment(config.segment_eps, config.segment_min_time)?
            .compute_metrics()?
            .simplify(config.simplify_topology_only, config.simplify_dist_threshold)?
            .compute_metrics()?;

        self.name = name;

        let points_after: usize = self.segments.iter().map(Segment::len).sum();
        info!(
            "Trip '{}': {} segments, {} -> {} points in {:?}",
            self.name,
            self.segments.len(),
            points_before,
            points_after,
            start.elapsed()
        );
        Ok(self)
    }

    /// Remove speed outliers from every segment.
    pub fn remove_noise(&mut self, var: f64) -> &mut Self {
        for segment in &mut self.segments {
            segment.remove_noise(var);
        }
        self
    }

    /// Smooth every segment.
    pub fn smooth(&mut self, strategy: SmoothStrategy, noise: f64) -> &mut Self {
        #[cfg(feature = "parallel")]
        self.segments.par_iter_mut().for_each(|segment| {
            segment.smooth(strategy, noise);
        });

        #[cfg(not(feature = "parallel"))]
        for segment in &mut self.segments {
            segment.smooth(strategy, noise);
        }

        self
    }

    /// Compute metrics for every segment.
    pub fn compute_metrics(&mut self) -> Result<&mut Self> {
        for segment in &mut self.segments {
            segment.compute_metrics()?;
        }
        Ok(self)
    }

    /// Spatio-temporal segmentation. The segment list is replaced by the
    /// pieces of each segment, in parent order; it can only grow.
    pub fn segment(&mut self, eps: f64, min_time: f64) -> Result<&mut Self> {
        let mut pieces = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            pieces.extend(segment.segment(eps, min_time)?);
        }
        debug!("Segmentation: {} -> {} segments", self.segments.len(), pieces.len());
        self.segments = pieces;
        Ok(self)
    }

    /// Simplify every segment.
    pub fn simplify(&mut self, topology_only: bool, dist_threshold: f64) -> Result<&mut Self> {
        #[cfg(feature = "parallel")]
        self.segments.par_iter_mut().try_for_each(|segment| {
            segment.simplify(topology_only, dist_threshold).map(|_| ())
        })?;

        #[cfg(not(feature = "parallel"))]
        for segment in &mut self.segments {
            segment.simplify(topology_only, dist_threshold)?;
        }

        Ok(self)
    }

    /// Preprocess every segment and mark the track as preprocessed.
    pub fn preprocess(&mut self, destructive: bool, max_acc: f64) -> Result<&mut Self> {
        for segment in &mut self.segments {
            segment.preprocess(destructive, max_acc)?;
        }
        self.preprocessed = true;
        Ok(self)
    }

    /// Label transportation modes on every segment.
    pub fn infer_transportation_modes(
        &mut self,
        classifier: &dyn ModeClassifier,
        remove_stops: bool,
        dt_threshold: f64,
    ) -> Result<&mut Self> {
        for segment in &mut self.segments {
            segment.infer_transportation_mode(classifier, remove_stops, dt_threshold)?;
        }
        Ok(self)
    }

    /// Resolve start and end locations of every segment.
    pub fn infer_location(
        &mut self,
        provider: &dyn LocationProvider,
        max_distance: f64,
        limit: usize,
    ) -> Result<&mut Self> {
        for segment in &mut self.segments {
            segment.infer_location(provider, max_distance, limit)?;
        }
        Ok(self)
    }

    // ========================================================================
    // Similarity & merge
    // ========================================================================

    /// How well `other` is explained by this track, scored with
    /// [`AmdSimilarity`] defaults. See [`Track::similarity_with`].
    pub fn similarity(&self, other: &Track) -> TrackSimilarity<SegmentDiff> {
        self.similarity_with(other, &AmdSimilarity::default())
    }

    /// How well `other` is explained by this track.
    ///
    /// Segments of this track are indexed by bounding box. Each segment of
    /// `other` is scored against every segment whose box intersects its own
    /// and keeps the best (ties go to the lowest index here). Segments with no
    /// intersecting box score 0 and get no correspondence. The overall score
    /// is the mean over `other`'s segments, 0 when it has none.
    pub fn similarity_with<S: SegmentSimilarity>(
        &self,
        other: &Track,
        scorer: &S,
    ) -> TrackSimilarity<S::Diff> {
        let start = Instant::now();
        let index = SegmentIndex::from_segments(&self.segments);

        let best: Vec<Option<(usize, f64, S::Diff)>> = other
            .segments
            .iter()
            .map(|query| {
                let scored = self
                    .candidates(&index, query)
                    .into_iter()
                    .map(|i| (i, scorer.similarity(query, &self.segments[i])));
                pick_best(scored)
            })
            .collect();

        let result = aggregate(best);
        info!(
            "Similarity of '{}' against '{}': {:.3} ({}/{} segments matched) in {:?}",
            other.name,
            self.name,
            result.score,
            result.match_count(),
            other.segments.len(),
            start.elapsed()
        );
        result
    }

    /// Same as [`Track::similarity_with`], scoring candidate pairs with rayon.
    #[cfg(feature = "parallel")]
    pub fn similarity_with_parallel<S>(&self, other: &Track, scorer: &S) -> TrackSimilarity<S::Diff>
    where
        S: SegmentSimilarity + Sync,
        S::Diff: Send,
    {
        let start = Instant::now();
        let index = SegmentIndex::from_segments(&self.segments);

        let best: Vec<Option<(usize, f64, S::Diff)>> = other
            .segments
            .par_iter()
            .map(|query| {
                let scored: Vec<(usize, (f64, S::Diff))> = self
                    .candidates(&index, query)
                    .into_par_iter()
                    .map(|i| (i, scorer.similarity(query, &self.segments[i])))
                    .collect();
                pick_best(scored)
            })
            .collect();

        let result = aggregate(best);
        info!(
            "Parallel similarity of '{}' against '{}': {:.3} in {:?}",
            other.name,
            self.name,
            result.score,
            start.elapsed()
        );
        result
    }

    fn candidates(&self, index: &SegmentIndex, query: &Segment) -> Vec<usize> {
        match query.bounds() {
            Some(bounds) => index.intersecting(&bounds),
            None => Vec::new(),
        }
    }

    /// Fuse matched segments of `other` into this track.
    ///
    /// Each correspondence merges `other.segments[other_index]` into
    /// `self.segments[self_index]` using its diff. Correspondences sharing a
    /// `self_index` are merged together, against the segment as it was before
    /// this call. Segments without a correspondence are left untouched, and
    /// the track is unchanged when any index is out of range.
    pub fn merge_and_fit(
        &mut self,
        other: &Track,
        correspondences: &[Option<Correspondence<SegmentDiff>>],
    ) -> Result<&mut Self> {
        let mut groups: BTreeMap<usize, Vec<(&Segment, &SegmentDiff)>> = BTreeMap::new();
        for correspondence in correspondences.iter().flatten() {
            let theirs = other.segment_at(correspondence.other_index)?;
            self.segment_at(correspondence.self_index)?;
            groups
                .entry(correspondence.self_index)
                .or_default()
                .push((theirs, &correspondence.diff));
        }

        let mut fitted = Vec::with_capacity(groups.len());
        for (self_index, merges) in &groups {
            let mut mine = self.segment_at(*self_index)?.clone();
            mine.merge_and_fit_all(merges)?;
            fitted.push((*self_index, mine));
        }

        for (self_index, mine) in fitted {
            self.segments[self_index] = mine;
        }
        debug!(
            "Merged segments of '{}' into {} segments of '{}'",
            other.name,
            groups.len(),
            self.name
        );
        Ok(self)
    }
}

/// Highest score wins; candidates arrive in ascending index so the first of
/// equal scores is the lowest index. Scores that are not finite never win.
fn pick_best<D>(scored: impl IntoIterator<Item = (usize, (f64, D))>) -> Option<(usize, f64, D)> {
    let mut best: Option<(usize, f64, D)> = None;
    for (index, (score, diff)) in scored {
        if !score.is_finite() {
            continue;
        }
        let better = match &best {
            Some((_, best_score, _)) => score > *best_score,
            None => true,
        };
        if better {
            best = Some((index, score, diff));
        }
    }
    best
}

fn aggregate<D>(best: Vec<Option<(usize, f64, D)>>) -> TrackSimilarity<D> {
    let count = best.len();
    let mut total = 0.0;
    let correspondences = best
        .into_iter()
        .enumerate()
        .map(|(other_index, found)| {
            found.map(|(self_index, score, diff)| {
                total += score;
                Correspondence {
                    self_index,
                    other_index,
                    diff,
                }
            })
        })
        .collect();

    TrackSimilarity {
        score: if count == 0 { 0.0 } else { total / count as f64 },
        correspondences,
    }
}
