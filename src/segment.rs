//! Segments: contiguous runs of timestamped points.
//!
//! A segment owns its points plus the values derived from them. Structural
//! operations (noise removal, smoothing, simplification, merging) replace the
//! points and invalidate the derived [`SegmentMetrics`] and mode spans; stages
//! that consume metrics fail with [`TripError::MissingMetrics`] until
//! [`Segment::compute_metrics`] runs again.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::filters::{self, SmoothStrategy};
use crate::geo_utils::{polyline_length, speed_between};
use crate::location::{Location, LocationProvider};
use crate::modes::{self, ModeClassifier, ModeSpan};
use crate::similarity::SegmentDiff;
use crate::{simplify, stays};
use crate::{Bounds, GpsPoint, OptionExt, Result, TripError};

/// Values derived from a segment's points by [`Segment::compute_metrics`].
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMetrics {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub bounds: Bounds,
    /// Length in meters
    pub length: f64,
    /// Duration in seconds
    pub duration: f64,
    /// Speed reaching each point in m/s (0 for the first point)
    pub speeds: Vec<f64>,
    /// Acceleration reaching each point in m/s² (0 for the first point)
    pub accelerations: Vec<f64>,
}

/// An ordered run of GPS points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    points: Vec<GpsPoint>,
    #[serde(default)]
    pub location_from: Option<Location>,
    #[serde(default)]
    pub location_to: Option<Location>,
    #[serde(default)]
    pub transportation_modes: Vec<ModeSpan>,
    #[serde(skip)]
    metrics: Option<SegmentMetrics>,
}

impl Segment {
    /// Create a segment from points in time order. No metrics are computed.
    pub fn new(points: Vec<GpsPoint>) -> Self {
        Self {
            points,
            location_from: None,
            location_to: None,
            transportation_modes: Vec::new(),
            metrics: None,
        }
    }

    pub fn points(&self) -> &[GpsPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point at index `i`.
    pub fn point_at(&self, i: usize) -> Result<&GpsPoint> {
        self.points.get(i).ok_or_out_of_range(i, self.points.len())
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.time)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.time)
    }

    /// Bounding box of the points, `None` for an empty segment.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }

    /// Index of the first point equal to `point`.
    pub fn point_index(&self, point: &GpsPoint) -> Option<usize> {
        self.points.iter().position(|p| p == point)
    }

    /// Metrics from the last [`compute_metrics`](Self::compute_metrics), if
    /// still valid.
    pub fn metrics(&self) -> Option<&SegmentMetrics> {
        self.metrics.as_ref()
    }

    fn require_metrics(&self, stage: &'static str) -> Result<&SegmentMetrics> {
        self.metrics
            .as_ref()
            .ok_or(TripError::MissingMetrics { stage })
    }

    /// Replace the points. Derived values no longer match and are dropped.
    fn set_points(&mut self, points: Vec<GpsPoint>) {
        self.points = points;
        self.metrics = None;
        self.transportation_modes.clear();
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    /// Compute length, duration, bounds and per-point speed/acceleration.
    pub fn compute_metrics(&mut self) -> Result<&mut Self> {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(TripError::EmptySegment),
        };

        let mut speeds = Vec::with_capacity(self.points.len());
        let mut accelerations = Vec::with_capacity(self.points.len());
        speeds.push(0.0);
        accelerations.push(0.0);

        for (i, w) in self.points.windows(2).enumerate() {
            let speed = speed_between(&w[0], &w[1]);
            let dt = w[1].seconds_since(&w[0]);
            let acc = if dt > 0.0 { (speed - speeds[i]) / dt } else { 0.0 };
            speeds.push(speed);
            accelerations.push(acc);
        }

        self.metrics = Some(SegmentMetrics {
            start_time: first.time,
            end_time: last.time,
            bounds: Bounds::from_points(&self.points).unwrap_or(Bounds::EMPTY),
            length: polyline_length(&self.points),
            duration: last.seconds_since(&first),
            speeds,
            accelerations,
        });
        Ok(self)
    }

    // ========================================================================
    // Structural stages
    // ========================================================================

    /// Drop speed outliers, see [`filters::remove_noise`].
    pub fn remove_noise(&mut self, var: f64) -> &mut Self {
        let cleaned = filters::remove_noise(&self.points, var);
        if cleaned.len() != self.points.len() {
            debug!("Noise removal dropped {} points", self.points.len() - cleaned.len());
        }
        self.set_points(cleaned);
        self
    }

    /// Smooth positions in place, see [`filters::smooth`].
    pub fn smooth(&mut self, strategy: SmoothStrategy, noise: f64) -> &mut Self {
        let smoothed = filters::smooth(&self.points, strategy, noise);
        self.set_points(smoothed);
        self
    }

    /// Cut the segment at stays of at least `min_time` seconds within `eps`
    /// meters. Always returns at least one segment; never merges.
    ///
    /// The first piece keeps `location_from`, the last keeps `location_to`.
    pub fn segment(&self, eps: f64, min_time: f64) -> Result<Vec<Segment>> {
        self.require_metrics("segment")?;

        let found = stays::find_stays(&self.points, eps, min_time);
        let pieces = stays::split_at_stays(&self.points, &found);
        debug!(
            "Segmentation found {} stays, {} pieces from {} points",
            found.len(),
            pieces.len(),
            self.points.len()
        );

        let count = pieces.len();
        Ok(pieces
            .into_iter()
            .enumerate()
            .map(|(i, points)| {
                let mut piece = Segment::new(points);
                if i == 0 {
                    piece.location_from = self.location_from.clone();
                }
                if i == count - 1 {
                    piece.location_to = self.location_to.clone();
                }
                piece
            })
            .collect())
    }

    /// Reduce the number of points.
    ///
    /// With `topology_only` the plain Douglas-Peucker shape simplification is
    /// used; otherwise the time-synchronised variant, which needs metrics.
    pub fn simplify(&mut self, topology_only: bool, dist_threshold: f64) -> Result<&mut Self> {
        let simplified = if topology_only {
            simplify::douglas_peucker(&self.points, dist_threshold)
        } else {
            self.require_metrics("simplify")?;
            simplify::time_synchronized(&self.points, dist_threshold)
        };
        debug!("Simplified {} -> {} points", self.points.len(), simplified.len());
        self.set_points(simplified);
        Ok(self)
    }

    /// Drop duplicate timestamps and, when `destructive`, points reached with
    /// an acceleration above `max_acc`. Leaves metrics computed.
    pub fn preprocess(&mut self, destructive: bool, max_acc: f64) -> Result<&mut Self> {
        let mut points = self.points.clone();
        points.dedup_by(|b, a| a.time == b.time);
        if points.len() != self.points.len() {
            self.set_points(points);
        }
        self.compute_metrics()?;

        if destructive {
            let accelerations = &self.require_metrics("preprocess")?.accelerations;
            let kept: Vec<GpsPoint> = self
                .points
                .iter()
                .zip(accelerations)
                .enumerate()
                .filter(|(i, (_, acc))| *i == 0 || **acc <= max_acc)
                .map(|(_, (p, _))| *p)
                .collect();

            if kept.len() != self.points.len() {
                debug!(
                    "Preprocessing dropped {} points above {} m/s²",
                    self.points.len() - kept.len(),
                    max_acc
                );
                self.set_points(kept);
                self.compute_metrics()?;
            }
        }
        Ok(self)
    }

    /// Fuse a second recording of the same stretch into this one.
    ///
    /// `diff` comes from scoring `other` (as query) against `self` (as
    /// candidate): every paired point of `self` moves to the midpoint between
    /// itself and the mean of its paired points in `other`. Points of `other`
    /// recorded before or after this segment's time span are merged in, and
    /// the result is ordered by time. Nothing changes if an index in `diff` is
    /// out of range.
    pub fn merge_and_fit(&mut self, other: &Segment, diff: &SegmentDiff) -> Result<&mut Self> {
        self.merge_and_fit_all(&[(other, diff)])
    }

    /// [`merge_and_fit`](Self::merge_and_fit) for several recordings at once.
    ///
    /// Every diff indexes the points as they are before this call, so all
    /// pairs are fitted first and outside points are inserted afterwards.
    pub fn merge_and_fit_all(&mut self, merges: &[(&Segment, &SegmentDiff)]) -> Result<&mut Self> {
        let mut sums = vec![(0.0, 0.0, 0usize); self.points.len()];
        for (other, diff) in merges {
            for pair in &diff.pairs {
                let theirs = other.point_at(pair.query)?;
                let len = sums.len();
                let slot = sums.get_mut(pair.candidate).ok_or_out_of_range(pair.candidate, len)?;
                slot.0 += theirs.latitude;
                slot.1 += theirs.longitude;
                slot.2 += 1;
            }
        }

        let mut points: Vec<GpsPoint> = self
            .points
            .iter()
            .zip(&sums)
            .map(|(p, &(lat, lng, n))| {
                if n == 0 {
                    *p
                } else {
                    let n = n as f64;
                    GpsPoint::new((p.latitude + lat / n) / 2.0, (p.longitude + lng / n) / 2.0, p.time)
                }
            })
            .collect();

        let span = self.start_time().zip(self.end_time());
        for (other, _) in merges {
            points.extend(other.points.iter().filter(|p| match span {
                Some((start, end)) => p.time < start || p.time > end,
                None => true,
            }));
        }
        points.sort_by_key(|p| p.time);

        debug!(
            "Merged {} recordings: {} fitted points, {} -> {} points",
            merges.len(),
            sums.iter().filter(|s| s.2 > 0).count(),
            self.points.len(),
            points.len()
        );

        self.set_points(points);
        Ok(self)
    }

    // ========================================================================
    // Annotation stages
    // ========================================================================

    /// Label point ranges with transportation modes, see [`modes::infer_modes`].
    pub fn infer_transportation_mode(
        &mut self,
        classifier: &dyn ModeClassifier,
        remove_stops: bool,
        dt_threshold: f64,
    ) -> Result<&mut Self> {
        let metrics = self.require_metrics("infer_transportation_mode")?;
        let spans = modes::infer_modes(
            &self.points,
            &metrics.speeds,
            &metrics.accelerations,
            classifier,
            remove_stops,
            dt_threshold,
        );
        self.transportation_modes = spans;
        Ok(self)
    }

    /// Resolve `location_from` and `location_to` from the first and last
    /// point. The closest candidate wins; `None` when nothing is in range.
    pub fn infer_location(
        &mut self,
        provider: &dyn LocationProvider,
        max_distance: f64,
        limit: usize,
    ) -> Result<&mut Self> {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(TripError::EmptySegment),
        };

        self.location_from = provider.nearby(&first, max_distance, limit)?.into_iter().next();
        self.location_to = provider.nearby(&last, max_distance, limit)?.into_iter().next();
        Ok(self)
    }
}
