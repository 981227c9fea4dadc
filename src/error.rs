//! Unified error type for track processing.
//!
//! Structural problems (bad indices, stages run out of order, unusable
//! segments) and adapter failures are errors. Degenerate but valid results,
//! such as the bounds of an empty track or a segment with no spatial match,
//! are ordinary return values.

use thiserror::Error;

/// Errors produced by tracks, segments and the format adapters.
#[derive(Debug, Error)]
pub enum TripError {
    /// An index into a segment or point list was out of range.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A stage that consumes derived metrics ran before `compute_metrics`.
    #[error("{stage} requires computed metrics; run compute_metrics first")]
    MissingMetrics { stage: &'static str },

    /// A segment without points where a start time or metrics are required.
    #[error("segment has no points")]
    EmptySegment,

    /// The operation needs at least one segment.
    #[error("track has no segments")]
    EmptyTrack,

    /// LIFE export needs both location labels on every segment.
    #[error("segment {segment} has no {side} location")]
    MissingLocation { segment: usize, side: &'static str },

    /// The injected location provider failed.
    #[error("location lookup failed: {0}")]
    Location(String),

    #[error("GPX error: {0}")]
    Gpx(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TripError>;

/// Conversions from `Option` into [`TripError`].
pub trait OptionExt<T> {
    /// Map `None` to [`TripError::IndexOutOfRange`].
    fn ok_or_out_of_range(self, index: usize, len: usize) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_out_of_range(self, index: usize, len: usize) -> Result<T> {
        self.ok_or(TripError::IndexOutOfRange { index, len })
    }
}
