//! Configuration for the track → trip pipeline.

use serde::{Deserialize, Serialize};

use crate::filters::SmoothStrategy;

/// Default `strftime` format for generated track names.
pub const DEFAULT_NAME_FORMAT: &str = "%Y-%m-%d";

/// Parameters for [`Track::to_trip`](crate::Track::to_trip).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripConfig {
    /// Run noise removal before smoothing.
    /// Default: false (the canonical pipeline relies on smoothing alone)
    pub enable_noise_removal: bool,

    /// Sensitivity of noise removal, in standard deviations of speed.
    /// Default: 2.0
    pub noise_var: f64,

    /// Smoothing pass direction.
    /// Default: `Inverse` (average of forward and backward passes)
    pub smooth_strategy: SmoothStrategy,

    /// Ratio of measurement noise to process noise for the smoothing filter.
    /// Larger values smooth harder. Default: 4.0
    pub smooth_noise: f64,

    /// Radius of a stay, in meters.
    /// Default: 150.0
    pub segment_eps: f64,

    /// Minimum time spent inside a stay radius to cut the segment, in seconds.
    /// Default: 80.0
    pub segment_min_time: f64,

    /// Use plain Douglas-Peucker instead of the time-synchronised variant.
    /// Default: false
    pub simplify_topology_only: bool,

    /// Maximum deviation tolerated by simplification, in meters.
    /// Default: 2.0
    pub simplify_dist_threshold: f64,

    /// `strftime` format for generated names.
    /// Default: "%Y-%m-%d"
    pub name_format: String,
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            enable_noise_removal: false,
            noise_var: 2.0,
            smooth_strategy: SmoothStrategy::Inverse,
            smooth_noise: 4.0,
            segment_eps: 150.0,
            segment_min_time: 80.0,
            simplify_topology_only: false,
            simplify_dist_threshold: 2.0,
            name_format: DEFAULT_NAME_FORMAT.to_string(),
        }
    }
}

/// Parameters for [`Track::preprocess`](crate::Track::preprocess).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Allow points to be removed.
    /// Default: true
    pub destructive: bool,

    /// Points reached with a higher acceleration are dropped (m/s²).
    /// Default: 30.0
    pub max_acc: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            destructive: true,
            max_acc: 30.0,
        }
    }
}

/// Parameters for
/// [`Track::infer_transportation_modes`](crate::Track::infer_transportation_modes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeConfig {
    /// Drop stop spans after classification.
    /// Default: false
    pub remove_stops: bool,

    /// Width of the classification window, in seconds.
    /// Default: 10.0
    pub dt_threshold: f64,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            remove_stops: false,
            dt_threshold: 10.0,
        }
    }
}

/// Parameters for [`Track::infer_location`](crate::Track::infer_location).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Search radius around a segment endpoint, in meters.
    /// Default: 20.0
    pub max_distance: f64,

    /// Maximum number of candidate places asked from the provider.
    /// Default: 5
    pub limit: usize,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            max_distance: 20.0,
            limit: 5,
        }
    }
}
