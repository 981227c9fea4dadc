//! JSON import and export.
//!
//! A track serializes as `{"name": ..., "segments": [...]}` where every
//! segment carries its points, resolved locations and mode spans. Derived
//! metrics are not serialized; [`Track::from_json`] recomputes them through
//! preprocessing.

use serde::{Deserialize, Serialize};

use crate::config::PreprocessConfig;
use crate::{Result, Segment, Track};

/// Serializable form of a [`Track`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackJson {
    #[serde(default)]
    pub name: String,
    pub segments: Vec<Segment>,
}

impl Track {
    pub fn to_json(&self) -> TrackJson {
        TrackJson {
            name: self.name.clone(),
            segments: self.segments.clone(),
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_json())?)
    }

    /// Build a track from its JSON form and preprocess it with
    /// [`PreprocessConfig`] defaults.
    pub fn from_json(json: TrackJson) -> Result<Track> {
        let config = PreprocessConfig::default();
        let mut track = Track::new(json.name, json.segments)?;
        track.preprocess(config.destructive, config.max_acc)?;
        Ok(track)
    }

    pub fn from_json_str(content: &str) -> Result<Track> {
        Track::from_json(serde_json::from_str(content)?)
    }
}
