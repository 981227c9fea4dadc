//! GPX import and export.
//!
//! Every GPX track becomes one [`Track`]; every GPX track segment becomes one
//! [`Segment`]. Points without a timestamp or with out-of-range coordinates
//! are dropped with a warning, and segments left empty are skipped.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use geo::Point;
use log::{info, warn};

use crate::{GpsPoint, Result, Segment, Track, TripError};

const CREATOR: &str = "track-to-trip";

impl From<::gpx::errors::GpxError> for TripError {
    fn from(e: ::gpx::errors::GpxError) -> Self {
        TripError::Gpx(e.to_string())
    }
}

impl Track {
    /// Read every track of a GPX file. No preprocessing is done.
    ///
    /// Tracks are named after the file; when the file holds several, the
    /// track position is appended (`walk.gpx_0`, `walk.gpx_1`, ...).
    pub fn from_gpx_file(path: impl AsRef<Path>) -> Result<Vec<Track>> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let tracks = read_tracks(BufReader::new(File::open(path)?), &file_name)?;
        info!("Loaded {} tracks from {}", tracks.len(), path.display());
        Ok(tracks)
    }

    /// Same as [`Track::from_gpx_file`] for in-memory content.
    pub fn from_gpx_str(content: &str, name: &str) -> Result<Vec<Track>> {
        read_tracks(content.as_bytes(), name)
    }

    /// Serialize as a GPX 1.1 document with one track.
    pub fn to_gpx(&self) -> Result<String> {
        let mut track = ::gpx::Track::new();
        if !self.name.is_empty() {
            track.name = Some(self.name.clone());
        }

        for segment in &self.segments {
            let mut gpx_segment = ::gpx::TrackSegment::new();
            for point in segment.points() {
                let mut waypoint = ::gpx::Waypoint::new(Point::new(point.longitude, point.latitude));
                waypoint.time = Some(to_gpx_time(&point.time)?);
                gpx_segment.points.push(waypoint);
            }
            track.segments.push(gpx_segment);
        }

        let document = ::gpx::Gpx {
            version: ::gpx::GpxVersion::Gpx11,
            creator: Some(CREATOR.to_string()),
            tracks: vec![track],
            ..Default::default()
        };

        let mut buffer = Vec::new();
        ::gpx::write(&document, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| TripError::Gpx(e.to_string()))
    }
}

fn read_tracks<R: Read>(reader: R, name: &str) -> Result<Vec<Track>> {
    let document = ::gpx::read(reader)?;
    let many = document.tracks.len() > 1;

    let mut tracks = Vec::with_capacity(document.tracks.len());
    for (ti, gpx_track) in document.tracks.iter().enumerate() {
        let mut segments = Vec::with_capacity(gpx_track.segments.len());
        for gpx_segment in &gpx_track.segments {
            let mut points = Vec::with_capacity(gpx_segment.points.len());
            for waypoint in &gpx_segment.points {
                let time = match &waypoint.time {
                    Some(time) => from_gpx_time(time)?,
                    None => continue,
                };
                let position = waypoint.point();
                let point = GpsPoint::new(position.y(), position.x(), time);
                if point.is_valid() {
                    points.push(point);
                }
            }

            let skipped = gpx_segment.points.len() - points.len();
            if skipped > 0 {
                warn!("Dropped {} GPX points without a timestamp or valid position", skipped);
            }
            if !points.is_empty() {
                segments.push(Segment::new(points));
            }
        }

        let track_name = if many {
            format!("{}_{}", name, ti)
        } else {
            name.to_string()
        };
        tracks.push(Track::new(track_name, segments)?);
    }
    Ok(tracks)
}

fn from_gpx_time(time: &::gpx::Time) -> Result<DateTime<Utc>> {
    let formatted = time.format()?;
    let parsed = DateTime::parse_from_rfc3339(&formatted)
        .map_err(|e| TripError::Gpx(format!("invalid timestamp {}: {}", formatted, e)))?;
    Ok(parsed.with_timezone(&Utc))
}

fn to_gpx_time(timestamp: &DateTime<Utc>) -> Result<::gpx::Time> {
    let nanos = timestamp
        .timestamp_nanos_opt()
        .ok_or_else(|| TripError::Gpx(format!("timestamp out of range: {}", timestamp)))?;
    let offset = time::OffsetDateTime::from_unix_timestamp_nanos(nanos as i128)
        .map_err(|e| TripError::Gpx(e.to_string()))?;
    Ok(offset.into())
}
