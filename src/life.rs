//! LIFE itinerary export.
//!
//! A day is written as a header line followed by alternating stays and trips:
//!
//! ```text
//! --2024_05_01
//! 0000-0800: Home
//! 0800-0830: Home -> Office [bike]
//! 0830-1730: Office
//! 1730-1810: Office -> Home
//!     1730-1750: [foot]
//!     1750-1810: [vehicle]
//! 1810-2359: Home
//! ```
//!
//! Every segment must have both locations resolved.

use chrono::{DateTime, Utc};

use crate::location::Location;
use crate::{Result, Segment, Track, TripError};

fn military_time(time: &DateTime<Utc>) -> String {
    time.format("%H%M").to_string()
}

fn require<'a>(
    location: &'a Option<Location>,
    segment: usize,
    side: &'static str,
) -> Result<&'a Location> {
    location
        .as_ref()
        .ok_or(TripError::MissingLocation { segment, side })
}

fn trip_lines(segment: &Segment, index: usize, lines: &mut Vec<String>) -> Result<()> {
    let (start, end) = match (segment.start_time(), segment.end_time()) {
        (Some(start), Some(end)) => (start, end),
        _ => return Err(TripError::EmptySegment),
    };
    let from = require(&segment.location_from, index, "from")?;
    let to = require(&segment.location_to, index, "to")?;

    let mut line = format!(
        "{}-{}: {} -> {}",
        military_time(&start),
        military_time(&end),
        from.label,
        to.label
    );

    match segment.transportation_modes.as_slice() {
        [] => lines.push(line),
        [only] => {
            line.push_str(&format!(" [{}]", only.label));
            lines.push(line);
        }
        spans => {
            lines.push(line);
            for span in spans {
                lines.push(format!(
                    "    {}-{}: [{}]",
                    military_time(&segment.point_at(span.from)?.time),
                    military_time(&segment.point_at(span.to)?.time),
                    span.label
                ));
            }
        }
    }
    Ok(())
}

impl Track {
    /// Render the track as a LIFE day.
    ///
    /// Fails with [`TripError::EmptyTrack`] without segments and with
    /// [`TripError::MissingLocation`] when a segment lacks a location.
    pub fn to_life(&self) -> Result<String> {
        let first = self
            .segments
            .first()
            .and_then(Segment::start_time)
            .ok_or(TripError::EmptyTrack)?;

        let mut lines = vec![format!("--{}", first.format("%Y_%m_%d"))];
        let last = self.segments.len() - 1;

        for (i, segment) in self.segments.iter().enumerate() {
            let (start, end) = match (segment.start_time(), segment.end_time()) {
                (Some(start), Some(end)) => (start, end),
                _ => return Err(TripError::EmptySegment),
            };

            if i == 0 {
                let from = require(&segment.location_from, i, "from")?;
                lines.push(format!("0000-{}: {}", military_time(&start), from.label));
            }

            trip_lines(segment, i, &mut lines)?;

            // Stays are named after where the previous trip ended and start
            // at its last point, even when the next trip starts elsewhere.
            let to = require(&segment.location_to, i, "to")?;
            if i == last {
                lines.push(format!("{}-2359: {}", military_time(&end), to.label));
            } else {
                let next_start = self.segments[i + 1]
                    .start_time()
                    .ok_or(TripError::EmptySegment)?;
                lines.push(format!(
                    "{}-{}: {}",
                    military_time(&end),
                    military_time(&next_start),
                    to.label
                ));
            }
        }

        Ok(lines.join("\n"))
    }
}
