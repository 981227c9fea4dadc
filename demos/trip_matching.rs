//! Turn two recordings of the same commute into trips, compare them and merge
//! the second into the first.
//!
//! Run with: cargo run --example trip_matching

use chrono::{Duration, TimeZone, Utc};
use track_to_trip::{
    GpsPoint, KnownPlaces, Location, LocationConfig, ModeConfig, Segment, SpeedClassifier, Track,
    TripConfig,
};

/// Walk to a cafe, stay for a while, then continue to the office.
/// `offset` shifts the whole recording east in degrees.
fn commute(offset: f64) -> Vec<GpsPoint> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let mut points = Vec::new();
    let mut secs = 0;
    let mut lat = 51.5074;

    for _ in 0..15 {
        points.push(GpsPoint::new(lat, -0.1278 + offset, start + Duration::seconds(secs)));
        lat += 0.0015;
        secs += 45;
    }
    for _ in 0..20 {
        points.push(GpsPoint::new(lat, -0.1278 + offset, start + Duration::seconds(secs)));
        secs += 30;
    }
    for _ in 0..15 {
        lat += 0.0015;
        points.push(GpsPoint::new(lat, -0.1278 + offset, start + Duration::seconds(secs)));
        secs += 45;
    }
    points
}

fn main() {
    let config = TripConfig::default();

    let mut phone = Track::new("phone", vec![Segment::new(commute(0.0))]).unwrap();
    let mut watch = Track::new("watch", vec![Segment::new(commute(0.00005))]).unwrap();

    phone.to_trip("", &config).unwrap();
    watch.to_trip("watch", &config).unwrap();

    println!("Trip Matching Example\n");
    println!("Config: smooth_noise={}, segment_eps={}m, segment_min_time={}s\n",
        config.smooth_noise, config.segment_eps, config.segment_min_time);

    for track in [&phone, &watch] {
        println!("{}: {} segments", track.name, track.segments.len());
        for (i, segment) in track.segments.iter().enumerate() {
            let metrics = segment.metrics().unwrap();
            println!("   [{}] {} points, {:.0}m in {:.0}s", i, segment.len(), metrics.length, metrics.duration);
        }
    }

    let result = phone.similarity(&watch);
    println!("\nSimilarity of watch against phone: {:.3}", result.score);
    for c in result.matches() {
        println!("   watch[{}] -> phone[{}]: AMD {:.1}m, {} point pairs",
            c.other_index, c.self_index, c.diff.amd, c.diff.pairs.len());
    }

    phone.merge_and_fit(&watch, &result.correspondences).unwrap();
    phone.compute_metrics().unwrap();

    let places = KnownPlaces::new(vec![
        Location::new("Home", 51.5074, -0.1278),
        Location::new("Cafe", 51.5284, -0.1278),
        Location::new("Office", 51.5509, -0.1278),
    ]);
    // Places in this walk are a few hundred meters apart
    let location = LocationConfig {
        max_distance: 300.0,
        ..LocationConfig::default()
    };
    let modes = ModeConfig::default();
    phone
        .infer_location(&places, location.max_distance, location.limit)
        .unwrap()
        .infer_transportation_modes(&SpeedClassifier::default(), modes.remove_stops, modes.dt_threshold)
        .unwrap();

    match phone.to_life() {
        Ok(life) => println!("\nLIFE:\n{}", life),
        Err(e) => println!("\nLIFE export failed: {}", e),
    }
}
