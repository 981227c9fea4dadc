//! End-to-end behaviour of tracks: construction, the trip pipeline,
//! similarity, merging and export.

use chrono::{DateTime, Duration, TimeZone, Utc};
use track_to_trip::{
    GpsPoint, KnownPlaces, Location, LocationConfig, ModeConfig, Segment, SpeedClassifier, Track,
    TripConfig,
};

fn t(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + Duration::seconds(secs)
}

/// Straight line heading north, one point every 10 s.
fn line(n: usize, lat: f64, lng: f64, start: i64) -> Segment {
    Segment::new(
        (0..n)
            .map(|i| GpsPoint::new(lat + i as f64 * 0.0005, lng, t(start + i as i64 * 10)))
            .collect(),
    )
}

/// Walk north, wait 10 minutes, walk north again.
fn walk_wait_walk() -> Vec<GpsPoint> {
    let mut points = Vec::new();
    let mut secs = 0;
    let mut lat = 51.5;
    for _ in 0..10 {
        points.push(GpsPoint::new(lat, -0.12, t(secs)));
        lat += 0.002;
        secs += 60;
    }
    for _ in 0..20 {
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
fn segments_sorted_after_construction() {
    let track = Track::new(
        "unsorted",
        vec![
            line(5, 51.5, -0.12, 500),
            line(5, 51.5, -0.10, 0),
            line(5, 51.5, -0.08, 250),
        ],
    )
    .unwrap();

    let starts: Vec<_> = track.segments.iter().map(|s| s.start_time().unwrap()).collect();
    assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(track.start_time(), Some(t(0)));
}

#[test]
fn empty_track_name_and_bounds() {
    let track = Track::new("", vec![]).unwrap();
    assert_eq!(track.generate_name("%Y-%m-%d"), "EmptyTrack");
    assert_eq!(
        track.bounds().as_tuple(),
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY)
    );
}

#[test]
fn single_segment_bounds_exact() {
    let segment = Segment::new(vec![
        GpsPoint::new(1.0, 2.0, t(0)),
        GpsPoint::new(3.0, 4.0, t(10)),
    ]);
    let track = Track::new("", vec![segment]).unwrap();
    assert_eq!(track.bounds().as_tuple(), (1.0, 2.0, 3.0, 4.0));
}

#[test]
fn point_lookup() {
    let track = Track::new(
        "",
        vec![
            line(8, 51.5, -0.12, 0),
            line(8, 51.5, -0.10, 100),
            line(8, 51.5, -0.08, 200),
        ],
    )
    .unwrap();

    let sixth = track.segments[2].points()[5];
    assert_eq!(track.point_index(&sixth), Some((2, 5)));
    assert!(track.has_point(&sixth));

    let absent = GpsPoint::new(10.0, 10.0, t(0));
    assert_eq!(track.point_index(&absent), None);
    assert!(!track.has_point(&absent));
}

#[test]
fn disjoint_tracks_do_not_match() {
    let london = Track::new("london", vec![line(10, 51.5, -0.12, 0)]).unwrap();
    let paris = Track::new(
        "paris",
        vec![line(10, 48.85, 2.35, 0), line(10, 48.87, 2.30, 200)],
    )
    .unwrap();

    let result = london.similarity(&paris);
    assert_eq!(result.score, 0.0);
    assert_eq!(result.correspondences.len(), paris.segments.len());
    assert!(result.correspondences.iter().all(Option::is_none));
}

#[test]
fn similarity_is_directional() {
    let long = Track::new("long", vec![line(20, 51.5, -0.12, 0)]).unwrap();
    let short = Track::new("short", vec![line(5, 51.5, -0.12, 0)]).unwrap();

    let short_in_long = long.similarity(&short);
    let long_in_short = short.similarity(&long);

    assert!(short_in_long.score > 0.9);
    assert!(long_in_short.score < short_in_long.score);
    assert_eq!(short_in_long.match_count(), 1);
}

#[test]
fn to_trip_yields_at_least_segmentation_count() {
    let raw = Track::new("", vec![Segment::new(walk_wait_walk())]).unwrap();

    let config = TripConfig::default();
    let mut segmented = raw.clone();
    segmented
        .smooth(config.smooth_strategy, config.smooth_noise)
        .compute_metrics()
        .unwrap()
        .segment(config.segment_eps, config.segment_min_time)
        .unwrap();
    assert!(segmented.segments.len() >= 2);

    let mut trip = raw.clone();
    trip.to_trip("", &config).unwrap();
    assert!(trip.segments.len() >= segmented.segments.len());
    assert_eq!(trip.name, "2024-05-01.gpx");
    assert!(trip.segments.iter().all(|s| s.metrics().is_some()));
}

#[test]
fn to_trip_keeps_given_name() {
    let mut trip = Track::new("", vec![Segment::new(walk_wait_walk())]).unwrap();
    trip.to_trip("commute", &TripConfig::default()).unwrap();
    assert_eq!(trip.name, "commute");
}

#[test]
fn segmentation_does_not_resort() {
    // The first segment overlaps the second in time; after cutting it at its
    // stay, its second piece starts after the second segment.
    let shifted: Vec<GpsPoint> = (0..10)
        .map(|i| GpsPoint::new(52.0 + i as f64 * 0.002, -0.2, t(700 + i * 60)))
        .collect();
    let mut track = Track::new(
        "",
        vec![Segment::new(walk_wait_walk()), Segment::new(shifted)],
    )
    .unwrap();

    track.compute_metrics().unwrap().segment(150.0, 80.0).unwrap();

    let starts: Vec<_> = track.segments.iter().map(|s| s.start_time().unwrap()).collect();
    assert_eq!(starts.len(), 3);
    assert!(starts[1] > starts[2]);
}

#[test]
fn merge_only_touches_corresponding_segments() {
    let lngs = [-0.12, -0.05, 0.02];
    let segments: Vec<Segment> = lngs
        .iter()
        .enumerate()
        .map(|(k, lng)| line(10, 51.5, *lng, k as i64 * 1000))
        .collect();
    let mut mine = Track::new("mine", segments).unwrap();

    // Same recording, ~5.5m further north
    let shifted: Vec<Segment> = mine
        .segments
        .iter()
        .map(|s| {
            Segment::new(
                s.points()
                    .iter()
                    .map(|p| GpsPoint::new(p.latitude + 0.00005, p.longitude, p.time))
                    .collect(),
            )
        })
        .collect();
    let theirs = Track::new("theirs", shifted).unwrap();

    let mut correspondences = mine.similarity(&theirs).correspondences;
    assert!(correspondences.iter().all(Option::is_some));
    correspondences[1] = None;

    let before = mine.clone();
    mine.merge_and_fit(&theirs, &correspondences).unwrap();

    assert_eq!(mine.segments[1], before.segments[1]);
    assert_ne!(mine.segments[0], before.segments[0]);
    assert_ne!(mine.segments[2], before.segments[2]);

    let moved = mine.segments[0].points()[3].latitude - before.segments[0].points()[3].latitude;
    assert!((moved - 0.000025).abs() < 1e-9);
}

#[test]
fn day_to_life() {
    let mut track = Track::new("", vec![Segment::new(walk_wait_walk())]).unwrap();
    track.to_trip("", &TripConfig::default()).unwrap();

    let places = KnownPlaces::new(vec![
        Location::new("Home", 51.5, -0.12),
        Location::new("Cafe", 51.52, -0.12),
        Location::new("Park", 51.54, -0.12),
    ]);
    // Places in this walk are a few hundred meters apart
    let location = LocationConfig {
        max_distance: 300.0,
        ..LocationConfig::default()
    };
    let modes = ModeConfig::default();
    track
        .infer_location(&places, location.max_distance, location.limit)
        .unwrap()
        .infer_transportation_modes(&SpeedClassifier::default(), modes.remove_stops, modes.dt_threshold)
        .unwrap();

    let life = track.to_life().unwrap();
    assert!(life.starts_with("--2024_05_01\n0000-0800: Home\n0800-"));
    assert!(life.contains("Home -> Cafe"));
    assert!(life.contains("Cafe -> Park"));
    assert!(life.ends_with("-2359: Park"));
}

#[test]
fn json_and_gpx_roundtrip_keep_segments() {
    let track = Track::new(
        "two legs",
        vec![line(6, 51.5, -0.12, 0), line(6, 51.6, -0.12, 600)],
    )
    .unwrap();

    let from_json = Track::from_json_str(&track.to_json_string().unwrap()).unwrap();
    assert_eq!(from_json.segments.len(), 2);
    assert!(from_json.preprocessed);

    let from_gpx = Track::from_gpx_str(&track.to_gpx().unwrap(), "legs.gpx").unwrap();
    assert_eq!(from_gpx.len(), 1);
    assert_eq!(from_gpx[0].segments.len(), 2);
    assert_eq!(from_gpx[0].name, "legs.gpx");
}
