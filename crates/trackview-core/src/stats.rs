//! Pure statistics over point sequences
//!
//! Used for bulk-loaded tracks and for per-segment figures. Live tracks take
//! their aggregates from the server instead (see [`Track::apply_server_stats`]).
//!
//! [`Track::apply_server_stats`]: crate::track::Track::apply_server_stats

use chrono::{DateTime, Utc};

use crate::point::TrackPoint;
use crate::segment::Segment;
use crate::track::TrackStats;

/// Sum of great-circle distances between consecutive points, in meters
pub fn total_distance(points: &[TrackPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| w[0].position.distance_to(&w[1].position))
        .sum()
}

/// Earliest and latest timestamp in the sequence
pub fn time_range(points: &[TrackPoint]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut times = points.iter().filter_map(|p| p.time);
    let first = times.next()?;
    Some(times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
}

/// Seconds between the earliest and latest timestamp; zero without times
pub fn duration_secs(points: &[TrackPoint]) -> i64 {
    time_range(points)
        .map(|(start, end)| (end - start).num_seconds())
        .unwrap_or(0)
}

/// Cumulative climb and descent over points that carry an elevation
///
/// Points without elevation are skipped, not treated as zero.
pub fn elevation_delta(points: &[TrackPoint]) -> (f64, f64) {
    let mut gain = 0.0;
    let mut loss = 0.0;
    let mut previous: Option<f64> = None;

    for elevation in points.iter().filter_map(|p| p.elevation) {
        if let Some(prev) = previous {
            let delta = elevation - prev;
            if delta > 0.0 {
                gain += delta;
            } else {
                loss -= delta;
            }
        }
        previous = Some(elevation);
    }

    (gain, loss)
}

/// Highest recorded speed, if any point has one
pub fn max_speed(points: &[TrackPoint]) -> Option<f64> {
    points
        .iter()
        .filter_map(|p| p.speed)
        .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |m| m.max(s))))
}

/// Full statistics for a point sequence
pub fn compute_stats(points: &[TrackPoint]) -> TrackStats {
    let (elevation_gain, elevation_loss) = elevation_delta(points);
    TrackStats {
        distance: total_distance(points),
        duration: duration_secs(points),
        elevation_gain,
        elevation_loss,
    }
}

/// Statistics for the points covered by `segment`, clamped to the sequence
pub fn segment_stats(points: &[TrackPoint], segment: &Segment) -> TrackStats {
    if segment.start_index >= points.len() {
        return TrackStats::default();
    }
    let end = segment.end_index.min(points.len() - 1);
    compute_stats(&points[segment.start_index..=end])
}
