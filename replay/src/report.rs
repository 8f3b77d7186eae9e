//! Offline statistics for a recorded point file

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use trackview_core::{PointStore, RegionTree, TrackPoint, TrackStats, TrackType, stats};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    pub track_type: TrackType,
    pub id: String,
    pub value: String,
    pub start_index: usize,
    pub end_index: usize,
    pub stats: TrackStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub point_count: usize,
    pub rejected_points: usize,
    pub stats: TrackStats,
    pub max_speed: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub segments: Vec<SegmentReport>,
}

/// JSON array of points
pub fn read_points(path: &Path) -> anyhow::Result<Vec<TrackPoint>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read points from {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid points file {}", path.display()))
}

/// JSON region tree
pub fn read_regions(path: &Path) -> anyhow::Result<RegionTree> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read regions from {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid regions file {}", path.display()))
}

/// Order and validate `points`, then reduce them to whole-track and
/// per-segment statistics
pub fn build_report(points: Vec<TrackPoint>, regions: Option<&RegionTree>) -> StatsReport {
    let (store, rejected) = PointStore::from_points(points);
    for e in &rejected {
        warn!(error = %e, "Skipped invalid point");
    }

    let sorted = store.points();
    let (start_time, end_time) = match store.time_range() {
        Some((start, end)) => (Some(start), Some(end)),
        None => (None, None),
    };

    let segments = regions
        .map(RegionTree::segments)
        .unwrap_or_default()
        .into_iter()
        .map(|segment| SegmentReport {
            stats: stats::segment_stats(sorted, &segment),
            track_type: segment.track_type,
            start_index: segment.start_index,
            end_index: segment.end_index,
            id: segment.id,
            value: segment.value,
        })
        .collect();

    StatsReport {
        point_count: store.len(),
        rejected_points: rejected.len(),
        stats: stats::compute_stats(sorted),
        max_speed: stats::max_speed(sorted),
        start_time,
        end_time,
        segments,
    }
}
