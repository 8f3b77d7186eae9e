//! Track summary and aggregate statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate statistics for a track
///
/// The same shape is pushed by the server with every live point; those
/// values are authoritative and replace the local copy wholesale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackStats {
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: i64,
    /// Meters climbed
    pub elevation_gain: f64,
    /// Meters descended
    pub elevation_loss: f64,
}

/// State of a live recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    Recording,
    Paused,
    Ended,
}

impl RecordingStatus {
    /// Still able to receive points
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }
}

impl std::fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recording => write!(f, "recording"),
            Self::Paused => write!(f, "paused"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Track summary as returned by the track detail endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stats: TrackStats,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub point_count: usize,
    /// Absent for finished uploads
    #[serde(default)]
    pub status: Option<RecordingStatus>,
    #[serde(default)]
    pub recording_id: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stats: TrackStats::default(),
            start_time: None,
            end_time: None,
            point_count: 0,
            status: None,
            recording_id: None,
        }
    }

    /// Mark this track as a live recording
    pub fn live(mut self, recording_id: impl Into<String>) -> Self {
        self.status = Some(RecordingStatus::Recording);
        self.recording_id = Some(recording_id.into());
        self
    }

    pub fn is_live(&self) -> bool {
        self.status.is_some_and(|s| s.is_active())
    }

    /// Replace aggregates with server-supplied values
    pub fn apply_server_stats(&mut self, stats: TrackStats) {
        self.stats = stats;
    }

    /// Extend the time range to include `time`; never shrinks
    ///
    /// Returns true if either bound moved.
    pub fn widen_time_range(&mut self, time: DateTime<Utc>) -> bool {
        let mut changed = false;
        if self.start_time.is_none_or(|start| time < start) {
            self.start_time = Some(time);
            changed = true;
        }
        if self.end_time.is_none_or(|end| time > end) {
            self.end_time = Some(time);
            changed = true;
        }
        changed
    }
}
