//! Collaborator traits
//!
//! The viewer never talks to the backend directly. Everything that crosses
//! the network outside the live feed goes through [`TrackApi`], so the same
//! stores and controllers run against the real service or an in-memory one.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::point::TrackPoint;
use crate::region::RegionTree;
use crate::segment::SegmentEdit;
use crate::track::{RecordingStatus, Track};

/// Request/response operations offered by the track service
#[async_trait]
pub trait TrackApi: Send + Sync {
    /// Fetch the summary for a track
    async fn fetch_track_detail(&self, track_id: &str) -> Result<Track, ApiError>;

    /// Fetch all points recorded so far
    async fn fetch_track_points(&self, track_id: &str) -> Result<Vec<TrackPoint>, ApiError>;

    /// Fetch the server-computed region tree
    ///
    /// This is the expensive derived computation; callers are expected to
    /// rate-limit it during live recordings.
    async fn fetch_regions(&self, track_id: &str) -> Result<RegionTree, ApiError>;

    /// Persist segment value edits
    async fn save_segment_edits(
        &self,
        track_id: &str,
        edits: &[SegmentEdit],
    ) -> Result<(), ApiError>;

    /// Authoritative status of a live recording
    async fn fetch_recording_status(&self, recording_id: &str)
    -> Result<RecordingStatus, ApiError>;
}
