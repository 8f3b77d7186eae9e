//! In-memory track service for testing
//!
//! [`MemoryTrackApi`] implements [`TrackApi`] over plain maps, counts every
//! call, and can be told to fail specific operations. The replay tool uses
//! it as its backend as well.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trackview_core::{MemoryTrackApi, Track, RecordingStatus, TrackApi};
//!
//! let api = MemoryTrackApi::new();
//! api.insert_track(Track::new("t1", "Commute").live("rec-1"), vec![], Default::default());
//!
//! api.set_recording_status("rec-1", RecordingStatus::Ended);
//! assert_eq!(api.fetch_recording_status("rec-1").await?, RecordingStatus::Ended);
//! ```

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ApiError;
use crate::point::TrackPoint;
use crate::region::RegionTree;
use crate::segment::SegmentEdit;
use crate::track::{RecordingStatus, Track};
use crate::traits::TrackApi;

/// Operations of [`TrackApi`], used for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiCall {
    TrackDetail,
    TrackPoints,
    Regions,
    SaveEdits,
    RecordingStatus,
}

/// Number of calls made per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiCallCounts {
    pub track_detail: usize,
    pub track_points: usize,
    pub regions: usize,
    pub save_edits: usize,
    pub recording_status: usize,
}

struct StoredTrack {
    track: Track,
    points: Vec<TrackPoint>,
    regions: RegionTree,
}

#[derive(Default)]
struct MemoryState {
    tracks: HashMap<String, StoredTrack>,
    recordings: HashMap<String, RecordingStatus>,
    saved: Vec<(String, Vec<SegmentEdit>)>,
    calls: ApiCallCounts,
    failing: HashSet<ApiCall>,
}

/// In-memory [`TrackApi`] implementation
#[derive(Default)]
pub struct MemoryTrackApi {
    state: Mutex<MemoryState>,
}

impl MemoryTrackApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a track; live tracks also register their recording as active
    pub fn insert_track(&self, track: Track, points: Vec<TrackPoint>, regions: RegionTree) {
        let mut state = self.state.lock();
        if let (Some(recording_id), Some(status)) = (&track.recording_id, track.status) {
            state.recordings.insert(recording_id.clone(), status);
        }
        state.tracks.insert(
            track.id.clone(),
            StoredTrack {
                track,
                points,
                regions,
            },
        );
    }

    /// Mutate a stored track summary in place
    pub fn update_track(&self, track_id: &str, update: impl FnOnce(&mut Track)) {
        if let Some(stored) = self.state.lock().tracks.get_mut(track_id) {
            update(&mut stored.track);
        }
    }

    /// Append a point on the server side
    pub fn push_point(&self, track_id: &str, point: TrackPoint) {
        if let Some(stored) = self.state.lock().tracks.get_mut(track_id) {
            stored.points.push(point);
            stored.track.point_count = stored.points.len();
        }
    }

    pub fn set_regions(&self, track_id: &str, regions: RegionTree) {
        if let Some(stored) = self.state.lock().tracks.get_mut(track_id) {
            stored.regions = regions;
        }
    }

    /// Set a recording's status and mirror it onto the owning track
    pub fn set_recording_status(&self, recording_id: &str, status: RecordingStatus) {
        let mut state = self.state.lock();
        state.recordings.insert(recording_id.to_string(), status);
        for stored in state.tracks.values_mut() {
            if stored.track.recording_id.as_deref() == Some(recording_id) {
                stored.track.status = Some(status);
            }
        }
    }

    /// Make an operation fail until [`clear_failures`](Self::clear_failures)
    pub fn fail(&self, call: ApiCall) {
        self.state.lock().failing.insert(call);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failing.clear();
    }

    pub fn calls(&self) -> ApiCallCounts {
        self.state.lock().calls
    }

    /// Every successful save, in call order
    pub fn saved_edits(&self) -> Vec<(String, Vec<SegmentEdit>)> {
        self.state.lock().saved.clone()
    }

    fn check(state: &MemoryState, call: ApiCall) -> Result<(), ApiError> {
        if state.failing.contains(&call) {
            return Err(ApiError::Request(format!("injected failure for {:?}", call)));
        }
        Ok(())
    }
}

#[async_trait]
impl TrackApi for MemoryTrackApi {
    async fn fetch_track_detail(&self, track_id: &str) -> Result<Track, ApiError> {
        let mut state = self.state.lock();
        state.calls.track_detail += 1;
        Self::check(&state, ApiCall::TrackDetail)?;
        state
            .tracks
            .get(track_id)
            .map(|s| s.track.clone())
            .ok_or_else(|| ApiError::NotFound(format!("track {}", track_id)))
    }

    async fn fetch_track_points(&self, track_id: &str) -> Result<Vec<TrackPoint>, ApiError> {
        let mut state = self.state.lock();
        state.calls.track_points += 1;
        Self::check(&state, ApiCall::TrackPoints)?;
        state
            .tracks
            .get(track_id)
            .map(|s| s.points.clone())
            .ok_or_else(|| ApiError::NotFound(format!("track {}", track_id)))
    }

    async fn fetch_regions(&self, track_id: &str) -> Result<RegionTree, ApiError> {
        let mut state = self.state.lock();
        state.calls.regions += 1;
        Self::check(&state, ApiCall::Regions)?;
        state
            .tracks
            .get(track_id)
            .map(|s| s.regions.clone())
            .ok_or_else(|| ApiError::NotFound(format!("track {}", track_id)))
    }

    async fn save_segment_edits(
        &self,
        track_id: &str,
        edits: &[SegmentEdit],
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.calls.save_edits += 1;
        Self::check(&state, ApiCall::SaveEdits)?;
        if !state.tracks.contains_key(track_id) {
            return Err(ApiError::NotFound(format!("track {}", track_id)));
        }
        state.saved.push((track_id.to_string(), edits.to_vec()));
        Ok(())
    }

    async fn fetch_recording_status(
        &self,
        recording_id: &str,
    ) -> Result<RecordingStatus, ApiError> {
        let mut state = self.state.lock();
        state.calls.recording_status += 1;
        Self::check(&state, ApiCall::RecordingStatus)?;
        state
            .recordings
            .get(recording_id)
            .copied()
            .ok_or_else(|| ApiError::NotFound(format!("recording {}", recording_id)))
    }
}
