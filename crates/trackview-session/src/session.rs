//! Track view session
//!
//! A [`TrackSession`] owns every store for one opened track. The point
//! sequence lives behind the [`SharedTrack`] lock so the live controller can
//! append to it; segments, edit history and the timeline are owned here and
//! mutated through `&mut self`.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, warn};

use trackview_core::{
    PointStore, RegionTree, Segment, SegmentEdit, SegmentStore, Track, TrackApi, TrackPoint,
    TrackStats, TrackType, stats,
};
use trackview_edit::{EditCommand, SegmentEditor, TrackTypeSwitch, UnsavedDecision};
use trackview_live::{
    ConnectionStatus, FeedKey, FeedTransport, LiveFeedClient, LiveSyncController, LiveTrack,
    SharedTrack, SyncUpdate,
};
use trackview_logging::SessionContextData;
use trackview_timeline::TimelineViewState;

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};

/// Running live feed and its controller
struct LiveAttachment {
    client: Arc<LiveFeedClient>,
    shutdown_tx: broadcast::Sender<()>,
    controller: JoinHandle<()>,
}

/// Everything one view of one track needs
pub struct TrackSession {
    track_id: String,
    api: Arc<dyn TrackApi>,
    config: SessionConfig,
    context: SessionContextData,
    state: SharedTrack,
    editor: SegmentEditor,
    timeline: TimelineViewState,
    update_tx: broadcast::Sender<SyncUpdate>,
    live: Option<LiveAttachment>,
}

impl TrackSession {
    /// Load a track and build its stores
    ///
    /// The track detail and points are required. A failed region fetch
    /// leaves the session without segments until [`refresh_segments`]
    /// succeeds.
    ///
    /// [`refresh_segments`]: Self::refresh_segments
    pub async fn open(
        track_id: impl Into<String>,
        api: Arc<dyn TrackApi>,
        config: SessionConfig,
    ) -> SessionResult<Self> {
        let track_id = track_id.into();

        let mut summary = api.fetch_track_detail(&track_id).await?;
        let raw_points = api.fetch_track_points(&track_id).await?;
        let regions = match api.fetch_regions(&track_id).await {
            Ok(tree) => Some(tree),
            Err(e) => {
                warn!(track_id = %track_id, error = %e, "Region fetch failed, opening without segments");
                None
            }
        };

        let (points, rejected) = PointStore::from_points(raw_points);
        for e in &rejected {
            warn!(track_id = %track_id, error = %e, "Skipped invalid point");
        }
        summary.point_count = points.len();

        let segments = SegmentStore::from_segments(
            regions.as_ref().map(RegionTree::segments).unwrap_or_default(),
        );
        warn_out_of_bounds(&track_id, &segments, points.len());

        let mut context = SessionContextData::new(track_id.clone());
        if let Some(recording_id) = &summary.recording_id {
            context = context.with_recording_id(recording_id.clone());
        }

        info!(
            track_id = %track_id,
            session_id = %context.session_id,
            point_count = points.len(),
            segment_count = segments.len(),
            live = summary.is_live(),
            "Track session opened"
        );

        let mut live_track = LiveTrack::new(summary, points);
        live_track.regions = regions;

        let (update_tx, _) = broadcast::channel(config.sync.update_channel_capacity.max(1));
        let editor = SegmentEditor::new(segments, &config.history);
        let timeline = TimelineViewState::new(config.timeline.clone());

        Ok(Self {
            track_id,
            api,
            config,
            context,
            state: Arc::new(parking_lot::RwLock::new(live_track)),
            editor,
            timeline,
            update_tx,
            live: None,
        })
    }

    /// Start following the live recording
    ///
    /// The feed stops reconnecting once the recording has been finalized.
    /// Must be called from within a tokio runtime.
    pub fn attach_live(
        &mut self,
        transport: Arc<dyn FeedTransport>,
        token: impl Into<String>,
    ) -> SessionResult<()> {
        if self.live.is_some() {
            return Err(SessionError::AlreadyAttached(self.track_id.clone()));
        }

        let recording_id = {
            let state = self.state.read();
            match &state.summary.recording_id {
                Some(id) if state.summary.is_live() && !state.ended => id.clone(),
                _ => return Err(SessionError::NotLive(self.track_id.clone())),
            }
        };

        let finalized = Arc::clone(&self.state);
        let client = Arc::new(
            LiveFeedClient::new(
                FeedKey::new(recording_id.clone(), token),
                transport,
                self.config.feed.clone(),
            )
            .with_reconnect_predicate(move || !finalized.read().ended),
        );

        let controller = LiveSyncController::new(
            self.track_id.clone(),
            recording_id.clone(),
            Arc::clone(&self.api),
            Arc::clone(&self.state),
            &self.config.sync,
        )
        .with_client(Arc::clone(&client))
        .with_update_sender(self.update_tx.clone());

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let controller = tokio::spawn(
            controller
                .run(client.subscribe(), shutdown_rx)
                .instrument(self.context.span()),
        );
        client.connect();

        info!(track_id = %self.track_id, recording_id = %recording_id, "Live feed attached");
        self.live = Some(LiveAttachment {
            client,
            shutdown_tx,
            controller,
        });
        Ok(())
    }

    /// Disconnect the feed, stop the controller and wait for both
    pub async fn close(mut self) {
        if let Some(live) = self.live.take() {
            live.client.disconnect();
            let _ = live.shutdown_tx.send(());
            if let Err(e) = live.controller.await {
                warn!(track_id = %self.track_id, error = %e, "Live sync controller failed");
            }
            live.client.shutdown().await;
        }
        info!(track_id = %self.track_id, "Track session closed");
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn context(&self) -> &SessionContextData {
        &self.context
    }

    /// Handle to the shared point state, for readers on other tasks
    pub fn shared_track(&self) -> SharedTrack {
        Arc::clone(&self.state)
    }

    pub fn points(&self) -> Vec<TrackPoint> {
        self.state.read().points.snapshot()
    }

    pub fn point_count(&self) -> usize {
        self.state.read().points.len()
    }

    pub fn track(&self) -> Track {
        self.state.read().summary.clone()
    }

    pub fn regions(&self) -> Option<RegionTree> {
        self.state.read().regions.clone()
    }

    pub fn is_waiting_for_points(&self) -> bool {
        self.state.read().is_waiting_for_points()
    }

    /// True once a live recording has been confirmed ended
    pub fn is_ended(&self) -> bool {
        self.state.read().ended
    }

    pub fn is_live_attached(&self) -> bool {
        self.live.is_some()
    }

    /// Live connection status; `Disconnected` when no feed is attached
    pub fn connection_status(&self) -> ConnectionStatus {
        self.live
            .as_ref()
            .map_or(ConnectionStatus::Disconnected, |live| live.client.status())
    }

    /// Watch connection status changes of the attached feed
    pub fn connection_watch(&self) -> Option<watch::Receiver<ConnectionStatus>> {
        self.live.as_ref().map(|live| live.client.status_watch())
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<SyncUpdate> {
        self.update_tx.subscribe()
    }

    pub fn segment_store(&self) -> &SegmentStore {
        self.editor.store()
    }

    /// Segments of the active track type
    pub fn segments(&self) -> &[Segment] {
        self.editor.active_segments()
    }

    /// Statistics over the points a segment covers
    pub fn segment_stats(&self, track_type: TrackType, segment_id: &str) -> Option<TrackStats> {
        let segment = self.editor.store().get(track_type, segment_id)?;
        let state = self.state.read();
        Some(stats::segment_stats(state.points.points(), segment))
    }

    /// Rebuild segments from the latest region tree
    ///
    /// Skipped while edits are unsaved. Returns whether segments were replaced.
    pub fn refresh_segments(&mut self) -> bool {
        let (tree, point_count) = {
            let state = self.state.read();
            (state.regions.clone(), state.points.len())
        };
        let Some(tree) = tree else {
            debug!(track_id = %self.track_id, "No region tree yet");
            return false;
        };

        if !self.editor.replace_segments(tree.segments()) {
            return false;
        }
        warn_out_of_bounds(&self.track_id, self.editor.store(), point_count);
        debug!(track_id = %self.track_id, segment_count = self.editor.store().len(), "Segments refreshed");
        true
    }

    pub fn active_track_type(&self) -> TrackType {
        self.editor.active_track_type()
    }

    pub fn can_apply(&self, track_type: TrackType, segment_id: &str) -> bool {
        self.editor.can_apply(track_type, segment_id)
    }

    pub fn apply_edit(
        &mut self,
        track_type: TrackType,
        segment_id: &str,
        value: impl Into<String>,
        value_en: Option<String>,
    ) -> SessionResult<EditCommand> {
        Ok(self.editor.apply(track_type, segment_id, value, value_en)?)
    }

    pub fn undo(&mut self) -> SessionResult<Option<EditCommand>> {
        Ok(self.editor.undo()?)
    }

    pub fn redo(&mut self) -> SessionResult<Option<EditCommand>> {
        Ok(self.editor.redo()?)
    }

    pub fn can_undo(&self) -> bool {
        self.editor.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.editor.can_redo()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.editor.has_unsaved_changes()
    }

    pub fn pending_edits(&self) -> Vec<SegmentEdit> {
        self.editor.pending_edits()
    }

    /// Persist pending edits and move the save point
    ///
    /// Returns the number of segments sent. On failure nothing is marked
    /// saved and the edits stay pending.
    pub async fn save(&mut self) -> SessionResult<usize> {
        let edits = self.editor.pending_edits();
        if !edits.is_empty() {
            self.api.save_segment_edits(&self.track_id, &edits).await?;
        }
        self.editor.mark_saved();
        info!(track_id = %self.track_id, edit_count = edits.len(), "Segment edits saved");
        Ok(edits.len())
    }

    /// Revert to the last save point
    pub fn discard_unsaved(&mut self) -> SessionResult<usize> {
        Ok(self.editor.discard_unsaved()?)
    }

    /// Ask to show another track type; may need a save-or-discard decision
    pub fn request_track_type(&mut self, to: TrackType) -> TrackTypeSwitch {
        self.editor.request_track_type(to)
    }

    /// Resolve a switch that returned [`TrackTypeSwitch::NeedsDecision`]
    pub async fn resolve_track_type(
        &mut self,
        to: TrackType,
        decision: UnsavedDecision,
    ) -> SessionResult<TrackTypeSwitch> {
        if decision == UnsavedDecision::Save {
            self.save().await?;
        }
        Ok(self.editor.resolve_track_type(to, decision)?)
    }

    pub fn timeline(&self) -> &TimelineViewState {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut TimelineViewState {
        &mut self.timeline
    }

    /// Point under the shared pointer
    pub fn pointer_point(&self) -> Option<TrackPoint> {
        let state = self.state.read();
        let index = self.timeline.pointer_index(state.points.len())?;
        state.points.get(index).cloned()
    }

    /// Active-type segment under the shared pointer
    pub fn pointer_segment(&self) -> Option<&Segment> {
        let index = self.timeline.pointer_index(self.point_count())?;
        self.editor
            .store()
            .segment_at(self.editor.active_track_type(), index)
    }

    /// Select a segment of the active type and zoom the timeline onto it
    pub fn focus_segment(&mut self, segment_id: &str) -> bool {
        let track_type = self.editor.active_track_type();
        let Some(segment) = self.editor.store().get(track_type, segment_id) else {
            return false;
        };
        let (start, end) = (segment.start_index, segment.end_index);
        let point_count = self.point_count();

        self.timeline.select_segment(segment_id);
        self.timeline.zoom_to_index_range(start, end, point_count)
    }
}

impl Drop for TrackSession {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            live.client.disconnect();
            live.controller.abort();
        }
    }
}

fn warn_out_of_bounds(track_id: &str, segments: &SegmentStore, point_count: usize) {
    for (track_type, segment_id) in segments.out_of_bounds(point_count) {
        warn!(
            track_id = %track_id,
            track_type = %track_type,
            segment_id = %segment_id,
            point_count,
            "Segment extends past the last point"
        );
    }
}
