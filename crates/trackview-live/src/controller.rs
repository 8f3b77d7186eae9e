//! Live sync controller
//!
//! Bridges feed events into the shared [`LiveTrack`]:
//! - Merges each point into the [`PointStore`] and adopts the server's stats
//! - Throttles region refreshes to one per interval (trailing edge)
//! - Re-checks the recording status when the feed drops, and finalizes the
//!   track once the recording has ended
//!
//! All mutation happens on the controller task. Readers take the
//! [`SharedTrack`] read lock; the write lock is never held across an await.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use trackview_core::{PointStore, RecordingStatus, RegionTree, Track, TrackApi, TrackPoint, TrackStats};

use crate::client::LiveFeedClient;
use crate::event::{DisconnectReason, LiveEvent};
use crate::throttle::RefreshThrottle;

/// Track state shared between the controller and its readers
#[derive(Debug, Clone)]
pub struct LiveTrack {
    pub summary: Track,
    pub points: PointStore,
    pub regions: Option<RegionTree>,
    /// Set once the recording has been confirmed ended
    pub ended: bool,
}

impl LiveTrack {
    pub fn new(summary: Track, points: PointStore) -> Self {
        Self {
            summary,
            points,
            regions: None,
            ended: false,
        }
    }

    pub fn with_regions(mut self, regions: RegionTree) -> Self {
        self.regions = Some(regions);
        self
    }

    /// A live recording that has not produced its first point yet
    pub fn is_waiting_for_points(&self) -> bool {
        self.points.is_empty() && !self.ended && self.summary.is_live()
    }
}

pub type SharedTrack = Arc<RwLock<LiveTrack>>;

/// Configuration for the sync controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Minimum spacing between region refreshes
    pub region_refresh_interval_ms: u64,
    /// Buffered updates per subscriber
    pub update_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            region_refresh_interval_ms: 10_000,
            update_channel_capacity: 256,
        }
    }
}

impl SyncConfig {
    pub fn with_region_refresh_interval_ms(mut self, ms: u64) -> Self {
        self.region_refresh_interval_ms = ms;
        self
    }

    pub fn with_update_channel_capacity(mut self, capacity: usize) -> Self {
        self.update_channel_capacity = capacity;
        self
    }

    pub fn region_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.region_refresh_interval_ms)
    }
}

/// State changes announced to dependent views
#[derive(Debug, Clone, PartialEq)]
pub enum SyncUpdate {
    /// The point sequence or track summary changed
    PointsChanged { point_count: usize, revision: u64 },
    /// A live point could not be merged
    PointRejected { point_index: u64, reason: String },
    /// A new region tree is available
    RegionsRefreshed { segment_count: usize },
    /// The recording ended and the track has been finalized
    RecordingEnded { status: RecordingStatus },
}

/// Applies live feed events to a [`SharedTrack`]
pub struct LiveSyncController {
    track_id: String,
    recording_id: String,
    api: Arc<dyn TrackApi>,
    state: SharedTrack,
    client: Option<Arc<LiveFeedClient>>,
    throttle: RefreshThrottle,
    update_tx: broadcast::Sender<SyncUpdate>,
}

impl LiveSyncController {
    pub fn new(
        track_id: impl Into<String>,
        recording_id: impl Into<String>,
        api: Arc<dyn TrackApi>,
        state: SharedTrack,
        config: &SyncConfig,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(config.update_channel_capacity.max(1));
        Self {
            track_id: track_id.into(),
            recording_id: recording_id.into(),
            api,
            state,
            client: None,
            throttle: RefreshThrottle::new(config.region_refresh_interval()),
            update_tx,
        }
    }

    /// Client to stop permanently once the recording ends
    pub fn with_client(mut self, client: Arc<LiveFeedClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Publish on an existing update channel instead of a private one
    pub fn with_update_sender(mut self, update_tx: broadcast::Sender<SyncUpdate>) -> Self {
        self.update_tx = update_tx;
        self
    }

    /// Sender side of the update channel, for subscribing later
    pub fn updates(&self) -> broadcast::Sender<SyncUpdate> {
        self.update_tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncUpdate> {
        self.update_tx.subscribe()
    }

    pub fn state(&self) -> SharedTrack {
        Arc::clone(&self.state)
    }

    /// Spawn the controller as a background task
    pub fn spawn(
        self,
        events: broadcast::Receiver<LiveEvent>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(events, shutdown_rx))
    }

    /// Run the controller loop until shutdown or until the feed goes away
    pub async fn run(
        mut self,
        mut events: broadcast::Receiver<LiveEvent>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        info!(
            track_id = %self.track_id,
            recording_id = %self.recording_id,
            interval_ms = self.throttle.interval().as_millis() as u64,
            "Live sync controller started"
        );

        loop {
            let deadline = self.throttle.deadline();

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    if self.throttle.cancel() {
                        debug!(track_id = %self.track_id, "Cancelled pending region refresh");
                    }
                    info!(track_id = %self.track_id, "Live sync controller shutting down");
                    break;
                }
                event = events.recv() => match event {
                    Ok(event) => self.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(track_id = %self.track_id, skipped, "Controller lagged behind live feed, resyncing");
                        self.resync_points().await;
                    }
                    Err(RecvError::Closed) => {
                        info!(track_id = %self.track_id, "Live feed closed, controller stopping");
                        self.throttle.cancel();
                        break;
                    }
                },
                _ = async {
                    match deadline {
                        Some(deadline) => tokio::time::sleep_until(deadline).await,
                        None => std::future::pending().await,
                    }
                } => {
                    if self.throttle.fire(Instant::now()) {
                        self.refresh_regions().await;
                    }
                }
            }
        }
    }

    /// Process one feed event
    pub async fn handle_event(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::PointAdded(e) => self.on_point_added(e.point, e.stats),
            LiveEvent::Disconnected(e) if e.reason == DisconnectReason::Requested => {
                debug!(recording_id = %self.recording_id, "Feed disconnected by request");
            }
            LiveEvent::Disconnected(e) => {
                debug!(recording_id = %self.recording_id, reason = %e.reason, "Feed dropped, checking recording status");
                self.check_recording_status().await;
            }
            LiveEvent::Error(e) => {
                debug!(recording_id = %self.recording_id, message = %e.message, "Feed error, checking recording status");
                self.check_recording_status().await;
            }
            LiveEvent::Connected(_) => {
                debug!(recording_id = %self.recording_id, "Feed connected");
            }
        }
    }

    /// Merge a live point and adopt the server's aggregates when present
    fn on_point_added(&mut self, point: TrackPoint, stats: Option<TrackStats>) {
        let point_index = point.index;
        let time = point.time;

        let result = {
            let mut state = self.state.write();
            if state.ended {
                debug!(track_id = %self.track_id, point_index, "Dropping point after recording ended");
                return;
            }
            state.points.merge(point).map(|_| {
                if let Some(stats) = stats {
                    state.summary.apply_server_stats(stats);
                }
                if let Some(time) = time {
                    state.summary.widen_time_range(time);
                }
                state.summary.point_count = state.points.len();
                (state.points.len(), state.points.revision())
            })
        };

        match result {
            Ok((point_count, revision)) => {
                debug!(track_id = %self.track_id, point_index, point_count, "Point merged");
                self.publish(SyncUpdate::PointsChanged {
                    point_count,
                    revision,
                });
                if self.throttle.request(Instant::now()) {
                    debug!(
                        track_id = %self.track_id,
                        delay_ms = self.throttle.interval().as_millis() as u64,
                        "Region refresh scheduled"
                    );
                }
            }
            Err(e) => {
                warn!(track_id = %self.track_id, point_index, error = %e, "Rejected live point");
                self.publish(SyncUpdate::PointRejected {
                    point_index,
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Ask the service whether the recording is still active
    ///
    /// Returns the status if it could be fetched.
    pub async fn check_recording_status(&mut self) -> Option<RecordingStatus> {
        if self.state.read().ended {
            return Some(RecordingStatus::Ended);
        }

        let status = match self.api.fetch_recording_status(&self.recording_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(recording_id = %self.recording_id, error = %e, "Recording status check failed");
                return None;
            }
        };

        if status.is_active() {
            debug!(recording_id = %self.recording_id, status = %status, "Recording still active");
        } else {
            self.finalize(status).await;
        }
        Some(status)
    }

    /// Stop the feed for good and bring the track to its terminal state
    async fn finalize(&mut self, status: RecordingStatus) {
        info!(track_id = %self.track_id, recording_id = %self.recording_id, "Recording ended, finalizing track");

        {
            let mut state = self.state.write();
            state.ended = true;
            state.summary.status = Some(status);
        }

        if let Some(client) = &self.client {
            client.disconnect();
        }
        if self.throttle.cancel() {
            debug!(track_id = %self.track_id, "Cancelled pending region refresh");
        }

        self.refresh_regions().await;

        match self.api.fetch_track_detail(&self.track_id).await {
            Ok(mut track) => {
                let mut state = self.state.write();
                // Keep the confirmed status even if the detail lags behind
                track.status = Some(status);
                state.summary = track;
            }
            Err(e) => {
                warn!(track_id = %self.track_id, error = %e, "Failed to refetch final track detail");
            }
        }

        self.publish(SyncUpdate::RecordingEnded { status });
    }

    /// Fetch the region tree and store it
    pub async fn refresh_regions(&mut self) {
        match self.api.fetch_regions(&self.track_id).await {
            Ok(tree) => {
                let segment_count = tree.segments().len();
                self.state.write().regions = Some(tree);
                debug!(track_id = %self.track_id, segment_count, "Regions refreshed");
                self.publish(SyncUpdate::RegionsRefreshed { segment_count });
            }
            Err(e) => {
                warn!(track_id = %self.track_id, error = %e, "Region refresh failed");
            }
        }
    }

    /// Reload every point after missing feed events
    async fn resync_points(&mut self) {
        let points = match self.api.fetch_track_points(&self.track_id).await {
            Ok(points) => points,
            Err(e) => {
                warn!(track_id = %self.track_id, error = %e, "Point resync failed");
                return;
            }
        };

        let (errors, point_count, revision) = {
            let mut state = self.state.write();
            if state.ended {
                return;
            }
            let errors = state.points.replace_all(points);
            state.summary.point_count = state.points.len();
            (errors, state.points.len(), state.points.revision())
        };

        for e in &errors {
            warn!(track_id = %self.track_id, error = %e, "Skipped invalid point during resync");
        }
        self.publish(SyncUpdate::PointsChanged {
            point_count,
            revision,
        });
        self.throttle.request(Instant::now());
    }

    fn publish(&self, update: SyncUpdate) {
        // No subscribers is fine
        let _ = self.update_tx.send(update);
    }
}
