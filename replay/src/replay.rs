//! Feed replay
//!
//! Pushes recorded wire frames through the mock transport into a live
//! [`TrackSession`], mirroring every point into the in-memory track service
//! the way the real server would.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use trackview_core::{MemoryTrackApi, RecordingStatus, RegionTree, Track, TrackStats};
use trackview_live::{ConnectionStatus, MockFeedTransport, SyncUpdate, WireMessage, decode_message};
use trackview_session::{SessionConfig, TrackSession};

pub const TRACK_ID: &str = "replay";
pub const RECORDING_ID: &str = "replay-rec";

/// How a replay is paced and finished
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Pause between frames
    pub frame_interval: Duration,
    /// End the recording after the last frame and wait for finalization
    pub end_recording: bool,
    /// Longest wait for any single session reaction
    pub update_timeout: Duration,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            frame_interval: Duration::ZERO,
            end_recording: false,
            update_timeout: Duration::from_secs(5),
        }
    }
}

/// Session state after a replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub frames: usize,
    /// Frames the client drops without effect
    pub dropped_frames: usize,
    pub rejected_points: usize,
    pub point_count: usize,
    pub point_indices: Vec<u64>,
    pub stats: TrackStats,
    pub segment_count: usize,
    pub feed_connections: usize,
    pub ended: bool,
    pub status: Option<RecordingStatus>,
}

/// Non-empty lines of a JSONL frame file
pub fn read_frames(path: &Path) -> anyhow::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read frames from {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Replay `frames` through a fresh live session
pub async fn run_replay(
    frames: &[String],
    regions: RegionTree,
    config: SessionConfig,
    options: &ReplayOptions,
) -> anyhow::Result<ReplaySummary> {
    let api = Arc::new(MemoryTrackApi::new());
    api.insert_track(Track::new(TRACK_ID, "Replay").live(RECORDING_ID), vec![], regions);
    let transport = MockFeedTransport::new();

    let mut session = TrackSession::open(TRACK_ID, api.clone(), config).await?;
    session.attach_live(Arc::new(transport.clone()), "replay")?;
    let mut updates = session.subscribe_updates();
    wait_connected(&session, options.update_timeout).await?;

    let mut dropped_frames = 0;
    let mut rejected_points = 0;

    for (line, frame) in frames.iter().enumerate() {
        let message = match decode_message(frame) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(line = line + 1, error = %e, "Frame will be dropped by the client");
                dropped_frames += 1;
                None
            }
        };

        if let Some(WireMessage::PointAdded { point, stats }) = &message {
            let (point, stats) = (point.clone(), *stats);
            api.update_track(TRACK_ID, |track| {
                if let Some(stats) = stats {
                    track.apply_server_stats(stats);
                }
                if let Some(time) = point.time {
                    track.widen_time_range(time);
                }
            });
            api.push_point(TRACK_ID, point);
        }

        let expects_point = matches!(message, Some(WireMessage::PointAdded { .. })) && !session.is_ended();
        while !transport.push(frame.clone()) {
            debug!(line = line + 1, "Feed not connected, waiting before resending");
            tokio::time::sleep(Duration::from_millis(10)).await;
            wait_connected(&session, options.update_timeout).await?;
        }

        // The client closes the connection on a server disconnect frame;
        // anything pushed before it does would be lost
        if matches!(message, Some(WireMessage::Disconnected)) {
            wait_status(&session, options.update_timeout, |s| s != ConnectionStatus::Connected).await?;
        }
        if expects_point && !wait_for_point(&mut updates, options.update_timeout).await? {
            rejected_points += 1;
        }
        if !options.frame_interval.is_zero() {
            tokio::time::sleep(options.frame_interval).await;
        }
    }

    if options.end_recording && !session.is_ended() {
        api.set_recording_status(RECORDING_ID, RecordingStatus::Ended);
        // A status check already in flight may finalize before the close lands
        tokio::time::timeout(options.update_timeout, async {
            while !session.is_ended() && !transport.server_close() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .context("Timed out closing the feed")?;
        wait_for_end(&mut updates, options.update_timeout).await?;
    }

    session.refresh_segments();
    let track = session.track();
    let summary = ReplaySummary {
        frames: frames.len(),
        dropped_frames,
        rejected_points,
        point_count: session.point_count(),
        point_indices: session.points().iter().map(|p| p.index).collect(),
        stats: track.stats,
        segment_count: session.segment_store().len(),
        feed_connections: transport.open_count(),
        ended: session.is_ended(),
        status: track.status,
    };

    session.close().await;
    info!(
        frames = summary.frames,
        point_count = summary.point_count,
        ended = summary.ended,
        "Replay finished"
    );
    Ok(summary)
}

async fn wait_connected(session: &TrackSession, timeout: Duration) -> anyhow::Result<()> {
    wait_status(session, timeout, |s| s == ConnectionStatus::Connected).await
}

async fn wait_status(
    session: &TrackSession,
    timeout: Duration,
    predicate: impl Fn(ConnectionStatus) -> bool,
) -> anyhow::Result<()> {
    let mut status = session.connection_watch().context("Live feed not attached")?;
    tokio::time::timeout(timeout, status.wait_for(|s| predicate(*s)))
        .await
        .context("Timed out waiting for a connection status change")?
        .context("Feed status channel closed")?;
    Ok(())
}

/// Wait until the controller has handled one point; false if it was rejected
async fn wait_for_point(
    updates: &mut tokio::sync::broadcast::Receiver<SyncUpdate>,
    timeout: Duration,
) -> anyhow::Result<bool> {
    loop {
        match next_update(updates, timeout).await? {
            Some(SyncUpdate::PointsChanged { .. }) => return Ok(true),
            Some(SyncUpdate::PointRejected { point_index, reason }) => {
                warn!(point_index, reason = %reason, "Point rejected");
                return Ok(false);
            }
            Some(SyncUpdate::RecordingEnded { .. }) => return Ok(false),
            Some(SyncUpdate::RegionsRefreshed { .. }) | None => {}
        }
    }
}

async fn wait_for_end(
    updates: &mut tokio::sync::broadcast::Receiver<SyncUpdate>,
    timeout: Duration,
) -> anyhow::Result<()> {
    loop {
        if let Some(SyncUpdate::RecordingEnded { .. }) = next_update(updates, timeout).await? {
            return Ok(());
        }
    }
}

/// Next update; `None` after a lag, which the controller recovers from itself
async fn next_update(
    updates: &mut tokio::sync::broadcast::Receiver<SyncUpdate>,
    timeout: Duration,
) -> anyhow::Result<Option<SyncUpdate>> {
    match tokio::time::timeout(timeout, updates.recv()).await {
        Err(_) => bail!("Timed out waiting for a session update"),
        Ok(Ok(update)) => Ok(Some(update)),
        Ok(Err(RecvError::Lagged(skipped))) => {
            warn!(skipped, "Replay fell behind session updates");
            Ok(None)
        }
        Ok(Err(RecvError::Closed)) => bail!("Session update channel closed"),
    }
}
