//! Integration tests for live recording sync
//!
//! Runs a real LiveFeedClient over the mock transport into a
//! LiveSyncController backed by the in-memory track service.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use trackview_core::{MemoryTrackApi, PointStore, RecordingStatus, RegionTree, Track, TrackPoint, TrackStats};
use trackview_live::{
    ConnectionStatus, FeedConfig, FeedKey, LiveFeedClient, LiveSyncController, LiveTrack,
    MockFeedTransport, ReconnectPolicy, SharedTrack, SyncConfig, SyncUpdate, WireMessage,
};

struct Session {
    api: Arc<MemoryTrackApi>,
    transport: MockFeedTransport,
    client: Arc<LiveFeedClient>,
    state: SharedTrack,
    updates: broadcast::Receiver<SyncUpdate>,
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

/// Open a live recording with no points yet
fn open_live() -> Session {
    let api = Arc::new(MemoryTrackApi::new());
    let track = Track::new("t1", "Evening run").live("rec-1");
    api.insert_track(track.clone(), vec![], RegionTree::default());

    let state: SharedTrack = Arc::new(RwLock::new(LiveTrack::new(track, PointStore::new())));
    let transport = MockFeedTransport::new();

    let finalized = Arc::clone(&state);
    let client = Arc::new(
        LiveFeedClient::new(
            FeedKey::new("rec-1", "secret"),
            Arc::new(transport.clone()),
            FeedConfig::default().with_reconnect(ReconnectPolicy::fixed(1_000)),
        )
        .with_reconnect_predicate(move || !finalized.read().ended),
    );

    let controller = LiveSyncController::new(
        "t1",
        "rec-1",
        api.clone(),
        Arc::clone(&state),
        &SyncConfig::default(),
    )
    .with_client(Arc::clone(&client));
    let updates = controller.subscribe();

    let (shutdown, shutdown_rx) = broadcast::channel(1);
    let task = controller.spawn(client.subscribe(), shutdown_rx);
    client.connect();

    Session {
        api,
        transport,
        client,
        state,
        updates,
        shutdown,
        task,
    }
}

async fn connected(client: &LiveFeedClient) {
    client
        .status_watch()
        .wait_for(|s| *s == ConnectionStatus::Connected)
        .await
        .unwrap();
}

fn point(index: u64, secs: i64) -> WireMessage {
    WireMessage::PointAdded {
        point: TrackPoint::new(index, 30.0, 114.0 + index as f64 * 0.001)
            .with_time(Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()),
        stats: Some(TrackStats {
            distance: index as f64 * 100.0,
            duration: secs,
            elevation_gain: 0.0,
            elevation_loss: 0.0,
        }),
    }
}

#[tokio::test(start_paused = true)]
async fn test_first_point_reaches_every_reader() {
    let mut s = open_live();
    assert!(s.state.read().is_waiting_for_points());

    connected(&s.client).await;
    assert_eq!(s.transport.keys()[0].token, "secret");

    s.transport.push_message(&point(0, 0));
    assert!(matches!(
        s.updates.recv().await.unwrap(),
        SyncUpdate::PointsChanged { point_count: 1, .. }
    ));

    let state = s.state.read();
    assert!(!state.is_waiting_for_points());
    assert_eq!(state.points.len(), 1);
    assert_eq!(state.summary.point_count, 1);
    assert_eq!(state.summary.stats.duration, 0);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_resumes_stream() {
    let mut s = open_live();
    connected(&s.client).await;

    s.transport.push_message(&point(1, 10));
    s.updates.recv().await.unwrap();

    // Connection drops while the recording is still running
    s.transport.drop_connection();
    tokio::time::sleep(Duration::from_secs(2)).await;
    connected(&s.client).await;
    assert_eq!(s.transport.open_count(), 2);
    assert_eq!(s.api.calls().recording_status, 1);

    // Redelivered point replaces rather than duplicates
    s.transport.push_message(&point(1, 10));
    s.updates.recv().await.unwrap();
    s.transport.push_message(&point(0, 5));
    s.updates.recv().await.unwrap();

    let indices: Vec<u64> = s.state.read().points.points().iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_recording_end_stops_feed_permanently() {
    let mut s = open_live();
    connected(&s.client).await;

    s.transport.push_message(&point(0, 0));
    s.updates.recv().await.unwrap();

    s.api.set_recording_status("rec-1", RecordingStatus::Ended);
    s.transport.server_close();

    loop {
        if let SyncUpdate::RecordingEnded { status } = s.updates.recv().await.unwrap() {
            assert_eq!(status, RecordingStatus::Ended);
            break;
        }
    }

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(s.transport.open_count(), 1);
    assert_eq!(s.client.status(), ConnectionStatus::Disconnected);
    assert!(!s.client.is_active());
    assert_eq!(s.api.calls().regions, 1);
    assert!(s.state.read().ended);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_everything() {
    let s = open_live();
    connected(&s.client).await;
    s.transport.push_message(&point(0, 0));

    s.client.shutdown().await;
    s.shutdown.send(()).unwrap();
    s.task.await.unwrap();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(s.transport.live_connections(), 0);
    assert_eq!(s.transport.open_count(), 1);
    assert_eq!(s.api.calls().regions, 0);
}
