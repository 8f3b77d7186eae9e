//! Integration tests for the track session
//!
//! Opens sessions over the in-memory track service and, for live
//! recordings, the mock feed transport.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use trackview_core::{
    ApiCall, MemoryTrackApi, RecordingStatus, RegionNode, RegionTree, Track, TrackPoint,
    TrackStats, TrackType,
};
use trackview_edit::{TrackTypeSwitch, UnsavedDecision};
use trackview_live::{ConnectionStatus, MockFeedTransport, SyncUpdate, WireMessage};
use trackview_session::{SessionConfig, SessionError, TrackSession};

fn points(count: u64) -> Vec<TrackPoint> {
    (0..count)
        .map(|i| {
            TrackPoint::new(i, 30.0 + i as f64 * 0.001, 114.0)
                .with_time(Utc.timestamp_opt(1_714_557_600 + i as i64 * 10, 0).unwrap())
                .with_elevation(20.0 + i as f64)
        })
        .collect()
}

fn regions() -> RegionTree {
    RegionTree {
        regions: vec![RegionNode::leaf("p1", TrackType::Province, "Hubei", 0, 19)
            .with_children(vec![
                RegionNode::leaf("c1", TrackType::City, "Wuhan", 0, 9),
                RegionNode::leaf("c2", TrackType::City, "Xiaogan", 10, 19),
            ])],
        roads: vec![RegionNode::leaf("r1", TrackType::Road, "G4", 15, 25)],
    }
}

async fn open_finished() -> (Arc<MemoryTrackApi>, TrackSession) {
    let api = Arc::new(MemoryTrackApi::new());
    api.insert_track(Track::new("t1", "Morning ride"), points(20), regions());
    let session = TrackSession::open("t1", api.clone(), SessionConfig::default())
        .await
        .unwrap();
    (api, session)
}

#[tokio::test]
async fn test_open_builds_stores() {
    let (api, mut session) = open_finished().await;

    assert_eq!(session.point_count(), 20);
    assert_eq!(session.track().point_count, 20);
    assert!(!session.is_waiting_for_points());
    assert_eq!(session.active_track_type(), TrackType::Province);
    assert_eq!(session.segments().len(), 1);
    assert_eq!(session.segment_store().len(), 4);
    assert_eq!(session.connection_status(), ConnectionStatus::Disconnected);

    let calls = api.calls();
    assert_eq!((calls.track_detail, calls.track_points, calls.regions), (1, 1, 1));

    let err = session
        .attach_live(Arc::new(MockFeedTransport::new()), "secret")
        .unwrap_err();
    assert!(matches!(err, SessionError::NotLive(_)));
}

#[tokio::test]
async fn test_open_unknown_track_fails() {
    let api = Arc::new(MemoryTrackApi::new());
    let result = TrackSession::open("missing", api, SessionConfig::default()).await;
    assert!(matches!(result, Err(SessionError::Api(_))));
}

#[tokio::test]
async fn test_open_survives_region_failure() {
    let api = Arc::new(MemoryTrackApi::new());
    api.insert_track(Track::new("t1", "Walk"), points(20), regions());
    api.fail(ApiCall::Regions);

    let mut session = TrackSession::open("t1", api.clone(), SessionConfig::default())
        .await
        .unwrap();
    assert!(session.segment_store().is_empty());
    assert!(!session.refresh_segments());
}

#[tokio::test]
async fn test_save_then_switch_track_type() {
    let (api, mut session) = open_finished().await;

    session
        .apply_edit(TrackType::City, "c1", "Wuhan City", Some("Wuhan".into()))
        .unwrap();
    assert!(session.has_unsaved_changes());

    let switch = session.request_track_type(TrackType::City);
    assert_eq!(
        switch,
        TrackTypeSwitch::NeedsDecision {
            from: TrackType::Province,
            to: TrackType::City,
            pending: 1,
        }
    );

    let switch = session
        .resolve_track_type(TrackType::City, UnsavedDecision::Save)
        .await
        .unwrap();
    assert!(matches!(switch, TrackTypeSwitch::Switched { .. }));
    assert!(!session.has_unsaved_changes());
    assert_eq!(session.segments()[0].value, "Wuhan City");

    let saved = api.saved_edits();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, "t1");
    assert_eq!(saved[0].1[0].segment_id, "c1");
    assert_eq!(saved[0].1[0].value_en.as_deref(), Some("Wuhan"));

    // Undo past the save point is dirty again
    session.undo().unwrap();
    assert!(session.has_unsaved_changes());
    assert!(session.can_redo());
}

#[tokio::test]
async fn test_failed_save_keeps_edits_pending() {
    let (api, mut session) = open_finished().await;
    session.apply_edit(TrackType::Road, "r1", "G4 Expressway", None).unwrap();

    api.fail(ApiCall::SaveEdits);
    assert!(matches!(session.save().await, Err(SessionError::Api(_))));
    assert!(session.has_unsaved_changes());
    assert_eq!(session.pending_edits().len(), 1);

    // Edits block segment refresh until they are resolved
    assert!(!session.refresh_segments());

    api.clear_failures();
    assert_eq!(session.save().await.unwrap(), 1);
    assert!(!session.has_unsaved_changes());
    assert!(session.refresh_segments());
    assert!(!session.can_undo());
}

#[tokio::test]
async fn test_discard_decision_reverts() {
    let (_api, mut session) = open_finished().await;
    session.apply_edit(TrackType::Province, "p1", "Hunan", None).unwrap();

    let switch = session
        .resolve_track_type(TrackType::City, UnsavedDecision::Discard)
        .await
        .unwrap();
    assert!(matches!(switch, TrackTypeSwitch::Switched { .. }));
    assert_eq!(
        session.segment_store().get(TrackType::Province, "p1").unwrap().value,
        "Hubei"
    );
}

#[tokio::test]
async fn test_pointer_follows_focused_segment() {
    let (_api, mut session) = open_finished().await;
    assert!(matches!(
        session.request_track_type(TrackType::City),
        TrackTypeSwitch::Switched { .. }
    ));

    assert!(session.focus_segment("c2"));
    assert!(!session.focus_segment("nope"));
    assert_eq!(session.timeline().highlighted_segment(), Some("c2"));

    let (first, last) = session.timeline().visible_index_range(20).unwrap();
    assert_eq!((first, last), (10, 19));

    session.timeline_mut().set_pointer_index(12, 20);
    assert_eq!(session.pointer_point().unwrap().index, 12);
    assert_eq!(session.pointer_segment().unwrap().id, "c2");

    let stats = session.segment_stats(TrackType::City, "c2").unwrap();
    assert_eq!(stats.duration, 90);
    assert_eq!(stats.elevation_gain, 9.0);
}

fn live_point(index: u64) -> (WireMessage, TrackStats) {
    let stats = TrackStats {
        distance: 120.0 * index as f64,
        duration: 10 * index as i64,
        elevation_gain: 3.0,
        elevation_loss: 0.0,
    };
    let point = TrackPoint::new(index, 30.0, 114.0)
        .with_time(Utc.timestamp_opt(1_714_557_600 + index as i64 * 10, 0).unwrap());
    (
        WireMessage::PointAdded {
            point,
            stats: Some(stats),
        },
        stats,
    )
}

async fn open_live() -> (Arc<MemoryTrackApi>, MockFeedTransport, TrackSession) {
    let api = Arc::new(MemoryTrackApi::new());
    api.insert_track(
        Track::new("t1", "Evening run").live("rec-1"),
        vec![],
        RegionTree::default(),
    );
    let transport = MockFeedTransport::new();

    let mut session = TrackSession::open("t1", api.clone(), SessionConfig::default())
        .await
        .unwrap();
    session.attach_live(Arc::new(transport.clone()), "secret").unwrap();

    session
        .connection_watch()
        .unwrap()
        .wait_for(|s| *s == ConnectionStatus::Connected)
        .await
        .unwrap();
    (api, transport, session)
}

#[tokio::test(start_paused = true)]
async fn test_live_session_end_to_end() {
    let (api, transport, mut session) = open_live().await;
    assert!(session.is_waiting_for_points());
    assert_eq!(session.context().recording_id.as_deref(), Some("rec-1"));
    assert_eq!(transport.keys()[0].recording_id, "rec-1");

    let mut updates = session.subscribe_updates();
    let (message, stats) = live_point(0);
    transport.push_message(&message);
    assert!(matches!(
        updates.recv().await.unwrap(),
        SyncUpdate::PointsChanged { point_count: 1, .. }
    ));

    assert!(!session.is_waiting_for_points());
    assert_eq!(session.points().len(), 1);
    assert_eq!(session.track().stats, stats);

    // The trailing-edge refresh lands one interval later
    api.set_regions(
        "t1",
        RegionTree {
            regions: vec![RegionNode::leaf("p1", TrackType::Province, "Hubei", 0, 0)],
            roads: vec![],
        },
    );
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(
        updates.recv().await.unwrap(),
        SyncUpdate::RegionsRefreshed { segment_count: 1 }
    );
    assert!(session.refresh_segments());
    assert_eq!(session.segments().len(), 1);

    // Recording ends on the server; the feed stops for good
    api.set_recording_status("rec-1", RecordingStatus::Ended);
    transport.server_close();
    loop {
        if let SyncUpdate::RecordingEnded { status } = updates.recv().await.unwrap() {
            assert_eq!(status, RecordingStatus::Ended);
            break;
        }
    }

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(session.is_ended());
    assert_eq!(session.track().status, Some(RecordingStatus::Ended));
    assert_eq!(session.connection_status(), ConnectionStatus::Disconnected);
    assert_eq!(transport.open_count(), 1);

    session.close().await;
    assert_eq!(transport.live_connections(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_attach_twice_is_rejected() {
    let (_api, transport, mut session) = open_live().await;
    let err = session
        .attach_live(Arc::new(transport.clone()), "secret")
        .unwrap_err();
    assert!(matches!(err, SessionError::AlreadyAttached(_)));
    assert_eq!(transport.open_count(), 1);
    session.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_pending_refresh() {
    let (api, transport, session) = open_live().await;
    let (message, _) = live_point(0);
    transport.push_message(&message);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(session.point_count(), 1);

    session.close().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(api.calls().regions, 1);
    assert_eq!(transport.live_connections(), 0);
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_session_stops_feed() {
    let (_api, transport, session) = open_live().await;
    assert_eq!(transport.live_connections(), 1);

    drop(session);
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(transport.live_connections(), 0);
    assert_eq!(transport.open_count(), 1);
}
