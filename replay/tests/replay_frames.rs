//! End-to-end replay of recorded frames

use chrono::{TimeZone, Utc};

use trackview_core::{RecordingStatus, RegionNode, RegionTree, TrackPoint, TrackStats, TrackType};
use trackview_live::{WireMessage, encode_message};
use trackview_replay::{ReplayOptions, read_frames, run_replay};
use trackview_session::SessionConfig;

fn point_frame(index: u64, secs: i64) -> String {
    encode_message(&WireMessage::PointAdded {
        point: TrackPoint::new(index, 30.0 + index as f64 * 0.001, 114.0)
            .with_time(Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()),
        stats: Some(TrackStats {
            distance: 100.0 * secs as f64,
            duration: secs,
            elevation_gain: 0.0,
            elevation_loss: 0.0,
        }),
    })
}

fn write_frames(frames: &[String]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frames.jsonl");
    std::fs::write(&path, frames.join("\n\n")).unwrap();
    (dir, path)
}

#[tokio::test]
async fn test_replay_out_of_order_frames_and_end() {
    let (_dir, path) = write_frames(&[
        r#"{"type":"connected"}"#.to_string(),
        point_frame(0, 0),
        point_frame(2, 20),
        "not json".to_string(),
        point_frame(1, 10),
        r#"{"type":"error","data":{"message":"upstream hiccup"}}"#.to_string(),
    ]);
    let frames = read_frames(&path).unwrap();
    assert_eq!(frames.len(), 6);

    let regions = RegionTree {
        regions: vec![RegionNode::leaf("p1", TrackType::Province, "Hubei", 0, 2)],
        roads: vec![],
    };
    let options = ReplayOptions {
        end_recording: true,
        ..ReplayOptions::default()
    };

    let summary = run_replay(&frames, regions, SessionConfig::default(), &options)
        .await
        .unwrap();

    assert_eq!(summary.frames, 6);
    assert_eq!(summary.dropped_frames, 1);
    assert_eq!(summary.rejected_points, 0);
    assert_eq!(summary.point_count, 3);
    assert_eq!(summary.point_indices, vec![0, 1, 2]);
    // Stats are whatever the server sent last, not recomputed
    assert_eq!(summary.stats.duration, 10);
    assert_eq!(summary.segment_count, 1);
    assert_eq!(summary.feed_connections, 1);
    assert!(summary.ended);
    assert_eq!(summary.status, Some(RecordingStatus::Ended));
}

#[tokio::test]
async fn test_replay_without_end_keeps_recording_open() {
    let (_dir, path) = write_frames(&[point_frame(0, 0)]);
    let frames = read_frames(&path).unwrap();

    let summary = run_replay(
        &frames,
        RegionTree::default(),
        SessionConfig::default(),
        &ReplayOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(summary.point_count, 1);
    assert!(!summary.ended);
    assert_eq!(summary.status, Some(RecordingStatus::Recording));
}
