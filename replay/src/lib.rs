//! Trackview replay tool
//!
//! Drives a live [`TrackSession`](trackview_session::TrackSession) from a
//! file of recorded feed frames, and computes offline statistics for point
//! files. Everything runs against the in-memory track service; no network
//! is involved.

pub mod replay;
pub mod report;

pub use replay::{ReplayOptions, ReplaySummary, read_frames, run_replay};
pub use report::{SegmentReport, StatsReport, build_report, read_points, read_regions};
