//! Error types for Trackview

use thiserror::Error;

use crate::segment::TrackType;

/// Top-level error type for Trackview
#[derive(Debug, Error)]
pub enum TrackviewError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    #[error("Api error: {0}")]
    Api(#[from] ApiError),
}

/// Errors raised by the live feed transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Reconnect attempts exhausted after {0} tries")]
    ReconnectExhausted(u32),
}

/// Errors decoding a live feed frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Missing payload for message type: {0}")]
    MissingPayload(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Errors mutating the point store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Point {index} has invalid coordinates ({lat}, {lon})")]
    InvalidCoordinate { index: u64, lat: f64, lon: f64 },

    #[error("Point {index} has non-finite {field}")]
    NonFiniteValue { index: u64, field: &'static str },
}

/// Errors applying segment edits
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Segment not found: {track_type}/{segment_id}")]
    SegmentNotFound {
        track_type: TrackType,
        segment_id: String,
    },

    #[error("Invalid segment range: {start}..={end}")]
    InvalidRange { start: usize, end: usize },
}

/// Errors returned by the external track service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),
}

/// Result type alias for Trackview operations
pub type TrackviewResult<T> = Result<T, TrackviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_error_display() {
        let err = FeedError::ConnectionFailed("refused".to_string());
        assert!(format!("{}", err).contains("Connection failed"));
        assert!(format!("{}", err).contains("refused"));

        assert!(format!("{}", FeedError::ConnectionClosed).contains("closed"));
        assert!(format!("{}", FeedError::ReconnectExhausted(5)).contains('5'));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::UnknownType("bogus".to_string());
        assert!(format!("{}", err).contains("bogus"));

        let err = DecodeError::MissingPayload("point_added".to_string());
        assert!(format!("{}", err).contains("point_added"));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::InvalidCoordinate {
            index: 7,
            lat: 91.0,
            lon: 0.0,
        };
        let msg = format!("{}", err);
        assert!(msg.contains('7'));
        assert!(msg.contains("91"));

        let err = StoreError::NonFiniteValue {
            index: 3,
            field: "elevation",
        };
        assert!(format!("{}", err).contains("elevation"));
    }

    #[test]
    fn test_edit_error_display() {
        let err = EditError::SegmentNotFound {
            track_type: TrackType::City,
            segment_id: "seg-1".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("city"));
        assert!(msg.contains("seg-1"));

        let err = EditError::InvalidRange { start: 9, end: 2 };
        assert!(format!("{}", err).contains("9..=2"));
    }

    #[test]
    fn test_error_conversions() {
        let err: TrackviewError = FeedError::ConnectionClosed.into();
        assert!(matches!(err, TrackviewError::Feed(_)));

        let err: TrackviewError = DecodeError::InvalidJson("eof".into()).into();
        assert!(matches!(err, TrackviewError::Decode(_)));

        let err: TrackviewError = ApiError::NotFound("track".into()).into();
        assert!(matches!(err, TrackviewError::Api(_)));

        let err: TrackviewError = EditError::InvalidRange { start: 1, end: 0 }.into();
        assert!(matches!(err, TrackviewError::Edit(_)));
    }

    #[test]
    fn test_trackview_error_display() {
        let err: TrackviewError = ApiError::Request("timeout".to_string()).into();
        let msg = format!("{}", err);
        assert!(msg.contains("Api error"));
        assert!(msg.contains("timeout"));
    }
}
