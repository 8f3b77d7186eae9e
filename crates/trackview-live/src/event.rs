//! Live feed events

use chrono::{DateTime, Utc};

use trackview_core::{TrackPoint, TrackStats};

/// Why a live connection went away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// The owner called `disconnect()`
    Requested,
    /// The transport closed or errored
    TransportClosed,
    /// The server announced the end of the stream
    ServerClosed,
    /// Reconnect attempts ran out
    ReconnectExhausted,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::TransportClosed => write!(f, "transport closed"),
            Self::ServerClosed => write!(f, "server closed"),
            Self::ReconnectExhausted => write!(f, "reconnect exhausted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectedEvent {
    pub recording_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisconnectedEvent {
    pub recording_id: String,
    pub reason: DisconnectReason,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointAddedEvent {
    pub point: TrackPoint,
    /// Authoritative aggregates after this point, if the server sent them
    pub stats: Option<TrackStats>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Events emitted by the live feed client
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    Connected(ConnectedEvent),
    Disconnected(DisconnectedEvent),
    PointAdded(PointAddedEvent),
    Error(ErrorEvent),
}

impl LiveEvent {
    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Connected(e) => e.timestamp,
            Self::Disconnected(e) => e.timestamp,
            Self::PointAdded(e) => e.timestamp,
            Self::Error(e) => e.timestamp,
        }
    }

    /// Create a connected event
    pub fn connected(recording_id: impl Into<String>) -> Self {
        Self::Connected(ConnectedEvent {
            recording_id: recording_id.into(),
            timestamp: Utc::now(),
        })
    }

    /// Create a disconnected event
    pub fn disconnected(recording_id: impl Into<String>, reason: DisconnectReason) -> Self {
        Self::Disconnected(DisconnectedEvent {
            recording_id: recording_id.into(),
            reason,
            timestamp: Utc::now(),
        })
    }

    /// Create a point added event
    pub fn point_added(point: TrackPoint, stats: impl Into<Option<TrackStats>>) -> Self {
        Self::PointAdded(PointAddedEvent {
            point,
            stats: stats.into(),
            timestamp: Utc::now(),
        })
    }

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorEvent {
            message: message.into(),
            timestamp: Utc::now(),
        })
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::Disconnected(_) => "disconnected",
            Self::PointAdded(_) => "point_added",
            Self::Error(_) => "error",
        }
    }
}
