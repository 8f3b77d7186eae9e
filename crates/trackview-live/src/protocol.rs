//! Wire protocol for the live feed
//!
//! Frames are JSON text of the form `{"type": ..., "data": ...}`. Only
//! `point_added` and `error` carry a payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use trackview_core::{DecodeError, TrackPoint, TrackStats};

/// Frame envelope as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PointAddedPayload {
    point: TrackPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stats: Option<TrackStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorPayload {
    message: String,
}

/// Decoded feed message
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// `stats` is absent when the server sent only the point
    PointAdded {
        point: TrackPoint,
        stats: Option<TrackStats>,
    },
    Connected,
    Disconnected,
    Error { message: String },
    Ping,
}

impl WireMessage {
    /// Frame type tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PointAdded { .. } => "point_added",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error { .. } => "error",
            Self::Ping => "ping",
        }
    }
}

fn payload<T: serde::de::DeserializeOwned>(kind: &str, data: Option<Value>) -> Result<T, DecodeError> {
    let data = data.ok_or_else(|| DecodeError::MissingPayload(kind.to_string()))?;
    serde_json::from_value(data).map_err(|e| DecodeError::InvalidPayload(format!("{}: {}", kind, e)))
}

/// Decode one text frame
pub fn decode_message(text: &str) -> Result<WireMessage, DecodeError> {
    let frame: RawFrame =
        serde_json::from_str(text).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    match frame.kind.as_str() {
        "point_added" => {
            let p: PointAddedPayload = payload(&frame.kind, frame.data)?;
            Ok(WireMessage::PointAdded {
                point: p.point,
                stats: p.stats,
            })
        }
        "connected" => Ok(WireMessage::Connected),
        "disconnected" => Ok(WireMessage::Disconnected),
        "error" => {
            let p: ErrorPayload = payload(&frame.kind, frame.data)?;
            Ok(WireMessage::Error { message: p.message })
        }
        "ping" => Ok(WireMessage::Ping),
        other => Err(DecodeError::UnknownType(other.to_string())),
    }
}

/// Encode a message as a text frame
///
/// Used by the mock transport and the replay tool to produce frames.
pub fn encode_message(message: &WireMessage) -> String {
    let data = match message {
        WireMessage::PointAdded { point, stats } => serde_json::to_value(PointAddedPayload {
            point: point.clone(),
            stats: *stats,
        })
        .ok(),
        WireMessage::Error { message } => serde_json::to_value(ErrorPayload {
            message: message.clone(),
        })
        .ok(),
        _ => None,
    };
    let frame = RawFrame {
        kind: message.kind().to_string(),
        data,
    };
    serde_json::to_string(&frame).unwrap_or_default()
}
