//! # Trackview Live
//!
//! Live recording synchronization for Trackview.
//!
//! A [`LiveFeedClient`] keeps one connection open per recording and turns wire
//! frames into [`LiveEvent`]s. A [`LiveSyncController`] consumes those events
//! on its own task, merging points into the shared [`LiveTrack`] and
//! rate-limiting the expensive region refresh.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trackview_live::*;
//!
//! let client = Arc::new(LiveFeedClient::new(key, transport, FeedConfig::default()));
//! let controller = LiveSyncController::new("t1", "rec-1", api, state, &SyncConfig::default())
//!     .with_client(Arc::clone(&client));
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
//! let task = controller.spawn(client.subscribe(), shutdown_rx);
//! client.connect();
//! ```

pub mod backoff;
pub mod client;
pub mod controller;
pub mod event;
pub mod mock_feed;
pub mod protocol;
pub mod throttle;
pub mod transport;

pub use backoff::ReconnectPolicy;
pub use client::{ConnectionStatus, FeedConfig, LiveFeedClient, ReconnectPredicate};
pub use controller::{LiveSyncController, LiveTrack, SharedTrack, SyncConfig, SyncUpdate};
pub use event::*;
pub use mock_feed::MockFeedTransport;
pub use protocol::{WireMessage, decode_message, encode_message};
pub use throttle::RefreshThrottle;
pub use transport::{FeedConnection, FeedKey, FeedTransport};
