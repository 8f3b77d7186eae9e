//! Transport abstraction for the live feed
//!
//! The [`FeedTransport`] trait opens one persistent connection for a
//! recording. The client only ever sees text frames, so the same reconnect
//! and decoding logic runs over a real socket or an in-memory channel.
//!
//! ## Implementations
//!
//! - [`MockFeedTransport`](crate::MockFeedTransport): In-memory transport for
//!   tests and the replay tool

use async_trait::async_trait;

use trackview_core::FeedError;

/// Identifies one logical live connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey {
    pub recording_id: String,
    pub token: String,
}

impl FeedKey {
    pub fn new(recording_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            recording_id: recording_id.into(),
            token: token.into(),
        }
    }
}

/// Opens live connections
///
/// # Example
///
/// ```rust,ignore
/// use trackview_live::{FeedKey, FeedTransport};
///
/// async fn first_frame<T: FeedTransport>(transport: &T) -> Option<String> {
///     let mut conn = transport.open(&FeedKey::new("rec-1", "token")).await.ok()?;
///     conn.recv().await?.ok()
/// }
/// ```
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Open a connection for `key`
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::ConnectionFailed`] if the connection cannot be
    /// established.
    async fn open(&self, key: &FeedKey) -> Result<Box<dyn FeedConnection>, FeedError>;
}

/// One open connection delivering text frames
#[async_trait]
pub trait FeedConnection: Send {
    /// Receive the next frame
    ///
    /// Returns `None` once the remote side has closed the connection.
    async fn recv(&mut self) -> Option<Result<String, FeedError>>;

    /// Close the connection from our side
    async fn close(&mut self);
}
