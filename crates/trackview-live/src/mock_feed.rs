//! In-memory feed transport for testing
//!
//! Each successful `open` creates a fresh channel; frames pushed through the
//! transport go to the most recently opened connection.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trackview_live::{MockFeedTransport, WireMessage};
//!
//! let transport = MockFeedTransport::new();
//! transport.fail_next_opens(2);
//!
//! // ... client connects after two failed attempts ...
//! transport.push_message(&WireMessage::Ping);
//! transport.drop_connection();
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use trackview_core::FeedError;

use crate::protocol::{WireMessage, encode_message};
use crate::transport::{FeedConnection, FeedKey, FeedTransport};

type FrameSender = mpsc::UnboundedSender<Result<String, FeedError>>;

#[derive(Default)]
struct MockFeedState {
    /// Successful opens
    opened: usize,
    /// Open attempts, including failed ones
    attempts: usize,
    /// Connections not yet dropped
    live: usize,
    failures_remaining: u32,
    current: Option<FrameSender>,
    keys: Vec<FeedKey>,
}

/// A mock feed transport
///
/// Cloning shares the underlying state, so a test can keep a handle while
/// the client owns another.
#[derive(Clone, Default)]
pub struct MockFeedTransport {
    state: Arc<Mutex<MockFeedState>>,
}

impl MockFeedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to `open` fail
    pub fn fail_next_opens(&self, count: u32) {
        self.state.lock().failures_remaining = count;
    }

    /// Deliver a raw text frame to the current connection
    ///
    /// Returns false if there is no open connection.
    pub fn push(&self, frame: impl Into<String>) -> bool {
        self.send(Ok(frame.into()))
    }

    /// Encode and deliver a message to the current connection
    pub fn push_message(&self, message: &WireMessage) -> bool {
        self.push(encode_message(message))
    }

    /// Deliver a receive error to the current connection
    pub fn push_error(&self, message: impl Into<String>) -> bool {
        self.send(Err(FeedError::ReceiveFailed(message.into())))
    }

    /// Close the current connection from the remote side
    pub fn drop_connection(&self) -> bool {
        self.state.lock().current.take().is_some()
    }

    /// Announce the end of the stream, then close
    pub fn server_close(&self) -> bool {
        let sent = self.push_message(&WireMessage::Disconnected);
        self.drop_connection();
        sent
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().opened
    }

    pub fn attempt_count(&self) -> usize {
        self.state.lock().attempts
    }

    /// Connections opened and not yet dropped by the client
    pub fn live_connections(&self) -> usize {
        self.state.lock().live
    }

    /// Keys passed to every open attempt, in order
    pub fn keys(&self) -> Vec<FeedKey> {
        self.state.lock().keys.clone()
    }

    fn send(&self, frame: Result<String, FeedError>) -> bool {
        match &self.state.lock().current {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl FeedTransport for MockFeedTransport {
    async fn open(&self, key: &FeedKey) -> Result<Box<dyn FeedConnection>, FeedError> {
        let mut state = self.state.lock();
        state.attempts += 1;
        state.keys.push(key.clone());

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(FeedError::ConnectionFailed("mock refused".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.current = Some(tx);
        state.opened += 1;
        state.live += 1;

        Ok(Box::new(MockFeedConnection {
            rx,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockFeedConnection {
    rx: mpsc::UnboundedReceiver<Result<String, FeedError>>,
    state: Arc<Mutex<MockFeedState>>,
}

#[async_trait]
impl FeedConnection for MockFeedConnection {
    async fn recv(&mut self) -> Option<Result<String, FeedError>> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}

impl Drop for MockFeedConnection {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.live = state.live.saturating_sub(1);
    }
}
