//! Live feed client
//!
//! Maintains one logical connection per (recording id, token) pair and turns
//! wire frames into [`LiveEvent`]s.
//!
//! Handles:
//! - Idempotent connect; at most one worker per client
//! - Reconnect with exponential backoff, gated by a caller predicate
//! - Decoding, where a bad frame is dropped and never stops the worker
//!
//! Events fan out over a `broadcast` channel so any number of listeners can
//! subscribe; the connection status is published on a `watch` channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use trackview_core::DecodeError;

use crate::backoff::ReconnectPolicy;
use crate::event::{DisconnectReason, LiveEvent};
use crate::protocol::{WireMessage, decode_message};
use crate::transport::{FeedConnection, FeedKey, FeedTransport};

/// Connection status of a live feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Configuration for the live feed client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Reconnect backoff
    pub reconnect: ReconnectPolicy,
    /// Buffered events per subscriber before it starts lagging
    pub event_channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            event_channel_capacity: 256,
        }
    }
}

impl FeedConfig {
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }
}

/// Decides whether a dropped connection should be re-established
pub type ReconnectPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

struct WorkerHandle {
    shutdown_tx: broadcast::Sender<()>,
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Client for one live recording feed
///
/// # Example
///
/// ```rust,ignore
/// let client = LiveFeedClient::new(key, Arc::new(transport), FeedConfig::default());
/// let mut events = client.subscribe();
/// client.connect();
///
/// while let Ok(event) = events.recv().await {
///     println!("{}", event.kind());
/// }
/// ```
pub struct LiveFeedClient {
    key: FeedKey,
    transport: Arc<dyn FeedTransport>,
    config: FeedConfig,
    should_reconnect: ReconnectPredicate,
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
    event_tx: broadcast::Sender<LiveEvent>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl LiveFeedClient {
    /// Create a client that always reconnects
    pub fn new(key: FeedKey, transport: Arc<dyn FeedTransport>, config: FeedConfig) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            key,
            transport,
            config,
            should_reconnect: Arc::new(|| true),
            status_tx: Arc::new(status_tx),
            event_tx,
            worker: Mutex::new(None),
        }
    }

    /// Set the predicate consulted before every reconnect
    pub fn with_reconnect_predicate(
        mut self,
        predicate: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_reconnect = Arc::new(predicate);
        self
    }

    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    pub fn recording_id(&self) -> &str {
        &self.key.recording_id
    }

    /// Subscribe to feed events
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.event_tx.subscribe()
    }

    /// Current connection status
    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    /// Watch connection status changes
    pub fn status_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// True while a worker is connecting, connected or waiting to reconnect
    pub fn is_active(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|w| !w.task.is_finished())
    }

    /// Start the connection
    ///
    /// No-op while a worker is alive, including during a reconnect backoff.
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|w| !w.task.is_finished()) {
            debug!(recording_id = %self.key.recording_id, "Live feed already active");
            return;
        }

        let stopped = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        self.status_tx.send_replace(ConnectionStatus::Connecting);

        let feed = FeedWorker {
            key: self.key.clone(),
            transport: Arc::clone(&self.transport),
            policy: self.config.reconnect.clone(),
            should_reconnect: Arc::clone(&self.should_reconnect),
            status_tx: Arc::clone(&self.status_tx),
            event_tx: self.event_tx.clone(),
            stopped: Arc::clone(&stopped),
        };
        let task = tokio::spawn(feed.run(shutdown_rx));

        *worker = Some(WorkerHandle {
            shutdown_tx,
            stopped,
            task,
        });
    }

    /// Close the connection and suppress further reconnects
    ///
    /// Always emits `Disconnected(Requested)`, also when the worker had
    /// already stopped or `connect()` was never called.
    pub fn disconnect(&self) {
        // Dropping the handle detaches the task; it exits on the shutdown signal
        let _ = self.stop();
        self.announce_disconnect();
    }

    /// Disconnect and wait for the worker to finish
    ///
    /// Emits `Disconnected(Requested)` only if there was a worker to stop.
    pub async fn shutdown(&self) {
        if let Some(task) = self.stop() {
            self.announce_disconnect();
            if let Err(e) = task.await {
                warn!(recording_id = %self.key.recording_id, error = %e, "Live feed worker failed");
            }
        }
    }

    fn stop(&self) -> Option<JoinHandle<()>> {
        let handle = self.worker.lock().take();
        self.status_tx.send_replace(ConnectionStatus::Disconnected);

        let handle = handle?;
        handle.stopped.store(true, Ordering::SeqCst);
        let _ = handle.shutdown_tx.send(());
        Some(handle.task)
    }

    fn announce_disconnect(&self) {
        info!(recording_id = %self.key.recording_id, "Live feed disconnected by request");
        let _ = self.event_tx.send(LiveEvent::disconnected(
            self.key.recording_id.clone(),
            DisconnectReason::Requested,
        ));
    }
}

impl Drop for LiveFeedClient {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.get_mut().take() {
            handle.stopped.store(true, Ordering::SeqCst);
            handle.task.abort();
        }
    }
}

/// How a connection's receive loop ended
enum PumpExit {
    Shutdown,
    Closed(DisconnectReason),
}

/// Background connection loop owned by one `connect()` call
struct FeedWorker {
    key: FeedKey,
    transport: Arc<dyn FeedTransport>,
    policy: ReconnectPolicy,
    should_reconnect: ReconnectPredicate,
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
    event_tx: broadcast::Sender<LiveEvent>,
    stopped: Arc<AtomicBool>,
}

impl FeedWorker {
    async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        // Reconnects scheduled since the last successful open
        let mut attempt: u32 = 0;

        loop {
            if self.is_stopped() {
                break;
            }
            self.set_status(ConnectionStatus::Connecting);

            let opened = tokio::select! {
                _ = shutdown_rx.recv() => break,
                result = self.transport.open(&self.key) => result,
            };

            match opened {
                Ok(mut conn) => {
                    attempt = 0;
                    info!(recording_id = %self.key.recording_id, "Live feed connected");
                    self.set_status(ConnectionStatus::Connected);
                    self.emit(LiveEvent::connected(self.key.recording_id.clone()));

                    let exit = self.pump(conn.as_mut(), &mut shutdown_rx).await;
                    conn.close().await;
                    match exit {
                        PumpExit::Shutdown => break,
                        PumpExit::Closed(reason) => {
                            info!(
                                recording_id = %self.key.recording_id,
                                reason = %reason,
                                "Live feed connection closed"
                            );
                            self.set_status(ConnectionStatus::Disconnected);
                            self.emit(LiveEvent::disconnected(self.key.recording_id.clone(), reason));
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        recording_id = %self.key.recording_id,
                        attempt,
                        error = %e,
                        "Live feed connection failed"
                    );
                    self.set_status(ConnectionStatus::Error);
                    self.emit(LiveEvent::error(e.to_string()));
                }
            }

            if self.is_stopped() {
                break;
            }
            if !(self.should_reconnect)() {
                info!(recording_id = %self.key.recording_id, "Reconnect not wanted, stopping live feed");
                self.set_status(ConnectionStatus::Disconnected);
                break;
            }
            if !self.policy.allows(attempt) {
                warn!(
                    recording_id = %self.key.recording_id,
                    attempts = attempt,
                    "Reconnect attempts exhausted"
                );
                self.set_status(ConnectionStatus::Disconnected);
                self.emit(LiveEvent::disconnected(
                    self.key.recording_id.clone(),
                    DisconnectReason::ReconnectExhausted,
                ));
                break;
            }

            let delay = self.policy.delay_for(attempt);
            debug!(
                recording_id = %self.key.recording_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Scheduling reconnect"
            );
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            attempt = attempt.saturating_add(1);
        }

        debug!(recording_id = %self.key.recording_id, "Live feed worker stopped");
    }

    /// Receive frames until the connection closes or shutdown is signalled
    async fn pump(
        &self,
        conn: &mut dyn FeedConnection,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> PumpExit {
        loop {
            let frame = tokio::select! {
                _ = shutdown_rx.recv() => return PumpExit::Shutdown,
                frame = conn.recv() => frame,
            };

            let text = match frame {
                None => return PumpExit::Closed(DisconnectReason::TransportClosed),
                Some(Err(e)) => {
                    warn!(recording_id = %self.key.recording_id, error = %e, "Live feed receive failed");
                    return PumpExit::Closed(DisconnectReason::TransportClosed);
                }
                Some(Ok(text)) => text,
            };

            match decode_message(&text) {
                Ok(WireMessage::PointAdded { point, stats }) => {
                    debug!(
                        recording_id = %self.key.recording_id,
                        point_index = point.index,
                        "Point received"
                    );
                    self.emit(LiveEvent::point_added(point, stats));
                }
                Ok(WireMessage::Disconnected) => {
                    return PumpExit::Closed(DisconnectReason::ServerClosed);
                }
                Ok(WireMessage::Error { message }) => {
                    warn!(recording_id = %self.key.recording_id, message = %message, "Server reported error");
                    self.emit(LiveEvent::error(message));
                }
                // Connected is emitted when the connection opens
                Ok(message @ (WireMessage::Connected | WireMessage::Ping)) => {
                    debug!(recording_id = %self.key.recording_id, kind = message.kind(), "Control frame");
                }
                Err(DecodeError::UnknownType(kind)) => {
                    debug!(recording_id = %self.key.recording_id, kind = %kind, "Ignoring unknown frame type");
                }
                Err(e) => {
                    warn!(recording_id = %self.key.recording_id, error = %e, "Dropping undecodable frame");
                }
            }
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Publish a status change unless the owner has already stopped us
    fn set_status(&self, status: ConnectionStatus) {
        let stopped = &self.stopped;
        self.status_tx.send_if_modified(|current| {
            if stopped.load(Ordering::SeqCst) || *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    fn emit(&self, event: LiveEvent) {
        if self.is_stopped() {
            return;
        }
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
