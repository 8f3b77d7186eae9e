//! Session context injection
//!
//! Thread-local storage for the identity of the view session currently doing
//! work, so every span opened in that scope carries the track, recording and
//! session ids. Async tasks that hop threads should instead be instrumented
//! with [`SessionContextData::span`].

use std::cell::RefCell;

use uuid::Uuid;

/// Field names used for session context
pub mod fields {
    pub const TRACK_ID: &str = "track_id";
    pub const RECORDING_ID: &str = "recording_id";
    pub const SESSION_ID: &str = "session_id";
}

/// Session context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContextData {
    /// Track being viewed
    pub track_id: String,
    /// Live recording, if the track is being recorded
    pub recording_id: Option<String>,
    /// Unique id of this view session
    pub session_id: Uuid,
}

impl SessionContextData {
    pub fn new(track_id: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            recording_id: None,
            session_id: Uuid::new_v4(),
        }
    }

    pub fn with_recording_id(mut self, recording_id: impl Into<String>) -> Self {
        self.recording_id = Some(recording_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: Uuid) -> Self {
        self.session_id = session_id;
        self
    }

    /// Span carrying this context, for instrumenting async tasks
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "session",
            track_id = %self.track_id,
            recording_id = self.recording_id.as_deref().unwrap_or(""),
            session_id = %self.session_id,
        )
    }
}

thread_local! {
    static SESSION_CONTEXT: RefCell<Option<SessionContextData>> = const { RefCell::new(None) };
}

/// RAII guard for session context
///
/// Sets the session context for the current thread; dropping it restores the
/// previous context (if any).
///
/// # Example
///
/// ```ignore
/// use trackview_logging::{SessionContextData, SessionContextGuard};
///
/// let _guard = SessionContextGuard::new(SessionContextData::new("t1"));
///
/// // Spans opened in this scope carry track_id = "t1"
/// tracing::info!("Loading track");
/// ```
pub struct SessionContextGuard {
    previous: Option<SessionContextData>,
}

impl SessionContextGuard {
    pub fn new(data: SessionContextData) -> Self {
        let previous = SESSION_CONTEXT.with(|ctx| ctx.borrow_mut().replace(data));
        Self { previous }
    }

    /// Get the current session context (if any)
    pub fn current() -> Option<SessionContextData> {
        SESSION_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    pub fn current_track_id() -> Option<String> {
        Self::current().map(|ctx| ctx.track_id)
    }

    pub fn current_session_id() -> Option<Uuid> {
        Self::current().map(|ctx| ctx.session_id)
    }
}

impl Drop for SessionContextGuard {
    fn drop(&mut self) {
        SESSION_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// Run a block with a session context set
///
/// # Example
///
/// ```ignore
/// with_session_context!(SessionContextData::new("t1"), {
///     tracing::info!("Loading track");
/// });
/// ```
#[macro_export]
macro_rules! with_session_context {
    ($data:expr, $body:block) => {{
        let _guard = $crate::context::SessionContextGuard::new($data);
        $body
    }};
}
