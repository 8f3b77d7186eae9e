//! # Trackview Session
//!
//! Composition root for one opened track. A [`TrackSession`] loads the track
//! through a [`TrackApi`](trackview_core::TrackApi), builds its own stores,
//! and optionally follows a live recording.
//!
//! ```ignore
//! use trackview_session::{SessionConfig, TrackSession};
//!
//! let mut session = TrackSession::open("t1", api, SessionConfig::default()).await?;
//! if session.track().is_live() {
//!     session.attach_live(transport, token)?;
//! }
//!
//! let mut updates = session.subscribe_updates();
//! while let Ok(update) = updates.recv().await {
//!     redraw(session.points());
//! }
//!
//! session.close().await;
//! ```
//!
//! Sessions share nothing; opening the same track twice yields two
//! independent sets of stores.

pub mod config;
pub mod error;
pub mod session;

pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use session::TrackSession;
