//! # Trackview Edit
//!
//! Command-based editing of segment values.
//!
//! ## Key Types
//!
//! - [`EditHistory`]: Bounded, linear undo/redo stacks with save-point tracking
//! - [`EditCommand`]: One immutable value change, carrying both old and new values
//! - [`SegmentEditor`]: A [`SegmentStore`](trackview_core::SegmentStore) plus
//!   its history and the active track type
//!
//! ## Example
//!
//! ```rust,ignore
//! use trackview_core::TrackType;
//! use trackview_edit::{HistoryConfig, SegmentEditor};
//!
//! let mut editor = SegmentEditor::new(store, &HistoryConfig::default());
//! editor.apply(TrackType::City, "c1", "Wuhan", Some("Wuhan".into()))?;
//! editor.undo()?;
//! assert!(editor.can_redo());
//! ```

pub mod editor;
pub mod history;

pub use editor::{SegmentEditor, TrackTypeSwitch, UnsavedDecision};
pub use history::{EditCommand, EditHistory, HistoryConfig};
