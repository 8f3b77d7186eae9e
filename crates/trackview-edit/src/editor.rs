//! Segment editor
//!
//! Owns one track's [`SegmentStore`] together with its [`EditHistory`] and
//! the track type currently shown in the segment ruler.

use tracing::{debug, info};

use trackview_core::{EditError, Segment, SegmentEdit, SegmentStore, TrackType};

use crate::history::{EditCommand, EditHistory, HistoryConfig};

/// Outcome of asking to switch the active track type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackTypeSwitch {
    /// The active track type changed
    Switched { from: TrackType, to: TrackType },
    /// Already on the requested track type, or the switch was cancelled
    Unchanged,
    /// Unsaved edits must be saved or discarded first
    NeedsDecision {
        from: TrackType,
        to: TrackType,
        pending: usize,
    },
}

/// Caller's answer to [`TrackTypeSwitch::NeedsDecision`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsavedDecision {
    /// Persist pending edits, then switch
    Save,
    /// Revert to the last save point, then switch
    Discard,
    /// Stay on the current track type
    Cancel,
}

/// Editing state for one track
#[derive(Debug, Clone)]
pub struct SegmentEditor {
    store: SegmentStore,
    history: EditHistory,
    active: TrackType,
}

impl SegmentEditor {
    pub fn new(store: SegmentStore, config: &HistoryConfig) -> Self {
        Self {
            store,
            history: EditHistory::new(config),
            active: TrackType::Province,
        }
    }

    pub fn with_active_track_type(mut self, track_type: TrackType) -> Self {
        self.active = track_type;
        self
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn active_track_type(&self) -> TrackType {
        self.active
    }

    /// Segments of the active track type
    pub fn active_segments(&self) -> &[Segment] {
        self.store.segments(self.active)
    }

    pub fn can_apply(&self, track_type: TrackType, segment_id: &str) -> bool {
        self.history.can_apply(&self.store, track_type, segment_id)
    }

    pub fn apply(
        &mut self,
        track_type: TrackType,
        segment_id: &str,
        value: impl Into<String>,
        value_en: Option<String>,
    ) -> Result<EditCommand, EditError> {
        self.history
            .apply(&mut self.store, track_type, segment_id, value, value_en)
    }

    pub fn undo(&mut self) -> Result<Option<EditCommand>, EditError> {
        self.history.undo(&mut self.store)
    }

    pub fn redo(&mut self) -> Result<Option<EditCommand>, EditError> {
        self.history.redo(&mut self.store)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.history.has_unsaved_changes()
    }

    pub fn pending_edits(&self) -> Vec<SegmentEdit> {
        self.history.pending_edits(&self.store)
    }

    pub fn mark_saved(&mut self) {
        self.history.mark_saved();
    }

    pub fn discard_unsaved(&mut self) -> Result<usize, EditError> {
        self.history.discard_unsaved(&mut self.store)
    }

    /// Ask to show a different track type
    ///
    /// Switches immediately when there is nothing unsaved.
    pub fn request_track_type(&mut self, to: TrackType) -> TrackTypeSwitch {
        let from = self.active;
        if from == to {
            return TrackTypeSwitch::Unchanged;
        }
        if self.has_unsaved_changes() {
            let pending = self.pending_edits().len();
            debug!(from = %from, to = %to, pending, "Track type switch needs a decision");
            return TrackTypeSwitch::NeedsDecision { from, to, pending };
        }
        self.switch_to(to)
    }

    /// Resolve a pending switch
    ///
    /// For [`UnsavedDecision::Save`] the caller persists
    /// [`pending_edits`](Self::pending_edits) and calls
    /// [`mark_saved`](Self::mark_saved) first; if changes are still unsaved
    /// the decision is asked for again.
    pub fn resolve_track_type(
        &mut self,
        to: TrackType,
        decision: UnsavedDecision,
    ) -> Result<TrackTypeSwitch, EditError> {
        match decision {
            UnsavedDecision::Cancel => Ok(TrackTypeSwitch::Unchanged),
            UnsavedDecision::Discard => {
                self.discard_unsaved()?;
                Ok(self.request_track_type(to))
            }
            UnsavedDecision::Save => Ok(self.request_track_type(to)),
        }
    }

    /// Replace every segment with freshly computed ones
    ///
    /// Refused while edits are unsaved; returns whether the store was replaced.
    pub fn replace_segments(&mut self, segments: impl IntoIterator<Item = Segment>) -> bool {
        if self.has_unsaved_changes() {
            debug!("Keeping edited segments; refresh skipped");
            return false;
        }
        self.store.replace_all(segments);
        self.history.clear();
        true
    }

    fn switch_to(&mut self, to: TrackType) -> TrackTypeSwitch {
        let from = self.active;
        self.active = to;
        info!(from = %from, to = %to, "Switched track type");
        TrackTypeSwitch::Switched { from, to }
    }
}
