//! Undo/redo history over segment value edits
//!
//! Every edit is a self-contained [`EditCommand`] holding both the value it
//! replaced and the value it set, so undo and redo never need to consult
//! anything but the command and the [`SegmentStore`].
//!
//! The history is linear: applying a new command after an undo discards the
//! redo stack. The undo stack is bounded; the oldest entry is evicted first.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use trackview_core::{EditError, SegmentEdit, SegmentStore, TrackType};

/// Id of the state before any command; also the initial save point
const ORIGIN: u64 = 0;

/// Configuration for the edit history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum entries kept on the undo stack
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl HistoryConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// One applied segment value change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCommand {
    /// Monotonic within one history
    pub id: u64,
    pub track_type: TrackType,
    pub segment_id: String,
    pub previous_value: String,
    pub previous_value_en: Option<String>,
    pub new_value: String,
    pub new_value_en: Option<String>,
}

type SegmentKey = (TrackType, String);

/// Bounded linear undo/redo history
#[derive(Debug, Clone)]
pub struct EditHistory {
    undo_stack: VecDeque<EditCommand>,
    redo_stack: Vec<EditCommand>,
    capacity: usize,
    next_id: u64,
    /// State id of the last persisted save
    save_point: u64,
    /// State id reached by the most recently evicted command
    evicted_tip: u64,
    /// Values at the save point of every segment touched since
    baseline: BTreeMap<SegmentKey, (String, Option<String>)>,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}

impl EditHistory {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            capacity: config.capacity.max(1),
            next_id: ORIGIN + 1,
            save_point: ORIGIN,
            evicted_tip: ORIGIN,
            baseline: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `apply` would accept an edit to this segment
    pub fn can_apply(&self, store: &SegmentStore, track_type: TrackType, segment_id: &str) -> bool {
        store.contains(track_type, segment_id)
    }

    /// Apply a new value to a segment and record it
    ///
    /// Unknown segments are rejected before anything changes. A successful
    /// apply clears the redo stack.
    pub fn apply(
        &mut self,
        store: &mut SegmentStore,
        track_type: TrackType,
        segment_id: &str,
        new_value: impl Into<String>,
        new_value_en: Option<String>,
    ) -> Result<EditCommand, EditError> {
        let segment = store
            .get(track_type, segment_id)
            .ok_or_else(|| EditError::SegmentNotFound {
                track_type,
                segment_id: segment_id.to_string(),
            })?;

        let command = EditCommand {
            id: self.next_id,
            track_type,
            segment_id: segment_id.to_string(),
            previous_value: segment.value.clone(),
            previous_value_en: segment.value_en.clone(),
            new_value: new_value.into(),
            new_value_en,
        };

        self.remember_baseline(
            track_type,
            segment_id,
            &command.previous_value,
            &command.previous_value_en,
        );
        store.set_value(
            track_type,
            segment_id,
            &command.new_value,
            command.new_value_en.as_deref(),
        )?;
        self.next_id += 1;

        if !self.redo_stack.is_empty() {
            debug!(dropped = self.redo_stack.len(), "Truncating redo history");
            self.redo_stack.clear();
        }
        self.undo_stack.push_back(command.clone());
        if self.undo_stack.len() > self.capacity {
            if let Some(evicted) = self.undo_stack.pop_front() {
                self.evicted_tip = evicted.id;
            }
        }

        debug!(
            command_id = command.id,
            track_type = %track_type,
            segment_id = %segment_id,
            "Applied segment edit"
        );
        Ok(command)
    }

    /// Revert the most recent command
    ///
    /// Returns `Ok(None)` when there is nothing to undo. If the segment no
    /// longer exists the command stays on the stack and an error is returned.
    pub fn undo(&mut self, store: &mut SegmentStore) -> Result<Option<EditCommand>, EditError> {
        let Some(command) = self.undo_stack.pop_back() else {
            return Ok(None);
        };

        if let Err(e) = store.set_value(
            command.track_type,
            &command.segment_id,
            &command.previous_value,
            command.previous_value_en.as_deref(),
        ) {
            self.undo_stack.push_back(command);
            return Err(e);
        }

        self.remember_baseline(
            command.track_type,
            &command.segment_id,
            &command.new_value,
            &command.new_value_en,
        );
        debug!(command_id = command.id, "Undid segment edit");
        self.redo_stack.push(command.clone());
        Ok(Some(command))
    }

    /// Re-apply the most recently undone command
    pub fn redo(&mut self, store: &mut SegmentStore) -> Result<Option<EditCommand>, EditError> {
        let Some(command) = self.redo_stack.pop() else {
            return Ok(None);
        };

        if let Err(e) = store.set_value(
            command.track_type,
            &command.segment_id,
            &command.new_value,
            command.new_value_en.as_deref(),
        ) {
            self.redo_stack.push(command);
            return Err(e);
        }

        self.remember_baseline(
            command.track_type,
            &command.segment_id,
            &command.previous_value,
            &command.previous_value_en,
        );
        debug!(command_id = command.id, "Redid segment edit");
        // Redo only ever refills what undo emptied, so capacity holds
        self.undo_stack.push_back(command.clone());
        Ok(Some(command))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Next command `undo` would revert
    pub fn peek_undo(&self) -> Option<&EditCommand> {
        self.undo_stack.back()
    }

    /// Next command `redo` would re-apply
    pub fn peek_redo(&self) -> Option<&EditCommand> {
        self.redo_stack.last()
    }

    /// Id of the state the store is currently in
    fn current_state(&self) -> u64 {
        self.undo_stack.back().map_or(self.evicted_tip, |c| c.id)
    }

    /// True when the store differs from the last save point
    pub fn has_unsaved_changes(&self) -> bool {
        self.current_state() != self.save_point
    }

    /// Record the current state as persisted; the stacks are kept
    pub fn mark_saved(&mut self) {
        self.save_point = self.current_state();
        self.baseline.clear();
        debug!(save_point = self.save_point, "Marked history saved");
    }

    /// Net value of every segment changed since the last save
    ///
    /// Segments edited and then changed back are omitted.
    pub fn pending_edits(&self, store: &SegmentStore) -> Vec<SegmentEdit> {
        self.baseline
            .iter()
            .filter_map(|((track_type, segment_id), (value, value_en))| {
                let segment = store.get(*track_type, segment_id)?;
                if segment.value == *value && segment.value_en == *value_en {
                    return None;
                }
                Some(SegmentEdit {
                    track_type: *track_type,
                    segment_id: segment_id.clone(),
                    value: segment.value.clone(),
                    value_en: segment.value_en.clone(),
                })
            })
            .collect()
    }

    /// Return the store to the last save point
    ///
    /// Walks the undo or redo stack when the save point is still reachable.
    /// Otherwise the saved values are restored directly and the history is
    /// cleared. Returns the number of segments that changed.
    pub fn discard_unsaved(&mut self, store: &mut SegmentStore) -> Result<usize, EditError> {
        let pending = self.pending_edits(store).len();
        if !self.has_unsaved_changes() {
            return Ok(pending);
        }

        let target = self.save_point;
        if self.undo_stack.iter().any(|c| c.id == target) || target == self.evicted_tip {
            while self.current_state() != target {
                if self.undo(store)?.is_none() {
                    break;
                }
            }
        } else if self.redo_stack.iter().any(|c| c.id == target) {
            while self.current_state() != target {
                if self.redo(store)?.is_none() {
                    break;
                }
            }
        } else {
            for ((track_type, segment_id), (value, value_en)) in &self.baseline {
                if store.contains(*track_type, segment_id) {
                    store.set_value(*track_type, segment_id, value, value_en.as_deref())?;
                }
            }
            self.clear();
        }

        self.baseline.clear();
        debug!(reverted = pending, "Discarded unsaved edits");
        Ok(pending)
    }

    /// Forget every command and treat the current store as saved
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.evicted_tip = ORIGIN;
        self.save_point = ORIGIN;
        self.baseline.clear();
    }

    /// Keep the value a segment had before its first change since the save
    fn remember_baseline(
        &mut self,
        track_type: TrackType,
        segment_id: &str,
        value: &str,
        value_en: &Option<String>,
    ) {
        self.baseline
            .entry((track_type, segment_id.to_string()))
            .or_insert_with(|| (value.to_string(), value_en.clone()));
    }
}
