//! Segment storage grouped by track type

use std::collections::BTreeMap;

use crate::error::EditError;
use crate::segment::{Segment, TrackType};

/// All segments of one track, grouped by [`TrackType`] and ordered by start index
///
/// Values change only through the edit history; the ranges themselves come
/// from server-side region computation and are replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentStore {
    segments: BTreeMap<TrackType, Vec<Segment>>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut store = Self::new();
        store.replace_all(segments);
        store
    }

    pub fn replace_all(&mut self, segments: impl IntoIterator<Item = Segment>) {
        self.segments.clear();
        for segment in segments {
            self.segments
                .entry(segment.track_type)
                .or_default()
                .push(segment);
        }
        for list in self.segments.values_mut() {
            list.sort_by_key(|s| s.start_index);
        }
    }

    pub fn segments(&self, track_type: TrackType) -> &[Segment] {
        self.segments
            .get(&track_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, track_type: TrackType, segment_id: &str) -> Option<&Segment> {
        self.segments(track_type).iter().find(|s| s.id == segment_id)
    }

    pub fn contains(&self, track_type: TrackType, segment_id: &str) -> bool {
        self.get(track_type, segment_id).is_some()
    }

    /// Overwrite a segment's value pair
    pub fn set_value(
        &mut self,
        track_type: TrackType,
        segment_id: &str,
        value: &str,
        value_en: Option<&str>,
    ) -> Result<(), EditError> {
        let segment = self
            .segments
            .get_mut(&track_type)
            .and_then(|list| list.iter_mut().find(|s| s.id == segment_id))
            .ok_or_else(|| EditError::SegmentNotFound {
                track_type,
                segment_id: segment_id.to_string(),
            })?;

        segment.value = value.to_string();
        segment.value_en = value_en.map(str::to_string);
        Ok(())
    }

    /// Segment of `track_type` covering a point position
    pub fn segment_at(&self, track_type: TrackType, point_index: usize) -> Option<&Segment> {
        self.segments(track_type)
            .iter()
            .find(|s| s.contains(point_index))
    }

    /// Ids of segments whose range exceeds `point_count`
    pub fn out_of_bounds(&self, point_count: usize) -> Vec<(TrackType, String)> {
        self.segments
            .values()
            .flatten()
            .filter(|s| !s.within_bounds(point_count))
            .map(|s| (s.track_type, s.id.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.segments.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values().flatten()
    }
}
