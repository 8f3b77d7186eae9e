//! Track segments

use serde::{Deserialize, Serialize};

use crate::error::EditError;

/// Kind of annotation a segment carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    Province,
    City,
    District,
    Road,
}

impl TrackType {
    pub const ALL: [TrackType; 4] = [Self::Province, Self::City, Self::District, Self::Road];
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Province => write!(f, "province"),
            Self::City => write!(f, "city"),
            Self::District => write!(f, "district"),
            Self::Road => write!(f, "road"),
        }
    }
}

/// A contiguous index range of points sharing one region value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub track_type: TrackType,
    pub start_index: usize,
    pub end_index: usize,
    pub value: String,
    #[serde(default)]
    pub value_en: Option<String>,
}

impl Segment {
    pub fn new(
        id: impl Into<String>,
        track_type: TrackType,
        start_index: usize,
        end_index: usize,
        value: impl Into<String>,
    ) -> Result<Self, EditError> {
        if start_index > end_index {
            return Err(EditError::InvalidRange {
                start: start_index,
                end: end_index,
            });
        }
        Ok(Self {
            id: id.into(),
            track_type,
            start_index,
            end_index,
            value: value.into(),
            value_en: None,
        })
    }

    pub fn with_value_en(mut self, value_en: impl Into<String>) -> Self {
        self.value_en = Some(value_en.into());
        self
    }

    /// Number of points covered (inclusive range, never zero)
    pub fn point_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn contains(&self, point_index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&point_index)
    }

    /// True if the range lies inside a store of `point_count` points
    pub fn within_bounds(&self, point_count: usize) -> bool {
        self.start_index <= self.end_index && self.end_index < point_count
    }
}

/// Net value of one segment, as sent to the save endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEdit {
    pub track_type: TrackType,
    pub segment_id: String,
    pub value: String,
    pub value_en: Option<String>,
}
