//! Region/road hierarchy computed by the server

use serde::{Deserialize, Serialize};

use crate::segment::{Segment, TrackType};

/// One node in the region tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionNode {
    pub id: String,
    pub level: TrackType,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    pub start_index: usize,
    pub end_index: usize,
    #[serde(default)]
    pub children: Vec<RegionNode>,
}

impl RegionNode {
    pub fn leaf(
        id: impl Into<String>,
        level: TrackType,
        name: impl Into<String>,
        start_index: usize,
        end_index: usize,
    ) -> Self {
        Self {
            id: id.into(),
            level,
            name: name.into(),
            name_en: None,
            start_index,
            end_index,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<RegionNode>) -> Self {
        self.children = children;
        self
    }

    fn collect_segments(&self, out: &mut Vec<Segment>) {
        // Inverted ranges from the server are dropped rather than propagated
        if self.start_index <= self.end_index {
            out.push(Segment {
                id: self.id.clone(),
                track_type: self.level,
                start_index: self.start_index,
                end_index: self.end_index,
                value: self.name.clone(),
                value_en: self.name_en.clone(),
            });
        }
        for child in &self.children {
            child.collect_segments(out);
        }
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(RegionNode::count).sum::<usize>()
    }
}

/// Province → city → district hierarchy plus a flat list of roads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionTree {
    pub regions: Vec<RegionNode>,
    pub roads: Vec<RegionNode>,
}

impl RegionTree {
    /// Flatten into segments, depth-first
    pub fn segments(&self) -> Vec<Segment> {
        let mut out = Vec::new();
        for node in self.regions.iter().chain(self.roads.iter()) {
            node.collect_segments(&mut out);
        }
        out
    }

    pub fn node_count(&self) -> usize {
        self.regions
            .iter()
            .chain(self.roads.iter())
            .map(RegionNode::count)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.roads.is_empty()
    }
}
