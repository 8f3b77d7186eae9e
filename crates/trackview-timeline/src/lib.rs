//! # Trackview Timeline
//!
//! The single shared answer to "where in the track are we looking and
//! pointing". The map, the elevation chart and the segment ruler all read and
//! write one [`TimelineViewState`].
//!
//! Positions are normalized to `[0, 1]` along the whole track and map to point
//! indices through [`point_index_for_position`] / [`position_for_index`].

pub mod mapping;
pub mod state;

pub use mapping::{point_index_for_position, position_for_index};
pub use state::{TimelineConfig, TimelineViewState, ZoomWindow};
