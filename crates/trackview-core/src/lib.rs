//! # Trackview Core
//!
//! Core types, stores, and errors for the Trackview GPS track viewer.
//!
//! Everything in this crate is free of I/O: the live feed, the edit history
//! and the timeline all build on these types, and the external services the
//! viewer talks to are reached only through the [`TrackApi`] trait.
//!
//! ## Key Types
//!
//! - [`TrackPoint`]: A single GPS fix with optional geocoding metadata
//! - [`PointStore`]: Time-ordered, merge-capable point sequence
//! - [`Segment`] / [`SegmentStore`]: Index ranges sharing one region value
//! - [`Track`] / [`TrackStats`]: Track summary and aggregate statistics
//! - [`RegionTree`]: Server-computed region/road hierarchy
//!
//! ## Key Traits
//!
//! - [`TrackApi`]: Request/response collaborator (fetch, save, status)
//!
//! The [`stats`] module holds the pure statistics reducers.

pub mod error;
pub mod point;
pub mod point_store;
pub mod region;
pub mod segment;
pub mod segment_store;
pub mod stats;
pub mod track;
pub mod traits;
pub mod mock_api;

// Re-export main types
pub use error::*;
pub use point::*;
pub use point_store::*;
pub use region::*;
pub use segment::*;
pub use segment_store::*;
pub use track::*;
pub use traits::*;
pub use mock_api::*;
