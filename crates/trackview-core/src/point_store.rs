//! Ordered point storage
//!
//! The [`PointStore`] is the single source of truth for a track's points.
//! Points are kept sorted by `time` using a stable sort, so points with
//! equal timestamps stay in delivery order. Points without a timestamp sort
//! after every timed point, in insertion order.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::point::TrackPoint;

/// Result of merging a point into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The point was new and has been inserted
    Inserted,
    /// A point with the same index existed and was replaced
    Replaced,
}

/// Time-ordered, merge-capable sequence of track points
#[derive(Debug, Clone, Default)]
pub struct PointStore {
    points: Vec<TrackPoint>,
    revision: u64,
}

fn sort_key(point: &TrackPoint) -> (bool, Option<DateTime<Utc>>) {
    (point.time.is_none(), point.time)
}

impl PointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load points from an initial fetch
    ///
    /// Invalid points are skipped; their errors are returned alongside the store.
    pub fn from_points(points: Vec<TrackPoint>) -> (Self, Vec<StoreError>) {
        let mut store = Self::new();
        let errors = store.replace_all(points);
        (store, errors)
    }

    /// Replace the whole sequence, keeping the last occurrence of each index
    pub fn replace_all(&mut self, points: Vec<TrackPoint>) -> Vec<StoreError> {
        let mut errors = Vec::new();
        let mut accepted: Vec<TrackPoint> = Vec::with_capacity(points.len());

        for point in points {
            if let Err(e) = point.validate() {
                errors.push(e);
                continue;
            }
            match accepted.iter_mut().find(|p| p.index == point.index) {
                Some(existing) => *existing = point,
                None => accepted.push(point),
            }
        }

        accepted.sort_by_key(sort_key);
        self.points = accepted;
        self.revision += 1;
        errors
    }

    /// Merge a live point and re-sort
    ///
    /// Redelivered indices replace the stored point in place before sorting.
    pub fn merge(&mut self, point: TrackPoint) -> Result<MergeOutcome, StoreError> {
        point.validate()?;

        let outcome = match self.points.iter_mut().find(|p| p.index == point.index) {
            Some(existing) => {
                *existing = point;
                MergeOutcome::Replaced
            }
            None => {
                self.points.push(point);
                MergeOutcome::Inserted
            }
        };

        self.points.sort_by_key(sort_key);
        self.revision += 1;
        Ok(outcome)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bumped on every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Point at a sequence position (not a point `index`)
    pub fn get(&self, position: usize) -> Option<&TrackPoint> {
        self.points.get(position)
    }

    /// Look up a point by its track-unique index
    pub fn find_by_index(&self, index: u64) -> Option<&TrackPoint> {
        self.points.iter().find(|p| p.index == index)
    }

    pub fn first(&self) -> Option<&TrackPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TrackPoint> {
        self.points.last()
    }

    /// Earliest and latest timestamps present in the store
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        crate::stats::time_range(&self.points)
    }

    /// Owned copy for handing to consumers outside a lock
    pub fn snapshot(&self) -> Vec<TrackPoint> {
        self.points.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn point(index: u64, secs: i64) -> TrackPoint {
        TrackPoint::new(index, 30.0, 114.0).with_time(at(secs))
    }

    fn indices(store: &PointStore) -> Vec<u64> {
        store.points().iter().map(|p| p.index).collect()
    }

    #[test]
    fn test_merge_sorts_out_of_order_delivery() {
        let mut store = PointStore::new();
        // B(t=2), A(t=1), C(t=3)
        store.merge(point(2, 2)).unwrap();
        store.merge(point(1, 1)).unwrap();
        store.merge(point(3, 3)).unwrap();

        assert_eq!(indices(&store), vec![1, 2, 3]);
    }

    #[test]
    fn test_merge_ties_keep_delivery_order() {
        let mut store = PointStore::new();
        store.merge(point(10, 5)).unwrap();
        store.merge(point(7, 5)).unwrap();
        store.merge(point(1, 1)).unwrap();
        store.merge(point(8, 5)).unwrap();

        assert_eq!(indices(&store), vec![1, 10, 7, 8]);
    }

    #[test]
    fn test_untimed_points_follow_timed_in_insertion_order() {
        let mut store = PointStore::new();
        store.merge(TrackPoint::new(5, 30.0, 114.0)).unwrap();
        store.merge(point(2, 9)).unwrap();
        store.merge(TrackPoint::new(3, 30.0, 114.0)).unwrap();
        store.merge(point(1, 4)).unwrap();

        assert_eq!(indices(&store), vec![1, 2, 5, 3]);
    }

    #[test]
    fn test_redelivered_index_replaces_point() {
        let mut store = PointStore::new();
        assert_eq!(store.merge(point(1, 1)).unwrap(), MergeOutcome::Inserted);
        let updated = point(1, 1).with_elevation(42.0);
        assert_eq!(store.merge(updated).unwrap(), MergeOutcome::Replaced);

        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_index(1).unwrap().elevation, Some(42.0));
    }

    #[test]
    fn test_invalid_point_leaves_store_unchanged() {
        let mut store = PointStore::new();
        store.merge(point(1, 1)).unwrap();
        let revision = store.revision();

        let bad = TrackPoint::new(2, 120.0, 0.0);
        assert!(store.merge(bad).is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_bulk_load_skips_invalid_and_sorts() {
        let points = vec![
            point(3, 30),
            TrackPoint::new(9, f64::NAN, 0.0),
            point(1, 10),
            point(2, 20),
        ];
        let (store, errors) = PointStore::from_points(points);

        assert_eq!(errors.len(), 1);
        assert_eq!(indices(&store), vec![1, 2, 3]);
        assert_eq!(store.time_range(), Some((at(10), at(30))));
    }

    #[test]
    fn test_revision_bumps_on_mutation() {
        let mut store = PointStore::new();
        assert_eq!(store.revision(), 0);
        store.merge(point(1, 1)).unwrap();
        store.merge(point(2, 2)).unwrap();
        assert_eq!(store.revision(), 2);
    }
}
