//! Mapping between normalized positions and point indices

/// Point under a normalized position along a track of `point_count` points
///
/// Returns `None` for an empty track. Positions outside `[0, 1]` are clamped.
pub fn point_index_for_position(position: f64, point_count: usize) -> Option<usize> {
    if point_count == 0 {
        return None;
    }
    let p = if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, 1.0)
    };
    let index = (p * point_count as f64).floor() as usize;
    Some(index.min(point_count - 1))
}

/// Normalized position of a point index; zero for an empty track
pub fn position_for_index(index: usize, point_count: usize) -> f64 {
    if point_count == 0 {
        return 0.0;
    }
    index as f64 / point_count as f64
}
