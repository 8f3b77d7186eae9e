//! Shared pointer and zoom state for the map, chart and segment ruler

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mapping::{point_index_for_position, position_for_index};

/// Configuration for the timeline view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Smallest allowed zoom window width, as a fraction of the track
    pub min_zoom_width: f64,
    /// Width divisor for one zoom-in step
    pub zoom_factor: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            min_zoom_width: 0.01,
            zoom_factor: 2.0,
        }
    }
}

impl TimelineConfig {
    pub fn with_min_zoom_width(mut self, width: f64) -> Self {
        self.min_zoom_width = width;
        self
    }

    pub fn with_zoom_factor(mut self, factor: f64) -> Self {
        self.zoom_factor = factor;
        self
    }

    /// Replace out-of-range values with defaults
    fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            min_zoom_width: if self.min_zoom_width > 0.0 && self.min_zoom_width <= 1.0 {
                self.min_zoom_width
            } else {
                defaults.min_zoom_width
            },
            zoom_factor: if self.zoom_factor > 1.0 && self.zoom_factor.is_finite() {
                self.zoom_factor
            } else {
                defaults.zoom_factor
            },
        }
    }
}

/// Visible fraction of the track, `0 <= start < end <= 1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomWindow {
    pub start: f64,
    pub end: f64,
}

impl ZoomWindow {
    pub const FULL: ZoomWindow = ZoomWindow { start: 0.0, end: 1.0 };

    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn contains(&self, position: f64) -> bool {
        (self.start..=self.end).contains(&position)
    }

    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }

    /// Window of `width` keeping `anchor` at the same relative spot, shifted into `[0, 1]`
    fn scaled_around(&self, anchor: f64, width: f64) -> Self {
        if width >= 1.0 {
            return Self::FULL;
        }
        let ratio = width / self.width();
        let start = anchor - (anchor - self.start) * ratio;
        Self::placed(start, width)
    }

    /// Window of `width` starting at `start`, shifted to fit inside `[0, 1]`
    fn placed(start: f64, width: f64) -> Self {
        let width = width.clamp(0.0, 1.0);
        let start = start.clamp(0.0, 1.0 - width);
        Self {
            start,
            end: start + width,
        }
    }
}

impl Default for ZoomWindow {
    fn default() -> Self {
        Self::FULL
    }
}

/// Where in the track the views are looking and pointing
///
/// Scoped to one editing session and never persisted.
#[derive(Debug, Clone)]
pub struct TimelineViewState {
    config: TimelineConfig,
    window: ZoomWindow,
    pointer: f64,
    selected_segment: Option<String>,
    hovered_segment: Option<String>,
    dragging: bool,
}

impl Default for TimelineViewState {
    fn default() -> Self {
        Self::new(TimelineConfig::default())
    }
}

impl TimelineViewState {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            config: config.sanitized(),
            window: ZoomWindow::FULL,
            pointer: 0.0,
            selected_segment: None,
            hovered_segment: None,
            dragging: false,
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn zoom_window(&self) -> ZoomWindow {
        self.window
    }

    pub fn zoom_start(&self) -> f64 {
        self.window.start
    }

    pub fn zoom_end(&self) -> f64 {
        self.window.end
    }

    pub fn pointer_position(&self) -> f64 {
        self.pointer
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Zoom anchor: the pointer when visible, otherwise the window midpoint
    fn anchor(&self) -> f64 {
        if self.window.contains(self.pointer) {
            self.pointer
        } else {
            self.window.midpoint()
        }
    }

    /// Narrow the window by the zoom factor, never below the minimum width
    pub fn zoom_in(&mut self) {
        let width = (self.window.width() / self.config.zoom_factor).max(self.config.min_zoom_width);
        if width >= self.window.width() {
            return;
        }
        self.window = self.window.scaled_around(self.anchor(), width);
        debug!(start = self.window.start, end = self.window.end, "Zoomed in");
    }

    /// Widen the window by the zoom factor, up to the full track
    pub fn zoom_out(&mut self) {
        let width = (self.window.width() * self.config.zoom_factor).min(1.0);
        self.window = self.window.scaled_around(self.anchor(), width);
        debug!(start = self.window.start, end = self.window.end, "Zoomed out");
    }

    pub fn reset_zoom(&mut self) {
        self.window = ZoomWindow::FULL;
    }

    /// Set the window directly, as when brushing the segment ruler
    ///
    /// Bounds are clamped and ordered; a window narrower than the minimum
    /// is widened around its center. Returns false for NaN input.
    pub fn set_zoom_window(&mut self, start: f64, end: f64) -> bool {
        if start.is_nan() || end.is_nan() {
            return false;
        }
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        let lo = lo.clamp(0.0, 1.0);
        let hi = hi.clamp(0.0, 1.0);

        self.window = if hi - lo >= self.config.min_zoom_width {
            ZoomWindow::placed(lo, hi - lo)
        } else {
            let width = self.config.min_zoom_width;
            ZoomWindow::placed((lo + hi) / 2.0 - width / 2.0, width)
        };
        true
    }

    /// Shift the window by `delta` without changing its width
    pub fn pan(&mut self, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        self.window = ZoomWindow::placed(self.window.start + delta, self.window.width());
    }

    /// Zoom so the inclusive index range fills the window
    pub fn zoom_to_index_range(&mut self, start: usize, end: usize, point_count: usize) -> bool {
        if point_count == 0 {
            return false;
        }
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        let lo = lo.min(point_count - 1);
        let hi = hi.min(point_count - 1);
        self.set_zoom_window(
            position_for_index(lo, point_count),
            position_for_index(hi + 1, point_count),
        )
    }

    /// Inclusive index range under the window
    pub fn visible_index_range(&self, point_count: usize) -> Option<(usize, usize)> {
        let first = point_index_for_position(self.window.start, point_count)?;
        let last = point_index_for_position(self.window.end, point_count)?;
        Some((first, last))
    }

    /// Move the pointer; NaN is ignored and values are clamped to `[0, 1]`
    pub fn set_pointer_position(&mut self, position: f64) -> bool {
        if position.is_nan() {
            return false;
        }
        self.pointer = position.clamp(0.0, 1.0);
        true
    }

    /// Pointer update from hovering another view; ignored while dragging
    pub fn hover_pointer_position(&mut self, position: f64) -> bool {
        if self.dragging {
            return false;
        }
        self.set_pointer_position(position)
    }

    pub fn start_pointer_drag(&mut self) {
        self.dragging = true;
    }

    pub fn stop_pointer_drag(&mut self) {
        self.dragging = false;
    }

    /// Point under the pointer for a track of `point_count` points
    pub fn pointer_index(&self, point_count: usize) -> Option<usize> {
        point_index_for_position(self.pointer, point_count)
    }

    /// Move the pointer onto a point index
    pub fn set_pointer_index(&mut self, index: usize, point_count: usize) -> bool {
        if point_count == 0 {
            return false;
        }
        self.set_pointer_position(position_for_index(index.min(point_count - 1), point_count))
    }

    pub fn select_segment(&mut self, segment_id: impl Into<String>) {
        self.selected_segment = Some(segment_id.into());
    }

    pub fn clear_selection(&mut self) {
        self.selected_segment = None;
    }

    pub fn hover_segment(&mut self, segment_id: Option<String>) {
        self.hovered_segment = segment_id;
    }

    pub fn selected_segment(&self) -> Option<&str> {
        self.selected_segment.as_deref()
    }

    pub fn hovered_segment(&self) -> Option<&str> {
        self.hovered_segment.as_deref()
    }

    /// Segment to highlight; the selection wins over hover
    pub fn highlighted_segment(&self) -> Option<&str> {
        self.selected_segment().or(self.hovered_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_window(state: &TimelineViewState, start: f64, end: f64) {
        let w = state.zoom_window();
        assert!(
            (w.start - start).abs() < EPS && (w.end - end).abs() < EPS,
            "expected [{start}, {end}], got [{}, {}]",
            w.start,
            w.end
        );
    }

    #[test]
    fn test_zoom_in_around_pointer() {
        let mut state = TimelineViewState::default();
        state.set_pointer_position(0.25);
        state.zoom_in();
        // Pointer keeps its relative spot in the window
        assert_window(&state, 0.125, 0.625);
    }

    #[test]
    fn test_zoom_uses_midpoint_when_pointer_outside() {
        let mut state = TimelineViewState::default();
        state.set_zoom_window(0.5, 1.0);
        state.set_pointer_position(0.1);
        state.zoom_in();
        assert_window(&state, 0.625, 0.875);
    }

    #[test]
    fn test_zoom_in_never_below_minimum() {
        let mut state = TimelineViewState::new(TimelineConfig::default().with_min_zoom_width(0.05));
        state.set_pointer_position(0.999);
        for _ in 0..50 {
            state.zoom_in();
            assert!(state.zoom_window().width() >= 0.05 - EPS);
            assert!(state.zoom_start() >= 0.0 && state.zoom_end() <= 1.0);
        }
        assert!((state.zoom_window().width() - 0.05).abs() < EPS);
    }

    #[test]
    fn test_zoom_out_clamps_to_full() {
        let mut state = TimelineViewState::default();
        state.set_pointer_position(0.9);
        state.zoom_in();
        state.zoom_in();
        state.zoom_out();
        state.zoom_out();
        state.zoom_out();
        assert!(state.zoom_window().is_full());

        state.zoom_in();
        state.reset_zoom();
        assert!(state.zoom_window().is_full());
    }

    #[test]
    fn test_zoom_out_near_edge_shifts_inside() {
        let mut state = TimelineViewState::default();
        state.set_zoom_window(0.0, 0.2);
        state.set_pointer_position(0.0);
        state.zoom_out();
        assert_window(&state, 0.0, 0.4);
    }

    #[test]
    fn test_set_zoom_window_orders_and_widens() {
        let mut state = TimelineViewState::default();
        assert!(state.set_zoom_window(0.8, 0.3));
        assert_window(&state, 0.3, 0.8);

        assert!(state.set_zoom_window(1.0, 1.0));
        assert_window(&state, 0.99, 1.0);

        assert!(!state.set_zoom_window(f64::NAN, 0.5));
        assert_window(&state, 0.99, 1.0);
    }

    #[test]
    fn test_pan_stays_inside() {
        let mut state = TimelineViewState::default();
        state.set_zoom_window(0.2, 0.4);
        state.pan(0.1);
        assert_window(&state, 0.3, 0.5);
        state.pan(5.0);
        assert_window(&state, 0.8, 1.0);
        state.pan(-5.0);
        assert_window(&state, 0.0, 0.2);
    }

    #[test]
    fn test_pointer_clamps_and_ignores_nan() {
        let mut state = TimelineViewState::default();
        assert!(state.set_pointer_position(1.7));
        assert_eq!(state.pointer_position(), 1.0);
        assert!(!state.set_pointer_position(f64::NAN));
        assert_eq!(state.pointer_position(), 1.0);
        state.set_pointer_position(-0.2);
        assert_eq!(state.pointer_position(), 0.0);
    }

    #[test]
    fn test_drag_suppresses_hover_updates() {
        let mut state = TimelineViewState::default();
        state.start_pointer_drag();
        state.set_pointer_position(0.4);
        assert!(!state.hover_pointer_position(0.9));
        assert_eq!(state.pointer_position(), 0.4);

        state.stop_pointer_drag();
        assert!(state.hover_pointer_position(0.9));
        assert_eq!(state.pointer_position(), 0.9);
    }

    #[test]
    fn test_selection_beats_hover() {
        let mut state = TimelineViewState::default();
        state.hover_segment(Some("c2".into()));
        assert_eq!(state.highlighted_segment(), Some("c2"));

        state.select_segment("c1");
        assert_eq!(state.highlighted_segment(), Some("c1"));

        state.hover_segment(None);
        assert_eq!(state.highlighted_segment(), Some("c1"));
        state.clear_selection();
        assert_eq!(state.highlighted_segment(), None);
    }

    #[test]
    fn test_zoom_to_index_range_and_visible_range() {
        let mut state = TimelineViewState::default();
        assert!(!state.zoom_to_index_range(0, 5, 0));

        assert!(state.zoom_to_index_range(20, 39, 100));
        assert_window(&state, 0.2, 0.4);
        assert_eq!(state.visible_index_range(100), Some((20, 40)));
        assert_eq!(state.visible_index_range(0), None);

        state.reset_zoom();
        assert_eq!(state.visible_index_range(100), Some((0, 99)));
    }

    #[test]
    fn test_pointer_index() {
        let mut state = TimelineViewState::default();
        assert_eq!(state.pointer_index(0), None);
        state.set_pointer_index(42, 100);
        assert_eq!(state.pointer_index(100), Some(42));
        state.set_pointer_position(1.0);
        assert_eq!(state.pointer_index(100), Some(99));
    }
}
