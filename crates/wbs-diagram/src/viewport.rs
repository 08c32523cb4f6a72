//! Pan/zoom mapping between surface (screen) space and model space.

use serde::{Deserialize, Serialize};
use wbs_core::Point;

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;

/// The visible window onto the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// X offset (pan) in screen pixels.
    pub offset_x: f64,
    /// Y offset (pan) in screen pixels.
    pub offset_y: f64,
    /// Zoom level (1.0 = 100%).
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Pan the viewport by the given delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Zoom the viewport around a screen point, keeping that point fixed.
    pub fn zoom_at(&mut self, factor: f64, center_x: f64, center_y: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let old_zoom = self.zoom;
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        let zoom_change = self.zoom / old_zoom;
        self.offset_x = center_x - (center_x - self.offset_x) * zoom_change;
        self.offset_y = center_y - (center_y - self.offset_y) * zoom_change;
    }

    /// Reset zoom and pan to default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Convert a canvas point to diagram coordinates.
    #[must_use]
    pub fn canvas_to_diagram(&self, canvas_x: f64, canvas_y: f64) -> (f64, f64) {
        let x = (canvas_x - self.offset_x) / self.zoom;
        let y = (canvas_y - self.offset_y) / self.zoom;
        (x, y)
    }

    /// Convert a diagram point to canvas coordinates.
    #[must_use]
    pub fn diagram_to_canvas(&self, diagram_x: f64, diagram_y: f64) -> (f64, f64) {
        let x = diagram_x * self.zoom + self.offset_x;
        let y = diagram_y * self.zoom + self.offset_y;
        (x, y)
    }

    /// Model distance covered by `pixels` on screen.
    #[must_use]
    pub fn screen_to_model_distance(&self, pixels: f64) -> f64 {
        pixels / self.zoom
    }

    /// Move a node so its on-screen top-left corner lands on the grid.
    ///
    /// `center` and the size are in model units; the grid lives in screen
    /// pixels, so the result depends on the current pan and zoom.
    #[must_use]
    pub fn snap_top_left(&self, center: Point, width: f64, height: f64, pitch: f64) -> Point {
        let (screen_x, screen_y) =
            self.diagram_to_canvas(center.x - width / 2.0, center.y - height / 2.0);
        let snapped_x = (screen_x / pitch).round() * pitch;
        let snapped_y = (screen_y / pitch).round() * pitch;
        let (left, top) = self.canvas_to_diagram(snapped_x, snapped_y);
        Point::new(left + width / 2.0, top + height / 2.0)
    }
}
