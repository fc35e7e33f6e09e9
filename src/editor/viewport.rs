//! View transform between screen space and canvas space.
//!
//! `canvas = (screen - pan) / zoom` and `screen = canvas * zoom + pan`.
//! The transform is editor-only state and is never persisted.

use crate::geometry::Point;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom: f32,
    pan: Point,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::ORIGIN,
        }
    }
}

impl Viewport {
    pub fn new(zoom: f32, pan: Point) -> Self {
        Self {
            zoom: clamp_zoom(zoom),
            pan,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn to_canvas(&self, screen: Point) -> Point {
        (screen - self.pan).scale(1.0 / self.zoom)
    }

    pub fn to_screen(&self, canvas: Point) -> Point {
        canvas.scale(self.zoom) + self.pan
    }

    /// Convert a screen-space displacement to canvas units.
    pub fn delta_to_canvas(&self, delta: Point) -> Point {
        delta.scale(1.0 / self.zoom)
    }

    /// Zoom to `zoom`, keeping the canvas point under `anchor` (screen space) fixed.
    pub fn zoom_at(&mut self, zoom: f32, anchor: Point) {
        let new_zoom = clamp_zoom(zoom);
        let ratio = new_zoom / self.zoom;
        self.pan = anchor - (anchor - self.pan).scale(ratio);
        self.zoom = new_zoom;
    }

    /// Slider zoom: anchor at the center of a viewport of `size` screen pixels.
    pub fn zoom_centered(&mut self, zoom: f32, size: (f32, f32)) {
        self.zoom_at(zoom, Point::new(size.0 / 2.0, size.1 / 2.0));
    }

    pub fn pan_by(&mut self, delta: Point) {
        self.pan = self.pan + delta;
    }

    pub fn set_pan(&mut self, pan: Point) {
        self.pan = pan;
    }
}

fn clamp_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        1.0
    }
}
