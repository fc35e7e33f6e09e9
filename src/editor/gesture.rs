//! Pointer gesture state machine.
//!
//! At most one gesture is active. Every gesture starts from `Idle` on pointer
//! down and returns to `Idle` on pointer up.

use crate::geometry::{Point, Rect};

/// Smallest width or height a resize may produce, in canvas units.
pub const MIN_ELEMENT_SIZE: f32 = 50.0;

/// Side of the square resize handle at an element's bottom-right corner, in
/// screen pixels.
pub const HANDLE_SIZE: f32 = 12.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Moving an element; positions are in canvas space.
    Dragging {
        id: String,
        pointer_start: Point,
        origin_start: Point,
    },
    /// Resizing an element from its fixed top-left anchor.
    Resizing {
        id: String,
        pointer_start: Point,
        size_start: (f32, f32),
    },
    /// Moving the view; positions are in screen space.
    Panning { pointer_start: Point, pan_start: Point },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gesture::Idle => "idle",
            Gesture::Dragging { .. } => "dragging",
            Gesture::Resizing { .. } => "resizing",
            Gesture::Panning { .. } => "panning",
        }
    }
}

/// New top-left for a drag, clamped to `[0, canvas - size]` on both axes.
///
/// An element larger than the canvas pins to 0.
pub fn drag_origin(
    origin_start: Point,
    pointer_start: Point,
    pointer_now: Point,
    size: (f32, f32),
    canvas: (f32, f32),
) -> Point {
    let moved = origin_start + (pointer_now - pointer_start);
    let max_x = (canvas.0 - size.0).max(0.0);
    let max_y = (canvas.1 - size.1).max(0.0);
    Point::new(moved.x.clamp(0.0, max_x), moved.y.clamp(0.0, max_y))
}

/// New size for a resize, floored at [`MIN_ELEMENT_SIZE`].
pub fn resize_size(size_start: (f32, f32), pointer_start: Point, pointer_now: Point) -> (f32, f32) {
    let delta = pointer_now - pointer_start;
    (
        (size_start.0 + delta.x).max(MIN_ELEMENT_SIZE),
        (size_start.1 + delta.y).max(MIN_ELEMENT_SIZE),
    )
}

/// The resize handle for `rect`, in canvas units at the given zoom.
pub fn handle_rect(rect: Rect, zoom: f32) -> Rect {
    let side = HANDLE_SIZE / zoom;
    Rect::new(rect.right() - side / 2.0, rect.bottom() - side / 2.0, side, side)
}
