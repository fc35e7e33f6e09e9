//! # Interactive Editor
//!
//! Session model behind the template designer: the live element set, a
//! single selection, the screen/canvas view transform and the pointer
//! gesture state machine.
//!
//! Elements are held in an arena keyed by their stable id. Every edit builds
//! a new element value and replaces the old one by id, so a snapshot taken
//! before an edit never observes it.
//!
//! ```
//! use cardsmith::editor::EditorSession;
//! use cardsmith::geometry::{Point, Rect};
//! use cardsmith::template::{Template, TemplateType};
//!
//! let mut session = EditorSession::new(Template::new("t", "Card", TemplateType::IdCard), (1011.0, 638.0));
//! let id = session.add_text_element(Rect::new(10.0, 10.0, 120.0, 40.0));
//!
//! session.pointer_down(Point::new(20.0, 20.0), false);
//! session.pointer_move(Point::new(60.0, 50.0));
//! session.pointer_up();
//!
//! assert_eq!(session.element(&id).unwrap().rect().origin(), Point::new(50.0, 40.0));
//! ```

pub mod gesture;
pub mod inspector;
pub mod viewport;

pub use gesture::{Gesture, MIN_ELEMENT_SIZE};
pub use inspector::{ElementPatch, FieldOption};
pub use viewport::Viewport;

use crate::error::CardsmithError;
use crate::geometry::{Point, Rect};
use crate::store::TemplateStore;
use crate::template::{Element, Template, TemplateBundle};

use gesture::{drag_origin, handle_rect, resize_size};

/// What a pointer-down landed on.
#[derive(Debug, Clone, PartialEq)]
pub enum Hit {
    Handle(String),
    Element(String),
    Canvas,
}

#[derive(Debug, Clone)]
pub struct EditorSession {
    template: Template,
    elements: Vec<Element>,
    selected: Option<String>,
    viewport: Viewport,
    gesture: Gesture,
    canvas_size: (f32, f32),
}

impl EditorSession {
    pub fn new(template: Template, canvas_size: (f32, f32)) -> Self {
        Self {
            template,
            elements: Vec::new(),
            selected: None,
            viewport: Viewport::default(),
            gesture: Gesture::Idle,
            canvas_size,
        }
    }

    pub fn from_bundle(bundle: TemplateBundle, canvas_size: (f32, f32)) -> Self {
        let mut session = Self::new(bundle.template.clone(), canvas_size);
        session.elements = bundle.elements();
        session
    }

    /// Load a template from the store. A missing template opens empty.
    pub async fn open(
        store: &dyn TemplateStore,
        template: Template,
        canvas_size: (f32, f32),
    ) -> Result<Self, CardsmithError> {
        Ok(match store.get_template(&template.id).await? {
            Some(bundle) => Self::from_bundle(bundle, canvas_size),
            None => Self::new(template, canvas_size),
        })
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn background_url(&self) -> Option<&str> {
        self.template.background_image_ref.as_deref()
    }

    pub fn set_background(&mut self, url: Option<String>) {
        self.template.background_image_ref = url.filter(|u| !u.trim().is_empty());
    }

    pub fn canvas_size(&self) -> (f32, f32) {
        self.canvas_size
    }

    /// Usually the loaded background's pixel size.
    pub fn set_canvas_size(&mut self, size: (f32, f32)) {
        self.canvas_size = size;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_element(&self) -> Option<&Element> {
        self.selected.as_deref().and_then(|id| self.element(id))
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select(&mut self, id: &str) -> Result<(), CardsmithError> {
        if self.element(id).is_none() {
            return Err(CardsmithError::UnknownElement(id.to_string()));
        }
        self.selected = Some(id.to_string());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Topmost element containing the canvas point: highest `z_index`, later
    /// elements winning ties.
    pub fn element_at(&self, canvas: Point) -> Option<&Element> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.rect().contains(canvas))
            .max_by_key(|(i, e)| (e.z_index(), *i))
            .map(|(_, e)| e)
    }

    /// Classify a screen-space point. The selected element's resize handle
    /// takes precedence over anything under it.
    pub fn hit_test(&self, screen: Point) -> Hit {
        let canvas = self.viewport.to_canvas(screen);
        if let Some(el) = self.selected_element()
            && handle_rect(el.rect(), self.viewport.zoom()).contains(canvas)
        {
            return Hit::Handle(el.id().to_string());
        }
        match self.element_at(canvas) {
            Some(el) => Hit::Element(el.id().to_string()),
            None => Hit::Canvas,
        }
    }

    // ========================================================================
    // Gestures
    // ========================================================================

    /// Start a gesture at a screen-space point.
    ///
    /// With the pan modifier held, or on empty canvas, the view pans (empty
    /// canvas also clears the selection). On an element, it is selected and
    /// dragged; on the selected element's handle, it is resized.
    pub fn pointer_down(&mut self, screen: Point, pan_modifier: bool) -> &Gesture {
        if !self.gesture.is_idle() {
            return &self.gesture;
        }
        let canvas = self.viewport.to_canvas(screen);
        let hit = if pan_modifier { Hit::Canvas } else { self.hit_test(screen) };

        let gesture = match hit {
            Hit::Handle(id) => {
                let rect = self.element(&id).map(Element::rect).unwrap_or_default();
                Gesture::Resizing {
                    id,
                    pointer_start: canvas,
                    size_start: (rect.width, rect.height),
                }
            }
            Hit::Element(id) => {
                let origin = self.element(&id).map(|e| e.rect().origin()).unwrap_or_default();
                self.selected = Some(id.clone());
                Gesture::Dragging {
                    id,
                    pointer_start: canvas,
                    origin_start: origin,
                }
            }
            Hit::Canvas => {
                if !pan_modifier {
                    self.selected = None;
                }
                Gesture::Panning {
                    pointer_start: screen,
                    pan_start: self.viewport.pan(),
                }
            }
        };
        self.gesture = gesture;
        &self.gesture
    }

    /// Continue the active gesture. Returns the element it changed, if any.
    pub fn pointer_move(&mut self, screen: Point) -> Option<&Element> {
        let canvas = self.viewport.to_canvas(screen);
        match self.gesture.clone() {
            Gesture::Idle => None,
            Gesture::Dragging {
                id,
                pointer_start,
                origin_start,
            } => {
                let rect = self.element(&id)?.rect();
                let origin = drag_origin(
                    origin_start,
                    pointer_start,
                    canvas,
                    (rect.width, rect.height),
                    self.canvas_size,
                );
                self.replace_geometry(&id, Rect::new(origin.x, origin.y, rect.width, rect.height))
            }
            Gesture::Resizing {
                id,
                pointer_start,
                size_start,
            } => {
                let rect = self.element(&id)?.rect();
                let (width, height) = resize_size(size_start, pointer_start, canvas);
                self.replace_geometry(&id, Rect::new(rect.x, rect.y, width, height))
            }
            Gesture::Panning {
                pointer_start,
                pan_start,
            } => {
                self.viewport.set_pan(pan_start + (screen - pointer_start));
                None
            }
        }
    }

    /// End the active gesture and return it.
    pub fn pointer_up(&mut self) -> Gesture {
        std::mem::take(&mut self.gesture)
    }

    /// Wheel zoom anchored at the pointer.
    pub fn zoom_at(&mut self, zoom: f32, screen_anchor: Point) {
        self.viewport.zoom_at(zoom, screen_anchor);
    }

    /// Slider zoom anchored at the center of a viewport of `size` pixels.
    pub fn zoom_slider(&mut self, zoom: f32, size: (f32, f32)) {
        self.viewport.zoom_centered(zoom, size);
    }

    // ========================================================================
    // Arena
    // ========================================================================

    fn position(&self, id: &str) -> Result<usize, CardsmithError> {
        self.elements
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| CardsmithError::UnknownElement(id.to_string()))
    }

    /// Swap in a new value for the element with the same id.
    pub(crate) fn replace(&mut self, element: Element) -> Result<&Element, CardsmithError> {
        let idx = self.position(element.id())?;
        self.elements[idx] = element;
        Ok(&self.elements[idx])
    }

    fn replace_geometry(&mut self, id: &str, rect: Rect) -> Option<&Element> {
        let updated = self.element(id)?.with_rect(rect);
        self.replace(updated).ok()
    }

    pub(crate) fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub(crate) fn take(&mut self, id: &str) -> Result<Element, CardsmithError> {
        let idx = self.position(id)?;
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Ok(self.elements.remove(idx))
    }

    pub(crate) fn max_z(&self) -> i32 {
        self.elements.iter().map(Element::z_index).max().unwrap_or(0)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn to_bundle(&self) -> TemplateBundle {
        TemplateBundle::from_elements(self.template.clone(), self.elements.iter().cloned())
    }

    /// Upsert the template and replace its full element set. Nothing is
    /// written when any element fails [`Element::validate`].
    pub async fn save(&self, store: &dyn TemplateStore) -> Result<(), CardsmithError> {
        for el in &self.elements {
            el.validate()?;
        }
        store.upsert_template(&self.template).await?;
        store.replace_elements(&self.template.id, &self.elements).await?;
        tracing::info!(
            template = %self.template.id,
            elements = self.elements.len(),
            "Saved template"
        );
        Ok(())
    }
}
