//! Property inspector: element CRUD, style patches and binding edits.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EditorSession;
use crate::binding::{BindingConfig, BindingEntry, DataContext};
use crate::error::CardsmithError;
use crate::geometry::Rect;
use crate::qr::QrPayloadSpec;
use crate::template::{Alignment, Element, ImageElement, ObjectFit, TextElement};

/// Partial update for one element. `None` leaves a property unchanged;
/// text-only fields are ignored for image elements and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub z_index: Option<i32>,
    // Text
    pub font: Option<String>,
    pub font_size: Option<f32>,
    pub line_height: Option<f32>,
    pub text_color: Option<String>,
    /// `Some("")` clears the background color.
    pub background_color: Option<String>,
    pub background_opacity: Option<f32>,
    pub alignment: Option<Alignment>,
    pub wrap: Option<bool>,
    pub static_text: Option<String>,
    // Image
    pub image_url: Option<String>,
    pub object_fit: Option<ObjectFit>,
}

impl ElementPatch {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn size(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// A new element value with this patch applied.
    pub fn apply(&self, element: &Element) -> Element {
        let r = element.rect();
        let rect = Rect::new(
            self.x.unwrap_or(r.x),
            self.y.unwrap_or(r.y),
            self.width.unwrap_or(r.width),
            self.height.unwrap_or(r.height),
        );
        let mut el = element.with_rect(rect);
        if let Some(z) = self.z_index {
            el = el.with_z_index(z);
        }

        match &mut el {
            Element::Text(t) => self.apply_text(t),
            Element::Image(i) => {
                if let Some(url) = &self.image_url {
                    i.image_url = url.clone();
                }
                if let Some(fit) = self.object_fit {
                    i.object_fit = fit;
                }
            }
        }
        el
    }

    fn apply_text(&self, t: &mut TextElement) {
        if let Some(font) = &self.font {
            t.font = font.clone();
        }
        if let Some(size) = self.font_size {
            t.font_size = size.max(1.0);
        }
        if let Some(lh) = self.line_height {
            t.line_height = lh;
        }
        if let Some(color) = &self.text_color {
            t.text_color = color.clone();
        }
        if let Some(bg) = &self.background_color {
            t.background_color = Some(bg.clone()).filter(|c| !c.is_empty());
        }
        if let Some(opacity) = self.background_opacity {
            t.background_opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(alignment) = self.alignment {
            t.alignment = alignment;
        }
        if let Some(wrap) = self.wrap {
            t.wrap = wrap;
        }
        if let Some(text) = &self.static_text {
            t.static_text = text.clone();
        }
    }
}

/// One entry of the binding picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOption {
    pub source: String,
    /// Dot path inside the namespace.
    pub field: String,
    /// Current value, for the picker's preview column.
    pub preview: Option<String>,
}

impl FieldOption {
    pub fn placeholder(&self) -> String {
        format!("{{{{{}.{}}}}}", self.source, self.field)
    }
}

impl EditorSession {
    pub fn add_text_element(&mut self, rect: Rect) -> String {
        let id = Uuid::new_v4().to_string();
        let mut el = TextElement::new(id.clone(), rect);
        el.z_index = self.max_z() + 1;
        el.static_text = "Text".to_string();
        self.push(Element::Text(el));
        self.selected = Some(id.clone());
        id
    }

    pub fn add_image_element(&mut self, rect: Rect, image_url: impl Into<String>) -> String {
        let id = Uuid::new_v4().to_string();
        let mut el = ImageElement::new(id.clone(), rect);
        el.z_index = self.max_z() + 1;
        el.image_url = image_url.into();
        self.push(Element::Image(el));
        self.selected = Some(id.clone());
        id
    }

    /// Remove an element; clears the selection if it was selected.
    pub fn remove_element(&mut self, id: &str) -> Result<Element, CardsmithError> {
        self.take(id)
    }

    pub fn update_element(&mut self, id: &str, patch: &ElementPatch) -> Result<&Element, CardsmithError> {
        let current = self
            .element(id)
            .ok_or_else(|| CardsmithError::UnknownElement(id.to_string()))?;
        let updated = patch.apply(current);
        updated.validate()?;
        self.replace(updated)
    }

    pub fn bring_to_front(&mut self, id: &str) -> Result<&Element, CardsmithError> {
        let top = self.max_z();
        let at_top = self.elements().iter().filter(|e| e.z_index() == top).count();
        let current = self
            .element(id)
            .ok_or_else(|| CardsmithError::UnknownElement(id.to_string()))?;
        let updated = if current.z_index() == top && at_top == 1 {
            current.clone()
        } else {
            current.with_z_index(top + 1)
        };
        self.replace(updated)
    }

    pub fn set_binding(
        &mut self,
        id: &str,
        binding: Option<BindingConfig>,
    ) -> Result<&Element, CardsmithError> {
        let current = self
            .element(id)
            .ok_or_else(|| CardsmithError::UnknownElement(id.to_string()))?;
        let binding = binding.filter(|b| !b.is_empty());
        let updated = current.with_binding(binding);
        self.replace(updated)
    }

    /// Append an entry.
    ///
    /// A template-string binding gets the entry's placeholder on a new line
    /// instead, since it has no entry list (fallback and transform do not
    /// apply there).
    pub fn add_binding_entry(&mut self, id: &str, entry: BindingEntry) -> Result<&Element, CardsmithError> {
        let current = self
            .element(id)
            .ok_or_else(|| CardsmithError::UnknownElement(id.to_string()))?;
        let binding = match current.binding().cloned() {
            None => BindingConfig::Entries(vec![entry]),
            Some(BindingConfig::Entries(mut entries)) => {
                entries.push(entry);
                BindingConfig::Entries(entries)
            }
            Some(BindingConfig::Template { template }) => {
                let token = format!("{{{{{}.{}}}}}", entry.source, entry.field);
                if template.trim().is_empty() {
                    BindingConfig::template(token)
                } else {
                    BindingConfig::template(format!("{}\n{}", template, token))
                }
            }
        };
        let updated = current.with_binding(Some(binding));
        self.replace(updated)
    }

    /// Remove the entry at `index`. Removing the last entry clears the binding.
    pub fn remove_binding_entry(&mut self, id: &str, index: usize) -> Result<&Element, CardsmithError> {
        let current = self
            .element(id)
            .ok_or_else(|| CardsmithError::UnknownElement(id.to_string()))?;
        let Some(BindingConfig::Entries(mut entries)) = current.binding().cloned() else {
            return Err(CardsmithError::InvalidEdit(format!(
                "element {} has no binding entries",
                id
            )));
        };
        if index >= entries.len() {
            return Err(CardsmithError::InvalidEdit(format!(
                "binding entry {} out of range ({} entries)",
                index,
                entries.len()
            )));
        }
        entries.remove(index);
        let binding = Some(BindingConfig::Entries(entries)).filter(|b| !b.is_empty());
        let updated = current.with_binding(binding);
        self.replace(updated)
    }

    /// Set or clear the QR spec of an image element.
    pub fn set_qr_spec(&mut self, id: &str, spec: Option<QrPayloadSpec>) -> Result<&Element, CardsmithError> {
        let current = self
            .element(id)
            .ok_or_else(|| CardsmithError::UnknownElement(id.to_string()))?;
        let Element::Image(image) = current else {
            return Err(CardsmithError::InvalidEdit(format!(
                "QR codes only apply to image elements, {} is text",
                id
            )));
        };
        let mut image = image.clone();
        image.qr_payload_spec = spec;
        self.replace(Element::Image(image))
    }
}

/// Every scalar field the context exposes, sorted by `source.field`.
pub fn available_fields(context: &DataContext) -> Vec<FieldOption> {
    context
        .flattened()
        .into_iter()
        .filter_map(|(path, preview)| {
            let (source, field) = path.split_once('.')?;
            Some(FieldOption {
                source: source.to_string(),
                field: field.to_string(),
                preview,
            })
        })
        .collect()
}

impl EditorSession {
    /// [`available_fields`] for the binding picker.
    pub fn available_fields(&self, context: &DataContext) -> Vec<FieldOption> {
        available_fields(context)
    }
}
