//! Template and element types.
//!
//! All types derive `Serialize + Deserialize`; the JSON form is what the
//! template store persists and what the editor round-trips.
//!
//! ```json
//! {
//!   "template": { "id": "tpl-1", "name": "Artist ID", "type": "id_card",
//!                 "background_image_ref": "https://cdn/bg.png" },
//!   "text_elements": [
//!     { "type": "text", "id": "t1", "x": 40, "y": 300, "width": 400, "height": 60,
//!       "binding_config": { "template": "{{profile.full_name}}" } }
//!   ],
//!   "image_elements": []
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::binding::{BindingConfig, DataContext};
use crate::error::CardsmithError;
use crate::geometry::Rect;
use crate::qr::QrPayloadSpec;

/// Largest coordinate or extent accepted for an element, in canvas units.
pub const MAX_EXTENT: f32 = 20_000.0;

/// Largest font size accepted and drawn, in pixels.
pub const MAX_FONT_SIZE: f32 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Certificate,
    IdCard,
}

impl TemplateType {
    pub fn name(self) -> &'static str {
        match self {
            TemplateType::Certificate => "certificate",
            TemplateType::IdCard => "id_card",
        }
    }

    /// Record field the generated asset URL is persisted to.
    pub fn url_field(self) -> &'static str {
        match self {
            TemplateType::Certificate => "certificate_url",
            TemplateType::IdCard => "id_card_url",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "certificate" => Some(TemplateType::Certificate),
            "id_card" | "idcard" => Some(TemplateType::IdCard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub template_type: TemplateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image_ref: Option<String>,
}

impl Template {
    pub fn new(id: impl Into<String>, name: impl Into<String>, template_type: TemplateType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            template_type,
            background_image_ref: None,
        }
    }

    pub fn background(mut self, url: impl Into<String>) -> Self {
        self.background_image_ref = Some(url.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    /// Laid out like `Left`; no inter-word stretching.
    Justify,
}

/// How the editor previews an image inside its box. The renderer always
/// stretches to the box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectFit {
    Contain,
    Cover,
    #[default]
    Fill,
    None,
    ScaleDown,
}

fn default_font() -> String {
    "sans".to_string()
}

fn default_font_size() -> f32 {
    24.0
}

fn default_line_height() -> f32 {
    1.2
}

fn default_text_color() -> String {
    "#000000".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_config: Option<BindingConfig>,
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// Multiplier of `font_size` per line.
    #[serde(default = "default_line_height")]
    pub line_height: f32,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// 0.0..=1.0; the background is only painted when above zero.
    #[serde(default)]
    pub background_opacity: f32,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default = "default_true")]
    pub wrap: bool,
    /// Shown when there is no binding or it resolves empty.
    #[serde(default)]
    pub static_text: String,
}

impl TextElement {
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            z_index: 0,
            binding_config: None,
            font: default_font(),
            font_size: default_font_size(),
            line_height: default_line_height(),
            text_color: default_text_color(),
            background_color: None,
            background_opacity: 0.0,
            alignment: Alignment::Left,
            wrap: true,
            static_text: String::new(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Text to draw: the resolved binding, or `static_text` when that is empty.
    pub fn resolved_text(&self, context: &DataContext) -> String {
        let resolved = self
            .binding_config
            .as_ref()
            .filter(|b| !b.is_empty())
            .map(|b| b.resolve_text(context))
            .unwrap_or_default();
        if resolved.trim().is_empty() {
            self.static_text.clone()
        } else {
            resolved
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_config: Option<BindingConfig>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub object_fit: ObjectFit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_payload_spec: Option<QrPayloadSpec>,
}

impl ImageElement {
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            z_index: 0,
            binding_config: None,
            image_url: String::new(),
            object_fit: ObjectFit::Fill,
            qr_payload_spec: None,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// The QR spec, if present and non-empty. When `Some`, it replaces the image.
    pub fn qr_spec(&self) -> Option<&QrPayloadSpec> {
        self.qr_payload_spec.as_ref().filter(|s| !s.is_empty())
    }

    /// URL to load: the first binding entry when it resolves, else `image_url`.
    pub fn resolved_url(&self, context: &DataContext) -> String {
        let bound = self
            .binding_config
            .as_ref()
            .map(|b| b.first_value(context))
            .unwrap_or_default();
        if bound.trim().is_empty() {
            self.image_url.clone()
        } else {
            bound
        }
    }
}

/// A template layer. The discriminator is serialized as `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Text(TextElement),
    Image(ImageElement),
}

impl Element {
    pub fn id(&self) -> &str {
        match self {
            Element::Text(t) => &t.id,
            Element::Image(i) => &i.id,
        }
    }

    pub fn rect(&self) -> Rect {
        match self {
            Element::Text(t) => t.rect(),
            Element::Image(i) => i.rect(),
        }
    }

    pub fn z_index(&self) -> i32 {
        match self {
            Element::Text(t) => t.z_index,
            Element::Image(i) => i.z_index,
        }
    }

    /// Reject geometry the renderer cannot use: non-finite or negative
    /// values, anything beyond [`MAX_EXTENT`], and unusable font sizes.
    pub fn validate(&self) -> Result<(), CardsmithError> {
        let r = self.rect();
        let in_range = |v: f32| v.is_finite() && v.abs() <= MAX_EXTENT;
        if ![r.x, r.y, r.width, r.height].into_iter().all(in_range) || r.width < 0.0 || r.height < 0.0 {
            return Err(CardsmithError::InvalidEdit(format!(
                "element {} has out-of-range geometry",
                self.id()
            )));
        }
        if let Element::Text(t) = self
            && !(t.font_size > 0.0 && t.font_size <= MAX_FONT_SIZE && t.line_height.is_finite())
        {
            return Err(CardsmithError::InvalidEdit(format!(
                "element {} has font size {} (allowed up to {})",
                t.id, t.font_size, MAX_FONT_SIZE
            )));
        }
        Ok(())
    }

    pub fn binding(&self) -> Option<&BindingConfig> {
        match self {
            Element::Text(t) => t.binding_config.as_ref(),
            Element::Image(i) => i.binding_config.as_ref(),
        }
    }

    /// Copy with geometry replaced; everything else is kept.
    pub fn with_rect(&self, rect: Rect) -> Element {
        let mut el = self.clone();
        match &mut el {
            Element::Text(t) => {
                (t.x, t.y, t.width, t.height) = (rect.x, rect.y, rect.width, rect.height);
            }
            Element::Image(i) => {
                (i.x, i.y, i.width, i.height) = (rect.x, rect.y, rect.width, rect.height);
            }
        }
        el
    }

    pub fn with_z_index(&self, z_index: i32) -> Element {
        let mut el = self.clone();
        match &mut el {
            Element::Text(t) => t.z_index = z_index,
            Element::Image(i) => i.z_index = z_index,
        }
        el
    }

    pub fn with_binding(&self, binding: Option<BindingConfig>) -> Element {
        let mut el = self.clone();
        match &mut el {
            Element::Text(t) => t.binding_config = binding,
            Element::Image(i) => i.binding_config = binding,
        }
        el
    }
}

/// A template with its element sets, as read from and written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateBundle {
    pub template: Template,
    #[serde(default)]
    pub text_elements: Vec<TextElement>,
    #[serde(default)]
    pub image_elements: Vec<ImageElement>,
}

impl TemplateBundle {
    pub fn new(template: Template) -> Self {
        Self {
            template,
            text_elements: Vec::new(),
            image_elements: Vec::new(),
        }
    }

    /// Split a mixed element list into the two stored sets, preserving order.
    pub fn from_elements(template: Template, elements: impl IntoIterator<Item = Element>) -> Self {
        let mut bundle = Self::new(template);
        for el in elements {
            match el {
                Element::Text(t) => bundle.text_elements.push(t),
                Element::Image(i) => bundle.image_elements.push(i),
            }
        }
        bundle
    }

    /// Images first, then text, each in stored order.
    pub fn elements(&self) -> Vec<Element> {
        self.image_elements
            .iter()
            .cloned()
            .map(Element::Image)
            .chain(self.text_elements.iter().cloned().map(Element::Text))
            .collect()
    }
}
