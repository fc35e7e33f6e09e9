//! Rendering orchestrator: background, then image layers, then text layers.
//!
//! Within each layer group elements are drawn in ascending `z_index`, ties
//! keeping their stored order. Text always paints over images regardless of
//! z-index. Rendering is deterministic for identical inputs and asset bytes.

use crate::binding::DataContext;
use crate::observe::{Observer, span};
use crate::qr::QrErrorLevel;
use crate::template::{ImageElement, Template, TemplateBundle, TextElement};

use super::assets::AssetLoader;
use super::compositor::{Compositor, ImageOutcome};
use super::font::FontBook;
use super::surface::Surface;
use super::text::{LaidLine, draw_text_element};

/// Per-element record of a render, for callers that need to inspect it.
#[derive(Debug, Clone, Default)]
pub struct RenderReport {
    pub background_drawn: bool,
    pub images: Vec<ImageOutcome>,
    /// `(element id, resolved text, laid-out lines)` in draw order.
    pub texts: Vec<(String, String, Vec<LaidLine>)>,
}

impl RenderReport {
    pub fn text_for(&self, id: &str) -> Option<&str> {
        self.texts
            .iter()
            .find(|(el, _, _)| el == id)
            .map(|(_, text, _)| text.as_str())
    }
}

pub struct Renderer<'a> {
    loader: &'a dyn AssetLoader,
    fonts: &'a FontBook,
    observer: &'a dyn Observer,
    qr_level: QrErrorLevel,
}

impl<'a> Renderer<'a> {
    pub fn new(loader: &'a dyn AssetLoader, fonts: &'a FontBook, observer: &'a dyn Observer) -> Self {
        Self {
            loader,
            fonts,
            observer,
            qr_level: QrErrorLevel::default(),
        }
    }

    pub fn qr_level(mut self, level: QrErrorLevel) -> Self {
        self.qr_level = level;
        self
    }

    /// Render onto `surface` and return it.
    pub async fn render(
        &self,
        surface: Surface,
        template: &Template,
        text_elements: &[TextElement],
        image_elements: &[ImageElement],
        context: &DataContext,
    ) -> Surface {
        self.render_with_report(surface, template, text_elements, image_elements, context)
            .await
            .0
    }

    pub async fn render_bundle(
        &self,
        surface: Surface,
        bundle: &TemplateBundle,
        context: &DataContext,
    ) -> (Surface, RenderReport) {
        self.render_with_report(
            surface,
            &bundle.template,
            &bundle.text_elements,
            &bundle.image_elements,
            context,
        )
        .await
    }

    pub async fn render_with_report(
        &self,
        mut surface: Surface,
        template: &Template,
        text_elements: &[TextElement],
        image_elements: &[ImageElement],
        context: &DataContext,
    ) -> (Surface, RenderReport) {
        let _render = span(self.observer, "render");
        let compositor = Compositor::new(self.loader, self.observer).qr_level(self.qr_level);
        let mut report = RenderReport::default();

        {
            let _s = span(self.observer, "render.background");
            report.background_drawn = compositor
                .draw_background(&mut surface, template.background_image_ref.as_deref())
                .await;
        }

        {
            let _s = span(self.observer, "render.images");
            let images = z_ordered(image_elements, |e| e.z_index);
            report.images = compositor.draw_images(&mut surface, &images, context).await;
        }

        {
            let _s = span(self.observer, "render.text");
            for el in z_ordered(text_elements, |e| e.z_index) {
                let text = el.resolved_text(context);
                let lines = draw_text_element(&mut surface, el, &text, self.fonts);
                report.texts.push((el.id.clone(), text, lines));
            }
        }

        (surface, report)
    }
}

/// Stable sort by z-index.
fn z_ordered<T>(items: &[T], z: impl Fn(&T) -> i32) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by_key(|item| z(item));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingConfig, BindingEntry, Record};
    use crate::geometry::Rect;
    use crate::observe::{NoopObserver, RecordingObserver};
    use crate::render::assets::PreloadedAssets;
    use crate::template::TemplateType;
    use image::{DynamicImage, Rgba, RgbaImage};
    use serde_json::json;

    fn solid(w: u32, h: u32, c: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(c)))
    }

    fn image_el(id: &str, url: &str, z: i32) -> ImageElement {
        let mut e = ImageElement::new(id, Rect::new(0.0, 0.0, 10.0, 10.0));
        e.image_url = url.into();
        e.z_index = z;
        e
    }

    #[test]
    fn test_z_ordered_is_stable() {
        let items = [("a", 2), ("b", 0), ("c", 2), ("d", -1)];
        let order: Vec<&str> = z_ordered(&items, |i| i.1).iter().map(|i| i.0).collect();
        assert_eq!(order, vec!["d", "b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_images_composited_by_z_index() {
        let assets = PreloadedAssets::new()
            .with("red", solid(1, 1, [255, 0, 0, 255]))
            .with("blue", solid(1, 1, [0, 0, 255, 255]));
        let fonts = FontBook::new();
        let renderer = Renderer::new(&assets, &fonts, &NoopObserver);
        let template = Template::new("t", "T", TemplateType::IdCard);

        // Stored order puts red last, but blue has the higher z-index.
        let images = vec![image_el("blue", "blue", 5), image_el("red", "red", 1)];
        let surface = renderer
            .render(Surface::new(20, 20), &template, &[], &images, &DataContext::new())
            .await;
        assert_eq!(surface.pixel(5, 5), Some(Rgba([0, 0, 255, 255])));
    }

    #[tokio::test]
    async fn test_text_paints_over_images() {
        let assets = PreloadedAssets::new().with("white", solid(1, 1, [255, 255, 255, 255]));
        let fonts = FontBook::new();
        let renderer = Renderer::new(&assets, &fonts, &NoopObserver);
        let template = Template::new("t", "T", TemplateType::IdCard);

        let mut text = TextElement::new("label", Rect::new(0.0, 0.0, 48.0, 24.0));
        text.static_text = "M".into();
        text.z_index = -10;
        let mut img = image_el("cover", "white", 100);
        img.width = 48.0;
        img.height = 24.0;

        let (surface, report) = renderer
            .render_with_report(Surface::new(48, 24), &template, &[text], &[img], &DataContext::new())
            .await;
        assert_eq!(report.text_for("label"), Some("M"));
        assert!(surface.image().pixels().any(|p| p[0] == 0));
    }

    #[tokio::test]
    async fn test_fallback_text_scenario() {
        let assets = PreloadedAssets::new();
        let fonts = FontBook::new();
        let renderer = Renderer::new(&assets, &fonts, &NoopObserver);
        let template = Template::new("t", "T", TemplateType::Certificate);

        let mut name = TextElement::new("name", Rect::new(0.0, 0.0, 200.0, 40.0));
        name.binding_config = Some(BindingConfig::Entries(vec![
            BindingEntry::new("profile", "full_name").fallback("Unknown"),
        ]));
        let ctx = DataContext::from_records(
            json!({"city": "Lisbon"}).as_object().cloned().unwrap(),
            Record::new(),
        );

        let (_, report) = renderer
            .render_with_report(Surface::new(200, 40), &template, &[name], &[], &ctx)
            .await;
        assert_eq!(report.text_for("name"), Some("Unknown"));
    }

    #[tokio::test]
    async fn test_render_spans_in_order() {
        let assets = PreloadedAssets::new();
        let fonts = FontBook::new();
        let obs = RecordingObserver::new();
        let renderer = Renderer::new(&assets, &fonts, &obs);
        let template = Template::new("t", "T", TemplateType::IdCard);
        renderer
            .render(Surface::new(4, 4), &template, &[], &[], &DataContext::new())
            .await;
        assert_eq!(
            obs.spans(),
            vec!["render.background", "render.images", "render.text", "render"]
        );
    }

    #[tokio::test]
    async fn test_deterministic_output() {
        let assets = PreloadedAssets::new().with("bg", solid(60, 30, [240, 230, 220, 255]));
        let fonts = FontBook::new();
        let renderer = Renderer::new(&assets, &fonts, &NoopObserver);
        let template = Template::new("t", "T", TemplateType::IdCard).background("bg");
        let mut text = TextElement::new("n", Rect::new(2.0, 2.0, 56.0, 26.0));
        text.binding_config = Some(BindingConfig::template("{{artist.full_name}}"));
        text.font_size = 12.0;
        let ctx = DataContext::from_records(
            Record::new(),
            json!({"full_name": "Ann Lee"}).as_object().cloned().unwrap(),
        );

        let a = renderer
            .render(Surface::new(1, 1), &template, &[text.clone()], &[], &ctx)
            .await;
        let b = renderer
            .render(Surface::new(1, 1), &template, &[text], &[], &ctx)
            .await;
        assert_eq!(a.dimensions(), (60, 30));
        assert_eq!(a.image().as_raw(), b.image().as_raw());
    }
}
