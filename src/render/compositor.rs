//! Image compositing: background and image layers.
//!
//! The background decides the output resolution. Image elements are drawn
//! stretched to their boxes; an element with a QR spec draws the QR code
//! instead and never touches its URL. A failing element is reported to the
//! observer and skipped, the rest of the composition continues.

use crate::binding::DataContext;
use crate::error::CardsmithError;
use crate::geometry::Rect;
use crate::observe::Observer;
use crate::qr::{QrErrorLevel, render_qr};
use crate::template::ImageElement;

use super::assets::AssetLoader;
use super::surface::Surface;

/// What happened to one image element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Drawn from this URL.
    Drawn { id: String, url: String },
    /// QR code drawn with this payload.
    Qr { id: String, payload: String },
    /// Nothing to draw (no URL, no QR spec).
    Empty { id: String },
    /// Skipped after a recoverable failure.
    Skipped { id: String, reason: String },
}

pub struct Compositor<'a> {
    loader: &'a dyn AssetLoader,
    observer: &'a dyn Observer,
    qr_level: QrErrorLevel,
}

impl<'a> Compositor<'a> {
    pub fn new(loader: &'a dyn AssetLoader, observer: &'a dyn Observer) -> Self {
        Self {
            loader,
            observer,
            qr_level: QrErrorLevel::default(),
        }
    }

    pub fn qr_level(mut self, level: QrErrorLevel) -> Self {
        self.qr_level = level;
        self
    }

    /// Load the background, size the surface to it and draw it.
    ///
    /// Returns `false` (surface untouched) when there is no background or it
    /// fails to load.
    pub async fn draw_background(&self, surface: &mut Surface, url: Option<&str>) -> bool {
        let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
            return false;
        };
        match self.loader.load(url).await {
            Ok(image) => {
                let image = image.to_rgba8();
                let (w, h) = image.dimensions();
                surface.reset(w, h);
                surface.draw_image(&image, Rect::new(0.0, 0.0, w as f32, h as f32));
                true
            }
            Err(e) => {
                self.observer
                    .warn(&format!("Background not drawn: {}", e));
                false
            }
        }
    }

    /// Draw image elements in the given order.
    pub async fn draw_images(
        &self,
        surface: &mut Surface,
        elements: &[&ImageElement],
        context: &DataContext,
    ) -> Vec<ImageOutcome> {
        let mut outcomes = Vec::with_capacity(elements.len());
        for el in elements {
            let outcome = match self.draw_image_element(surface, el, context).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.observer
                        .warn(&format!("Skipping image element {}: {}", el.id, e));
                    ImageOutcome::Skipped {
                        id: el.id.clone(),
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn draw_image_element(
        &self,
        surface: &mut Surface,
        el: &ImageElement,
        context: &DataContext,
    ) -> Result<ImageOutcome, CardsmithError> {
        if let Some(spec) = el.qr_spec() {
            let payload = spec.payload(context).encode()?;
            let level = spec.error_level.unwrap_or(self.qr_level);
            // Never larger than what fits between the origin and the surface edge
            let room = (surface.width() as f32 - el.x).min(surface.height() as f32 - el.y);
            let side = el.width.min(el.height).min(room).round();
            if !side.is_finite() || side < 1.0 {
                return Err(CardsmithError::Qr(format!(
                    "QR box of {} does not fit on the surface",
                    el.id
                )));
            }
            let qr = render_qr(&payload, side as u32, side as u32, level)?;
            let side = qr.width() as f32;
            surface.draw_image(&qr, Rect::new(el.x, el.y, side, side));
            return Ok(ImageOutcome::Qr {
                id: el.id.clone(),
                payload,
            });
        }

        let url = el.resolved_url(context);
        if url.trim().is_empty() {
            return Ok(ImageOutcome::Empty { id: el.id.clone() });
        }

        let image = self.loader.load(&url).await?;
        surface.draw_image(&image.to_rgba8(), el.rect());
        Ok(ImageOutcome::Drawn {
            id: el.id.clone(),
            url,
        })
    }
}
