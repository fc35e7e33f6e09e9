//! QR payload encoding and rasterization.
//!
//! Contact cards carry a compact single-line payload:
//!
//! ```text
//! {Name:Ann Lee, Number:351912345678, City:Lisbon}
//! ```
//!
//! Only non-empty fields are included, always in name → number → city order.

use image::{Rgba, RgbaImage};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};

use crate::binding::DataContext;
use crate::binding::resolve::scalar_to_string;
use crate::error::CardsmithError;

/// Largest QR side rendered, in pixels.
pub const MAX_QR_SIDE: u32 = 8192;

/// Default context keys the payload fields are read from.
pub const NAME_KEY: &str = "full_name";
pub const NUMBER_KEY: &str = "whatsapp_number";
pub const CITY_KEY: &str = "city";

/// QR error correction level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QrErrorLevel {
    L,
    #[default]
    M,
    Q,
    H,
}

impl From<QrErrorLevel> for EcLevel {
    fn from(level: QrErrorLevel) -> Self {
        match level {
            QrErrorLevel::L => EcLevel::L,
            QrErrorLevel::M => EcLevel::M,
            QrErrorLevel::Q => EcLevel::Q,
            QrErrorLevel::H => EcLevel::H,
        }
    }
}

/// Per-element QR configuration: which context keys feed each payload field.
///
/// A field set to `None` (or an empty key) is left out of the payload. A spec
/// with no keys at all is empty and does not replace the element's image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayloadSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_level: Option<QrErrorLevel>,
}

impl Default for QrPayloadSpec {
    fn default() -> Self {
        Self::contact()
    }
}

impl QrPayloadSpec {
    /// The standard contact payload: `full_name`, `whatsapp_number`, `city`.
    pub fn contact() -> Self {
        Self {
            name: Some(NAME_KEY.to_string()),
            number: Some(NUMBER_KEY.to_string()),
            city: Some(CITY_KEY.to_string()),
            error_level: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        [&self.name, &self.number, &self.city]
            .iter()
            .all(|k| k.as_deref().is_none_or(|k| k.trim().is_empty()))
    }

    /// Read the payload fields from the context. Keys are namespace-agnostic.
    pub fn payload(&self, context: &DataContext) -> QrPayload {
        let read = |key: &Option<String>| {
            key.as_deref()
                .filter(|k| !k.is_empty())
                .and_then(|k| context.lookup_any(k))
                .and_then(scalar_to_string)
        };
        QrPayload {
            name: read(&self.name),
            number: read(&self.number),
            city: read(&self.city),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QrPayload {
    pub name: Option<String>,
    pub number: Option<String>,
    pub city: Option<String>,
}

impl QrPayload {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Serialize to the bracketed single-line form.
    pub fn encode(&self) -> Result<String, CardsmithError> {
        let parts: Vec<String> = [
            ("Name", &self.name),
            ("Number", &self.number),
            ("City", &self.city),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}:{}", label, v))
        })
        .collect();

        if parts.is_empty() {
            return Err(CardsmithError::EmptyQrPayload);
        }
        Ok(format!("{{{}}}", parts.join(", ")))
    }
}

/// Rasterize `data` as a square QR code of side `min(width, height)` with no
/// quiet zone. Modules are nearest-sampled so the output is exactly the
/// requested side even when it is not a multiple of the module count.
pub fn render_qr(
    data: &str,
    width: u32,
    height: u32,
    level: QrErrorLevel,
) -> Result<RgbaImage, CardsmithError> {
    let side = width.min(height);
    if side == 0 {
        return Err(CardsmithError::Qr("QR code needs a non-zero size".to_string()));
    }
    if side > MAX_QR_SIDE {
        return Err(CardsmithError::Qr(format!(
            "QR code side {} exceeds {}",
            side, MAX_QR_SIDE
        )));
    }

    let code = QrCode::with_error_correction_level(data, EcLevel::from(level))
        .map_err(|e| CardsmithError::Qr(format!("QR code generation failed: {}", e)))?;
    let modules = code.width() as u32;
    let colors = code.to_colors();

    let dark = Rgba([0, 0, 0, 255]);
    let light = Rgba([255, 255, 255, 255]);
    let img = RgbaImage::from_fn(side, side, |px, py| {
        let mx = (px as u64 * modules as u64 / side as u64) as u32;
        let my = (py as u64 * modules as u64 / side as u64) as u32;
        let idx = (my * modules + mx) as usize;
        if colors.get(idx) == Some(&qrcode::Color::Dark) {
            dark
        } else {
            light
        }
    });

    Ok(img)
}
