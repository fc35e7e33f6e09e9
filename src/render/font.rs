//! Fonts for text elements.
//!
//! TrueType families are registered by name and rendered anti-aliased with
//! ab_glyph. Any family that is not registered falls back to the built-in
//! Spleen 12×24 bitmap font, scaled to the requested pixel size, so templates
//! always render even on a host with no font files.
//!
//! Measurement and drawing for a given family/size always use the same face,
//! so wrapped lines never overflow because of a metrics mismatch.

use ab_glyph::{Font, FontArc, ScaleFont, point};
use image::Rgba;
use spleen_font::{FONT_12X24, PSF2Font};
use std::collections::HashMap;
use std::path::Path;

use super::surface::Surface;
use crate::config::FontSource;
use crate::error::CardsmithError;

const BITMAP_CELL_W: usize = 12;
const BITMAP_CELL_H: usize = 24;

/// Measures rendered text width in pixels.
pub trait TextMeasure {
    fn measure(&self, text: &str) -> f32;
}

/// Registry of TrueType fonts keyed by lowercase family name.
#[derive(Clone, Default)]
pub struct FontBook {
    families: HashMap<String, FontArc>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.families())
            .finish()
    }
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sources(sources: &[FontSource]) -> Result<Self, CardsmithError> {
        let mut book = Self::new();
        for source in sources {
            book.load_file(&source.family, &source.path)?;
        }
        Ok(book)
    }

    pub fn load_file(&mut self, family: &str, path: &Path) -> Result<(), CardsmithError> {
        let bytes = std::fs::read(path).map_err(|e| {
            CardsmithError::Config(format!("Failed to read font {}: {}", path.display(), e))
        })?;
        self.insert_bytes(family, bytes)
    }

    pub fn insert_bytes(&mut self, family: &str, bytes: Vec<u8>) -> Result<(), CardsmithError> {
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| CardsmithError::Config(format!("Invalid font '{}': {}", family, e)))?;
        self.families.insert(family.to_lowercase(), font);
        Ok(())
    }

    pub fn families(&self) -> Vec<String> {
        let mut names: Vec<String> = self.families.keys().cloned().collect();
        names.sort();
        names
    }

    /// Face for `family` at `pixel_size`; unregistered families use the bitmap font.
    pub fn sized(&self, family: &str, pixel_size: f32) -> SizedFace {
        let face = match self.families.get(&family.to_lowercase()) {
            Some(font) => Face::Truetype(font.clone()),
            None => Face::Bitmap,
        };
        SizedFace {
            face,
            pixel_size: pixel_size.max(1.0),
        }
    }
}

#[derive(Clone)]
enum Face {
    Truetype(FontArc),
    Bitmap,
}

/// A face at a fixed pixel size.
#[derive(Clone)]
pub struct SizedFace {
    face: Face,
    pixel_size: f32,
}

impl SizedFace {
    /// The built-in bitmap face at `pixel_size`.
    pub fn bitmap(pixel_size: f32) -> Self {
        Self {
            face: Face::Bitmap,
            pixel_size: pixel_size.max(1.0),
        }
    }

    pub fn pixel_size(&self) -> f32 {
        self.pixel_size
    }

    pub fn is_bitmap(&self) -> bool {
        matches!(self.face, Face::Bitmap)
    }

    /// Draw a single line with its top edge at `y`.
    pub fn draw(&self, surface: &mut Surface, text: &str, x: f32, y: f32, color: Rgba<u8>) {
        match &self.face {
            Face::Truetype(font) => draw_truetype(font, self.pixel_size, surface, text, x, y, color),
            Face::Bitmap => draw_bitmap(self.pixel_size, surface, text, x, y, color),
        }
    }
}

impl TextMeasure for SizedFace {
    fn measure(&self, text: &str) -> f32 {
        match &self.face {
            Face::Truetype(font) => {
                let scaled = font.as_scaled(self.pixel_size);
                let mut width = 0.0f32;
                let mut prev = None;
                for ch in text.chars() {
                    let id = font.glyph_id(ch);
                    if let Some(p) = prev {
                        width += scaled.kern(p, id);
                    }
                    width += scaled.h_advance(id);
                    prev = Some(id);
                }
                width
            }
            Face::Bitmap => {
                let scale = self.pixel_size / BITMAP_CELL_H as f32;
                text.chars().count() as f32 * BITMAP_CELL_W as f32 * scale
            }
        }
    }
}

fn draw_truetype(
    font: &FontArc,
    pixel_size: f32,
    surface: &mut Surface,
    text: &str,
    x: f32,
    y: f32,
    color: Rgba<u8>,
) {
    let scaled = font.as_scaled(pixel_size);
    let baseline = y + scaled.ascent();
    let mut caret = x;
    let mut prev = None;

    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(p) = prev {
            caret += scaled.kern(p, id);
        }
        let glyph = id.with_scale_and_position(pixel_size, point(caret, baseline));
        caret += scaled.h_advance(id);
        prev = Some(id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let gx = bounds.min.x as i64 + px as i64;
                let gy = bounds.min.y as i64 + py as i64;
                surface.blend_pixel(gx, gy, color, coverage);
            });
        }
    }
}

/// Spleen glyph as a row-major on/off grid, or `None` if the font lacks it.
fn bitmap_glyph(font: &mut PSF2Font, ch: char) -> Option<Vec<bool>> {
    let utf8 = ch.to_string();
    let glyph = font.glyph_for_utf8(utf8.as_bytes())?;
    let mut cells = vec![false; BITMAP_CELL_W * BITMAP_CELL_H];
    for (row_y, row) in glyph.enumerate() {
        for (col_x, on) in row.enumerate() {
            if row_y < BITMAP_CELL_H && col_x < BITMAP_CELL_W {
                cells[row_y * BITMAP_CELL_W + col_x] = on;
            }
        }
    }
    Some(cells)
}

fn draw_bitmap(pixel_size: f32, surface: &mut Surface, text: &str, x: f32, y: f32, color: Rgba<u8>) {
    let Ok(mut font) = PSF2Font::new(FONT_12X24) else {
        return;
    };
    let scale = pixel_size / BITMAP_CELL_H as f32;
    let cell_w = (BITMAP_CELL_W as f32 * scale).ceil() as usize;
    let cell_h = (BITMAP_CELL_H as f32 * scale).ceil() as usize;
    let top = y.round() as i64;
    let (surface_w, surface_h) = (surface.width() as i64, surface.height() as i64);
    // Rows of the cell that land on the surface
    let rows = top.saturating_neg().clamp(0, cell_h as i64) as usize
        ..surface_h.saturating_sub(top).clamp(0, cell_h as i64) as usize;
    if rows.is_empty() {
        return;
    }

    for (i, ch) in text.chars().enumerate() {
        let left = (x + i as f32 * BITMAP_CELL_W as f32 * scale).round() as i64;
        if left >= surface_w {
            break;
        }
        if ch == ' ' || left.saturating_add(cell_w as i64) <= 0 {
            continue;
        }
        let Some(cells) = bitmap_glyph(&mut font, ch) else {
            continue;
        };
        let cols = left.saturating_neg().clamp(0, cell_w as i64) as usize
            ..surface_w.saturating_sub(left).clamp(0, cell_w as i64) as usize;

        // Nearest-neighbor scale from the 12×24 cell
        for dy in rows.clone() {
            let sy = ((dy as f32 / scale) as usize).min(BITMAP_CELL_H - 1);
            for dx in cols.clone() {
                let sx = ((dx as f32 / scale) as usize).min(BITMAP_CELL_W - 1);
                if cells[sy * BITMAP_CELL_W + sx] {
                    surface.blend_pixel(left + dx as i64, top + dy as i64, color, 1.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn test_bitmap_measure_scales_with_size() {
        let face = SizedFace::bitmap(24.0);
        assert_eq!(face.measure("abcd"), 48.0);
        let face = SizedFace::bitmap(48.0);
        assert_eq!(face.measure("abcd"), 96.0);
        assert_eq!(face.measure(""), 0.0);
    }

    #[test]
    fn test_unknown_family_falls_back_to_bitmap() {
        let book = FontBook::new();
        let face = book.sized("Playfair Display", 24.0);
        assert!(face.is_bitmap());
        assert!(book.families().is_empty());
    }

    #[test]
    fn test_invalid_font_bytes_rejected() {
        let mut book = FontBook::new();
        let err = book.insert_bytes("broken", vec![0, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, CardsmithError::Config(_)));
    }

    #[test]
    fn test_bitmap_draw_marks_pixels_inside_line_box() {
        let mut s = Surface::new(100, 40);
        let face = SizedFace::bitmap(24.0);
        face.draw(&mut s, "Hi", 10.0, 5.0, BLACK);

        let mut dark = Vec::new();
        for (x, y, p) in s.image().enumerate_pixels() {
            if p[0] < 128 {
                dark.push((x, y));
            }
        }
        assert!(!dark.is_empty());
        assert!(dark.iter().all(|&(x, y)| (10..34).contains(&x) && (5..29).contains(&y)));
    }

    #[test]
    fn test_bitmap_draw_space_is_blank() {
        let mut s = Surface::new(40, 30);
        SizedFace::bitmap(24.0).draw(&mut s, "   ", 0.0, 0.0, BLACK);
        assert!(s.image().pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_bitmap_draw_clips_at_surface_edges() {
        let mut s = Surface::new(20, 20);
        SizedFace::bitmap(48.0).draw(&mut s, "HHHHHHHHHH", -30.0, -20.0, BLACK);
        assert!(s.image().pixels().any(|p| p[0] < 128));

        let mut s = Surface::new(20, 20);
        SizedFace::bitmap(24.0).draw(&mut s, "H", 0.0, 500.0, BLACK);
        assert!(s.image().pixels().all(|p| p[0] == 255));
    }
}
