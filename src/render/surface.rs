//! Raster surface the orchestrator draws onto.
//!
//! All drawing is source-over alpha compositing on an RGBA8 buffer. Shapes
//! and images are clipped to the surface; nothing outside it is an error.

use image::{RgbaImage, Rgba, imageops::{self, FilterType}};

use crate::geometry::Rect;

pub const BLANK: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone)]
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    /// A surface filled with opaque white.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, BLANK),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Resize and clear. Existing content is discarded.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::from_pixel(width, height, BLANK);
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        if x < self.width() && y < self.height() {
            Some(*self.image.get_pixel(x, y))
        } else {
            None
        }
    }

    /// Composite `color` at `(x, y)` with extra `coverage` (0..=1) on top of its alpha.
    #[inline]
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let a = (color[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let dst = self.image.get_pixel_mut(x as u32, y as u32);
        *dst = blend_over(*dst, color, a);
    }

    /// Fill `rect` with `color` at `opacity`.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>, opacity: f32) {
        let Some((x0, y0, x1, y1)) = rect.pixel_bounds(self.width(), self.height()) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend_pixel(x as i64, y as i64, color, opacity);
            }
        }
    }

    /// Draw `src` stretched to exactly `rect` (no aspect-ratio preservation).
    ///
    /// A target larger than the surface is never materialized: only its
    /// visible part is sampled, nearest-neighbor.
    pub fn draw_image(&mut self, src: &RgbaImage, rect: Rect) {
        if !rect.is_finite() || src.width() == 0 || src.height() == 0 {
            return;
        }
        let target_w = rect.width.round().max(0.0) as u32;
        let target_h = rect.height.round().max(0.0) as u32;
        if target_w == 0 || target_h == 0 {
            return;
        }
        let Some((x0, y0, x1, y1)) = rect.pixel_bounds(self.width(), self.height()) else {
            return;
        };
        let ox = rect.x.round() as i64;
        let oy = rect.y.round() as i64;

        if target_w > self.width() || target_h > self.height() {
            let (sw, sh) = src.dimensions();
            for y in y0..y1 {
                let dy = (y as i64 - oy).max(0) as u64;
                let sy = ((dy * sh as u64 / target_h as u64) as u32).min(sh - 1);
                for x in x0..x1 {
                    let dx = (x as i64 - ox).max(0) as u64;
                    let sx = ((dx * sw as u64 / target_w as u64) as u32).min(sw - 1);
                    let px = *src.get_pixel(sx, sy);
                    self.blend_pixel(x as i64, y as i64, px, 1.0);
                }
            }
            return;
        }

        let scaled;
        let src = if src.dimensions() == (target_w, target_h) {
            src
        } else {
            scaled = imageops::resize(src, target_w, target_h, FilterType::Triangle);
            &scaled
        };

        for (sx, sy, px) in src.enumerate_pixels() {
            self.blend_pixel(ox + sx as i64, oy + sy as i64, *px, 1.0);
        }
    }
}

/// Source-over with straight (non-premultiplied) alpha.
fn blend_over(dst: Rgba<u8>, src: Rgba<u8>, src_alpha: f32) -> Rgba<u8> {
    let da = dst[3] as f32 / 255.0;
    let out_a = src_alpha + da * (1.0 - src_alpha);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let s = src[c] as f32;
        let d = dst[c] as f32;
        let v = (s * src_alpha + d * da * (1.0 - src_alpha)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}
