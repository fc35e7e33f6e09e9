//! Text layout: greedy word wrap and per-line alignment inside an element box.
//!
//! Layout is pure (text + metrics in, positioned lines out); drawing is a
//! separate step so the wrapping rules can be tested without rasterizing.

use image::Rgba;

use super::color::parse_color;
use super::font::{FontBook, TextMeasure};
use super::surface::Surface;
use crate::geometry::Rect;
use crate::template::{Alignment, MAX_FONT_SIZE, TextElement};

const DEFAULT_TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// One positioned line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct LaidLine {
    pub text: String,
    /// Left edge after alignment.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    pub width: f32,
}

/// Horizontal start of a line of width `text_width` inside `[base_x, base_x + box_width]`.
pub fn align_x(alignment: Alignment, base_x: f32, box_width: f32, text_width: f32) -> f32 {
    match alignment {
        Alignment::Left | Alignment::Justify => base_x,
        Alignment::Center => base_x + (box_width - text_width) / 2.0,
        Alignment::Right => base_x + box_width - text_width,
    }
}

/// Greedy word wrap of a single paragraph (no newlines).
///
/// Before adding a word, `current + word + " "` is measured; when that exceeds
/// `max_width` and the current line already has content, the current line is
/// flushed and the word starts a new one. A word wider than `max_width` on its
/// own is kept whole. Returned lines carry no trailing space.
pub fn wrap_paragraph(paragraph: &str, max_width: f32, measure: &dyn TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in paragraph.split(' ') {
        let candidate = format!("{}{} ", current, word);
        if measure.measure(&candidate) > max_width && !current.is_empty() {
            lines.push(current.trim_end_matches(' ').to_string());
            current = format!("{} ", word);
        } else {
            current = candidate;
        }
    }
    lines.push(current.trim_end_matches(' ').to_string());
    lines
}

/// Layout parameters shared by every line of one element.
#[derive(Debug, Clone, Copy)]
pub struct LayoutBox {
    pub rect: Rect,
    pub font_size: f32,
    pub line_height: f32,
    pub alignment: Alignment,
    pub wrap: bool,
}

impl From<&TextElement> for LayoutBox {
    fn from(el: &TextElement) -> Self {
        Self {
            rect: el.rect(),
            font_size: el.font_size,
            line_height: el.line_height,
            alignment: el.alignment,
            wrap: el.wrap,
        }
    }
}

/// Lay out `text` (possibly multi-line) inside the box.
///
/// Each newline-delimited paragraph is wrapped independently when `wrap` is
/// set, otherwise it is one unbroken run. Lines advance by
/// `font_size * line_height` and are aligned on their own measured width.
pub fn layout(text: &str, lbox: &LayoutBox, measure: &dyn TextMeasure) -> Vec<LaidLine> {
    let advance = lbox.font_size * lbox.line_height;
    let mut out = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let lines = if lbox.wrap {
            wrap_paragraph(paragraph, lbox.rect.width, measure)
        } else {
            vec![paragraph.to_string()]
        };

        for line in lines {
            let width = measure.measure(&line);
            let x = align_x(lbox.alignment, lbox.rect.x, lbox.rect.width, width);
            let y = lbox.rect.y + out.len() as f32 * advance;
            out.push(LaidLine {
                text: line,
                x,
                y,
                width,
            });
        }
    }

    out
}

/// Paint a text element: optional background box, then its laid-out lines.
/// Returns the lines that were drawn.
pub fn draw_text_element(
    surface: &mut Surface,
    element: &TextElement,
    text: &str,
    fonts: &FontBook,
) -> Vec<LaidLine> {
    if element.background_opacity > 0.0
        && let Some(bg) = element.background_color.as_deref().and_then(parse_color)
    {
        surface.fill_rect(element.rect(), bg, element.background_opacity.min(1.0));
    }

    if text.is_empty() {
        return Vec::new();
    }

    if !(element.font_size > 0.0) || !element.rect().is_finite() {
        return Vec::new();
    }
    let mut lbox = LayoutBox::from(element);
    lbox.font_size = element.font_size.min(MAX_FONT_SIZE);

    let face = fonts.sized(&element.font, lbox.font_size);
    let color = parse_color(&element.text_color).unwrap_or(DEFAULT_TEXT_COLOR);
    let lines = layout(text, &lbox, &face);
    for line in &lines {
        face.draw(surface, &line.text, line.x, line.y, color);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::font::SizedFace;
    use pretty_assertions::assert_eq;

    /// Every character is 10px wide.
    struct Mono;

    impl TextMeasure for Mono {
        fn measure(&self, text: &str) -> f32 {
            text.chars().count() as f32 * 10.0
        }
    }

    fn lbox(width: f32, alignment: Alignment, wrap: bool) -> LayoutBox {
        LayoutBox {
            rect: Rect::new(100.0, 50.0, width, 200.0),
            font_size: 20.0,
            line_height: 1.5,
            alignment,
            wrap,
        }
    }

    #[test]
    fn test_wrap_greedy() {
        // "aa bb " = 60 fits in 60; "aa bb cc " = 90 does not
        let lines = wrap_paragraph("aa bb cc dd", 60.0, &Mono);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
    }

    #[test]
    fn test_wrap_lines_fit_except_long_words() {
        let text = "the quick brown fox jumps over a supercalifragilistic lazy dog";
        for max in [40.0, 60.0, 85.0, 120.0, 300.0] {
            for line in wrap_paragraph(text, max, &Mono) {
                let w = Mono.measure(&line);
                assert!(
                    w <= max || !line.contains(' '),
                    "line {:?} ({}) exceeds {}",
                    line,
                    w,
                    max
                );
            }
        }
    }

    #[test]
    fn test_wrap_overlong_word_kept_whole() {
        let lines = wrap_paragraph("hi extraordinary yo", 50.0, &Mono);
        assert_eq!(lines, vec!["hi", "extraordinary", "yo"]);
    }

    #[test]
    fn test_wrap_empty_paragraph() {
        assert_eq!(wrap_paragraph("", 50.0, &Mono), vec![String::new()]);
    }

    #[test]
    fn test_align_formulas() {
        assert_eq!(align_x(Alignment::Left, 10.0, 200.0, 50.0), 10.0);
        assert_eq!(align_x(Alignment::Center, 10.0, 200.0, 50.0), 85.0);
        assert_eq!(align_x(Alignment::Right, 10.0, 200.0, 50.0), 160.0);
        assert_eq!(align_x(Alignment::Justify, 10.0, 200.0, 50.0), 10.0);
        // Wider than the box: offsets go negative relative to the box, not clamped
        assert_eq!(align_x(Alignment::Center, 0.0, 100.0, 140.0), -20.0);
    }

    #[test]
    fn test_layout_advances_and_aligns_each_line() {
        let lines = layout("ab cd\nlonger", &lbox(100.0, Alignment::Right, true), &Mono);
        assert_eq!(
            lines,
            vec![
                LaidLine { text: "ab cd".into(), x: 150.0, y: 50.0, width: 50.0 },
                LaidLine { text: "longer".into(), x: 140.0, y: 80.0, width: 60.0 },
            ]
        );
    }

    #[test]
    fn test_layout_no_wrap_is_single_run() {
        let lines = layout("one two three four", &lbox(30.0, Alignment::Left, false), &Mono);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "one two three four");
        assert_eq!(lines[0].width, 180.0);
    }

    #[test]
    fn test_layout_centered_wrap() {
        let lines = layout("aa bb cc", &lbox(60.0, Alignment::Center, true), &Mono);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].x, 100.0 + (60.0 - 50.0) / 2.0);
        assert_eq!(lines[1].x, 100.0 + (60.0 - 20.0) / 2.0);
        assert_eq!(lines[1].y, 80.0);
    }

    #[test]
    fn test_draw_background_before_text() {
        let mut surface = Surface::new(200, 100);
        let mut el = TextElement::new("t", Rect::new(0.0, 0.0, 200.0, 100.0));
        el.background_color = Some("#ff0000".into());
        el.background_opacity = 1.0;
        el.text_color = "#0000ff".into();
        el.font_size = 24.0;

        let lines = draw_text_element(&mut surface, &el, "HI", &FontBook::new());
        assert_eq!(lines.len(), 1);
        // Background painted outside the glyph area
        assert_eq!(surface.pixel(190, 90), Some(Rgba([255, 0, 0, 255])));
        // Glyphs drawn at full opacity on top
        assert!(surface.image().pixels().any(|p| *p == Rgba([0, 0, 255, 255])));
    }

    #[test]
    fn test_draw_zero_opacity_background_skipped() {
        let mut surface = Surface::new(50, 50);
        let mut el = TextElement::new("t", Rect::new(0.0, 0.0, 50.0, 50.0));
        el.background_color = Some("#ff0000".into());
        el.background_opacity = 0.0;
        draw_text_element(&mut surface, &el, "", &FontBook::new());
        assert_eq!(surface.pixel(10, 10), Some(Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_bitmap_face_wrap_respects_width() {
        let face = SizedFace::bitmap(24.0);
        for line in wrap_paragraph("Certified nail artist since 2019", 150.0, &face) {
            assert!(face.measure(&line) <= 150.0 || !line.contains(' '));
        }
    }

    #[test]
    fn test_draw_caps_font_size() {
        let mut surface = Surface::new(40, 40);
        let mut el = TextElement::new("t", Rect::new(0.0, 0.0, 40.0, 40.0));
        el.font_size = 1e9;

        let lines = draw_text_element(&mut surface, &el, "Ann Lee", &FontBook::new());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].y, MAX_FONT_SIZE * el.line_height);

        el.font_size = f32::NAN;
        assert!(draw_text_element(&mut surface, &el, "Ann", &FontBook::new()).is_empty());
    }
}
