//! CSS-style color strings as stored on text elements.

use image::Rgba;

/// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` or a few named colors.
pub fn parse_color(s: &str) -> Option<Rgba<u8>> {
    let s = s.trim();
    match s.to_lowercase().as_str() {
        "black" => return Some(Rgba([0, 0, 0, 255])),
        "white" => return Some(Rgba([255, 255, 255, 255])),
        "transparent" => return Some(Rgba([0, 0, 0, 0])),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_forms() {
        assert_eq!(parse_color("#000"), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(parse_color("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_color("#D4AF37"), Some(Rgba([0xd4, 0xaf, 0x37, 255])));
        assert_eq!(parse_color("#11223380"), Some(Rgba([0x11, 0x22, 0x33, 0x80])));
        assert_eq!(parse_color(" #f00a "), Some(Rgba([255, 0, 0, 0xaa])));
    }

    #[test]
    fn test_named_and_invalid() {
        assert_eq!(parse_color("White"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_color("transparent"), Some(Rgba([0, 0, 0, 0])));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#zzz"), None);
        assert_eq!(parse_color("red-ish"), None);
        assert_eq!(parse_color(""), None);
    }
}
