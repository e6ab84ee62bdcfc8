//! Glyph sources
//!
//! The renderer asks a [`GlyphSource`] for one bitmap per character at a
//! given scale. [`TtfFont`] rasterizes a TrueType/OpenType font and is what
//! a deployment should configure. [`BuiltinFont`] is the fallback when no
//! font file is set: a fixed 5x7 pixel font covering ASCII letters, digits
//! and common punctuation, with lowercase drawn in the uppercase shapes and
//! anything unknown drawn as a hollow box.

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use std::path::Path;

use crate::RenderError;

/// Glyph height in pixels at scale 1, shared by every source so template
/// scales mean the same size whichever font is loaded
pub const BASE_LINE_HEIGHT: u32 = 7;

/// A monochrome glyph bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub width: u32,
    pub height: u32,
    pixels: Vec<bool>,
}

impl Glyph {
    /// Glyph from bit rows, one `u32` per row with the leftmost pixel in
    /// bit `width - 1`
    pub fn new(width: u32, rows: Vec<u32>) -> Self {
        let height = rows.len() as u32;
        let pixels = rows
            .iter()
            .flat_map(|row| (0..width).map(move |x| (row >> (width - 1 - x)) & 1 == 1))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; (width * height) as usize],
        }
    }

    /// Whether the pixel at `(x, y)` is set
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.pixels[(y * self.width + x) as usize]
    }

    fn set(&mut self, x: u32, y: u32) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = true;
        }
    }

    pub fn is_blank(&self) -> bool {
        !self.pixels.iter().any(|p| *p)
    }

    /// Nearest-neighbour enlargement by an integer factor
    pub fn scaled(&self, scale: u32) -> Glyph {
        let scale = scale.max(1);
        if scale == 1 {
            return self.clone();
        }
        let mut out = Glyph::blank(self.width * scale, self.height * scale);
        for y in 0..out.height {
            for x in 0..out.width {
                if self.is_set(x / scale, y / scale) {
                    out.set(x, y);
                }
            }
        }
        out
    }
}

/// Resource collaborator that supplies glyph bitmaps to the renderer
pub trait GlyphSource: Send + Sync {
    fn name(&self) -> &str;

    /// Blank columns between adjacent glyphs at scale 1
    fn spacing(&self) -> u32 {
        1
    }

    /// Bitmap for `ch` at scale 1; never fails, unknown characters get a
    /// fallback
    fn glyph(&self, ch: char) -> Glyph;

    /// Bitmap for `ch`, `scale` times the base line height tall
    fn glyph_scaled(&self, ch: char, scale: u32) -> Glyph {
        self.glyph(ch).scaled(scale)
    }
}

/// Glyphs rasterized from a TrueType/OpenType font
pub struct TtfFont {
    name: String,
    font: FontVec,
}

impl TtfFont {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, RenderError> {
        let font = FontVec::try_from_vec(bytes).map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self {
            name: name.into(),
            font,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path)
            .map_err(|e| RenderError::Font(format!("{}: {}", path.display(), e)))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ttf".to_string());
        Self::from_bytes(name, bytes)
    }

    /// Whether the font maps `ch` to a real glyph
    pub fn supports(&self, ch: char) -> bool {
        self.font.glyph_id(ch).0 != 0
    }
}

impl GlyphSource for TtfFont {
    fn name(&self) -> &str {
        &self.name
    }

    // Advances already carry side bearings.
    fn spacing(&self) -> u32 {
        0
    }

    fn glyph(&self, ch: char) -> Glyph {
        self.glyph_scaled(ch, 1)
    }

    fn glyph_scaled(&self, ch: char, scale: u32) -> Glyph {
        let px = PxScale::from((BASE_LINE_HEIGHT * scale.max(1)) as f32);
        let scaled = self.font.as_scaled(px);
        let id = self.font.glyph_id(ch);
        let ascent = scaled.ascent();

        let width = scaled.h_advance(id).ceil().max(1.0) as u32;
        let height = (scaled.ascent() - scaled.descent()).ceil().max(1.0) as u32;
        let mut glyph = Glyph::blank(width, height);

        let positioned = id.with_scale_and_position(px, point(0.0, ascent));
        if let Some(outline) = self.font.outline_glyph(positioned) {
            let bounds = outline.px_bounds();
            let (left, top) = (bounds.min.x as i64, bounds.min.y as i64);
            outline.draw(|x, y, coverage| {
                let gx = left + i64::from(x);
                let gy = top + i64::from(y);
                if coverage >= 0.5 && gx >= 0 && gy >= 0 {
                    glyph.set(gx as u32, gy as u32);
                }
            });
        }
        glyph
    }
}

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: usize = 7;

type Rows = [u8; GLYPH_HEIGHT];

const BOX: Rows = [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F];

/// Built-in 5x7 bitmap font
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFont;

impl BuiltinFont {
    fn rows(ch: char) -> Option<Rows> {
        let rows = match ch.to_ascii_uppercase() {
            'A' => [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11],
            'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
            'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
            'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
            'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
            'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
            'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
            'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
            'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
            'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
            'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
            'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
            'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
            'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
            'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
            'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
            'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
            'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
            'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
            'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
            'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
            'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
            'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
            'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
            'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
            'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
            '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
            '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
            '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
            '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
            '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
            '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
            '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
            '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
            '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
            '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
            ' ' => [0x00; GLYPH_HEIGHT],
            '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
            ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
            ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
            ';' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x04, 0x08],
            '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
            '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
            '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
            '@' => [0x0E, 0x11, 0x01, 0x0D, 0x15, 0x15, 0x0E],
            '\'' => [0x0C, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
            '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
            ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
            '&' => [0x0C, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0D],
            '!' => [0x04, 0x04, 0x04, 0x04, 0x00, 0x00, 0x04],
            '?' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
            '#' => [0x0A, 0x0A, 0x1F, 0x0A, 0x1F, 0x0A, 0x0A],
            '+' => [0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00],
            _ => return None,
        };
        Some(rows)
    }

    /// Whether the font has a real glyph for `ch`
    pub fn supports(ch: char) -> bool {
        Self::rows(ch).is_some()
    }
}

impl GlyphSource for BuiltinFont {
    fn name(&self) -> &str {
        "builtin-5x7"
    }

    fn glyph(&self, ch: char) -> Glyph {
        let rows = Self::rows(ch).unwrap_or(BOX);
        Glyph::new(GLYPH_WIDTH, rows.iter().map(|r| u32::from(*r)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_uses_uppercase_shape() {
        let font = BuiltinFont;
        assert_eq!(font.glyph('a'), font.glyph('A'));
    }

    #[test]
    fn test_unknown_char_is_box() {
        let font = BuiltinFont;
        let glyph = font.glyph('\u{1F600}');
        assert!(!BuiltinFont::supports('\u{1F600}'));
        assert!(glyph.is_set(0, 0));
        assert!(glyph.is_set(4, 6));
        assert!(!glyph.is_set(2, 3));
    }

    #[test]
    fn test_pixel_addressing() {
        let glyph = BuiltinFont.glyph('L');
        assert!(glyph.is_set(0, 0));
        assert!(!glyph.is_set(4, 0));
        assert!(glyph.is_set(4, 6));
        assert!(!glyph.is_set(5, 6));
    }

    #[test]
    fn test_space_is_blank() {
        let glyph = BuiltinFont.glyph(' ');
        assert!(glyph.is_blank());
        assert_eq!(glyph.height, BASE_LINE_HEIGHT);
    }

    #[test]
    fn test_scaled_glyph_keeps_shape() {
        let glyph = BuiltinFont.glyph('L').scaled(3);
        assert_eq!((glyph.width, glyph.height), (15, 21));
        assert!(glyph.is_set(0, 20));
        assert!(glyph.is_set(14, 20));
        assert!(!glyph.is_set(14, 0));
    }

    fn dejavu() -> TtfFont {
        TtfFont::from_path(&crate::test_font_path()).unwrap()
    }

    #[test]
    fn test_ttf_distinguishes_diacritics() {
        let font = dejavu();
        for ch in ['e', 'ễ', 'ẫ', 'ả', 'ă'] {
            assert!(font.supports(ch), "{} missing", ch);
        }
        assert_ne!(font.glyph_scaled('ễ', 4), font.glyph_scaled('ẫ', 4));
        assert_ne!(font.glyph_scaled('a', 4), font.glyph_scaled('ả', 4));
        assert_ne!(font.glyph_scaled('a', 4), font.glyph_scaled('A', 4));
    }

    #[test]
    fn test_ttf_glyph_height_follows_scale() {
        let font = dejavu();
        let small = font.glyph_scaled('H', 2);
        let large = font.glyph_scaled('H', 6);
        assert!(!small.is_blank());
        assert!(large.height > small.height * 2);
        assert!(font.glyph(' ').is_blank());
    }

    #[test]
    fn test_missing_font_file() {
        let err = TtfFont::from_path(Path::new("/nonexistent/font.ttf"))
            .err()
            .unwrap();
        assert!(matches!(err, RenderError::Font(_)));
        let err = TtfFont::from_bytes("junk", b"not a font".to_vec()).err().unwrap();
        assert!(matches!(err, RenderError::Font(_)));
    }
}
