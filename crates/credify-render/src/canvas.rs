//! Raster drawing primitives over an RGB image buffer

use image::{ImageFormat, Rgb, RgbImage};
use qrcode::{Color, QrCode};
use std::io::Cursor;

use crate::font::GlyphSource;
use crate::RenderError;

/// Parse `#rrggbb` into a pixel
pub fn hex_color(hex: &str) -> Option<Rgb<u8>> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

pub const WHITE: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
pub const BLACK: Rgb<u8> = Rgb([0x00, 0x00, 0x00]);

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8
}

pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, WHITE),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x < 0 || y < 0 {
            return;
        }
        if let Some(px) = self.image.get_pixel_mut_checked(x as u32, y as u32) {
            *px = color;
        }
    }

    /// Fill the whole canvas with a top-left to bottom-right gradient
    pub fn fill_diagonal_gradient(&mut self, from: Rgb<u8>, to: Rgb<u8>) {
        let span = (self.width() + self.height()).saturating_sub(2).max(1) as f32;
        for (x, y, px) in self.image.enumerate_pixels_mut() {
            let t = (x + y) as f32 / span;
            *px = Rgb([
                lerp(from[0], to[0], t),
                lerp(from[1], to[1], t),
                lerp(from[2], to[2], t),
            ]);
        }
    }

    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
        for py in y..y.saturating_add(height) {
            for px in x..x.saturating_add(width) {
                self.put(px as i64, py as i64, color);
            }
        }
    }

    /// Fill a rectangle whose corners are rounded with `radius`
    pub fn fill_rounded_rect(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        radius: u32,
        color: Rgb<u8>,
    ) {
        let r = radius.min(width / 2).min(height / 2) as i64;
        let (x0, y0) = (x as i64, y as i64);
        let (x1, y1) = (x0 + width as i64 - 1, y0 + height as i64 - 1);

        for py in y0..=y1 {
            for px in x0..=x1 {
                let cx = if px < x0 + r {
                    Some(x0 + r)
                } else if px > x1 - r {
                    Some(x1 - r)
                } else {
                    None
                };
                let cy = if py < y0 + r {
                    Some(y0 + r)
                } else if py > y1 - r {
                    Some(y1 - r)
                } else {
                    None
                };

                if let (Some(cx), Some(cy)) = (cx, cy) {
                    let (dx, dy) = (px - cx, py - cy);
                    if dx * dx + dy * dy > r * r {
                        continue;
                    }
                }
                self.put(px, py, color);
            }
        }
    }

    /// Pixel width of `text` at `scale`
    pub fn text_width(text: &str, scale: u32, glyphs: &dyn GlyphSource) -> u32 {
        let scale = scale.max(1);
        let gap = glyphs.spacing() * scale;
        let advance: u32 = text
            .chars()
            .map(|ch| glyphs.glyph_scaled(ch, scale).width + gap)
            .sum();
        advance.saturating_sub(gap)
    }

    /// Draw `text` with its top-left corner at `(x, y)`
    pub fn draw_text(
        &mut self,
        text: &str,
        x: i64,
        y: i64,
        scale: u32,
        color: Rgb<u8>,
        glyphs: &dyn GlyphSource,
    ) {
        let scale = scale.max(1);
        let gap = i64::from(glyphs.spacing() * scale);
        let mut pen = x;

        for ch in text.chars() {
            let glyph = glyphs.glyph_scaled(ch, scale);
            for gy in 0..glyph.height {
                for gx in 0..glyph.width {
                    if glyph.is_set(gx, gy) {
                        self.put(pen + i64::from(gx), y + i64::from(gy), color);
                    }
                }
            }
            pen += i64::from(glyph.width) + gap;
        }
    }

    /// Draw `text` centred on `center_x`, shrinking the scale until it fits
    /// in `max_width`. Returns the scale used.
    pub fn draw_text_centered(
        &mut self,
        text: &str,
        center_x: u32,
        y: u32,
        max_width: u32,
        scale: u32,
        color: Rgb<u8>,
        glyphs: &dyn GlyphSource,
    ) -> u32 {
        let mut scale = scale.max(1);
        while scale > 1 && Self::text_width(text, scale, glyphs) > max_width {
            scale -= 1;
        }
        let width = Self::text_width(text, scale, glyphs) as i64;
        let x = center_x as i64 - width / 2;
        self.draw_text(text, x, y as i64, scale, color, glyphs);
        scale
    }

    /// Draw a QR code with one `module` pixel square per cell and a
    /// four-module quiet zone
    pub fn draw_qr(&mut self, code: &QrCode, x: u32, y: u32, module: u32) {
        let width = code.width() as u32;
        let quiet = 4 * module;
        let side = width * module + 2 * quiet;
        self.fill_rect(x, y, side, side, WHITE);

        for (i, color) in code.to_colors().into_iter().enumerate() {
            if color != Color::Dark {
                continue;
            }
            let cx = i as u32 % width;
            let cy = i as u32 / width;
            self.fill_rect(x + quiet + cx * module, y + quiet + cy * module, module, module, BLACK);
        }
    }

    /// Side length in pixels of a QR code drawn by [`Canvas::draw_qr`]
    pub fn qr_side(code: &QrCode, module: u32) -> u32 {
        code.width() as u32 * module + 8 * module
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut buf = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }
}
