//! Credify Render
//!
//! Deterministic certificate rendering. The same student data always
//! produces byte-identical PNG output: the template is fixed, the glyphs
//! come from an injected [`GlyphSource`] and nothing time-dependent is
//! drawn.

pub mod canvas;
pub mod font;

use chrono::NaiveDate;
use credify_core::{CredifyError, StudentRecord};
use image::Rgb;
use qrcode::QrCode;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub use canvas::{hex_color, Canvas, WHITE};
pub use font::{BuiltinFont, Glyph, GlyphSource, TtfFont, BASE_LINE_HEIGHT};

pub const PNG_CONTENT_TYPE: &str = "image/png";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("{0} required")]
    MissingField(&'static str),

    #[error("QR code error: {0}")]
    QrCode(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("font error: {0}")]
    Font(String),
}

impl From<RenderError> for CredifyError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::MissingField(_) | RenderError::QrCode(_) => {
                CredifyError::Validation(err.to_string())
            }
            RenderError::Encode(msg) => CredifyError::Serialization(msg),
            RenderError::Font(msg) => CredifyError::Config(msg),
        }
    }
}

/// A rendered certificate, discarded after upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Fixed visual template shared by every certificate in a run
#[derive(Debug, Clone)]
pub struct CertificateTemplate {
    pub width: u32,
    pub height: u32,
    pub institution: String,
    pub title: String,
    pub completion_line: String,
    pub footer: String,
    /// Base of the public verification URL encoded in the QR code
    pub verify_base_url: String,
    pub include_qr: bool,
    pub gradient_from: Rgb<u8>,
    pub gradient_to: Rgb<u8>,
}

impl Default for CertificateTemplate {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            institution: "APEC University".to_string(),
            title: "Certificate of Achievement".to_string(),
            completion_line: "has successfully completed the program in".to_string(),
            footer: "This certificate is issued on-chain and verifiable via blockchain".to_string(),
            verify_base_url: "https://apec.edu.vn".to_string(),
            include_qr: true,
            gradient_from: Rgb([0x66, 0x7e, 0xea]),
            gradient_to: Rgb([0x76, 0x4b, 0xa2]),
        }
    }
}

impl CertificateTemplate {
    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = institution.into();
        self
    }

    pub fn with_verify_base_url(mut self, url: impl Into<String>) -> Self {
        self.verify_base_url = url.into();
        self
    }

    /// Public verification URL for a certificate id
    pub fn verify_url(&self, certificate_id: &str) -> String {
        format!(
            "{}/verify/{}",
            self.verify_base_url.trim_end_matches('/'),
            certificate_id
        )
    }
}

/// `2025-01-15` becomes `January 15, 2025`; anything unparseable is kept
/// as written
pub fn format_issue_date(raw: &str) -> String {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

const NAME_COLOR: Rgb<u8> = Rgb([0x1a, 0x20, 0x2c]);
const BODY_COLOR: Rgb<u8> = Rgb([0x4a, 0x55, 0x68]);
const DATE_COLOR: Rgb<u8> = Rgb([0x71, 0x80, 0x96]);
const ID_COLOR: Rgb<u8> = Rgb([0xa0, 0xae, 0xc0]);

pub struct CertificateRenderer {
    template: CertificateTemplate,
    glyphs: Arc<dyn GlyphSource>,
}

impl CertificateRenderer {
    pub fn new(template: CertificateTemplate, glyphs: Arc<dyn GlyphSource>) -> Self {
        Self { template, glyphs }
    }

    pub fn with_builtin_font(template: CertificateTemplate) -> Self {
        Self::new(template, Arc::new(BuiltinFont))
    }

    /// Renderer drawing with the font file at `path`
    pub fn with_font_file(template: CertificateTemplate, path: &Path) -> Result<Self, RenderError> {
        let font = TtfFont::from_path(path)?;
        tracing::info!(font = font.name(), path = %path.display(), "Loaded certificate font");
        Ok(Self::new(template, Arc::new(font)))
    }

    pub fn font_name(&self) -> &str {
        self.glyphs.name()
    }

    pub fn template(&self) -> &CertificateTemplate {
        &self.template
    }

    fn check_fields(student: &StudentRecord) -> Result<(), RenderError> {
        if student.name.trim().is_empty() {
            return Err(RenderError::MissingField("name"));
        }
        if student.major.trim().is_empty() {
            return Err(RenderError::MissingField("major"));
        }
        if student.issue_date.trim().is_empty() {
            return Err(RenderError::MissingField("issue date"));
        }
        Ok(())
    }

    /// Render one certificate as PNG
    pub fn render(&self, student: &StudentRecord) -> Result<RenderedArtifact, RenderError> {
        Self::check_fields(student)?;

        let t = &self.template;
        let glyphs = self.glyphs.as_ref();
        let (w, h) = (t.width, t.height);
        let center = w / 2;

        let mut canvas = Canvas::new(w, h);
        canvas.fill_diagonal_gradient(t.gradient_from, t.gradient_to);

        canvas.draw_text_centered(
            &t.institution.to_uppercase(),
            center,
            h * 6 / 100,
            w.saturating_sub(120),
            6,
            WHITE,
            glyphs,
        );
        canvas.draw_text_centered(&t.title, center, h * 14 / 100, w.saturating_sub(120), 4, WHITE, glyphs);

        let card_x = w * 5 / 100;
        let card_y = h * 22 / 100;
        let card_w = w - 2 * card_x;
        let card_h = h * 65 / 100;
        canvas.fill_rounded_rect(card_x, card_y, card_w, card_h, 20, WHITE);

        let text_width = card_w.saturating_sub(200);
        canvas.draw_text_centered(
            student.name.trim(),
            center,
            card_y + h * 7 / 100,
            text_width,
            8,
            NAME_COLOR,
            glyphs,
        );
        canvas.draw_text_centered(
            &t.completion_line,
            center,
            card_y + h * 20 / 100,
            text_width,
            4,
            BODY_COLOR,
            glyphs,
        );
        canvas.draw_text_centered(
            student.major.trim(),
            center,
            card_y + h * 29 / 100,
            text_width,
            5,
            t.gradient_from,
            glyphs,
        );

        // Lower lines share the card with the QR code.
        let lower_width = card_w.saturating_sub(400);
        canvas.draw_text_centered(
            &format!("Issued on {}", format_issue_date(&student.issue_date)),
            center,
            card_y + h * 43 / 100,
            lower_width,
            3,
            DATE_COLOR,
            glyphs,
        );

        if let Some(id) = student.certificate_id.as_deref().filter(|id| !id.is_empty()) {
            canvas.draw_text_centered(
                &format!("ID: {}", id),
                center,
                card_y + h * 51 / 100,
                lower_width,
                2,
                ID_COLOR,
                glyphs,
            );

            if t.include_qr {
                let code = QrCode::new(t.verify_url(id).as_bytes())
                    .map_err(|e| RenderError::QrCode(e.to_string()))?;
                let module = 3;
                let side = Canvas::qr_side(&code, module);
                let qr_x = (card_x + card_w).saturating_sub(side + 16);
                let qr_y = (card_y + card_h).saturating_sub(side + 16);
                canvas.draw_qr(&code, qr_x, qr_y, module);
            }
        }

        canvas.draw_text_centered(&t.footer, center, h * 91 / 100, w.saturating_sub(120), 3, WHITE, glyphs);

        let bytes = canvas.encode_png()?;
        tracing::debug!(
            student = %student.key(),
            bytes = bytes.len(),
            font = glyphs.name(),
            "Rendered certificate"
        );

        Ok(RenderedArtifact {
            bytes,
            content_type: PNG_CONTENT_TYPE,
            width: w,
            height: h,
        })
    }
}

/// DejaVu Sans, shipped for tests under `assets/`
#[cfg(test)]
pub(crate) fn test_font_path() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/DejaVuSans.ttf")
}
