//! Digest document rendering.
//!
//! With a CJK-capable font configured, digests become a single-column A4
//! PDF named `日誌.pdf`. Without one the digest ships as `日誌.txt`, since
//! the built-in PDF fonts cannot encode the text these digests carry.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use printpdf::{Mm, PdfDocument};

use crate::adapters::Attachment;

const PDF_FILE_NAME: &str = "日誌.pdf";
const TEXT_FILE_NAME: &str = "日誌.txt";

/// Characters per rendered line. Wrapping counts characters, not glyph
/// widths, which is close enough for the mostly full-width text involved.
const WRAP_COLUMNS: usize = 40;

/// Renders digest text into a mail attachment.
pub struct DocumentRenderer {
    font: Option<Vec<u8>>,
}

impl DocumentRenderer {
    /// Font bytes are read eagerly so a bad path fails at startup rather
    /// than on the first export.
    pub fn new(font_path: Option<&Path>) -> Result<Self> {
        let font = match font_path {
            Some(path) => Some(std::fs::read(path).with_context(|| {
                format!("Failed to read PDF font {}", path.display())
            })?),
            None => None,
        };
        Ok(Self { font })
    }

    /// Render `body` into a PDF when a font is configured, plain text
    /// otherwise. `title` becomes PDF document metadata only.
    pub fn render(&self, title: &str, body: &str) -> Result<Attachment> {
        match &self.font {
            Some(bytes) => render_pdf(title, body, bytes),
            None => Ok(Attachment {
                file_name: TEXT_FILE_NAME.to_string(),
                content_type: "text/plain; charset=utf-8".to_string(),
                bytes: body.as_bytes().to_vec(),
            }),
        }
    }
}

// A4 portrait, 20mm margins, 12pt text on a 7mm leading.
fn render_pdf(title: &str, body: &str, font_bytes: &[u8]) -> Result<Attachment> {
    let (doc, first_page, first_layer) = PdfDocument::new(title, Mm(210.0), Mm(297.0), "內容");
    let font = doc
        .add_external_font(font_bytes)
        .map_err(|error| anyhow!("Failed to load PDF font: {error}"))?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    let mut y = 277.0;
    for line in wrap_lines(body, WRAP_COLUMNS) {
        if y < 20.0 {
            let (page, layer_index) = doc.add_page(Mm(210.0), Mm(297.0), "內容");
            layer = doc.get_page(page).get_layer(layer_index);
            y = 277.0;
        }
        if !line.is_empty() {
            layer.use_text(line, 12.0, Mm(20.0), Mm(y), &font);
        }
        y -= 7.0;
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|error| anyhow!("Failed to serialize PDF: {error}"))?;
    Ok(Attachment {
        file_name: PDF_FILE_NAME.to_string(),
        content_type: "application/pdf".to_string(),
        bytes,
    })
}

/// Split on line breaks, then chunk each logical line to at most
/// `max_chars` characters. Blank lines survive as empty entries so
/// paragraph spacing is kept.
fn wrap_lines(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        let mut count = 0;
        for ch in raw.chars() {
            current.push(ch);
            count += 1;
            if count == max_chars {
                lines.push(std::mem::take(&mut current));
                count = 0;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}
