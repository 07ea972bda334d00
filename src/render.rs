//! Page rasterization.
//!
//! Converts ranked page references into PNG files via Pdfium. Rendering is
//! strictly best-effort: a corrupt page, a missing document, or an absent
//! Pdfium library only costs that page (or that batch member), never the
//! siblings. The document handle is released unconditionally when the
//! per-page scope exits.

use std::path::Path;

use anyhow::{Context, Result};
use pdfium_render::prelude::*;

use crate::models::{RenderedImage, ScoredPage};
use crate::pdf;

/// Raster resolution. PDF points are 1/72 inch, so the scale factor is
/// `RENDER_DPI / 72`.
pub const RENDER_DPI: f32 = 150.0;

/// Render one page of a document to a PNG in `output_dir`.
///
/// `page` is 1-based (Pdfium loads 0-based). The output file is named
/// `{stem}_page_{page}.png`. Fails on a bad page index, a corrupt page, or
/// an I/O error; the open document is dropped either way.
pub fn render_page(
    pdfium: &Pdfium,
    document_path: &Path,
    page: usize,
    score: usize,
    output_dir: &Path,
) -> Result<RenderedImage> {
    let stem = document_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let source = document_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| stem.clone());

    let output_path = output_dir.join(format!("{}_page_{}.png", stem, page));

    let document = pdfium
        .load_pdf_from_file(document_path, None)
        .with_context(|| format!("Failed to open {}", document_path.display()))?;

    let pdf_page = document
        .pages()
        .get((page - 1) as u16)
        .with_context(|| format!("Failed to load page {} of {}", page, source))?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(RENDER_DPI / 72.0);
    let bitmap = pdf_page
        .render_with_config(&render_config)
        .with_context(|| format!("Failed to rasterize page {} of {}", page, source))?;

    bitmap
        .as_image()
        .into_rgb8()
        .save(&output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    Ok(RenderedImage {
        path: output_path.to_string_lossy().to_string(),
        source,
        page,
        score,
    })
}

/// Render a ranked batch of pages, collecting only the successes.
///
/// Creates `output_dir` if absent. Each page is rendered sequentially; a
/// failure is logged with a warning and skipped so the remaining pages are
/// unaffected. When the Pdfium library itself cannot be bound, every page
/// is skipped and the result is empty — the caller still reports a match
/// set, distinguishing a rendering outage from "no matches".
pub fn render_ranked(
    pages: &[ScoredPage],
    corpus_dir: &Path,
    output_dir: &Path,
) -> Vec<RenderedImage> {
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        eprintln!(
            "Warning: could not create image directory {}: {}",
            output_dir.display(),
            e
        );
        return Vec::new();
    }

    let pdfium = match pdf::create_pdfium() {
        Ok(pdfium) => pdfium,
        Err(e) => {
            eprintln!("Warning: rendering unavailable: {}", e);
            return Vec::new();
        }
    };

    let mut images = Vec::new();
    for entry in pages {
        let document_path = corpus_dir.join(&entry.source);
        match render_page(&pdfium, &document_path, entry.page, entry.score, output_dir) {
            Ok(image) => images.push(image),
            Err(e) => {
                eprintln!(
                    "Warning: could not convert page {} of {} to image: {}",
                    entry.page, entry.source, e
                );
            }
        }
    }

    images
}
