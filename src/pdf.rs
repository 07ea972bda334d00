//! PDF primitives: per-page text extraction and the rasterizer binding.
//!
//! Text comes from `pdf-extract`; rasterization goes through `pdfium-render`,
//! which binds the native Pdfium library at runtime. Both are treated as
//! black boxes by the rest of the crate: callers get page text strings and
//! page images, nothing else.

use pdfium_render::prelude::*;

/// Extraction error (no panic; callers skip the offending document).
#[derive(Debug)]
pub enum PdfError {
    Read(String),
    Parse(String),
}

impl std::fmt::Display for PdfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PdfError::Read(e) => write!(f, "PDF read failed: {}", e),
            PdfError::Parse(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for PdfError {}

/// Extract the text of every page of a PDF document, in page order.
///
/// Index 0 of the returned vector is page 1 of the document. Pages that
/// carry no extractable text come back as empty strings; callers decide
/// whether to skip them.
pub fn extract_page_texts(path: &std::path::Path) -> Result<Vec<String>, PdfError> {
    let bytes = std::fs::read(path).map_err(|e| PdfError::Read(e.to_string()))?;
    pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .map_err(|e| PdfError::Parse(e.to_string()))
}

/// Bind to the native Pdfium library.
///
/// Searches the current directory first, then `vendor/pdfium/lib/`, then
/// the system library path. Returns an error (not a panic) when no library
/// is found so that rendering failures stay contained to the page batch.
pub fn create_pdfium() -> anyhow::Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "./vendor/pdfium/lib/",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load the Pdfium library (install libpdfium or place it in ./): {:?}",
                e
            )
        })?;

    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_read_error() {
        let err = extract_page_texts(std::path::Path::new("/nonexistent/doc.pdf")).unwrap_err();
        assert!(matches!(err, PdfError::Read(_)));
    }

    #[test]
    fn test_invalid_pdf_is_parse_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bad.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        let err = extract_page_texts(&path).unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }
}
