//! PDF text extraction

use std::path::Path;

use crate::error::{Error, Result};

/// Turns a stored file into plain text
pub trait TextExtractor: Send + Sync {
    /// Extract whitespace-normalized text from the file at `path`
    fn extract(&self, path: &Path) -> Result<String>;
}

/// Extractor for PDF files using `pdf-extract`
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        // pdf-extract panics on some malformed inputs
        let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text(path))
            .map_err(|_| Error::extraction(format!("PDF parser crashed on '{}'", path.display())))?
            .map_err(|e| Error::extraction(format!("Failed to parse '{}': {}", path.display(), e)))?;

        Ok(normalize_whitespace(&extracted))
    }
}

/// Collapse every whitespace run (including page breaks) into a single space
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether an upload name ends in `.pdf`, in any case
pub fn is_pdf_filename(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}
