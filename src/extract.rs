//! Page-level text extraction for uploaded documents.
//!
//! Callers supply raw bytes plus a content-type; this module returns an
//! ordered sequence of `(page_text, page_number)` pairs, page numbers
//! zero-based. Extraction failures are fatal to the ingestion of that
//! document and surface as [`ExtractError`].

/// Supported MIME types for extraction.
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

/// Extraction error: no panic; the ingestion call fails and the caller
/// decides what to do with the underlying upload.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedContentType(String),
    Pdf(String),
    Encoding(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedContentType(ct) => {
                write!(f, "unsupported content-type: {}", ct)
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Encoding(e) => write!(f, "text decoding failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract the page sequence from a binary document.
pub fn extract_pages(bytes: &[u8], content_type: &str) -> Result<Vec<(String, usize)>, ExtractError> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        MIME_TEXT => extract_plain(bytes),
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<Vec<(String, usize)>, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.into_iter().enumerate().map(|(i, t)| (t, i)).collect())
}

/// Plain text is a single page 0.
fn extract_plain(bytes: &[u8]) -> Result<Vec<(String, usize)>, ExtractError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ExtractError::Encoding(e.to_string()))?;
    Ok(vec![(text.to_string(), 0)])
}
