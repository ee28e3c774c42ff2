//! Text extraction from uploaded files.

use crate::error::{RouterError, RouterResult};

/// Synchronous text extraction. Called from a blocking task.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> RouterResult<String>;
}

/// Reads the text layer of a PDF.
///
/// Pages without a text layer (scans) contribute nothing.
#[derive(Debug, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> RouterResult<String> {
        if !bytes.starts_with(b"%PDF") {
            return Err(RouterError::Pdf("missing %PDF header".to_string()));
        }
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| RouterError::Pdf(e.to_string()))
    }
}
