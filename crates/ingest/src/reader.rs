use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, info};

use crate::document::{ExtractedText, RawDocument};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Only the first `max_pages` pages are read
    pub max_pages: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { max_pages: 20 }
    }
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Could not open the document as a PDF: {0}")]
    Unreadable(String),
}

pub struct PdfReader {
    config: ReaderConfig,
}

impl PdfReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Extract text off the async runtime; PDF parsing is CPU bound.
    pub async fn read_document(&self, document: &RawDocument) -> Result<ExtractedText, ReadError> {
        let bytes = document.bytes.clone();
        let max_pages = self.config.max_pages;

        let extracted = tokio::task::spawn_blocking(move || extract_pages(&bytes, max_pages))
            .await
            .map_err(|e| ReadError::Unreadable(format!("extraction task failed: {}", e)))??;

        info!(
            digest = %document.digest,
            pages = extracted.pages_total,
            processed = extracted.pages_processed,
            with_text = extracted.pages_with_text,
            chars = extracted.text.chars().count(),
            "Extracted document text"
        );

        Ok(extracted)
    }
}

/// Read up to `max_pages` pages and join the non-blank ones with a blank line.
/// Pages past the limit are cut from the document before text extraction, so
/// they are never decoded.
pub fn extract_pages(bytes: &[u8], max_pages: usize) -> Result<ExtractedText, ReadError> {
    // pdf-extract and lopdf panic on some malformed inputs instead of returning an error
    let (pages, pages_total) = panic::catch_unwind(AssertUnwindSafe(|| {
        let (bounded, pages_total) = first_pages(bytes, max_pages);
        let input = bounded.as_deref().unwrap_or(bytes);
        pdf_extract::extract_text_from_mem_by_pages(input).map(|pages| (pages, pages_total))
    }))
    .map_err(|_| ReadError::Unreadable("the PDF parser aborted on this file".to_string()))?
    .map_err(|e| ReadError::Unreadable(e.to_string()))?;

    let mut extracted = join_pages(&pages, max_pages);
    if let Some(total) = pages_total {
        extracted.pages_total = extracted.pages_total.max(total);
    }
    Ok(extracted)
}

/// The document trimmed to its first `max_pages` pages, plus the original
/// page count. The copy is `None` when no cut is needed or the document
/// cannot be rewritten (encrypted, unparseable); the original bytes are
/// read then.
fn first_pages(bytes: &[u8], max_pages: usize) -> (Option<Vec<u8>>, Option<usize>) {
    let Ok(mut doc) = lopdf::Document::load_mem(bytes) else {
        return (None, None);
    };
    let total = doc.get_pages().len();
    if total <= max_pages || doc.trailer.get(b"Encrypt").is_ok() {
        return (None, Some(total));
    }

    let beyond: Vec<u32> = (max_pages as u32 + 1..=total as u32).collect();
    doc.delete_pages(&beyond);
    doc.prune_objects();

    let mut out = Vec::new();
    match doc.save_to(&mut out) {
        Ok(()) => {
            debug!(total, kept = max_pages, "Cut document to the page limit");
            (Some(out), Some(total))
        }
        Err(e) => {
            debug!(error = %e, "Could not cut document, reading it whole");
            (None, Some(total))
        }
    }
}

pub fn join_pages(pages: &[String], max_pages: usize) -> ExtractedText {
    let processed = &pages[..pages.len().min(max_pages)];

    let kept: Vec<&str> = processed
        .iter()
        .map(String::as_str)
        .filter(|page| !page.trim().is_empty())
        .collect();

    ExtractedText {
        text: kept.join("\n\n").trim().to_string(),
        pages_total: pages.len(),
        pages_processed: processed.len(),
        pages_with_text: kept.len(),
    }
}
