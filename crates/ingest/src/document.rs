use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How we know a payload is a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// `%PDF` signature at offset 0
    ConfirmedPdf,
    /// Declared as PDF (content type or upload) without the signature
    ClaimedPdf,
}

#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub kind: MediaKind,
    /// URL the bytes came from, or "uploaded PDF"
    pub source: String,
    pub content_type: Option<String>,
    pub digest: String,
}

impl RawDocument {
    pub fn new(
        bytes: Vec<u8>,
        kind: MediaKind,
        source: String,
        content_type: Option<String>,
    ) -> Self {
        let digest = Self::generate_digest(&bytes);

        Self {
            bytes,
            kind,
            source,
            content_type,
            digest,
        }
    }

    /// Uploaded bytes are trusted as a PDF; the signature only decides which kind.
    pub fn from_upload(bytes: Vec<u8>) -> Self {
        let kind = if has_pdf_signature(&bytes) {
            MediaKind::ConfirmedPdf
        } else {
            MediaKind::ClaimedPdf
        };
        Self::new(bytes, kind, "uploaded PDF".to_string(), None)
    }

    fn generate_digest(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub fn has_pdf_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Plain text of the first pages of a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Non-blank pages joined by a blank line, trimmed. May be empty.
    pub text: String,
    pub pages_total: usize,
    pub pages_processed: usize,
    pub pages_with_text: usize,
}

impl ExtractedText {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn page_limit_reached(&self) -> bool {
        self.pages_processed < self.pages_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_kind_follows_signature() {
        let signed = RawDocument::from_upload(b"%PDF-1.4\n...".to_vec());
        assert_eq!(signed.kind, MediaKind::ConfirmedPdf);
        assert_eq!(signed.source, "uploaded PDF");

        let unsigned = RawDocument::from_upload(b"not really a pdf".to_vec());
        assert_eq!(unsigned.kind, MediaKind::ClaimedPdf);
    }

    #[test]
    fn test_digest_is_stable() {
        let a = RawDocument::from_upload(b"%PDF-1.7".to_vec());
        let b = RawDocument::from_upload(b"%PDF-1.7".to_vec());
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.digest.len(), 16);
    }
}
