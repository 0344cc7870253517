use ingest::{FallbackDirection, RowNote};
use serde::Serialize;
use std::fmt;

/// Non-fatal observations surfaced next to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    UrlFromFreeText { url: String },
    ShareLinkRewritten { url: String },
    UploadUsedInstead { url: String, reason: String },
    ClaimedPdf { content_type: Option<String> },
    PageLimitReached { processed: usize, total: usize },
    NoDiscussionHeader { fallback: FallbackDirection },
    ExcerptTruncated,
    OracleExcerptTruncated { chars_sent: usize },
    /// Row parsing notes carry their own `kind` tag
    #[serde(untagged)]
    Row(RowNote),
}

impl From<RowNote> for Advisory {
    fn from(note: RowNote) -> Self {
        Advisory::Row(note)
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::Row(note) => note.fmt(f),
            Advisory::UrlFromFreeText { url } => {
                write!(f, "Cell 6 had no link; using the first URL found in the paste: {}", url)
            }
            Advisory::ShareLinkRewritten { url } => {
                write!(f, "Share link rewritten to a direct download: {}", url)
            }
            Advisory::UploadUsedInstead { url, reason } => write!(
                f,
                "The link {} could not be used ({}); the uploaded PDF was read instead.",
                url, reason
            ),
            Advisory::ClaimedPdf { content_type } => write!(
                f,
                "The file has no PDF signature; trusting the declared type ({}).",
                content_type.as_deref().unwrap_or("upload")
            ),
            Advisory::PageLimitReached { processed, total } => write!(
                f,
                "Only the first {} of {} pages were read; a Discussion section further in is not seen.",
                processed, total
            ),
            Advisory::NoDiscussionHeader { fallback } => {
                let side = match fallback {
                    FallbackDirection::Prefix => "beginning",
                    FallbackDirection::Suffix => "end",
                };
                write!(
                    f,
                    "No Discussion heading was found; the excerpt is the {} of the document text.",
                    side
                )
            }
            Advisory::ExcerptTruncated => write!(f, "The Discussion excerpt was cut to the configured length."),
            Advisory::OracleExcerptTruncated { chars_sent } => {
                write!(f, "Only the first {} characters of the excerpt were sent for judgment.", chars_sent)
            }
        }
    }
}
