use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::row::ParsedRow;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s<>"]+"#).expect("valid url regex")
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\''];

/// Where a URL locator was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorSource {
    Override,
    ReferenceField,
    FreeText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentLocator {
    Url { url: String, source: LocatorSource },
    Upload,
}

impl DocumentLocator {
    pub fn url(&self) -> Option<&str> {
        match self {
            DocumentLocator::Url { url, .. } => Some(url),
            DocumentLocator::Upload => None,
        }
    }

    /// Label passed to the oracle as the document reference.
    pub fn label(&self) -> &str {
        match self {
            DocumentLocator::Url { url, .. } => url,
            DocumentLocator::Upload => "uploaded PDF",
        }
    }
}

pub fn looks_like_url(s: &str) -> bool {
    let s = s.trim().to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://")
}

/// First HTTP(S) URL token anywhere in free text.
pub fn find_first_url(text: &str) -> Option<String> {
    URL_PATTERN
        .find(text)
        .map(|m| trim_url_token(m.as_str()).to_string())
        .filter(|url| looks_like_url(url) && url.len() > "https://".len())
}

/// Drop trailing sentence punctuation and closing brackets that belong to the
/// surrounding text. Balanced brackets stay, e.g. `S0140-6736(20)30183-5`.
fn trim_url_token(token: &str) -> &str {
    let mut url = token;
    loop {
        let trimmed = url.trim_end_matches(TRAILING_PUNCTUATION);
        let trimmed = match trimmed.chars().last() {
            Some(')') if unbalanced(trimmed, '(', ')') => &trimmed[..trimmed.len() - 1],
            Some(']') if unbalanced(trimmed, '[', ']') => &trimmed[..trimmed.len() - 1],
            _ => trimmed,
        };
        if trimmed.len() == url.len() {
            return url;
        }
        url = trimmed;
    }
}

fn unbalanced(s: &str, open: char, close: char) -> bool {
    s.matches(close).count() > s.matches(open).count()
}

/// Pick the active locator: override, then the reference cell, then any URL
/// in the raw paste, then the upload.
pub fn resolve_locator(
    row: &ParsedRow,
    raw_paste: &str,
    url_override: Option<&str>,
    has_upload: bool,
) -> Option<DocumentLocator> {
    if let Some(url) = url_override.map(str::trim).filter(|u| looks_like_url(u)) {
        return Some(DocumentLocator::Url {
            url: url.to_string(),
            source: LocatorSource::Override,
        });
    }

    let reference = row.reference();
    if looks_like_url(reference) {
        return Some(DocumentLocator::Url {
            url: reference.trim().to_string(),
            source: LocatorSource::ReferenceField,
        });
    }

    if let Some(url) = find_first_url(raw_paste) {
        return Some(DocumentLocator::Url {
            url,
            source: LocatorSource::FreeText,
        });
    }

    has_upload.then_some(DocumentLocator::Upload)
}
