//! Document download with content validation.
//!
//! File shares often answer a document link with a login or preview page and
//! a 200 status, so the body is classified before anything downstream trusts
//! it: signature first, then the declared content type, then an HTML sniff.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::document::{has_pdf_signature, MediaKind, RawDocument};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// How many leading bytes are inspected for an HTML opener
    pub html_sniff_bytes: usize,
    pub rewrite_share_links: bool,
    /// Host substrings whose links get a `download=1` query parameter
    pub share_hosts: Vec<String>,
    /// Downloads larger than this are abandoned
    pub max_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            user_agent: "Mozilla/5.0 (compatible; DiscussionChecker/0.1)".to_string(),
            html_sniff_bytes: 300,
            rewrite_share_links: true,
            share_hosts: vec!["sharepoint.com".to_string(), "onedrive.live.com".to_string()],
            max_bytes: 30 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Not a usable http(s) URL: {0}")]
    InvalidUrl(String),

    #[error("Could not download the document: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("The link returned an HTML page (likely a login or preview page), not a downloadable PDF.")]
    HtmlPage,

    #[error("Link did not return a PDF (Content-Type: {0}).")]
    UnexpectedContentType(String),

    #[error("The document is larger than the {limit} byte download limit.")]
    TooLarge { limit: usize },
}

#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub document: RawDocument,
    pub requested_url: String,
    /// Set when a share link was rewritten to a direct download
    pub rewritten: bool,
}

#[derive(Clone)]
pub struct Fetcher {
    config: FetchConfig,
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Download `url` and make sure the body is a PDF.
    pub async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let parsed = parse_http_url(url)?;

        let (target, rewritten) = if self.config.rewrite_share_links {
            match rewrite_share_link(&parsed, &self.config.share_hosts) {
                Some(direct) => {
                    debug!(from = %parsed, to = %direct, "Rewrote share link to direct download");
                    (direct, true)
                }
                None => (parsed, false),
            }
        } else {
            (parsed, false)
        };

        let response = self
            .client
            .get(target.as_str())
            .send()
            .await?
            .error_for_status()?;

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = self.read_body(response).await?;

        let kind = classify_payload(&bytes, content_type.as_deref(), self.config.html_sniff_bytes)
            .inspect_err(|e| {
                warn!(url = %target, content_type = ?content_type, bytes = bytes.len(), error = %e, "Rejected download");
            })?;

        let document = RawDocument::new(bytes, kind, final_url, content_type);
        info!(
            url = %document.source,
            bytes = document.len(),
            kind = ?document.kind,
            digest = %document.digest,
            "Downloaded document"
        );

        Ok(FetchedDocument {
            document,
            requested_url: url.trim().to_string(),
            rewritten,
        })
    }
}

impl Fetcher {
    /// Read the body in chunks, giving up once it passes `max_bytes`.
    async fn read_body(&self, mut response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let limit = self.config.max_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(FetchError::TooLarge { limit });
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

fn parse_http_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url.trim()).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(FetchError::InvalidUrl(url.to_string())),
    }
}

/// Decide whether a response body may proceed to extraction.
pub fn classify_payload(
    bytes: &[u8],
    content_type: Option<&str>,
    sniff_bytes: usize,
) -> Result<MediaKind, FetchError> {
    if has_pdf_signature(bytes) {
        return Ok(MediaKind::ConfirmedPdf);
    }

    let ct = content_type.unwrap_or("").to_ascii_lowercase();
    if ct.contains("pdf") {
        return Ok(MediaKind::ClaimedPdf);
    }

    if looks_like_html(bytes, sniff_bytes) {
        return Err(FetchError::HtmlPage);
    }

    let shown = if ct.trim().is_empty() {
        "unknown".to_string()
    } else {
        ct.trim().to_string()
    };
    Err(FetchError::UnexpectedContentType(shown))
}

pub fn looks_like_html(bytes: &[u8], sniff_bytes: usize) -> bool {
    let snippet = bytes[..bytes.len().min(sniff_bytes)].to_ascii_lowercase();
    [b"<!doctype html".as_slice(), b"<html".as_slice()]
        .iter()
        .any(|needle| snippet.windows(needle.len()).any(|w| w == *needle))
}

/// Add `download=1` to links on known file-share hosts.
///
/// Returns `None` when the host is not listed or the parameter is already there.
pub fn rewrite_share_link(url: &Url, share_hosts: &[String]) -> Option<Url> {
    let host = url.host_str()?.to_ascii_lowercase();
    if !share_hosts
        .iter()
        .any(|h| host.contains(&h.to_ascii_lowercase()))
    {
        return None;
    }

    if url.query_pairs().any(|(key, _)| key == "download") {
        return None;
    }

    let mut direct = url.clone();
    direct.query_pairs_mut().append_pair("download", "1");
    Some(direct)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<String> {
        FetchConfig::default().share_hosts
    }

    #[test]
    fn test_signature_beats_content_type() {
        let kind = classify_payload(b"%PDF-1.7\n...", Some("text/html"), 300).unwrap();
        assert_eq!(kind, MediaKind::ConfirmedPdf);
    }

    #[test]
    fn test_declared_pdf_is_trusted() {
        let kind = classify_payload(b"\x00\x01garbage", Some("application/PDF; charset=binary"), 300).unwrap();
        assert_eq!(kind, MediaKind::ClaimedPdf);
    }

    #[test]
    fn test_html_page_is_distinct_cause() {
        let body = b"  <!DOCTYPE html><html><head><title>Sign in</title></head></html>";
        let err = classify_payload(body, Some("text/html; charset=utf-8"), 300).unwrap_err();
        assert!(matches!(err, FetchError::HtmlPage));

        let err = classify_payload(b"<HTML><body>preview</body></HTML>", None, 300).unwrap_err();
        assert!(matches!(err, FetchError::HtmlPage));
    }

    #[test]
    fn test_html_beyond_sniff_window_is_generic() {
        let mut body = vec![b' '; 400];
        body.extend_from_slice(b"<html>");
        let err = classify_payload(&body, Some("text/plain"), 300).unwrap_err();
        match err {
            FetchError::UnexpectedContentType(ct) => assert_eq!(ct, "text/plain"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_content_type_is_named() {
        let err = classify_payload(b"{\"a\":1}", None, 300).unwrap_err();
        assert_eq!(err.to_string(), "Link did not return a PDF (Content-Type: unknown).");
    }

    #[test]
    fn test_share_link_rewrite() {
        let url = Url::parse("https://uni.sharepoint.com/:b:/s/course/paper.pdf?e=abc").unwrap();
        let direct = rewrite_share_link(&url, &hosts()).unwrap();
        assert_eq!(
            direct.as_str(),
            "https://uni.sharepoint.com/:b:/s/course/paper.pdf?e=abc&download=1"
        );

        // Idempotent
        assert!(rewrite_share_link(&direct, &hosts()).is_none());
    }

    #[test]
    fn test_other_hosts_untouched() {
        let url = Url::parse("https://example.org/paper.pdf").unwrap();
        assert!(rewrite_share_link(&url, &hosts()).is_none());
    }

    #[test]
    fn test_invalid_urls_rejected() {
        assert!(matches!(parse_http_url("not a url"), Err(FetchError::InvalidUrl(_))));
        assert!(matches!(parse_http_url("ftp://x.org/a.pdf"), Err(FetchError::InvalidUrl(_))));
        assert!(parse_http_url(" https://x.org/a.pdf ").is_ok());
    }
}
