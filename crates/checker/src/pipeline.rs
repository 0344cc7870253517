//! One evaluation, end to end: row -> locator -> document -> text ->
//! Discussion excerpt -> judgment. Each step runs once; the first failure
//! ends the evaluation.

use extract::{JudgmentRecord, JudgmentResult, Oracle, VerificationRequest, Verifier};
use ingest::{
    parse_row, read_discussion, resolve_locator, DiscussionExcerpt, DocumentLocator, Fetcher,
    LocatorSource, MediaKind, PdfReader, RawDocument, SectionLocator,
};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::advisory::Advisory;
use crate::config::CheckerConfig;
use crate::error::EvaluationError;

/// What the user handed in: the pasted row, an optional link typed
/// separately, and optional uploaded PDF bytes.
#[derive(Debug, Clone, Default)]
pub struct EvaluationInput {
    pub row: String,
    pub url_override: Option<String>,
    pub upload: Option<Vec<u8>>,
}

impl EvaluationInput {
    pub fn from_row(row: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url_override = Some(url.into());
        self
    }

    pub fn with_upload(mut self, bytes: Vec<u8>) -> Self {
        self.upload = Some(bytes);
        self
    }
}

/// Parsed cells and the resolved locator, without touching the network.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub fields: Vec<String>,
    pub quote: String,
    pub paraphrase: String,
    pub reference: String,
    pub locator: Option<DocumentLocator>,
    /// Required inputs that are absent; evaluation refuses to start while
    /// this is non-empty
    pub missing: Vec<String>,
    pub advisories: Vec<Advisory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub source: String,
    pub kind: MediaKind,
    pub content_type: Option<String>,
    pub bytes: usize,
    pub digest: String,
    pub pages_total: usize,
    pub pages_processed: usize,
}

/// Everything up to, but not including, the oracle call.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedEvaluation {
    pub evaluation_id: Uuid,
    pub quote: String,
    pub paraphrase: String,
    pub locator: DocumentLocator,
    pub document: DocumentSummary,
    pub excerpt: DiscussionExcerpt,
    pub advisories: Vec<Advisory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    #[serde(flatten)]
    pub prepared: PreparedEvaluation,
    pub oracle: String,
    pub judgment: JudgmentRecord,
}

pub struct Pipeline {
    config: CheckerConfig,
    fetcher: Fetcher,
    reader: PdfReader,
    locator: SectionLocator,
}

impl Pipeline {
    pub fn new(config: CheckerConfig) -> anyhow::Result<Self> {
        let fetcher = Fetcher::new(config.fetch.clone())?;
        let reader = PdfReader::new(config.reader.clone());
        let locator = SectionLocator::new(config.section.clone())?;

        Ok(Self {
            config,
            fetcher,
            reader,
            locator,
        })
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Parse the row and resolve the locator. No network access.
    pub fn preview(&self, input: &EvaluationInput) -> Preview {
        let row = parse_row(&input.row);
        let locator = resolve_locator(
            &row,
            &input.row,
            input.url_override.as_deref(),
            input.upload.is_some(),
        );

        let mut missing = Vec::new();
        if row.quote().is_empty() {
            missing.push("quote (cell 1)".to_string());
        }
        if row.paraphrase().is_empty() {
            missing.push("student paraphrase (cell 4)".to_string());
        }
        if locator.is_none() {
            missing.push("PDF link (cell 6) or uploaded PDF".to_string());
        }

        let mut advisories: Vec<Advisory> = row.notes.iter().cloned().map(Advisory::from).collect();
        if let Some(DocumentLocator::Url { url, source: LocatorSource::FreeText }) = &locator {
            advisories.push(Advisory::UrlFromFreeText { url: url.clone() });
        }

        Preview {
            fields: row.fields().to_vec(),
            quote: row.quote().to_string(),
            paraphrase: row.paraphrase().to_string(),
            reference: row.reference().to_string(),
            locator,
            missing,
            advisories,
        }
    }

    /// Run every step before the oracle: fetch or take the upload, extract
    /// text and locate the Discussion section.
    pub async fn prepare(&self, input: &EvaluationInput) -> Result<PreparedEvaluation, EvaluationError> {
        let evaluation_id = Uuid::new_v4();
        let span = info_span!("evaluation", %evaluation_id);

        self.prepare_with_id(input, evaluation_id).instrument(span).await
    }

    /// Full evaluation. `oracle` is `None` when none is configured, which is
    /// reported before any download happens.
    pub async fn evaluate<O: Oracle>(
        &self,
        input: &EvaluationInput,
        oracle: Option<&O>,
    ) -> Result<Evaluation, EvaluationError> {
        let evaluation_id = Uuid::new_v4();
        let span = info_span!("evaluation", %evaluation_id);

        async move {
            let preview = self.preview(input);
            if !preview.missing.is_empty() {
                return Err(EvaluationError::MissingInput(preview.missing));
            }
            let Some(oracle) = oracle else {
                warn!("No oracle configured");
                return Err(EvaluationError::OracleUnavailable);
            };

            let mut prepared = self.prepare_with_id(input, evaluation_id).await?;

            let request = VerificationRequest {
                quote: prepared.quote.clone(),
                paraphrase: prepared.paraphrase.clone(),
                excerpt: prepared.excerpt.text.clone(),
                reference: prepared.locator.label().to_string(),
            };

            let verification = Verifier::new(oracle, self.config.oracle.max_excerpt_chars)
                .verify(&request)
                .await
                .map_err(|e| EvaluationError::OracleTransport(format!("{:#}", e)))?;

            if verification.excerpt_truncated {
                prepared.advisories.push(Advisory::OracleExcerptTruncated {
                    chars_sent: verification.excerpt_chars_sent,
                });
            }

            let judgment = match verification.result {
                JudgmentResult::Parsed { record } => record,
                JudgmentResult::ParseFailure { reason, raw } => {
                    return Err(EvaluationError::OracleContract { reason, raw });
                }
            };

            info!(
                finding_support = %judgment.finding_support,
                accuracy_score = judgment.accuracy_score,
                confidence = %judgment.confidence,
                "Evaluation complete"
            );

            Ok(Evaluation {
                prepared,
                oracle: verification.oracle,
                judgment,
            })
        }
        .instrument(span)
        .await
    }

    async fn prepare_with_id(
        &self,
        input: &EvaluationInput,
        evaluation_id: Uuid,
    ) -> Result<PreparedEvaluation, EvaluationError> {
        let preview = self.preview(input);
        if !preview.missing.is_empty() {
            return Err(EvaluationError::MissingInput(preview.missing));
        }
        let Preview {
            quote,
            paraphrase,
            locator,
            mut advisories,
            ..
        } = preview;
        let Some(locator) = locator else {
            return Err(EvaluationError::MissingInput(vec![
                "PDF link (cell 6) or uploaded PDF".to_string(),
            ]));
        };

        let (locator, document) = match locator {
            DocumentLocator::Url { url, source } => match self.fetcher.fetch(&url).await {
                Ok(fetched) => {
                    if fetched.rewritten {
                        advisories.push(Advisory::ShareLinkRewritten {
                            url: fetched.requested_url.clone(),
                        });
                    }
                    (DocumentLocator::Url { url, source }, fetched.document)
                }
                // A link that yields no PDF falls back to the uploaded copy
                Err(e) => match &input.upload {
                    Some(bytes) => {
                        warn!(url = %url, error = %e, "Link unusable, reading the uploaded PDF");
                        advisories.push(Advisory::UploadUsedInstead {
                            url,
                            reason: e.to_string(),
                        });
                        (DocumentLocator::Upload, RawDocument::from_upload(bytes.clone()))
                    }
                    None => return Err(e.into()),
                },
            },
            DocumentLocator::Upload => {
                let bytes = input.upload.clone().unwrap_or_default();
                (DocumentLocator::Upload, RawDocument::from_upload(bytes))
            }
        };

        if document.kind == MediaKind::ClaimedPdf {
            advisories.push(Advisory::ClaimedPdf {
                content_type: document.content_type.clone(),
            });
        }

        let (extracted, excerpt) = read_discussion(&self.reader, &self.locator, &document).await?;
        if extracted.is_empty() {
            warn!(digest = %document.digest, "PDF has no extractable text");
            return Err(EvaluationError::Unextractable);
        }

        if extracted.page_limit_reached() {
            advisories.push(Advisory::PageLimitReached {
                processed: extracted.pages_processed,
                total: extracted.pages_total,
            });
        }
        if let Some(fallback) = excerpt.fallback {
            advisories.push(Advisory::NoDiscussionHeader { fallback });
        }
        if excerpt.truncated {
            advisories.push(Advisory::ExcerptTruncated);
        }

        Ok(PreparedEvaluation {
            evaluation_id,
            quote,
            paraphrase,
            locator,
            document: DocumentSummary {
                source: document.source.clone(),
                kind: document.kind,
                content_type: document.content_type.clone(),
                bytes: document.len(),
                digest: document.digest.clone(),
                pages_total: extracted.pages_total,
                pages_processed: extracted.pages_processed,
            },
            excerpt,
            advisories,
        })
    }
}
