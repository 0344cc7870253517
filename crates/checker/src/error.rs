use ingest::{FetchError, ReadError};
use thiserror::Error;

/// Every way an evaluation can stop short of a judgment. Each one is shown to
/// the user with its cause and a remedy; none of them is retried.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Missing required input: {}", .0.join(", "))]
    MissingInput(Vec<String>),

    #[error("No judgment oracle is configured.")]
    OracleUnavailable,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Could not read the PDF: {0}")]
    Read(#[from] ReadError),

    #[error("No text could be extracted from the PDF.")]
    Unextractable,

    #[error("The oracle call failed: {0}")]
    OracleTransport(String),

    #[error("The oracle reply is not a usable judgment: {reason}")]
    OracleContract { reason: String, raw: String },
}

impl EvaluationError {
    /// Stable machine-readable cause.
    pub fn cause(&self) -> &'static str {
        match self {
            EvaluationError::MissingInput(_) => "missing_input",
            EvaluationError::OracleUnavailable => "oracle_unavailable",
            EvaluationError::Fetch(FetchError::InvalidUrl(_)) => "invalid_url",
            EvaluationError::Fetch(FetchError::Transport(_)) => "transport",
            EvaluationError::Fetch(FetchError::HtmlPage) => "html_page",
            EvaluationError::Fetch(FetchError::UnexpectedContentType(_)) => "not_pdf",
            EvaluationError::Fetch(FetchError::TooLarge { .. }) => "too_large",
            EvaluationError::Read(_) => "unreadable",
            EvaluationError::Unextractable => "unextractable",
            EvaluationError::OracleTransport(_) => "oracle_transport",
            EvaluationError::OracleContract { .. } => "oracle_contract",
        }
    }

    pub fn remedy(&self) -> &'static str {
        match self {
            EvaluationError::MissingInput(_) => {
                "Paste the full row (quote in cell 1, paraphrase in cell 4) and give a PDF link in cell 6 or upload the PDF."
            }
            EvaluationError::OracleUnavailable => {
                "Set OPENAI_API_KEY, or choose the ollama provider with DISCUSSION_CHECK_ORACLE_PROVIDER=ollama."
            }
            EvaluationError::Fetch(FetchError::InvalidUrl(_)) => {
                "Check the link in cell 6; it must start with http:// or https://."
            }
            EvaluationError::Fetch(FetchError::Transport(_)) => {
                "Check that the link is reachable and public, or upload the PDF; an upload is read whenever the link fails."
            }
            EvaluationError::Fetch(FetchError::HtmlPage) => {
                "Use a direct download link, or upload the PDF; an upload is read whenever the link fails."
            }
            EvaluationError::Fetch(FetchError::UnexpectedContentType(_)) => {
                "Make sure the link points at the PDF itself, or upload the PDF; an upload is read whenever the link fails."
            }
            EvaluationError::Fetch(FetchError::TooLarge { .. }) => {
                "Upload a smaller copy of the paper, or raise fetch.max_bytes in the config file."
            }
            EvaluationError::Read(_) => "The file may be damaged or not a real PDF. Try another copy of the paper.",
            EvaluationError::Unextractable => {
                "The PDF appears to be scanned images. Use a text-based PDF or run OCR on it first."
            }
            EvaluationError::OracleTransport(_) => {
                "Check the oracle service and credentials, then run the evaluation again."
            }
            EvaluationError::OracleContract { .. } => {
                "Review the raw reply below, or run the evaluation again."
            }
        }
    }

    /// Unparsed oracle reply, kept for display.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            EvaluationError::OracleContract { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
