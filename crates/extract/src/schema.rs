use serde::{Deserialize, Serialize};
use std::fmt;

/// Is the quote a finding presented in the Discussion section?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSupport {
    Yes,
    No,
    Uncertain,
}

/// Does the paraphrase fairly represent the quote?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    Yes,
    Partly,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentRecord {
    pub finding_support: FindingSupport,
    pub evidence: String,
    pub representation_verdict: Option<Representation>,
    /// 1 (poor) to 5 (excellent)
    pub accuracy_score: u8,
    pub issues: Vec<String>,
    pub feedback_suggestion: String,
    pub confidence: Confidence,
}

/// What came back from the oracle: a record, or the raw text it sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JudgmentResult {
    Parsed { record: JudgmentRecord },
    ParseFailure { reason: String, raw: String },
}

impl JudgmentResult {
    pub fn record(&self) -> Option<&JudgmentRecord> {
        match self {
            JudgmentResult::Parsed { record } => Some(record),
            JudgmentResult::ParseFailure { .. } => None,
        }
    }
}

/// Inputs for one judgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub quote: String,
    pub paraphrase: String,
    pub excerpt: String,
    /// URL or "uploaded PDF"
    pub reference: String,
}

impl fmt::Display for FindingSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingSupport::Yes => write!(f, "yes"),
            FindingSupport::No => write!(f, "no"),
            FindingSupport::Uncertain => write!(f, "uncertain"),
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Representation::Yes => write!(f, "yes"),
            Representation::Partly => write!(f, "partly"),
            Representation::No => write!(f, "no"),
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}
