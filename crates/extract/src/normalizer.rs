use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

use crate::schema::{Confidence, FindingSupport, JudgmentRecord, JudgmentResult, Representation};

static FIRST_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]+").expect("valid first word regex"));

/// Field names of the current record shape, with the older names as aliases.
#[derive(Deserialize)]
struct RawJudgment {
    #[serde(alias = "quote_is_discussion_finding")]
    finding_support: Option<Value>,
    evidence: Option<Value>,
    representation_verdict: Option<Value>,
    #[serde(alias = "student_summary_accuracy_1_to_5")]
    accuracy_score: Option<Value>,
    #[serde(alias = "summary_issues")]
    issues: Option<Value>,
    #[serde(alias = "suggested_professor_feedback")]
    feedback_suggestion: Option<Value>,
    confidence: Option<Value>,
}

/// Remove a surrounding markdown code fence (with or without a language tag).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the oracle's reply. Anything that is not a usable record comes back
/// as `ParseFailure` with the reply untouched.
pub fn parse_judgment(raw: &str) -> JudgmentResult {
    match parse_record(raw) {
        Ok(record) => JudgmentResult::Parsed { record },
        Err(reason) => {
            tracing::warn!(reason = %reason, chars = raw.len(), "Oracle reply is not a usable judgment");
            JudgmentResult::ParseFailure {
                reason,
                raw: raw.to_string(),
            }
        }
    }
}

fn parse_record(raw: &str) -> Result<JudgmentRecord, String> {
    let body = strip_code_fence(raw);

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        // Prose around the object: retry on the outermost braces
        Err(first_err) => outermost_object(body)
            .and_then(|inner| serde_json::from_str(inner).ok())
            .ok_or_else(|| format!("not valid JSON: {}", first_err))?,
    };

    if !value.is_object() {
        return Err("expected a JSON object".to_string());
    }

    let raw: RawJudgment =
        serde_json::from_value(value).map_err(|e| format!("unexpected record shape: {}", e))?;

    let finding_support = match word(raw.finding_support.as_ref()).as_deref() {
        Some("yes") | Some("true") => FindingSupport::Yes,
        Some("no") | Some("false") => FindingSupport::No,
        Some("uncertain") | Some("unsure") | Some("unknown") => FindingSupport::Uncertain,
        Some(other) => return Err(format!("unknown finding_support '{}'", other)),
        None => return Err("missing finding_support".to_string()),
    };

    let representation_verdict = match word(raw.representation_verdict.as_ref()).as_deref() {
        Some("yes") => Some(Representation::Yes),
        Some("partly") | Some("partial") | Some("partially") => Some(Representation::Partly),
        Some("no") => Some(Representation::No),
        Some(other) => return Err(format!("unknown representation_verdict '{}'", other)),
        None => None,
    };

    let accuracy_score = raw
        .accuracy_score
        .as_ref()
        .and_then(score)
        .ok_or_else(|| "missing or non-numeric accuracy_score".to_string())?;

    let confidence = match word(raw.confidence.as_ref()).as_deref() {
        Some("low") | None => Confidence::Low,
        Some("medium") | Some("moderate") => Confidence::Medium,
        Some("high") => Confidence::High,
        Some(other) => return Err(format!("unknown confidence '{}'", other)),
    };

    Ok(JudgmentRecord {
        finding_support,
        evidence: text(raw.evidence.as_ref()),
        representation_verdict,
        accuracy_score,
        issues: list(raw.issues.as_ref()),
        feedback_suggestion: text(raw.feedback_suggestion.as_ref()),
        confidence,
    })
}

fn outermost_object(body: &str) -> Option<&str> {
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

/// First alphabetic word of a string value, lowercased ("Yes." -> "yes").
fn word(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let lower = s.to_lowercase();
            FIRST_WORD.find(&lower).map(|m| m.as_str().to_string())
        }
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accuracy score clamped to 1..=5; accepts numbers and numeric strings.
fn score(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().split('/').next()?.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(1.0, 5.0) as u8)
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| text(Some(item)))
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}
