//! Plain-text rendering for terminal output.

use checker::{Advisory, Evaluation, EvaluationError, PreparedEvaluation, Preview};
use ingest::DocumentLocator;
use std::fmt::Write;

const FIELD_NAMES: [&str; 6] = [
    "Quote",
    "Cell 2",
    "Cell 3",
    "Student paraphrase",
    "Cell 5",
    "Reference",
];

pub fn preview(preview: &Preview) -> String {
    let mut out = String::new();

    for (name, value) in FIELD_NAMES.iter().zip(&preview.fields) {
        let _ = writeln!(out, "{:<20} {}", format!("{}:", name), value);
    }
    let _ = writeln!(out, "{:<20} {}", "Document:", locator(preview.locator.as_ref()));

    if !preview.missing.is_empty() {
        let _ = writeln!(out, "\nMissing: {}", preview.missing.join(", "));
    }
    advisories(&mut out, &preview.advisories);
    out
}

pub fn prepared(prepared: &PreparedEvaluation) -> String {
    let mut out = String::new();
    let document = &prepared.document;

    let _ = writeln!(out, "Evaluation {}", prepared.evaluation_id);
    let _ = writeln!(
        out,
        "Document: {} ({} bytes, {} of {} pages read, digest {})",
        document.source, document.bytes, document.pages_processed, document.pages_total, document.digest
    );

    let heading = match (&prepared.excerpt.header, &prepared.excerpt.stop) {
        (Some(header), Some(stop)) => format!("'{}' up to '{}'", header, stop),
        (Some(header), None) => format!("'{}' to end of text", header),
        (None, _) => "no heading found, fallback excerpt".to_string(),
    };
    let _ = writeln!(
        out,
        "Excerpt: {}, {} chars\n",
        heading,
        prepared.excerpt.text.chars().count()
    );
    let _ = writeln!(out, "{}", prepared.excerpt.text);

    advisories(&mut out, &prepared.advisories);
    out
}

pub fn evaluation(evaluation: &Evaluation) -> String {
    let mut out = String::new();
    let judgment = &evaluation.judgment;

    let _ = writeln!(out, "Evaluation {}", evaluation.prepared.evaluation_id);
    let _ = writeln!(out, "Document: {}", evaluation.prepared.document.source);
    let _ = writeln!(out, "Oracle: {}\n", evaluation.oracle);

    let _ = writeln!(out, "Quote is a Discussion finding: {}", judgment.finding_support);
    if !judgment.evidence.is_empty() {
        let _ = writeln!(out, "  Evidence: {}", judgment.evidence);
    }
    if let Some(verdict) = judgment.representation_verdict {
        let _ = writeln!(out, "Paraphrase represents the quote: {}", verdict);
    }
    let _ = writeln!(out, "Paraphrase accuracy: {}/5", judgment.accuracy_score);
    for issue in &judgment.issues {
        let _ = writeln!(out, "  - {}", issue);
    }
    if !judgment.feedback_suggestion.is_empty() {
        let _ = writeln!(out, "Suggested feedback: {}", judgment.feedback_suggestion);
    }
    let _ = writeln!(out, "Confidence: {}", judgment.confidence);

    advisories(&mut out, &evaluation.prepared.advisories);
    out
}

pub fn failure(err: &EvaluationError) -> String {
    let mut out = format!("error: {}\n  cause: {}\n  remedy: {}\n", err, err.cause(), err.remedy());
    if let Some(raw) = err.raw_output() {
        let _ = writeln!(out, "\nRaw oracle reply:\n{}", raw);
    }
    out
}

fn locator(locator: Option<&DocumentLocator>) -> String {
    match locator {
        Some(locator) => locator.label().to_string(),
        None => "(none)".to_string(),
    }
}

fn advisories(out: &mut String, advisories: &[Advisory]) {
    if advisories.is_empty() {
        return;
    }
    let _ = writeln!(out, "\nNotes:");
    for advisory in advisories {
        let _ = writeln!(out, "  * {}", advisory);
    }
}
