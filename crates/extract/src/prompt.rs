use crate::schema::VerificationRequest;

/// A system instruction plus the user message for one oracle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OraclePrompt {
    pub system: String,
    pub user: String,
}

impl OraclePrompt {
    /// Single-string form for completion endpoints without chat roles.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

pub const SYSTEM_PROMPT: &str = "You are a careful academic grader. \
You ONLY use the provided discussion section excerpt (or lack of it), the quote and the student paraphrase. \
If the evidence is insufficient, answer 'uncertain' rather than guessing. \
Reply with a single JSON object and nothing else.";

const NO_EXCERPT: &str = "[No discussion section text was available.]";

/// Cap the excerpt at `max_chars` characters. Returns the bounded text and
/// whether anything was cut.
pub fn bound_excerpt(excerpt: &str, max_chars: usize) -> (&str, bool) {
    match excerpt.char_indices().nth(max_chars) {
        Some((idx, _)) => (&excerpt[..idx], true),
        None => (excerpt, false),
    }
}

pub fn build_verification_prompt(request: &VerificationRequest, max_excerpt_chars: usize) -> (OraclePrompt, bool) {
    let (excerpt, truncated) = bound_excerpt(request.excerpt.trim(), max_excerpt_chars);
    let excerpt = if excerpt.is_empty() { NO_EXCERPT } else { excerpt };

    let user = format!(
        r#"TASKS
1) Decide whether the QUOTE is actually a finding or claim presented in the DISCUSSION section of the article.
   - finding_support: yes / no / uncertain
   - evidence: point to matching language in the excerpt, or explain why it is not supported.

2) Decide whether the STUDENT PARAPHRASE is a fair representation of the QUOTE.
   - representation_verdict: yes / partly / no
   - accuracy_score: 1 (poor) to 5 (excellent)
   - issues: distortions, additions or missing nuances, one short item each.

INPUTS
Document reference: {}

QUOTE:
{}

STUDENT PARAPHRASE:
{}

DISCUSSION SECTION EXCERPT (best effort, may be incomplete):
{}

OUTPUT FORMAT (STRICT JSON, no markdown, no commentary)
{{
  "finding_support": "yes|no|uncertain",
  "evidence": "short evidence or reason",
  "representation_verdict": "yes|partly|no",
  "accuracy_score": 1,
  "issues": ["..."],
  "feedback_suggestion": "short feedback a professor could give the student",
  "confidence": "low|medium|high"
}}"#,
        request.reference, request.quote, request.paraphrase, excerpt
    );

    (
        OraclePrompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
        },
        truncated,
    )
}
