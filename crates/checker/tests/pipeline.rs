mod common;

use std::sync::Mutex;

use anyhow::Result;
use checker::{Advisory, CheckerConfig, EvaluationError, EvaluationInput, Pipeline};
use extract::{FindingSupport, Oracle, OracleClient, OraclePrompt};
use ingest::{DocumentLocator, FallbackDirection, MediaKind};

const JUDGMENT: &str = r#"```json
{
  "finding_support": "yes",
  "evidence": "The excerpt states the effect was significant (p<.05).",
  "representation_verdict": "partly",
  "accuracy_score": 3,
  "issues": ["'huge' overstates a significance test"],
  "feedback_suggestion": "Significant is not the same as large.",
  "confidence": "medium"
}
```"#;

struct FakeOracle {
    reply: String,
    prompts: Mutex<Vec<OraclePrompt>>,
}

impl FakeOracle {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl Oracle for FakeOracle {
    fn name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, prompt: &OraclePrompt) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        Ok(self.reply.clone())
    }
}

struct DownOracle;

impl Oracle for DownOracle {
    fn name(&self) -> &str {
        "down"
    }

    async fn complete(&self, _prompt: &OraclePrompt) -> Result<String> {
        anyhow::bail!("connection refused")
    }
}

fn pipeline() -> Pipeline {
    Pipeline::new(CheckerConfig::default()).unwrap()
}

fn row(link: &str) -> String {
    format!(
        "The effect was significant (p<.05)\tSmith 2020\tp. 4\tStudent says it was huge\tnotes\t{}",
        link
    )
}

#[tokio::test]
async fn test_end_to_end_from_link() {
    let base = common::spawn_server().await;
    let oracle = FakeOracle::new(JUDGMENT);
    let input = EvaluationInput::from_row(row(&format!("{}/paper.pdf", base)));

    let evaluation = pipeline().evaluate(&input, Some(&oracle)).await.unwrap();

    assert_eq!(oracle.calls(), 1);
    assert_eq!(evaluation.oracle, "fake");
    assert_eq!(evaluation.judgment.finding_support, FindingSupport::Yes);
    assert_eq!(evaluation.judgment.accuracy_score, 3);

    let prepared = &evaluation.prepared;
    assert_eq!(prepared.document.kind, MediaKind::ConfirmedPdf);
    assert_eq!(prepared.document.pages_total, 2);
    assert_eq!(prepared.excerpt.header.as_deref(), Some("discussion"));
    assert!(prepared.excerpt.text.contains("Findings A and B."));
    assert!(!prepared.excerpt.text.contains("We conclude"));
    assert!(!prepared.excerpt.text.contains("reading speed"));
    assert!(prepared.advisories.is_empty());

    let prompts = oracle.prompts.lock().unwrap();
    assert!(prompts[0].user.contains("The effect was significant (p<.05)"));
    assert!(prompts[0].user.contains("Student says it was huge"));
    assert!(prompts[0].user.contains("Findings A and B."));
    assert!(prompts[0].user.contains("/paper.pdf"));
}

#[tokio::test]
async fn test_upload_used_without_link() {
    let oracle = FakeOracle::new(JUDGMENT);
    let input = EvaluationInput::from_row(row("see attached")).with_upload(common::paper());

    let evaluation = pipeline().evaluate(&input, Some(&oracle)).await.unwrap();

    assert_eq!(evaluation.prepared.locator, DocumentLocator::Upload);
    assert_eq!(evaluation.prepared.document.source, "uploaded PDF");
    assert!(oracle.prompts.lock().unwrap()[0].user.contains("uploaded PDF"));
}

#[tokio::test]
async fn test_no_header_falls_back_with_advisory() {
    let pdf = common::build_pdf(&[&["Methods", "Participants read texts."]]);
    let input = EvaluationInput::from_row(row("")).with_upload(pdf);

    let prepared = pipeline().prepare(&input).await.unwrap();

    assert_eq!(prepared.excerpt.fallback, Some(FallbackDirection::Prefix));
    assert!(prepared.excerpt.text.contains("Participants read texts."));
    assert!(prepared.advisories.contains(&Advisory::NoDiscussionHeader {
        fallback: FallbackDirection::Prefix
    }));
}

#[tokio::test]
async fn test_page_limit_advisory() {
    let pdf = common::build_pdf(&[&["Discussion", "Page one."], &["Page two."], &["Page three."]]);
    let mut config = CheckerConfig::default();
    config.reader.max_pages = 2;
    let pipeline = Pipeline::new(config).unwrap();

    let prepared = pipeline
        .prepare(&EvaluationInput::from_row(row("")).with_upload(pdf))
        .await
        .unwrap();

    assert!(prepared.excerpt.text.contains("Page two."));
    assert!(!prepared.excerpt.text.contains("Page three."));
    assert!(prepared.advisories.contains(&Advisory::PageLimitReached { processed: 2, total: 3 }));
}

#[tokio::test]
async fn test_missing_inputs_are_listed() {
    let oracle = FakeOracle::new(JUDGMENT);
    let input = EvaluationInput::from_row("Only a quote\t\t\t\t\t");

    let err = pipeline().evaluate(&input, Some(&oracle)).await.unwrap_err();

    match err {
        EvaluationError::MissingInput(missing) => {
            assert_eq!(missing.len(), 2);
            assert!(missing.iter().any(|m| m.contains("paraphrase")));
        }
        other => panic!("expected missing input, got {other:?}"),
    }
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn test_no_oracle_is_reported_first() {
    let input = EvaluationInput::from_row(row("http://127.0.0.1:9/never-fetched.pdf"));

    let err = pipeline()
        .evaluate::<OracleClient>(&input, None)
        .await
        .unwrap_err();

    assert!(matches!(err, EvaluationError::OracleUnavailable));
    assert!(err.remedy().contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn test_login_page_is_not_a_pdf() {
    let base = common::spawn_server().await;
    let oracle = FakeOracle::new(JUDGMENT);
    let input = EvaluationInput::from_row(row(&format!("{}/login", base)));

    let err = pipeline().evaluate(&input, Some(&oracle)).await.unwrap_err();

    assert_eq!(err.cause(), "html_page");
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn test_login_page_with_upload_reads_the_upload() {
    let base = common::spawn_server().await;
    let link = format!("{}/login", base);
    let oracle = FakeOracle::new(JUDGMENT);
    let input = EvaluationInput::from_row(row(&link)).with_upload(common::paper());

    let evaluation = pipeline().evaluate(&input, Some(&oracle)).await.unwrap();

    let prepared = &evaluation.prepared;
    assert_eq!(prepared.locator, DocumentLocator::Upload);
    assert_eq!(prepared.document.source, "uploaded PDF");
    assert!(prepared.excerpt.text.contains("Findings A and B."));
    assert!(prepared.advisories.iter().any(|a| matches!(
        a,
        Advisory::UploadUsedInstead { url, .. } if url == &link
    )));
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn test_scanned_pdf_is_unextractable() {
    let base = common::spawn_server().await;
    let input = EvaluationInput::from_row(row(&format!("{}/scanned.pdf", base)));

    let err = pipeline().prepare(&input).await.unwrap_err();

    assert!(matches!(err, EvaluationError::Unextractable));
}

#[tokio::test]
async fn test_garbled_judgment_keeps_raw_reply() {
    let oracle = FakeOracle::new("The paraphrase is mostly fine, I would say.");
    let input = EvaluationInput::from_row(row("")).with_upload(common::paper());

    let err = pipeline().evaluate(&input, Some(&oracle)).await.unwrap_err();

    assert_eq!(err.cause(), "oracle_contract");
    assert_eq!(err.raw_output(), Some("The paraphrase is mostly fine, I would say."));
}

#[tokio::test]
async fn test_oracle_transport_failure() {
    let input = EvaluationInput::from_row(row("")).with_upload(common::paper());

    let err = pipeline().evaluate(&input, Some(&DownOracle)).await.unwrap_err();

    assert_eq!(err.cause(), "oracle_transport");
    assert!(err.to_string().contains("connection refused"));
}
