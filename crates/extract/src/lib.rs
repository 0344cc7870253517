pub mod llm;
pub mod normalizer;
pub mod openai;
pub mod prompt;
pub mod schema;

pub use llm::{OllamaClient, Oracle};
pub use normalizer::{parse_judgment, strip_code_fence};
pub use openai::OpenAiClient;
pub use prompt::{bound_excerpt, build_verification_prompt, OraclePrompt};
pub use schema::{
    Confidence, FindingSupport, JudgmentRecord, JudgmentResult, Representation, VerificationRequest,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub provider: Provider,
    pub model: String,
    /// Provider default when unset
    pub base_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Oracle-facing excerpt cap, separate from the extraction cap
    pub max_excerpt_chars: usize,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            max_excerpt_chars: 12_000,
            temperature: 0.2,
            timeout_secs: 120,
        }
    }
}

/// The configured oracle, chosen at startup and passed down explicitly.
#[derive(Clone)]
pub enum OracleClient {
    OpenAi(OpenAiClient),
    Ollama(OllamaClient),
}

impl OracleClient {
    /// `Ok(None)` means no oracle is configured (e.g. no API key), which
    /// callers report rather than treat as a crash.
    pub fn from_config(config: &OracleConfig) -> Result<Option<Self>> {
        let timeout = Duration::from_secs(config.timeout_secs);

        match config.provider {
            Provider::OpenAi => {
                let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
                    return Ok(None);
                };
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
                let client = OpenAiClient::new(
                    base_url,
                    config.model.clone(),
                    api_key,
                    config.temperature,
                    timeout,
                )?;
                Ok(Some(OracleClient::OpenAi(client)))
            }
            Provider::Ollama => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());
                let client = OllamaClient::new(base_url, config.model.clone(), config.temperature, timeout)?;
                Ok(Some(OracleClient::Ollama(client)))
            }
        }
    }
}

impl Oracle for OracleClient {
    fn name(&self) -> &str {
        match self {
            OracleClient::OpenAi(client) => client.name(),
            OracleClient::Ollama(client) => client.name(),
        }
    }

    async fn complete(&self, prompt: &OraclePrompt) -> Result<String> {
        match self {
            OracleClient::OpenAi(client) => client.complete(prompt).await,
            OracleClient::Ollama(client) => client.complete(prompt).await,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    pub result: JudgmentResult,
    pub oracle: String,
    /// The excerpt was cut to the oracle-facing limit
    pub excerpt_truncated: bool,
    pub excerpt_chars_sent: usize,
}

pub struct Verifier<'a, O: Oracle> {
    oracle: &'a O,
    max_excerpt_chars: usize,
}

impl<'a, O: Oracle> Verifier<'a, O> {
    pub fn new(oracle: &'a O, max_excerpt_chars: usize) -> Self {
        Self {
            oracle,
            max_excerpt_chars,
        }
    }

    /// Ask the oracle once and normalise its reply.
    ///
    /// Transport failures are errors; an unusable reply is a
    /// `JudgmentResult::ParseFailure` carrying the raw text.
    pub async fn verify(&self, request: &VerificationRequest) -> Result<Verification> {
        let (prompt, excerpt_truncated) = build_verification_prompt(request, self.max_excerpt_chars);
        let excerpt_chars_sent = bound_excerpt(request.excerpt.trim(), self.max_excerpt_chars)
            .0
            .chars()
            .count();

        tracing::info!(
            oracle = self.oracle.name(),
            excerpt_chars = excerpt_chars_sent,
            excerpt_truncated,
            "Requesting judgment"
        );

        let reply = self.oracle.complete(&prompt).await?;
        let result = parse_judgment(&reply);

        Ok(Verification {
            result,
            oracle: self.oracle.name().to_string(),
            excerpt_truncated,
            excerpt_chars_sent,
        })
    }
}
