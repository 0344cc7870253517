use anyhow::{Context, Result};
use extract::{OracleConfig, Provider};
use ingest::{FallbackDirection, FetchConfig, ReaderConfig, SectionConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Environment variable naming a JSON config file.
pub const CONFIG_PATH_VAR: &str = "DISCUSSION_CHECK_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub fetch: FetchConfig,
    pub reader: ReaderConfig,
    pub section: SectionConfig,
    pub oracle: OracleConfig,
}

impl CheckerConfig {
    /// Defaults, then the JSON file (explicit path or `DISCUSSION_CHECK_CONFIG`),
    /// then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env_path = std::env::var(CONFIG_PATH_VAR).ok().filter(|p| !p.trim().is_empty());

        let mut config = match (path, from_env_path) {
            (Some(path), _) => Self::from_file(path)?,
            (None, Some(path)) => Self::from_file(Path::new(&path))?,
            (None, None) => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Apply overrides from a variable lookup (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("DISCUSSION_CHECK_MAX_PAGES") {
            self.reader.max_pages = parse_var("DISCUSSION_CHECK_MAX_PAGES", &v)?;
        }
        if let Some(v) = get("DISCUSSION_CHECK_FETCH_TIMEOUT_SECS") {
            self.fetch.timeout_secs = parse_var("DISCUSSION_CHECK_FETCH_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("DISCUSSION_CHECK_EXCERPT_CHARS") {
            self.section.max_excerpt_chars = parse_var("DISCUSSION_CHECK_EXCERPT_CHARS", &v)?;
        }
        if let Some(v) = get("DISCUSSION_CHECK_ORACLE_EXCERPT_CHARS") {
            self.oracle.max_excerpt_chars = parse_var("DISCUSSION_CHECK_ORACLE_EXCERPT_CHARS", &v)?;
        }
        if let Some(v) = get("DISCUSSION_CHECK_FALLBACK") {
            self.section.fallback = match v.to_lowercase().as_str() {
                "prefix" => FallbackDirection::Prefix,
                "suffix" => FallbackDirection::Suffix,
                other => anyhow::bail!("DISCUSSION_CHECK_FALLBACK must be prefix or suffix, got '{}'", other),
            };
        }
        if let Some(v) = get("DISCUSSION_CHECK_ORACLE_PROVIDER") {
            let provider = match v.to_lowercase().as_str() {
                "openai" => Provider::OpenAi,
                "ollama" => Provider::Ollama,
                other => anyhow::bail!("DISCUSSION_CHECK_ORACLE_PROVIDER must be openai or ollama, got '{}'", other),
            };
            if provider != self.oracle.provider && provider == Provider::Ollama {
                self.oracle.model = "llama3".to_string();
            }
            self.oracle.provider = provider;
        }

        match self.oracle.provider {
            Provider::OpenAi => {
                if let Some(model) = get("OPENAI_MODEL") {
                    self.oracle.model = model;
                }
                if let Some(url) = get("OPENAI_BASE_URL") {
                    self.oracle.base_url = Some(url);
                }
                if let Some(key) = get("OPENAI_API_KEY") {
                    self.oracle.api_key = Some(key);
                }
            }
            Provider::Ollama => {
                if let Some(model) = get("OLLAMA_MODEL") {
                    self.oracle.model = model;
                }
                if let Some(url) = get("OLLAMA_URL") {
                    self.oracle.base_url = Some(url);
                }
            }
        }

        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .with_context(|| format!("Invalid value for {}: '{}'", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CheckerConfig::default();

        assert_eq!(config.reader.max_pages, 20);
        assert_eq!(config.fetch.timeout_secs, 20);
        assert_eq!(config.section.max_excerpt_chars, 16_000);
        assert_eq!(config.section.fallback_chars, 12_000);
        assert_eq!(config.oracle.max_excerpt_chars, 12_000);
        assert_eq!(config.oracle.provider, Provider::OpenAi);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CheckerConfig::default();
        config
            .apply_overrides(lookup(&[
                ("DISCUSSION_CHECK_MAX_PAGES", "30"),
                ("DISCUSSION_CHECK_FALLBACK", "Suffix"),
                ("DISCUSSION_CHECK_ORACLE_EXCERPT_CHARS", "14000"),
                ("OPENAI_MODEL", "gpt-4o"),
                ("OPENAI_API_KEY", "sk-test"),
            ]))
            .unwrap();

        assert_eq!(config.reader.max_pages, 30);
        assert_eq!(config.section.fallback, FallbackDirection::Suffix);
        assert_eq!(config.oracle.max_excerpt_chars, 14_000);
        assert_eq!(config.oracle.model, "gpt-4o");
        assert_eq!(config.oracle.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_ollama_provider_switch() {
        let mut config = CheckerConfig::default();
        config
            .apply_overrides(lookup(&[
                ("DISCUSSION_CHECK_ORACLE_PROVIDER", "ollama"),
                ("OLLAMA_URL", "http://gpu-box:11434"),
                ("OPENAI_API_KEY", "ignored"),
            ]))
            .unwrap();

        assert_eq!(config.oracle.provider, Provider::Ollama);
        assert_eq!(config.oracle.model, "llama3");
        assert_eq!(config.oracle.base_url.as_deref(), Some("http://gpu-box:11434"));
        assert!(config.oracle.api_key.is_none());
    }

    #[test]
    fn test_bad_values_are_errors() {
        let mut config = CheckerConfig::default();
        let err = config
            .apply_overrides(lookup(&[("DISCUSSION_CHECK_MAX_PAGES", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("DISCUSSION_CHECK_MAX_PAGES"));

        let err = config
            .apply_overrides(lookup(&[("DISCUSSION_CHECK_FALLBACK", "middle")]))
            .unwrap_err();
        assert!(err.to_string().contains("middle"));
    }

    #[test]
    fn test_partial_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"reader": {{"max_pages": 12}}, "section": {{"extra_headers": ["Diskussion"]}}}}"#
        )
        .unwrap();

        let config = CheckerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.reader.max_pages, 12);
        assert_eq!(config.section.extra_headers, vec!["Diskussion"]);
        assert_eq!(config.section.max_excerpt_chars, 16_000);
        assert_eq!(config.fetch.timeout_secs, 20);
    }
}
