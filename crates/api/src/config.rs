use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Service settings. Pipeline settings live in `checker::CheckerConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub json_logs: bool,
    /// Request body cap; uploads are base64 so this is ~4/3 of the PDF size
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            json_logs: false,
            max_body_bytes: 40 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind) = lookup("DISCUSSION_CHECK_BIND").filter(|v| !v.trim().is_empty()) {
            config.bind = bind.trim().to_string();
        }
        if let Some(flag) = lookup("DISCUSSION_CHECK_LOG_JSON") {
            config.json_logs = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(limit) = lookup("DISCUSSION_CHECK_MAX_BODY_BYTES") {
            config.max_body_bytes = limit
                .trim()
                .parse()
                .with_context(|| format!("Invalid value for DISCUSSION_CHECK_MAX_BODY_BYTES: '{}'", limit))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_settings() {
        let config = ServerConfig::from_lookup(|key| match key {
            "DISCUSSION_CHECK_BIND" => Some("127.0.0.1:8080".to_string()),
            "DISCUSSION_CHECK_LOG_JSON" => Some("1".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.bind, "127.0.0.1:8080");
        assert!(config.json_logs);
        assert_eq!(config.max_body_bytes, ServerConfig::default().max_body_bytes);
    }

    #[test]
    fn test_bad_body_limit() {
        let result = ServerConfig::from_lookup(|key| {
            (key == "DISCUSSION_CHECK_MAX_BODY_BYTES").then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }
}
