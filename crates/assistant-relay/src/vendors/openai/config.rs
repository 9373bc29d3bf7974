use std::time::Duration;

use crate::errors::RelayError;

/// Value sent in the `OpenAI-Beta` header.
pub const ASSISTANTS_BETA_HEADER: &str = "assistants=v2";

/// Configuration for the OpenAI Assistants client.
#[derive(Clone, Debug)]
pub struct OpenAiAssistantsConfig {
    /// API key used for bearer auth.
    pub api_key: String,
    /// Base URL for the OpenAI-compatible endpoint.
    ///
    /// Useful for proxies or local test servers.
    pub base_url: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl OpenAiAssistantsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Builds a config from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, RelayError> {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(RelayError::Config(
                "missing OPENAI_API_KEY for the assistants client".into(),
            ));
        }
        Ok(Self::new(api_key))
    }

    /// Overrides the API base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url.trim_end_matches('/'), path)
    }
}
