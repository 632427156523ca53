pub mod mock;
pub mod openai;
mod response;

pub use response::parse_response;

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::LlmSettings;

/// Capability contract implemented by every completion backend.
///
/// The orchestrator depends only on this trait and [`create_provider`]; no
/// concrete backend leaks past this module boundary.
pub trait LlmProvider {
    /// Stable identifier for this backend, used in configuration and errors.
    fn name(&self) -> &'static str;

    /// Check the configuration without performing any network call.
    fn validate_config(&self) -> Result<(), LlmError>;

    /// Send a prompt (and optional system instructions) and return the parsed
    /// response.
    fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<LlmResponse, LlmError>;
}

/// Validated parameter bag handed to completion backends by value.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub enable_web_search: bool,
    /// Backend-specific options passed through verbatim.
    pub extra: Map<String, Value>,
}

impl LlmConfig {
    /// Shared validation rules every backend applies.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.model.trim().is_empty() {
            return Err(LlmError::Configuration(
                "model must be specified".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LlmError::Configuration(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(LlmError::Configuration(
                "max_tokens must be positive if specified".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&LlmSettings> for LlmConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            enable_web_search: settings.enable_web_search,
            extra: settings.extra.clone(),
        }
    }
}

/// One web-search citation surfaced by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Parsed response from a completion backend.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub web_search_results: Vec<WebSearchResult>,
    /// Token counters (`prompt_tokens`, `completion_tokens`, `total_tokens`);
    /// empty when the backend reported no usage.
    pub usage: HashMap<String, u64>,
    /// The raw backend payload, kept for debugging.
    pub raw_response: Value,
}

/// Errors raised by completion backends and their factory.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM configuration error: {0}")]
    Configuration(String),
    #[error("unknown LLM provider '{0}'")]
    UnknownProvider(String),
    #[error("{provider} rate limit exceeded (status {status_code})")]
    RateLimited {
        provider: &'static str,
        status_code: u16,
    },
    #[error("failed to reach {provider}: {message}")]
    Connection {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} API error: {message}")]
    Api {
        provider: &'static str,
        status_code: Option<u16>,
        message: String,
    },
}

/// Build the completion backend named by the prompt specification.
///
/// Dispatch is static: adding a backend means adding its module and an arm
/// here, nothing else.
pub fn create_provider(
    settings: &LlmSettings,
    api_key: Option<String>,
) -> Result<Box<dyn LlmProvider>, LlmError> {
    match settings.provider.as_str() {
        openai::PROVIDER_NAME => Ok(Box::new(openai::OpenAiProvider::new(
            LlmConfig::from(settings),
            api_key,
        )?)),
        mock::PROVIDER_NAME => Ok(Box::new(mock::MockProvider::new(LlmConfig::from(settings)))),
        other => Err(LlmError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LlmConfig {
        LlmConfig {
            model: "gpt-4o".to_string(),
            temperature: 1.0,
            max_tokens: None,
            enable_web_search: false,
            extra: Map::new(),
        }
    }

    #[test]
    fn validation_accepts_defaults() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn validation_rejects_blank_model() {
        let mut config = config();
        config.model = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn validation_rejects_out_of_range_temperature() {
        let mut config = config();
        config.temperature = 2.5;
        assert!(matches!(
            config.validate(),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn validation_rejects_zero_max_tokens() {
        let mut config = config();
        config.max_tokens = Some(0);
        assert!(matches!(
            config.validate(),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn unknown_provider_is_a_distinct_error() {
        let settings = LlmSettings {
            provider: "frobnicator".to_string(),
            ..LlmSettings::default()
        };
        let err = create_provider(&settings, None)
            .map(|_| ())
            .expect_err("unrecognized provider id must fail");
        match err {
            LlmError::UnknownProvider(name) => assert_eq!(name, "frobnicator"),
            other => panic!("expected UnknownProvider, got {other:?}"),
        }
    }
}
