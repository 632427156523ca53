use std::collections::HashMap;

use serde_json::json;

use super::{LlmConfig, LlmError, LlmProvider, LlmResponse};

pub const PROVIDER_NAME: &str = "mock";

/// Deterministic in-process backend used by tests and offline wiring checks.
/// Echoes the prompt back without touching the network.
pub struct MockProvider {
    config: LlmConfig,
}

impl MockProvider {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn validate_config(&self) -> Result<(), LlmError> {
        self.config.validate()
    }

    fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<LlmResponse, LlmError> {
        let prompt_tokens = prompt.split_whitespace().count() as u64;
        let mut usage = HashMap::new();
        usage.insert("prompt_tokens".to_string(), prompt_tokens);
        usage.insert("completion_tokens".to_string(), 0);
        usage.insert("total_tokens".to_string(), prompt_tokens);

        Ok(LlmResponse {
            content: format!("mock response to: {prompt}"),
            model: self.config.model.clone(),
            web_search_results: Vec::new(),
            usage,
            raw_response: json!({
                "provider": PROVIDER_NAME,
                "input": prompt,
                "instructions": system_prompt,
            }),
        })
    }
}
