use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::{LlmConfig, LlmError, LlmProvider, LlmResponse, parse_response};

pub const PROVIDER_NAME: &str = "openai";
/// Well-known environment variable consulted when no key is passed explicitly.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
const RESPONSES_URL: &str = "https://api.openai.com/v1/responses";

/// Hosted-model backend speaking the OpenAI Responses API.
///
/// The Responses API carries built-in tools such as `web_search`, which is
/// how `enable_web_search` is expressed on the wire.
pub struct OpenAiProvider {
    config: LlmConfig,
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    /// Create a provider from a config and an optional explicit API key.
    ///
    /// Falls back to `OPENAI_API_KEY`; a missing or blank credential fails
    /// here, before any network traffic.
    pub fn new(config: LlmConfig, api_key: Option<String>) -> Result<Self, LlmError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                std::env::var(API_KEY_ENV)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
            .ok_or_else(|| {
                LlmError::Configuration(format!(
                    "OpenAI API key not provided; set {API_KEY_ENV} or pass api_key explicitly"
                ))
            })?;

        Ok(Self {
            config,
            api_key,
            client: Client::new(),
        })
    }
}

impl LlmProvider for OpenAiProvider {
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
        let body = build_request_body(&self.config, prompt, system_prompt);
        debug!(
            model = %self.config.model,
            web_search = self.config.enable_web_search,
            "sending completion request"
        );

        let response = self
            .client
            .post(RESPONSES_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited {
                provider: PROVIDER_NAME,
                status_code: status.as_u16(),
            });
        }
        if !status.is_success() {
            let message = response.text().unwrap_or_else(|err| err.to_string());
            return Err(LlmError::Api {
                provider: PROVIDER_NAME,
                status_code: Some(status.as_u16()),
                message,
            });
        }

        let payload: Value = response.json().map_err(|err| LlmError::Api {
            provider: PROVIDER_NAME,
            status_code: None,
            message: format!("undecodable response body: {err}"),
        })?;

        let mut parsed = parse_response(payload);
        if parsed.model.is_empty() {
            parsed.model = self.config.model.clone();
        }
        Ok(parsed)
    }
}

/// Assemble the Responses API request body.
///
/// Optional knobs are only present when they deviate from the server default;
/// every `extra` key is copied through verbatim.
fn build_request_body(config: &LlmConfig, prompt: &str, system_prompt: Option<&str>) -> Value {
    let mut body = json!({
        "model": config.model,
        "input": prompt,
    });

    if let Some(system_prompt) = system_prompt {
        body["instructions"] = json!(system_prompt);
    }
    if (config.temperature - 1.0).abs() > f32::EPSILON {
        body["temperature"] = json!(config.temperature);
    }
    if let Some(max_tokens) = config.max_tokens {
        body["max_output_tokens"] = json!(max_tokens);
    }
    if config.enable_web_search {
        body["tools"] = json!([{ "type": "web_search" }]);
    }
    for (key, value) in &config.extra {
        body[key.as_str()] = value.clone();
    }

    body
}

fn classify_transport_error(err: reqwest::Error) -> LlmError {
    if err.is_connect() || err.is_timeout() {
        LlmError::Connection {
            provider: PROVIDER_NAME,
            message: err.to_string(),
        }
    } else {
        LlmError::Api {
            provider: PROVIDER_NAME,
            status_code: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }
}
