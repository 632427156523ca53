use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{self, ConfigError, PromptSpec};
use crate::delivery::{self, DeliveryError, DeliveryResult, EmailCredentials};
use crate::llm::{self, LlmError, LlmResponse};
use crate::markup::markdown_to_html;

/// Instructions appended to every system prompt. The response is consumed
/// non-interactively (stdout, a file, or an email), so conversational
/// follow-ups would be dead text.
pub const NON_INTERACTIVE_INSTRUCTIONS: &str = "Your response is delivered over a \
non-interactive channel and nobody can reply to it. Provide a complete, self-contained \
answer. Do not ask follow-up questions, do not offer to continue the conversation, and \
do not request clarification.";

/// Caller-tunable knobs for one pipeline invocation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Profile document merged into the template context.
    pub profile: Option<PathBuf>,
    /// Explicit prompts directory, overriding ancestor discovery.
    pub prompts_dir: Option<PathBuf>,
    /// Skip the delivery stage even when recipients are configured.
    pub skip_delivery: bool,
    /// Explicit completion credential; falls back to the backend's
    /// environment variable.
    pub openai_api_key: Option<String>,
    /// Explicit delivery credentials; fall back to the environment pair.
    pub email_credentials: Option<EmailCredentials>,
}

/// Everything a single invocation produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub spec: PromptSpec,
    pub response: LlmResponse,
    /// `None` when delivery was skipped or not configured.
    pub delivery: Option<DeliveryResult>,
}

/// Unified error surface for the pipeline; every variant keeps its domain so
/// callers can map them to distinct diagnostics and exit codes.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("{error}")]
    DeliveryFailed {
        /// The completion already produced. A failed delivery does not
        /// discard it; only the delivery stage is reported as failed.
        response: Box<LlmResponse>,
        #[source]
        error: DeliveryError,
    },
}

/// Resolve and fully validate a prompt document without touching any backend.
pub fn validate_prompt(
    name_or_path: &str,
    options: &RunOptions,
) -> Result<PromptSpec, ConfigError> {
    let path = config::resolve_prompt_path(name_or_path, options.prompts_dir.as_deref())?;
    config::load_prompt_spec(&path, options.profile.as_deref())
}

/// Run the full pipeline: resolve, complete, transform, optionally deliver.
pub fn run_prompt(name_or_path: &str, options: &RunOptions) -> Result<RunOutcome, RunError> {
    let spec = validate_prompt(name_or_path, options)?;
    run_with_spec(spec, options)
}

/// Run the pipeline against an already-resolved specification.
pub fn run_with_spec(spec: PromptSpec, options: &RunOptions) -> Result<RunOutcome, RunError> {
    info!(
        name = %spec.name,
        provider = %spec.llm.provider,
        model = %spec.llm.model,
        "starting prompt run"
    );

    let provider = llm::create_provider(&spec.llm, options.openai_api_key.clone())?;
    provider.validate_config()?;

    let system_prompt = compose_system_prompt(spec.system_prompt.as_deref());
    let response = provider.complete(&spec.prompt, Some(&system_prompt))?;
    info!(model = %response.model, chars = response.content.len(), "completion received");
    debug!(usage = ?response.usage, "token usage");

    let delivery = if should_deliver(&spec, options) {
        let html = markdown_to_html(&response.content);
        match deliver(&spec, options, &response.content, &html) {
            Ok(result) => Some(result),
            Err(error) => {
                return Err(RunError::DeliveryFailed {
                    response: Box::new(response),
                    error,
                });
            }
        }
    } else {
        debug!("delivery skipped");
        None
    };

    Ok(RunOutcome {
        spec,
        response,
        delivery,
    })
}

fn should_deliver(spec: &PromptSpec, options: &RunOptions) -> bool {
    !options.skip_delivery && !spec.delivery.recipients.is_empty()
}

fn deliver(
    spec: &PromptSpec,
    options: &RunOptions,
    content: &str,
    content_html: &str,
) -> Result<DeliveryResult, DeliveryError> {
    let provider = delivery::create_provider(&spec.delivery, options.email_credentials.clone())?;
    provider.validate_config()?;

    info!(
        provider = %spec.delivery.provider,
        recipients = spec.delivery.recipients.len(),
        "delivering response"
    );
    let result = provider.deliver(content, Some(content_html))?;
    if !result.success {
        // A backend reporting failure without raising is treated exactly
        // like a raised delivery error.
        return Err(DeliveryError::Failed(
            result
                .error
                .unwrap_or_else(|| "delivery reported failure".to_string()),
        ));
    }
    Ok(result)
}

/// Append the fixed non-interactive instructions to the configured system
/// prompt, or use them alone when no system prompt is set.
fn compose_system_prompt(configured: Option<&str>) -> String {
    match configured {
        Some(system_prompt) if !system_prompt.trim().is_empty() => {
            format!("{system_prompt}\n\n{NON_INTERACTIVE_INSTRUCTIONS}")
        }
        _ => NON_INTERACTIVE_INSTRUCTIONS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeliverySettings, LlmSettings};

    fn spec_with_recipients(recipients: Vec<String>) -> PromptSpec {
        PromptSpec {
            name: "test".to_string(),
            prompt: "hi".to_string(),
            system_prompt: None,
            llm: LlmSettings::default(),
            delivery: DeliverySettings {
                recipients,
                ..DeliverySettings::default()
            },
        }
    }

    #[test]
    fn system_prompt_gets_the_non_interactive_suffix() {
        let composed = compose_system_prompt(Some("You are a news analyst."));
        assert!(composed.starts_with("You are a news analyst."));
        assert!(composed.ends_with(NON_INTERACTIVE_INSTRUCTIONS));
    }

    #[test]
    fn missing_system_prompt_uses_the_instructions_alone() {
        assert_eq!(compose_system_prompt(None), NON_INTERACTIVE_INSTRUCTIONS);
        assert_eq!(compose_system_prompt(Some("  ")), NON_INTERACTIVE_INSTRUCTIONS);
    }

    #[test]
    fn delivery_requires_recipients_and_no_opt_out() {
        let options = RunOptions::default();
        assert!(!should_deliver(&spec_with_recipients(vec![]), &options));
        assert!(should_deliver(
            &spec_with_recipients(vec!["a@example.com".to_string()]),
            &options
        ));

        let opted_out = RunOptions {
            skip_delivery: true,
            ..RunOptions::default()
        };
        assert!(!should_deliver(
            &spec_with_recipients(vec!["a@example.com".to_string()]),
            &opted_out
        ));
    }
}
