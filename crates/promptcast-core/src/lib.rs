//! Core library crate for promptcast: configuration resolution, template
//! rendering, and the provider-dispatch pipeline.

pub mod config;
pub mod context;
pub mod delivery;
pub mod llm;
pub mod logging;
pub mod markup;
pub mod runtime;
pub mod template;

pub use config::{
    ConfigError, DeliverySettings, LlmSettings, PromptSpec, find_prompts_dir, list_prompts,
    load_prompt_spec, resolve_prompt_path,
};
pub use delivery::{DeliveryError, DeliveryProvider, DeliveryResult, EmailCredentials};
pub use llm::{LlmError, LlmProvider, LlmResponse, WebSearchResult};
pub use logging::{LoggingDestination, LoggingError, init_logging};
pub use markup::markdown_to_html;
pub use runtime::{
    NON_INTERACTIVE_INSTRUCTIONS, RunError, RunOptions, RunOutcome, run_prompt, run_with_spec,
    validate_prompt,
};
