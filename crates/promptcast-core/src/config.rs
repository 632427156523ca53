use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::context::build_context;
use crate::template::render_template;

/// Directory name searched for when resolving bare prompt names.
pub const PROMPTS_DIR_NAME: &str = "prompts";
/// Extensions accepted for prompt documents, in resolution order.
pub const PROMPT_EXTENSIONS: &[&str] = &["yml", "yaml"];
/// Environment override for the prompts directory, bypassing ancestor discovery.
pub const PROMPTS_DIR_ENV: &str = "PROMPTCAST_PROMPTS_DIR";

pub const DEFAULT_LLM_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_DELIVERY_PROVIDER: &str = "email";

/// Errors raised while locating, rendering, or validating a prompt document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("prompt file not found: {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("prompt '{name}' not found in {}", .dir.display())]
    NotFoundInDir { name: String, dir: PathBuf },
    #[error("no prompts directory found in the working directory or any parent")]
    NoPromptsDir,
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("missing required field '{field}' in {}", .path.display())]
    MissingField { field: &'static str, path: PathBuf },
    #[error("undefined template variable: {0}")]
    TemplateVariable(String),
    #[error("template error: {0}")]
    TemplateSyntax(String),
}

/// Fully resolved, immutable description of one prompt invocation.
#[derive(Debug, Clone)]
pub struct PromptSpec {
    pub name: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub llm: LlmSettings,
    pub delivery: DeliverySettings,
}

/// `llm` section of a prompt document with defaults applied.
///
/// Keys the schema does not know about are collected into `extra` and passed
/// through to the completion backend verbatim.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub enable_web_search: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_LLM_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            enable_web_search: false,
            extra: Map::new(),
        }
    }
}

/// `delivery` section of a prompt document with defaults applied.
///
/// An empty recipient list means delivery is skipped entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    pub provider: String,
    pub recipients: Vec<String>,
    pub subject: Option<String>,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_DELIVERY_PROVIDER.to_string(),
            recipients: Vec::new(),
            subject: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPromptDocument {
    name: Option<String>,
    prompt: Option<String>,
    system_prompt: Option<String>,
    #[serde(default)]
    llm: LlmSettings,
    #[serde(default)]
    delivery: DeliverySettings,
}

/// Locate the nearest `prompts` directory.
///
/// `PROMPTCAST_PROMPTS_DIR` wins when set and pointing at a directory;
/// otherwise the working directory and each of its ancestors is checked for a
/// child directory literally named `prompts`.
pub fn find_prompts_dir() -> Option<PathBuf> {
    if let Ok(dir) = env::var(PROMPTS_DIR_ENV) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            let path = PathBuf::from(shellexpand::tilde(trimmed).as_ref());
            if path.is_dir() {
                return Some(path);
            }
        }
    }

    let cwd = env::current_dir().ok()?;
    for ancestor in cwd.ancestors() {
        let candidate = ancestor.join(PROMPTS_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }
    }
    None
}

/// Resolve a prompt name or path to the file that backs it.
///
/// Inputs carrying a recognized extension, or pointing at an existing
/// filesystem entry, are treated as direct paths. Bare names are searched in
/// the prompts directory with each accepted extension in order.
pub fn resolve_prompt_path(
    name_or_path: &str,
    prompts_dir: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    let expanded = shellexpand::tilde(name_or_path);
    let direct = Path::new(expanded.as_ref());
    let has_known_extension = direct
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PROMPT_EXTENSIONS.contains(&ext));

    if has_known_extension || direct.exists() {
        if !direct.exists() {
            return Err(ConfigError::NotFound {
                path: direct.to_path_buf(),
            });
        }
        return Ok(direct.to_path_buf());
    }

    let dir = match prompts_dir {
        Some(dir) => dir.to_path_buf(),
        None => find_prompts_dir().ok_or(ConfigError::NoPromptsDir)?,
    };

    for ext in PROMPT_EXTENSIONS {
        let candidate = dir.join(format!("{name_or_path}.{ext}"));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(ConfigError::NotFoundInDir {
        name: name_or_path.to_string(),
        dir,
    })
}

/// Enumerate the base identifiers of every prompt document in the directory.
///
/// Deduplicated and lexicographically sorted; an empty list (never an error)
/// when no directory can be found.
pub fn list_prompts(prompts_dir: Option<&Path>) -> Vec<String> {
    let dir = match prompts_dir {
        Some(dir) => dir.to_path_buf(),
        None => match find_prompts_dir() {
            Some(dir) => dir,
            None => return Vec::new(),
        },
    };

    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut names = BTreeSet::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let is_prompt = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| PROMPT_EXTENSIONS.contains(&ext));
        if is_prompt && path.is_file() {
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.insert(stem.to_string());
            }
        }
    }

    names.into_iter().collect()
}

/// Load, render, parse, and validate a prompt document.
///
/// The optional profile is parsed verbatim (no rendering) and merged into the
/// template context; the prompt document text is then rendered and the result
/// parsed as YAML. `prompt` must be present and non-empty after rendering.
pub fn load_prompt_spec(
    path: &Path,
    profile_path: Option<&Path>,
) -> Result<PromptSpec, ConfigError> {
    let raw_text = read_text(path)?;

    let profile = match profile_path {
        Some(profile_path) => Some(load_profile(profile_path)?),
        None => None,
    };

    let context = build_context(profile.as_ref());
    let rendered = render_template(&raw_text, &context)?;

    if rendered.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: "prompt",
            path: path.to_path_buf(),
        });
    }
    let document: RawPromptDocument =
        serde_yaml::from_str(&rendered).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let prompt = document
        .prompt
        .filter(|prompt| !prompt.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingField {
            field: "prompt",
            path: path.to_path_buf(),
        })?;

    let name = document.name.unwrap_or_else(|| base_identifier(path));
    debug!(name = %name, path = %path.display(), "loaded prompt specification");

    Ok(PromptSpec {
        name,
        prompt,
        system_prompt: document.system_prompt,
        llm: document.llm,
        delivery: document.delivery,
    })
}

/// Load a profile document as plain structured data.
pub fn load_profile(path: &Path) -> Result<Value, ConfigError> {
    let text = read_text(path)?;
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_text(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn base_identifier(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
