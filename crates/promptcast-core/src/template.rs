use minijinja::{Environment, UndefinedBehavior};
use serde_json::{Map, Value};

use crate::config::ConfigError;

/// Render a prompt document's raw text against a template context.
///
/// The whole document is rendered before it is parsed as YAML, so the
/// renderer operates on raw text. Undefined names are hard errors (strict
/// mode), and the environment carries no loader: templates cannot reach the
/// filesystem or the network. Interpolation, `{% if %}` and `{% for %}` are
/// available, plus an `env(name, default?)` lookup function.
pub fn render_template(source: &str, context: &Map<String, Value>) -> Result<String, ConfigError> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_function("env", env_lookup);

    env.render_str(source, context).map_err(classify_error)
}

/// Read-only environment access for templates. A missing variable yields the
/// supplied default, or an empty string.
fn env_lookup(name: String, default: Option<String>) -> String {
    std::env::var(&name).ok().or(default).unwrap_or_default()
}

fn classify_error(err: minijinja::Error) -> ConfigError {
    match err.kind() {
        minijinja::ErrorKind::UndefinedError => ConfigError::TemplateVariable(describe(&err)),
        _ => ConfigError::TemplateSyntax(describe(&err)),
    }
}

fn describe(err: &minijinja::Error) -> String {
    match err.detail() {
        Some(detail) => detail.to_string(),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::build_context;
    use serde_json::json;

    #[test]
    fn interpolates_context_variables() {
        let mut context = Map::new();
        context.insert("name".to_string(), json!("World"));
        let output = render_template("Hello, {{ name }}!", &context).unwrap();
        assert_eq!(output, "Hello, World!");
    }

    #[test]
    fn supports_conditionals_and_loops() {
        let mut context = Map::new();
        context.insert("items".to_string(), json!(["a", "b", "c"]));
        context.insert("verbose".to_string(), json!(true));
        let output = render_template(
            "{% if verbose %}{% for item in items %}{{ item }},{% endfor %}{% endif %}",
            &context,
        )
        .unwrap();
        assert_eq!(output, "a,b,c,");
    }

    #[test]
    fn undefined_variable_is_a_distinct_error() {
        let context = Map::new();
        let err = render_template("{{ nonexistent }}", &context).unwrap_err();
        assert!(matches!(err, ConfigError::TemplateVariable(_)), "got {err:?}");
    }

    #[test]
    fn malformed_control_structure_is_a_syntax_error() {
        let context = Map::new();
        let err = render_template("{% if %}", &context).unwrap_err();
        assert!(matches!(err, ConfigError::TemplateSyntax(_)), "got {err:?}");
    }

    #[test]
    fn env_function_falls_back_to_default() {
        let context = Map::new();
        let output = render_template(
            "{{ env('PROMPTCAST_TEST_UNSET_VARIABLE', 'fallback') }}",
            &context,
        )
        .unwrap();
        assert_eq!(output, "fallback");
    }

    #[test]
    fn renders_against_built_in_context() {
        let context = build_context(None);
        let output = render_template("Today is {{ current_date }}", &context).unwrap();
        assert!(output.starts_with("Today is "));
        assert!(!output.contains("{{"));
    }
}
