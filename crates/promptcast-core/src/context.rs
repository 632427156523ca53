use chrono::Local;
use serde_json::{Map, Value};

/// Context keys that are always provided by [`build_context`]. Profile keys
/// flattened into the context never override these; `env` is reserved for the
/// environment-lookup function registered on the template environment.
pub const BUILT_IN_KEYS: &[&str] = &[
    "current_date",
    "current_time",
    "current_datetime",
    "current_weekday",
    "profile",
    "env",
];

/// Assemble the variable environment a prompt document is rendered against.
///
/// Date and time fields reflect the wall clock at the moment of the call, so
/// every resolution sees the real invocation time. A profile document, when
/// supplied, is embedded whole under `profile` and its top-level keys are
/// additionally flattened into the root namespace; a flattened key that
/// collides with a built-in key is skipped silently.
pub fn build_context(profile: Option<&Value>) -> Map<String, Value> {
    let now = Local::now();
    let mut context = Map::new();
    context.insert(
        "current_date".to_string(),
        Value::String(now.format("%Y-%m-%d").to_string()),
    );
    context.insert(
        "current_time".to_string(),
        Value::String(now.format("%H:%M:%S").to_string()),
    );
    context.insert(
        "current_datetime".to_string(),
        Value::String(now.format("%Y-%m-%d %H:%M:%S").to_string()),
    );
    context.insert(
        "current_weekday".to_string(),
        Value::String(now.format("%A").to_string()),
    );

    if let Some(profile) = profile {
        if let Value::Object(fields) = profile {
            for (key, value) in fields {
                if !BUILT_IN_KEYS.contains(&key.as_str()) {
                    context.insert(key.clone(), value.clone());
                }
            }
        }
        context.insert("profile".to_string(), profile.clone());
    }

    context
}
