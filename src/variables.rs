//! Variable sets made available to templates.
//!
//! Variables are built in layers: built-ins first, then the metadata file's
//! `[variables]`, then whatever the template script returns. Each layer is
//! merged over the previous one and the result threaded through the pipeline
//! by value.

use chrono::Local;
use once_cell::sync::Lazy;
use serde_json::Value;

/// A set of named template variables.
pub type Variables = serde_json::Map<String, Value>;

static GLOBAL_VARIABLES: Lazy<Variables> = Lazy::new(|| {
    let now = Local::now();
    let mut variables = Variables::new();
    variables.insert(
        "current_time".to_string(),
        Value::String(now.format("%Y-%m-%d %H:%M:%S").to_string()),
    );
    variables.insert("current_year".to_string(), Value::String(now.format("%Y").to_string()));
    variables
});

/// Process-wide variables, captured the first time they are requested.
pub fn global_variables() -> &'static Variables {
    &GLOBAL_VARIABLES
}

/// Derives a human readable title from a project name.
///
/// Dashes and underscores become spaces and every word is title-cased:
/// `my-cool_project` becomes `My Cool Project`.
pub fn project_title(project_name: &str) -> String {
    let mut title = String::with_capacity(project_name.len());
    let mut previous_is_letter = false;

    for c in project_name.chars() {
        let c = if c == '-' || c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if previous_is_letter {
                title.extend(c.to_lowercase());
            } else {
                title.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            title.push(c);
            previous_is_letter = false;
        }
    }

    title
}

/// Variables derived from the project name alone.
pub fn default_variables(project_name: &str) -> Variables {
    let mut variables = Variables::new();
    variables.insert("project_name".to_string(), Value::String(project_name.to_string()));
    variables.insert("project_title".to_string(), Value::String(project_title(project_name)));
    variables
}

/// The built-in layer: [`default_variables`] plus [`global_variables`].
pub fn base_variables(project_name: &str) -> Variables {
    merge_variables(default_variables(project_name), global_variables())
}

/// Merges `layer` over `base`; keys present in both take the value from `layer`.
pub fn merge_variables(mut base: Variables, layer: &Variables) -> Variables {
    for (key, value) in layer {
        base.insert(key.clone(), value.clone());
    }
    base
}
