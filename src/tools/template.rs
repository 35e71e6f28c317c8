//! `{{.key}}` placeholder substitution for inline code tools.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::{Result, RunnerError};

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\.([A-Za-z0-9_]+)\s*\}\}").expect("placeholder regex must compile")
});

/// Substitute `{{.key}}` placeholders from the argument map.
///
/// String values are inserted verbatim; other values are inserted as JSON.
/// A placeholder without a matching key is a template error.
pub(crate) fn render(template: &str, args: &serde_json::Map<String, Value>) -> Result<String> {
    let mut missing: Option<String> = None;

    let rendered = PLACEHOLDER_RE.replace_all(template, |caps: &Captures| {
        let key = &caps[1];
        match args.get(key) {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => {
                missing.get_or_insert_with(|| key.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(key) => Err(RunnerError::Template(format!(
            "no value supplied for template key '{key}'"
        ))),
        None => Ok(rendered.into_owned()),
    }
}
