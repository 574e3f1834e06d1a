use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Expand `{{ env.VAR }}` placeholders in raw configuration text
///
/// `{{ env.VAR | default("x") }}` falls back to `x` when `VAR` is unset.
/// Lines whose first non-blank character is `#` are copied untouched so
/// commented-out settings never require their variables.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut lines = Vec::new();

    for line in input.split('\n') {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_owned());
        } else {
            lines.push(expand_line(line)?);
        }
    }

    Ok(lines.join("\n"))
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\)\s*)?\}\}"#).expect("must be valid regex")
    })
}

fn expand_line(line: &str) -> Result<String, String> {
    let mut failure = None;

    let expanded = placeholder().replace_all(line, |captures: &Captures<'_>| {
        let key = &captures[1];
        let fallback = captures.get(2).map(|m| m.as_str());

        let Some(var_name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
            failure.get_or_insert_with(|| format!("only variables scoped with 'env.' are supported: `{key}`"));
            return String::new();
        };

        match (std::env::var(var_name), fallback) {
            (Ok(value), _) => value,
            (Err(_), Some(fallback)) => fallback.to_owned(),
            (Err(_), None) => {
                failure.get_or_insert_with(|| format!("environment variable not found: `{var_name}`"));
                String::new()
            }
        }
    });

    match failure {
        Some(message) => Err(message),
        None => Ok(expanded.into_owned()),
    }
}
