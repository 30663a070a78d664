//! Model reply parsing
//!
//! Models are asked for JSON but often wrap it in a markdown fence or add a
//! sentence before it. These helpers find the object and pull typed fields
//! out of it without failing on missing keys.

use serde_json::{Map, Value};
use tracing::debug;

/// Locate the JSON payload in a model reply.
///
/// Looks for a ```json fenced block first, then for the outermost `{...}`.
pub fn extract_json(text: &str) -> Option<&str> {
    for fence in ["```json", "```JSON"] {
        if let Some(start) = text.find(fence) {
            let content = &text[start + fence.len()..];
            if let Some(end) = content.find("```") {
                return Some(content[..end].trim());
            }
        }
    }

    if let Some(start) = text.find('{') {
        if let Some(end) = text.rfind('}') {
            if end > start {
                return Some(text[start..=end].trim());
            }
        }
    }

    None
}

/// Parse the first JSON object in a model reply.
pub fn parse_object(text: &str) -> Option<Map<String, Value>> {
    let candidate = extract_json(text)?;
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "Model reply contained malformed JSON");
            None
        }
    }
}

/// String field, empty when missing or not a string.
pub fn string_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// List of strings; a bare string becomes a one-element list, other values are skipped.
pub fn string_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Split free text into list items, dropping bullets and numbering.
pub fn text_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| strip_list_marker(line.trim()).to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Text after a marker, if the marker is followed by whitespace or ends the line.
fn after_marker(rest: &str) -> Option<&str> {
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest.trim()),
        Some(_) => None,
    }
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line
        .strip_prefix(['-', '*', '•'])
        .and_then(after_marker)
    {
        return rest;
    }

    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(rest) = line[digits..]
            .strip_prefix(['.', ')'])
            .and_then(after_marker)
        {
            return rest;
        }
    }

    line
}
