//! Helpers for reading action options
//!
//! Options arrive as loosely typed YAML values. Scalars are accepted in
//! whichever form the user wrote them, so `pr_number: 12` and
//! `pr_number: "12"` both work.

use serde_json::Value;

use super::AdapterError;
use crate::workflow::ActionOptions;

/// Non-empty string option; numbers and booleans are rendered as text
pub fn string(options: &ActionOptions, name: &str) -> Option<String> {
    match options.get(name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn integer(options: &ActionOptions, name: &str) -> Option<u64> {
    match options.get(name)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
        _ => None,
    }
}

/// List of strings; a single string counts as a one-element list
pub fn string_list(options: &ActionOptions, name: &str) -> Vec<String> {
    match options.get(name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Raw value, treating `null` as absent
pub fn value<'a>(options: &'a ActionOptions, name: &str) -> Option<&'a Value> {
    options.get(name).filter(|v| !v.is_null())
}

pub fn invalid(message: impl Into<String>) -> AdapterError {
    AdapterError::InvalidOptions(message.into())
}

/// Split `owner/repo`
pub fn split_repo(repo: &str) -> Result<(&str, &str), AdapterError> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(invalid("Repository must be in format \"owner/repo\"")),
    }
}
