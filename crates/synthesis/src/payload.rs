//! Normalization of the synthesis output value.
//!
//! The service returns prompts in one of three containers: a JSON-encoded
//! string, a list, or a map whose values are strings or lists. Each shape
//! is one [`SynthesisPayload`] variant and [`SynthesisPayload::into_prompts`]
//! is the single place that flattens them.

use serde_json::Value;

/// Container shape of a synthesis result.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisPayload {
    Text(String),
    List(Vec<Value>),
    Map(serde_json::Map<String, Value>),
}

impl SynthesisPayload {
    /// Classify a raw output value. Returns `None` for null, numbers and
    /// booleans, which carry no prompts.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::Text(text)),
            Value::Array(items) => Some(Self::List(items)),
            Value::Object(map) => Some(Self::Map(map)),
            _ => None,
        }
    }

    /// Flatten into trimmed, non-blank prompts in source order.
    pub fn into_prompts(self) -> Vec<String> {
        let mut prompts = Vec::new();
        match self {
            Self::Text(text) => push_text(&mut prompts, &text),
            Self::List(items) => items.iter().for_each(|item| push_scalar(&mut prompts, item)),
            Self::Map(map) => {
                for value in map.values() {
                    match value {
                        Value::String(text) => push_text(&mut prompts, text),
                        Value::Array(items) => {
                            items.iter().for_each(|item| push_scalar(&mut prompts, item))
                        }
                        _ => {}
                    }
                }
            }
        }
        prompts
    }
}

/// A string is either a JSON array of prompts or one prompt.
fn push_text(prompts: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
            items.iter().for_each(|item| push_scalar(prompts, item));
            return;
        }
    }
    push_prompt(prompts, trimmed);
}

fn push_scalar(prompts: &mut Vec<String>, item: &Value) {
    match item {
        Value::String(s) => push_prompt(prompts, s),
        Value::Number(n) => push_prompt(prompts, &n.to_string()),
        Value::Bool(b) => push_prompt(prompts, &b.to_string()),
        _ => {}
    }
}

fn push_prompt(prompts: &mut Vec<String>, candidate: &str) {
    let candidate = candidate.trim();
    if !candidate.is_empty() {
        prompts.push(candidate.to_string());
    }
}
