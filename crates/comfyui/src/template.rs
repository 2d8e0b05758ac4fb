//! Workflow templates and placeholder substitution.
//!
//! A template is a ComfyUI API-format node map in which some input
//! values are placeholder tokens. [`WorkflowTemplate::fill`] clones the
//! node map and swaps every field whose value is exactly a token for the
//! concrete value. The loaded template itself is never mutated.

use rand::Rng;
use serde::{Deserialize, Serialize};
use storyforge_core::generation::{MAX_SEED, MIN_SEED};

use crate::catalog::WorkflowCategory;

/// Token replaced by the generation prompt.
pub const PROMPT_PLACEHOLDER: &str = "__PROMPT__";
/// Token replaced by a random integer seed.
pub const SEED_PLACEHOLDER: &str = "__SEED__";
/// Token replaced by the uploaded source image name.
pub const IMAGE_PLACEHOLDER: &str = "__IMAGE__";

/// An immutable, parameterized ComfyUI workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub title: String,
    pub category: WorkflowCategory,
    pub version: Option<String>,
    /// Node id -> `{ "class_type": ..., "inputs": { ... } }`.
    pub nodes: serde_json::Map<String, serde_json::Value>,
}

/// Concrete values for one job.
#[derive(Debug, Clone, Copy)]
pub struct TemplateInputs<'a> {
    pub prompt: &'a str,
    pub seed: u64,
    pub image: Option<&'a str>,
}

/// How many fields each token replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Substitutions {
    pub prompt: usize,
    pub seed: usize,
    pub image: usize,
}

/// A filled workflow ready for submission.
#[derive(Debug, Clone)]
pub struct FilledWorkflow {
    pub document: serde_json::Value,
    pub substitutions: Substitutions,
}

/// Validation errors raised before anything is sent to ComfyUI.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("image reference must not be empty")]
    EmptyImage,

    #[error("workflow '{title}' has no {token} placeholder")]
    MissingPlaceholder { title: String, token: &'static str },
}

impl WorkflowTemplate {
    /// Build a template from a raw node map.
    pub fn new(
        title: impl Into<String>,
        category: WorkflowCategory,
        nodes: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            title: title.into(),
            category,
            version: None,
            nodes,
        }
    }

    /// Count the fields in the original document equal to `token`.
    pub fn placeholder_count(&self, token: &str) -> usize {
        self.nodes.values().map(|v| count_token(v, token)).sum()
    }

    /// Clone the node map and substitute every placeholder.
    ///
    /// Fails fast on a blank prompt or image, and when the template has no
    /// slot for a value the job needs (a prompt always, an image whenever
    /// one is supplied). The seed placeholder is optional.
    pub fn fill(&self, inputs: &TemplateInputs<'_>) -> Result<FilledWorkflow, TemplateError> {
        if inputs.prompt.trim().is_empty() {
            return Err(TemplateError::EmptyPrompt);
        }
        if let Some(image) = inputs.image {
            if image.trim().is_empty() {
                return Err(TemplateError::EmptyImage);
            }
        }

        let mut document = serde_json::Value::Object(self.nodes.clone());
        let mut substitutions = Substitutions::default();
        substitute(&mut document, inputs, &mut substitutions);

        if substitutions.prompt == 0 {
            return Err(TemplateError::MissingPlaceholder {
                title: self.title.clone(),
                token: PROMPT_PLACEHOLDER,
            });
        }
        if inputs.image.is_some() && substitutions.image == 0 {
            return Err(TemplateError::MissingPlaceholder {
                title: self.title.clone(),
                token: IMAGE_PLACEHOLDER,
            });
        }

        Ok(FilledWorkflow {
            document,
            substitutions,
        })
    }
}

/// Draw a fresh seed in `MIN_SEED..=MAX_SEED`.
pub fn random_seed() -> u64 {
    rand::rng().random_range(MIN_SEED..=MAX_SEED)
}

/// Single pass over the document. Replacement values are written in place
/// and never revisited, so a prompt that happens to contain a token is not
/// substituted again.
fn substitute(
    value: &mut serde_json::Value,
    inputs: &TemplateInputs<'_>,
    counts: &mut Substitutions,
) {
    if let Some(s) = value.as_str() {
        let replacement = match s {
            PROMPT_PLACEHOLDER => {
                counts.prompt += 1;
                Some(serde_json::Value::String(inputs.prompt.to_string()))
            }
            SEED_PLACEHOLDER => {
                counts.seed += 1;
                Some(serde_json::Value::from(inputs.seed))
            }
            IMAGE_PLACEHOLDER => inputs.image.map(|image| {
                counts.image += 1;
                serde_json::Value::String(image.to_string())
            }),
            _ => None,
        };
        if let Some(replacement) = replacement {
            *value = replacement;
        }
        return;
    }

    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                substitute(item, inputs, counts);
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values_mut() {
                substitute(item, inputs, counts);
            }
        }
        _ => {}
    }
}

fn count_token(value: &serde_json::Value, token: &str) -> usize {
    match value {
        serde_json::Value::String(s) => usize::from(s == token),
        serde_json::Value::Array(items) => items.iter().map(|v| count_token(v, token)).sum(),
        serde_json::Value::Object(map) => map.values().map(|v| count_token(v, token)).sum(),
        _ => 0,
    }
}
