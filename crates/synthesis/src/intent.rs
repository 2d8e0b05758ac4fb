//! Structured input sent to the synthesis service.

use serde::Serialize;

/// Command tag telling the synthesis workflow which prompt style to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisCommand {
    Portrait,
    Scene,
    VideoMotion,
}

impl SynthesisCommand {
    /// Value of the `cmd` input field.
    pub fn as_str(self) -> &'static str {
        match self {
            SynthesisCommand::Portrait => "portrait",
            SynthesisCommand::Scene => "scene",
            SynthesisCommand::VideoMotion => "video_motion",
        }
    }

    /// Key under `data.outputs` that carries the prompts for this command.
    pub fn output_key(self) -> &'static str {
        match self {
            SynthesisCommand::Portrait | SynthesisCommand::Scene => "result",
            SynthesisCommand::VideoMotion => "content",
        }
    }

    /// The other key, accepted when the expected one is absent.
    pub fn fallback_key(self) -> &'static str {
        match self.output_key() {
            "result" => "content",
            _ => "result",
        }
    }
}

/// Labelled subject attribute such as a role's appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub label: String,
    pub value: String,
}

/// Everything the synthesis service needs for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredIntent {
    pub command: SynthesisCommand,
    /// Free-text intent from the caller.
    pub text: String,
    pub descriptors: Vec<Descriptor>,
}

impl StructuredIntent {
    pub fn new(command: SynthesisCommand, text: impl Into<String>) -> Self {
        Self {
            command,
            text: text.into(),
            descriptors: Vec::new(),
        }
    }

    /// Attach a descriptor. Missing or blank values are skipped.
    pub fn with_descriptor(mut self, label: &str, value: Option<&str>) -> Self {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.descriptors.push(Descriptor {
                label: label.to_string(),
                value: value.to_string(),
            });
        }
        self
    }

    /// Descriptors rendered as `label: value` lines for the `roles` input.
    pub fn descriptor_text(&self) -> String {
        self.descriptors
            .iter()
            .map(|d| format!("{}: {}", d.label, d.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
