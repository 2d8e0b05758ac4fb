//! Parser for ComfyUI `/history/{prompt_id}` responses.
//!
//! The body is a map keyed by prompt id:
//!
//! ```json
//! { "<prompt_id>": {
//!     "status": { "status_str": "success", "completed": true, "messages": [...] },
//!     "outputs": { "<node_id>": { "images": [{ "filename": "...", "subfolder": "", "type": "output" }] } }
//! } }
//! ```
//!
//! A missing key means the prompt is still queued.

use std::collections::HashSet;

use serde::Deserialize;
use storyforge_core::media::{has_video_extension, MediaKind};

/// Output lists whose entries are always video.
const VIDEO_LISTS: &[&str] = &["videos", "gifs"];
/// All output lists scanned, images first.
const OUTPUT_LISTS: &[&str] = &["images", "videos", "gifs"];
/// Folder type of preview files, which are not results.
const TEMP_FOLDER: &str = "temp";

/// A file produced by a finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedOutput {
    pub filename: String,
    pub subfolder: String,
    pub kind: MediaKind,
}

/// State of one job as seen in a single history response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// The job id is not in the history yet.
    Queued,
    /// Present but neither succeeded nor failed.
    Running,
    Succeeded(Vec<GeneratedOutput>),
    /// Terminal failure with the execution error text, when ComfyUI gave one.
    Failed(Option<String>),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded(_) | JobState::Failed(_))
    }
}

#[derive(Debug, Default, Deserialize)]
struct HistoryStatus {
    #[serde(default)]
    status_str: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    messages: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OutputFile {
    filename: String,
    #[serde(default)]
    subfolder: String,
    #[serde(rename = "type", default)]
    folder_type: Option<String>,
}

/// Classify the entry for `job_id` in a history body.
pub fn job_state(history: &serde_json::Value, job_id: &str) -> JobState {
    let Some(entry) = history.get(job_id) else {
        return JobState::Queued;
    };

    let status: HistoryStatus = entry
        .get("status")
        .and_then(|s| serde_json::from_value(s.clone()).ok())
        .unwrap_or_default();

    match status.status_str.as_deref() {
        Some("error") | Some("failed") => JobState::Failed(execution_error(&status.messages)),
        Some("success") | Some("completed") => JobState::Succeeded(extract_outputs(entry)),
        _ if status.completed => JobState::Succeeded(extract_outputs(entry)),
        _ => JobState::Running,
    }
}

/// Collect the produced files of a history entry, deduplicated by filename.
pub fn extract_outputs(entry: &serde_json::Value) -> Vec<GeneratedOutput> {
    let Some(nodes) = entry.get("outputs").and_then(|o| o.as_object()) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut outputs = Vec::new();

    for node in nodes.values() {
        for list in OUTPUT_LISTS {
            let Some(files) = node.get(*list).and_then(|f| f.as_array()) else {
                continue;
            };
            for file in files {
                let Ok(file) = serde_json::from_value::<OutputFile>(file.clone()) else {
                    continue;
                };
                if file.folder_type.as_deref() == Some(TEMP_FOLDER) {
                    continue;
                }
                if !seen.insert(file.filename.clone()) {
                    continue;
                }

                let kind = if VIDEO_LISTS.contains(list) || has_video_extension(&file.filename) {
                    MediaKind::Video
                } else {
                    MediaKind::Image
                };
                outputs.push(GeneratedOutput {
                    filename: file.filename,
                    subfolder: file.subfolder,
                    kind,
                });
            }
        }
    }

    outputs
}

/// Pull the message out of an `["execution_error", {...}]` status entry.
fn execution_error(messages: &[serde_json::Value]) -> Option<String> {
    messages.iter().find_map(|message| {
        let pair = message.as_array()?;
        if pair.first()?.as_str()? != "execution_error" {
            return None;
        }
        let data = pair.get(1)?;
        let text = data
            .get("exception_message")
            .or_else(|| data.get("message"))?
            .as_str()?
            .trim();
        match data.get("node_type").and_then(|n| n.as_str()) {
            Some(node) => Some(format!("{node}: {text}")),
            None => Some(text.to_string()),
        }
    })
}
