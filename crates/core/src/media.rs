//! Media kind classification for generated files.

use serde::{Deserialize, Serialize};

/// File extensions treated as video output.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv", "avi", "gif"];

/// Kind of a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Stable lowercase name stored in `generated_artifacts.media_kind`.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Parse a stored `media_kind` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    /// Classify a file by its extension alone (case-insensitive).
    pub fn from_filename(filename: &str) -> Self {
        if has_video_extension(filename) {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }
}

/// `true` when the filename ends in one of [`VIDEO_EXTENSIONS`].
pub fn has_video_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
