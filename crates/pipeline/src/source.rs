//! Where the image-to-video service reads its source image from.

use async_trait::async_trait;
use storyforge_comfyui::api::ComfyUIApi;

/// ComfyUI folder that holds finished outputs.
const OUTPUT_FOLDER: &str = "output";

/// Read access to previously generated images.
#[async_trait]
pub trait SourceImageStore: Send + Sync {
    /// Raw bytes of `filename`, or `None` if it cannot be read.
    async fn fetch(&self, filename: &str) -> Option<Vec<u8>>;
}

/// Reads images back from ComfyUI's `/view` endpoint.
///
/// A filename of the form `subfolder/name.png` is split into the
/// `subfolder` and `filename` query parameters.
#[derive(Clone)]
pub struct ComfyUISourceStore {
    api: ComfyUIApi,
}

impl ComfyUISourceStore {
    pub fn new(api: ComfyUIApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SourceImageStore for ComfyUISourceStore {
    async fn fetch(&self, filename: &str) -> Option<Vec<u8>> {
        let (subfolder, name) = filename.rsplit_once('/').unwrap_or(("", filename));
        match self.api.view_file(name, subfolder, OUTPUT_FOLDER).await {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => {
                tracing::warn!(filename, "Source image is empty");
                None
            }
            Err(e) => {
                tracing::warn!(filename, error = %e, "Failed to fetch source image");
                None
            }
        }
    }
}
