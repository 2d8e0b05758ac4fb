//! Workflow template catalog.
//!
//! Templates are loaded once at startup from a directory holding a
//! `catalog.json` index plus one ComfyUI API-format JSON file per
//! workflow. Lookups are keyed by `(category, title)`; each category has
//! a default used when the caller does not pick a template.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::template::WorkflowTemplate;

/// Name of the index file inside the catalog directory.
pub const CATALOG_INDEX_FILE: &str = "catalog.json";

/// Kind of job a workflow performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowCategory {
    TextToImage,
    ImageToVideo,
}

impl WorkflowCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowCategory::TextToImage => "text_to_image",
            WorkflowCategory::ImageToVideo => "image_to_video",
        }
    }
}

/// One entry of `catalog.json`.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    title: String,
    category: WorkflowCategory,
    file: PathBuf,
    #[serde(default)]
    default: bool,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogIndex {
    workflows: Vec<CatalogEntry>,
}

/// Errors raised while loading or querying the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Workflow file {0} must contain a JSON object of nodes")]
    NotAnObject(PathBuf),

    #[error("Duplicate workflow '{title}' in category {category}")]
    Duplicate { title: String, category: &'static str },

    #[error("Unknown workflow '{title}' for category {category}")]
    UnknownTitle { title: String, category: &'static str },

    #[error("No workflow configured for category {0}")]
    EmptyCategory(&'static str),
}

/// Immutable set of loaded workflow templates.
///
/// Cheap to share: templates are held behind `Arc` and handed out by
/// reference count, never mutated after load.
#[derive(Debug, Default)]
pub struct WorkflowCatalog {
    templates: HashMap<(WorkflowCategory, String), Arc<WorkflowTemplate>>,
    /// Titles in load order per category.
    order: HashMap<WorkflowCategory, Vec<String>>,
    defaults: HashMap<WorkflowCategory, String>,
}

impl WorkflowCatalog {
    /// Load `catalog.json` and every workflow file it references.
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        let index_path = dir.join(CATALOG_INDEX_FILE);
        let index: CatalogIndex = read_json(&index_path)?;

        let mut catalog = Self::default();
        for entry in index.workflows {
            let path = dir.join(&entry.file);
            let raw: serde_json::Value = read_json(&path)?;
            let nodes = match raw {
                serde_json::Value::Object(nodes) => nodes,
                _ => return Err(CatalogError::NotAnObject(path)),
            };

            let mut template = WorkflowTemplate::new(entry.title, entry.category, nodes);
            template.version = entry.version;
            catalog.insert(template, entry.default)?;
        }

        tracing::info!(
            dir = %dir.display(),
            count = catalog.templates.len(),
            "Loaded workflow catalog",
        );
        Ok(catalog)
    }

    /// Build a catalog from in-memory templates. The first template of
    /// each category becomes its default.
    pub fn from_templates(
        templates: impl IntoIterator<Item = WorkflowTemplate>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for template in templates {
            catalog.insert(template, false)?;
        }
        Ok(catalog)
    }

    /// Look up a template by exact title.
    pub fn get(&self, category: WorkflowCategory, title: &str) -> Option<Arc<WorkflowTemplate>> {
        self.templates
            .get(&(category, title.to_string()))
            .map(Arc::clone)
    }

    /// Resolve the caller's optional selector to a template.
    ///
    /// `None` (or a blank title) selects the category default.
    pub fn resolve(
        &self,
        category: WorkflowCategory,
        title: Option<&str>,
    ) -> Result<Arc<WorkflowTemplate>, CatalogError> {
        match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => self
                .get(category, title)
                .ok_or_else(|| CatalogError::UnknownTitle {
                    title: title.to_string(),
                    category: category.as_str(),
                }),
            None => self
                .defaults
                .get(&category)
                .and_then(|title| self.get(category, title))
                .ok_or(CatalogError::EmptyCategory(category.as_str())),
        }
    }

    /// Titles available for a category, in catalog order.
    pub fn titles(&self, category: WorkflowCategory) -> Vec<String> {
        self.order.get(&category).cloned().unwrap_or_default()
    }

    /// Title selected when a request names no template.
    pub fn default_title(&self, category: WorkflowCategory) -> Option<&str> {
        self.defaults.get(&category).map(String::as_str)
    }

    /// Total number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn insert(&mut self, template: WorkflowTemplate, is_default: bool) -> Result<(), CatalogError> {
        let category = template.category;
        let key = (category, template.title.clone());
        if self.templates.contains_key(&key) {
            return Err(CatalogError::Duplicate {
                title: template.title,
                category: category.as_str(),
            });
        }

        if is_default || !self.defaults.contains_key(&category) {
            self.defaults.insert(category, template.title.clone());
        }
        self.order
            .entry(category)
            .or_default()
            .push(template.title.clone());
        self.templates.insert(key, Arc::new(template));
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
