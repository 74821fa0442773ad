use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::TemplateDescriptor;

pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Default, Deserialize)]
struct Index {
    #[serde(default)]
    templates: Vec<TemplateDescriptor>,
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    dir: PathBuf,
    templates: Vec<TemplateDescriptor>,
}

impl Catalog {
    /// Loads `dir/index.json`. A directory without an index is an empty catalog.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let index_path = dir.join(INDEX_FILE);
        if !index_path.exists() {
            log::debug!("{} not found, catalog is empty", index_path.display());
            return Ok(Catalog {
                dir,
                templates: Vec::new(),
            });
        }
        let text = std::fs::read_to_string(&index_path)?;
        Self::from_json(dir, &text)
    }

    pub fn from_json(dir: impl Into<PathBuf>, json: &str) -> Result<Self> {
        let index: Index = serde_json::from_str(json)
            .map_err(|e| Error::Catalog(format!("invalid {INDEX_FILE}: {e}")))?;
        Ok(Catalog {
            dir: dir.into(),
            templates: index.templates,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn templates(&self) -> &[TemplateDescriptor] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Result<&TemplateDescriptor> {
        self.templates
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::Catalog(format!("no template with id '{id}'")))
    }

    pub fn template_path(&self, descriptor: &TemplateDescriptor) -> PathBuf {
        if descriptor.path.is_absolute() {
            descriptor.path.clone()
        } else {
            self.dir.join(&descriptor.path)
        }
    }
}
