//! On-disk store for requirements and generated definitions

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::document::SpecDocument;
use crate::error::{Result, SpecloopError};

/// File name of the saved interview output
pub const REQUIREMENTS_FILE: &str = "api-requirements.md";

/// File name of a saved definition inside its API directory
pub const DEFINITION_FILE: &str = "swagger.yaml";

/// Directory-backed store rooted at `storage.requirements_dir`.
///
/// Layout:
/// ```text
/// <root>/api-requirements.md
/// <root>/<api_name>/swagger.yaml
/// ```
#[derive(Debug, Clone)]
pub struct SpecStore {
    root: PathBuf,
}

impl SpecStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save the requirements Markdown and return a `file://` URL to it
    pub fn save_requirements(&self, markdown: &str) -> Result<String> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(REQUIREMENTS_FILE);
        fs::write(&path, markdown)?;
        log::info!("Saved requirements to {}", path.display());
        Ok(file_url(&path))
    }

    /// Save a definition under `<api_name>/swagger.yaml` and return the path.
    /// Separators in the name are flattened, see [`definition_dir`].
    pub fn save_definition(&self, api_name: &str, document: &SpecDocument) -> Result<PathBuf> {
        let dir = self.root.join(definition_dir(api_name)?);
        fs::create_dir_all(&dir)?;
        let path = dir.join(DEFINITION_FILE);
        fs::write(&path, document.as_str())?;
        log::info!("Saved definition for '{}' to {}", api_name, path.display());
        Ok(path)
    }

    /// Read a stored text file
    pub fn load(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        fs::read_to_string(path)
            .map_err(|e| SpecloopError::Storage(format!("Failed to read {}: {}", path.display(), e)))
    }
}

/// API names become one directory level: path separators turn into `_`,
/// and names that still do not form a plain directory (`""`, `.`, `..`) are refused
pub fn definition_dir(api_name: &str) -> Result<String> {
    let flattened = api_name.replace(['/', '\\'], "_");
    let mut components = Path::new(&flattened).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(flattened),
        _ => Err(SpecloopError::Storage(format!("Invalid API name: '{}'", api_name))),
    }
}

fn file_url(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };
    format!("file://{}", absolute.display())
}
