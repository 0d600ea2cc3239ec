//! Model loader and registry
//!
//! - One descriptor per `<models_dir>/<name>.json` file
//! - Descriptors are immutable once registered
//! - Malformed files abort loading; descriptor defects are only warnings

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{ModelError, ModelResult};
use super::types::ModelDescriptor;
use crate::observability::{log_event_with_fields, Event};
use crate::validation::ConfigWarning;

/// Loads model descriptors from disk and keeps them by name.
pub struct ModelLoader {
    models_dir: PathBuf,
    models: BTreeMap<String, ModelDescriptor>,
    warnings: Vec<ConfigWarning>,
}

impl ModelLoader {
    /// Creates a loader reading from `models_dir`.
    pub fn new(models_dir: &Path) -> Self {
        Self {
            models_dir: models_dir.to_path_buf(),
            models: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Loads every `*.json` file in the models directory.
    ///
    /// A missing directory loads nothing.
    pub fn load_all(&mut self) -> ModelResult<()> {
        if !self.models_dir.exists() {
            return Ok(());
        }

        let entries = fs::read_dir(&self.models_dir).map_err(|e| {
            ModelError::malformed_model(
                self.models_dir.display().to_string(),
                format!("Failed to read models directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                ModelError::malformed_model(
                    self.models_dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        // Deterministic registration order
        paths.sort();

        for path in paths {
            self.load_model_file(&path)?;
        }

        let count = self.models.len().to_string();
        let warnings = self.warnings.len().to_string();
        log_event_with_fields(
            Event::ModelsLoaded,
            &[("count", count.as_str()), ("warnings", warnings.as_str())],
        );

        Ok(())
    }

    fn load_model_file(&mut self, path: &Path) -> ModelResult<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            ModelError::malformed_model(path.display().to_string(), format!("Failed to read file: {}", e))
        })?;

        let model: ModelDescriptor = serde_json::from_str(&content).map_err(|e| {
            ModelError::malformed_model(path.display().to_string(), format!("Invalid descriptor: {}", e))
        })?;

        self.register(model)
    }

    /// Registers a descriptor directly.
    ///
    /// Lint warnings are logged and kept for [`ModelLoader::warnings`].
    pub fn register(&mut self, model: ModelDescriptor) -> ModelResult<()> {
        if self.models.contains_key(&model.name) {
            return Err(ModelError::model_immutable(&model.name));
        }

        for warning in model.lint() {
            let path = warning.path.clone().unwrap_or_default();
            log_event_with_fields(
                Event::ModelWarning,
                &[
                    ("model", warning.model.as_str()),
                    ("path", path.as_str()),
                    ("message", warning.message.as_str()),
                ],
            );
            self.warnings.push(warning);
        }

        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.get(name)
    }

    /// Gets a model or fails with `DOCGATE_UNKNOWN_MODEL`
    pub fn require(&self, name: &str) -> ModelResult<&ModelDescriptor> {
        self.get(name).ok_or_else(|| ModelError::unknown_model(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered models in name order
    pub fn all_models(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.values()
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Descriptor defects found while registering
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }
}
