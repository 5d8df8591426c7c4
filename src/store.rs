//! Model store - bundle loading, path-keyed cache and the registry

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ModelError;
use crate::models::ModelBundle;

/// Loads bundles once per path and hands out shared references
#[derive(Default)]
pub struct ModelStore {
    cache: RwLock<HashMap<PathBuf, Arc<ModelBundle>>>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a bundle, or return the cached one for this path
    pub fn load(&self, path: &Path) -> Result<Arc<ModelBundle>, ModelError> {
        if let Some(bundle) = self.cache.read().get(path) {
            return Ok(Arc::clone(bundle));
        }

        // Parsing happens outside the lock; a concurrent first load of the
        // same path keeps whichever bundle was inserted first.
        let bundle = Arc::new(ModelBundle::from_file(path)?);
        let mut cache = self.cache.write();
        let entry = cache.entry(path.to_path_buf()).or_insert(bundle);
        Ok(Arc::clone(entry))
    }

    /// Build the registry for the configured models. Never fails: missing or
    /// broken bundles become warnings and are left out.
    pub fn load_all(&self, paths: &[(String, PathBuf)]) -> ModelRegistry {
        let mut entries = Vec::with_capacity(paths.len());
        let mut warnings = Vec::new();

        for (name, path) in paths {
            if !path.exists() {
                tracing::warn!("Model {} not found at path: {}", name, path.display());
                warnings.push(format!("Model {} not found at path: {}", name, path.display()));
                continue;
            }

            match self.load(path) {
                Ok(bundle) => {
                    tracing::info!(
                        "Loaded model {} ({}, {} classes, {} features, evaluation: {})",
                        name,
                        bundle.model.kind(),
                        bundle.model.classes().len(),
                        bundle.vectorizer.n_features(),
                        bundle.evaluation.is_some()
                    );
                    entries.push(RegisteredModel {
                        name: name.clone(),
                        bundle,
                    });
                }
                Err(e) => {
                    tracing::warn!("Model {} could not be loaded from {}: {}", name, path.display(), e);
                    warnings.push(format!("Model {} could not be loaded: {}", name, e));
                }
            }
        }

        ModelRegistry { entries, warnings }
    }

    #[cfg(test)]
    pub fn cached_paths(&self) -> usize {
        self.cache.read().len()
    }
}

pub struct RegisteredModel {
    pub name: String,
    pub bundle: Arc<ModelBundle>,
}

/// Loaded models in display order, plus the warnings produced while loading
pub struct ModelRegistry {
    entries: Vec<RegisteredModel>,
    warnings: Vec<String>,
}

impl ModelRegistry {
    #[cfg(test)]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredModel> {
        self.entries.iter()
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&RegisteredModel> {
        self.entries.iter().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
