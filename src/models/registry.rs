//! Model registry
//!
//! Maps logical model keys to backend descriptors. Built once from the
//! configuration at startup and never mutated afterwards, so handlers share
//! it behind an `Arc` without locking.

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::wire::WireShape;
use std::collections::{BTreeMap, HashMap};

/// Where and how to reach the backend serving one logical model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    key: String,
    base_url: String,
    shape: WireShape,
    backend_model: String,
}

impl BackendDescriptor {
    pub fn new(
        key: impl Into<String>,
        base_url: impl Into<String>,
        shape: WireShape,
        backend_model: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            base_url: base_url.into(),
            shape,
            backend_model: backend_model.into(),
        }
    }

    /// Logical key callers use
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn shape(&self) -> WireShape {
        self.shape
    }

    /// Model identifier sent to the backend
    pub fn backend_model(&self) -> &str {
        &self.backend_model
    }

    /// Full URL of the generation endpoint for this descriptor's shape
    pub fn generation_url(&self) -> String {
        format!("{}{}", self.base_url, self.shape.path())
    }

    /// Full URL of the backend's list-models endpoint
    pub fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }
}

/// Immutable key → descriptor map preserving configuration order
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entries: Vec<BackendDescriptor>,
    index: HashMap<String, usize>,
}

impl ModelRegistry {
    /// Build a registry from descriptors
    ///
    /// Later duplicates of a key are ignored; `Config::validate` rejects
    /// duplicates before this point.
    pub fn new(descriptors: impl IntoIterator<Item = BackendDescriptor>) -> Self {
        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for descriptor in descriptors {
            if index.contains_key(descriptor.key()) {
                continue;
            }
            index.insert(descriptor.key().to_string(), entries.len());
            entries.push(descriptor);
        }
        Self { entries, index }
    }

    pub fn from_config(config: &Config) -> Self {
        let registry = Self::new(config.models.iter().map(|m| {
            BackendDescriptor::new(m.key(), m.base_url(), m.shape(), m.backend_model())
        }));

        tracing::info!(
            models = ?registry.keys().collect::<Vec<_>>(),
            "Model registry initialized"
        );

        registry
    }

    pub fn get(&self, key: &str) -> Option<&BackendDescriptor> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Resolve a key or fail with the full set of valid keys
    pub fn resolve(&self, key: &str) -> AppResult<&BackendDescriptor> {
        self.get(key).ok_or_else(|| AppError::ModelNotConfigured {
            model: key.to_string(),
            available: self.keys().map(str::to_string).collect(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in configuration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|d| d.key())
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.entries.iter()
    }

    /// Logical key → backend model id
    pub fn mapping(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|d| (d.key().to_string(), d.backend_model().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
