//! Model loading progress.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-model loading flags.
///
/// Written during the startup phase only; request handlers receive
/// clones and never mutate one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadingProgress {
    models: BTreeMap<String, bool>,
}

impl LoadingProgress {
    /// Create a progress map with every model marked as not loaded.
    pub fn new<I, S>(model_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models: model_names.into_iter().map(|n| (n.into(), false)).collect(),
        }
    }

    /// Mark one model as loaded. Unknown names are inserted rather than
    /// dropped so late-registered models still show up.
    pub fn mark_loaded(&mut self, name: &str) {
        self.models.insert(name.to_string(), true);
    }

    /// True when every tracked model has finished loading.
    pub fn all_loaded(&self) -> bool {
        !self.models.is_empty() && self.models.values().all(|loaded| *loaded)
    }

    /// Model names, in stable order.
    pub fn model_names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }
}
