//! Process-wide table of built-in models, populated once on first use.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::analytic::{Bazin, ConstantMagnitude, ExponentialDecay, PowerLaw};
use super::{ModelError, TransientModel};

/// Immutable name → model lookup
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<dyn TransientModel>>,
}

impl ModelRegistry {
    fn from_models(models: Vec<Arc<dyn TransientModel>>) -> Self {
        Self {
            models: models
                .into_iter()
                .map(|model| (model.name().to_string(), model))
                .collect(),
        }
    }

    /// Registry holding every built-in model
    pub fn builtin() -> &'static ModelRegistry {
        &BUILTIN_MODELS
    }

    /// Look up a model by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn TransientModel>, ModelError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownModel {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    /// Registered model names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

static BUILTIN_MODELS: Lazy<ModelRegistry> = Lazy::new(|| {
    ModelRegistry::from_models(vec![
        Arc::new(ConstantMagnitude),
        Arc::new(PowerLaw),
        Arc::new(Bazin),
        Arc::new(ExponentialDecay),
    ])
});

/// Resolve a built-in model by name
pub fn resolve(name: &str) -> Result<Arc<dyn TransientModel>, ModelError> {
    ModelRegistry::builtin().get(name)
}
