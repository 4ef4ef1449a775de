//! Model registry.
//!
//! Collections are registered on an explicit registry owned by the
//! embedding application and threaded to whoever needs lookups by name.
//! Nothing here is global; two registries are two independent caches.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

use crate::config::ModelConfig;
use crate::error::{MirrorError, Result};
use crate::model::Model;

/// Named collection of [`Model`]s.
#[derive(Default)]
pub struct Registry {
    models: RwLock<HashMap<String, Arc<Model>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a model from `config` and register it under its name.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::DuplicateModel`] when a model with the same
    /// name is already registered.
    pub fn register(&self, config: ModelConfig) -> Result<Arc<Model>> {
        let mut models = self.models.write().expect("registry lock poisoned");
        if models.contains_key(&config.name) {
            return Err(MirrorError::DuplicateModel(config.name));
        }

        let name = config.name.clone();
        let model = Arc::new(Model::new(config));
        models.insert(name.clone(), model.clone());
        info!(model = %name, "model registered");
        Ok(model)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Model>> {
        self.models
            .read()
            .expect("registry lock poisoned")
            .get(name)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .models
            .read()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.models.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("models", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{Connection, Request};
    use serde_json::Value;

    struct NullConnection;

    #[async_trait]
    impl Connection for NullConnection {
        async fn execute(&self, _request: Request) -> bridge_traits::error::Result<Value> {
            Ok(Value::Null)
        }
    }

    fn config(name: &str) -> ModelConfig {
        ModelConfig::builder()
            .name(name)
            .connection(Arc::new(NullConnection))
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let registry = Registry::new();
        let model = registry.register(config("todos")).unwrap();

        let found = registry.get("todos").unwrap();
        assert!(Arc::ptr_eq(&model, &found));
        assert!(registry.get("people").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = Registry::new();
        registry.register(config("todos")).unwrap();

        assert!(matches!(
            registry.register(config("todos")),
            Err(MirrorError::DuplicateModel(name)) if name == "todos"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_sorted() {
        let registry = Registry::new();
        registry.register(config("people")).unwrap();
        registry.register(config("todos")).unwrap();

        assert_eq!(registry.names(), vec!["people", "todos"]);
    }

    #[test]
    fn test_registries_are_independent() {
        let a = Registry::new();
        let b = Registry::new();
        a.register(config("todos")).unwrap();

        assert!(b.is_empty());
        assert!(b.get("todos").is_none());
    }
}
