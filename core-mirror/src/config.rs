//! # Model Configuration Module
//!
//! Per-collection configuration, supplied at construction time and
//! read-only afterwards.
//!
//! ## Overview
//!
//! A [`ModelConfig`] names the collection, carries the request-execution
//! collaborator, and fixes the field conventions: the identity attribute,
//! the created/updated timestamp attributes, the default fields merged into
//! every locally created entity, and the base route. The builder enforces
//! fail-fast validation so a misconfigured model never gets constructed.
//!
//! ## Usage
//!
//! ```ignore
//! use core_mirror::config::ModelConfig;
//! use std::sync::Arc;
//!
//! let config = ModelConfig::builder()
//!     .name("todos")
//!     .connection(Arc::new(MyConnection))
//!     .default_field("active", serde_json::json!(true))
//!     .build()
//!     .expect("Failed to build model config");
//! ```

use bridge_traits::Connection;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{MirrorError, Result};

pub const DEFAULT_ID_ATTRIBUTE: &str = "id";
pub const DEFAULT_CREATED_ATTRIBUTE: &str = "created_at";
pub const DEFAULT_UPDATED_ATTRIBUTE: &str = "updated_at";

/// Configuration for one collection.
///
/// Use [`ModelConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ModelConfig {
    /// Collection name, used in logs and as the default route segment.
    pub name: String,

    /// Request-execution collaborator (required).
    pub connection: Arc<dyn Connection>,

    /// Field under which entities carry their identity.
    pub id_attribute: String,

    /// Server-managed creation timestamp field, stripped when cloning.
    pub created_attribute: String,

    /// Server-managed update timestamp field, stripped when cloning.
    pub updated_attribute: String,

    /// Fields merged into every locally created entity.
    pub defaults: Map<String, Value>,

    /// Base route for requests; defaults to `/{name}`.
    pub route: String,
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("name", &self.name)
            .field("connection", &"Connection { ... }")
            .field("id_attribute", &self.id_attribute)
            .field("created_attribute", &self.created_attribute)
            .field("updated_attribute", &self.updated_attribute)
            .field("defaults", &self.defaults)
            .field("route", &self.route)
            .finish()
    }
}

impl ModelConfig {
    pub fn builder() -> ModelConfigBuilder {
        ModelConfigBuilder::default()
    }
}

/// Builder for [`ModelConfig`] with fail-fast validation.
#[derive(Default)]
pub struct ModelConfigBuilder {
    name: Option<String>,
    connection: Option<Arc<dyn Connection>>,
    id_attribute: Option<String>,
    created_attribute: Option<String>,
    updated_attribute: Option<String>,
    defaults: Map<String, Value>,
    route: Option<String>,
}

impl ModelConfigBuilder {
    /// Collection name (required, non-empty).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Request-execution collaborator (required).
    pub fn connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Identity field name. Defaults to `"id"`.
    pub fn id_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.id_attribute = Some(attribute.into());
        self
    }

    /// Creation timestamp field name. Defaults to `"created_at"`.
    pub fn created_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.created_attribute = Some(attribute.into());
        self
    }

    /// Update timestamp field name. Defaults to `"updated_at"`.
    pub fn updated_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.updated_attribute = Some(attribute.into());
        self
    }

    /// Replace the whole defaults map. Non-object values are ignored.
    pub fn defaults(mut self, defaults: Value) -> Self {
        if let Value::Object(map) = defaults {
            self.defaults = map;
        }
        self
    }

    /// Add one default field.
    pub fn default_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(key.into(), value);
        self
    }

    /// Base route. Defaults to `/{name}`.
    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::MissingConfig`] when `name` or `connection`
    /// was not provided.
    pub fn build(self) -> Result<ModelConfig> {
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(MirrorError::MissingConfig("name")),
        };
        let connection = self
            .connection
            .ok_or(MirrorError::MissingConfig("connection"))?;
        let route = self.route.unwrap_or_else(|| format!("/{}", name));

        Ok(ModelConfig {
            name,
            connection,
            id_attribute: self
                .id_attribute
                .unwrap_or_else(|| DEFAULT_ID_ATTRIBUTE.to_string()),
            created_attribute: self
                .created_attribute
                .unwrap_or_else(|| DEFAULT_CREATED_ATTRIBUTE.to_string()),
            updated_attribute: self
                .updated_attribute
                .unwrap_or_else(|| DEFAULT_UPDATED_ATTRIBUTE.to_string()),
            defaults: self.defaults,
            route,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::Request;
    use serde_json::json;

    struct NullConnection;

    #[async_trait]
    impl Connection for NullConnection {
        async fn execute(&self, _request: Request) -> bridge_traits::error::Result<Value> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = ModelConfig::builder()
            .name("todos")
            .connection(Arc::new(NullConnection))
            .build()
            .unwrap();

        assert_eq!(config.id_attribute, "id");
        assert_eq!(config.created_attribute, "created_at");
        assert_eq!(config.updated_attribute, "updated_at");
        assert_eq!(config.route, "/todos");
        assert!(config.defaults.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = ModelConfig::builder()
            .name("people")
            .connection(Arc::new(NullConnection))
            .id_attribute("uuid")
            .route("/api/v2/people")
            .default_field("active", json!(true))
            .build()
            .unwrap();

        assert_eq!(config.id_attribute, "uuid");
        assert_eq!(config.route, "/api/v2/people");
        assert_eq!(config.defaults.get("active"), Some(&json!(true)));
    }

    #[test]
    fn test_missing_name_fails() {
        let result = ModelConfig::builder()
            .connection(Arc::new(NullConnection))
            .build();
        assert!(matches!(result, Err(MirrorError::MissingConfig("name"))));

        let result = ModelConfig::builder()
            .name("")
            .connection(Arc::new(NullConnection))
            .build();
        assert!(matches!(result, Err(MirrorError::MissingConfig("name"))));
    }

    #[test]
    fn test_missing_connection_fails() {
        let result = ModelConfig::builder().name("todos").build();
        assert!(matches!(
            result,
            Err(MirrorError::MissingConfig("connection"))
        ));
    }
}
