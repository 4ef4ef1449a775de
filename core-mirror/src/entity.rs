//! Open-field entities.
//!
//! An [`Entity`] is one record of a collection: an open-ended mapping of
//! field names to JSON values with an optional, configurable identity
//! field. Entities are shared by reference ([`EntityRef`]) and mutated in
//! place, so every holder of a reference observes reconciliation results
//! without re-fetching anything. The store never replaces an entity object
//! once a matching one exists; it swaps its contents instead (see
//! [`crate::merge`]).

use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::merge;

/// Shared handle to an entity. Reference identity (`Arc::ptr_eq`) is the
/// cache's notion of "the same object".
pub type EntityRef = Arc<Entity>;

/// One record in a collection.
pub struct Entity {
    fields: RwLock<Map<String, Value>>,
}

impl Entity {
    /// Create an entity from a field map.
    pub fn new(fields: Map<String, Value>) -> EntityRef {
        Arc::new(Self {
            fields: RwLock::new(fields),
        })
    }

    /// Create an entity from a JSON value. Non-object values produce an
    /// entity with no fields.
    pub fn from_fields(value: Value) -> EntityRef {
        match value {
            Value::Object(map) => Self::new(map),
            _ => Self::new(Map::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Map<String, Value>> {
        self.fields.read().expect("entity lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Map<String, Value>> {
        self.fields.write().expect("entity lock poisoned")
    }

    /// Read a single field.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    /// Write a single field.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.write().insert(key.into(), value);
    }

    /// Merge `props` over the current fields. Unlike [`Entity::replace_with`]
    /// this keeps fields absent from `props`.
    pub fn extend(&self, props: &Map<String, Value>) {
        let mut fields = self.write();
        for (key, value) in props {
            fields.insert(key.clone(), value.clone());
        }
    }

    /// Remove a single field, returning its previous value.
    pub fn remove_field(&self, key: &str) -> Option<Value> {
        self.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// A point-in-time copy of the fields.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.read().clone()
    }

    /// The fields as a JSON object value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.snapshot())
    }

    /// Replace the entity's contents with `source`, in place. Aliases of
    /// this entity observe the new fields; fields absent from `source` are
    /// removed.
    pub fn replace_with(&self, source: &Map<String, Value>) {
        merge::replace_map(&mut self.write(), source);
    }

    /// Whether every field of `probe` is present with an equal value.
    pub fn matches(&self, probe: &Map<String, Value>) -> bool {
        let fields = self.read();
        probe.iter().all(|(key, value)| fields.get(key) == Some(value))
    }

    /// Reference identity: are these handles the same object?
    pub fn same(a: &EntityRef, b: &EntityRef) -> bool {
        Arc::ptr_eq(a, b)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Entity").field(&*self.read()).finish()
    }
}
