//! Identity resolution for open-field entities.
//!
//! An entity is considered *persisted* once it carries a usable value under
//! the configured identity attribute; until then it is local-only. Identity
//! values are the only entity fields the cache ever interprets, so they get
//! a dedicated hashable representation here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::entity::Entity;

/// A hashable identity key distilled from a JSON field value.
///
/// Servers hand out either numeric or string identifiers; anything else
/// (null, booleans, containers) does not qualify as an identity and leaves
/// the entity in its "new" state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Int(i64),
    Str(String),
}

impl IdValue {
    /// Distill an identity key from a raw field value, if it qualifies.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    /// The JSON representation of this identity.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::from(*i),
            Self::Str(s) => Value::from(s.clone()),
        }
    }
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for IdValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for IdValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for IdValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Resolve the identity an entity currently carries under `id_attribute`.
pub fn identity_of(entity: &Entity, id_attribute: &str) -> Option<IdValue> {
    entity
        .get(id_attribute)
        .as_ref()
        .and_then(IdValue::from_value)
}

/// Whether the entity has never been persisted (no usable identity yet).
pub fn is_new(entity: &Entity, id_attribute: &str) -> bool {
    identity_of(entity, id_attribute).is_none()
}
