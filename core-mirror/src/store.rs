//! # Identity-Indexed Entity Store
//!
//! Single source of truth for what the client currently believes about
//! server-resident entities of one kind.
//!
//! ## Overview
//!
//! The store keeps an ordered sequence of entities (insertion order is the
//! only stable order) plus an identity-to-entity index over it. Adding an
//! entity whose identity is already present does not insert a second copy;
//! it replaces the existing entity's fields in place and hands back the
//! pre-existing reference, so external holders keep observing the one
//! canonical object.
//!
//! ## Invariants
//!
//! - At most one entity with a given identity exists in the sequence.
//! - Every index entry is reference-identical to the entity holding that
//!   identity in the sequence; identity-less entities have no index entry.
//! - An entity gaining an identity (a create response being reconciled) is
//!   indexed atomically with the content swap; readers never observe an
//!   identified entity with a stale or absent index entry.
//!
//! Every mutation raises `change` followed by the specific `add`, `update`,
//! or `remove` event through the [`ListenerRouter`], outside the store lock.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::entity::{Entity, EntityRef};
use crate::error::{MirrorError, Result};
use crate::events::{EventKind, ListenerRouter, Payload};
use crate::identity::{identity_of, IdValue};

struct StoreInner {
    data: Vec<EntityRef>,
    by_id: HashMap<IdValue, EntityRef>,
}

/// Ordered, identity-indexed collection of entities.
pub struct Store {
    name: String,
    id_attribute: String,
    router: ListenerRouter,
    inner: Mutex<StoreInner>,
}

impl Store {
    pub fn new(
        name: impl Into<String>,
        id_attribute: impl Into<String>,
        router: ListenerRouter,
    ) -> Self {
        Self {
            name: name.into(),
            id_attribute: id_attribute.into(),
            router,
            inner: Mutex::new(StoreInner {
                data: Vec::new(),
                by_id: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("store lock poisoned")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    pub fn router(&self) -> &ListenerRouter {
        &self.router
    }

    /// Snapshot of the ordered sequence.
    pub fn data(&self) -> Vec<EntityRef> {
        self.lock().data.clone()
    }

    /// Snapshot of the identity index.
    pub fn by_id(&self) -> HashMap<IdValue, EntityRef> {
        self.lock().by_id.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().data.is_empty()
    }

    /// Index lookup by identity.
    pub fn find_by_id(&self, id: &IdValue) -> Option<EntityRef> {
        self.lock().by_id.get(id).cloned()
    }

    /// First entity whose fields contain every field of `probe` with an
    /// equal value.
    pub fn find_where(&self, probe: &Map<String, Value>) -> Option<EntityRef> {
        self.lock()
            .data
            .iter()
            .find(|e| e.matches(probe))
            .cloned()
    }

    /// Drop any index entries pointing at `entity`, then index it under the
    /// identity it currently carries, if any. Callers hold the lock.
    fn reindex(&self, inner: &mut StoreInner, entity: &EntityRef) {
        inner.by_id.retain(|_, indexed| !Entity::same(indexed, entity));
        if let Some(id) = identity_of(entity, &self.id_attribute) {
            inner.by_id.insert(id, entity.clone());
        }
    }

    /// Add `entity` to the store, or fold it into the entity already
    /// holding the same identity (or the same reference).
    ///
    /// When an existing entity is found and is not reference-identical, its
    /// fields are overwritten in place with the incoming fields (a REPLACE:
    /// fields absent from the incoming entity are removed) and it is
    /// re-indexed. Raises `change` then `update` for an existing entity,
    /// `change` then `add` for a new one. Returns the canonical reference.
    pub fn upsert(&self, entity: &EntityRef) -> EntityRef {
        let (canonical, event) = {
            let mut inner = self.lock();
            let identity = identity_of(entity, &self.id_attribute);
            let existing = identity
                .as_ref()
                .and_then(|id| inner.by_id.get(id).cloned())
                .or_else(|| {
                    inner
                        .data
                        .iter()
                        .find(|e| Entity::same(e, entity))
                        .cloned()
                });

            match existing {
                Some(existing) => {
                    if !Entity::same(&existing, entity) {
                        existing.replace_with(&entity.snapshot());
                    }
                    self.reindex(&mut inner, &existing);
                    (existing, EventKind::Update)
                }
                None => {
                    inner.data.push(entity.clone());
                    if let Some(id) = identity {
                        inner.by_id.insert(id, entity.clone());
                    }
                    (entity.clone(), EventKind::Add)
                }
            }
        };

        debug!(
            store = %self.name,
            event = %event,
            "entity upserted"
        );
        self.emit(event, &canonical);
        canonical
    }

    /// Wrap a raw field map in a fresh entity and [`Store::upsert`] it.
    pub fn upsert_record(&self, fields: Map<String, Value>) -> EntityRef {
        self.upsert(&Entity::new(fields))
    }

    /// Reconcile a decoded response body into the store.
    ///
    /// A sequence response upserts each keyed element (non-keyed elements
    /// are skipped; local state is advisory, not authoritative). A keyed
    /// response upserts the single record. Anything else is an unexpected
    /// shape.
    pub fn merge_response(&self, body: Value) -> Result<Vec<EntityRef>> {
        match body {
            Value::Array(items) => {
                let merged: Vec<EntityRef> = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(fields) => Some(self.upsert_record(fields)),
                        _ => None,
                    })
                    .collect();
                debug!(store = %self.name, count = merged.len(), "response merged");
                Ok(merged)
            }
            Value::Object(fields) => Ok(vec![self.upsert_record(fields)]),
            other => Err(MirrorError::UnexpectedResponse(format!(
                "expected object or array, got {}",
                match other {
                    Value::Null => "null",
                    Value::Bool(_) => "a boolean",
                    Value::Number(_) => "a number",
                    Value::String(_) => "a string",
                    _ => "an unexpected value",
                }
            ))),
        }
    }

    /// Swap `entity`'s contents for `source` and re-index, atomically.
    ///
    /// This is the persistence-response path: a create response introduces
    /// an identity, and the index entry must appear together with the new
    /// fields. Raises `change` then `update` when the entity is held by the
    /// store; an entity no longer in the store still gets its contents
    /// swapped (aliases observe the response) but raises nothing.
    pub fn reconcile(&self, entity: &EntityRef, source: &Map<String, Value>) {
        let present = {
            let mut inner = self.lock();
            entity.replace_with(source);
            let present = inner.data.iter().any(|e| Entity::same(e, entity));
            if present {
                self.reindex(&mut inner, entity);
            }
            present
        };

        if present {
            self.emit(EventKind::Update, entity);
        }
    }

    /// Remove `entity` by reference or identity. An absent entity is a
    /// silent no-op; the input reference is returned either way.
    pub fn remove(&self, entity: &EntityRef) -> EntityRef {
        let removed = {
            let mut inner = self.lock();
            let position = inner.data.iter().position(|e| {
                Entity::same(e, entity)
                    || matches!(
                        (
                            identity_of(e, &self.id_attribute),
                            identity_of(entity, &self.id_attribute),
                        ),
                        (Some(a), Some(b)) if a == b
                    )
            });
            position.map(|index| {
                let removed = inner.data.remove(index);
                inner.by_id.retain(|_, e| !Entity::same(e, &removed));
                removed
            })
        };

        if let Some(removed) = removed {
            debug!(store = %self.name, "entity removed");
            self.emit(EventKind::Remove, &removed);
            removed
        } else {
            entity.clone()
        }
    }

    /// Remove by identity. Returns the removed entity, if one was held.
    pub fn remove_by_id(&self, id: &IdValue) -> Option<EntityRef> {
        let entity = self.find_by_id(id)?;
        Some(self.remove(&entity))
    }

    /// Remove every entity, one at a time, in reverse insertion order.
    pub fn empty(&self) {
        let drained = {
            let mut inner = self.lock();
            inner.by_id.clear();
            let mut drained = Vec::with_capacity(inner.data.len());
            while let Some(entity) = inner.data.pop() {
                drained.push(entity);
            }
            drained
        };

        debug!(store = %self.name, count = drained.len(), "store emptied");
        for entity in &drained {
            self.emit(EventKind::Remove, entity);
        }
    }

    fn emit(&self, event: EventKind, entity: &EntityRef) {
        let payload = Payload::Entity(entity.clone());
        self.router.trigger(EventKind::Change, &payload);
        self.router.trigger(event, &payload);
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("id_attribute", &self.id_attribute)
            .field("len", &inner.data.len())
            .field("indexed", &inner.by_id.len())
            .finish()
    }
}
