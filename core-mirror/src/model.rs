//! # Model Lifecycle Orchestration
//!
//! Composes the store, the pending queues, the route templates, and the
//! request-execution collaborator into the public lifecycle of one
//! collection.
//!
//! ## Overview
//!
//! Local mutations (`create`, `set`, `add`, `remove`, `clone_entity`) are
//! synchronous, infallible, and optimistic: they update the store
//! immediately and enqueue the affected entities for persistence.
//! Persistence (`fetch`, `save`, `destroy`, `reset`, `sync`) is
//! asynchronous and reconciles server responses back into the store in
//! place, so references handed out earlier stay current.
//!
//! ## Overlap
//!
//! Overlapping persistence calls on one entity are not serialized; the
//! last response to reconcile wins. Callers wanting strict ordering await
//! one call before issuing the next.

use futures::future::join;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::entity::{Entity, EntityRef};
use crate::error::{MirrorError, Result};
use crate::events::{EventKind, ListenerRouter, Payload, Subscription};
use crate::identity::{identity_of, is_new, IdValue};
use crate::pending::PendingQueue;
use crate::routes::RouteSet;
use crate::store::Store;

/// One collection's public surface.
pub struct Model {
    config: ModelConfig,
    routes: RouteSet,
    store: Store,
    save_queue: PendingQueue,
    destroy_queue: PendingQueue,
}

impl Model {
    pub fn new(config: ModelConfig) -> Self {
        let router = ListenerRouter::new(config.id_attribute.clone());
        let store = Store::new(
            config.name.clone(),
            config.id_attribute.clone(),
            router,
        );
        let routes = RouteSet::new(config.route.clone());
        Self {
            config,
            routes,
            store,
            save_queue: PendingQueue::new("save"),
            destroy_queue: PendingQueue::new("destroy"),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn save_queue(&self) -> &PendingQueue {
        &self.save_queue
    }

    pub fn destroy_queue(&self) -> &PendingQueue {
        &self.destroy_queue
    }

    // =========================================================================
    // Read views
    // =========================================================================

    /// Snapshot of the ordered sequence.
    pub fn data(&self) -> Vec<EntityRef> {
        self.store.data()
    }

    /// Snapshot of the identity index.
    pub fn by_id(&self) -> HashMap<IdValue, EntityRef> {
        self.store.by_id()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn find_by_id(&self, id: &IdValue) -> Option<EntityRef> {
        self.store.find_by_id(id)
    }

    /// First entity structurally matching `probe`.
    pub fn find_where(&self, probe: &Map<String, Value>) -> Option<EntityRef> {
        self.store.find_where(probe)
    }

    /// The identity `entity` currently carries, if any.
    pub fn id_of(&self, entity: &EntityRef) -> Option<IdValue> {
        identity_of(entity, &self.config.id_attribute)
    }

    /// Whether `entity` has never been persisted.
    pub fn is_new(&self, entity: &EntityRef) -> bool {
        is_new(entity, &self.config.id_attribute)
    }

    // =========================================================================
    // Local mutation
    // =========================================================================

    /// Create a local entity: `attrs` merged over the configured defaults,
    /// added to the store, and queued for save. Returns the canonical
    /// reference.
    pub fn create(&self, attrs: Value) -> EntityRef {
        let mut fields = self.config.defaults.clone();
        if let Value::Object(attrs) = attrs {
            for (key, value) in attrs {
                fields.insert(key, value);
            }
        }
        self.add(&Entity::new(fields))
    }

    /// Merge `props` into `entity`, then route through [`Model::add`].
    pub fn set(&self, entity: &EntityRef, props: &Map<String, Value>) -> EntityRef {
        entity.extend(props);
        self.add(entity)
    }

    /// Add `entity` to the store (folding into any same-identity entity)
    /// and queue the canonical reference for save.
    pub fn add(&self, entity: &EntityRef) -> EntityRef {
        let canonical = self.store.upsert(entity);
        self.save_queue.add(&canonical);
        canonical
    }

    pub fn add_all(&self, entities: &[EntityRef]) -> Vec<EntityRef> {
        entities.iter().map(|e| self.add(e)).collect()
    }

    /// Remove `entity` from the store and queue it for destroy. An absent
    /// entity is a no-op locally but still returned and queued.
    pub fn remove(&self, entity: &EntityRef) -> EntityRef {
        let removed = self.store.remove(entity);
        self.destroy_queue.add(&removed);
        removed
    }

    pub fn remove_all(&self, entities: &[EntityRef]) -> Vec<EntityRef> {
        entities.iter().map(|e| self.remove(e)).collect()
    }

    /// Shallow-copy `entity`, strip its identity and timestamp fields, and
    /// [`Model::create`] the copy as a brand-new local entity.
    pub fn clone_entity(&self, entity: &EntityRef) -> EntityRef {
        let mut fields = entity.snapshot();
        fields.remove(&self.config.id_attribute);
        fields.remove(&self.config.created_attribute);
        fields.remove(&self.config.updated_attribute);
        self.create(Value::Object(fields))
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Fetch the full collection and reconcile it into the store.
    pub async fn fetch(&self) -> Result<Vec<EntityRef>> {
        let body = self.config.connection.execute(self.routes.find_all()).await?;
        let merged = self.store.merge_response(body)?;
        info!(model = %self.config.name, count = merged.len(), "collection fetched");
        Ok(merged)
    }

    /// Fetch one record by identity and reconcile it into the store.
    pub async fn fetch_by_id(&self, id: &IdValue) -> Result<EntityRef> {
        let body = self
            .config
            .connection
            .execute(self.routes.find_by_id(id))
            .await?;
        match body {
            Value::Object(fields) => Ok(self.store.upsert_record(fields)),
            _ => Err(MirrorError::UnexpectedResponse(format!(
                "find by id '{}' did not return a record",
                id
            ))),
        }
    }

    /// Re-fetch the server copy of `entity` by the identity it carries.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::MissingIdentity`] for a never-persisted
    /// entity; there is nothing to fetch.
    pub async fn fetch_entity(&self, entity: &EntityRef) -> Result<EntityRef> {
        let id = self
            .id_of(entity)
            .ok_or_else(|| MirrorError::MissingIdentity(self.config.id_attribute.clone()))?;
        self.fetch_by_id(&id).await
    }

    /// Drain the save queue, persisting each queued entity.
    pub async fn save(&self) -> Result<Vec<EntityRef>> {
        let saved = self
            .save_queue
            .run(|entity| async move { self.save_entity(&entity).await })
            .await?;
        if !saved.is_empty() {
            info!(model = %self.config.name, count = saved.len(), "pending saves flushed");
        }
        Ok(saved)
    }

    /// Persist one entity: create when it carries no identity, update
    /// otherwise. The decoded response record is reconciled into the
    /// entity in place; a successful save also settles any queued entry
    /// for it.
    pub async fn save_entity(&self, entity: &EntityRef) -> Result<EntityRef> {
        let body = entity.to_value();
        let request = match self.id_of(entity) {
            Some(id) => self.routes.update(&id, body),
            None => self.routes.create(body),
        };
        debug!(model = %self.config.name, method = %request.method, "saving entity");

        let response = self.config.connection.execute(request).await?;
        match response {
            Value::Object(fields) => self.store.reconcile(entity, &fields),
            Value::Null => {}
            other => {
                return Err(MirrorError::UnexpectedResponse(format!(
                    "save response was not a record: {}",
                    other
                )))
            }
        }
        self.save_queue.remove(entity);
        Ok(entity.clone())
    }

    /// Drain the destroy queue, destroying each queued entity.
    pub async fn destroy(&self) -> Result<Vec<EntityRef>> {
        let destroyed = self
            .destroy_queue
            .run(|entity| async move { self.destroy_entity(&entity).await })
            .await?;
        if !destroyed.is_empty() {
            info!(model = %self.config.name, count = destroyed.len(), "pending destroys flushed");
        }
        Ok(destroyed)
    }

    /// Destroy one entity. A never-persisted entity is removed locally
    /// without any network call; a persisted one is destroyed remotely
    /// first, then removed. A successful destroy also settles any queued
    /// entry for the entity, so the next drain does not re-send the
    /// request.
    pub async fn destroy_entity(&self, entity: &EntityRef) -> Result<EntityRef> {
        if let Some(id) = self.id_of(entity) {
            self.config
                .connection
                .execute(self.routes.destroy(&id))
                .await?;
        }
        self.destroy_queue.remove(entity);
        Ok(self.store.remove(entity))
    }

    /// Destroy by identity. With no local entity the request is still
    /// dispatched and a bare-identity `remove` notification fires, which
    /// only unscoped listeners receive.
    pub async fn destroy_by_id(&self, id: &IdValue) -> Result<Option<EntityRef>> {
        if let Some(entity) = self.store.find_by_id(id) {
            return Ok(Some(self.destroy_entity(&entity).await?));
        }

        self.config
            .connection
            .execute(self.routes.destroy(id))
            .await?;
        let payload = Payload::Id(id.clone());
        self.store.router().trigger(EventKind::Change, &payload);
        self.store.router().trigger(EventKind::Remove, &payload);
        Ok(None)
    }

    /// Discard all unsaved local state: empty both queues, empty the
    /// store, then fetch the full collection.
    pub async fn reset(&self) -> Result<Vec<EntityRef>> {
        info!(model = %self.config.name, "resetting collection");
        self.save_queue.empty();
        self.destroy_queue.empty();
        self.store.empty();
        self.fetch().await
    }

    /// Flush both queues concurrently, then [`Model::reset`] once both
    /// settle. The first failure propagates and skips the reset.
    pub async fn sync(&self) -> Result<Vec<EntityRef>> {
        let (saved, destroyed) = join(self.save(), self.destroy()).await;
        saved?;
        destroyed?;
        self.reset().await
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn on(
        &self,
        event: EventKind,
        callback: impl Fn(Option<&EntityRef>) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.router().on(event, callback)
    }

    pub fn once(
        &self,
        event: EventKind,
        callback: impl Fn(Option<&EntityRef>) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.router().once(event, callback)
    }

    pub fn listen_to(
        &self,
        scope: Option<EntityRef>,
        event: Option<EventKind>,
        callback: impl Fn(Option<&EntityRef>) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.router().listen_to(scope, event, callback)
    }

    /// Remove every registration for `event`.
    pub fn off(&self, event: EventKind) {
        self.store.router().off(event);
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.config.name)
            .field("len", &self.store.len())
            .field("pending_saves", &self.save_queue.len())
            .field("pending_destroys", &self.destroy_queue.len())
            .finish()
    }
}
