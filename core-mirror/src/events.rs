//! # Change Notification System
//!
//! Routes cache change events to interested observers, optionally scoped to
//! one entity and/or one event kind.
//!
//! ## Overview
//!
//! Every store mutation raises a generic `change` event followed by the
//! specific `add`, `update`, or `remove` event, each carrying the affected
//! entity as its payload. Observers register through [`ListenerRouter::on`],
//! [`ListenerRouter::once`], or the scoped [`ListenerRouter::listen_to`],
//! and hold a [`Subscription`] whose `stop()` removes exactly that
//! registration.
//!
//! ## Dispatch filter
//!
//! For an entity payload, a registration matches when its event is unset or
//! equal to the triggered event, and its scope is unset, reference-identical
//! to the payload, or shares an equal, defined identity with it. For a
//! non-entity payload (e.g. a destroy-by-id notification), only unscoped
//! registrations match, and their callbacks receive no entity.
//!
//! Dispatch is synchronous and in registration order. The registration list
//! is snapshotted before iterating, so a callback may subscribe or
//! unsubscribe during dispatch without skipping or re-visiting entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::entity::{Entity, EntityRef};
use crate::error::MirrorError;
use crate::identity::{identity_of, IdValue};

/// The event kinds a store raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Raised before every specific event, for observers of "anything".
    Change,
    /// A previously unknown entity entered the store.
    Add,
    /// An existing entity's contents were replaced.
    Update,
    /// An entity left the store.
    Remove,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Change => "change",
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "change" => Ok(Self::Change),
            "add" => Ok(Self::Add),
            "update" => Ok(Self::Update),
            "remove" => Ok(Self::Remove),
            _ => Err(MirrorError::UnknownEvent(s.to_string())),
        }
    }
}

/// What a triggered event carries.
#[derive(Debug, Clone)]
pub enum Payload {
    /// The affected entity.
    Entity(EntityRef),
    /// A bare identity, for removals with no local entity.
    Id(IdValue),
}

impl Payload {
    fn entity(&self) -> Option<&EntityRef> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}

type Callback = Arc<dyn Fn(Option<&EntityRef>) + Send + Sync>;

struct Registration {
    id: u64,
    event: Option<EventKind>,
    scope: Option<EntityRef>,
    callback: Callback,
    once: bool,
}

struct RouterInner {
    next_id: u64,
    registrations: Vec<Registration>,
}

/// Routes change notifications to matching registrations.
///
/// Cheap to clone; clones share the same registration list.
#[derive(Clone)]
pub struct ListenerRouter {
    id_attribute: String,
    inner: Arc<Mutex<RouterInner>>,
}

impl ListenerRouter {
    pub fn new(id_attribute: impl Into<String>) -> Self {
        Self {
            id_attribute: id_attribute.into(),
            inner: Arc::new(Mutex::new(RouterInner {
                next_id: 0,
                registrations: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RouterInner> {
        self.inner.lock().expect("listener router lock poisoned")
    }

    fn register(
        &self,
        event: Option<EventKind>,
        scope: Option<EntityRef>,
        callback: Callback,
        once: bool,
    ) -> Subscription {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.registrations.push(Registration {
            id,
            event,
            scope,
            callback,
            once,
        });
        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Subscribe to one event kind, any entity.
    pub fn on(
        &self,
        event: EventKind,
        callback: impl Fn(Option<&EntityRef>) + Send + Sync + 'static,
    ) -> Subscription {
        self.register(Some(event), None, Arc::new(callback), false)
    }

    /// Subscribe to one event kind; the callback fires at most once and is
    /// then removed.
    pub fn once(
        &self,
        event: EventKind,
        callback: impl Fn(Option<&EntityRef>) + Send + Sync + 'static,
    ) -> Subscription {
        self.register(Some(event), None, Arc::new(callback), true)
    }

    /// Subscribe with an optional entity scope and optional event kind;
    /// `None` matches anything.
    pub fn listen_to(
        &self,
        scope: Option<EntityRef>,
        event: Option<EventKind>,
        callback: impl Fn(Option<&EntityRef>) + Send + Sync + 'static,
    ) -> Subscription {
        self.register(event, scope, Arc::new(callback), false)
    }

    /// Remove every registration for `event`, scoped or not.
    pub fn off(&self, event: EventKind) {
        self.lock()
            .registrations
            .retain(|r| r.event != Some(event));
    }

    /// Number of live registrations.
    pub fn subscriber_count(&self) -> usize {
        self.lock().registrations.len()
    }

    /// Deliver `payload` to every matching registration, synchronously, in
    /// registration order.
    ///
    /// Matching `once` registrations leave the live list before any
    /// callback runs, so a callback that re-triggers its own event cannot
    /// fire them a second time.
    pub fn trigger(&self, event: EventKind, payload: &Payload) {
        let matched: Vec<Callback> = {
            let mut inner = self.lock();
            let matched: Vec<(u64, Callback, bool)> = inner
                .registrations
                .iter()
                .filter(|r| self.matches(r, event, payload))
                .map(|r| (r.id, Arc::clone(&r.callback), r.once))
                .collect();

            let fired_once: Vec<u64> = matched
                .iter()
                .filter(|(_, _, once)| *once)
                .map(|(id, _, _)| *id)
                .collect();
            if !fired_once.is_empty() {
                inner
                    .registrations
                    .retain(|r| !fired_once.contains(&r.id));
            }

            matched.into_iter().map(|(_, callback, _)| callback).collect()
        };

        let entity = payload.entity();
        for callback in matched {
            callback(entity);
        }
    }

    fn matches(&self, registration: &Registration, event: EventKind, payload: &Payload) -> bool {
        let event_ok = registration.event.map_or(true, |e| e == event);
        match payload {
            Payload::Entity(entity) => {
                event_ok
                    && match &registration.scope {
                        None => true,
                        Some(scope) => {
                            Entity::same(scope, entity)
                                || matches!(
                                    (
                                        identity_of(scope, &self.id_attribute),
                                        identity_of(entity, &self.id_attribute),
                                    ),
                                    (Some(a), Some(b)) if a == b
                                )
                        }
                    }
            }
            Payload::Id(_) => registration.scope.is_none() && event_ok,
        }
    }
}

impl fmt::Debug for ListenerRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRouter")
            .field("id_attribute", &self.id_attribute)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Handle to one registration. `stop()` removes exactly this registration;
/// dropping the handle leaves the registration alive.
pub struct Subscription {
    inner: Weak<Mutex<RouterInner>>,
    id: u64,
}

impl Subscription {
    pub fn stop(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .lock()
                .expect("listener router lock poisoned")
                .registrations
                .retain(|r| r.id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    fn recorder() -> (
        Arc<StdMutex<Vec<Option<String>>>>,
        impl Fn(Option<&EntityRef>) + Send + Sync + 'static,
    ) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sink = log.clone();
        let callback = move |entity: Option<&EntityRef>| {
            let name = entity.and_then(|e| e.get("name")).and_then(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            });
            sink.lock().unwrap().push(name);
        };
        (log, callback)
    }

    #[test]
    fn test_on_receives_matching_event() {
        let router = ListenerRouter::new("id");
        let (log, callback) = recorder();
        router.on(EventKind::Update, callback);

        let entity = Entity::from_fields(json!({"id": 1, "name": "a"}));
        router.trigger(EventKind::Update, &Payload::Entity(entity.clone()));
        router.trigger(EventKind::Add, &Payload::Entity(entity));

        assert_eq!(*log.lock().unwrap(), vec![Some("a".to_string())]);
    }

    #[test]
    fn test_scoped_listener_filters_by_entity_and_event() {
        let router = ListenerRouter::new("id");
        let target = Entity::from_fields(json!({"id": 1, "name": "target"}));
        let other = Entity::from_fields(json!({"id": 2, "name": "other"}));

        let (log, callback) = recorder();
        router.listen_to(Some(target.clone()), Some(EventKind::Update), callback);

        router.trigger(EventKind::Update, &Payload::Entity(target.clone()));
        router.trigger(EventKind::Update, &Payload::Entity(other));
        router.trigger(EventKind::Add, &Payload::Entity(target));

        assert_eq!(*log.lock().unwrap(), vec![Some("target".to_string())]);
    }

    #[test]
    fn test_scope_matches_by_identity_across_references() {
        let router = ListenerRouter::new("id");
        let scope = Entity::from_fields(json!({"id": 7}));
        let payload = Entity::from_fields(json!({"id": 7, "name": "same id"}));

        let (log, callback) = recorder();
        router.listen_to(Some(scope), None, callback);

        router.trigger(EventKind::Update, &Payload::Entity(payload));
        assert_eq!(*log.lock().unwrap(), vec![Some("same id".to_string())]);
    }

    #[test]
    fn test_identity_less_scope_only_matches_same_reference() {
        let router = ListenerRouter::new("id");
        let scope = Entity::from_fields(json!({"name": "local"}));
        let lookalike = Entity::from_fields(json!({"name": "local"}));

        let (log, callback) = recorder();
        router.listen_to(Some(scope.clone()), None, callback);

        router.trigger(EventKind::Change, &Payload::Entity(lookalike));
        assert!(log.lock().unwrap().is_empty());

        router.trigger(EventKind::Change, &Payload::Entity(scope));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_non_entity_payload_skips_scoped_registrations() {
        let router = ListenerRouter::new("id");
        let scope = Entity::from_fields(json!({"id": 1}));

        let (scoped_log, scoped_callback) = recorder();
        router.listen_to(Some(scope), Some(EventKind::Remove), scoped_callback);

        let (open_log, open_callback) = recorder();
        router.on(EventKind::Remove, open_callback);

        router.trigger(EventKind::Remove, &Payload::Id(IdValue::Int(1)));

        assert!(scoped_log.lock().unwrap().is_empty());
        assert_eq!(*open_log.lock().unwrap(), vec![None]);
    }

    #[test]
    fn test_once_fires_a_single_time() {
        let router = ListenerRouter::new("id");
        let (log, callback) = recorder();
        router.once(EventKind::Add, callback);

        let entity = Entity::from_fields(json!({"name": "a"}));
        router.trigger(EventKind::Add, &Payload::Entity(entity.clone()));
        router.trigger(EventKind::Add, &Payload::Entity(entity));

        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(router.subscriber_count(), 0);
    }

    #[test]
    fn test_once_callback_retriggering_its_event_fires_single_time() {
        let router = ListenerRouter::new("id");
        let count = Arc::new(StdMutex::new(0u32));

        let counter = count.clone();
        let reentrant = router.clone();
        router.once(EventKind::Add, move |_| {
            *counter.lock().unwrap() += 1;
            reentrant.trigger(
                EventKind::Add,
                &Payload::Entity(Entity::from_fields(json!({"name": "again"}))),
            );
        });

        router.trigger(
            EventKind::Add,
            &Payload::Entity(Entity::from_fields(json!({"name": "first"}))),
        );

        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(router.subscriber_count(), 0);
    }

    #[test]
    fn test_once_survives_non_matching_trigger() {
        let router = ListenerRouter::new("id");
        let (log, callback) = recorder();
        router.once(EventKind::Add, callback);

        let entity = Entity::from_fields(json!({"name": "a"}));
        router.trigger(EventKind::Update, &Payload::Entity(entity.clone()));
        assert_eq!(router.subscriber_count(), 1);

        router.trigger(EventKind::Add, &Payload::Entity(entity));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stop_removes_exactly_one_registration() {
        let router = ListenerRouter::new("id");
        let (log_a, callback_a) = recorder();
        let (log_b, callback_b) = recorder();
        let subscription = router.on(EventKind::Change, callback_a);
        router.on(EventKind::Change, callback_b);

        subscription.stop();
        router.trigger(
            EventKind::Change,
            &Payload::Entity(Entity::from_fields(json!({"name": "x"}))),
        );

        assert!(log_a.lock().unwrap().is_empty());
        assert_eq!(log_b.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_off_removes_all_registrations_for_event() {
        let router = ListenerRouter::new("id");
        let (log, callback_a) = recorder();
        let (_, callback_b) = recorder();
        router.on(EventKind::Add, callback_b);
        router.on(EventKind::Change, callback_a);

        router.off(EventKind::Add);
        assert_eq!(router.subscriber_count(), 1);

        router.trigger(
            EventKind::Change,
            &Payload::Entity(Entity::from_fields(json!({"name": "x"}))),
        );
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unsubscribe_during_dispatch_does_not_skip_entries() {
        let router = ListenerRouter::new("id");
        let removal = Arc::new(StdMutex::new(None::<Subscription>));

        let slot = removal.clone();
        router.on(EventKind::Change, move |_| {
            if let Some(subscription) = slot.lock().unwrap().take() {
                subscription.stop();
            }
        });

        let (log, callback) = recorder();
        let victim = router.on(EventKind::Change, callback);
        *removal.lock().unwrap() = Some(victim);

        // The victim was registered before the trigger, so it still fires
        // from the snapshot even though the first callback stopped it.
        router.trigger(
            EventKind::Change,
            &Payload::Entity(Entity::from_fields(json!({"name": "x"}))),
        );
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(router.subscriber_count(), 1);
    }

    #[test]
    fn test_event_kind_parse_round_trip() {
        for kind in [
            EventKind::Change,
            EventKind::Add,
            EventKind::Update,
            EventKind::Remove,
        ] {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("destroy".parse::<EventKind>().is_err());
    }
}
