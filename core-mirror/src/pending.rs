//! # Pending Persistence Queue
//!
//! Tracks entities awaiting one persistence action (save or destroy),
//! de-duplicated by reference.
//!
//! `run` drains the queue atomically before awaiting anything: entries
//! enqueued by a task's side effects during a drain are not included in the
//! same run, they stay queued for the next one. Failures are not re-queued;
//! callers needing retry re-enqueue failed entities themselves.

use futures::future::join_all;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::entity::{Entity, EntityRef};

/// Set of entities queued for a single persistence action.
pub struct PendingQueue {
    action: &'static str,
    entries: Mutex<Vec<EntityRef>>,
}

impl PendingQueue {
    /// `action` names the persistence action for logs, e.g. `"save"`.
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            entries: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<EntityRef>> {
        self.entries.lock().expect("pending queue lock poisoned")
    }

    /// Enqueue `entity` unless it is already present. Duplicates are
    /// silently ignored.
    pub fn add(&self, entity: &EntityRef) {
        let mut entries = self.lock();
        if !entries.iter().any(|e| Entity::same(e, entity)) {
            entries.push(entity.clone());
            debug!(action = self.action, pending = entries.len(), "entity queued");
        }
    }

    pub fn add_all(&self, entities: &[EntityRef]) {
        for entity in entities {
            self.add(entity);
        }
    }

    /// Dequeue `entity` if present; removing an absent entity is a no-op.
    pub fn remove(&self, entity: &EntityRef) {
        self.lock().retain(|e| !Entity::same(e, entity));
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.lock().iter().any(|e| Entity::same(e, entity))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clear all pending entries without running anything.
    pub fn empty(&self) {
        self.lock().clear();
    }

    /// Take every pending entry, leaving the queue empty.
    pub fn drain(&self) -> Vec<EntityRef> {
        std::mem::take(&mut *self.lock())
    }

    /// Drain the queue and invoke `task` once per drained entry.
    ///
    /// Every invocation runs to completion before this returns; the first
    /// failure in queue order becomes the overall result. A run over an
    /// empty queue resolves immediately with an empty result list.
    pub async fn run<T, E, F, Fut>(&self, task: F) -> Result<Vec<T>, E>
    where
        F: Fn(EntityRef) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let drained = self.drain();
        if drained.is_empty() {
            return Ok(Vec::new());
        }

        debug!(action = self.action, count = drained.len(), "running pending queue");
        join_all(drained.into_iter().map(task))
            .await
            .into_iter()
            .collect()
    }
}

impl fmt::Debug for PendingQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingQueue")
            .field("action", &self.action)
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_add_is_idempotent_by_reference() {
        let queue = PendingQueue::new("save");
        let entity = Entity::from_fields(json!({"id": 1}));

        queue.add(&entity);
        queue.add(&entity);

        assert_eq!(queue.len(), 1);

        // Equal content, different reference: a separate entry.
        let twin = Entity::from_fields(json!({"id": 1}));
        queue.add(&twin);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let queue = PendingQueue::new("save");
        let entity = Entity::from_fields(json!({"id": 1}));
        queue.add(&entity);

        let stranger = Entity::from_fields(json!({"id": 2}));
        queue.remove(&stranger);
        assert_eq!(queue.len(), 1);

        queue.remove(&entity);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_clears_without_running() {
        let queue = PendingQueue::new("destroy");
        queue.add(&Entity::from_fields(json!({"id": 1})));
        queue.empty();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_run_on_empty_queue_resolves_immediately() {
        let queue = PendingQueue::new("save");
        let results: Result<Vec<()>, &str> = queue.run(|_| async { Ok(()) }).await;
        assert_eq!(results.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_run_drains_and_collects_in_order() {
        let queue = PendingQueue::new("save");
        queue.add(&Entity::from_fields(json!({"id": 1})));
        queue.add(&Entity::from_fields(json!({"id": 2})));

        let results: Result<Vec<_>, &str> = queue
            .run(|entity| async move { Ok(entity.get("id").unwrap()) })
            .await;

        assert_eq!(results.unwrap(), vec![json!(1), json!(2)]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_run_failure_settles_all_and_keeps_queue_drained() {
        let queue = PendingQueue::new("save");
        queue.add(&Entity::from_fields(json!({"id": 1})));
        queue.add(&Entity::from_fields(json!({"id": 2})));
        queue.add(&Entity::from_fields(json!({"id": 3})));

        let attempted = Arc::new(Mutex::new(0));
        let counter = attempted.clone();
        let results: Result<Vec<()>, String> = queue
            .run(|entity| {
                let counter = counter.clone();
                async move {
                    *counter.lock().unwrap() += 1;
                    if entity.get("id") == Some(json!(2)) {
                        Err("persistence rejected".to_string())
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(results.unwrap_err(), "persistence rejected");
        // Every invocation ran; nothing was re-queued.
        assert_eq!(*attempted.lock().unwrap(), 3);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_entries_added_during_run_stay_for_next_run() {
        let queue = Arc::new(PendingQueue::new("save"));
        queue.add(&Entity::from_fields(json!({"id": 1})));

        let reentrant = queue.clone();
        let results: Result<Vec<()>, &str> = queue
            .run(|_| {
                let queue = reentrant.clone();
                async move {
                    queue.add(&Entity::from_fields(json!({"id": 2})));
                    Ok(())
                }
            })
            .await;

        assert_eq!(results.unwrap().len(), 1);
        assert_eq!(queue.len(), 1);
    }
}
