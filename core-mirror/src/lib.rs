//! # Client Mirror Core
//!
//! A client-side, in-memory mirror of server-resident entities with
//! optimistic local mutation, pending-persistence tracking, and filtered
//! change notification.
//!
//! ## Overview
//!
//! Each collection is a [`Model`]: an identity-indexed store of shared,
//! in-place-mutable entities plus two queues of entities awaiting
//! persistence. Local mutations apply immediately and enqueue their
//! entities; `save`/`destroy`/`sync` flush the queues through an injected
//! [`bridge_traits::Connection`] and reconcile the responses back into the
//! same entity objects, so references held by the embedder stay current.
//!
//! ## Components
//!
//! - **Identity** (`identity`): identity-key extraction and the
//!   "never persisted" predicate
//! - **Merge** (`merge`): in-place clear-then-copy content replacement
//! - **Entity** (`entity`): shared open-field records
//! - **Store** (`store`): the ordered, identity-indexed collection
//! - **Pending Queues** (`pending`): de-duplicated drain-and-run queues
//! - **Events** (`events`): scoped, filtered change notification
//! - **Routes** (`routes`): request templates for the connection
//! - **Model** (`model`): the lifecycle orchestrator
//! - **Registry** (`registry`): named models owned by the application

pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod identity;
pub mod merge;
pub mod model;
pub mod pending;
pub mod registry;
pub mod routes;
pub mod store;

pub use config::{ModelConfig, ModelConfigBuilder};
pub use entity::{Entity, EntityRef};
pub use error::{MirrorError, Result};
pub use events::{EventKind, ListenerRouter, Payload, Subscription};
pub use identity::IdValue;
pub use model::Model;
pub use pending::PendingQueue;
pub use registry::Registry;
pub use routes::RouteSet;
pub use store::Store;
