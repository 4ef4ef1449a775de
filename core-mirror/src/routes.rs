//! Request templates.
//!
//! Builds the five request shapes a collection ever dispatches, keyed by
//! its base route. Routes are opaque to the transport; identity values are
//! appended as one trailing path segment.

use bridge_traits::{Method, Request};
use serde_json::Value;

use crate::identity::IdValue;

/// The request templates for one collection.
#[derive(Debug, Clone)]
pub struct RouteSet {
    base: String,
}

impl RouteSet {
    /// `base` is the collection's base route, e.g. `/todos`. A trailing
    /// slash is stripped so identity segments join cleanly.
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn with_id(&self, id: &IdValue) -> String {
        format!("{}/{}", self.base, id)
    }

    /// `GET base` — the full collection.
    pub fn find_all(&self) -> Request {
        Request::new(Method::Get, self.base.as_str())
    }

    /// `GET base/{id}` — one record.
    pub fn find_by_id(&self, id: &IdValue) -> Request {
        Request::new(Method::Get, self.with_id(id))
    }

    /// `POST base` — persist a never-saved record.
    pub fn create(&self, body: Value) -> Request {
        Request::new(Method::Post, self.base.as_str()).body(body)
    }

    /// `PUT base/{id}` — persist changes to a known record.
    pub fn update(&self, id: &IdValue, body: Value) -> Request {
        Request::new(Method::Put, self.with_id(id)).body(body)
    }

    /// `DELETE base/{id}`.
    pub fn destroy(&self, id: &IdValue) -> Request {
        Request::new(Method::Delete, self.with_id(id))
    }
}
