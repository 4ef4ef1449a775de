//! Request-Execution Abstraction
//!
//! Defines the contract between the cache core and whatever actually moves
//! bytes to the server (HTTP, WebSocket, a test double).

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::error::Result;

/// Request method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transport-agnostic request descriptor.
///
/// The cache core builds these from its route templates and hands them to a
/// [`Connection`]; it never inspects them again. The body, when present, is
/// already-decoded JSON rather than raw bytes so that implementations are
/// free to choose their own wire encoding.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub route: String,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
            body: None,
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Async request-execution trait.
///
/// This trait abstracts the network layer so the cache core can run against
/// any promise-returning implementation. Implementations own every transport
/// concern the core explicitly does not: retries, backoff, authentication,
/// timeouts, and the mapping from wire payloads to JSON values.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::{Connection, Method, Request};
///
/// async fn ping(conn: &dyn Connection) -> bridge_traits::error::Result<serde_json::Value> {
///     conn.execute(Request::new(Method::Get, "/todos")).await
/// }
/// ```
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute a request and resolve with the decoded response payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails, the server rejects the
    /// request, or the response cannot be decoded. Errors are surfaced to
    /// the caller verbatim; the core never retries.
    async fn execute(&self, request: Request) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = Request::new(Method::Post, "/todos").body(json!({"name": "dishes"}));

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.route, "/todos");
        assert_eq!(request.body, Some(json!({"name": "dishes"})));
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Delete.as_str(), "DELETE");
    }
}
