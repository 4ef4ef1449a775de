//! # Host Bridge Traits
//!
//! Abstraction traits that must be implemented by each host environment.
//!
//! ## Overview
//!
//! This crate defines the contract between the cache core and the outside
//! world. The core treats the network as an opaque request-execution
//! service: it builds [`Request`] descriptors and hands them to a
//! [`Connection`], which resolves with decoded response data or rejects
//! with a [`BridgeError`].
//!
//! ## Error Handling
//!
//! Implementations should:
//!
//! - Convert transport-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., route, status code)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks. Implementations must ensure thread safety.

pub mod connection;
pub mod error;

pub use connection::{Connection, Method, Request};
pub use error::BridgeError;
