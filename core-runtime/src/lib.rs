//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the client mirror core:
//! - Logging and tracing infrastructure
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that embedding applications
//! depend on. It establishes the logging conventions used throughout the
//! workspace; the cache engine itself lives in `core-mirror`.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
