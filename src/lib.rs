//! Workspace placeholder crate.
//!
//! This crate exists so host applications can depend on `mirror-workspace`
//! and pull in the individual workspace crates (`core-mirror`,
//! `core-runtime`, `bridge-traits`) without wiring each one individually.

pub use core_mirror as mirror;
pub use core_runtime as runtime;
