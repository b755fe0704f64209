//! Shared types for the rewind workspace.
//!
//! # Invariants
//! - `Value::clone` is a deep copy; only immutable handles are shared.
//! - Every value either serializes losslessly or reports why it cannot.

pub mod value;

pub use value::{Handle, Map, Value, ValueError};
