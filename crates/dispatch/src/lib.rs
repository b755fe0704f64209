//! Action dispatch and input normalization for driving the checkpoint store.
//!
//! # Invariants
//! - Every handler is a pure function from record to record.
//! - Unknown action tags produce a response, never an error.

pub mod action;
pub mod normalize;

pub use action::{Action, ActionError, SUPPORTED_TYPES, dispatch};
pub use normalize::{InputFormat, Normalized, normalize};

pub fn crate_info() -> &'static str {
    concat!("rewind-dispatch v", env!("CARGO_PKG_VERSION"))
}
