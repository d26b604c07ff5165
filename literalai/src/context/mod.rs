//! Ambient execution context.
//!
//! This module provides:
//! - The `ContextFrame` describing the active thread, step and root run
//! - A task-local store scoping frames to a logical task
//! - Helpers to enter frames and spawn tasks that keep their context

#[cfg(test)]
mod context_tests;
mod frame;
mod store;

pub use frame::ContextFrame;
pub(crate) use frame::{StepRef, ThreadRef};
pub use store::{current_frame, enter, run, scope, spawn_in_context};
