//! Task-local frame store.
//!
//! Frames live in a tokio task-local, so they follow a future across every
//! await point and never leak into concurrently polled futures. A freshly
//! spawned tokio task starts without a frame; use `spawn_in_context` to carry
//! the current one over.

use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::ContextFrame;
use crate::errors::ContextError;

/// One scope level. `enter` swaps the frame of the innermost slot in place.
#[derive(Debug, Default)]
struct FrameSlot {
    frame: RwLock<Option<Arc<ContextFrame>>>,
}

impl FrameSlot {
    fn new(frame: Option<Arc<ContextFrame>>) -> Self {
        Self {
            frame: RwLock::new(frame),
        }
    }
}

tokio::task_local! {
    static CURRENT_FRAME: FrameSlot;
}

/// Polls `future` with `frame` as the active frame.
///
/// The enclosing frame is visible again once the future completes, whether
/// it returned an error or unwound.
pub async fn run<F>(frame: ContextFrame, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_FRAME
        .scope(FrameSlot::new(Some(Arc::new(frame))), future)
        .await
}

/// Polls `future` inside an empty scope that `enter` can populate.
pub async fn scope<F>(future: F) -> F::Output
where
    F: Future,
{
    CURRENT_FRAME.scope(FrameSlot::default(), future).await
}

/// Returns the active frame of the calling task, if any.
#[must_use]
pub fn current_frame() -> Option<Arc<ContextFrame>> {
    CURRENT_FRAME
        .try_with(|slot| slot.frame.read().clone())
        .ok()
        .flatten()
}

/// Installs `frame` for the rest of the innermost scope. Nothing pops it.
///
/// # Errors
///
/// Returns `ContextError::NoActiveScope` when called outside any scope.
pub fn enter(frame: ContextFrame) -> Result<(), ContextError> {
    CURRENT_FRAME
        .try_with(|slot| {
            *slot.frame.write() = Some(Arc::new(frame));
        })
        .map_err(|_| ContextError::NoActiveScope)
}

/// Spawns `future` on tokio with a copy of the caller's frame.
pub fn spawn_in_context<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let slot = FrameSlot::new(current_frame());
    tokio::spawn(CURRENT_FRAME.scope(slot, future))
}
