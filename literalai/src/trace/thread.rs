//! The thread handle.

use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::{Step, UpdateAfter};
use crate::client::LiteralClient;
use crate::context::{self, current_frame, ContextFrame, ThreadRef};
use crate::entities::{StepRecord, ThreadRecord, ThreadUpdate};
use crate::errors::{ApiError, ContextError};

/// A thread created by the client. Clones share the same record.
#[derive(Debug, Clone)]
pub struct Thread {
    id: String,
    record: Arc<RwLock<ThreadRecord>>,
    client: LiteralClient,
}

impl Thread {
    pub(crate) fn new(record: ThreadRecord, client: LiteralClient) -> Self {
        let id = record.id.clone().unwrap_or_default();
        Self {
            id,
            record: Arc::new(RwLock::new(record)),
            client,
        }
    }

    pub(crate) fn from_shared(
        id: String,
        record: Arc<RwLock<ThreadRecord>>,
        client: LiteralClient,
    ) -> Self {
        Self { id, record, client }
    }

    /// Thread id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the record.
    pub fn record(&self) -> ThreadRecord {
        self.record.read().clone()
    }

    /// Applies a partial update to the shared record.
    pub fn update(&self, update: ThreadUpdate) {
        update.apply_to(&mut self.record.write());
    }

    /// Creates a step in this thread.
    pub fn step(&self, mut data: StepRecord) -> Step {
        if data.thread_id.is_none() {
            data.thread_id = Some(self.id.clone());
        }
        self.client.step(data)
    }

    fn frame(&self) -> ContextFrame {
        current_frame().unwrap_or_default().for_thread(ThreadRef {
            id: self.id.clone(),
            record: Arc::downgrade(&self.record),
        })
    }

    /// Makes this thread current for the rest of the enclosing scope.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::NoActiveScope` outside `LiteralClient::scope`.
    pub fn enter(&self) -> Result<(), ContextError> {
        debug!(thread_id = %self.id, "Entering thread without scope");
        context::enter(self.frame())
    }

    /// Upserts the current record and waits for the stored one.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error.
    pub async fn upsert(&self) -> Result<ThreadRecord, ApiError> {
        let stored = self.client.dispatcher().upsert_thread(self.record()).await?;
        self.client.cache().put(self.id.clone(), stored.clone());
        Ok(stored)
    }

    /// Runs `f` with this thread current, then upserts the thread.
    ///
    /// The thread is upserted whether `f` succeeds or fails.
    ///
    /// # Errors
    ///
    /// Returns the error of `f` unchanged.
    pub async fn wrap<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_wrapped(f, None).await
    }

    /// Like `wrap`, then applies `update_after` before upserting.
    ///
    /// When `f` fails only a literal `UpdateAfter::Fields` is applied.
    ///
    /// # Errors
    ///
    /// Returns the error of `f` unchanged.
    pub async fn wrap_with<F, Fut, T, E>(
        &self,
        f: F,
        update_after: UpdateAfter<T, ThreadUpdate>,
    ) -> Result<T, E>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_wrapped(f, Some(update_after)).await
    }

    async fn run_wrapped<F, Fut, T, E>(
        &self,
        f: F,
        update_after: Option<UpdateAfter<T, ThreadUpdate>>,
    ) -> Result<T, E>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        debug!(thread_id = %self.id, "Running thread");
        let result = context::run(self.frame(), f(self.clone())).await;

        if let Some(update_after) = update_after {
            let update = match &result {
                Ok(output) => Some(update_after.resolve(output).await),
                Err(_) => update_after.into_fields(),
            };
            if let Some(update) = update {
                self.update(update);
            }
        }

        self.client.dispatcher().dispatch_thread(self.record());
        result
    }
}
