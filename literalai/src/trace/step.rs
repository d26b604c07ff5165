//! The step handle and its scoped lifecycle.

use parking_lot::RwLock;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::UpdateAfter;
use crate::client::LiteralClient;
use crate::context::{self, current_frame, ContextFrame, StepRef};
use crate::entities::{StepRecord, StepType, StepUpdate};
use crate::errors::{ApiError, ContextError};
use crate::utils::now_utc;

/// A step created by the client.
///
/// Clones share the same record, so a callback receiving a `Step` can update
/// the very record `wrap` will send.
#[derive(Debug, Clone)]
pub struct Step {
    id: String,
    record: Arc<RwLock<StepRecord>>,
    client: LiteralClient,
}

impl Step {
    pub(crate) fn new(record: StepRecord, client: LiteralClient) -> Self {
        let id = record.id.clone().unwrap_or_default();
        Self {
            id,
            record: Arc::new(RwLock::new(record)),
            client,
        }
    }

    pub(crate) fn from_shared(id: String, record: Arc<RwLock<StepRecord>>, client: LiteralClient) -> Self {
        Self { id, record, client }
    }

    pub(crate) fn client(&self) -> &LiteralClient {
        &self.client
    }

    /// Step id. Assigned at creation and never changes.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Step type.
    pub fn step_type(&self) -> StepType {
        self.record.read().step_type
    }

    /// Whether this is a message step.
    pub fn is_message(&self) -> bool {
        self.record.read().is_message()
    }

    /// Snapshot of the record.
    pub fn record(&self) -> StepRecord {
        self.record.read().clone()
    }

    /// Thread the step belongs to.
    pub fn thread_id(&self) -> Option<String> {
        self.record.read().thread_id.clone()
    }

    /// Applies a partial update to the shared record.
    pub fn update(&self, update: StepUpdate) {
        update.apply_to(&mut self.record.write());
    }

    /// Creates a child step of this one.
    ///
    /// Thread, parent and root run come from this step unless `data` sets them.
    pub fn step(&self, mut data: StepRecord) -> Self {
        {
            let record = self.record.read();
            if data.parent_id.is_none() {
                data.parent_id = Some(self.id.clone());
            }
            if data.thread_id.is_none() {
                data.thread_id.clone_from(&record.thread_id);
            }
            if data.root_run_id.is_none() {
                data.root_run_id = record.root_run_id.clone().or_else(|| {
                    (record.step_type == StepType::Run).then(|| self.id.clone())
                });
            }
        }
        self.client.step(data)
    }

    pub(crate) fn step_ref(&self) -> StepRef {
        StepRef {
            id: self.id.clone(),
            thread_id: self.thread_id(),
            record: Arc::downgrade(&self.record),
        }
    }

    fn frame(&self) -> ContextFrame {
        let is_run = self.step_type() == StepType::Run;
        current_frame()
            .unwrap_or_default()
            .for_step(self.step_ref(), is_run)
    }

    /// Makes this step current for the rest of the enclosing scope.
    ///
    /// Nothing is sent automatically; call `send` when done.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::NoActiveScope` outside `LiteralClient::scope`.
    pub fn enter(&self) -> Result<(), ContextError> {
        debug!(step_id = %self.id, "Entering step without scope");
        context::enter(self.frame())
    }

    /// Sends the current record and waits for the result.
    ///
    /// Sending twice upserts the same id twice.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error.
    pub async fn send(&self) -> Result<StepRecord, ApiError> {
        let record = self.record();
        self.client
            .dispatcher()
            .send_steps(vec![record.clone()])
            .await?;
        self.client.cache().put(self.id.clone(), record.clone());
        Ok(record)
    }

    /// Runs `f` as this step and sends the step once it succeeds.
    ///
    /// The output becomes the step output (non-object values are stored as
    /// `{"output": value}`). If `f` fails, its error is returned and nothing
    /// is sent.
    ///
    /// # Errors
    ///
    /// Returns the error of `f` unchanged.
    pub async fn wrap<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
    {
        self.run_wrapped(f, None).await
    }

    /// Like `wrap`, then applies `update_after` before sending.
    ///
    /// # Errors
    ///
    /// Returns the error of `f` unchanged.
    pub async fn wrap_with<F, Fut, T, E>(
        &self,
        f: F,
        update_after: UpdateAfter<T, StepUpdate>,
    ) -> Result<T, E>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
    {
        self.run_wrapped(f, Some(update_after)).await
    }

    async fn run_wrapped<F, Fut, T, E>(
        &self,
        f: F,
        update_after: Option<UpdateAfter<T, StepUpdate>>,
    ) -> Result<T, E>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
    {
        self.record.write().start_time = Some(now_utc());
        let frame = self.frame();
        debug!(step_id = %self.id, root_run_id = ?frame.root_run_id(), "Running step");

        let output = match context::run(frame, f(self.clone())).await {
            Ok(output) => output,
            Err(e) => {
                debug!(step_id = %self.id, "Step failed, not sending");
                return Err(e);
            }
        };

        self.finish(&output);
        if let Some(update_after) = update_after {
            let update = update_after.resolve(&output).await;
            self.update(update);
        }

        self.client.dispatcher().dispatch_steps(vec![self.record()]);
        Ok(output)
    }

    fn finish<T: Serialize>(&self, output: &T) {
        let value = match serde_json::to_value(output) {
            Ok(value @ serde_json::Value::Object(_)) => Some(value),
            Ok(value) => Some(serde_json::json!({ "output": value })),
            Err(e) => {
                warn!(step_id = %self.id, error = %e, "Step output is not serializable");
                None
            }
        };

        let mut record = self.record.write();
        if value.is_some() {
            record.output = value;
        }
        record.end_time = Some(now_utc());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client_with, InMemoryApi};
    use serde_json::json;

    #[tokio::test]
    async fn test_scalar_output_is_wrapped() {
        let api = Arc::new(InMemoryApi::new());
        let client = client_with(api.clone());
        let step = client.step(StepRecord::new(StepType::Tool));

        let out: Result<u32, ApiError> = step.wrap(|_| async { Ok(42) }).await;
        assert_eq!(out.unwrap(), 42);
        assert_eq!(step.record().output, Some(json!({"output": 42})));
        assert!(step.record().end_time.is_some());
    }

    #[tokio::test]
    async fn test_object_output_is_kept() {
        let client = client_with(Arc::new(InMemoryApi::new()));
        let step = client.step(StepRecord::new(StepType::Tool));

        let _: Result<_, ApiError> = step.wrap(|_| async { Ok(json!({"answer": 1})) }).await;
        assert_eq!(step.record().output, Some(json!({"answer": 1})));
    }

    #[tokio::test]
    async fn test_null_output_replaces_earlier_output() {
        let api = Arc::new(InMemoryApi::new());
        let client = client_with(api.clone());
        let step = client.step(StepRecord::new(StepType::Tool).with_output(json!({"stale": true})));

        let _: Result<Option<u8>, ApiError> = step.wrap(|_| async { Ok(None) }).await;
        assert_eq!(step.record().output, Some(json!({"output": null})));

        client.flush().await;
        assert_eq!(api.step(step.id()).unwrap().output, Some(json!({"output": null})));
    }

    #[tokio::test]
    async fn test_unit_output_is_captured_as_null() {
        let client = client_with(Arc::new(InMemoryApi::new()));
        let step = client.step(StepRecord::new(StepType::Tool).with_output(json!({"preset": true})));

        let _: Result<(), ApiError> = step.wrap(|_| async { Ok(()) }).await;
        assert_eq!(step.record().output, Some(json!({"output": null})));
    }

    #[tokio::test]
    async fn test_callback_updates_shared_record() {
        let client = client_with(Arc::new(InMemoryApi::new()));
        let step = client.step(StepRecord::new(StepType::Retrieval));

        let _: Result<(), ApiError> = step
            .wrap(|me| async move {
                me.update(StepUpdate::new().with_input(json!({"query": "q"})));
                Ok(())
            })
            .await;

        assert_eq!(step.record().input, Some(json!({"query": "q"})));
    }

    #[tokio::test]
    async fn test_child_step_attaches_to_parent() {
        let client = client_with(Arc::new(InMemoryApi::new()));
        let run = client.run(StepRecord::new(StepType::Run).with_thread_id("t1"));
        let child = run.step(StepRecord::new(StepType::Tool));

        let record = child.record();
        assert_eq!(record.parent_id.as_deref(), Some(run.id()));
        assert_eq!(record.thread_id.as_deref(), Some("t1"));
        assert_eq!(record.root_run_id.as_deref(), Some(run.id()));
    }

    #[tokio::test]
    async fn test_enter_requires_scope() {
        let client = client_with(Arc::new(InMemoryApi::new()));
        let step = client.step(StepRecord::new(StepType::Tool));
        assert_eq!(step.enter(), Err(ContextError::NoActiveScope));
    }
}
