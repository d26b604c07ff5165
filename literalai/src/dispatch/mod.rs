//! Dispatch of finalized entities to the API collaborator.
//!
//! Automatic sends from `wrap` are fire-and-forget: the call runs on its own
//! tokio task and failures end up in the log, never at the caller. Handles of
//! those tasks are kept so `flush` can wait for them.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::api::{CallOptions, LiteralApi};
use crate::config::Environment;
use crate::entities::{ExperimentItem, Generation, ScoreRecord, StepRecord, ThreadRecord};
use crate::errors::ApiError;

/// Routes entities to a `LiteralApi`, honoring disabled mode and the current
/// environment.
pub struct Dispatcher {
    api: Arc<dyn LiteralApi>,
    disabled: bool,
    environment: RwLock<Option<Environment>>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("disabled", &self.disabled)
            .field("environment", &*self.environment.read())
            .field("pending", &self.pending.lock().len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher.
    pub fn new(api: Arc<dyn LiteralApi>, environment: Option<Environment>, disabled: bool) -> Self {
        Self {
            api,
            disabled,
            environment: RwLock::new(environment),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// The underlying collaborator.
    pub fn api(&self) -> &Arc<dyn LiteralApi> {
        &self.api
    }

    /// Whether every operation is a no-op.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Environment attached to calls made now.
    pub fn environment(&self) -> Option<Environment> {
        *self.environment.read()
    }

    /// Replaces the environment and returns the previous one.
    pub fn set_environment(&self, environment: Option<Environment>) -> Option<Environment> {
        std::mem::replace(&mut *self.environment.write(), environment)
    }

    /// Switches to `environment` until the returned guard is dropped.
    pub fn enter_environment(self: &Arc<Self>, environment: Environment) -> EnvironmentGuard {
        let previous = self.set_environment(Some(environment));
        debug!(%environment, ?previous, "Entered environment");
        EnvironmentGuard {
            dispatcher: Arc::clone(self),
            previous,
        }
    }

    fn call_options(&self) -> CallOptions {
        CallOptions::new(self.environment())
    }

    /// Number of fire-and-forget dispatches not yet awaited by `flush`.
    pub fn pending_count(&self) -> usize {
        let mut pending = self.pending.lock();
        pending.retain(|handle| !handle.is_finished());
        pending.len()
    }

    fn spawn_tracked<F>(&self, operation: &'static str, future: F)
    where
        F: std::future::Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(operation, "No tokio runtime available, dropping dispatch");
            return;
        };

        let handle = runtime.spawn(async move {
            if let Err(e) = future.await {
                let details = serde_json::json!(e.to_dict());
                error!(operation, error = %e, %details, "Failed to dispatch to Literal AI");
            }
        });

        let mut pending = self.pending.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Sends steps in the background.
    pub fn dispatch_steps(&self, steps: Vec<StepRecord>) {
        if self.disabled || steps.is_empty() {
            return;
        }
        debug!(count = steps.len(), "Dispatching steps");
        let api = Arc::clone(&self.api);
        let options = self.call_options();
        self.spawn_tracked("send_steps", async move { api.send_steps(steps, options).await });
    }

    /// Upserts a thread in the background.
    pub fn dispatch_thread(&self, thread: ThreadRecord) {
        if self.disabled {
            return;
        }
        debug!(thread_id = ?thread.id, "Dispatching thread");
        let api = Arc::clone(&self.api);
        let options = self.call_options();
        self.spawn_tracked("upsert_thread", async move {
            api.upsert_thread(thread, options).await.map(|_| ())
        });
    }

    /// Sends steps and waits for the result.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error.
    pub async fn send_steps(&self, steps: Vec<StepRecord>) -> Result<(), ApiError> {
        if self.disabled {
            return Ok(());
        }
        self.api.send_steps(steps, self.call_options()).await
    }

    /// Upserts a thread and waits for the stored record.
    pub async fn upsert_thread(&self, thread: ThreadRecord) -> Result<ThreadRecord, ApiError> {
        if self.disabled {
            return Ok(thread);
        }
        self.api.upsert_thread(thread, self.call_options()).await
    }

    /// Fetches a step.
    pub async fn get_step(&self, id: &str) -> Result<Option<StepRecord>, ApiError> {
        if self.disabled {
            return Ok(None);
        }
        self.api.get_step(id.to_string(), self.call_options()).await
    }

    /// Fetches a thread.
    pub async fn get_thread(&self, id: &str) -> Result<Option<ThreadRecord>, ApiError> {
        if self.disabled {
            return Ok(None);
        }
        self.api.get_thread(id.to_string(), self.call_options()).await
    }

    /// Logs a standalone generation.
    pub async fn create_generation(&self, generation: Generation) -> Result<Generation, ApiError> {
        if self.disabled {
            return Ok(generation);
        }
        self.api
            .create_generation(generation, self.call_options())
            .await
    }

    /// Creates scores.
    pub async fn create_scores(
        &self,
        scores: Vec<ScoreRecord>,
    ) -> Result<Vec<ScoreRecord>, ApiError> {
        if self.disabled {
            return Ok(scores);
        }
        self.api.create_scores(scores, self.call_options()).await
    }

    /// Logs an experiment item.
    pub async fn create_experiment_item(
        &self,
        item: ExperimentItem,
    ) -> Result<ExperimentItem, ApiError> {
        if self.disabled {
            return Ok(item);
        }
        self.api
            .create_experiment_item(item, self.call_options())
            .await
    }

    /// Waits for every background dispatch started so far.
    pub async fn flush(&self) {
        let handles: Vec<_> = self.pending.lock().drain(..).collect();
        if handles.is_empty() {
            return;
        }
        debug!(count = handles.len(), "Flushing pending dispatches");
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Dispatch task did not complete");
            }
        }
    }
}

/// Restores the environment captured when it was created.
#[derive(Debug)]
#[must_use = "the environment is restored as soon as the guard is dropped"]
pub struct EnvironmentGuard {
    dispatcher: Arc<Dispatcher>,
    previous: Option<Environment>,
}

impl Drop for EnvironmentGuard {
    fn drop(&mut self) {
        self.dispatcher.set_environment(self.previous);
        debug!(restored = ?self.previous, "Restored environment");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockLiteralApi;
    use crate::entities::StepType;

    fn dispatcher(mock: MockLiteralApi, disabled: bool) -> Arc<Dispatcher> {
        Arc::new(Dispatcher::new(Arc::new(mock), Some(Environment::Dev), disabled))
    }

    #[tokio::test]
    async fn test_disabled_makes_no_calls() {
        // Any call on an unconfigured mock panics.
        let dispatcher = dispatcher(MockLiteralApi::new(), true);

        dispatcher.dispatch_steps(vec![StepRecord::new(StepType::Tool)]);
        dispatcher.dispatch_thread(ThreadRecord::new());
        dispatcher.send_steps(vec![]).await.unwrap();

        let thread = ThreadRecord::new().with_id("t1");
        assert_eq!(dispatcher.upsert_thread(thread.clone()).await.unwrap(), thread);
        assert!(dispatcher.get_step("s1").await.unwrap().is_none());
        assert!(dispatcher.get_thread("t1").await.unwrap().is_none());
        assert!(dispatcher.create_scores(Vec::new()).await.unwrap().is_empty());

        dispatcher.flush().await;
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_captures_environment_at_call_time() {
        let mut mock = MockLiteralApi::new();
        mock.expect_send_steps()
            .withf(|steps, options| {
                steps.len() == 1 && options.environment == Some(Environment::Experiment)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let dispatcher = dispatcher(mock, false);
        {
            let _guard = dispatcher.enter_environment(Environment::Experiment);
            dispatcher.dispatch_steps(vec![StepRecord::new(StepType::Llm).with_id("s1")]);
        }
        assert_eq!(dispatcher.environment(), Some(Environment::Dev));

        dispatcher.flush().await;
    }

    #[tokio::test]
    async fn test_failed_dispatch_is_swallowed() {
        let mut mock = MockLiteralApi::new();
        mock.expect_upsert_thread()
            .times(1)
            .returning(|_, _| Err(ApiError::response(503, "unavailable")));

        let dispatcher = dispatcher(mock, false);
        dispatcher.dispatch_thread(ThreadRecord::new().with_id("t1"));
        dispatcher.flush().await;
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_awaited_calls_return_errors() {
        let mut mock = MockLiteralApi::new();
        mock.expect_get_step()
            .returning(|_, _| Err(ApiError::Request("timeout".to_string())));

        let dispatcher = dispatcher(mock, false);
        assert!(matches!(
            dispatcher.get_step("s1").await,
            Err(ApiError::Request(_))
        ));
    }

    #[test]
    fn test_nested_guards_restore_in_order() {
        let dispatcher = dispatcher(MockLiteralApi::new(), false);

        let outer = dispatcher.enter_environment(Environment::Staging);
        let inner = dispatcher.enter_environment(Environment::Experiment);
        assert_eq!(dispatcher.environment(), Some(Environment::Experiment));
        drop(inner);
        assert_eq!(dispatcher.environment(), Some(Environment::Staging));
        drop(outer);
        assert_eq!(dispatcher.environment(), Some(Environment::Dev));
    }

    #[test]
    fn test_dispatch_without_runtime_is_dropped() {
        let dispatcher = dispatcher(MockLiteralApi::new(), false);
        dispatcher.dispatch_steps(vec![StepRecord::new(StepType::Tool)]);
        assert_eq!(dispatcher.pending_count(), 0);
    }
}
