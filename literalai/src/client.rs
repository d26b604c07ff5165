//! The client: entity factory, context accessors and manual API calls.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::{LiteralApi, LoggingApi};
use crate::cache::SharedCache;
use crate::config::{ClientConfig, Environment};
use crate::context::{self, current_frame};
use crate::dispatch::Dispatcher;
use crate::entities::{
    merge_metadata, merge_tags, DatasetExperimentRecord, Generation, ScoreRecord, StepRecord,
    StepType, ThreadRecord,
};
use crate::errors::{ApiError, ConfigError, ContextError, LiteralError};
use crate::experiment::{DatasetExperiment, ExperimentItemRun};
use crate::trace::{DecorateOptions, Decorator, Step, Thread};
use crate::utils::{generate_id, now_utc};

struct ClientInner {
    config: ClientConfig,
    dispatcher: Arc<Dispatcher>,
    cache: SharedCache,
}

/// Entry point of the SDK. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct LiteralClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for LiteralClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiteralClient")
            .field("url", &self.inner.config.url)
            .field("disabled", &self.inner.config.disabled)
            .field("dispatcher", &self.inner.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Builder for `LiteralClient`.
#[derive(Default)]
pub struct ClientBuilder {
    config: Option<ClientConfig>,
    api: Option<Arc<dyn LiteralApi>>,
}

impl ClientBuilder {
    /// Uses `config` instead of reading the process environment.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the API collaborator. Defaults to `LoggingApi`.
    #[must_use]
    pub fn api(mut self, api: Arc<dyn LiteralApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Validates the configuration and builds the client.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an invalid configuration or environment.
    pub fn build(self) -> Result<LiteralClient, ConfigError> {
        let config = match self.config {
            Some(config) => config,
            None => ClientConfig::from_env()?,
        };
        config.validate()?;

        let api = self
            .api
            .unwrap_or_else(|| Arc::new(LoggingApi::default()));
        let dispatcher = Dispatcher::new(api, config.environment, config.disabled);
        debug!(url = %config.url, disabled = config.disabled, "Built Literal AI client");

        Ok(LiteralClient {
            inner: Arc::new(ClientInner {
                config,
                dispatcher: Arc::new(dispatcher),
                cache: SharedCache::new(),
            }),
        })
    }
}

impl LiteralClient {
    /// Starts building a client.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The API collaborator.
    pub fn api(&self) -> &Arc<dyn LiteralApi> {
        self.inner.dispatcher.api()
    }

    /// Cache of fetched and manually sent entities.
    pub fn cache(&self) -> &SharedCache {
        &self.inner.cache
    }

    /// Environment attached to calls made now.
    pub fn environment(&self) -> Option<Environment> {
        self.inner.dispatcher.environment()
    }

    /// Whether the client sends nothing.
    pub fn is_disabled(&self) -> bool {
        self.inner.dispatcher.is_disabled()
    }

    pub(crate) fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }

    /// Creates a thread. Nothing is sent until it is wrapped or upserted.
    pub fn thread(&self, mut data: ThreadRecord) -> Thread {
        if data.id.is_none() {
            data.id = Some(generate_id());
        }
        if data.created_at.is_none() {
            data.created_at = Some(now_utc());
        }
        if data.environment.is_none() {
            data.environment = self.environment();
        }
        if let Some(frame) = current_frame() {
            merge_metadata(&mut data.metadata, frame.metadata());
            merge_tags(&mut data.tags, frame.tags());
        }
        Thread::new(data, self.clone())
    }

    /// Creates a step attached to the current context.
    pub fn step(&self, data: StepRecord) -> Step {
        self.create_step(data, true)
    }

    /// Creates a step ignoring the thread, parent, metadata and tags of the
    /// current context.
    pub fn step_without_context(&self, data: StepRecord) -> Step {
        self.create_step(data, false)
    }

    /// Creates a `run` step attached to the current context.
    pub fn run(&self, mut data: StepRecord) -> Step {
        data.step_type = StepType::Run;
        self.create_step(data, true)
    }

    fn create_step(&self, mut data: StepRecord, inherit: bool) -> Step {
        let frame = current_frame();

        let id = data
            .id
            .take()
            .or_else(|| frame.as_ref().and_then(|f| f.take_pending_step_id()))
            .unwrap_or_else(generate_id);
        data.id = Some(id);

        let now = now_utc();
        let start_time = *data.start_time.get_or_insert(now);
        data.created_at.get_or_insert(now);
        if data.is_message() {
            data.end_time = Some(start_time);
        }

        if let (true, Some(frame)) = (inherit, frame.as_ref()) {
            merge_metadata(&mut data.metadata, frame.metadata());
            merge_tags(&mut data.tags, frame.tags());
            if data.thread_id.is_none() {
                data.thread_id = frame.inherited_thread_id().map(String::from);
            }
            if data.parent_id.is_none() {
                data.parent_id = frame.step_id().map(String::from);
            }
            if data.root_run_id.is_none() {
                data.root_run_id = frame.root_run_id().map(String::from);
            }
        }

        Step::new(data, self.clone())
    }

    /// Thread of the current context, if one is active and still alive.
    pub fn current_thread(&self) -> Option<Thread> {
        let frame = current_frame()?;
        let thread = frame.thread_ref()?;
        let record = thread.record.upgrade()?;
        Some(Thread::from_shared(thread.id.clone(), record, self.clone()))
    }

    /// Step of the current context, if one is active and still alive.
    pub fn current_step(&self) -> Option<Step> {
        let frame = current_frame()?;
        let step = frame.step_ref()?;
        let record = step.record.upgrade()?;
        Some(Step::from_shared(step.id.clone(), record, self.clone()))
    }

    /// Outermost `run` step of the current context.
    pub fn current_root_run(&self) -> Option<Step> {
        let frame = current_frame()?;
        let run = frame.root_run_ref()?;
        let record = run.record.upgrade()?;
        Some(Step::from_shared(run.id.clone(), record, self.clone()))
    }

    /// Thread of the current context.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::NoActiveThread` when no thread is active.
    pub fn get_current_thread(&self) -> Result<Thread, ContextError> {
        self.current_thread().ok_or(ContextError::NoActiveThread)
    }

    /// Step of the current context.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::NoActiveStep` when no step is active.
    pub fn get_current_step(&self) -> Result<Step, ContextError> {
        self.current_step().ok_or(ContextError::NoActiveStep)
    }

    /// Builds a decorator injecting metadata, tags or a step id.
    pub fn decorate(&self, options: DecorateOptions) -> Decorator {
        Decorator::new(options)
    }

    /// Opens a scope in which `Thread::enter` and `Step::enter` work.
    pub async fn scope<F: Future>(&self, future: F) -> F::Output {
        context::scope(future).await
    }

    /// Logs a generation.
    ///
    /// Inside a thread or step it is recorded as an `llm` step of that
    /// context; otherwise it is logged on its own.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error.
    pub async fn log_generation(&self, mut generation: Generation) -> Result<Generation, ApiError> {
        let in_context = current_frame()
            .is_some_and(|frame| frame.inherited_thread_id().is_some() || frame.step_id().is_some());

        if !in_context {
            return self.inner.dispatcher.create_generation(generation).await;
        }

        if generation.id().is_none() {
            generation.base_mut().id = Some(generate_id());
        }
        let mut data = StepRecord::new(StepType::Llm)
            .with_input(generation.step_input())
            .with_end_time(now_utc());
        data.name.clone_from(&generation.base().model);
        data.output = generation.step_output();
        data.generation = Some(generation.clone());

        let step = self.step(data);
        debug!(step_id = %step.id(), "Logging generation as llm step");
        step.send().await?;
        Ok(generation)
    }

    /// Creates one score.
    ///
    /// # Errors
    ///
    /// Fails on an invalid target or a collaborator error.
    pub async fn score(&self, score: ScoreRecord) -> Result<ScoreRecord, LiteralError> {
        let mut created = self.scores(vec![score.clone()]).await?;
        Ok(created.pop().unwrap_or(score))
    }

    /// Creates scores after checking each has exactly one target.
    ///
    /// # Errors
    ///
    /// Fails on an invalid target or a collaborator error.
    pub async fn scores(&self, scores: Vec<ScoreRecord>) -> Result<Vec<ScoreRecord>, LiteralError> {
        for score in &scores {
            score.validate()?;
        }
        Ok(self.inner.dispatcher.create_scores(scores).await?)
    }

    /// Fetches a step, falling back to the cache when the collaborator fails.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error when the step is not cached either.
    pub async fn get_step(&self, id: &str) -> Result<Option<StepRecord>, ApiError> {
        match self.inner.dispatcher.get_step(id).await {
            Ok(step) => {
                if let Some(step) = &step {
                    self.inner.cache.put(id, step.clone());
                }
                Ok(step)
            }
            Err(e) => match self.inner.cache.get(id).and_then(|entity| entity.as_step().cloned()) {
                Some(cached) => {
                    warn!(step_id = %id, error = %e, "Serving step from cache");
                    Ok(Some(cached))
                }
                None => Err(e),
            },
        }
    }

    /// Fetches a thread, falling back to the cache when the collaborator fails.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error when the thread is not cached either.
    pub async fn get_thread(&self, id: &str) -> Result<Option<ThreadRecord>, ApiError> {
        match self.inner.dispatcher.get_thread(id).await {
            Ok(thread) => {
                if let Some(thread) = &thread {
                    self.inner.cache.put(id, thread.clone());
                }
                Ok(thread)
            }
            Err(e) => match self.inner.cache.get(id).and_then(|entity| entity.as_thread().cloned()) {
                Some(cached) => {
                    warn!(thread_id = %id, error = %e, "Serving thread from cache");
                    Ok(Some(cached))
                }
                None => Err(e),
            },
        }
    }

    /// Creates the `run` step of one experiment item. The step does not
    /// inherit anything from the current context.
    pub fn experiment_item_run(&self, mut data: StepRecord) -> ExperimentItemRun {
        data.step_type = StepType::Run;
        if data.name.is_none() {
            data.name = Some("Experiment Run".to_string());
        }
        ExperimentItemRun::new(self.step_without_context(data))
    }

    /// Handle for logging items against an existing dataset experiment.
    pub fn dataset_experiment(&self, record: DatasetExperimentRecord) -> DatasetExperiment {
        DatasetExperiment::new(record, self.clone())
    }

    /// Waits until every background dispatch has finished.
    pub async fn flush(&self) {
        self.inner.dispatcher.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ChatGeneration, GenerationMessage, MessageRole, ScoreType};
    use crate::errors::ValidationError;
    use crate::testing::{client_with, InMemoryApi};
    use serde_json::json;

    #[test]
    fn test_build_requires_api_key() {
        let err = LiteralClient::builder()
            .config(ClientConfig::new())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey);

        let client = LiteralClient::builder()
            .config(ClientConfig::new().with_disabled(true))
            .build()
            .unwrap();
        assert!(client.is_disabled());
    }

    #[test]
    fn test_step_outside_context_has_no_links() {
        let client = client_with(Arc::new(InMemoryApi::new()));
        let step = client.step(StepRecord::new(StepType::Tool).with_id("explicit"));

        let record = step.record();
        assert_eq!(step.id(), "explicit");
        assert!(record.thread_id.is_none());
        assert!(record.parent_id.is_none());
        assert!(record.created_at.is_some());
        assert!(record.start_time.is_some());
    }

    #[test]
    fn test_thread_gets_id_and_environment() {
        let client = client_with(Arc::new(InMemoryApi::new()));
        let thread = client.thread(ThreadRecord::new());

        assert!(!thread.id().is_empty());
        assert_eq!(thread.record().environment, Some(Environment::Dev));
    }

    #[tokio::test]
    async fn test_log_generation_outside_context_is_standalone() {
        let api = Arc::new(InMemoryApi::new());
        let client = client_with(api.clone());

        let generation = ChatGeneration {
            messages: vec![GenerationMessage::new(MessageRole::User, "hi")],
            ..ChatGeneration::default()
        };
        client.log_generation(generation.into()).await.unwrap();

        assert_eq!(api.generations().len(), 1);
        assert!(api.sent_steps().is_empty());
    }

    #[tokio::test]
    async fn test_log_generation_inside_thread_creates_llm_step() {
        let api = Arc::new(InMemoryApi::new());
        let client = client_with(api.clone());
        let thread = client.thread(ThreadRecord::new());

        let generation: Generation = ChatGeneration {
            messages: vec![GenerationMessage::new(MessageRole::User, "hi")],
            message_completion: Some(GenerationMessage::new(MessageRole::Assistant, "hello")),
            ..ChatGeneration::default()
        }
        .into();

        let c = client.clone();
        let logged: Result<Generation, ApiError> = thread
            .wrap(|_| async move { c.log_generation(generation).await })
            .await;
        let logged = logged.unwrap();

        let steps = api.sent_steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].step_type, StepType::Llm);
        assert_eq!(steps[0].thread_id.as_deref(), Some(thread.id()));
        assert_eq!(steps[0].input, Some(json!({"messages": [{"role": "user", "content": "hi"}]})));
        assert_eq!(steps[0].generation.as_ref().and_then(Generation::id), logged.id());
        assert!(api.generations().is_empty());
    }

    #[tokio::test]
    async fn test_score_requires_single_target() {
        let api = Arc::new(InMemoryApi::new());
        let client = client_with(api.clone());

        let err = client
            .score(ScoreRecord::new("quality", 1.0, ScoreType::Human))
            .await
            .unwrap_err();
        assert!(matches!(err, LiteralError::Validation(ValidationError::ScoreTarget { .. })));

        client
            .score(ScoreRecord::new("quality", 1.0, ScoreType::Ai).for_step("s1"))
            .await
            .unwrap();
        assert_eq!(api.scores().len(), 1);
    }

    #[tokio::test]
    async fn test_get_step_falls_back_to_cache() {
        let api = Arc::new(InMemoryApi::new());
        let client = client_with(api.clone());

        let step = client.step(StepRecord::new(StepType::Tool).with_name("cached"));
        step.send().await.unwrap();
        assert!(client.get_step(step.id()).await.unwrap().is_some());

        api.set_outage(true);
        let fetched = client.get_step(step.id()).await.unwrap().unwrap();
        assert_eq!(fetched.name.as_deref(), Some("cached"));
        assert!(client.get_step("unknown").await.is_err());
    }

    #[tokio::test]
    async fn test_get_thread_includes_steps() {
        let api = Arc::new(InMemoryApi::new());
        let client = client_with(api.clone());
        let thread = client.thread(ThreadRecord::new());
        thread.upsert().await.unwrap();
        thread.step(StepRecord::new(StepType::UserMessage)).send().await.unwrap();

        let fetched = client.get_thread(thread.id()).await.unwrap().unwrap();
        assert_eq!(fetched.steps.len(), 1);
    }
}
