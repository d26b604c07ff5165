//! Test collaborators.
//!
//! `InMemoryApi` stands in for the backend: it records every call, upserts
//! entities by id, and can simulate an outage.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::{CallOptions, LiteralApi};
use crate::client::LiteralClient;
use crate::config::{ClientConfig, Environment};
use crate::entities::{ExperimentItem, Generation, ScoreRecord, StepRecord, ThreadRecord};
use crate::errors::ApiError;
use crate::utils::generate_id;

/// An in-memory backend.
#[derive(Debug, Default)]
pub struct InMemoryApi {
    steps: DashMap<String, StepRecord>,
    step_sends: Mutex<Vec<StepRecord>>,
    threads: DashMap<String, ThreadRecord>,
    thread_upserts: Mutex<Vec<ThreadRecord>>,
    generations: Mutex<Vec<Generation>>,
    scores: Mutex<Vec<ScoreRecord>>,
    items: Mutex<Vec<ExperimentItem>>,
    call_options: Mutex<Vec<CallOptions>>,
    outage: AtomicBool,
}

impl InMemoryApi {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail until switched off.
    pub fn set_outage(&self, outage: bool) {
        self.outage.store(outage, Ordering::SeqCst);
    }

    fn check(&self, options: CallOptions) -> Result<(), ApiError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(ApiError::response(503, "simulated outage"));
        }
        self.call_options.lock().push(options);
        Ok(())
    }

    /// Every step sent, in order, duplicates included.
    #[must_use]
    pub fn sent_steps(&self) -> Vec<StepRecord> {
        self.step_sends.lock().clone()
    }

    /// Latest stored version of a step.
    #[must_use]
    pub fn step(&self, id: &str) -> Option<StepRecord> {
        self.steps.get(id).map(|entry| entry.value().clone())
    }

    /// Number of times a step id was sent.
    #[must_use]
    pub fn send_count(&self, id: &str) -> usize {
        self.step_sends
            .lock()
            .iter()
            .filter(|step| step.id.as_deref() == Some(id))
            .count()
    }

    /// Every thread upserted, in order.
    #[must_use]
    pub fn threads(&self) -> Vec<ThreadRecord> {
        self.thread_upserts.lock().clone()
    }

    /// Latest stored version of a thread.
    #[must_use]
    pub fn thread(&self, id: &str) -> Option<ThreadRecord> {
        self.threads.get(id).map(|entry| entry.value().clone())
    }

    /// Number of times a thread id was upserted.
    #[must_use]
    pub fn upsert_count(&self, id: &str) -> usize {
        self.thread_upserts
            .lock()
            .iter()
            .filter(|thread| thread.id.as_deref() == Some(id))
            .count()
    }

    /// Standalone generations.
    #[must_use]
    pub fn generations(&self) -> Vec<Generation> {
        self.generations.lock().clone()
    }

    /// Created scores.
    #[must_use]
    pub fn scores(&self) -> Vec<ScoreRecord> {
        self.scores.lock().clone()
    }

    /// Logged experiment items.
    #[must_use]
    pub fn items(&self) -> Vec<ExperimentItem> {
        self.items.lock().clone()
    }

    /// Options of every successful call, in order.
    #[must_use]
    pub fn call_options(&self) -> Vec<CallOptions> {
        self.call_options.lock().clone()
    }
}

#[async_trait]
impl LiteralApi for InMemoryApi {
    async fn send_steps(&self, steps: Vec<StepRecord>, options: CallOptions) -> Result<(), ApiError> {
        self.check(options)?;
        for mut step in steps {
            let id = step.id.get_or_insert_with(generate_id).clone();
            self.step_sends.lock().push(step.clone());
            self.steps.insert(id, step);
        }
        Ok(())
    }

    async fn upsert_thread(
        &self,
        mut thread: ThreadRecord,
        options: CallOptions,
    ) -> Result<ThreadRecord, ApiError> {
        self.check(options)?;
        let id = thread.id.get_or_insert_with(generate_id).clone();
        self.thread_upserts.lock().push(thread.clone());
        self.threads.insert(id, thread.clone());
        Ok(thread)
    }

    async fn get_step(&self, id: String, options: CallOptions) -> Result<Option<StepRecord>, ApiError> {
        self.check(options)?;
        Ok(self.step(&id))
    }

    async fn get_thread(
        &self,
        id: String,
        options: CallOptions,
    ) -> Result<Option<ThreadRecord>, ApiError> {
        self.check(options)?;
        Ok(self.thread(&id).map(|mut thread| {
            thread.steps = self
                .steps
                .iter()
                .filter(|entry| entry.value().thread_id.as_deref() == Some(id.as_str()))
                .map(|entry| entry.value().clone())
                .collect();
            thread.steps.sort_by_key(|step| step.start_time);
            thread
        }))
    }

    async fn create_generation(
        &self,
        mut generation: Generation,
        options: CallOptions,
    ) -> Result<Generation, ApiError> {
        self.check(options)?;
        if generation.id().is_none() {
            generation.base_mut().id = Some(generate_id());
        }
        self.generations.lock().push(generation.clone());
        Ok(generation)
    }

    async fn create_scores(
        &self,
        scores: Vec<ScoreRecord>,
        options: CallOptions,
    ) -> Result<Vec<ScoreRecord>, ApiError> {
        self.check(options)?;
        let created: Vec<_> = scores
            .into_iter()
            .map(|mut score| {
                score.id.get_or_insert_with(generate_id);
                score
            })
            .collect();
        self.scores.lock().extend(created.iter().cloned());
        Ok(created)
    }

    async fn create_experiment_item(
        &self,
        mut item: ExperimentItem,
        options: CallOptions,
    ) -> Result<ExperimentItem, ApiError> {
        self.check(options)?;
        item.id.get_or_insert_with(generate_id);
        self.items.lock().push(item.clone());
        Ok(item)
    }
}

/// Builds an enabled client in the `dev` environment backed by `api`.
pub fn client_with(api: Arc<InMemoryApi>) -> LiteralClient {
    let config = ClientConfig::new()
        .with_api_key("test-key")
        .with_environment(Environment::Dev);
    match LiteralClient::builder().config(config).api(api).build() {
        Ok(client) => client,
        Err(e) => unreachable!("test configuration is valid: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::StepType;

    #[tokio::test]
    async fn test_steps_upsert_by_id() {
        let api = InMemoryApi::new();
        let options = CallOptions::default();

        let first = StepRecord::new(StepType::Tool).with_id("s1").with_name("a");
        let second = StepRecord::new(StepType::Tool).with_id("s1").with_name("b");
        api.send_steps(vec![first], options).await.unwrap();
        api.send_steps(vec![second], options).await.unwrap();

        assert_eq!(api.send_count("s1"), 2);
        assert_eq!(api.step("s1").unwrap().name.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_outage_fails_calls() {
        let api = InMemoryApi::new();
        api.set_outage(true);

        let err = api
            .get_thread("t1".to_string(), CallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Response { status: 503, .. }));
        assert!(api.call_options().is_empty());
    }
}
