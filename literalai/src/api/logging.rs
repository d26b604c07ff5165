//! An API collaborator that only logs what it would send.

use async_trait::async_trait;
use tracing::{debug, info, Level};

use super::{CallOptions, LiteralApi};
use crate::entities::{
    ExperimentItem, Generation, ScoreRecord, StepRecord, ThreadRecord, ToWireFormat,
};
use crate::errors::ApiError;
use crate::utils::generate_id;

/// Logs every payload through `tracing` and echoes it back.
///
/// Used as the transport when none is injected, so an instrumented program
/// runs and shows its traces without a backend. Fetches always return `None`.
#[derive(Debug, Clone)]
pub struct LoggingApi {
    level: Level,
}

impl Default for LoggingApi {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingApi {
    /// Creates a logging collaborator with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging collaborator.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_payload(&self, operation: &str, payload: &serde_json::Value, options: CallOptions) {
        let environment = options.environment.map(|env| env.to_string());
        if self.level == Level::DEBUG {
            debug!(operation, ?environment, %payload, "literalai payload");
        } else {
            info!(operation, ?environment, %payload, "literalai payload");
        }
    }
}

#[async_trait]
impl LiteralApi for LoggingApi {
    async fn send_steps(&self, steps: Vec<StepRecord>, options: CallOptions) -> Result<(), ApiError> {
        let payload = steps
            .iter()
            .map(ToWireFormat::to_wire_format)
            .collect::<Result<Vec<_>, _>>()?;
        self.log_payload("send_steps", &serde_json::Value::Array(payload), options);
        Ok(())
    }

    async fn upsert_thread(
        &self,
        thread: ThreadRecord,
        options: CallOptions,
    ) -> Result<ThreadRecord, ApiError> {
        self.log_payload("upsert_thread", &thread.to_wire_format()?, options);
        Ok(thread)
    }

    async fn get_step(&self, id: String, _options: CallOptions) -> Result<Option<StepRecord>, ApiError> {
        debug!(step_id = %id, "LoggingApi cannot fetch steps");
        Ok(None)
    }

    async fn get_thread(
        &self,
        id: String,
        _options: CallOptions,
    ) -> Result<Option<ThreadRecord>, ApiError> {
        debug!(thread_id = %id, "LoggingApi cannot fetch threads");
        Ok(None)
    }

    async fn create_generation(
        &self,
        mut generation: Generation,
        options: CallOptions,
    ) -> Result<Generation, ApiError> {
        if generation.id().is_none() {
            generation.base_mut().id = Some(generate_id());
        }
        self.log_payload("create_generation", &generation.to_wire_format()?, options);
        Ok(generation)
    }

    async fn create_scores(
        &self,
        scores: Vec<ScoreRecord>,
        options: CallOptions,
    ) -> Result<Vec<ScoreRecord>, ApiError> {
        let payload = scores
            .iter()
            .map(ToWireFormat::to_wire_format)
            .collect::<Result<Vec<_>, _>>()?;
        self.log_payload("create_scores", &serde_json::Value::Array(payload), options);
        Ok(scores)
    }

    async fn create_experiment_item(
        &self,
        item: ExperimentItem,
        options: CallOptions,
    ) -> Result<ExperimentItem, ApiError> {
        self.log_payload("create_experiment_item", &item.to_wire_format()?, options);
        Ok(item)
    }
}
