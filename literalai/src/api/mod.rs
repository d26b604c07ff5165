//! The API collaborator contract.
//!
//! The wire client (GraphQL/REST calls, retries, payload encoding) lives
//! outside this crate. The composition engine only needs the operations of
//! `LiteralApi`; every call carries the `CallOptions` captured at dispatch.

mod logging;

pub use logging::LoggingApi;

use async_trait::async_trait;

use crate::config::Environment;
use crate::entities::{ExperimentItem, Generation, ScoreRecord, StepRecord, ThreadRecord};
use crate::errors::ApiError;

/// Per-call options captured when an entity is dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Environment tag for the call.
    pub environment: Option<Environment>,
}

impl CallOptions {
    /// Creates options for the given environment.
    #[must_use]
    pub fn new(environment: Option<Environment>) -> Self {
        Self { environment }
    }
}

/// Backend operations the client depends on.
///
/// Implementations must be idempotent per entity id: the same step may be
/// sent more than once (manual `send` plus the automatic send of `wrap`).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LiteralApi: Send + Sync {
    /// Upserts a batch of steps.
    async fn send_steps(&self, steps: Vec<StepRecord>, options: CallOptions) -> Result<(), ApiError>;

    /// Upserts a thread and returns the stored record.
    async fn upsert_thread(
        &self,
        thread: ThreadRecord,
        options: CallOptions,
    ) -> Result<ThreadRecord, ApiError>;

    /// Fetches a step by id.
    async fn get_step(&self, id: String, options: CallOptions) -> Result<Option<StepRecord>, ApiError>;

    /// Fetches a thread by id, including its steps.
    async fn get_thread(
        &self,
        id: String,
        options: CallOptions,
    ) -> Result<Option<ThreadRecord>, ApiError>;

    /// Logs a generation outside of any thread or step.
    async fn create_generation(
        &self,
        generation: Generation,
        options: CallOptions,
    ) -> Result<Generation, ApiError>;

    /// Creates scores.
    async fn create_scores(
        &self,
        scores: Vec<ScoreRecord>,
        options: CallOptions,
    ) -> Result<Vec<ScoreRecord>, ApiError>;

    /// Logs an experiment item.
    async fn create_experiment_item(
        &self,
        item: ExperimentItem,
        options: CallOptions,
    ) -> Result<ExperimentItem, ApiError>;
}
