//! Experiment runs layered on the composition engine.
//!
//! Running an experiment switches the client's environment to `experiment`
//! for the extent of the wrapped callback and records run ids in the context
//! so logged items can be correlated with the run that produced them.

use serde::Serialize;
use std::future::Future;
use tracing::debug;

use crate::client::LiteralClient;
use crate::config::Environment;
use crate::context::{self, current_frame};
use crate::entities::{DatasetExperimentRecord, ExperimentItem, StepUpdate};
use crate::errors::ApiError;
use crate::trace::{Step, UpdateAfter};

/// An existing dataset experiment items are logged against.
#[derive(Debug, Clone)]
pub struct DatasetExperiment {
    record: DatasetExperimentRecord,
    client: LiteralClient,
}

impl DatasetExperiment {
    pub(crate) fn new(record: DatasetExperimentRecord, client: LiteralClient) -> Self {
        Self { record, client }
    }

    /// Experiment id.
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// The experiment record.
    pub fn record(&self) -> &DatasetExperimentRecord {
        &self.record
    }

    /// Logs an item of this experiment.
    ///
    /// Without an explicit run id the item is attributed to the current
    /// experiment item run, else to the current experiment run.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error.
    pub async fn log(&self, mut item: ExperimentItem) -> Result<ExperimentItem, ApiError> {
        if item.dataset_experiment_id.is_empty() {
            item.dataset_experiment_id.clone_from(&self.record.id);
        }
        if item.experiment_run_id.is_none() {
            item.experiment_run_id = current_frame().and_then(|frame| {
                frame
                    .experiment_item_run_id()
                    .or_else(|| frame.experiment_run_id())
                    .map(String::from)
            });
        }
        debug!(
            experiment_id = %item.dataset_experiment_id,
            run_id = ?item.experiment_run_id,
            "Logging experiment item"
        );
        self.client
            .dispatcher()
            .create_experiment_item(item)
            .await
    }

    /// A run of this experiment.
    pub fn run(&self) -> ExperimentRun {
        ExperimentRun {
            experiment_id: self.record.id.clone(),
            client: self.client.clone(),
        }
    }
}

/// Scope in which everything is tagged as experiment traffic.
#[derive(Debug, Clone)]
pub struct ExperimentRun {
    experiment_id: String,
    client: LiteralClient,
}

impl ExperimentRun {
    /// Runs `f` in the `experiment` environment with this run current.
    ///
    /// The previous environment is restored when `f` settles, even if it
    /// fails or panics.
    pub async fn wrap<F, Fut>(&self, f: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let _guard = self
            .client
            .dispatcher()
            .enter_environment(Environment::Experiment);
        let frame = current_frame()
            .unwrap_or_default()
            .as_ref()
            .clone()
            .with_experiment_run_id(self.experiment_id.clone());
        context::run(frame, f()).await
    }
}

/// The `run` step recording one experiment item.
#[derive(Debug, Clone)]
pub struct ExperimentItemRun {
    step: Step,
}

impl ExperimentItemRun {
    pub(crate) fn new(step: Step) -> Self {
        Self { step }
    }

    /// The underlying step.
    pub fn step(&self) -> &Step {
        &self.step
    }

    /// Id of the run step.
    pub fn id(&self) -> &str {
        self.step.id()
    }

    /// Runs `f` as the run step, in the `experiment` environment.
    ///
    /// # Errors
    ///
    /// Returns the error of `f` unchanged; the step is then not sent.
    pub async fn wrap<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(Step) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
    {
        self.scoped(self.step.wrap(f)).await
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
        F: FnOnce(Step) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
    {
        self.scoped(self.step.wrap_with(f, update_after)).await
    }

    async fn scoped<Fut: Future>(&self, future: Fut) -> Fut::Output {
        let _guard = self
            .step
            .client()
            .dispatcher()
            .enter_environment(Environment::Experiment);
        let frame = current_frame()
            .unwrap_or_default()
            .as_ref()
            .clone()
            .with_experiment_item_run_id(self.step.id());
        context::run(frame, future).await
    }
}
