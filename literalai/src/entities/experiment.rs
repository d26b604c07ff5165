//! Dataset experiment records.

use serde::{Deserialize, Serialize};

use super::{Metadata, ScoreRecord};

/// An experiment run against a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasetExperimentRecord {
    /// Experiment id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Dataset under evaluation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    /// Parameters the experiment was run with.
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub params: Metadata,
}

impl DatasetExperimentRecord {
    /// Creates an experiment record.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the dataset id.
    #[must_use]
    pub fn with_dataset_id(mut self, dataset_id: impl Into<String>) -> Self {
        self.dataset_id = Some(dataset_id.into());
        self
    }
}

/// One evaluated item of an experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperimentItem {
    /// Item id, assigned by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owning experiment.
    pub dataset_experiment_id: String,
    /// Dataset item evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_item_id: Option<String>,
    /// Correlated experiment run (root run step) id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_run_id: Option<String>,
    /// Item input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    /// Item output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Scores for the item.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scores: Vec<ScoreRecord>,
}

impl ExperimentItem {
    /// Creates an empty item; the experiment id is filled in on log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dataset item id.
    #[must_use]
    pub fn with_dataset_item_id(mut self, id: impl Into<String>) -> Self {
        self.dataset_item_id = Some(id.into());
        self
    }

    /// Sets the experiment run id explicitly.
    #[must_use]
    pub fn with_experiment_run_id(mut self, id: impl Into<String>) -> Self {
        self.experiment_run_id = Some(id.into());
        self
    }

    /// Sets the input.
    #[must_use]
    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Sets the output.
    #[must_use]
    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Adds a score.
    #[must_use]
    pub fn with_score(mut self, score: ScoreRecord) -> Self {
        self.scores.push(score);
        self
    }
}
