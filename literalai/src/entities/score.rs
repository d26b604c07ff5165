//! Score records: human or AI evaluations of steps, generations and
//! experiment items.

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Who produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScoreType {
    /// Human feedback.
    #[default]
    Human,
    /// Automated (model) evaluation.
    Ai,
}

/// A score attached to exactly one step, generation or experiment item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreRecord {
    /// Score id, assigned by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Score name (e.g. "helpfulness").
    pub name: String,
    /// Numeric value.
    pub value: f64,
    /// Score origin.
    #[serde(rename = "type")]
    pub score_type: ScoreType,
    /// Target step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Target generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_id: Option<String>,
    /// Target experiment item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_experiment_item_id: Option<String>,
    /// Scorer identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scorer: Option<String>,
    /// Free-form comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ScoreRecord {
    /// Creates a score without a target.
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64, score_type: ScoreType) -> Self {
        Self {
            name: name.into(),
            value,
            score_type,
            ..Self::default()
        }
    }

    /// Targets a step.
    #[must_use]
    pub fn for_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    /// Targets a generation.
    #[must_use]
    pub fn for_generation(mut self, generation_id: impl Into<String>) -> Self {
        self.generation_id = Some(generation_id.into());
        self
    }

    /// Targets an experiment item.
    #[must_use]
    pub fn for_experiment_item(mut self, item_id: impl Into<String>) -> Self {
        self.dataset_experiment_item_id = Some(item_id.into());
        self
    }

    /// Sets the scorer identity.
    #[must_use]
    pub fn with_scorer(mut self, scorer: impl Into<String>) -> Self {
        self.scorer = Some(scorer.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Checks that exactly one target is set.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ScoreTarget` otherwise.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let targets = [
            self.step_id.is_some(),
            self.generation_id.is_some(),
            self.dataset_experiment_item_id.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();

        if targets == 1 {
            Ok(())
        } else {
            Err(ValidationError::ScoreTarget {
                name: self.name.clone(),
                targets,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_wire_shape() {
        let score = ScoreRecord::new("helpfulness", 0.8, ScoreType::Ai)
            .for_step("s1")
            .with_comment("good");
        let value = serde_json::to_value(&score).unwrap();

        assert_eq!(value["type"], "AI");
        assert_eq!(value["stepId"], "s1");
        assert_eq!(value["value"], 0.8);
        assert!(value.get("generationId").is_none());
    }

    #[test]
    fn test_validate_requires_exactly_one_target() {
        let untargeted = ScoreRecord::new("x", 1.0, ScoreType::Human);
        assert_eq!(
            untargeted.validate(),
            Err(ValidationError::ScoreTarget { name: "x".to_string(), targets: 0 })
        );

        let double = untargeted.clone().for_step("s").for_generation("g");
        assert!(double.validate().is_err());

        assert!(untargeted.for_experiment_item("i").validate().is_ok());
    }
}
