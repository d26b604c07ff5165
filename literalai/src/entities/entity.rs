//! The typed entity union and its wire-format contract.

use serde_json::Value;

use super::{ExperimentItem, Generation, ScoreRecord, StepRecord, ThreadRecord};

/// Conversion of a record into the JSON payload handed to the transport.
pub trait ToWireFormat {
    /// Returns the payload.
    ///
    /// # Errors
    ///
    /// Fails only if a contained value cannot be represented as JSON.
    fn to_wire_format(&self) -> Result<Value, serde_json::Error>;
}

impl ToWireFormat for StepRecord {
    fn to_wire_format(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl ToWireFormat for ThreadRecord {
    fn to_wire_format(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        // Steps are upserted on their own, never through the thread.
        if let Value::Object(ref mut map) = value {
            map.remove("steps");
        }
        Ok(value)
    }
}

impl ToWireFormat for Generation {
    fn to_wire_format(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl ToWireFormat for ScoreRecord {
    fn to_wire_format(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl ToWireFormat for ExperimentItem {
    fn to_wire_format(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Any entity the client can cache or hand to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// A thread.
    Thread(ThreadRecord),
    /// A step.
    Step(StepRecord),
    /// A standalone generation.
    Generation(Generation),
    /// A score.
    Score(ScoreRecord),
    /// An experiment item.
    ExperimentItem(ExperimentItem),
}

impl Entity {
    /// Returns the entity kind as a lowercase name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Thread(_) => "thread",
            Self::Step(_) => "step",
            Self::Generation(_) => "generation",
            Self::Score(_) => "score",
            Self::ExperimentItem(_) => "experiment_item",
        }
    }

    /// Returns the entity id, if assigned.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Thread(thread) => thread.id.as_deref(),
            Self::Step(step) => step.id.as_deref(),
            Self::Generation(generation) => generation.id(),
            Self::Score(score) => score.id.as_deref(),
            Self::ExperimentItem(item) => item.id.as_deref(),
        }
    }

    /// Returns the step, if this is one.
    #[must_use]
    pub fn as_step(&self) -> Option<&StepRecord> {
        match self {
            Self::Step(step) => Some(step),
            _ => None,
        }
    }

    /// Returns the thread, if this is one.
    #[must_use]
    pub fn as_thread(&self) -> Option<&ThreadRecord> {
        match self {
            Self::Thread(thread) => Some(thread),
            _ => None,
        }
    }
}

impl ToWireFormat for Entity {
    fn to_wire_format(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Thread(thread) => thread.to_wire_format(),
            Self::Step(step) => step.to_wire_format(),
            Self::Generation(generation) => generation.to_wire_format(),
            Self::Score(score) => score.to_wire_format(),
            Self::ExperimentItem(item) => item.to_wire_format(),
        }
    }
}

impl From<StepRecord> for Entity {
    fn from(step: StepRecord) -> Self {
        Self::Step(step)
    }
}

impl From<ThreadRecord> for Entity {
    fn from(thread: ThreadRecord) -> Self {
        Self::Thread(thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::StepType;

    #[test]
    fn test_thread_wire_format_drops_steps() {
        let mut thread = ThreadRecord::new().with_id("t1");
        thread.steps.push(StepRecord::new(StepType::Run).with_id("s1"));

        let value = thread.to_wire_format().unwrap();
        assert!(value.get("steps").is_none());
        assert_eq!(value["id"], "t1");
    }

    #[test]
    fn test_entity_accessors() {
        let entity = Entity::from(StepRecord::new(StepType::Tool).with_id("s1"));

        assert_eq!(entity.kind(), "step");
        assert_eq!(entity.id(), Some("s1"));
        assert!(entity.as_step().is_some());
        assert!(entity.as_thread().is_none());
        assert_eq!(entity.to_wire_format().unwrap()["type"], "tool");
    }
}
