//! Step records: a single recorded unit of work.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use super::{Attachment, Generation, Metadata, ScoreRecord};
use crate::utils::Timestamp;

/// The kind of work a step records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// A message written by the assistant.
    AssistantMessage,
    /// An embedding call.
    Embedding,
    /// An LLM call.
    Llm,
    /// A reranking call.
    Rerank,
    /// A retrieval call.
    Retrieval,
    /// A top-level operation grouping a causal subtree.
    Run,
    /// A system prompt message.
    SystemMessage,
    /// A tool invocation.
    Tool,
    /// No specific kind.
    #[default]
    Undefined,
    /// A message written by the user.
    UserMessage,
}

impl StepType {
    /// Returns true for the three chat message kinds.
    #[must_use]
    pub fn is_message(self) -> bool {
        matches!(
            self,
            Self::UserMessage | Self::AssistantMessage | Self::SystemMessage
        )
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AssistantMessage => "assistant_message",
            Self::Embedding => "embedding",
            Self::Llm => "llm",
            Self::Rerank => "rerank",
            Self::Retrieval => "retrieval",
            Self::Run => "run",
            Self::SystemMessage => "system_message",
            Self::Tool => "tool",
            Self::Undefined => "undefined",
            Self::UserMessage => "user_message",
        };
        f.write_str(name)
    }
}

/// A step as sent to and fetched from the backend.
///
/// `id` is `None` only before the record has been handed to the client,
/// which assigns one on creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepRecord {
    /// Step id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Step kind.
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Owning thread, if any.
    pub thread_id: Option<String>,
    /// Parent step; `None` for a root step.
    pub parent_id: Option<String>,
    /// Nearest enclosing `run` step.
    pub root_run_id: Option<String>,
    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    /// Start of the unit of work.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,
    /// End of the unit of work.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    /// Input payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    /// Output payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Failure description; always serialized as a string.
    #[serde(
        serialize_with = "serialize_error",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<serde_json::Value>,
    /// Free-form metadata.
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    /// Tags, duplicates allowed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Embedded LLM call details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<Generation>,
    /// Attached files.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Scores attached to this step.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scores: Vec<ScoreRecord>,
}

fn serialize_error<S>(error: &Option<serde_json::Value>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        None => serializer.serialize_none(),
        Some(serde_json::Value::String(message)) => serializer.serialize_some(message),
        Some(other) => serializer.serialize_some(&other.to_string()),
    }
}

impl StepRecord {
    /// Creates an empty record of the given kind.
    #[must_use]
    pub fn new(step_type: StepType) -> Self {
        Self {
            step_type,
            ..Self::default()
        }
    }

    /// Returns true if this step is a chat message.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.step_type.is_message()
    }

    /// Sets an explicit id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the thread id.
    #[must_use]
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Sets the parent step id.
    #[must_use]
    pub fn with_parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets the root run id.
    #[must_use]
    pub fn with_root_run_id(mut self, root_run_id: impl Into<String>) -> Self {
        self.root_run_id = Some(root_run_id.into());
        self
    }

    /// Sets the start time.
    #[must_use]
    pub fn with_start_time(mut self, start_time: Timestamp) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Sets the end time.
    #[must_use]
    pub fn with_end_time(mut self, end_time: Timestamp) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Sets the input payload.
    #[must_use]
    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Sets the output payload.
    #[must_use]
    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<serde_json::Value>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Adds a single metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Embeds a generation.
    #[must_use]
    pub fn with_generation(mut self, generation: Generation) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// A partial step update: every `Some` field replaces the current value,
/// every `None` field leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepUpdate {
    /// New name.
    pub name: Option<String>,
    /// New input.
    pub input: Option<serde_json::Value>,
    /// New output.
    pub output: Option<serde_json::Value>,
    /// New error.
    pub error: Option<serde_json::Value>,
    /// New metadata.
    pub metadata: Option<Metadata>,
    /// New tags.
    pub tags: Option<Vec<String>>,
    /// New generation.
    pub generation: Option<Generation>,
    /// New start time.
    pub start_time: Option<Timestamp>,
    /// New end time.
    pub end_time: Option<Timestamp>,
}

impl StepUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replaces the input.
    #[must_use]
    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Replaces the output.
    #[must_use]
    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Replaces the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<serde_json::Value>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Replaces the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Replaces the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Replaces the generation.
    #[must_use]
    pub fn with_generation(mut self, generation: Generation) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Replaces the end time.
    #[must_use]
    pub fn with_end_time(mut self, end_time: Timestamp) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Applies every provided field to `record`.
    pub fn apply_to(self, record: &mut StepRecord) {
        if let Some(name) = self.name {
            record.name = Some(name);
        }
        if let Some(input) = self.input {
            record.input = Some(input);
        }
        if let Some(output) = self.output {
            record.output = Some(output);
        }
        if let Some(error) = self.error {
            record.error = Some(error);
        }
        if let Some(metadata) = self.metadata {
            record.metadata = metadata;
        }
        if let Some(tags) = self.tags {
            record.tags = tags;
        }
        if let Some(generation) = self.generation {
            record.generation = Some(generation);
        }
        if let Some(start_time) = self.start_time {
            record.start_time = Some(start_time);
        }
        if let Some(end_time) = self.end_time {
            record.end_time = Some(end_time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_is_message() {
        assert!(StepType::UserMessage.is_message());
        assert!(StepType::AssistantMessage.is_message());
        assert!(StepType::SystemMessage.is_message());
        assert!(!StepType::Run.is_message());
        assert!(!StepType::Llm.is_message());
        assert!(!StepType::Undefined.is_message());
    }

    #[test]
    fn test_step_type_serialization() {
        assert_eq!(serde_json::to_value(StepType::UserMessage).unwrap(), json!("user_message"));
        assert_eq!(StepType::Retrieval.to_string(), "retrieval");
        let parsed: StepType = serde_json::from_value(json!("rerank")).unwrap();
        assert_eq!(parsed, StepType::Rerank);
    }

    #[test]
    fn test_serializes_camel_case_with_null_relations() {
        let record = StepRecord::new(StepType::Tool).with_id("s1").with_name("search");
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["type"], "tool");
        assert_eq!(value["id"], "s1");
        assert!(value["threadId"].is_null());
        assert!(value["parentId"].is_null());
        assert!(value.get("rootRunId").is_some());
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn test_structured_error_serialized_as_string() {
        let record = StepRecord::new(StepType::Tool).with_error(json!({"code": 500}));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["error"], json!("{\"code\":500}"));

        let record = StepRecord::new(StepType::Tool).with_error("boom");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["error"], json!("boom"));
    }

    #[test]
    fn test_deserialize_fetched_step() {
        let record: StepRecord = serde_json::from_value(json!({
            "id": "s1",
            "type": "run",
            "name": "S",
            "threadId": "t1",
            "parentId": null,
            "output": {"output": "X"},
            "startTime": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(record.step_type, StepType::Run);
        assert_eq!(record.thread_id.as_deref(), Some("t1"));
        assert_eq!(record.parent_id, None);
        assert_eq!(record.output, Some(json!({"output": "X"})));
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_update_leaves_unspecified_fields() {
        let mut record = StepRecord::new(StepType::Llm)
            .with_name("before")
            .with_input(json!({"q": 1}))
            .with_tag("keep");

        StepUpdate::new()
            .with_output(json!({"a": 2}))
            .apply_to(&mut record);

        assert_eq!(record.name.as_deref(), Some("before"));
        assert_eq!(record.input, Some(json!({"q": 1})));
        assert_eq!(record.output, Some(json!({"a": 2})));
        assert_eq!(record.tags, vec!["keep"]);
    }
}
