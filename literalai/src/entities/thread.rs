//! Thread records: a session grouping steps.

use serde::{Deserialize, Serialize};

use super::{Metadata, StepRecord};
use crate::config::Environment;
use crate::utils::Timestamp;

/// A thread as sent to and fetched from the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadRecord {
    /// Thread id, assigned locally when the client creates the thread.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Participant (end user) identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    /// Environment the thread was recorded in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    /// Free-form metadata.
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    /// Tags, duplicates allowed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Steps; only populated on fetch.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepRecord>,
}

impl ThreadRecord {
    /// Creates an empty thread record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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

    /// Sets the participant identifier.
    #[must_use]
    pub fn with_participant_id(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = Some(participant_id.into());
        self
    }

    /// Adds a metadata entry.
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
}

/// A partial thread update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadUpdate {
    /// New name.
    pub name: Option<String>,
    /// New participant identifier.
    pub participant_id: Option<String>,
    /// New metadata.
    pub metadata: Option<Metadata>,
    /// New tags.
    pub tags: Option<Vec<String>>,
}

impl ThreadUpdate {
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

    /// Replaces the participant identifier.
    #[must_use]
    pub fn with_participant_id(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = Some(participant_id.into());
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

    /// Applies every provided field to `record`.
    pub fn apply_to(self, record: &mut ThreadRecord) {
        if let Some(name) = self.name {
            record.name = Some(name);
        }
        if let Some(participant_id) = self.participant_id {
            record.participant_id = Some(participant_id);
        }
        if let Some(metadata) = self.metadata {
            record.metadata = metadata;
        }
        if let Some(tags) = self.tags {
            record.tags = tags;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_thread_serialization_omits_empty_fields() {
        let record = ThreadRecord::new().with_id("t1").with_name("T");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"id": "t1", "name": "T"}));
    }

    #[test]
    fn test_fetched_thread_includes_steps() {
        let record: ThreadRecord = serde_json::from_value(json!({
            "id": "t1",
            "participantId": "user-1",
            "environment": "prod",
            "steps": [{"id": "s1", "type": "user_message"}]
        }))
        .unwrap();

        assert_eq!(record.participant_id.as_deref(), Some("user-1"));
        assert_eq!(record.environment, Some(Environment::Prod));
        assert_eq!(record.steps.len(), 1);
        assert!(record.steps[0].is_message());
    }

    #[test]
    fn test_update_applies_only_provided_fields() {
        let mut record = ThreadRecord::new().with_name("T").with_tag("a");
        ThreadUpdate::new().with_name("renamed").apply_to(&mut record);

        assert_eq!(record.name.as_deref(), Some("renamed"));
        assert_eq!(record.tags, vec!["a"]);
    }
}
