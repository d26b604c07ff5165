//! Entity records reported to the backend.
//!
//! Records are plain values with `with_*` builders. The client turns them into
//! shared handles (`Thread`, `Step`) once they enter the composition engine.

mod attachment;
mod entity;
mod experiment;
mod generation;
mod score;
mod step;
mod thread;

pub use attachment::Attachment;
pub use entity::{Entity, ToWireFormat};
pub use experiment::{DatasetExperimentRecord, ExperimentItem};
pub use generation::{
    ChatGeneration, CompletionGeneration, Generation, GenerationBase, GenerationMessage,
    MessageRole,
};
pub use score::{ScoreRecord, ScoreType};
pub use step::{StepRecord, StepType, StepUpdate};
pub use thread::{ThreadRecord, ThreadUpdate};

use std::collections::HashMap;

/// String-keyed metadata attached to threads and steps.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Merges ambient metadata under `local`; keys already set locally win.
pub(crate) fn merge_metadata(local: &mut Metadata, ambient: &Metadata) {
    for (key, value) in ambient {
        local.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

/// Appends ambient tags after the local ones.
pub(crate) fn merge_tags(local: &mut Vec<String>, ambient: &[String]) {
    local.extend(ambient.iter().cloned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_metadata_keeps_local_values() {
        let mut local = Metadata::new();
        local.insert("k".to_string(), json!("local"));
        let mut ambient = Metadata::new();
        ambient.insert("k".to_string(), json!("ambient"));
        ambient.insert("other".to_string(), json!(1));

        merge_metadata(&mut local, &ambient);

        assert_eq!(local.get("k"), Some(&json!("local")));
        assert_eq!(local.get("other"), Some(&json!(1)));
    }

    #[test]
    fn test_merge_tags_appends() {
        let mut local = vec!["a".to_string()];
        merge_tags(&mut local, &["b".to_string(), "a".to_string()]);
        assert_eq!(local, vec!["a", "b", "a"]);
    }
}
