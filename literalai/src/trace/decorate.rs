//! Metadata, tag and id injection without creating an entity.

use std::future::Future;
use tracing::debug;

use crate::context::{self, current_frame};
use crate::entities::Metadata;

/// What a decorate scope adds to the context.
#[derive(Debug, Clone, Default)]
pub struct DecorateOptions {
    /// Metadata merged into threads and steps created in scope.
    pub metadata: Metadata,
    /// Tags appended to threads and steps created in scope.
    pub tags: Vec<String>,
    /// Id given to the first step created in scope.
    pub step_id: Option<String>,
}

impl DecorateOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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

    /// Sets the id of the next created step.
    #[must_use]
    pub fn with_step_id(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }
}

/// Wraps callbacks in a decorated context. Built by `LiteralClient::decorate`.
#[derive(Debug, Clone)]
pub struct Decorator {
    options: DecorateOptions,
}

impl Decorator {
    pub(crate) fn new(options: DecorateOptions) -> Self {
        Self { options }
    }

    /// Runs `f` with the decorations added to the current context.
    ///
    /// Decorations accumulate over enclosing decorate scopes. Each call queues
    /// its own copy of the step id.
    pub async fn wrap<F, Fut>(&self, f: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let frame = current_frame().unwrap_or_default().decorated(
            &self.options.metadata,
            &self.options.tags,
            self.options.step_id.clone(),
        );
        debug!(
            tags = ?self.options.tags,
            step_id = ?self.options.step_id,
            "Running decorated scope"
        );
        context::run(frame, f()).await
    }
}
