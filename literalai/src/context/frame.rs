//! The execution context frame visible to code running inside a wrap.

use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};

use crate::entities::{merge_tags, Metadata, StepRecord, ThreadRecord};

/// Weak reference to the thread active in a frame.
///
/// The id is cached so inheritance keeps working even if the caller drops
/// its handle; the record itself is not kept alive by the frame.
#[derive(Debug, Clone)]
pub(crate) struct ThreadRef {
    pub(crate) id: String,
    pub(crate) record: Weak<RwLock<ThreadRecord>>,
}

/// Weak reference to a step active in a frame.
#[derive(Debug, Clone)]
pub(crate) struct StepRef {
    pub(crate) id: String,
    pub(crate) thread_id: Option<String>,
    pub(crate) record: Weak<RwLock<StepRecord>>,
}

/// An id queued for the next created step. Shared by every frame derived
/// inside the same decorate scope so it is consumed at most once.
type PendingId = Arc<Mutex<Option<String>>>;

/// The ambient context of one logical task.
#[derive(Debug, Clone, Default)]
pub struct ContextFrame {
    thread: Option<ThreadRef>,
    step: Option<StepRef>,
    root_run: Option<StepRef>,
    metadata: Metadata,
    tags: Vec<String>,
    pending_step_id: Option<PendingId>,
    experiment_run_id: Option<String>,
    experiment_item_run_id: Option<String>,
}

impl ContextFrame {
    /// Creates an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the current thread.
    #[must_use]
    pub fn thread_id(&self) -> Option<&str> {
        self.thread.as_ref().map(|t| t.id.as_str())
    }

    /// Id of the current step.
    #[must_use]
    pub fn step_id(&self) -> Option<&str> {
        self.step.as_ref().map(|s| s.id.as_str())
    }

    /// Id of the nearest enclosing `run` step.
    #[must_use]
    pub fn root_run_id(&self) -> Option<&str> {
        self.root_run.as_ref().map(|s| s.id.as_str())
    }

    /// Thread id new steps inherit: the current thread, else the thread of
    /// the current step.
    #[must_use]
    pub fn inherited_thread_id(&self) -> Option<&str> {
        self.thread_id()
            .or_else(|| self.step.as_ref().and_then(|s| s.thread_id.as_deref()))
    }

    /// Metadata merged into new threads and steps.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Tags merged into new threads and steps.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Experiment run correlation id.
    #[must_use]
    pub fn experiment_run_id(&self) -> Option<&str> {
        self.experiment_run_id.as_deref()
    }

    /// Experiment item run correlation id.
    #[must_use]
    pub fn experiment_item_run_id(&self) -> Option<&str> {
        self.experiment_item_run_id.as_deref()
    }

    /// Returns the queued step id without consuming it.
    #[must_use]
    pub fn pending_step_id(&self) -> Option<String> {
        self.pending_step_id
            .as_ref()
            .and_then(|pending| pending.lock().clone())
    }

    /// Consumes the queued step id; later calls in the same scope get `None`.
    pub fn take_pending_step_id(&self) -> Option<String> {
        self.pending_step_id
            .as_ref()
            .and_then(|pending| pending.lock().take())
    }

    pub(crate) fn thread_ref(&self) -> Option<&ThreadRef> {
        self.thread.as_ref()
    }

    pub(crate) fn step_ref(&self) -> Option<&StepRef> {
        self.step.as_ref()
    }

    pub(crate) fn root_run_ref(&self) -> Option<&StepRef> {
        self.root_run.as_ref()
    }

    /// Frame for the extent of `thread.wrap`: no step and no root run.
    pub(crate) fn for_thread(&self, thread: ThreadRef) -> Self {
        Self {
            thread: Some(thread),
            step: None,
            root_run: None,
            ..self.clone()
        }
    }

    /// Frame for the extent of `step.wrap`. A `run` step becomes the root run
    /// unless one is already set.
    pub(crate) fn for_step(&self, step: StepRef, is_run: bool) -> Self {
        let root_run = match &self.root_run {
            Some(existing) => Some(existing.clone()),
            None if is_run => Some(step.clone()),
            None => None,
        };
        Self {
            step: Some(step),
            root_run,
            ..self.clone()
        }
    }

    /// Frame for the extent of a decorate scope.
    pub(crate) fn decorated(
        &self,
        metadata: &Metadata,
        tags: &[String],
        step_id: Option<String>,
    ) -> Self {
        let mut frame = self.clone();
        frame
            .metadata
            .extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        merge_tags(&mut frame.tags, tags);
        if let Some(id) = step_id {
            frame.pending_step_id = Some(Arc::new(Mutex::new(Some(id))));
        }
        frame
    }

    /// Sets the experiment run correlation id.
    #[must_use]
    pub(crate) fn with_experiment_run_id(mut self, id: impl Into<String>) -> Self {
        self.experiment_run_id = Some(id.into());
        self
    }

    /// Sets the experiment item run correlation id.
    #[must_use]
    pub(crate) fn with_experiment_item_run_id(mut self, id: impl Into<String>) -> Self {
        self.experiment_item_run_id = Some(id.into());
        self
    }
}
