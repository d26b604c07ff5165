//! # literalai
//!
//! Client SDK that records the execution of LLM applications as threads,
//! steps and generations.
//!
//! Units of work are wrapped in steps. Steps created while another step or
//! thread is running are attached to it automatically, so concurrent and
//! nested work is assembled into the right tree without passing ids around.
//! Finished entities are sent in the background.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use literalai::prelude::*;
//!
//! let client = LiteralClient::builder().build()?;
//! let thread = client.thread(ThreadRecord::new().with_name("support chat"));
//!
//! let answer = thread
//!     .wrap(|_| async {
//!         client
//!             .run(StepRecord::new(StepType::Run).with_name("agent"))
//!             .wrap(|_| async { answer_question().await })
//!             .await
//!     })
//!     .await?;
//!
//! client.flush().await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod entities;
pub mod errors;
pub mod experiment;
pub mod observability;
pub mod testing;
pub mod trace;
pub mod utils;

pub use client::{ClientBuilder, LiteralClient};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::api::{CallOptions, LiteralApi, LoggingApi};
    pub use crate::cache::SharedCache;
    pub use crate::client::{ClientBuilder, LiteralClient};
    pub use crate::config::{ClientConfig, Environment};
    pub use crate::context::{current_frame, spawn_in_context, ContextFrame};
    pub use crate::entities::{
        Attachment, ChatGeneration, CompletionGeneration, DatasetExperimentRecord, Entity,
        ExperimentItem, Generation, GenerationMessage, MessageRole, Metadata, ScoreRecord,
        ScoreType, StepRecord, StepType, StepUpdate, ThreadRecord, ThreadUpdate, ToWireFormat,
    };
    pub use crate::errors::{ApiError, ConfigError, ContextError, LiteralError};
    pub use crate::experiment::{DatasetExperiment, ExperimentItemRun, ExperimentRun};
    pub use crate::trace::{DecorateOptions, Decorator, Step, Thread, UpdateAfter};
    pub use crate::utils::{generate_id, Timestamp};
}
