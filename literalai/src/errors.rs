//! Error types for the literalai client.
//!
//! Instrumentation must never add failure modes to host code, so only a few
//! of these ever reach the caller: configuration errors at construction,
//! context errors from the strict accessors, and collaborator errors from
//! explicitly awaited calls. Fire-and-forget dispatch failures are logged.

use std::collections::HashMap;
use thiserror::Error;

/// The main error type for literalai operations.
#[derive(Debug, Error)]
pub enum LiteralError {
    /// The client configuration is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A context accessor was used outside of a matching scope.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// The API collaborator failed.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// An entity failed validation before dispatch.
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// Errors raised while building a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No API key was configured and the client is not disabled.
    #[error("No API key provided: set LITERAL_API_KEY or pass one in ClientConfig (or disable the client)")]
    MissingApiKey,

    /// The environment name is not one of dev, staging, prod or experiment.
    #[error("Invalid environment '{0}': expected one of dev, staging, prod, experiment")]
    InvalidEnvironment(String),

    /// The API url is empty.
    #[error("API url must not be empty")]
    EmptyUrl,
}

/// Errors raised when reading the ambient context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// No thread is active in the current context.
    #[error("No active thread in the current context: wrap your code in thread.wrap() or call thread.enter()")]
    NoActiveThread,

    /// No step is active in the current context.
    #[error("No active step in the current context: wrap your code in step.wrap() or call step.enter()")]
    NoActiveStep,

    /// `enter` was called outside of any context scope.
    #[error("No context scope to enter: run the caller inside client.scope() or a wrap()")]
    NoActiveScope,
}

/// Errors returned by the API collaborator.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("Request failed: {0}")]
    Request(String),

    /// The backend answered with an error status.
    #[error("Backend returned {status}: {message}")]
    Response {
        /// HTTP-like status code.
        status: u16,
        /// Error message from the backend.
        message: String,
    },

    /// A payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other transport failure.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl ApiError {
    /// Creates a response error.
    #[must_use]
    pub fn response(status: u16, message: impl Into<String>) -> Self {
        Self::Response {
            status,
            message: message.into(),
        }
    }

    /// Converts to a dictionary representation for structured logs.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        let kind = match self {
            Self::Request(_) => "request",
            Self::Response { status, .. } => {
                map.insert("status".to_string(), serde_json::json!(status));
                "response"
            }
            Self::Serialization(_) => "serialization",
            Self::Transport(_) => "transport",
        };
        map.insert("type".to_string(), serde_json::json!(kind));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Errors raised when an entity is not fit to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A score must target exactly one of step, generation or experiment item.
    #[error("Score '{name}' must target exactly one of stepId, generationId or datasetExperimentItemId (found {targets})")]
    ScoreTarget {
        /// The score name.
        name: String,
        /// How many targets were set.
        targets: usize,
    },
}
