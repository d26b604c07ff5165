//! Client configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

/// Deployment environment attached to every collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development.
    Dev,
    /// Staging deployment.
    Staging,
    /// Production deployment.
    Prod,
    /// Offline experiment runs.
    Experiment,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dev => write!(f, "dev"),
            Self::Staging => write!(f, "staging"),
            Self::Prod => write!(f, "prod"),
            Self::Experiment => write!(f, "experiment"),
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "staging" => Ok(Self::Staging),
            "prod" => Ok(Self::Prod),
            "experiment" => Ok(Self::Experiment),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

/// Configuration for a `LiteralClient`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API key sent by the transport.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base url of the backend.
    #[serde(default = "default_url")]
    pub url: String,
    /// Environment tag for every call.
    #[serde(default)]
    pub environment: Option<Environment>,
    /// When true, nothing is ever sent and no credentials are needed.
    #[serde(default)]
    pub disabled: bool,
}

fn default_url() -> String {
    "https://cloud.getliteral.ai".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: default_url(),
            environment: None,
            disabled: false,
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `LITERAL_API_KEY`, `LITERAL_API_URL`, `LITERAL_ENVIRONMENT` and
    /// `LITERAL_DISABLED` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvironment` for an unknown environment name.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("LITERAL_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("LITERAL_API_URL") {
            if !url.is_empty() {
                config.url = url;
            }
        }
        if let Ok(env) = std::env::var("LITERAL_ENVIRONMENT") {
            config.environment = Some(env.parse()?);
        }
        if let Ok(disabled) = std::env::var("LITERAL_DISABLED") {
            config.disabled = matches!(disabled.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the backend url.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Enables or disables the client.
    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Checks the configuration before a client is built.
    ///
    /// # Errors
    ///
    /// Fails when no API key is set on an enabled client, or the url is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.disabled {
            return Ok(());
        }
        if self.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingApiKey);
        }
        if self.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        Ok(())
    }
}
