// SPDX-License-Identifier: MIT

//! Typed error handling for tutor-rs
//!
//! Library code returns [`TutorError`]; the binary wraps it in `anyhow`.

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, TutorError>;

/// Top-level error type for tutor-rs
#[derive(Debug, Error)]
pub enum TutorError {
    /// API errors from external services (model provider, web loader)
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Graph construction or routing errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Model/LLM errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// A run finished a handler without producing a usable answer
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Document loading errors
    #[error("Failed to load '{source_name}': {message}")]
    Loader {
        source_name: String,
        message: String,
    },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Graph construction and routing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// No edge leaves the start stage
    #[error("Graph has no entry edge from start")]
    MissingEntry,

    /// A stage was given a second set of outgoing edges
    #[error("Stage '{0}' already has outgoing edges")]
    DuplicateEdge(String),

    /// Conditional edges do not cover every intent
    #[error("Conditional edges from '{from}' have no branch for intent '{intent}'")]
    MissingBranch { from: String, intent: String },

    /// Routing hit an intent with no configured branch
    #[error("No branch from '{from}' for intent '{intent}'")]
    NoBranch { from: String, intent: String },

    /// Routing reached a conditional edge before the intent was set
    #[error("Intent not set when routing from '{0}'")]
    IntentUnset(String),

    /// Circular dependency detected in graph
    #[error("Circular dependency detected: {0:?}")]
    CircularDependency(Vec<String>),

    /// Stage declared but never reached from start
    #[error("Stage '{0}' is unreachable from start")]
    Unreachable(String),

    /// Edge touching start or end in the wrong direction
    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    /// Execution visited more stages than the graph allows
    #[error("Graph execution exceeded {0} steps")]
    StepLimit(usize),
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Model not supported
    #[error("Model provider not supported: {0}")]
    UnsupportedProvider(String),

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// Model returned no text at all
    #[error("Model returned an empty response")]
    EmptyResponse,
}

impl TutorError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a loader error
    pub fn loader(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Loader {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for TutorError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for TutorError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
