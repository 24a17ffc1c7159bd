// src/error.rs

//! Unified error handling for the detector application.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for detector operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Provider catalog API unreachable or erroring for a region
    #[error("Catalog unavailable for {region}: {message}")]
    CatalogUnavailable { region: String, message: String },

    /// Underlying state store failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Content-generation agent did not answer within the budget
    #[error("Agent invocation timed out after {0:?}")]
    AgentTimeout(Duration),

    /// Content-generation agent invocation failed
    #[error("Agent invocation error: {0}")]
    AgentInvocation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AppError {
    /// Create a region-scoped catalog error.
    pub fn catalog_unavailable(region: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::CatalogUnavailable {
            region: region.into(),
            message: message.to_string(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl fmt::Display) -> Self {
        Self::Persistence(message.to_string())
    }

    /// Create an agent invocation error.
    pub fn agent(message: impl fmt::Display) -> Self {
        Self::AgentInvocation(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error is an entity-scoped dispatch failure that the next
    /// tick retries via the pending record, rather than a region failure.
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(self, Self::AgentTimeout(_) | Self::AgentInvocation(_))
    }
}
