// ABOUTME: Unified error handling for the meal plan engine
// ABOUTME: Defines error kinds, severity ordering, and HTTP response mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! # Unified Error Handling
//!
//! One error type for the whole engine. Kinds are ordered by severity:
//! the transient and unavailable kinds are consumed internally by the retry
//! loop and fallback path; only `InvalidTarget` and `Internal` ever reach
//! callers of the plan operations.
//!
//! Every error carries a correlation token so a surfaced `INTERNAL_ERROR`
//! can be matched against structured logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Stable error codes emitted at the serving boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Caller supplied a malformed nutrition target, profile, or meal type
    #[serde(rename = "INVALID_TARGET")]
    InvalidTarget,
    /// Network failure, timeout, or 5xx from the LLM provider; retried internally
    #[serde(rename = "LLM_TRANSIENT")]
    LlmTransient,
    /// Provider quota exhausted or authentication rejected; falls back internally
    #[serde(rename = "LLM_UNAVAILABLE")]
    LlmUnavailable,
    /// Retries produced no schema-valid dish; falls back internally
    #[serde(rename = "VALIDATION_EXHAUSTED")]
    ValidationExhausted,
    /// The knowledge-base path also failed; reachable only via configuration error
    #[serde(rename = "FALLBACK_UNAVAILABLE")]
    FallbackUnavailable,
    /// Programmer bug; surfaced with a correlation token for log lookup
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidTarget => 400,
            Self::LlmTransient | Self::ValidationExhausted => 502,
            Self::LlmUnavailable => 503,
            Self::FallbackUnavailable | Self::Internal => 500,
        }
    }

    /// Stable string code, identical to the serde rename
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidTarget => "INVALID_TARGET",
            Self::LlmTransient => "LLM_TRANSIENT",
            Self::LlmUnavailable => "LLM_UNAVAILABLE",
            Self::ValidationExhausted => "VALIDATION_EXHAUSTED",
            Self::FallbackUnavailable => "FALLBACK_UNAVAILABLE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Get a short description of this error kind
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidTarget => "The supplied nutrition target is invalid",
            Self::LlmTransient => "The dish model is temporarily unreachable",
            Self::LlmUnavailable => "The dish model is unavailable",
            Self::ValidationExhausted => "No schema-valid dish was produced",
            Self::FallbackUnavailable => "The dish knowledge base produced no dish",
            Self::Internal => "An internal engine error occurred",
        }
    }
}

/// Unified error type for the engine
#[derive(Debug, Error)]
pub struct EngineError {
    /// Error kind, stable across releases
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Correlation token matching structured log lines
    pub correlation_id: Uuid,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EngineError {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            correlation_id: Uuid::new_v4(),
            source: None,
        }
    }

    /// Attach a source error for chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    /// Whether the retry loop may try again after this error
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.kind, ErrorKind::LlmTransient)
    }

    /// Whether the provider should be treated as down for this request
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self.kind, ErrorKind::LlmUnavailable)
    }

    /// Malformed nutrition target or meal type
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTarget, message)
    }

    /// Network, timeout, or 5xx from the provider
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LlmTransient, message)
    }

    /// Quota exhausted or authentication rejected
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LlmUnavailable, message)
    }

    /// Retries yielded no schema-valid dish
    pub fn validation_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationExhausted, message)
    }

    /// Knowledge base produced no dish
    pub fn fallback_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FallbackUnavailable, message)
    }

    /// Programmer bug
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.description(), self.message)
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Boundary response shape for the serving layer
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code
    pub code: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// Correlation token for log lookup
    pub correlation_id: Uuid,
}

impl From<EngineError> for ErrorResponse {
    fn from(error: EngineError) -> Self {
        Self {
            code: error.kind,
            message: error.message,
            correlation_id: error.correlation_id,
        }
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        Self::internal(format!("serialization failed: {error}")).with_source(error)
    }
}
