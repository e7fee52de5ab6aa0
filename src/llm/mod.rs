// ABOUTME: LLM provider abstraction for pluggable dish-generation backends
// ABOUTME: Defines chat message types and the async contract adapters must implement
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! # LLM Provider Service Provider Interface
//!
//! This module defines the contract a completion backend must implement to
//! generate dishes for the engine. The engine only ever needs three things
//! from a provider: a completion, the model list, and a health probe.
//!
//! Providers are deliberately dumb transports. Retry ladders, rate limiting,
//! and fallback all live in the meal assembler; a provider's job is to send
//! one request and classify its failure as transient or unavailable.

mod openai_compatible;
pub mod prompts;

pub use openai_compatible::OpenAiCompatibleProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::EngineResult;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// String form used on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }
}

/// Configuration for one chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Model identifier; the provider's selected model when absent
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Nucleus sampling bound
    pub top_p: Option<f32>,
}

impl ChatRequest {
    /// Create a request with messages and no sampling overrides
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
            top_p: None,
        }
    }

    /// Set the sampling temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the nucleus sampling bound
    #[must_use]
    pub const fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

/// Response from a chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Raw text of the first completion choice
    pub content: String,
    /// Model that produced the completion
    pub model: String,
    /// Token usage when the backend reports it
    pub usage: Option<TokenUsage>,
    /// Finish reason (stop, length, etc.)
    pub finish_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
    /// Total tokens billed
    pub total_tokens: u32,
}

/// Contract for dish-generation backends
///
/// Implementations classify their failures through [`crate::errors::ErrorKind`]:
/// `LlmTransient` for network errors, timeouts, and 5xx responses, and
/// `LlmUnavailable` for quota or authentication rejections that retrying
/// cannot fix.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Unique provider identifier for logs
    fn name(&self) -> &'static str;

    /// Model used when a request does not specify one
    fn default_model(&self) -> &str;

    /// Best-effort ordered list of models the backend offers
    async fn list_models(&self) -> EngineResult<Vec<String>>;

    /// Perform one chat completion
    async fn complete(&self, request: &ChatRequest) -> EngineResult<ChatResponse>;

    /// True when the backend is reachable and credentials are accepted
    async fn health_check(&self) -> EngineResult<bool>;
}
