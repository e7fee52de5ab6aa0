// ABOUTME: OpenAI-compatible chat completion adapter used for dish generation
// ABOUTME: Selects a model at startup, classifies HTTP failures, and flags quota exhaustion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! # `OpenAI`-Compatible Provider
//!
//! Works against any endpoint implementing the `OpenAI` chat completions
//! API: the hosted service itself, Groq, or a local Ollama/vLLM server.
//!
//! One [`reqwest::Client`] is built at construction and reused for every
//! call. Model selection happens once at initialization: an explicit
//! configured model wins, otherwise the `/models` listing is probed against
//! a fixed preference order and the first hit is kept. When probing fails
//! the first preferred name is used anyway and the completion call reports
//! the real error.
//!
//! Failure classification is the part the rest of the engine leans on:
//! quota-style 4xx responses flip the shared quota flag and surface as
//! `LlmUnavailable`, while network errors, timeouts, and 5xx responses
//! surface as `LlmTransient` so the retry ladder keeps going.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use super::{ChatRequest, ChatResponse, LlmProvider, TokenUsage};
use crate::config::{LlmSettings, RetrySettings};
use crate::constants::models::PREFERENCE_ORDER;
use crate::errors::{EngineError, EngineResult};
use crate::rate_limit::RateLimiter;

/// Wire request for the chat completions endpoint
#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    stream: bool,
}

/// Borrowed message in the wire request
#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Wire response from the chat completions endpoint
#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Error envelope most `OpenAI`-compatible servers return
#[derive(Debug, Deserialize)]
struct WireErrorEnvelope {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Wire response from the models listing endpoint
#[derive(Debug, Deserialize)]
struct WireModelList {
    data: Vec<WireModelEntry>,
}

#[derive(Debug, Deserialize)]
struct WireModelEntry {
    id: String,
}

/// `OpenAI`-compatible dish generation provider
pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    limiter: Arc<RateLimiter>,
}

impl OpenAiCompatibleProvider {
    /// Build the provider without probing the endpoint.
    ///
    /// The model is the configured override when present, otherwise the
    /// first name in the preference order.
    ///
    /// # Errors
    ///
    /// Returns `Internal` when the HTTP client cannot be constructed.
    pub fn new(
        settings: &LlmSettings,
        retry: &RetrySettings,
        limiter: Arc<RateLimiter>,
    ) -> EngineResult<Self> {
        let client = Client::builder()
            .connect_timeout(retry.connect_timeout)
            .timeout(retry.request_timeout)
            .build()
            .map_err(|e| {
                EngineError::internal(format!("failed to build HTTP client: {e}")).with_source(e)
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            api_key: settings.api_key.clone(),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| PREFERENCE_ORDER[0].to_owned()),
            limiter,
        })
    }

    /// Build the provider and resolve its model against the endpoint.
    ///
    /// An explicitly configured model skips probing. Otherwise `/models` is
    /// listed once and matched against the preference order; when nothing
    /// matches, the first listed model is taken, and when listing fails the
    /// first preferred name stays so the failure surfaces at call time.
    ///
    /// # Errors
    ///
    /// Returns `Internal` when the HTTP client cannot be constructed.
    pub async fn initialize(
        settings: &LlmSettings,
        retry: &RetrySettings,
        limiter: Arc<RateLimiter>,
    ) -> EngineResult<Self> {
        let mut provider = Self::new(settings, retry, limiter)?;
        if settings.model.is_none() {
            provider.model = provider.probe_model().await;
        }
        info!(
            model = %provider.model,
            base_url = %provider.base_url,
            "dish model selected"
        );
        Ok(provider)
    }

    async fn probe_model(&self) -> String {
        match self.list_models().await {
            Ok(available) => {
                for candidate in PREFERENCE_ORDER {
                    if available.iter().any(|model| model == candidate) {
                        return candidate.to_owned();
                    }
                }
                available
                    .first()
                    .cloned()
                    .unwrap_or_else(|| PREFERENCE_ORDER[0].to_owned())
            }
            Err(err) => {
                warn!(
                    error = %err,
                    fallback = PREFERENCE_ORDER[0],
                    "model listing failed, deferring to first preference"
                );
                PREFERENCE_ORDER[0].to_owned()
            }
        }
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    fn add_auth_header(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.api_key {
            request.header("Authorization", format!("Bearer {api_key}"))
        } else {
            request
        }
    }

    /// Map an HTTP error body to an engine error, marking the shared quota
    /// flag on quota-style rejections.
    async fn handle_http_error(&self, status: StatusCode, body: &str) -> EngineError {
        if is_quota_error(status, body) {
            self.limiter.mark_quota_exhausted(None).await;
            return EngineError::unavailable(format!(
                "provider reported quota exhaustion: {}",
                error_message(body)
            ));
        }
        classify_status(status, body)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        "openai_compatible"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn list_models(&self) -> EngineResult<Vec<String>> {
        let request = self.client.get(self.api_url("models"));
        let response = self
            .add_auth_header(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(self.handle_http_error(status, &body).await);
        }

        let listing: WireModelList = serde_json::from_str(&body).map_err(|e| {
            EngineError::transient(format!("malformed model listing: {e}")).with_source(e)
        })?;
        Ok(listing.data.into_iter().map(|entry| entry.id).collect())
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.model)))]
    async fn complete(&self, request: &ChatRequest) -> EngineResult<ChatResponse> {
        // Sticky quota state short-circuits before any network traffic.
        if self.limiter.quota_exhausted().await {
            return Err(EngineError::unavailable(
                "provider quota exhausted, waiting for reset",
            ));
        }

        let model = request.model.as_deref().unwrap_or(&self.model);
        let wire_request = WireRequest {
            model,
            messages: request
                .messages
                .iter()
                .map(|message| WireMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: request.top_p,
            stream: false,
        };
        debug!(
            messages = wire_request.messages.len(),
            temperature = ?wire_request.temperature,
            top_p = ?wire_request.top_p,
            "sending completion request"
        );

        let http_request = self
            .client
            .post(self.api_url("chat/completions"))
            .json(&wire_request);
        let response = self
            .add_auth_header(http_request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(self.handle_http_error(status, &body).await);
        }

        let wire_response: WireResponse = serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                preview = body.chars().take(500).collect::<String>(),
                "failed to parse completion response"
            );
            EngineError::transient(format!("malformed completion response: {e}")).with_source(e)
        })?;

        let choice = wire_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::transient("completion returned no choices"))?;
        let content = choice.message.content.unwrap_or_default();
        debug!(
            content_len = content.len(),
            finish_reason = ?choice.finish_reason,
            "completion received"
        );

        Ok(ChatResponse {
            content,
            model: wire_response.model.unwrap_or_else(|| model.to_owned()),
            usage: wire_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    async fn health_check(&self) -> EngineResult<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(err) if err.is_unavailable() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Network-level failures are always transient.
fn transport_error(error: reqwest::Error) -> EngineError {
    let detail = if error.is_timeout() {
        "request timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "transport error"
    };
    EngineError::transient(format!("{detail}: {error}")).with_source(error)
}

/// True when a 4xx response carries quota semantics rather than a fixable
/// request defect.
fn is_quota_error(status: StatusCode, body: &str) -> bool {
    if !status.is_client_error() {
        return false;
    }
    if status == StatusCode::PAYMENT_REQUIRED {
        return true;
    }
    let lowered = body.to_lowercase();
    lowered.contains("quota") || lowered.contains("billing")
}

/// Map a non-quota HTTP failure to transient or unavailable.
fn classify_status(status: StatusCode, body: &str) -> EngineError {
    let message = error_message(body);
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        EngineError::transient(format!("provider returned {status}: {message}"))
    } else {
        EngineError::unavailable(format!("provider rejected request ({status}): {message}"))
    }
}

/// Best-effort human message from an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<WireErrorEnvelope>(body).map_or_else(
        |_| body.chars().take(200).collect(),
        |envelope| {
            let kind = envelope.error.kind.unwrap_or_else(|| "unknown".to_owned());
            format!("{kind}: {}", envelope.error.message)
        },
    )
}
