// ABOUTME: Engine context bundling config, provider, limiter, tracker and cache
// ABOUTME: One value threaded through the pipeline so tests run isolated engines side by side
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! Engine dependency context
//!
//! Everything stateful the pipeline touches lives in one [`EngineContext`]:
//! the resolved configuration, the LLM provider, the shared rate limiter,
//! the dish diversity tracker and the meal cache. There are no process
//! globals; two contexts in one process are fully independent, which is
//! what lets integration tests run parallel engines without bleed.
//!
//! The limiter is shared by `Arc` between the context and the provider so
//! quota exhaustion flagged inside the HTTP adapter is visible to the
//! orchestration layer.

use std::sync::Arc;

use serde::Serialize;

use crate::cache::{CacheInfo, MealCache};
use crate::config::EngineConfig;
use crate::diversity::DiversityTracker;
use crate::errors::EngineResult;
use crate::llm::{LlmProvider, OpenAiCompatibleProvider};
use crate::models::MealType;
use crate::rate_limit::{LimiterSnapshot, RateLimiter};

/// Operator view of cache fill and limiter state, one JSON document
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    /// Meal cache entry count and configuration
    pub cache: CacheInfo,
    /// Limiter window counters and quota flag
    pub limiter: LimiterSnapshot,
}

/// Shared state for one meal engine instance
pub struct EngineContext {
    config: EngineConfig,
    provider: Arc<dyn LlmProvider>,
    limiter: Arc<RateLimiter>,
    tracker: DiversityTracker,
    cache: MealCache,
}

impl EngineContext {
    /// Assemble a context around an existing provider
    ///
    /// Builds a fresh limiter from the config. Use [`Self::with_limiter`]
    /// when the provider already shares a limiter, as the HTTP adapter does.
    #[must_use]
    pub fn new(config: EngineConfig, provider: Arc<dyn LlmProvider>) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate));
        Self::with_limiter(config, provider, limiter)
    }

    /// Assemble a context around a provider and the limiter it shares
    #[must_use]
    pub fn with_limiter(
        config: EngineConfig,
        provider: Arc<dyn LlmProvider>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let tracker = DiversityTracker::new(config.diversity);
        let cache = MealCache::new(&config.cache);
        Self {
            config,
            provider,
            limiter,
            tracker,
            cache,
        }
    }

    /// Build a live context: construct the HTTP provider and resolve its model
    ///
    /// # Errors
    ///
    /// Returns `Internal` when the HTTP client cannot be constructed. A
    /// missing API key is not an error; generation then runs in
    /// knowledge-base-only mode.
    pub async fn initialize(config: EngineConfig) -> EngineResult<Self> {
        let limiter = Arc::new(RateLimiter::new(config.rate));
        let provider =
            OpenAiCompatibleProvider::initialize(&config.llm, &config.retry, Arc::clone(&limiter))
                .await?;
        Ok(Self::with_limiter(config, Arc::new(provider), limiter))
    }

    /// Build a live context from process environment variables
    ///
    /// # Errors
    ///
    /// Returns `Internal` when the HTTP client cannot be constructed.
    pub async fn from_env() -> EngineResult<Self> {
        Self::initialize(EngineConfig::from_env()).await
    }

    /// Resolved engine configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The LLM provider used for dish generation
    #[must_use]
    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    /// Shared request limiter
    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Recently served dish tracker
    #[must_use]
    pub const fn tracker(&self) -> &DiversityTracker {
        &self.tracker
    }

    /// Generated meal cache
    #[must_use]
    pub const fn cache(&self) -> &MealCache {
        &self.cache
    }

    /// Drop every cached meal and clear the sticky quota flag
    ///
    /// Returns how many entries were purged. Clearing the quota flag here
    /// lets an operator force a retry against the provider after fixing a
    /// billing problem, without restarting the process.
    pub async fn clear_cache(&self) -> usize {
        self.limiter.clear_quota().await;
        self.cache.purge().await
    }

    /// Cache size plus the current limiter counters, for the ops surface
    pub async fn cache_info(&self) -> EngineStatus {
        EngineStatus {
            cache: self.cache.info().await,
            limiter: self.limiter.snapshot().await,
        }
    }

    /// Forget recently served dishes, for one slot or all of them
    pub async fn reset_tracker(&self, meal_type: Option<MealType>) {
        self.tracker.reset(meal_type).await;
    }

    /// Current limiter counters and quota state
    pub async fn limiter_snapshot(&self) -> LimiterSnapshot {
        self.limiter.snapshot().await
    }
}
