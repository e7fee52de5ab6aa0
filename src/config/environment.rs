// ABOUTME: Environment-based configuration loading for the meal engine
// ABOUTME: Centralizes every env var read so the rest of the crate stays env-free
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! Environment configuration for deployment flexibility
//!
//! [`EngineConfig::from_env`] is the single place the engine touches the
//! process environment. Invalid numeric values are logged and replaced by
//! defaults rather than propagated as errors.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{cache, diversity, env_vars, floors, limits, retry};
use crate::models::MealType;

/// LLM provider access settings
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Bearer token for the chat completions endpoint; `None` disables
    /// live generation and every meal comes from the knowledge base
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    /// Explicit model override; when unset the adapter probes the
    /// provider's model list against its preference order
    pub model: Option<String>,
}

/// Request budget settings for the shared rate limiter
#[derive(Debug, Clone, Copy)]
pub struct RateSettings {
    /// Requests allowed per rolling minute
    pub per_minute: u32,
    /// Requests allowed per rolling day
    pub per_day: u32,
}

/// Response cache settings
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    /// How long a cached meal stays servable
    pub ttl: Duration,
    /// Maximum number of cached meals before LRU eviction
    pub max_entries: usize,
}

/// Dish diversity settings
#[derive(Debug, Clone, Copy)]
pub struct DiversitySettings {
    /// How many recently served dishes are held against new candidates
    pub recent_window: usize,
}

/// Per-meal calorie floors used when rescuing implausibly small dishes
#[derive(Debug, Clone, Copy)]
pub struct FloorSettings {
    /// Minimum plausible breakfast calories
    pub breakfast: f64,
    /// Minimum plausible lunch calories
    pub lunch: f64,
    /// Minimum plausible dinner calories
    pub dinner: f64,
    /// Minimum plausible snack calories
    pub snack: f64,
}

impl FloorSettings {
    /// Floor for a given meal slot
    #[must_use]
    pub const fn floor_for(&self, meal_type: MealType) -> f64 {
        match meal_type {
            MealType::Breakfast => self.breakfast,
            MealType::Lunch => self.lunch,
            MealType::Dinner => self.dinner,
            MealType::Snack => self.snack,
        }
    }
}

/// Retry and timeout settings for meal generation
///
/// These are code-level knobs rather than env vars; tests shrink the
/// durations to keep the retry ladder instant.
#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    /// Generation attempts per meal before falling back
    pub max_attempts: u32,
    /// Base of the exponential backoff between attempts
    pub backoff_base: Duration,
    /// Wall-clock budget for one meal including retries
    pub meal_budget: Duration,
    /// Per-request timeout passed to the HTTP client
    pub request_timeout: Duration,
    /// Connect timeout passed to the HTTP client
    pub connect_timeout: Duration,
}

/// Complete engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// LLM provider access
    pub llm: LlmSettings,
    /// Shared request budgets
    pub rate: RateSettings,
    /// Response cache behavior
    pub cache: CacheSettings,
    /// Diversity window sizing
    pub diversity: DiversitySettings,
    /// Per-meal calorie floors
    pub floors: FloorSettings,
    /// Retry ladder and timeouts
    pub retry: RetrySettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm: LlmSettings {
                api_key: None,
                base_url: "https://api.openai.com/v1".into(),
                model: None,
            },
            rate: RateSettings {
                per_minute: limits::RATE_PER_MINUTE,
                per_day: limits::RATE_PER_DAY,
            },
            cache: CacheSettings {
                ttl: Duration::from_secs(cache::TTL_SECS),
                max_entries: cache::MAX_ENTRIES,
            },
            diversity: DiversitySettings {
                recent_window: diversity::RECENT_WINDOW,
            },
            floors: FloorSettings {
                breakfast: floors::BREAKFAST,
                lunch: floors::LUNCH,
                dinner: floors::DINNER,
                snack: floors::SNACK,
            },
            retry: RetrySettings {
                max_attempts: retry::MAX_ATTEMPTS,
                backoff_base: Duration::from_secs(retry::BACKOFF_BASE_SECS),
                meal_budget: Duration::from_secs(retry::MEAL_BUDGET_SECS),
                request_timeout: Duration::from_secs(retry::REQUEST_TIMEOUT_SECS),
                connect_timeout: Duration::from_secs(retry::CONNECT_TIMEOUT_SECS),
            },
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Every variable is optional. Malformed numeric values log a warning
    /// and keep the default so a typo in deployment config degrades
    /// gracefully instead of failing startup.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let llm = LlmSettings {
            api_key: env::var(env_vars::LLM_API_KEY)
                .ok()
                .filter(|key| !key.trim().is_empty()),
            base_url: env::var(env_vars::LLM_BASE_URL)
                .ok()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.llm.base_url),
            model: env::var(env_vars::LLM_MODEL)
                .ok()
                .filter(|model| !model.trim().is_empty()),
        };

        let rate = RateSettings {
            per_minute: parse_env_or(env_vars::RATE_PER_MINUTE, defaults.rate.per_minute),
            per_day: parse_env_or(env_vars::RATE_PER_DAY, defaults.rate.per_day),
        };

        let cache = CacheSettings {
            ttl: Duration::from_secs(parse_env_or(
                env_vars::CACHE_TTL_SECONDS,
                defaults.cache.ttl.as_secs(),
            )),
            max_entries: defaults.cache.max_entries,
        };

        let diversity = DiversitySettings {
            recent_window: parse_env_or(
                env_vars::RECENT_WINDOW,
                defaults.diversity.recent_window,
            ),
        };

        let floors = FloorSettings {
            breakfast: parse_env_or(
                env_vars::CALORIE_FLOOR_BREAKFAST,
                defaults.floors.breakfast,
            ),
            lunch: parse_env_or(env_vars::CALORIE_FLOOR_LUNCH, defaults.floors.lunch),
            dinner: parse_env_or(env_vars::CALORIE_FLOOR_DINNER, defaults.floors.dinner),
            snack: parse_env_or(env_vars::CALORIE_FLOOR_SNACK, defaults.floors.snack),
        };

        Self {
            llm,
            rate,
            cache,
            diversity,
            floors,
            retry: defaults.retry,
        }
    }

    /// True when an API key is present and live generation is possible
    #[must_use]
    pub fn has_llm_access(&self) -> bool {
        self.llm.api_key.is_some()
    }
}

/// Parse an environment variable, logging and defaulting on failure
fn parse_env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(
                var = name,
                value = %raw,
                default = %default,
                "invalid value in environment, using default"
            );
            default
        }),
        Err(_) => default,
    }
}
