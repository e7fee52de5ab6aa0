// ABOUTME: Request rate limiting and provider quota guarding for the LLM path
// ABOUTME: Two rolling windows behind one lock plus a sticky quota-exhaustion flag
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! # Rate Limiter & Quota Guard
//!
//! Enforces per-minute and per-day ceilings on outbound LLM requests and
//! tracks provider-side quota exhaustion separately. Window denials carry a
//! jittered wait hint so synchronized callers do not retry in lockstep;
//! the quota flag is sticky until its reset deadline elapses or an operator
//! clears it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::RateSettings;
use crate::constants::limits;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request may proceed; both window counters were charged
    Allowed,
    /// Request must not proceed before the hinted wait
    Denied {
        /// Time until the tighter window resets, plus jitter
        retry_after: Duration,
    },
}

/// Point-in-time view of limiter state, exposed through `cache_info`
#[derive(Debug, Clone, Serialize)]
pub struct LimiterSnapshot {
    /// Requests charged to the current minute window
    pub minute_used: u32,
    /// Minute window capacity
    pub minute_limit: u32,
    /// When the minute window resets
    pub minute_reset_at: DateTime<Utc>,
    /// Requests charged to the current day window
    pub day_used: u32,
    /// Day window capacity
    pub day_limit: u32,
    /// When the day window resets
    pub day_reset_at: DateTime<Utc>,
    /// Whether the provider quota flag is set
    pub quota_exhausted: bool,
    /// When the quota flag clears on its own
    pub quota_reset_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct LimiterState {
    minute_count: u32,
    day_count: u32,
    minute_reset_at: DateTime<Utc>,
    day_reset_at: DateTime<Utc>,
    quota_exhausted: bool,
    quota_reset_at: Option<DateTime<Utc>>,
}

impl LimiterState {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            minute_count: 0,
            day_count: 0,
            minute_reset_at: now + chrono::Duration::seconds(limits::MINUTE_WINDOW_SECS),
            day_reset_at: now + chrono::Duration::seconds(limits::DAY_WINDOW_SECS),
            quota_exhausted: false,
            quota_reset_at: None,
        }
    }

    /// Roll any window whose reset instant has passed
    fn tick(&mut self, now: DateTime<Utc>) {
        if now >= self.minute_reset_at {
            self.minute_count = 0;
            self.minute_reset_at = now + chrono::Duration::seconds(limits::MINUTE_WINDOW_SECS);
        }
        if now >= self.day_reset_at {
            self.day_count = 0;
            self.day_reset_at = now + chrono::Duration::seconds(limits::DAY_WINDOW_SECS);
        }
    }

    fn decide(&mut self, now: DateTime<Utc>, per_minute: u32, per_day: u32) -> RateDecision {
        self.tick(now);

        if self.minute_count < per_minute && self.day_count < per_day {
            self.minute_count += 1;
            self.day_count += 1;
            return RateDecision::Allowed;
        }

        // Wait until the tighter of the exhausted windows frees up
        let mut base: Option<i64> = None;
        if self.minute_count >= per_minute {
            base = Some((self.minute_reset_at - now).num_seconds().max(0));
        }
        if self.day_count >= per_day {
            let day_wait = (self.day_reset_at - now).num_seconds().max(0);
            base = Some(base.map_or(day_wait, |b| b.min(day_wait)));
        }

        let (jitter_min, jitter_max) = limits::DENIAL_JITTER_SECS;
        let jitter = rand::thread_rng().gen_range(jitter_min..=jitter_max);
        let wait = base.unwrap_or(0).unsigned_abs() + jitter;
        RateDecision::Denied {
            retry_after: Duration::from_secs(wait),
        }
    }
}

/// Shared limiter for all LLM requests of one engine context
#[derive(Debug)]
pub struct RateLimiter {
    per_minute: u32,
    per_day: u32,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Build a limiter with the given window capacities
    #[must_use]
    pub fn new(settings: RateSettings) -> Self {
        Self {
            per_minute: settings.per_minute,
            per_day: settings.per_day,
            state: Mutex::new(LimiterState::new(Utc::now())),
        }
    }

    /// Charge both windows if capacity remains, or return a wait hint
    pub async fn can_make_request(&self) -> RateDecision {
        let mut state = self.state.lock().await;
        let decision = state.decide(Utc::now(), self.per_minute, self.per_day);
        if let RateDecision::Denied { retry_after } = decision {
            tracing::debug!(
                wait_s = retry_after.as_secs(),
                minute_used = state.minute_count,
                day_used = state.day_count,
                "llm request denied by rate limiter"
            );
        }
        decision
    }

    /// Set the sticky quota flag
    ///
    /// Callers pass the provider's reset hint when they have one; otherwise
    /// the flag holds for a default hour.
    pub async fn mark_quota_exhausted(&self, reset_at: Option<DateTime<Utc>>) {
        let deadline = reset_at.unwrap_or_else(|| {
            Utc::now() + chrono::Duration::seconds(limits::QUOTA_DEFAULT_RESET_SECS)
        });
        let mut state = self.state.lock().await;
        state.quota_exhausted = true;
        state.quota_reset_at = Some(deadline);
        tracing::warn!(reset_at = %deadline, "provider quota exhausted, llm path disabled");
    }

    /// Whether the quota flag is currently in force, clearing it on elapse
    pub async fn quota_exhausted(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.quota_exhausted {
            return false;
        }
        let expired = state
            .quota_reset_at
            .is_some_and(|deadline| Utc::now() >= deadline);
        if expired {
            state.quota_exhausted = false;
            state.quota_reset_at = None;
            tracing::info!("provider quota flag cleared after reset deadline");
            return false;
        }
        true
    }

    /// Clear the quota flag immediately
    pub async fn clear_quota(&self) {
        let mut state = self.state.lock().await;
        state.quota_exhausted = false;
        state.quota_reset_at = None;
    }

    /// Current counters and deadlines
    pub async fn snapshot(&self) -> LimiterSnapshot {
        let mut state = self.state.lock().await;
        state.tick(Utc::now());
        LimiterSnapshot {
            minute_used: state.minute_count,
            minute_limit: self.per_minute,
            minute_reset_at: state.minute_reset_at,
            day_used: state.day_count,
            day_limit: self.per_day,
            day_reset_at: state.day_reset_at,
            quota_exhausted: state.quota_exhausted,
            quota_reset_at: state.quota_reset_at,
        }
    }
}
