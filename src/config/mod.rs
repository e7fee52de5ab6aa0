// ABOUTME: Configuration module for the meal engine
// ABOUTME: Environment-based settings for LLM access, rate limits, cache and floors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! Engine configuration
//!
//! All tunables live in [`EngineConfig`], built from environment variables
//! with warn-and-default semantics: a missing or malformed value never
//! aborts startup, it logs a warning and falls back to the compiled default.

pub mod environment;

pub use environment::{
    CacheSettings, DiversitySettings, EngineConfig, FloorSettings, LlmSettings,
    RateSettings, RetrySettings,
};
