// ABOUTME: Main library entry point for the Ngon meal plan generation engine
// ABOUTME: Generates and replaces weekly Vietnamese meal plans from LLM and curated dishes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

// Crate-level attributes:
// - deny(unsafe_code): the engine is pure protocol and arithmetic work; there
//   is no reason for unsafe anywhere in this crate
#![deny(unsafe_code)]

//! # Ngon Meal Engine
//!
//! Meal plan generation and replacement for a Vietnamese nutrition app.
//! The engine turns a day-level nutrition target and a user profile into
//! complete dishes with ingredients, preparation steps, and a per-serving
//! nutrition quadruple, generated by an LLM and guaranteed by a curated
//! knowledge base.
//!
//! ## Features
//!
//! - **Weekly and daily planning**: seven labeled days, three meals plus an
//!   optional snack, budgets split with fixed ratios
//! - **Tolerant LLM handling**: JSON repair, schema validation with
//!   defaults, retry ladder with perturbed sampling
//! - **Never-empty guarantee**: rate limits, quota exhaustion, and model
//!   failures all degrade to curated dishes, not errors
//! - **Diversity tracking**: recently served dishes are avoided across the
//!   whole week and across meal replacements
//!
//! ## Architecture
//!
//! - **Orchestrator**: the public plan operations
//! - **Assembler**: one meal slot end to end, from prompt to floor check
//! - **Budget**: TDEE derivation and day-to-meal splitting
//! - **LLM**: provider contract, prompt construction, HTTP adapter
//! - **Repair / Validator**: completion text to schema-valid dishes
//! - **Fallback / Knowledge base**: curated dishes behind every failure
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ngon_meal_engine::context::EngineContext;
//! use ngon_meal_engine::models::{NutritionVector, UserNutritionProfile};
//! use ngon_meal_engine::orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = EngineContext::from_env().await?;
//!
//!     let target = NutritionVector::new(2000.0, 150.0, 65.0, 250.0);
//!     let profile = UserNutritionProfile::default();
//!
//!     let week = orchestrator::generate_week(&ctx, &target, &profile).await?;
//!     println!("week total: {} kcal", week.nutrition.calories);
//!     Ok(())
//! }
//! ```

// ── Public API ──────────────────────────────────────────────────────────
// These modules are used by integration tests and embedding services.

/// Meal assembly: retry ladder, diversity gating, fallback, calorie floor
pub mod assembler;

/// Nutrition budgeter: TDEE, goal adjustment, day-to-meal splits
pub mod budget;

/// Short-lived LRU cache for generated meals
pub mod cache;

/// Configuration management from environment variables
pub mod config;

/// Engine constants and tuning values
pub mod constants;

/// Engine dependency context shared across one engine instance
pub mod context;

/// Dish diversity tracking across recent meals
pub mod diversity;

/// Unified error handling with stable error codes
pub mod errors;

/// Knowledge-base dish selection when generation fails
pub mod fallback;

/// Curated Vietnamese dish catalog and ingredient nutrition table
pub mod knowledge_base;

/// LLM provider contract, prompts, and the `OpenAI`-compatible adapter
pub mod llm;

/// Structured logging setup for binaries and test environments
pub mod logging;

/// Core data models: dishes, meals, plans, profiles
pub mod models;

/// Plan orchestration: week, day, and single-meal operations
pub mod orchestrator;

/// Request rate limiting and provider quota tracking
pub mod rate_limit;

/// JSON extraction and repair for malformed completions
pub mod repair;

/// Dish schema validation and normalization
pub mod validator;
