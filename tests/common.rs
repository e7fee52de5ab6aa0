// ABOUTME: Shared test utilities for meal engine integration tests
// ABOUTME: Scripted LLM provider, context builders, and common targets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `ngon_meal_engine`
//!
//! Every integration suite drives the engine through an [`EngineContext`]
//! built here: either offline (no API key, knowledge-base only) or with a
//! [`ScriptedProvider`] that replays a fixed sequence of completions and
//! failures.

use async_trait::async_trait;
use ngon_meal_engine::config::EngineConfig;
use ngon_meal_engine::context::EngineContext;
use ngon_meal_engine::errors::{EngineError, EngineResult};
use ngon_meal_engine::llm::{ChatRequest, ChatResponse, LlmProvider};
use ngon_meal_engine::models::{NutritionVector, UserNutritionProfile};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::Mutex;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// One step of a scripted provider run
pub enum Script {
    /// Return this completion text
    Reply(&'static str),
    /// Fail with a retryable error
    Transient,
    /// Fail with a non-retryable error
    Unavailable,
}

/// Provider that replays a fixed script; exhausted scripts fail transiently
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Script>>,
    calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            calls: AtomicU32::new(0),
        })
    }

    /// How many completions the engine has requested
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn list_models(&self) -> EngineResult<Vec<String>> {
        Ok(vec!["scripted-model".to_owned()])
    }

    async fn complete(&self, _request: &ChatRequest) -> EngineResult<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().await.pop_front() {
            Some(Script::Reply(text)) => Ok(ChatResponse {
                content: text.to_owned(),
                model: "scripted-model".to_owned(),
                usage: None,
                finish_reason: Some("stop".to_owned()),
            }),
            Some(Script::Transient) | None => Err(EngineError::transient("scripted failure")),
            Some(Script::Unavailable) => Err(EngineError::unavailable("scripted outage")),
        }
    }

    async fn health_check(&self) -> EngineResult<bool> {
        Ok(true)
    }
}

/// Config with LLM access and an instant retry ladder
pub fn quick_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.llm.api_key = Some("test-key".to_owned());
    config.retry.backoff_base = Duration::ZERO;
    config.retry.meal_budget = Duration::from_secs(5);
    config
}

/// Context whose provider replays `steps`
pub fn scripted_context(steps: Vec<Script>) -> (EngineContext, Arc<ScriptedProvider>) {
    init_test_logging();
    let provider = ScriptedProvider::new(steps);
    let ctx = EngineContext::new(quick_config(), Arc::clone(&provider) as Arc<dyn LlmProvider>);
    (ctx, provider)
}

/// Context without credentials: every meal comes from the knowledge base
pub fn offline_context() -> EngineContext {
    init_test_logging();
    let provider = ScriptedProvider::new(Vec::new());
    EngineContext::new(EngineConfig::default(), provider as Arc<dyn LlmProvider>)
}

/// Standard 2000 kcal day target with explicit macros
pub fn day_target_2000() -> NutritionVector {
    NutritionVector::new(2000.0, 150.0, 65.0, 250.0)
}

/// Profile with nothing set
pub fn default_profile() -> UserNutritionProfile {
    UserNutritionProfile::default()
}

/// Two well-formed lunch dishes as the model should return them
pub const VALID_TWO_DISHES: &str = r#"[
    {
        "name": "Bún Chả Hà Nội",
        "description": "Bún ăn kèm chả nướng than hoa",
        "ingredients": [
            {"name": "bún", "amount": "200g"},
            {"name": "thịt lợn", "amount": "150g"},
            {"name": "rau sống", "amount": "80g"}
        ],
        "preparation": ["Nướng chả trên than hoa", "Pha nước chấm chua ngọt"],
        "nutrition": {"calories": 450, "protein": 28, "fat": 16, "carbs": 48},
        "preparation_time": "50 phút",
        "health_benefits": "Giàu đạm, cân bằng rau xanh"
    },
    {
        "name": "Nem Cuốn Tươi",
        "description": "Nem cuốn rau sống thanh mát",
        "ingredients": [
            {"name": "bánh tráng", "amount": "6 cái"},
            {"name": "rau sống", "amount": "100g"},
            {"name": "bún", "amount": "100g"}
        ],
        "preparation": ["Cuốn nem với rau và bún"],
        "nutrition": {"calories": 220, "protein": 10, "fat": 5, "carbs": 34},
        "preparation_time": "20 phút",
        "health_benefits": "Nhiều chất xơ, ít béo"
    }
]"#;
