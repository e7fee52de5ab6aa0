// ABOUTME: Meal assembler driving one slot from prompt to validated, floor-checked meal
// ABOUTME: Retry ladder with perturbed sampling, diversity gating, fallback and supplements
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! # Meal Assembler
//!
//! [`generate_meal`] turns one meal slot plus its nutrition budget into a
//! non-empty [`Meal`]. The pipeline per call:
//!
//! 1. Validate the target.
//! 2. Probe the cache; a fresh entry whose dishes are all new to the
//!    diversity window is served directly.
//! 3. Walk the retry ladder: each attempt charges the rate limiter, builds
//!    a prompt with the current avoid list, calls the provider with
//!    progressively hotter sampling, then extracts and validates dishes.
//! 4. When no attempt produces a usable dish, select from the knowledge
//!    base instead.
//! 5. Top the meal up with supplementary dishes while it sits under 90%
//!    of the calorie target, clipping each supplement so the meal never
//!    passes the target itself.
//!
//! LLM trouble of any kind ends in the knowledge-base path, never in an
//! error: the only failures a caller sees are `InvalidTarget` for bad
//! inputs and `Internal` for bugs.
//!
//! Sampling schedule: attempt `i` runs at `temperature 0.7 + 0.05·i`
//! (capped at 1.2) and `top_p 0.95 − 0.05·i` (floored at 0.5), with
//! `2^i`-style exponential backoff between attempts, all bounded by a
//! per-meal wall-clock budget.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::cache::MealCacheKey;
use crate::config::RetrySettings;
use crate::constants::diversity::AVOID_LIST_LEN;
use crate::constants::floors::{MAX_SUPPLEMENTS, MEAL_TARGET_RATIO};
use crate::constants::retry::{
    BASE_TEMPERATURE, BASE_TOP_P, MAX_TEMPERATURE, MAX_TOKENS, MIN_TOP_P, TEMPERATURE_STEP,
    TOP_P_STEP,
};
use crate::context::EngineContext;
use crate::diversity::names_similar;
use crate::errors::{EngineError, EngineResult};
use crate::fallback;
use crate::knowledge_base::contains_allergen;
use crate::llm::prompts::{build_meal_prompt, MealPromptRequest};
use crate::llm::{ChatMessage, ChatRequest};
use crate::models::{Dish, DishSource, Meal, MealType, NutritionVector, UserNutritionProfile};
use crate::rate_limit::RateDecision;
use crate::repair;
use crate::validator;

/// Generate one meal for a slot against its nutrition budget
///
/// Always returns a meal with at least one dish. The cache, the LLM path,
/// and the knowledge base are tried in that order; accepted dish names are
/// recorded in the diversity tracker so later calls avoid them.
///
/// # Errors
///
/// `InvalidTarget` when the target is non-finite, negative, or has zero
/// calories. LLM and knowledge-base trouble never surface as errors.
#[instrument(skip_all, fields(slot = %meal_type, target_kcal = target.calories))]
pub async fn generate_meal(
    ctx: &EngineContext,
    meal_type: MealType,
    target: &NutritionVector,
    profile: &UserNutritionProfile,
    day_label: Option<&str>,
) -> EngineResult<Meal> {
    validate_meal_target(target)?;

    let key = MealCacheKey::from_request(
        meal_type,
        target,
        profile,
        day_label,
        Utc::now(),
        ctx.cache().ttl(),
    );
    if let Some(dishes) = probe_cache(ctx, &key, meal_type).await {
        note_dishes(ctx, meal_type, &dishes).await;
        return Ok(Meal::from_dishes(dishes));
    }

    let generated = if ctx.config().has_llm_access() {
        attempt_generation(ctx, meal_type, target, profile, day_label).await
    } else {
        debug!("no llm credentials configured, serving from knowledge base");
        None
    };

    let mut dishes = match generated {
        Some(dishes) => {
            info!(dishes = dishes.len(), "meal generated by llm");
            dishes
        }
        None => {
            let selected =
                fallback::select_dishes(meal_type, target, &profile.allergies, ctx.tracker())
                    .await;
            info!(dishes = selected.len(), "meal served from knowledge base");
            selected
        }
    };
    note_dishes(ctx, meal_type, &dishes).await;

    top_up_floor(ctx, &mut dishes, meal_type, target, &profile.allergies).await;

    ctx.cache().put(key, dishes.clone()).await;
    Ok(Meal::from_dishes(dishes))
}

/// Reject targets the budgeter contract forbids
fn validate_meal_target(target: &NutritionVector) -> EngineResult<()> {
    if !target.is_plausible() {
        return Err(EngineError::invalid_target(
            "meal target fields must be finite and non-negative",
        ));
    }
    if target.calories <= 0.0 {
        return Err(EngineError::invalid_target(
            "meal target calories must be positive",
        ));
    }
    Ok(())
}

/// Serve a cached dish list only when every dish is new to the window
///
/// A cached meal that repeats something recently served is treated as a
/// miss so diversity wins over caching.
async fn probe_cache(
    ctx: &EngineContext,
    key: &MealCacheKey,
    meal_type: MealType,
) -> Option<Vec<Dish>> {
    let dishes = ctx.cache().get(key).await?;
    for dish in &dishes {
        if ctx.tracker().is_similar(&dish.name, meal_type).await {
            debug!(dish = %dish.name, "cached meal rejected by diversity window");
            return None;
        }
    }
    Some(dishes)
}

/// Where one rung of the retry ladder left the generation
enum AttemptOutcome {
    /// Dishes that cleared extraction, validation, and the diversity gate
    Validated(Vec<Dish>),
    /// Worth another attempt with hotter sampling
    TransientFail,
    /// The LLM path is done for this meal
    PermanentFail,
}

/// Run the retry ladder; `None` means every attempt failed
async fn attempt_generation(
    ctx: &EngineContext,
    meal_type: MealType,
    target: &NutritionVector,
    profile: &UserNutritionProfile,
    day_label: Option<&str>,
) -> Option<Vec<Dish>> {
    let retry = ctx.config().retry;
    let started = Instant::now();

    for attempt in 0..retry.max_attempts {
        if started.elapsed() >= retry.meal_budget {
            warn!(attempt, "meal generation budget exhausted");
            break;
        }
        if !charge_limiter(ctx).await {
            break;
        }

        match run_attempt(ctx, attempt, meal_type, target, profile, day_label).await {
            AttemptOutcome::Validated(dishes) => return Some(dishes),
            AttemptOutcome::TransientFail => pause_before_retry(attempt, &retry, started).await,
            AttemptOutcome::PermanentFail => break,
        }
    }
    None
}

/// One rung of the ladder: prompt, completion, extraction, validation
async fn run_attempt(
    ctx: &EngineContext,
    attempt: u32,
    meal_type: MealType,
    target: &NutritionVector,
    profile: &UserNutritionProfile,
    day_label: Option<&str>,
) -> AttemptOutcome {
    let avoid = ctx.tracker().recent(meal_type, AVOID_LIST_LEN).await;
    let prompt = build_meal_prompt(&MealPromptRequest {
        meal_type,
        target,
        profile,
        avoid: &avoid,
        day_label,
    });
    let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
        .with_temperature(temperature_for(attempt))
        .with_top_p(top_p_for(attempt))
        .with_max_tokens(MAX_TOKENS);

    match ctx.provider().complete(&request).await {
        Ok(response) => {
            match usable_dishes(ctx, &response.content, meal_type, &profile.allergies).await {
                Some(dishes) => AttemptOutcome::Validated(dishes),
                None => {
                    debug!(attempt, "attempt produced no usable dish");
                    AttemptOutcome::TransientFail
                }
            }
        }
        Err(err) if err.is_transient() => {
            warn!(attempt, error = %err, "transient llm failure");
            AttemptOutcome::TransientFail
        }
        Err(err) => {
            warn!(attempt, error = %err, "llm unavailable, abandoning retries");
            AttemptOutcome::PermanentFail
        }
    }
}

/// Gate one provider call on the quota flag and the request windows
async fn charge_limiter(ctx: &EngineContext) -> bool {
    if ctx.limiter().quota_exhausted().await {
        debug!("provider quota exhausted, taking fallback");
        return false;
    }
    match ctx.limiter().can_make_request().await {
        RateDecision::Allowed => true,
        RateDecision::Denied { retry_after } => {
            // Denial means fallback, not queueing.
            debug!(
                wait_s = retry_after.as_secs(),
                "rate limited, taking fallback"
            );
            false
        }
    }
}

/// Extract, validate, and diversity-filter one completion's dishes
async fn usable_dishes(
    ctx: &EngineContext,
    raw: &str,
    meal_type: MealType,
    allergies: &[String],
) -> Option<Vec<Dish>> {
    let candidates = repair::extract_dishes(raw)?;
    let validated = validator::validate_dishes(&candidates, meal_type, &ctx.config().floors);

    let mut fresh: Vec<Dish> = Vec::with_capacity(validated.len());
    for dish in validated {
        if contains_allergen(&dish.ingredients, allergies) {
            warn!(dish = %dish.name, "dropping generated dish containing an allergen");
            continue;
        }
        if ctx.tracker().is_similar(&dish.name, meal_type).await {
            debug!(dish = %dish.name, "dropping generated dish similar to a recent one");
            continue;
        }
        if fresh.iter().any(|kept| names_similar(&kept.name, &dish.name)) {
            debug!(dish = %dish.name, "dropping near-duplicate within one completion");
            continue;
        }
        fresh.push(dish);
    }
    (!fresh.is_empty()).then_some(fresh)
}

/// Record accepted dish names in the diversity window
async fn note_dishes(ctx: &EngineContext, meal_type: MealType, dishes: &[Dish]) {
    for dish in dishes {
        ctx.tracker().note(meal_type, &dish.name).await;
    }
}

/// Append knowledge-base dishes while the meal sits under the calorie floor
///
/// Supplements are sized to the remaining gap, clipped to the calorie
/// headroom so the meal never passes its target, capped at three, and
/// marked with their own provenance so callers can tell them apart.
async fn top_up_floor(
    ctx: &EngineContext,
    dishes: &mut Vec<Dish>,
    meal_type: MealType,
    target: &NutritionVector,
    allergies: &[String],
) {
    let threshold = MEAL_TARGET_RATIO * target.calories;

    for _ in 0..MAX_SUPPLEMENTS {
        let total: f64 = dishes.iter().map(|d| d.nutrition.calories).sum();
        if total >= threshold {
            break;
        }

        let gap = target.scale((threshold - total) / target.calories);
        let Some(mut extra) = pick_supplement(ctx, meal_type, &gap, allergies, dishes).await
        else {
            break;
        };
        extra.source = DishSource::Supplementary;
        let headroom = target.calories - total;
        if extra.nutrition.calories > headroom {
            extra.scale_nutrition(headroom / extra.nutrition.calories);
            extra.nutrition = extra.nutrition.rounded();
        }
        info!(
            dish = %extra.name,
            meal_kcal = total,
            floor_kcal = threshold,
            "appending supplementary dish to reach calorie floor"
        );
        ctx.tracker().note(meal_type, &extra.name).await;
        dishes.push(extra);
    }
}

/// One knowledge-base dish that is not already on the plate
async fn pick_supplement(
    ctx: &EngineContext,
    meal_type: MealType,
    gap: &NutritionVector,
    allergies: &[String],
    existing: &[Dish],
) -> Option<Dish> {
    fallback::select_dishes(meal_type, gap, allergies, ctx.tracker())
        .await
        .into_iter()
        .find(|candidate| {
            !existing
                .iter()
                .any(|dish| names_similar(&dish.name, &candidate.name))
        })
}

/// Exponential pause between attempts, clipped to the meal budget
async fn pause_before_retry(attempt: u32, retry: &RetrySettings, started: Instant) {
    if attempt + 1 >= retry.max_attempts {
        return;
    }
    let delay = retry.backoff_base * 2_u32.pow(attempt);
    let remaining = retry.meal_budget.saturating_sub(started.elapsed());
    let pause = delay.min(remaining);
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}

fn temperature_for(attempt: u32) -> f32 {
    (TEMPERATURE_STEP.mul_add(attempt as f32, BASE_TEMPERATURE)).min(MAX_TEMPERATURE)
}

fn top_p_for(attempt: u32) -> f32 {
    (TOP_P_STEP.mul_add(-(attempt as f32), BASE_TOP_P)).max(MIN_TOP_P)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::errors::ErrorKind;
    use crate::llm::{ChatResponse, LlmProvider};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    enum Script {
        Reply(&'static str),
        Transient,
        Unavailable,
    }

    struct ScriptedProvider {
        script: Mutex<VecDeque<Script>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(steps: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(steps.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
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

    const TWO_DISHES: &str = r#"[
        {
            "name": "Bún Chả Hà Nội",
            "description": "Bún ăn kèm chả nướng",
            "ingredients": [
                {"name": "bún", "amount": "200g"},
                {"name": "thịt lợn", "amount": "150g"}
            ],
            "preparation": ["Nướng chả", "Pha nước chấm"],
            "nutrition": {"calories": 450, "protein": 28, "fat": 16, "carbs": 48},
            "preparation_time": "50 phút",
            "health_benefits": "Giàu đạm"
        },
        {
            "name": "Nem Cuốn Tươi",
            "description": "Nem cuốn rau sống",
            "ingredients": [
                {"name": "bánh tráng", "amount": "6 cái"},
                {"name": "rau sống", "amount": "100g"}
            ],
            "preparation": ["Cuốn nem"],
            "nutrition": {"calories": 220, "protein": 10, "fat": 5, "carbs": 34},
            "preparation_time": "20 phút",
            "health_benefits": "Nhiều chất xơ"
        }
    ]"#;

    fn quick_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.llm.api_key = Some("test-key".to_owned());
        config.retry.backoff_base = Duration::ZERO;
        config.retry.meal_budget = Duration::from_secs(5);
        config
    }

    fn ctx_with(provider: Arc<ScriptedProvider>) -> EngineContext {
        EngineContext::new(quick_config(), provider)
    }

    fn lunch_target() -> NutritionVector {
        NutritionVector::new(800.0, 50.0, 22.0, 95.0)
    }

    #[tokio::test]
    async fn test_happy_path_uses_llm_dishes() {
        let provider = ScriptedProvider::new(vec![Script::Reply(TWO_DISHES)]);
        let ctx = ctx_with(Arc::clone(&provider));

        // 670 kcal of dishes against a 630 kcal floor: no supplement needed.
        let meal = generate_meal(
            &ctx,
            MealType::Lunch,
            &NutritionVector::new(700.0, 45.0, 20.0, 85.0),
            &UserNutritionProfile::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(meal.dishes.len(), 2);
        assert!(meal.dishes.iter().all(|d| d.source == DishSource::Ai));
        assert!((meal.nutrition.calories - 670.0).abs() < f64::EPSILON);
        assert!(ctx.tracker().is_similar("Bún Chả Hà Nội", MealType::Lunch).await);
        assert_eq!(ctx.cache_info().await.cache.entries, 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_repaired() {
        let broken = r#"Đây là thực đơn:
```json
[{'name': 'Chả Cá Lã Vọng', 'description': 'Cá chiên nghệ', "nutrition": {"calories": 480, "protein": 30, "fat": 20, "carbs": 40},}]
```"#;
        let provider = ScriptedProvider::new(vec![Script::Reply(broken)]);
        let ctx = ctx_with(Arc::clone(&provider));

        let meal = generate_meal(
            &ctx,
            MealType::Dinner,
            &NutritionVector::new(500.0, 32.0, 20.0, 45.0),
            &UserNutritionProfile::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(meal.dishes[0].name, "Chả Cá Lã Vọng");
        assert_eq!(meal.dishes[0].source, DishSource::Ai);
    }

    #[tokio::test]
    async fn test_persistent_transient_failure_falls_back() {
        let provider = ScriptedProvider::new(Vec::new());
        let ctx = ctx_with(Arc::clone(&provider));

        let meal = generate_meal(
            &ctx,
            MealType::Lunch,
            &lunch_target(),
            &UserNutritionProfile::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(provider.calls(), 5);
        assert!(!meal.dishes.is_empty());
        assert!(meal.dishes.iter().all(|d| d.source != DishSource::Ai));
    }

    #[tokio::test]
    async fn test_unavailable_aborts_retries() {
        let provider = ScriptedProvider::new(vec![Script::Unavailable]);
        let ctx = ctx_with(Arc::clone(&provider));

        let meal = generate_meal(
            &ctx,
            MealType::Breakfast,
            &NutritionVector::new(500.0, 30.0, 15.0, 60.0),
            &UserNutritionProfile::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(provider.calls(), 1);
        assert!(!meal.dishes.is_empty());
        assert!(meal.dishes.iter().all(|d| d.source != DishSource::Ai));
    }

    #[tokio::test]
    async fn test_invalid_target_is_the_only_caller_error() {
        let provider = ScriptedProvider::new(Vec::new());
        let ctx = ctx_with(provider);

        let err = generate_meal(
            &ctx,
            MealType::Lunch,
            &NutritionVector::new(-100.0, 10.0, 5.0, 20.0),
            &UserNutritionProfile::default(),
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTarget);

        let err = generate_meal(
            &ctx,
            MealType::Lunch,
            &NutritionVector::new(0.0, 10.0, 5.0, 20.0),
            &UserNutritionProfile::default(),
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTarget);
    }

    #[tokio::test]
    async fn test_small_meal_gains_supplements() {
        let tiny = r#"[{
            "name": "Salad Rau Trộn",
            "description": "Rau trộn dầu giấm",
            "ingredients": [{"name": "xà lách", "amount": "150g"}],
            "preparation": ["Trộn rau"],
            "nutrition": {"calories": 220, "protein": 4, "fat": 9, "carbs": 28},
            "preparation_time": "10 phút",
            "health_benefits": "Nhiều chất xơ"
        }]"#;
        let provider = ScriptedProvider::new(vec![Script::Reply(tiny)]);
        let ctx = ctx_with(provider);

        let meal = generate_meal(
            &ctx,
            MealType::Lunch,
            &lunch_target(),
            &UserNutritionProfile::default(),
            None,
        )
        .await
        .unwrap();

        assert!(meal.has_supplement());
        let supplement_total: f64 = meal
            .dishes
            .iter()
            .filter(|d| d.source == DishSource::Supplementary)
            .map(|d| d.nutrition.calories)
            .sum();
        assert!(supplement_total > 0.0);
        let floor = MEAL_TARGET_RATIO * lunch_target().calories;
        let supplements = meal
            .dishes
            .iter()
            .filter(|d| d.source == DishSource::Supplementary)
            .count();
        assert!(
            meal.nutrition.calories >= floor || supplements == MAX_SUPPLEMENTS,
            "meal at {} kcal with {supplements} supplements",
            meal.nutrition.calories
        );
    }

    #[tokio::test]
    async fn test_supplements_never_push_meal_past_target() {
        let light = r#"[{
            "name": "Gỏi Cuốn Chay",
            "description": "Gỏi cuốn rau củ chấm tương",
            "ingredients": [{"name": "bánh tráng", "amount": "4 cái"}],
            "preparation": ["Cuốn gỏi"],
            "nutrition": {"calories": 230, "protein": 8, "fat": 6, "carbs": 36},
            "preparation_time": "15 phút",
            "health_benefits": "Ít năng lượng"
        }]"#;

        // Fresh context per round so the shuffle picks different supplements.
        for _ in 0..5 {
            let provider = ScriptedProvider::new(vec![Script::Reply(light)]);
            let ctx = ctx_with(provider);

            let meal = generate_meal(
                &ctx,
                MealType::Lunch,
                &lunch_target(),
                &UserNutritionProfile::default(),
                None,
            )
            .await
            .unwrap();

            assert!(meal.has_supplement());
            assert!(
                meal.nutrition.calories <= lunch_target().calories,
                "supplements pushed the meal past its target: {} kcal",
                meal.nutrition.calories
            );
        }
    }

    #[tokio::test]
    async fn test_allergen_dish_from_llm_is_dropped() {
        let shrimp = r#"[{
            "name": "Tôm Rang Muối",
            "description": "Tôm rang muối ớt",
            "ingredients": [{"name": "tôm sú", "amount": "200g"}],
            "preparation": ["Rang tôm"],
            "nutrition": {"calories": 420, "protein": 35, "fat": 18, "carbs": 20},
            "preparation_time": "25 phút",
            "health_benefits": "Giàu đạm"
        }]"#;
        let provider = ScriptedProvider::new(vec![Script::Reply(shrimp)]);
        let ctx = ctx_with(Arc::clone(&provider));

        let profile = UserNutritionProfile {
            allergies: vec!["tôm".to_owned()],
            ..UserNutritionProfile::default()
        };
        let meal = generate_meal(&ctx, MealType::Dinner, &lunch_target(), &profile, None)
            .await
            .unwrap();

        for dish in &meal.dishes {
            assert!(
                !contains_allergen(&dish.ingredients, &profile.allergies),
                "allergen leaked through {}",
                dish.name
            );
        }
    }

    #[tokio::test]
    async fn test_rate_denial_skips_provider() {
        let provider = ScriptedProvider::new(vec![Script::Reply(TWO_DISHES)]);
        let mut config = quick_config();
        config.rate.per_minute = 0;
        let ctx = EngineContext::new(config, Arc::clone(&provider) as Arc<dyn LlmProvider>);

        let meal = generate_meal(
            &ctx,
            MealType::Lunch,
            &lunch_target(),
            &UserNutritionProfile::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(provider.calls(), 0);
        assert!(!meal.dishes.is_empty());
    }

    #[tokio::test]
    async fn test_quota_flag_skips_provider() {
        let provider = ScriptedProvider::new(vec![Script::Reply(TWO_DISHES)]);
        let ctx = ctx_with(Arc::clone(&provider));
        ctx.limiter().mark_quota_exhausted(None).await;

        let meal = generate_meal(
            &ctx,
            MealType::Lunch,
            &lunch_target(),
            &UserNutritionProfile::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(provider.calls(), 0);
        assert!(!meal.dishes.is_empty());
    }

    #[tokio::test]
    async fn test_repeat_request_avoids_served_dishes() {
        let provider = ScriptedProvider::new(vec![
            Script::Reply(TWO_DISHES),
            Script::Reply(TWO_DISHES),
        ]);
        let ctx = ctx_with(Arc::clone(&provider));

        let first = generate_meal(
            &ctx,
            MealType::Lunch,
            &lunch_target(),
            &UserNutritionProfile::default(),
            None,
        )
        .await
        .unwrap();
        let second = generate_meal(
            &ctx,
            MealType::Lunch,
            &lunch_target(),
            &UserNutritionProfile::default(),
            None,
        )
        .await
        .unwrap();

        // The second identical payload repeats served names, so every AI dish
        // is filtered and the knowledge base steps in.
        let first_names: Vec<&str> = first.dishes.iter().map(|d| d.name.as_str()).collect();
        for dish in &second.dishes {
            assert!(
                !first_names.contains(&dish.name.as_str()),
                "{} repeated across meals",
                dish.name
            );
        }
    }

    #[test]
    fn test_sampling_schedule_clamps() {
        assert!((temperature_for(0) - 0.7).abs() < 1e-5);
        assert!((temperature_for(4) - 0.9).abs() < 1e-5);
        assert!((temperature_for(20) - 1.2).abs() < 1e-5);
        assert!((top_p_for(0) - 0.95).abs() < 1e-5);
        assert!((top_p_for(4) - 0.75).abs() < 1e-5);
        assert!((top_p_for(20) - 0.5).abs() < 1e-5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_doubles_from_one_second() {
        let retry = EngineConfig::default().retry;

        for (attempt, expected) in [(0, 1), (1, 2), (2, 4), (3, 8)] {
            let before = tokio::time::Instant::now();
            pause_before_retry(attempt, &retry, Instant::now()).await;
            assert_eq!(before.elapsed(), Duration::from_secs(expected));
        }

        // No pause after the final attempt.
        let before = tokio::time::Instant::now();
        pause_before_retry(retry.max_attempts - 1, &retry, Instant::now()).await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
