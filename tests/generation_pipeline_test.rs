// ABOUTME: End-to-end generation pipeline tests with a scripted LLM provider
// ABOUTME: Covers repair rescues, retry exhaustion, quota and rate short-circuits, cache reuse
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::Script;
use ngon_meal_engine::assembler;
use ngon_meal_engine::context::EngineContext;
use ngon_meal_engine::llm::LlmProvider;
use ngon_meal_engine::models::{DishSource, MealType, NutritionVector};
use std::sync::Arc;

fn lunch_target() -> NutritionVector {
    NutritionVector::new(800.0, 60.0, 26.0, 100.0)
}

#[tokio::test]
async fn test_clean_payload_produces_ai_meal_in_one_call() {
    let (ctx, provider) = common::scripted_context(vec![Script::Reply(common::VALID_TWO_DISHES)]);

    // The 670 kcal payload clears this target's 630 kcal floor, so the meal
    // arrives with no supplement.
    let meal = assembler::generate_meal(
        &ctx,
        MealType::Lunch,
        &NutritionVector::new(700.0, 50.0, 24.0, 88.0),
        &common::default_profile(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(meal.dishes.len(), 2);
    assert!(meal.dishes.iter().all(|d| d.source == DishSource::Ai));
    assert!((meal.nutrition.calories - 670.0).abs() < 0.5);
}

#[tokio::test]
async fn test_fenced_single_quoted_payload_is_rescued() {
    let raw = "```json\n[{'name': 'Chả Cá Lã Vọng', 'description': 'Cá lăng nướng nghệ', \
               'nutrition': {'calories': 520, 'protein': 35, 'fat': 22, 'carbs': 40},},]\n```";
    let (ctx, provider) = common::scripted_context(vec![Script::Reply(raw)]);

    let meal = assembler::generate_meal(
        &ctx,
        MealType::Dinner,
        &NutritionVector::new(560.0, 40.0, 20.0, 70.0),
        &common::default_profile(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(meal.dishes[0].name, "Chả Cá Lã Vọng");
    assert_eq!(meal.dishes[0].source, DishSource::Ai);
    assert!((meal.dishes[0].nutrition.calories - 520.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_refusal_prose_exhausts_retries_then_uses_knowledge_base() {
    // No Vietnamese dish keyword anywhere, so inference cannot rescue this.
    let refusal = "Xin lỗi, tôi không thể tạo thực đơn lúc này.";
    let (ctx, provider) = common::scripted_context(vec![
        Script::Reply(refusal),
        Script::Reply(refusal),
        Script::Reply(refusal),
        Script::Reply(refusal),
        Script::Reply(refusal),
    ]);

    let meal = assembler::generate_meal(
        &ctx,
        MealType::Lunch,
        &lunch_target(),
        &common::default_profile(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(provider.calls(), 5, "every attempt should be consumed");
    assert!(!meal.dishes.is_empty());
    assert!(meal.dishes.iter().all(|d| d.source != DishSource::Ai));
}

#[tokio::test]
async fn test_prose_with_dish_names_yields_inferred_dish() {
    let prose = "Tôi không thể xuất JSON, nhưng Phở Gà Hà Nội là lựa chọn tốt cho bữa trưa.";
    let (ctx, provider) = common::scripted_context(vec![Script::Reply(prose)]);

    let meal = assembler::generate_meal(
        &ctx,
        MealType::Lunch,
        &lunch_target(),
        &common::default_profile(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(meal.dishes[0].name, "Phở Gà Hà Nội");
    assert_eq!(meal.dishes[0].source, DishSource::Ai);
    // Skeletal dishes carry the flat nutrition defaults.
    assert!((meal.dishes[0].nutrition.calories - 400.0).abs() < f64::EPSILON);
    // 400 kcal misses the 720 kcal floor, so supplements are appended.
    assert!(meal.has_supplement());
    assert!(meal.dishes.len() >= 2);
}

#[tokio::test]
async fn test_transient_failures_consume_the_retry_ladder() {
    let (ctx, provider) = common::scripted_context(vec![
        Script::Transient,
        Script::Transient,
        Script::Reply(common::VALID_TWO_DISHES),
    ]);

    let meal = assembler::generate_meal(
        &ctx,
        MealType::Lunch,
        &lunch_target(),
        &common::default_profile(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(provider.calls(), 3);
    assert!(meal.dishes.iter().any(|d| d.source == DishSource::Ai));
}

#[tokio::test]
async fn test_unavailable_provider_stops_retrying_immediately() {
    let (ctx, provider) = common::scripted_context(vec![
        Script::Unavailable,
        Script::Reply(common::VALID_TWO_DISHES),
    ]);

    let meal = assembler::generate_meal(
        &ctx,
        MealType::Lunch,
        &lunch_target(),
        &common::default_profile(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(provider.calls(), 1, "unavailable must abort the ladder");
    assert!(meal.dishes.iter().all(|d| d.source != DishSource::Ai));
}

#[tokio::test]
async fn test_quota_flag_short_circuits_to_knowledge_base() {
    let (ctx, provider) = common::scripted_context(vec![Script::Reply(common::VALID_TWO_DISHES)]);
    ctx.limiter().mark_quota_exhausted(None).await;

    let meal = assembler::generate_meal(
        &ctx,
        MealType::Dinner,
        &NutritionVector::new(700.0, 50.0, 22.0, 90.0),
        &common::default_profile(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(provider.calls(), 0, "no completion may be attempted");
    assert!(meal.dishes.iter().all(|d| d.source != DishSource::Ai));
}

#[tokio::test]
async fn test_rate_denial_short_circuits_without_waiting() {
    common::init_test_logging();
    let provider = common::ScriptedProvider::new(vec![Script::Reply(common::VALID_TWO_DISHES)]);
    let mut config = common::quick_config();
    config.rate.per_minute = 0;
    let ctx = EngineContext::new(config, Arc::clone(&provider) as Arc<dyn LlmProvider>);

    let started = std::time::Instant::now();
    let meal = assembler::generate_meal(
        &ctx,
        MealType::Lunch,
        &lunch_target(),
        &common::default_profile(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(provider.calls(), 0);
    assert!(!meal.dishes.is_empty());
    // The denial's wait hint must not be slept on.
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[tokio::test]
async fn test_cached_meal_is_reused_within_ttl() {
    let (ctx, provider) = common::scripted_context(vec![Script::Reply(common::VALID_TWO_DISHES)]);
    let profile = common::default_profile();

    let first = assembler::generate_meal(&ctx, MealType::Lunch, &lunch_target(), &profile, None)
        .await
        .unwrap();
    assert_eq!(provider.calls(), 1);

    // With the diversity history wiped, the cached entry is acceptable again.
    ctx.reset_tracker(None).await;
    let second = assembler::generate_meal(&ctx, MealType::Lunch, &lunch_target(), &profile, None)
        .await
        .unwrap();

    assert_eq!(provider.calls(), 1, "second meal must come from the cache");
    let first_names: Vec<&str> = first.dishes.iter().map(|d| d.name.as_str()).collect();
    let second_names: Vec<&str> = second.dishes.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(first_names, second_names);
}

#[tokio::test]
async fn test_low_calorie_breakfast_lands_between_floor_and_tolerance() {
    let ctx = common::offline_context();

    let meal = assembler::generate_meal(
        &ctx,
        MealType::Breakfast,
        &NutritionVector::new(414.0, 31.0, 14.0, 52.0),
        &common::default_profile(),
        None,
    )
    .await
    .unwrap();

    // Scaling pulls each dish toward an equal share of 414 kcal; the 0.5
    // clamp can leave at most 500 kcal on the plate.
    let total: f64 = meal.dishes.iter().map(|d| d.nutrition.calories).sum();
    assert!(
        (373.0..=500.0).contains(&total),
        "breakfast total {total} outside the tolerated band"
    );
    assert!(!meal.dishes.is_empty());
    assert!(meal.dishes.iter().all(|d| d.source != DishSource::Ai));
}

#[tokio::test]
async fn test_allergen_dishes_from_model_are_dropped() {
    let raw = r#"[
        {"name": "Tôm Rang Me", "ingredients": [{"name": "tôm sú", "amount": "200g"}],
         "nutrition": {"calories": 380, "protein": 30, "fat": 18, "carbs": 20}},
        {"name": "Rau Muống Xào Tỏi", "ingredients": [{"name": "rau muống", "amount": "300g"}],
         "nutrition": {"calories": 180, "protein": 6, "fat": 10, "carbs": 16}}
    ]"#;
    let (ctx, provider) = common::scripted_context(vec![Script::Reply(raw)]);
    let mut profile = common::default_profile();
    profile.allergies = vec!["tôm".to_owned()];

    let meal = assembler::generate_meal(&ctx, MealType::Dinner, &lunch_target(), &profile, None)
        .await
        .unwrap();

    assert_eq!(provider.calls(), 1);
    assert!(meal.dishes.iter().all(|d| d.name != "Tôm Rang Me"));
    assert!(meal.dishes.iter().any(|d| d.name == "Rau Muống Xào Tỏi"));
}
