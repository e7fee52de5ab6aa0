// ABOUTME: Knowledge-base dish selection for meals the LLM path could not produce
// ABOUTME: Applies a relaxation ladder ending at a hard-coded terminal dish
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! # Fallback Selector
//!
//! When generation yields zero valid dishes, a meal is assembled from the
//! curated catalog instead. Selection relaxes in three steps: slot-tagged
//! dishes that clear allergies and the diversity window, then the same pool
//! ignoring diversity, then any slot. The allergy filter is never relaxed.
//! If even the whole catalog is filtered away, a hard-coded terminal dish
//! guarantees the meal is non-empty.
//!
//! Selected dishes are shuffled, capped at two, and linearly scaled toward
//! an equal share of the meal target.

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::constants::scale::{MAX_FACTOR, MIN_FACTOR};
use crate::diversity::DiversityTracker;
use crate::knowledge_base::{catalog, DishCatalog};
use crate::models::{Dish, DishSource, Ingredient, MealType, NutritionVector};

/// How many catalog dishes one fallback meal may hold
const MAX_FALLBACK_DISHES: usize = 2;

/// Selects fallback dishes for one meal. Always returns at least one dish.
pub async fn select_dishes(
    meal_type: MealType,
    target: &NutritionVector,
    allergies: &[String],
    tracker: &DiversityTracker,
) -> Vec<Dish> {
    let mut dishes = match catalog() {
        Some(catalog) => pick_from_catalog(catalog, meal_type, allergies, tracker).await,
        None => Vec::new(),
    };

    if dishes.is_empty() {
        warn!(
            meal_type = meal_type.as_str(),
            "catalog produced no servable dish, using terminal dish"
        );
        dishes.push(terminal_dish());
    }

    dishes.shuffle(&mut rand::thread_rng());
    dishes.truncate(MAX_FALLBACK_DISHES);
    scale_toward_target(&mut dishes, target);
    dishes
}

/// Walks the relaxation ladder over the catalog.
async fn pick_from_catalog(
    catalog: &DishCatalog,
    meal_type: MealType,
    allergies: &[String],
    tracker: &DiversityTracker,
) -> Vec<Dish> {
    let slot_pool = catalog.candidates(meal_type, allergies);

    let mut fresh = Vec::with_capacity(slot_pool.len());
    for (name, entry) in &slot_pool {
        if !tracker.is_similar(name, meal_type).await {
            fresh.push(DishCatalog::build_dish(name, entry));
        }
    }
    if !fresh.is_empty() {
        return fresh;
    }

    if !slot_pool.is_empty() {
        debug!(
            meal_type = meal_type.as_str(),
            "diversity window exhausted the slot pool, relaxing repetition rule"
        );
        return slot_pool
            .iter()
            .map(|(name, entry)| DishCatalog::build_dish(name, entry))
            .collect();
    }

    debug!(
        meal_type = meal_type.as_str(),
        "no slot-tagged dish clears the allergy list, relaxing slot filter"
    );
    catalog
        .any_slot_candidates(allergies)
        .iter()
        .map(|(name, entry)| DishCatalog::build_dish(name, entry))
        .collect()
}

/// Scales each dish toward an equal share of the meal target.
fn scale_toward_target(dishes: &mut [Dish], target: &NutritionVector) {
    if dishes.is_empty() || target.calories <= 0.0 {
        return;
    }
    let share = target.calories / dishes.len() as f64;
    for dish in dishes {
        if dish.nutrition.calories > 0.0 {
            let factor = (share / dish.nutrition.calories).clamp(MIN_FACTOR, MAX_FACTOR);
            dish.scale_nutrition(factor);
            dish.nutrition = dish.nutrition.rounded();
        }
    }
}

/// Last-resort dish embedded in code so a meal can never come back empty.
fn terminal_dish() -> Dish {
    Dish {
        name: "Cơm Trắng Trứng Luộc".to_owned(),
        description: "Cơm trắng ăn kèm trứng luộc, bữa ăn tối giản luôn sẵn có".to_owned(),
        ingredients: vec![
            Ingredient::new("cơm trắng", "250g"),
            Ingredient::new("trứng gà", "2 quả"),
            Ingredient::new("dưa leo", "100g"),
        ],
        preparation: vec![
            "Nấu cơm trắng".to_owned(),
            "Luộc trứng chín tới, bóc vỏ".to_owned(),
            "Dọn kèm dưa leo thái lát".to_owned(),
        ],
        nutrition: NutritionVector::new(480.0, 18.0, 12.0, 72.0),
        preparation_time: "20 phút".to_owned(),
        health_benefits: "Cung cấp tinh bột và đạm cơ bản cho bữa ăn".to_owned(),
        source: DishSource::KnowledgeBase,
        is_traditional: true,
    }
}
