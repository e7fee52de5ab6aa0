// ABOUTME: Embedded catalog of curated Vietnamese dishes with meal-type and region tags
// ABOUTME: Backs the fallback path and the nutrition estimator when the LLM is out
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! # Dish Knowledge Base
//!
//! A curated catalog of traditional Vietnamese dishes embedded into the
//! binary at compile time and parsed once on first use. Every dish carries
//! complete content (ingredients, preparation, nutrition) so a plan built
//! entirely from this catalog is indistinguishable in shape from an
//! LLM-generated one.

pub mod ingredients;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::models::{Dish, DishSource, Ingredient, MealType, NutritionVector};

/// Raw catalog JSON, embedded at compile time
const DISHES_JSON: &str = include_str!("dishes.json");

/// One catalog entry as stored in the embedded JSON
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDish {
    /// One-sentence description
    pub description: String,
    /// Meal slots this dish suits
    pub meal_type: Vec<MealType>,
    /// Region of origin, informational only
    pub region: String,
    /// Ingredient lines
    pub ingredients: Vec<Ingredient>,
    /// Preparation steps
    pub preparation: Vec<String>,
    /// Per-serving nutrition
    pub nutrition: NutritionVector,
    /// Human-readable duration
    pub preparation_time: String,
    /// Short health-benefit sentence
    pub health_benefits: String,
}

/// The parsed dish catalog, keyed by dish name
///
/// `BTreeMap` keeps iteration deterministic; callers that want variety
/// shuffle explicitly.
#[derive(Debug)]
pub struct DishCatalog {
    dishes: BTreeMap<String, CatalogDish>,
}

/// Per-slot dish counts for ops introspection
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CatalogCounts {
    /// Dishes in the catalog
    pub total: usize,
    /// Dishes tagged for breakfast
    pub breakfast: usize,
    /// Dishes tagged for lunch
    pub lunch: usize,
    /// Dishes tagged for dinner
    pub dinner: usize,
    /// Dishes tagged for snacks
    pub snack: usize,
}

/// Parsed once on first access. `None` when the embedded data is corrupt,
/// which the fallback selector reports as an internal configuration error.
static CATALOG: LazyLock<Option<DishCatalog>> = LazyLock::new(|| {
    DishCatalog::from_embedded().map_or_else(
        |err| {
            tracing::error!(error = %err, "embedded dish catalog failed to parse");
            None
        },
        Some,
    )
});

/// Access the shared catalog, if it parsed cleanly
#[must_use]
pub fn catalog() -> Option<&'static DishCatalog> {
    CATALOG.as_ref()
}

impl DishCatalog {
    fn from_embedded() -> Result<Self, serde_json::Error> {
        let dishes: BTreeMap<String, CatalogDish> = serde_json::from_str(DISHES_JSON)?;
        Ok(Self { dishes })
    }

    /// Number of dishes in the catalog
    #[must_use]
    pub fn len(&self) -> usize {
        self.dishes.len()
    }

    /// True when the catalog holds no dishes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dishes.is_empty()
    }

    /// Look up one dish by exact name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CatalogDish> {
        self.dishes.get(name)
    }

    /// Dishes tagged for a meal slot that clear the caller's allergy list
    #[must_use]
    pub fn candidates(
        &self,
        meal_type: MealType,
        allergies: &[String],
    ) -> Vec<(&str, &CatalogDish)> {
        self.dishes
            .iter()
            .filter(|(_, dish)| dish.meal_type.contains(&meal_type))
            .filter(|(_, dish)| !contains_allergen(&dish.ingredients, allergies))
            .map(|(name, dish)| (name.as_str(), dish))
            .collect()
    }

    /// How many dishes each slot can draw on
    #[must_use]
    pub fn slot_counts(&self) -> CatalogCounts {
        let count = |meal_type: MealType| {
            self.dishes
                .values()
                .filter(|dish| dish.meal_type.contains(&meal_type))
                .count()
        };
        CatalogCounts {
            total: self.dishes.len(),
            breakfast: count(MealType::Breakfast),
            lunch: count(MealType::Lunch),
            dinner: count(MealType::Dinner),
            snack: count(MealType::Snack),
        }
    }

    /// Every dish clearing the allergy list, regardless of meal slot
    ///
    /// Used by the fallback ladder once the slot-tagged pool is exhausted.
    #[must_use]
    pub fn any_slot_candidates(&self, allergies: &[String]) -> Vec<(&str, &CatalogDish)> {
        self.dishes
            .iter()
            .filter(|(_, dish)| !contains_allergen(&dish.ingredients, allergies))
            .map(|(name, dish)| (name.as_str(), dish))
            .collect()
    }

    /// Materialize a catalog entry as a servable dish
    #[must_use]
    pub fn build_dish(name: &str, entry: &CatalogDish) -> Dish {
        Dish {
            name: name.to_owned(),
            description: entry.description.clone(),
            ingredients: entry.ingredients.clone(),
            preparation: entry.preparation.clone(),
            nutrition: entry.nutrition,
            preparation_time: entry.preparation_time.clone(),
            health_benefits: entry.health_benefits.clone(),
            source: DishSource::KnowledgeBase,
            is_traditional: true,
        }
    }
}

/// Case-insensitive substring match of any allergy term against ingredient names
#[must_use]
pub fn contains_allergen(ingredients: &[Ingredient], allergies: &[String]) -> bool {
    if allergies.is_empty() {
        return false;
    }
    ingredients.iter().any(|ingredient| {
        let name = ingredient.name.to_lowercase();
        allergies
            .iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .any(|a| name.contains(&a))
    })
}
