// ABOUTME: Normalizes candidate dish objects into complete Dish values, filling absent
// ABOUTME: fields with Vietnamese defaults and rescuing implausibly small nutrition
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! Dish validation and normalization.
//!
//! Candidates arriving from [`crate::repair`] are loosely shaped JSON. This
//! module turns each into a fully populated [`Dish`] or rejects it with a
//! [`DropReason`]. Every content field has a deterministic default, so the
//! only unrecoverable defect is a missing or empty `name`.
//!
//! Nutrition gets three levels of rescue, tried in order: coerce whatever
//! numbers the payload carries, estimate from the ingredient table when the
//! payload has no usable calories, and finally fall back to flat defaults.
//! A dish that still reports fewer calories than the scaling trigger is
//! scaled up to its meal slot's floor.
//!
//! Normalization is idempotent: validating an already validated dish
//! reproduces it unchanged.

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::FloorSettings;
use crate::constants::dish_defaults;
use crate::constants::floors::SCALE_TRIGGER;
use crate::knowledge_base::ingredients::estimate_nutrition;
use crate::models::{Dish, DishSource, Ingredient, MealType, NutritionVector};

/// Why one candidate could not become a dish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The candidate is not a JSON object
    NotAnObject,
    /// The object has no `name` key, or its value is not a string
    MissingName,
    /// The name is present but whitespace only
    BlankName,
}

impl DropReason {
    /// Stable identifier for logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotAnObject => "not_an_object",
            Self::MissingName => "missing_name",
            Self::BlankName => "blank_name",
        }
    }
}

/// Validates a batch of candidates, dropping the unusable ones.
#[must_use]
pub fn validate_dishes(
    candidates: &[Value],
    meal_type: MealType,
    floors: &FloorSettings,
) -> Vec<Dish> {
    let mut dishes = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match validate_dish(candidate, meal_type, floors) {
            Ok(dish) => dishes.push(dish),
            Err(reason) => debug!(
                reason = reason.as_str(),
                meal_type = meal_type.as_str(),
                "dropped dish candidate"
            ),
        }
    }
    dishes
}

/// Normalizes one candidate into a [`Dish`], or says why it cannot be one.
///
/// # Errors
///
/// [`DropReason`] when the candidate is not an object or carries no usable
/// name; every other defect is normalized away.
pub fn validate_dish(
    candidate: &Value,
    meal_type: MealType,
    floors: &FloorSettings,
) -> Result<Dish, DropReason> {
    let obj = candidate.as_object().ok_or(DropReason::NotAnObject)?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or(DropReason::MissingName)?
        .trim();
    if name.is_empty() {
        return Err(DropReason::BlankName);
    }

    // Ingredients come first so the nutrition rescue can estimate from them.
    let ingredients = normalize_ingredients(obj.get("ingredients"));
    let preparation = normalize_preparation(obj.get("preparation"), name);
    let nutrition = normalize_nutrition(obj, &ingredients, meal_type, floors);

    Ok(Dish {
        name: name.to_owned(),
        description: text_field(obj.get("description"))
            .unwrap_or_else(|| format!("Món ăn {name} ngon và bổ dưỡng")),
        ingredients,
        preparation,
        nutrition,
        preparation_time: duration_field(obj.get("preparation_time")),
        health_benefits: text_field(obj.get("health_benefits")).unwrap_or_else(|| {
            format!("Món {name} cung cấp dinh dưỡng cân bằng và tốt cho sức khỏe")
        }),
        source: DishSource::Ai,
        is_traditional: false,
    })
}

/// Non-empty trimmed string, or nothing.
fn text_field(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

/// Preparation time as a human-readable string. Bare numbers are read as
/// minutes, anything else becomes the default.
fn duration_field(value: Option<&Value>) -> String {
    if let Some(text) = text_field(value) {
        return text;
    }
    if let Some(minutes) = value.and_then(Value::as_u64) {
        return format!("{minutes} phút");
    }
    dish_defaults::PREPARATION_TIME.to_owned()
}

/// Normalizes the ingredient list, wrapping bare strings and guaranteeing at
/// least one entry.
fn normalize_ingredients(value: Option<&Value>) -> Vec<Ingredient> {
    let mut list: Vec<Ingredient> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(ingredient_from).collect(),
        // Stringified lists slip through when the payload parsed before the
        // quote-unwrapping repair could run.
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => items.iter().filter_map(ingredient_from).collect(),
            _ => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Vec::new()
                } else {
                    vec![Ingredient::new(trimmed, dish_defaults::INGREDIENT_AMOUNT)]
                }
            }
        },
        _ => Vec::new(),
    };

    if list.is_empty() {
        list.push(Ingredient::new(
            dish_defaults::INGREDIENT_NAME,
            dish_defaults::INGREDIENT_AMOUNT,
        ));
    }
    list
}

fn ingredient_from(value: &Value) -> Option<Ingredient> {
    match value {
        Value::String(name) => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(Ingredient::new(trimmed, dish_defaults::INGREDIENT_AMOUNT))
            }
        }
        Value::Object(map) => {
            let name = map
                .get("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())?;
            let amount = map
                .get("amount")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|amount| !amount.is_empty())
                .unwrap_or(dish_defaults::INGREDIENT_AMOUNT);
            Some(Ingredient::new(name, amount))
        }
        _ => None,
    }
}

/// Normalizes preparation into a non-empty list of step strings.
fn normalize_preparation(value: Option<&Value>, name: &str) -> Vec<String> {
    let steps: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|step| !step.is_empty())
            .map(str::to_owned)
            .collect(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|step| !step.is_empty())
                .map(str::to_owned)
                .collect(),
            _ => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Vec::new()
                } else {
                    vec![trimmed.to_owned()]
                }
            }
        },
        _ => Vec::new(),
    };

    if steps.is_empty() {
        vec![format!("Chuẩn bị {name} theo hướng dẫn")]
    } else {
        steps
    }
}

/// Builds the nutrition vector with coercion, estimation, and defaults.
fn normalize_nutrition(
    obj: &Map<String, Value>,
    ingredients: &[Ingredient],
    meal_type: MealType,
    floors: &FloorSettings,
) -> NutritionVector {
    // Some payloads flatten nutrition into the dish object itself.
    let source = obj
        .get("nutrition")
        .and_then(Value::as_object)
        .or_else(|| obj.contains_key("calories").then_some(obj));
    let field = |key: &str| source.and_then(|map| map.get(key)).and_then(coerce_number);
    let non_negative = |v: &f64| v.is_finite() && *v >= 0.0;

    let calories = field("calories").filter(|v| v.is_finite() && *v > 0.0);
    let protein = field("protein")
        .filter(non_negative)
        .unwrap_or(dish_defaults::PROTEIN);
    let fat = field("fat")
        .filter(non_negative)
        .unwrap_or(dish_defaults::FAT);
    let carbs = field("carbs")
        .filter(non_negative)
        .unwrap_or(dish_defaults::CARBS);

    let mut vector = match calories {
        Some(calories) => NutritionVector {
            calories,
            protein,
            fat,
            carbs,
            fiber: field("fiber").filter(non_negative),
            sugar: field("sugar").filter(non_negative),
            sodium: field("sodium").filter(non_negative),
        },
        // No usable calories: prefer an ingredient-table estimate over the
        // flat defaults, but only when it clears the plausibility bar.
        None => match estimate_nutrition(ingredients)
            .filter(|est| est.calories >= dish_defaults::ESTIMATE_MIN_CALORIES)
        {
            Some(estimate) => estimate,
            None => NutritionVector::new(dish_defaults::CALORIES, protein, fat, carbs),
        },
    };

    // Dishes reporting implausibly few calories get scaled up to the slot
    // floor. Snacks between their floor and the trigger are left alone.
    if vector.calories < SCALE_TRIGGER {
        let floor = floors.floor_for(meal_type);
        if vector.calories > 0.0 && vector.calories < floor {
            vector = vector.scale(floor / vector.calories);
        }
    }

    vector.rounded()
}

/// Reads a number from a JSON number or a numeric-prefixed string such as
/// `"420 kcal"`.
fn coerce_number(value: &Value) -> Option<f64> {
    if let Some(number) = value.as_f64() {
        return Some(number);
    }
    let text = value.as_str()?.trim().replace(',', ".");
    let prefix: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    prefix.parse().ok()
}
