// ABOUTME: Core data models for meal plans, dishes and user nutrition profiles
// ABOUTME: Serde-backed types shared by every stage of the generation pipeline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! # Data Models
//!
//! Core data structures for the meal plan engine. The serialized shapes are
//! part of the external contract with the mobile app: dish objects always
//! carry the seven content keys in a fixed order, followed by provenance
//! flags, and a weekly plan always holds seven labeled days.
//!
//! ## Design Principles
//!
//! - **Schema stability**: field order in [`Dish`] is load-bearing; clients
//!   and prompt examples rely on it.
//! - **Tolerant input**: LLM and legacy payloads deserialize through
//!   coercing helpers (string-or-list preparation steps) so one odd shape
//!   does not discard an otherwise good dish.
//! - **Provenance**: every dish records whether it came from the model, the
//!   curated knowledge base, or a calorie-floor supplement.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::tdee;

/// Meal slot within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    /// Morning meal
    Breakfast,
    /// Midday meal
    Lunch,
    /// Evening meal
    Dinner,
    /// Optional light meal
    Snack,
}

impl MealType {
    /// The three slots every day plan must fill
    pub const MAIN_MEALS: [Self; 3] = [Self::Breakfast, Self::Lunch, Self::Dinner];

    /// Stable identifier used in cache keys and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        }
    }

    /// Vietnamese label used in prompts and user-facing text
    #[must_use]
    pub const fn label_vi(self) -> &'static str {
        match self {
            Self::Breakfast => "bữa sáng",
            Self::Lunch => "bữa trưa",
            Self::Dinner => "bữa tối",
            Self::Snack => "bữa phụ",
        }
    }

    /// Parse a caller-supplied slot name, English or Vietnamese
    #[must_use]
    pub fn from_input(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "breakfast" | "bữa sáng" | "buổi sáng" | "sáng" => Some(Self::Breakfast),
            "lunch" | "bữa trưa" | "buổi trưa" | "trưa" => Some(Self::Lunch),
            "dinner" | "bữa tối" | "buổi tối" | "tối" => Some(Self::Dinner),
            "snack" | "bữa phụ" | "ăn vặt" | "phụ" => Some(Self::Snack),
            _ => None,
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Biological sex for BMR estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Male offset in Mifflin-St Jeor
    #[serde(alias = "nam")]
    Male,
    /// Female offset in Mifflin-St Jeor
    #[serde(alias = "nữ", alias = "nu")]
    Female,
}

/// Self-reported activity level, mapped to a TDEE multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little or no exercise
    #[serde(alias = "none")]
    Sedentary,
    /// Light exercise one to three days a week
    #[serde(alias = "light", alias = "lightly_active")]
    Light,
    /// Moderate exercise three to five days a week
    #[serde(alias = "moderately_active")]
    Moderate,
    /// Hard exercise six to seven days a week
    #[serde(alias = "very_active")]
    Very,
    /// Physical job or twice-daily training
    #[serde(alias = "extra_active", alias = "athlete")]
    Extra,
}

impl ActivityLevel {
    /// Standard TDEE multiplier for this level
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Sedentary => tdee::FACTOR_SEDENTARY,
            Self::Light => tdee::FACTOR_LIGHT,
            Self::Moderate => tdee::FACTOR_MODERATE,
            Self::Very => tdee::FACTOR_VERY,
            Self::Extra => tdee::FACTOR_EXTRA,
        }
    }
}

/// Weight goal, shifting the derived day target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// Calorie deficit
    #[serde(alias = "weight_loss", alias = "lose_weight")]
    Lose,
    /// Hold current weight
    #[serde(alias = "maintain_weight")]
    Maintain,
    /// Calorie surplus
    #[serde(alias = "weight_gain", alias = "gain_weight", alias = "muscle_gain")]
    Gain,
}

/// Where a dish came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DishSource {
    /// Generated by the language model
    Ai,
    /// Served from the curated dish database
    KnowledgeBase,
    /// Appended to lift a meal over its calorie floor
    Supplementary,
}

/// One ingredient line of a dish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Ingredient name, Vietnamese
    pub name: String,
    /// Free-form quantity such as `"100g"` or `"2 quả"`
    pub amount: String,
}

impl Ingredient {
    /// Convenience constructor
    #[must_use]
    pub fn new(name: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: amount.into(),
        }
    }
}

/// Calorie and macronutrient quadruple, with optional extras
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionVector {
    /// Kilocalories
    pub calories: f64,
    /// Protein grams
    pub protein: f64,
    /// Fat grams
    pub fat: f64,
    /// Carbohydrate grams
    pub carbs: f64,
    /// Fiber grams when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    /// Sugar grams when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>,
    /// Sodium milligrams when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
}

impl NutritionVector {
    /// Build a vector from the required quadruple
    #[must_use]
    pub const fn new(calories: f64, protein: f64, fat: f64, carbs: f64) -> Self {
        Self {
            calories,
            protein,
            fat,
            carbs,
            fiber: None,
            sugar: None,
            sodium: None,
        }
    }

    /// Element-wise sum; optional fields survive when either side has them
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            fat: self.fat + other.fat,
            carbs: self.carbs + other.carbs,
            fiber: add_optional(self.fiber, other.fiber),
            sugar: add_optional(self.sugar, other.sugar),
            sodium: add_optional(self.sodium, other.sodium),
        }
    }

    /// Element-wise scale by a non-negative factor
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein: self.protein * factor,
            fat: self.fat * factor,
            carbs: self.carbs * factor,
            fiber: self.fiber.map(|v| v * factor),
            sugar: self.sugar.map(|v| v * factor),
            sodium: self.sodium.map(|v| v * factor),
        }
    }

    /// Round the required quadruple to whole numbers
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            calories: self.calories.round(),
            protein: self.protein.round(),
            fat: self.fat.round(),
            carbs: self.carbs.round(),
            ..*self
        }
    }

    /// True when every required field is finite and non-negative
    #[must_use]
    pub fn is_plausible(&self) -> bool {
        [self.calories, self.protein, self.fat, self.carbs]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }

    /// Sum a slice of vectors
    #[must_use]
    pub fn sum(vectors: impl IntoIterator<Item = Self>) -> Self {
        vectors
            .into_iter()
            .fold(Self::default(), |acc, v| acc.add(&v))
    }
}

fn add_optional(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        (x, y) => Some(x.unwrap_or(0.0) + y.unwrap_or(0.0)),
    }
}

/// A single Vietnamese dish with full content and provenance
///
/// Field order is the serialization order the mobile app expects; keep the
/// seven content keys first and in this sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    /// Dish name, Vietnamese
    pub name: String,
    /// One-sentence description
    pub description: String,
    /// At least one ingredient after validation
    pub ingredients: Vec<Ingredient>,
    /// Preparation steps; legacy payloads may encode a single string
    #[serde(deserialize_with = "string_or_list")]
    pub preparation: Vec<String>,
    /// Per-serving nutrition
    pub nutrition: NutritionVector,
    /// Human-readable duration such as `"30 phút"`
    pub preparation_time: String,
    /// Short health-benefit sentence
    pub health_benefits: String,
    /// Provenance of this dish
    #[serde(default = "DishSource::default_ai")]
    pub source: DishSource,
    /// True for curated traditional dishes
    #[serde(default)]
    pub is_traditional: bool,
}

impl DishSource {
    const fn default_ai() -> Self {
        Self::Ai
    }
}

impl Dish {
    /// Rescale this dish's nutrition in place
    pub fn scale_nutrition(&mut self, factor: f64) {
        self.nutrition = self.nutrition.scale(factor);
    }
}

/// One assembled meal: its dishes and their aggregated nutrition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    /// Non-empty dish list
    pub dishes: Vec<Dish>,
    /// Element-wise sum of the dishes' nutrition
    pub nutrition: NutritionVector,
}

impl Meal {
    /// Build a meal, computing the aggregate from the dishes
    #[must_use]
    pub fn from_dishes(dishes: Vec<Dish>) -> Self {
        let nutrition = NutritionVector::sum(dishes.iter().map(|d| d.nutrition));
        Self { dishes, nutrition }
    }

    /// True when any dish was appended as a calorie-floor supplement
    #[must_use]
    pub fn has_supplement(&self) -> bool {
        self.dishes
            .iter()
            .any(|d| d.source == DishSource::Supplementary)
    }
}

/// A full day of meals under one Vietnamese day label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// Canonical Vietnamese label, `"Thứ 2"` through `"Chủ Nhật"`
    pub day_of_week: String,
    /// Morning meal
    pub breakfast: Meal,
    /// Midday meal
    pub lunch: Meal,
    /// Evening meal
    pub dinner: Meal,
    /// Optional light meal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snack: Option<Meal>,
    /// Sum over all meals of the day
    pub nutrition: NutritionVector,
}

impl DayPlan {
    /// Aggregate nutrition across the day's meals
    #[must_use]
    pub fn aggregate(&self) -> NutritionVector {
        let mut total = self
            .breakfast
            .nutrition
            .add(&self.lunch.nutrition)
            .add(&self.dinner.nutrition);
        if let Some(snack) = &self.snack {
            total = total.add(&snack.nutrition);
        }
        total
    }
}

/// Seven consecutive day plans with a weekly aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPlan {
    /// Exactly seven days, `"Thứ 2"` first, `"Chủ Nhật"` last
    pub days: Vec<DayPlan>,
    /// Sum over all days
    pub nutrition: NutritionVector,
}

/// Caller-supplied nutrition context; every field optional
///
/// The engine consumes this, it never stores it. Absent fields fall back to
/// defaults inside the budgeter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserNutritionProfile {
    /// Biological sex for BMR estimation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    /// Age in years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Height in centimeters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    /// Weight in kilograms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    /// Self-reported activity level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<ActivityLevel>,
    /// Weight goal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    /// Free-text food preferences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferences: Vec<String>,
    /// Ingredient allergies; matching dishes are excluded outright
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergies: Vec<String>,
    /// Dietary restrictions such as vegetarian
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diet_restrictions: Vec<String>,
    /// Health conditions the prompt should respect
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub health_conditions: Vec<String>,
    /// Preferred cuisine style mentioned in prompts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine_style: Option<String>,
    /// Explicit day calorie target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_calories: Option<f64>,
    /// Explicit day protein target, grams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_protein: Option<f64>,
    /// Explicit day fat target, grams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_fat: Option<f64>,
    /// Explicit day carbohydrate target, grams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_carbs: Option<f64>,
    /// Precomputed total daily energy expenditure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tdee: Option<f64>,
    /// Request a fourth, lighter meal slot
    #[serde(default)]
    pub include_snack: bool,
}

/// Deserialize either a JSON string or a list of strings into step list form
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrList;

    impl<'de> Visitor<'de> for StringOrList {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(vec![value.to_owned()])
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut steps = Vec::new();
            while let Some(step) = seq.next_element::<String>()? {
                steps.push(step);
            }
            Ok(steps)
        }
    }

    deserializer.deserialize_any(StringOrList)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dish() -> Dish {
        Dish {
            name: "Phở Gà".into(),
            description: "Phở nước dùng gà thanh ngọt".into(),
            ingredients: vec![Ingredient::new("bánh phở", "150g")],
            preparation: vec!["Nấu nước dùng".into(), "Chan phở".into()],
            nutrition: NutritionVector::new(420.0, 25.0, 10.0, 55.0),
            preparation_time: "45 phút".into(),
            health_benefits: "Giàu đạm, ít béo".into(),
            source: DishSource::Ai,
            is_traditional: false,
        }
    }

    #[test]
    fn test_meal_type_normalization() {
        assert_eq!(MealType::from_input("Breakfast"), Some(MealType::Breakfast));
        assert_eq!(MealType::from_input("bữa sáng"), Some(MealType::Breakfast));
        assert_eq!(MealType::from_input("  Trưa "), Some(MealType::Lunch));
        assert_eq!(MealType::from_input("bữa tối"), Some(MealType::Dinner));
        assert_eq!(MealType::from_input("ăn vặt"), Some(MealType::Snack));
        assert_eq!(MealType::from_input("brunch"), None);
    }

    #[test]
    fn test_dish_serializes_content_keys_in_order() {
        let json = serde_json::to_string(&sample_dish()).unwrap();
        let keys = [
            "\"name\"",
            "\"description\"",
            "\"ingredients\"",
            "\"preparation\"",
            "\"nutrition\"",
            "\"preparation_time\"",
            "\"health_benefits\"",
        ];
        let mut last = 0;
        for key in keys {
            let pos = json.find(key).unwrap_or_else(|| panic!("missing {key}"));
            assert!(pos >= last, "{key} out of order in {json}");
            last = pos;
        }
    }

    #[test]
    fn test_preparation_accepts_single_string() {
        let raw = r#"{
            "name": "Cháo Gà",
            "description": "Cháo gà nóng",
            "ingredients": [{"name": "gạo", "amount": "100g"}],
            "preparation": "Ninh cháo với gà xé",
            "nutrition": {"calories": 350, "protein": 18, "fat": 8, "carbs": 50},
            "preparation_time": "40 phút",
            "health_benefits": "Dễ tiêu hóa"
        }"#;
        let dish: Dish = serde_json::from_str(raw).unwrap();
        assert_eq!(dish.preparation, vec!["Ninh cháo với gà xé".to_owned()]);
        assert_eq!(dish.source, DishSource::Ai);
        assert!(!dish.is_traditional);
    }

    #[test]
    fn test_nutrition_add_and_scale() {
        let a = NutritionVector::new(400.0, 20.0, 10.0, 50.0);
        let mut b = NutritionVector::new(100.0, 5.0, 2.0, 12.0);
        b.fiber = Some(3.0);

        let sum = a.add(&b);
        assert!((sum.calories - 500.0).abs() < f64::EPSILON);
        assert!((sum.protein - 25.0).abs() < f64::EPSILON);
        assert_eq!(sum.fiber, Some(3.0));
        assert_eq!(sum.sugar, None);

        let scaled = b.scale(2.0);
        assert!((scaled.calories - 200.0).abs() < f64::EPSILON);
        assert_eq!(scaled.fiber, Some(6.0));
    }

    #[test]
    fn test_nutrition_plausibility() {
        assert!(NutritionVector::new(400.0, 20.0, 10.0, 50.0).is_plausible());
        assert!(!NutritionVector::new(-1.0, 20.0, 10.0, 50.0).is_plausible());
        assert!(!NutritionVector::new(f64::NAN, 20.0, 10.0, 50.0).is_plausible());
    }

    #[test]
    fn test_meal_from_dishes_aggregates() {
        let mut second = sample_dish();
        second.name = "Gỏi Cuốn".into();
        second.nutrition = NutritionVector::new(180.0, 12.0, 4.0, 22.0);

        let meal = Meal::from_dishes(vec![sample_dish(), second]);
        assert_eq!(meal.dishes.len(), 2);
        assert!((meal.nutrition.calories - 600.0).abs() < f64::EPSILON);
        assert!((meal.nutrition.protein - 37.0).abs() < f64::EPSILON);
        assert!(!meal.has_supplement());
    }

    #[test]
    fn test_profile_defaults() {
        let profile: UserNutritionProfile = serde_json::from_str("{}").unwrap();
        assert!(profile.gender.is_none());
        assert!(profile.allergies.is_empty());
        assert!(!profile.include_snack);
    }

    #[test]
    fn test_activity_multipliers_are_ordered() {
        let levels = [
            ActivityLevel::Sedentary,
            ActivityLevel::Light,
            ActivityLevel::Moderate,
            ActivityLevel::Very,
            ActivityLevel::Extra,
        ];
        for pair in levels.windows(2) {
            assert!(pair[0].multiplier() < pair[1].multiplier());
        }
    }
}
