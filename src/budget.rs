// ABOUTME: Nutrition budgeter deriving day targets and per-meal budgets
// ABOUTME: Fixed meal ratios, goal adjustment from TDEE, Mifflin-St Jeor derivation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! # Nutrition Budgeter
//!
//! Turns a day-level nutrition target into per-meal budgets with fixed
//! ratios, optionally overriding the caller's target from the profile's
//! TDEE and weight goal.
//!
//! # Scientific References
//!
//! - Mifflin, M.D., et al. (1990). A new predictive equation for resting
//!   energy expenditure. *American Journal of Clinical Nutrition*, 51(2),
//!   241-247. <https://doi.org/10.1093/ajcn/51.2.241>

use crate::constants::{goal_adjustment, macro_split, ratios, tdee};
use crate::errors::{EngineError, EngineResult};
use crate::models::{ActivityLevel, Gender, Goal, MealType, NutritionVector, UserNutritionProfile};

/// Per-meal nutrition budgets for one day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayBudget {
    /// Breakfast share of the day
    pub breakfast: NutritionVector,
    /// Lunch share of the day
    pub lunch: NutritionVector,
    /// Dinner share of the day
    pub dinner: NutritionVector,
    /// Snack share, present only when requested
    pub snack: Option<NutritionVector>,
}

impl DayBudget {
    /// Budget for a given slot; `None` for an unplanned snack
    #[must_use]
    pub const fn slot(&self, meal_type: MealType) -> Option<NutritionVector> {
        match meal_type {
            MealType::Breakfast => Some(self.breakfast),
            MealType::Lunch => Some(self.lunch),
            MealType::Dinner => Some(self.dinner),
            MealType::Snack => self.snack,
        }
    }
}

/// Calculate BMR using the Mifflin-St Jeor equation (1990)
///
/// Formula: `BMR = (10 x weight_kg) + (6.25 x height_cm) - (5 x age) + gender_offset`
/// - Men: +5
/// - Women: -161
///
/// # Errors
///
/// `InvalidTarget` when a body metric is outside the ranges the formula was
/// validated for.
pub fn calculate_bmr(
    weight_kg: f64,
    height_cm: f64,
    age: u32,
    gender: Gender,
) -> EngineResult<f64> {
    let (weight_min, weight_max) = tdee::WEIGHT_RANGE_KG;
    if !weight_kg.is_finite() || weight_kg <= weight_min || weight_kg > weight_max {
        return Err(EngineError::invalid_target(
            "weight must be between 0 and 300 kg",
        ));
    }
    let (height_min, height_max) = tdee::HEIGHT_RANGE_CM;
    if !height_cm.is_finite() || height_cm <= height_min || height_cm > height_max {
        return Err(EngineError::invalid_target(
            "height must be between 0 and 250 cm",
        ));
    }
    let (age_min, age_max) = tdee::AGE_RANGE;
    if !(age_min..=age_max).contains(&age) {
        return Err(EngineError::invalid_target(
            "age must be between 10 and 120 years",
        ));
    }

    let offset = match gender {
        Gender::Male => tdee::MSJ_MALE_OFFSET,
        Gender::Female => tdee::MSJ_FEMALE_OFFSET,
    };
    Ok(tdee::MSJ_WEIGHT_COEF * weight_kg
        + tdee::MSJ_HEIGHT_COEF * height_cm
        + tdee::MSJ_AGE_COEF * f64::from(age)
        + offset)
}

/// Derive TDEE from the profile's body metrics
///
/// Returns the profile's explicit `tdee` when present. Otherwise derives
/// BMR via Mifflin-St Jeor and applies the activity multiplier (sedentary
/// when unreported). Returns `None` when any body metric is missing.
///
/// # Errors
///
/// `InvalidTarget` when present body metrics are out of range.
pub fn derive_tdee(profile: &UserNutritionProfile) -> EngineResult<Option<f64>> {
    if let Some(explicit) = profile.tdee {
        if !explicit.is_finite() || explicit <= 0.0 {
            return Err(EngineError::invalid_target("tdee must be positive"));
        }
        return Ok(Some(explicit));
    }

    let (Some(gender), Some(age), Some(height_cm), Some(weight_kg)) = (
        profile.gender,
        profile.age,
        profile.height_cm,
        profile.weight_kg,
    ) else {
        return Ok(None);
    };

    let bmr = calculate_bmr(weight_kg, height_cm, age, gender)?;
    let multiplier = profile
        .activity_level
        .map_or(tdee::FACTOR_SEDENTARY, ActivityLevel::multiplier);
    Ok(Some(bmr * multiplier))
}

/// Resolve the day target the plan will be built against
///
/// The caller's target wins unless the profile carries a goal and a TDEE
/// (explicit or derivable); then the goal adjustment overrides it:
/// lose −500, maintain ±0, gain +300, clamped to [1200, 4000], with the
/// macro split 30% protein / 25% fat / 45% carbs at 4/9/4 kcal per gram.
/// Zero macros in a caller target are backfilled from the same split.
///
/// # Errors
///
/// `InvalidTarget` for non-finite or negative fields, a zero-calorie
/// target, or out-of-range body metrics.
pub fn resolve_day_target(
    target: &NutritionVector,
    profile: &UserNutritionProfile,
) -> EngineResult<NutritionVector> {
    if !target.is_plausible() {
        return Err(EngineError::invalid_target(
            "day target fields must be finite and non-negative",
        ));
    }
    if target.calories <= 0.0 {
        return Err(EngineError::invalid_target(
            "day target calories must be positive",
        ));
    }

    if let Some(goal) = profile.goal {
        if let Some(tdee_value) = derive_tdee(profile)? {
            let delta = match goal {
                Goal::Lose => goal_adjustment::LOSE_DELTA,
                Goal::Maintain => 0.0,
                Goal::Gain => goal_adjustment::GAIN_DELTA,
            };
            let calories = (tdee_value + delta).clamp(
                goal_adjustment::MIN_DAY_CALORIES,
                goal_adjustment::MAX_DAY_CALORIES,
            );
            return Ok(macros_from_calories(calories).rounded());
        }
    }

    let mut resolved = *target;
    let split = macros_from_calories(target.calories);
    if resolved.protein == 0.0 {
        resolved.protein = split.protein;
    }
    if resolved.fat == 0.0 {
        resolved.fat = split.fat;
    }
    if resolved.carbs == 0.0 {
        resolved.carbs = split.carbs;
    }
    Ok(resolved.rounded())
}

/// Standard macro split for a calorie total
fn macros_from_calories(calories: f64) -> NutritionVector {
    NutritionVector::new(
        calories,
        macro_split::PROTEIN_PCT * calories / macro_split::KCAL_PER_G_PROTEIN,
        macro_split::FAT_PCT * calories / macro_split::KCAL_PER_G_FAT,
        macro_split::CARBS_PCT * calories / macro_split::KCAL_PER_G_CARBS,
    )
}

/// Split a resolved day target into per-meal budgets
///
/// Base ratios: breakfast 0.25, lunch 0.40, dinner 0.35. With a snack the
/// snack takes 0.15 and lunch and dinner rescale by 0.8 so the day still
/// sums to one.
#[must_use]
pub fn split_day(day: &NutritionVector, include_snack: bool) -> DayBudget {
    let (lunch_ratio, dinner_ratio) = if include_snack {
        (
            ratios::LUNCH * ratios::SNACK_RESCALE,
            ratios::DINNER * ratios::SNACK_RESCALE,
        )
    } else {
        (ratios::LUNCH, ratios::DINNER)
    };

    DayBudget {
        breakfast: day.scale(ratios::BREAKFAST).rounded(),
        lunch: day.scale(lunch_ratio).rounded(),
        dinner: day.scale(dinner_ratio).rounded(),
        snack: include_snack.then(|| day.scale(ratios::SNACK).rounded()),
    }
}
