// ABOUTME: Plan orchestrator exposing week, day and single-meal generation
// ABOUTME: Normalizes day labels, splits budgets, and scopes diversity resets per operation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! # Plan Orchestrator
//!
//! The engine's public surface: [`generate_week`], [`generate_day`], and
//! [`replace_meal`], each taking the caller's nutrition target and profile
//! and delegating per-slot work to the meal assembler.
//!
//! Diversity scoping differs by operation. A week carries the tracker
//! across all seven days so the whole week stays varied. A standalone day
//! is a replacement for an existing day, so its slots are reset first and
//! the new day is unconstrained by the one it replaces. A single-meal
//! replacement resets its slot but re-notes the outgoing dishes, which is
//! what forces the replacement to actually differ.
//!
//! Day labels arrive as free text ("monday", "thu 2", "Thứ Hai") and are
//! normalized to the seven canonical Vietnamese labels; anything else is
//! rejected as `InvalidTarget` before any generation starts.

use tracing::{info, instrument};

use crate::assembler;
use crate::budget::{resolve_day_target, split_day, DayBudget};
use crate::constants::labels::DAYS_OF_WEEK;
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult};
use crate::models::{
    DayPlan, Meal, MealType, NutritionVector, UserNutritionProfile, WeeklyPlan,
};

/// Map a caller-supplied day name onto the canonical Vietnamese label
///
/// Accepts the canonical labels in any case, undiacritized variants,
/// spelled-out Vietnamese ordinals, and English day names.
#[must_use]
pub fn normalize_day_label(raw: &str) -> Option<&'static str> {
    let normalized = raw.trim().to_lowercase();
    let index = match normalized.as_str() {
        "thứ 2" | "thu 2" | "thứ hai" | "thu hai" | "monday" => 0,
        "thứ 3" | "thu 3" | "thứ ba" | "thu ba" | "tuesday" => 1,
        "thứ 4" | "thu 4" | "thứ tư" | "thu tu" | "wednesday" => 2,
        "thứ 5" | "thu 5" | "thứ năm" | "thu nam" | "thursday" => 3,
        "thứ 6" | "thu 6" | "thứ sáu" | "thu sau" | "friday" => 4,
        "thứ 7" | "thu 7" | "thứ bảy" | "thu bay" | "saturday" => 5,
        "chủ nhật" | "chu nhat" | "cn" | "sunday" => 6,
        _ => return None,
    };
    Some(DAYS_OF_WEEK[index])
}

/// Generate a full week of meal plans, `"Thứ 2"` through `"Chủ Nhật"`
///
/// The day target is resolved once and applied to every day; the diversity
/// tracker carries across days so dishes do not repeat within the week.
///
/// # Errors
///
/// `InvalidTarget` when the target or profile body metrics are invalid.
#[instrument(skip_all, fields(target_kcal = target.calories))]
pub async fn generate_week(
    ctx: &EngineContext,
    target: &NutritionVector,
    profile: &UserNutritionProfile,
) -> EngineResult<WeeklyPlan> {
    let day_target = resolve_day_target(target, profile)?;
    let budget = split_day(&day_target, profile.include_snack);

    let mut days = Vec::with_capacity(DAYS_OF_WEEK.len());
    for label in DAYS_OF_WEEK {
        let day = build_day(ctx, label, &budget, profile).await?;
        days.push(day);
    }

    let nutrition = NutritionVector::sum(days.iter().map(|d| d.nutrition));
    info!(week_kcal = nutrition.calories, "weekly plan assembled");
    Ok(WeeklyPlan { days, nutrition })
}

/// Generate one day of meals as a replacement for an existing day
///
/// Resets the diversity window for every slot being generated, then fills
/// breakfast, lunch, dinner, and the snack when the profile requests one.
///
/// # Errors
///
/// `InvalidTarget` for an unrecognized day label or an invalid target.
#[instrument(skip_all, fields(day = raw_label, target_kcal = target.calories))]
pub async fn generate_day(
    ctx: &EngineContext,
    raw_label: &str,
    target: &NutritionVector,
    profile: &UserNutritionProfile,
) -> EngineResult<DayPlan> {
    let label = parse_day_label(raw_label)?;
    let day_target = resolve_day_target(target, profile)?;
    let budget = split_day(&day_target, profile.include_snack);

    reset_generated_slots(ctx, &budget).await;
    build_day(ctx, label, &budget, profile).await
}

/// Replace a single meal within an existing day plan
///
/// The slot's diversity window is reset and the outgoing dishes are
/// re-noted, so the generated meal avoids them. The slot budget comes from
/// the same split the plan itself used.
///
/// # Errors
///
/// `InvalidTarget` for an unrecognized day label, an invalid target, or a
/// snack replacement when the plan has no snack.
#[instrument(skip_all, fields(day = raw_label, slot = %meal_type))]
pub async fn replace_meal(
    ctx: &EngineContext,
    plan: &DayPlan,
    raw_label: &str,
    meal_type: MealType,
    target: &NutritionVector,
    profile: &UserNutritionProfile,
) -> EngineResult<Meal> {
    let label = parse_day_label(raw_label)?;
    let day_target = resolve_day_target(target, profile)?;
    let with_snack = profile.include_snack || plan.snack.is_some();
    let budget = split_day(&day_target, with_snack);
    let slot_target = budget.slot(meal_type).ok_or_else(|| {
        EngineError::invalid_target("snack replacement requested for a plan without a snack")
    })?;

    ctx.tracker().reset(Some(meal_type)).await;
    if let Some(current) = plan_meal(plan, meal_type) {
        for dish in &current.dishes {
            ctx.tracker().note(meal_type, &dish.name).await;
        }
    }

    assembler::generate_meal(ctx, meal_type, &slot_target, profile, Some(label)).await
}

fn parse_day_label(raw: &str) -> EngineResult<&'static str> {
    normalize_day_label(raw)
        .ok_or_else(|| EngineError::invalid_target(format!("unknown day label: {raw}")))
}

/// Fill every slot of one day from its budget
async fn build_day(
    ctx: &EngineContext,
    label: &str,
    budget: &DayBudget,
    profile: &UserNutritionProfile,
) -> EngineResult<DayPlan> {
    let breakfast = assembler::generate_meal(
        ctx,
        MealType::Breakfast,
        &budget.breakfast,
        profile,
        Some(label),
    )
    .await?;
    let lunch =
        assembler::generate_meal(ctx, MealType::Lunch, &budget.lunch, profile, Some(label))
            .await?;
    let dinner =
        assembler::generate_meal(ctx, MealType::Dinner, &budget.dinner, profile, Some(label))
            .await?;
    let snack = match budget.snack {
        Some(snack_target) => Some(
            assembler::generate_meal(ctx, MealType::Snack, &snack_target, profile, Some(label))
                .await?,
        ),
        None => None,
    };

    let mut day = DayPlan {
        day_of_week: label.to_owned(),
        breakfast,
        lunch,
        dinner,
        snack,
        nutrition: NutritionVector::default(),
    };
    day.nutrition = day.aggregate();
    Ok(day)
}

/// Clear the diversity window for the slots a fresh day will fill
async fn reset_generated_slots(ctx: &EngineContext, budget: &DayBudget) {
    for meal_type in MealType::MAIN_MEALS {
        ctx.tracker().reset(Some(meal_type)).await;
    }
    if budget.snack.is_some() {
        ctx.tracker().reset(Some(MealType::Snack)).await;
    }
}

fn plan_meal(plan: &DayPlan, meal_type: MealType) -> Option<&Meal> {
    match meal_type {
        MealType::Breakfast => Some(&plan.breakfast),
        MealType::Lunch => Some(&plan.lunch),
        MealType::Dinner => Some(&plan.dinner),
        MealType::Snack => plan.snack.as_ref(),
    }
}
