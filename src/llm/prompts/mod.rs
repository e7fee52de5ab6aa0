// ABOUTME: Builds the Vietnamese meal-generation prompt from budget, profile, and history
// ABOUTME: Embeds the JSON-only output directive loaded at compile time from markdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! # Meal Prompt Builder
//!
//! Assembles the single user-message string sent to the provider for one
//! meal. The message carries the meal slot in Vietnamese, the nutrition
//! quadruple to hit, the user's preferences and allergies, a do-not-repeat
//! block built from recently served dishes, a goal-conditioned instruction,
//! and the JSON-only directive with a complete example object.
//!
//! Every build ends with a random session token so that retries with the
//! same inputs never produce a byte-identical prompt.

use rand::Rng;
use std::fmt::Write as _;

use crate::models::{Goal, MealType, NutritionVector, UserNutritionProfile};

/// JSON-only output directive with the full example object, compile-time
/// loaded so prompt edits never touch Rust code.
pub const JSON_DIRECTIVE: &str = include_str!("json_directive.md");

/// Inputs for one meal prompt
#[derive(Debug, Clone, Copy)]
pub struct MealPromptRequest<'a> {
    /// Meal slot being generated
    pub meal_type: MealType,
    /// Nutrition quadruple the dishes should sum to
    pub target: &'a NutritionVector,
    /// User profile supplying preferences, allergies, and goal
    pub profile: &'a UserNutritionProfile,
    /// Canonical names of recently served dishes for this slot
    pub avoid: &'a [String],
    /// Day label such as "Thứ 2" when generating a full week
    pub day_label: Option<&'a str>,
}

/// Builds the user-message string for one meal generation attempt.
#[must_use]
pub fn build_meal_prompt(request: &MealPromptRequest<'_>) -> String {
    let mut prompt = String::with_capacity(JSON_DIRECTIVE.len() + 512);

    let _ = writeln!(
        prompt,
        "Hãy tạo thực đơn {} cho một người Việt Nam.",
        request.meal_type.label_vi()
    );
    if let Some(day) = request.day_label {
        let _ = writeln!(prompt, "Ngày trong tuần: {day}.");
    }

    let _ = writeln!(
        prompt,
        "\nChỉ tiêu dinh dưỡng cho {}: {:.0} kcal, {:.0}g đạm, {:.0}g chất béo, {:.0}g tinh bột.",
        request.meal_type.label_vi(),
        request.target.calories,
        request.target.protein,
        request.target.fat,
        request.target.carbs
    );

    append_profile_lines(&mut prompt, request.profile);
    append_avoid_block(&mut prompt, request.avoid);
    append_goal_clause(&mut prompt, request.profile.goal);

    prompt.push('\n');
    prompt.push_str(JSON_DIRECTIVE);

    // Sampling nonce so retried prompts never collide in provider-side caches.
    let nonce: u32 = rand::thread_rng().gen();
    let _ = write!(prompt, "\nMã phiên: {nonce}");

    prompt
}

fn append_profile_lines(prompt: &mut String, profile: &UserNutritionProfile) {
    if !profile.preferences.is_empty() {
        let _ = writeln!(prompt, "Sở thích: {}.", profile.preferences.join(", "));
    }
    if !profile.allergies.is_empty() {
        let _ = writeln!(
            prompt,
            "Dị ứng (tuyệt đối không dùng nguyên liệu nào chứa): {}.",
            profile.allergies.join(", ")
        );
    }
    if !profile.diet_restrictions.is_empty() {
        let _ = writeln!(
            prompt,
            "Chế độ ăn: {}.",
            profile.diet_restrictions.join(", ")
        );
    }
    if !profile.health_conditions.is_empty() {
        let _ = writeln!(
            prompt,
            "Tình trạng sức khỏe cần lưu ý: {}.",
            profile.health_conditions.join(", ")
        );
    }
    if let Some(style) = profile
        .cuisine_style
        .as_deref()
        .filter(|style| !style.trim().is_empty())
    {
        let _ = writeln!(prompt, "Phong cách ẩm thực ưa thích: {style}.");
    }
}

fn append_avoid_block(prompt: &mut String, avoid: &[String]) {
    if avoid.is_empty() {
        return;
    }
    let _ = writeln!(
        prompt,
        "\nCác món đã dùng gần đây, KHÔNG lặp lại và không tạo biến thể của chúng:"
    );
    for name in avoid {
        let _ = writeln!(prompt, "- {name}");
    }
}

fn append_goal_clause(prompt: &mut String, goal: Option<Goal>) {
    let clause = match goal {
        Some(Goal::Lose) => {
            "Mục tiêu giảm cân: ưu tiên món nhiều chất xơ, giàu đạm, ít calo, hạn chế chiên rán."
        }
        Some(Goal::Gain) => {
            "Mục tiêu tăng cân: ưu tiên món giàu năng lượng và đạm, khẩu phần đầy đặn."
        }
        Some(Goal::Maintain) | None => {
            "Mục tiêu duy trì cân nặng: cân bằng các nhóm chất, khẩu phần vừa phải."
        }
    };
    let _ = writeln!(prompt, "{clause}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> UserNutritionProfile {
        UserNutritionProfile {
            goal: Some(Goal::Lose),
            preferences: vec!["món nước".to_owned()],
            allergies: vec!["tôm".to_owned(), "cua".to_owned()],
            cuisine_style: Some("miền Bắc".to_owned()),
            ..UserNutritionProfile::default()
        }
    }

    #[test]
    fn prompt_carries_slot_target_and_profile() {
        let target = NutritionVector::new(500.0, 38.0, 14.0, 56.0);
        let profile = sample_profile();
        let prompt = build_meal_prompt(&MealPromptRequest {
            meal_type: MealType::Breakfast,
            target: &target,
            profile: &profile,
            avoid: &[],
            day_label: None,
        });

        assert!(prompt.contains("bữa sáng"));
        assert!(prompt.contains("500 kcal"));
        assert!(prompt.contains("38g đạm"));
        assert!(prompt.contains("tôm, cua"));
        assert!(prompt.contains("miền Bắc"));
        assert!(prompt.contains("giảm cân"));
        assert!(prompt.contains("Mã phiên:"));
    }

    #[test]
    fn prompt_embeds_json_directive_with_schema_keys() {
        let target = NutritionVector::new(700.0, 50.0, 19.0, 79.0);
        let profile = UserNutritionProfile::default();
        let prompt = build_meal_prompt(&MealPromptRequest {
            meal_type: MealType::Dinner,
            target: &target,
            profile: &profile,
            avoid: &[],
            day_label: None,
        });

        for key in [
            "\"name\"",
            "\"description\"",
            "\"ingredients\"",
            "\"preparation\"",
            "\"nutrition\"",
            "\"preparation_time\"",
            "\"health_benefits\"",
        ] {
            assert!(prompt.contains(key), "directive is missing {key}");
        }
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn avoid_block_lists_recent_dishes() {
        let target = NutritionVector::new(800.0, 60.0, 22.0, 90.0);
        let profile = UserNutritionProfile::default();
        let avoid = vec!["phở gà".to_owned(), "bún chả".to_owned()];
        let prompt = build_meal_prompt(&MealPromptRequest {
            meal_type: MealType::Lunch,
            target: &target,
            profile: &profile,
            avoid: &avoid,
            day_label: Some("Thứ 5"),
        });

        assert!(prompt.contains("KHÔNG lặp lại"));
        assert!(prompt.contains("- phở gà"));
        assert!(prompt.contains("- bún chả"));
        assert!(prompt.contains("Thứ 5"));
    }

    #[test]
    fn avoid_block_absent_without_history() {
        let target = NutritionVector::new(300.0, 23.0, 8.0, 34.0);
        let profile = UserNutritionProfile::default();
        let prompt = build_meal_prompt(&MealPromptRequest {
            meal_type: MealType::Snack,
            target: &target,
            profile: &profile,
            avoid: &[],
            day_label: None,
        });
        assert!(!prompt.contains("KHÔNG lặp lại"));
        assert!(prompt.contains("bữa phụ"));
    }
}
