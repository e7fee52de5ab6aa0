// ABOUTME: Per-100g macro profiles for common Vietnamese ingredients
// ABOUTME: Estimates dish nutrition from ingredient lines with parseable weights
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! Ingredient-level nutrition estimation
//!
//! When a generated dish arrives without usable nutrition, its ingredient
//! lines are matched against this table and summed by weight. Matching is
//! substring-based with longest-key precedence, so "ớt chuông" resolves to
//! bell pepper before plain chili. Unmatched lines and non-weight amounts
//! ("2 quả") contribute nothing.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Ingredient, NutritionVector};

/// `[calories, protein, fat, carbs]` per 100 g (or 100 ml for liquids)
type MacroRow = [f64; 4];

/// Macro profiles for ingredients the curated dishes and typical LLM output
/// mention. Keys are lowercase Vietnamese; values are per-100 g.
const PER_100G: &[(&str, MacroRow)] = &[
    // noodles, rice, bread
    ("bánh phở", [110.0, 1.8, 0.2, 25.0]),
    ("hủ tiếu", [110.0, 1.8, 0.2, 25.0]),
    ("bánh canh", [120.0, 2.0, 0.3, 27.0]),
    ("mì quảng", [130.0, 3.0, 1.0, 26.0]),
    ("mì", [138.0, 4.5, 2.1, 25.0]),
    ("miến", [86.0, 0.1, 0.0, 21.0]),
    ("bún", [110.0, 1.7, 0.2, 25.0]),
    ("bánh mì", [265.0, 9.0, 3.2, 49.0]),
    ("bánh tráng", [330.0, 5.0, 0.5, 78.0]),
    ("bột gạo", [360.0, 6.0, 1.0, 80.0]),
    ("bột năng", [350.0, 0.1, 0.0, 86.0]),
    ("cơm tấm", [130.0, 2.7, 0.3, 28.0]),
    ("cơm", [130.0, 2.7, 0.3, 28.0]),
    ("gạo lứt", [123.0, 2.7, 1.0, 26.0]),
    ("gạo nếp", [370.0, 6.8, 0.6, 81.0]),
    ("gạo", [365.0, 7.0, 0.7, 80.0]),
    ("khoai lang", [86.0, 1.6, 0.1, 20.0]),
    ("quẩy", [390.0, 8.0, 20.0, 45.0]),
    // meat, fish, eggs, tofu
    ("thịt ba chỉ", [290.0, 21.0, 22.0, 0.0]),
    ("thịt bò", [250.0, 26.0, 15.0, 0.0]),
    ("bò", [250.0, 26.0, 15.0, 0.0]),
    ("ức gà", [165.0, 31.0, 3.6, 0.0]),
    ("thịt gà", [200.0, 27.0, 10.0, 0.0]),
    ("gà", [200.0, 27.0, 10.0, 0.0]),
    ("thịt heo", [242.0, 27.0, 14.0, 0.0]),
    ("thịt lợn", [242.0, 27.0, 14.0, 0.0]),
    ("sườn heo", [290.0, 17.0, 24.0, 0.0]),
    ("giò heo", [230.0, 20.0, 16.0, 0.0]),
    ("giò lụa", [250.0, 15.0, 20.0, 3.0]),
    ("chả lụa", [250.0, 15.0, 20.0, 3.0]),
    ("chả viên", [250.0, 15.0, 20.0, 3.0]),
    ("chả giò", [250.0, 8.0, 15.0, 22.0]),
    ("chả cá", [170.0, 16.0, 8.0, 6.0]),
    ("lạp xưởng", [400.0, 16.0, 35.0, 6.0]),
    ("gan heo", [134.0, 21.0, 4.0, 2.5]),
    ("trứng cút", [158.0, 13.0, 11.0, 0.4]),
    ("trứng", [155.0, 13.0, 11.0, 1.1]),
    ("cá lóc", [105.0, 20.0, 2.5, 0.0]),
    ("cá basa", [158.0, 15.0, 10.0, 0.0]),
    ("cá diêu hồng", [128.0, 21.0, 4.5, 0.0]),
    ("cá", [130.0, 22.0, 4.0, 0.0]),
    ("tôm khô", [250.0, 55.0, 2.0, 1.0]),
    ("tôm", [99.0, 24.0, 0.3, 0.2]),
    ("mực", [92.0, 16.0, 1.4, 3.0]),
    ("riêu cua", [97.0, 19.0, 1.5, 0.0]),
    ("cua", [97.0, 19.0, 1.5, 0.0]),
    ("đậu hũ", [76.0, 8.0, 4.8, 1.9]),
    ("đậu phụ", [76.0, 8.0, 4.8, 1.9]),
    // vegetables, herbs, fruit
    ("rau muống", [19.0, 2.6, 0.2, 3.1]),
    ("rau ngót", [35.0, 5.3, 0.0, 7.0]),
    ("mồng tơi", [20.0, 2.0, 0.2, 3.4]),
    ("rau", [25.0, 2.0, 0.3, 4.0]),
    ("xà lách", [15.0, 1.4, 0.2, 2.9]),
    ("bắp cải", [25.0, 1.3, 0.1, 5.8]),
    ("bông cải xanh", [34.0, 2.8, 0.4, 6.6]),
    ("cà rốt", [41.0, 0.9, 0.2, 10.0]),
    ("cà chua", [18.0, 0.9, 0.2, 3.9]),
    ("dưa leo", [15.0, 0.7, 0.1, 3.6]),
    ("khổ qua", [17.0, 1.0, 0.2, 3.7]),
    ("bí đỏ", [26.0, 1.0, 0.1, 6.5]),
    ("đậu bắp", [33.0, 1.9, 0.2, 7.5]),
    ("giá đỗ", [30.0, 3.0, 0.2, 5.9]),
    ("mộc nhĩ", [25.0, 2.6, 0.2, 5.0]),
    ("nấm", [22.0, 3.1, 0.3, 3.3]),
    ("hành phi", [450.0, 3.0, 30.0, 45.0]),
    ("hành tây", [40.0, 1.1, 0.1, 9.3]),
    ("hành", [32.0, 1.8, 0.2, 7.0]),
    ("ngô non", [26.0, 2.0, 0.3, 5.0]),
    ("bắp ngô", [96.0, 3.4, 1.5, 21.0]),
    ("ngô", [96.0, 3.4, 1.5, 21.0]),
    ("thơm", [50.0, 0.5, 0.1, 13.0]),
    ("dứa", [50.0, 0.5, 0.1, 13.0]),
    ("me", [239.0, 2.8, 0.6, 63.0]),
    ("sả", [99.0, 1.8, 0.5, 25.0]),
    ("gừng", [80.0, 1.8, 0.8, 18.0]),
    ("tỏi", [149.0, 6.4, 0.5, 33.0]),
    ("ớt chuông", [26.0, 1.0, 0.3, 6.0]),
    ("ớt", [40.0, 1.9, 0.4, 9.0]),
    ("cần tây", [16.0, 0.7, 0.2, 3.0]),
    ("chuối", [89.0, 1.1, 0.3, 23.0]),
    ("xoài", [60.0, 0.8, 0.4, 15.0]),
    ("dưa hấu", [30.0, 0.6, 0.2, 7.6]),
    ("thanh long", [60.0, 1.2, 0.0, 13.0]),
    ("bơ", [160.0, 2.0, 15.0, 9.0]),
    // legumes, seeds, dairy, condiments
    ("đậu xanh", [347.0, 24.0, 1.2, 63.0]),
    ("đậu phộng", [567.0, 26.0, 49.0, 16.0]),
    ("đậu hà lan", [81.0, 5.4, 0.4, 14.0]),
    ("lạc", [567.0, 26.0, 49.0, 16.0]),
    ("hạt chia", [486.0, 17.0, 31.0, 42.0]),
    ("muối mè", [550.0, 18.0, 48.0, 20.0]),
    ("dầu ô liu", [884.0, 0.0, 100.0, 0.0]),
    ("dầu ăn", [884.0, 0.0, 100.0, 0.0]),
    ("mỡ hành", [600.0, 1.0, 60.0, 8.0]),
    ("nước cốt dừa", [230.0, 2.3, 24.0, 6.0]),
    ("nước dừa", [19.0, 0.7, 0.2, 3.7]),
    ("dừa nạo", [354.0, 3.3, 33.0, 15.0]),
    ("sữa chua", [61.0, 3.5, 3.3, 4.7]),
    ("sữa tươi", [61.0, 3.2, 3.3, 4.8]),
    ("sữa đặc", [321.0, 7.9, 8.7, 54.0]),
    ("đường", [387.0, 0.0, 0.0, 100.0]),
    ("mật ong", [304.0, 0.3, 0.0, 82.0]),
    ("mắm ruốc", [90.0, 14.0, 1.0, 6.0]),
    ("nước mắm", [35.0, 5.0, 0.0, 4.0]),
    ("nước tương", [53.0, 8.0, 0.6, 4.9]),
    ("nước chấm", [60.0, 3.0, 0.5, 11.0]),
    ("nước dùng", [15.0, 1.5, 0.5, 0.5]),
    ("nước luộc", [15.0, 1.5, 0.5, 0.5]),
];

/// Weight-style amount: a number followed by a mass or volume unit.
/// Volume units are treated as grams, close enough for broths and milk.
static AMOUNT_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:[.,]\d+)?)\s*(kg|gr|gam|gram|g|ml|l)\b").ok()
});

/// Parse an amount string into grams, `None` when it carries no usable unit
#[must_use]
pub fn parse_amount_grams(amount: &str) -> Option<f64> {
    let pattern = AMOUNT_PATTERN.as_ref()?;
    let captures = pattern.captures(amount)?;
    let quantity: f64 = captures
        .get(1)?
        .as_str()
        .replace(',', ".")
        .parse()
        .ok()?;
    let factor = match captures.get(2)?.as_str().to_lowercase().as_str() {
        "kg" | "l" => 1000.0,
        _ => 1.0,
    };
    Some(quantity * factor)
}

/// Macro profile for an ingredient name, longest table key wins
fn profile_for(name: &str) -> Option<MacroRow> {
    let needle = name.trim().to_lowercase();
    let mut best: Option<(&str, MacroRow)> = None;
    for (key, row) in PER_100G {
        if needle.contains(key) {
            let better = best.is_none_or(|(held, _)| key.chars().count() > held.chars().count());
            if better {
                best = Some((key, *row));
            }
        }
    }
    best.map(|(_, row)| row)
}

/// Estimate a dish's nutrition from its ingredient lines
///
/// Returns `None` when no line both parses to a weight and matches the
/// table; the caller then falls through to its defaults.
#[must_use]
pub fn estimate_nutrition(ingredients: &[Ingredient]) -> Option<NutritionVector> {
    let mut total = NutritionVector::default();
    let mut matched = false;

    for ingredient in ingredients {
        let Some(grams) = parse_amount_grams(&ingredient.amount) else {
            continue;
        };
        let Some([calories, protein, fat, carbs]) = profile_for(&ingredient.name) else {
            continue;
        };
        let portion = grams / 100.0;
        total.calories += calories * portion;
        total.protein += protein * portion;
        total.fat += fat * portion;
        total.carbs += carbs * portion;
        matched = true;
    }

    matched.then(|| total.rounded())
}
