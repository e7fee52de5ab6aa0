// ABOUTME: Engine constants with domain-separated organization
// ABOUTME: Meal ratios, calorie floors, retry policy, limiter ceilings, diversity tuning
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! Constants module
//!
//! Tunable values grouped by domain. The similarity thresholds and the
//! regional-suffix list are deliberately constants rather than configuration:
//! they are engine tuning, not API contract.

/// Per-meal calorie ratios applied to the day target
pub mod ratios {
    /// Breakfast share of the day target
    pub const BREAKFAST: f64 = 0.25;
    /// Lunch share of the day target
    pub const LUNCH: f64 = 0.40;
    /// Dinner share of the day target
    pub const DINNER: f64 = 0.35;
    /// Snack share of the day target, when a snack is requested
    pub const SNACK: f64 = 0.15;
    /// Lunch/dinner rescale factor when a snack is present, so the day sums to 1.0
    pub const SNACK_RESCALE: f64 = 0.8;
}

/// Goal-conditioned calorie adjustment derived from TDEE
pub mod goal_adjustment {
    /// Daily deficit for a weight-loss goal (kcal)
    pub const LOSE_DELTA: f64 = -500.0;
    /// Daily surplus for a weight-gain goal (kcal)
    pub const GAIN_DELTA: f64 = 300.0;
    /// Lower clamp on a derived day target (kcal)
    pub const MIN_DAY_CALORIES: f64 = 1200.0;
    /// Upper clamp on a derived day target (kcal)
    pub const MAX_DAY_CALORIES: f64 = 4000.0;
}

/// Macro split used when deriving a day target from calories alone
pub mod macro_split {
    /// Protein share of calories
    pub const PROTEIN_PCT: f64 = 0.30;
    /// Fat share of calories
    pub const FAT_PCT: f64 = 0.25;
    /// Carbohydrate share of calories
    pub const CARBS_PCT: f64 = 0.45;
    /// Energy density of protein (kcal per gram)
    pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
    /// Energy density of fat (kcal per gram)
    pub const KCAL_PER_G_FAT: f64 = 9.0;
    /// Energy density of carbohydrate (kcal per gram)
    pub const KCAL_PER_G_CARBS: f64 = 4.0;
}

/// Mifflin-St Jeor BMR coefficients and activity multipliers
pub mod tdee {
    /// Weight coefficient (kcal per kg)
    pub const MSJ_WEIGHT_COEF: f64 = 10.0;
    /// Height coefficient (kcal per cm)
    pub const MSJ_HEIGHT_COEF: f64 = 6.25;
    /// Age coefficient (kcal per year)
    pub const MSJ_AGE_COEF: f64 = -5.0;
    /// Additive offset for men
    pub const MSJ_MALE_OFFSET: f64 = 5.0;
    /// Additive offset for women
    pub const MSJ_FEMALE_OFFSET: f64 = -161.0;

    /// Activity multiplier: little or no exercise
    pub const FACTOR_SEDENTARY: f64 = 1.2;
    /// Activity multiplier: 1-3 sessions per week
    pub const FACTOR_LIGHT: f64 = 1.375;
    /// Activity multiplier: 3-5 sessions per week
    pub const FACTOR_MODERATE: f64 = 1.55;
    /// Activity multiplier: 6-7 sessions per week
    pub const FACTOR_VERY: f64 = 1.725;
    /// Activity multiplier: hard training twice daily
    pub const FACTOR_EXTRA: f64 = 1.9;

    /// Plausible weight range accepted by the derivation (kg)
    pub const WEIGHT_RANGE_KG: (f64, f64) = (0.0, 300.0);
    /// Plausible height range accepted by the derivation (cm)
    pub const HEIGHT_RANGE_CM: (f64, f64) = (0.0, 250.0);
    /// Plausible age range accepted by the derivation (years)
    pub const AGE_RANGE: (u32, u32) = (10, 120);
}

/// Per-meal calorie floors and supplement policy
pub mod floors {
    /// Breakfast floor (kcal)
    pub const BREAKFAST: f64 = 250.0;
    /// Lunch floor (kcal)
    pub const LUNCH: f64 = 400.0;
    /// Dinner floor (kcal)
    pub const DINNER: f64 = 400.0;
    /// Snack floor (kcal)
    pub const SNACK: f64 = 150.0;
    /// Below this a candidate dish is scaled up toward the meal-type floor (kcal)
    pub const SCALE_TRIGGER: f64 = 200.0;
    /// A meal must reach this share of its calorie target before supplements stop
    pub const MEAL_TARGET_RATIO: f64 = 0.90;
    /// Ceiling on supplementary dishes appended to one meal
    pub const MAX_SUPPLEMENTS: usize = 3;
}

/// Retry policy for dish generation attempts
pub mod retry {
    /// Maximum generation attempts per meal
    pub const MAX_ATTEMPTS: u32 = 5;
    /// Temperature for the first attempt
    pub const BASE_TEMPERATURE: f32 = 0.7;
    /// Temperature increase per attempt
    pub const TEMPERATURE_STEP: f32 = 0.05;
    /// Highest temperature the perturbation may reach
    pub const MAX_TEMPERATURE: f32 = 1.2;
    /// Top-p for the first attempt
    pub const BASE_TOP_P: f32 = 0.95;
    /// Top-p decrease per attempt
    pub const TOP_P_STEP: f32 = 0.05;
    /// Lowest top-p the perturbation may reach
    pub const MIN_TOP_P: f32 = 0.5;
    /// Exponential backoff base between attempts (seconds); attempt `i`
    /// pauses `base * 2^i`
    pub const BACKOFF_BASE_SECS: u64 = 1;
    /// Wall-clock budget for one meal generation (seconds)
    pub const MEAL_BUDGET_SECS: u64 = 180;
    /// Transport budget for one completion call (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;
    /// Connect timeout for the provider transport (seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
    /// Token ceiling requested per completion
    pub const MAX_TOKENS: u32 = 2048;
}

/// Request ceilings for the provider limiter
pub mod limits {
    /// Completions allowed per rolling minute
    pub const RATE_PER_MINUTE: u32 = 60;
    /// Completions allowed per rolling day
    pub const RATE_PER_DAY: u32 = 1000;
    /// Minute window length (seconds)
    pub const MINUTE_WINDOW_SECS: i64 = 60;
    /// Day window length (seconds)
    pub const DAY_WINDOW_SECS: i64 = 86_400;
    /// Jitter added to a denial's wait hint (seconds, inclusive bounds)
    pub const DENIAL_JITTER_SECS: (u64, u64) = (1, 5);

    /// Quota-flag lifetime when the provider gives no reset hint
    pub const QUOTA_DEFAULT_RESET_SECS: i64 = 3600;
}

/// Diversity tracking tuning
pub mod diversity {
    /// Recent-dish window per meal type
    pub const RECENT_WINDOW: usize = 30;
    /// Token-set Jaccard similarity at or above which two names are duplicates
    pub const JACCARD_THRESHOLD: f64 = 0.70;
    /// Substring containment counts only when the shorter name has this many tokens
    pub const SUBSTRING_MIN_TOKENS: usize = 4;
    /// Prompt block lists this many recent dishes to avoid
    pub const AVOID_LIST_LEN: usize = 10;

    /// Regional and marketing suffixes stripped before comparison
    pub const REGIONAL_SUFFIXES: &[&str] = &[
        "miền tây",
        "sài gòn",
        "hà nội",
        "nha trang",
        "huế",
        "miền bắc",
        "miền nam",
        "đặc biệt",
        "truyền thống",
    ];
}

/// Meal cache tuning
pub mod cache {
    /// Entry time-to-live (seconds); also the reuse-window bucket length
    pub const TTL_SECS: u64 = 300;
    /// Calorie quantization step for the cache key (kcal)
    pub const CALORIE_STEP: f64 = 50.0;
    /// Protein quantization step (g)
    pub const PROTEIN_STEP: f64 = 5.0;
    /// Fat quantization step (g)
    pub const FAT_STEP: f64 = 2.0;
    /// Carbohydrate quantization step (g)
    pub const CARBS_STEP: f64 = 10.0;
    /// Bounded entry count before LRU eviction
    pub const MAX_ENTRIES: usize = 512;
}

/// Canonical labels emitted and accepted by the plan operations
pub mod labels {
    /// The seven day labels in plan order, Monday first
    pub const DAYS_OF_WEEK: [&str; 7] = [
        "Thứ 2",
        "Thứ 3",
        "Thứ 4",
        "Thứ 5",
        "Thứ 6",
        "Thứ 7",
        "Chủ Nhật",
    ];
}

/// Linear nutrition scaling bounds for fallback dishes
pub mod scale {
    /// Smallest factor a dish may be shrunk by
    pub const MIN_FACTOR: f64 = 0.5;
    /// Largest factor a dish may be grown by
    pub const MAX_FACTOR: f64 = 2.0;
}

/// Defaults injected by the validator for absent dish fields
pub mod dish_defaults {
    /// Calories when a candidate carries no usable nutrition (kcal)
    pub const CALORIES: f64 = 400.0;
    /// Protein default (g)
    pub const PROTEIN: f64 = 20.0;
    /// Fat default (g)
    pub const FAT: f64 = 15.0;
    /// Carbohydrate default (g)
    pub const CARBS: f64 = 45.0;
    /// Ingredient amount when only a name is known
    pub const INGREDIENT_AMOUNT: &str = "100g";
    /// Placeholder ingredient for an empty list
    pub const INGREDIENT_NAME: &str = "Nguyên liệu chính";
    /// Preparation time default
    pub const PREPARATION_TIME: &str = "30 phút";
    /// Minimum calories an ingredient-table estimate must reach before the
    /// validator adopts it in place of the flat defaults
    pub const ESTIMATE_MIN_CALORIES: f64 = 50.0;
}

/// Model preference order for the provider, best first
pub mod models {
    /// Candidates probed at initialization; the first reachable one wins
    pub const PREFERENCE_ORDER: [&str; 3] =
        ["gpt-4o", "gpt-4o-mini", "llama-3.3-70b-versatile"];
}

/// Environment variable names consumed by `EngineConfig::from_env`
pub mod env_vars {
    /// Bearer token for the LLM provider
    pub const LLM_API_KEY: &str = "LLM_API_KEY";
    /// Chat-completions endpoint base URL
    pub const LLM_BASE_URL: &str = "LLM_BASE_URL";
    /// Explicit model override, skips preference probing
    pub const LLM_MODEL: &str = "LLM_MODEL";
    /// Completions allowed per minute
    pub const RATE_PER_MINUTE: &str = "RATE_PER_MINUTE";
    /// Completions allowed per day
    pub const RATE_PER_DAY: &str = "RATE_PER_DAY";
    /// Meal cache TTL in seconds
    pub const CACHE_TTL_SECONDS: &str = "CACHE_TTL_SECONDS";
    /// Recent-dish window per meal type
    pub const RECENT_WINDOW: &str = "RECENT_WINDOW";
    /// Breakfast calorie floor
    pub const CALORIE_FLOOR_BREAKFAST: &str = "CALORIE_FLOOR_BREAKFAST";
    /// Lunch calorie floor
    pub const CALORIE_FLOOR_LUNCH: &str = "CALORIE_FLOOR_LUNCH";
    /// Dinner calorie floor
    pub const CALORIE_FLOOR_DINNER: &str = "CALORIE_FLOOR_DINNER";
    /// Snack calorie floor
    pub const CALORIE_FLOOR_SNACK: &str = "CALORIE_FLOOR_SNACK";
}
