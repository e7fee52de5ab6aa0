// ABOUTME: Diversity tracker rejecting near-duplicate dishes across recent history
// ABOUTME: Canonical-name similarity via folding, substring and Jaccard rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! # Diversity Tracker
//!
//! Keeps a bounded FIFO of recently served dish names per meal slot and
//! answers "is this candidate too close to something we already served".
//! Names are canonicalized (lowercase, regional suffixes stripped,
//! whitespace collapsed) before storage; comparisons additionally fold
//! Vietnamese diacritics so "Pho Ga" and "Phở Gà" collide.

use std::collections::{HashMap, HashSet, VecDeque};

use tokio::sync::Mutex;

use crate::config::DiversitySettings;
use crate::constants::diversity;
use crate::models::MealType;

/// Canonical form of a dish name: lowercase, regional suffixes stripped,
/// whitespace collapsed. Diacritics are kept so prompt text stays readable.
#[must_use]
pub fn canonicalize(name: &str) -> String {
    let mut canonical = name.trim().to_lowercase();
    loop {
        let before = canonical.clone();
        for suffix in diversity::REGIONAL_SUFFIXES {
            if let Some(stripped) = canonical.strip_suffix(suffix) {
                canonical = stripped.trim_end().to_owned();
            }
        }
        if canonical == before {
            break;
        }
    }
    canonical.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fold Vietnamese diacritics to their base letters
fn fold_diacritics(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'à' | 'á' | 'ạ' | 'ả' | 'ã' | 'â' | 'ầ' | 'ấ' | 'ậ' | 'ẩ' | 'ẫ' | 'ă' | 'ằ'
            | 'ắ' | 'ặ' | 'ẳ' | 'ẵ' => 'a',
            'è' | 'é' | 'ẹ' | 'ẻ' | 'ẽ' | 'ê' | 'ề' | 'ế' | 'ệ' | 'ể' | 'ễ' => 'e',
            'ì' | 'í' | 'ị' | 'ỉ' | 'ĩ' => 'i',
            'ò' | 'ó' | 'ọ' | 'ỏ' | 'õ' | 'ô' | 'ồ' | 'ố' | 'ộ' | 'ổ' | 'ỗ' | 'ơ' | 'ờ'
            | 'ớ' | 'ợ' | 'ở' | 'ỡ' => 'o',
            'ù' | 'ú' | 'ụ' | 'ủ' | 'ũ' | 'ư' | 'ừ' | 'ứ' | 'ự' | 'ử' | 'ữ' => 'u',
            'ỳ' | 'ý' | 'ỵ' | 'ỷ' | 'ỹ' => 'y',
            'đ' => 'd',
            other => other,
        })
        .collect()
}

/// Similarity between two dish names, raw or canonical
///
/// Both names are canonicalized and diacritic-folded first. True when the
/// folded forms are equal, one contains the other and the shorter has at
/// least four tokens, or Jaccard similarity over token sets reaches 0.70.
#[must_use]
pub fn names_similar(a: &str, b: &str) -> bool {
    let a = fold_diacritics(&canonicalize(a));
    let b = fold_diacritics(&canonicalize(b));
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }

    let a_tokens: Vec<&str> = a.split_whitespace().collect();
    let b_tokens: Vec<&str> = b.split_whitespace().collect();
    let shorter_len = a_tokens.len().min(b_tokens.len());
    if shorter_len >= diversity::SUBSTRING_MIN_TOKENS && (a.contains(&b) || b.contains(&a)) {
        return true;
    }

    let a_set: HashSet<&str> = a_tokens.iter().copied().collect();
    let b_set: HashSet<&str> = b_tokens.iter().copied().collect();
    let intersection = a_set.intersection(&b_set).count();
    let union = a_set.union(&b_set).count();
    if union == 0 {
        return false;
    }
    (intersection as f64 / union as f64) >= diversity::JACCARD_THRESHOLD
}

/// Bounded per-slot history of recently served dishes
///
/// Shared process-wide within one engine context, so a week's generation
/// sees its own earlier days.
// TODO: key the history per user once the engine serves concurrent users
// from a single context instead of a context per request.
#[derive(Debug)]
pub struct DiversityTracker {
    window: usize,
    recent: Mutex<HashMap<MealType, VecDeque<String>>>,
}

impl DiversityTracker {
    /// Tracker with the configured window per meal slot
    #[must_use]
    pub fn new(settings: DiversitySettings) -> Self {
        Self {
            window: settings.recent_window.max(1),
            recent: Mutex::new(HashMap::new()),
        }
    }

    /// Record an accepted dish unless it duplicates the window
    ///
    /// Returns whether the name was added.
    pub async fn note(&self, meal_type: MealType, dish_name: &str) -> bool {
        let canonical = canonicalize(dish_name);
        if canonical.is_empty() {
            return false;
        }
        let mut recent = self.recent.lock().await;
        let window = recent.entry(meal_type).or_default();
        if window.iter().any(|held| names_similar(held, &canonical)) {
            return false;
        }
        window.push_back(canonical);
        while window.len() > self.window {
            window.pop_front();
        }
        true
    }

    /// Last `n` canonical names for a slot, oldest first
    pub async fn recent(&self, meal_type: MealType, n: usize) -> Vec<String> {
        let recent = self.recent.lock().await;
        recent.get(&meal_type).map_or_else(Vec::new, |window| {
            let skip = window.len().saturating_sub(n);
            window.iter().skip(skip).cloned().collect()
        })
    }

    /// Whether a candidate collides with the slot's window
    pub async fn is_similar(&self, candidate: &str, meal_type: MealType) -> bool {
        let canonical = canonicalize(candidate);
        let recent = self.recent.lock().await;
        recent.get(&meal_type).is_some_and(|window| {
            window.iter().any(|held| names_similar(held, &canonical))
        })
    }

    /// Forget one slot's history, or everything
    pub async fn reset(&self, meal_type: Option<MealType>) {
        let mut recent = self.recent.lock().await;
        match meal_type {
            Some(meal_type) => {
                recent.remove(&meal_type);
            }
            None => recent.clear(),
        }
    }
}
