// ABOUTME: Short-lived LRU cache for generated meals keyed by quantized request shape
// ABOUTME: Nearby nutrition targets share a bucket so repeat requests skip the LLM
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! Meal response cache
//!
//! Keys quantize the nutrition target onto coarse steps (50 kcal, 5 g
//! protein, 2 g fat, 10 g carbs) and fold in the sorted preference and
//! allergy lists, the cuisine style, the day label and a wall-clock bucket
//! the width of the TTL. Two requests that land in the same bucket within
//! one TTL window serve the same validated dishes.
//!
//! Expiry is lazy: an entry past its deadline is dropped on the `get` that
//! finds it. There is no background sweeper; the LRU bound caps memory.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::CacheSettings;
use crate::constants::cache;
use crate::models::{Dish, MealType, NutritionVector, UserNutritionProfile};

/// Cache key derived from everything that shapes a generated meal
///
/// Construction sorts the preference and allergy lists so caller ordering
/// does not fragment the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MealCacheKey {
    meal_type: MealType,
    calorie_bucket: i64,
    protein_bucket: i64,
    fat_bucket: i64,
    carb_bucket: i64,
    preferences: Vec<String>,
    allergies: Vec<String>,
    cuisine: Option<String>,
    day_label: Option<String>,
    time_bucket: i64,
}

impl MealCacheKey {
    /// Build the key for one meal request
    ///
    /// `ttl` sets the width of the wall-clock bucket; pass the same value
    /// the cache was built with so keyed entries and entry expiry roll
    /// over together.
    #[must_use]
    pub fn from_request(
        meal_type: MealType,
        target: &NutritionVector,
        profile: &UserNutritionProfile,
        day_label: Option<&str>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let mut preferences = profile.preferences.clone();
        preferences.sort_unstable();
        let mut allergies = profile.allergies.clone();
        allergies.sort_unstable();

        let window = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);

        Self {
            meal_type,
            calorie_bucket: bucket(target.calories, cache::CALORIE_STEP),
            protein_bucket: bucket(target.protein, cache::PROTEIN_STEP),
            fat_bucket: bucket(target.fat, cache::FAT_STEP),
            carb_bucket: bucket(target.carbs, cache::CARBS_STEP),
            preferences,
            allergies,
            cuisine: profile.cuisine_style.clone(),
            day_label: day_label.map(ToOwned::to_owned),
            time_bucket: now.timestamp().div_euclid(window),
        }
    }
}

fn bucket(value: f64, step: f64) -> i64 {
    (value / step).floor() as i64
}

#[derive(Debug, Clone)]
struct CacheEntry {
    dishes: Vec<Dish>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheInfo {
    /// Live entries, including any not yet lazily expired
    pub entries: usize,
    /// Maximum entries before LRU eviction
    pub capacity: usize,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
}

/// Bounded in-memory cache mapping [`MealCacheKey`] to validated dishes
#[derive(Debug)]
pub struct MealCache {
    entries: RwLock<LruCache<MealCacheKey, CacheEntry>>,
    ttl: Duration,
}

impl MealCache {
    /// Create a cache sized and aged per `settings`
    #[must_use]
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity_of(settings.max_entries))),
            ttl: settings.ttl,
        }
    }

    /// TTL this cache was built with, for key construction
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch the dishes cached under `key`, dropping the entry if expired
    pub async fn get(&self, key: &MealCacheKey) -> Option<Vec<Dish>> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                debug!(slot = %key.meal_type, "meal cache hit");
                Some(entry.dishes.clone())
            }
            Some(_) => {
                entries.pop(key);
                debug!(slot = %key.meal_type, "meal cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Store a validated dish list; empty lists are never cached
    pub async fn put(&self, key: MealCacheKey, dishes: Vec<Dish>) {
        if dishes.is_empty() {
            return;
        }
        let entry = CacheEntry {
            dishes,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.put(key, entry);
    }

    /// Drop every entry, returning how many were held
    pub async fn purge(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }

    /// Snapshot of size and configuration
    pub async fn info(&self) -> CacheInfo {
        let entries = self.entries.read().await;
        CacheInfo {
            entries: entries.len(),
            capacity: entries.cap().get(),
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

fn capacity_of(max_entries: usize) -> NonZeroUsize {
    NonZeroUsize::new(max_entries)
        .or_else(|| NonZeroUsize::new(cache::MAX_ENTRIES))
        .unwrap_or(NonZeroUsize::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DishSource, Ingredient};

    const TTL: Duration = Duration::from_secs(300);

    fn settings(max_entries: usize) -> CacheSettings {
        CacheSettings {
            ttl: TTL,
            max_entries,
        }
    }

    fn profile_with(preferences: &[&str]) -> UserNutritionProfile {
        UserNutritionProfile {
            preferences: preferences.iter().map(|p| (*p).to_owned()).collect(),
            ..UserNutritionProfile::default()
        }
    }

    fn key_at(calories: f64, profile: &UserNutritionProfile, ts: i64) -> MealCacheKey {
        let target = NutritionVector::new(calories, 30.0, 12.0, 45.0);
        let now = DateTime::from_timestamp(ts, 0).unwrap();
        MealCacheKey::from_request(MealType::Lunch, &target, profile, Some("Thứ 2"), now, TTL)
    }

    fn dishes() -> Vec<Dish> {
        vec![Dish {
            name: "Cơm Gà Hội An".into(),
            description: "Cơm gà xé trộn rau răm".into(),
            ingredients: vec![Ingredient::new("gạo", "150g"), Ingredient::new("gà", "120g")],
            preparation: vec!["Luộc gà, nấu cơm bằng nước luộc".into()],
            nutrition: NutritionVector::new(520.0, 32.0, 14.0, 62.0),
            preparation_time: "45 phút".into(),
            health_benefits: "Giàu đạm nạc".into(),
            source: DishSource::Ai,
            is_traditional: false,
        }]
    }

    #[tokio::test]
    async fn test_nearby_targets_share_a_bucket() {
        let cache = MealCache::new(&settings(8));
        let profile = profile_with(&[]);

        cache.put(key_at(420.0, &profile, 1_750_000_000), dishes()).await;

        let hit = cache.get(&key_at(449.0, &profile, 1_750_000_000)).await;
        assert_eq!(hit.unwrap()[0].name, "Cơm Gà Hội An");
    }

    #[test]
    fn test_quantization_boundary_splits_keys() {
        let profile = profile_with(&[]);
        assert_eq!(
            key_at(449.0, &profile, 1_750_000_000),
            key_at(420.0, &profile, 1_750_000_000)
        );
        assert_ne!(
            key_at(451.0, &profile, 1_750_000_000),
            key_at(449.0, &profile, 1_750_000_000)
        );
    }

    #[test]
    fn test_preference_order_does_not_fragment() {
        let a = profile_with(&["cay", "hải sản"]);
        let b = profile_with(&["hải sản", "cay"]);
        assert_eq!(
            key_at(500.0, &a, 1_750_000_000),
            key_at(500.0, &b, 1_750_000_000)
        );
    }

    #[test]
    fn test_time_bucket_rolls_over() {
        let profile = profile_with(&[]);
        let base = 1_750_000_000_i64;
        let same_window = key_at(500.0, &profile, base + 1);
        let next_window = key_at(500.0, &profile, base + 301);
        assert_eq!(key_at(500.0, &profile, base), same_window);
        assert_ne!(key_at(500.0, &profile, base), next_window);
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped_on_get() {
        let cache = MealCache::new(&CacheSettings {
            ttl: Duration::ZERO,
            max_entries: 8,
        });
        let profile = profile_with(&[]);
        let key = MealCacheKey::from_request(
            MealType::Dinner,
            &NutritionVector::new(600.0, 35.0, 18.0, 70.0),
            &profile,
            None,
            DateTime::from_timestamp(1_750_000_000, 0).unwrap(),
            Duration::ZERO,
        );

        cache.put(key.clone(), dishes()).await;
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.info().await.entries, 0);
    }

    #[tokio::test]
    async fn test_lru_evicts_oldest() {
        let cache = MealCache::new(&settings(2));
        let profile = profile_with(&[]);
        let first = key_at(300.0, &profile, 1_750_000_000);
        let second = key_at(600.0, &profile, 1_750_000_000);
        let third = key_at(900.0, &profile, 1_750_000_000);

        cache.put(first.clone(), dishes()).await;
        cache.put(second.clone(), dishes()).await;
        cache.put(third.clone(), dishes()).await;

        assert!(cache.get(&first).await.is_none());
        assert!(cache.get(&second).await.is_some());
        assert!(cache.get(&third).await.is_some());
    }

    #[tokio::test]
    async fn test_purge_reports_and_empties() {
        let cache = MealCache::new(&settings(8));
        let profile = profile_with(&[]);
        cache.put(key_at(300.0, &profile, 1_750_000_000), dishes()).await;
        cache.put(key_at(600.0, &profile, 1_750_000_000), dishes()).await;

        assert_eq!(cache.purge().await, 2);
        assert_eq!(cache.info().await.entries, 0);
    }

    #[tokio::test]
    async fn test_empty_dish_list_is_not_cached() {
        let cache = MealCache::new(&settings(8));
        let profile = profile_with(&[]);
        let key = key_at(500.0, &profile, 1_750_000_000);

        cache.put(key.clone(), Vec::new()).await;
        assert!(cache.get(&key).await.is_none());
    }
}
