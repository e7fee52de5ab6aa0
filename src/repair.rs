// ABOUTME: Recovery pipeline for malformed LLM payloads, escalating through parse strategies
// ABOUTME: until at least one candidate dish object with a usable name is obtained
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ngon Nutrition

//! JSON extraction and repair for raw model output.
//!
//! Model responses are supposed to be a JSON array of dish objects, but in
//! practice they arrive wrapped in markdown fences, prefixed with prose,
//! single-quoted, or syntactically broken. [`extract_dishes`] runs four
//! strategies in order and stops at the first one that parses and yields at
//! least one object with a non-empty string `name`:
//!
//! 1. direct parse after stripping fences and leading prose
//! 2. regex extraction of the longest array-of-objects substring
//! 3. bracket slice plus textual repairs
//! 4. dish-name inference from Vietnamese keywords in free text
//!
//! Everything here is pure string rewriting plus `serde_json` parsing. No
//! strategy ever executes or evaluates model output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Longest span that looks like a JSON array of objects, greedy.
static ARRAY_OF_OBJECTS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.*\}\s*\]").ok());

/// Lazy variant used when the greedy span fails to parse.
static ARRAY_OF_OBJECTS_LAZY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").ok());

/// Single-quoted key or value, converted to double quotes during repair.
static SINGLE_QUOTED: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"'([^']*)'").ok());

/// Bare (unquoted) object key directly after `{` or `,`.
static BARE_KEY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"([,{]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").ok());

/// Object opening with a bare string literal instead of a `"name":` pair.
static LEADING_BARE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"\{\s*"([^"]+)"\s*,"#).ok());

/// Array literal serialized as a quoted string with escaped inner quotes.
static QUOTED_ARRAY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""\[(?:[^"\\]|\\.)*\]""#).ok());

/// Trailing comma before a closing brace or bracket.
static TRAILING_COMMA: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").ok());

/// Dish-name span starting with a common Vietnamese dish keyword.
///
/// Captures the keyword plus up to four following capitalized words, which
/// covers names like "Phở Gà Hà Nội" appearing inside refusal prose.
static DISH_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?:Phở|Bún|Cơm|Bánh|Cháo|Chả|Gỏi|Canh|Miến|Xôi|Súp|Mì|Hủ\s+Tiếu)(?:\s+\p{Lu}\p{L}*){0,4}",
    )
    .ok()
});

/// Shape check for a candidate dish: an object whose `name` is a non-empty
/// string. Anything weaker is useless to the validator downstream.
#[must_use]
pub fn has_usable_name(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|obj| obj.get("name"))
        .and_then(Value::as_str)
        .is_some_and(|name| !name.trim().is_empty())
}

/// Extracts candidate dish objects from raw model output.
///
/// Returns `None` when every strategy fails, which the caller treats the same
/// as an LLM failure. On success the returned list may still contain objects
/// that fail validation; the validator drops those individually.
#[must_use]
pub fn extract_dishes(raw: &str) -> Option<Vec<Value>> {
    if raw.trim().is_empty() {
        return None;
    }

    if let Some(dishes) = direct_parse(raw) {
        debug!(strategy = "direct", count = dishes.len(), "extracted dishes");
        return Some(dishes);
    }
    if let Some(dishes) = regex_extract(raw) {
        debug!(strategy = "regex", count = dishes.len(), "extracted dishes");
        return Some(dishes);
    }
    if let Some(dishes) = bracket_slice_repair(raw) {
        debug!(
            strategy = "bracket_repair",
            count = dishes.len(),
            "extracted dishes"
        );
        return Some(dishes);
    }
    if let Some(dishes) = infer_from_text(raw) {
        debug!(
            strategy = "text_inference",
            count = dishes.len(),
            "inferred dishes from prose"
        );
        return Some(dishes);
    }

    debug!(length = raw.len(), "all extraction strategies failed");
    None
}

/// Applies the textual repairs from strategy 3 to a JSON-ish fragment.
///
/// Idempotent: repairing already-repaired text is a no-op, so a second pass
/// never changes the result.
#[must_use]
pub fn repair_json_text(fragment: &str) -> String {
    let mut text = fragment.to_owned();

    if let Some(re) = SINGLE_QUOTED.as_ref() {
        text = re.replace_all(&text, "\"$1\"").into_owned();
    }
    if let Some(re) = BARE_KEY.as_ref() {
        text = re.replace_all(&text, "$1\"$2\":").into_owned();
    }
    if let Some(re) = LEADING_BARE_NAME.as_ref() {
        text = re.replace_all(&text, "{\"name\":\"$1\",").into_owned();
    }
    if let Some(re) = QUOTED_ARRAY.as_ref() {
        text = re
            .replace_all(&text, |caps: &regex::Captures<'_>| {
                let quoted = &caps[0];
                quoted[1..quoted.len() - 1].replace("\\\"", "\"")
            })
            .into_owned();
    }
    if let Some(re) = TRAILING_COMMA.as_ref() {
        text = re.replace_all(&text, "$1").into_owned();
    }

    text
}

/// Strategy 1: strip whitespace, markdown fences, and leading prose, then
/// parse the remainder directly.
fn direct_parse(raw: &str) -> Option<Vec<Value>> {
    let stripped = strip_wrapping(raw);
    parse_candidates(&stripped)
}

/// Strategy 2: pull the longest array-of-objects span out of the text and
/// parse it as-is, falling back to the shortest span when the greedy one is
/// broken by trailing garbage.
fn regex_extract(raw: &str) -> Option<Vec<Value>> {
    for pattern in [ARRAY_OF_OBJECTS.as_ref(), ARRAY_OF_OBJECTS_LAZY.as_ref()] {
        let Some(re) = pattern else { continue };
        for matched in re.find_iter(raw) {
            if let Some(dishes) = parse_candidates(matched.as_str()) {
                return Some(dishes);
            }
        }
    }
    None
}

/// Strategy 3: slice from the first `[` to the last `]`, run the repair
/// rewrites, and parse the result.
fn bracket_slice_repair(raw: &str) -> Option<Vec<Value>> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end <= start {
        return None;
    }
    let repaired = repair_json_text(&raw[start..=end]);
    parse_candidates(&repaired)
}

/// Strategy 4: the payload is prose, not JSON. Scan it for Vietnamese dish
/// keywords and synthesize skeletal objects carrying only a name; the
/// validator fills in every other field.
fn infer_from_text(raw: &str) -> Option<Vec<Value>> {
    let re = DISH_NAME.as_ref()?;
    let mut seen = Vec::new();
    let mut dishes = Vec::new();

    for matched in re.find_iter(raw) {
        let name = matched.as_str().trim();
        let folded = name.to_lowercase();
        if seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        dishes.push(serde_json::json!({ "name": name }));
        if dishes.len() >= 3 {
            break;
        }
    }

    if dishes.is_empty() { None } else { Some(dishes) }
}

/// Removes markdown fences and any prose before the first JSON delimiter.
fn strip_wrapping(raw: &str) -> String {
    let mut text = raw.trim();

    // Fenced block: keep only the fence body. The language tag after the
    // opening fence is discarded with the rest of its line.
    if let Some(open) = text.find("```") {
        let after_fence = &text[open + 3..];
        let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
        let body = &after_fence[body_start..];
        text = body.find("```").map_or(body, |close| &body[..close]).trim();
    }

    // Leading prose: drop everything before the first array or object open.
    let json_start = text
        .char_indices()
        .find(|(_, c)| *c == '[' || *c == '{')
        .map(|(i, _)| i);
    match json_start {
        Some(i) => text[i..].to_owned(),
        None => text.to_owned(),
    }
}

/// Parses a fragment and normalizes it into a list of candidate objects,
/// requiring at least one to pass the shape check.
fn parse_candidates(fragment: &str) -> Option<Vec<Value>> {
    let parsed: Value = serde_json::from_str(fragment.trim()).ok()?;
    let candidates = match parsed {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => return None,
    };
    if candidates.iter().any(has_usable_name) {
        Some(candidates)
    } else {
        None
    }
}
