//! WASM bindings for fait-scheduling.
//!
//! Exposes slot resolution and rule validation to the booking front end via
//! `wasm-bindgen`. All complex types cross the boundary as JSON strings.
//!
//! The JSON-level functions live in plain Rust (`*_json`) so they can be
//! exercised natively; the `#[wasm_bindgen]` exports only translate errors
//! into `JsValue`.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p fait-scheduling-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir web/src/wasm/ \
//!   target/wasm32-unknown-unknown/release/fait_scheduling_wasm.wasm
//! ```

use chrono::NaiveDate;
use fait_scheduling::{
    flatten_slots, resolve_with_exclusions, DateRangeAvailabilityRule, RecurringAvailabilityRule,
};
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_json<T: DeserializeOwned>(what: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    s.parse()
        .map_err(|e| format!("Invalid date '{}': {}", s, e))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

/// Shared argument decoding for the two resolve exports.
fn resolve_inputs(
    provider_id: &str,
    recurring_json: &str,
    ranged_json: &str,
    window_start: &str,
    window_days: u32,
    increment_minutes: u32,
    excluded_json: Option<&str>,
) -> Result<Vec<fait_scheduling::DaySlots>, String> {
    let recurring: Vec<RecurringAvailabilityRule> = parse_json("recurring rules", recurring_json)?;
    let ranged: Vec<DateRangeAvailabilityRule> = parse_json("ranged rules", ranged_json)?;
    let start = parse_date(window_start)?;
    let excluded: Vec<NaiveDate> = match excluded_json {
        Some(json) => parse_json("excluded dates", json)?,
        None => Vec::new(),
    };

    Ok(resolve_with_exclusions(
        provider_id,
        start,
        window_days,
        &recurring,
        &ranged,
        increment_minutes,
        &excluded,
    ))
}

// ---------------------------------------------------------------------------
// JSON-level API
// ---------------------------------------------------------------------------

/// Resolve slots and return a JSON array of `{date, times}` objects.
///
/// `recurring_json` and `ranged_json` are JSON arrays of rules in the store's
/// row shape. `excluded_json`, when given, is a JSON array of ISO dates.
pub fn resolve_slots_json(
    provider_id: &str,
    recurring_json: &str,
    ranged_json: &str,
    window_start: &str,
    window_days: u32,
    increment_minutes: u32,
    excluded_json: Option<&str>,
) -> Result<String, String> {
    let days = resolve_inputs(
        provider_id,
        recurring_json,
        ranged_json,
        window_start,
        window_days,
        increment_minutes,
        excluded_json,
    )?;
    to_json(&days)
}

/// Like [`resolve_slots_json`] but returns one `{date, time, duration_minutes}`
/// object per slot.
pub fn flatten_slots_json(
    provider_id: &str,
    recurring_json: &str,
    ranged_json: &str,
    window_start: &str,
    window_days: u32,
    increment_minutes: u32,
    excluded_json: Option<&str>,
) -> Result<String, String> {
    let days = resolve_inputs(
        provider_id,
        recurring_json,
        ranged_json,
        window_start,
        window_days,
        increment_minutes,
        excluded_json,
    )?;
    to_json(&flatten_slots(&days, increment_minutes))
}

/// Validate one rule. `kind` is `"recurring"` or `"ranged"`.
pub fn validate_rule_json(kind: &str, rule_json: &str) -> Result<(), String> {
    match kind {
        "recurring" => parse_json::<RecurringAvailabilityRule>("rule", rule_json)?
            .validate()
            .map_err(|e| e.to_string()),
        "ranged" => parse_json::<DateRangeAvailabilityRule>("rule", rule_json)?
            .validate()
            .map_err(|e| e.to_string()),
        other => Err(format!(
            "Unknown rule kind '{}', expected 'recurring' or 'ranged'",
            other
        )),
    }
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

#[wasm_bindgen(js_name = "resolveSlots")]
pub fn resolve_slots(
    provider_id: &str,
    recurring_json: &str,
    ranged_json: &str,
    window_start: &str,
    window_days: u32,
    increment_minutes: u32,
    excluded_json: Option<String>,
) -> Result<String, JsValue> {
    resolve_slots_json(
        provider_id,
        recurring_json,
        ranged_json,
        window_start,
        window_days,
        increment_minutes,
        excluded_json.as_deref(),
    )
    .map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen(js_name = "flattenSlots")]
pub fn flatten_slots_js(
    provider_id: &str,
    recurring_json: &str,
    ranged_json: &str,
    window_start: &str,
    window_days: u32,
    increment_minutes: u32,
    excluded_json: Option<String>,
) -> Result<String, JsValue> {
    flatten_slots_json(
        provider_id,
        recurring_json,
        ranged_json,
        window_start,
        window_days,
        increment_minutes,
        excluded_json.as_deref(),
    )
    .map_err(|e| JsValue::from_str(&e))
}

/// Throws with a human-readable message when the rule is invalid.
#[wasm_bindgen(js_name = "validateRule")]
pub fn validate_rule(kind: &str, rule_json: &str) -> Result<(), JsValue> {
    validate_rule_json(kind, rule_json).map_err(|e| JsValue::from_str(&e))
}
