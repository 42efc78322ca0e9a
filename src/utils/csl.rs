//! Comma separated list helpers.

use once_cell::sync::Lazy;
use regex::Regex;

static NUMERIC_CSL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(,\d+)*$|^$").expect("numeric csl pattern is valid"));

static STRING_CSL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s,]+(,[^\s,]+)*$|^$").expect("string csl pattern is valid"));

/// Whether `input` is a list of non-negative integers separated by commas.
/// The empty string is a valid (empty) list.
pub fn validate_numeric_csl(input: &str) -> bool {
    NUMERIC_CSL.is_match(input)
}

/// Whether `input` is a list of whitespace-free items separated by commas.
pub fn validate_string_csl(input: &str) -> bool {
    STRING_CSL.is_match(input)
}

/// Splits a validated numeric list. Returns `None` when validation fails or an
/// item does not fit in a `u64`.
pub fn numeric_csl_to_vec(input: &str) -> Option<Vec<u64>> {
    if !validate_numeric_csl(input) {
        return None;
    }
    if input.is_empty() {
        return Some(Vec::new());
    }
    input.split(',').map(|item| item.parse().ok()).collect()
}

/// Splits a validated string list.
pub fn string_csl_to_vec(input: &str) -> Option<Vec<String>> {
    if !validate_string_csl(input) {
        return None;
    }
    if input.is_empty() {
        return Some(Vec::new());
    }
    Some(input.split(',').map(str::to_string).collect())
}
