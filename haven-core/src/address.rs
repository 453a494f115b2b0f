//! Postal address normalization.
//!
//! Shelter addresses are stored in the short form OpenStreetMap geocoding
//! resolves best: no city prefix, abbreviated street type, no house prefix.

use once_cell::sync::Lazy;
use regex::Regex;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

fn rule(pattern: &str, replacement: &'static str) -> Option<Rule> {
    Regex::new(pattern).ok().map(|pattern| Rule {
        pattern,
        replacement,
    })
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    [
        rule(r"(?i)(^|,\s*)г(?:\.\s*|\s+)", "${1}"),
        rule(r"(?i)улица\s", "ул. "),
        rule(r"(?i)ул\s", "ул. "),
        rule(r"(?i),\s*(?:дом|д\.?)\s*(\d)", ", ${1}"),
        rule(r",\s*,", ","),
        rule(r",\s*$", ""),
        rule(r"^\s*,\s*", ""),
        rule(r"\s{2,}", " "),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// Normalize a free-form address.
pub fn normalize_address(address: &str) -> String {
    let mut current = address.to_string();
    for rule in RULES.iter() {
        current = rule
            .pattern
            .replace_all(&current, rule.replacement)
            .into_owned();
    }
    current.trim().to_string()
}
