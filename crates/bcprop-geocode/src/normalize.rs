use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static TRAILING_BC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),?\s*\bbc$").expect("valid bc regex"));
static TRAILING_PROVINCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),?\s*\bbritish columbia$").expect("valid province regex"));

/// Canonical form of a free-text address.
///
/// Trims, collapses internal whitespace, and rewrites a trailing `bc` or
/// `british columbia` (with or without a comma) to `, BC`.
#[must_use]
pub fn normalize_address(address: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(address.trim(), " ");
    let with_bc = TRAILING_BC_RE.replace(&collapsed, ", BC");
    TRAILING_PROVINCE_RE.replace(&with_bc, ", BC").into_owned()
}

/// Key under which a geocoded address is cached.
#[must_use]
pub fn cache_key(address: &str) -> String {
    format!("geocode:{}", normalize_address(address).to_lowercase())
}
