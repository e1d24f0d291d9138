use std::sync::LazyLock;

use regex::Regex;

use crate::grid::Cell;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?$").unwrap());

const ERROR_TOKENS: &[&str] = &[
    "#REF!", "#VALUE!", "#DIV/0!", "#N/A", "#NULL!", "#NUM!", "#NAME?", "#SPILL!", "#CALC!",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₫', '₹'];

/// Spreadsheet error token such as `#REF!` or `#DIV/0!`.
pub fn is_error_marker(cell: &Cell) -> bool {
    cell.as_text().is_some_and(is_error_text)
}

fn is_error_text(text: &str) -> bool {
    let upper = text.trim().to_uppercase();
    upper.starts_with('#') && ERROR_TOKENS.iter().any(|tok| upper.starts_with(tok))
}

/// Finite number carried by a cell, if any.
///
/// Text is cleaned of currency symbols, thousands separators and whitespace
/// before parsing; `(1.50)` reads as `-1.50`.
pub fn extract_numeric(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => n.is_finite().then_some(*n),
        Cell::Text(t) => parse_numeric_text(t),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

fn parse_numeric_text(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_error_text(trimmed) {
        return None;
    }

    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let mut cleaned: String = body
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();
    let upper = cleaned.to_uppercase();
    if let Some(rest) = upper.strip_prefix("USD").or_else(|| upper.strip_suffix("USD")) {
        cleaned = rest.to_string();
    }

    if !NUMBER_RE.is_match(&cleaned) {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Canonical decimal string for a cell, or `fallback` when it carries no number.
pub fn normalize_to_decimal_string(cell: &Cell, fallback: &str) -> String {
    extract_numeric(cell)
        .map(canonical_decimal)
        .unwrap_or_else(|| fallback.to_string())
}

/// Format a derived value such as `time * cost_per_minute`.
pub fn format_computed_value(value: f64) -> String {
    canonical_decimal(value)
}

/// Four decimal places at most, trailing zeros trimmed down to two.
pub fn canonical_decimal(value: f64) -> String {
    if !value.is_finite() {
        return "0.00".to_string();
    }
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        return "0.00".to_string();
    }
    let mut s = format!("{:.4}", rounded);
    while s.ends_with('0') && s.len() - s.find('.').unwrap_or(s.len()) > 3 {
        s.pop();
    }
    s
}

/// Upper-cased label key with whitespace removed and any `:`-suffix dropped,
/// so `Style No. :` and `STYLE NO.` compare equal.
pub fn label_key(text: &str) -> String {
    let head = text.split(':').next().unwrap_or_default();
    head.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

pub fn starts_with_currency(text: &str) -> bool {
    text.trim_start()
        .chars()
        .next()
        .is_some_and(|c| CURRENCY_SYMBOLS.contains(&c))
}
