// Utility helpers for header/number cleanup and console formatting.
//
// This module centralizes the "dirty" text handling so the rest of the
// pipeline can assume canonical names and typed values.
use num_format::{Locale, ToFormattedString};

/// Canonicalize a raw header: trim, collapse every whitespace run (including
/// embedded newlines) to a single `_`, lower-case.
///
/// Idempotent: a canonical header maps to itself.
pub fn canonical_header(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (this also keeps
///   `NaN`/`inf` spellings out of the pipeline).
/// - Strips thousands separators, percent signs and inner spaces.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| *c != ',' && *c != '%' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a year cell. Spreadsheet exports sometimes write integers as
/// `2021.0`, so integral floats are accepted too.
pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    // `?` propagates `None` early if the option is missing.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<i32>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

/// Arithmetic mean over the present values; `None` when nothing is present.
pub fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with a fixed number of decimal places
    // and locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

/// Render a fraction as a percentage, `—` when absent.
pub fn format_pct(x: Option<f64>) -> String {
    match x {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "—".to_string(),
    }
}

// `display_with` hooks for the tabled row types.

pub fn display_cases(v: &f64) -> String {
    format_number(*v, 0)
}

pub fn display_rate(v: &f64) -> String {
    format_number(*v, 2)
}

pub fn display_opt_rate(v: &Option<f64>) -> String {
    v.map(|x| format_number(x, 1)).unwrap_or_else(|| "—".to_string())
}

pub fn display_opt_pct(v: &Option<f64>) -> String {
    format_pct(*v)
}
