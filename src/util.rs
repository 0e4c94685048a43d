// Utility helpers for parsing and formatting.
//
// All the forgiving number/date handling for the CSV sources lives here so
// the transformer can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+/\d+/\d+$").unwrap());

/// True for `M/D/YY`-style column headers such as `3/14/21`.
pub fn is_date_header(header: &str) -> bool {
    DATE_HEADER.is_match(header)
}

/// Parse a count, falling back to `0` for anything unreadable.
///
/// Decimal text is truncated toward zero (`"12.7"` -> `12`).
pub fn parse_count(s: &str) -> i64 {
    let s = s.trim();
    if s.is_empty() {
        return 0;
    }
    if let Ok(v) = s.parse::<i64>() {
        return v;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc() as i64,
        _ => 0,
    }
}

/// Parse a coordinate, falling back to `0.0`.
pub fn parse_coord(s: &str) -> f64 {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Convert an `M/D/YY` token into `YYYY-MM-DD`.
///
/// Two-digit years below 50 land in the 2000s, 50..=99 in the 1900s, and
/// four-digit years pass through. Anything that is not three `/`-separated
/// parts is returned unchanged.
pub fn format_date(raw: &str) -> String {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    if parts.len() != 3 {
        return raw.to_string();
    }
    let (month, day, year) = (parts[0], parts[1], parts[2]);
    let year = match year.parse::<u32>() {
        Ok(y) if y < 50 => y + 2000,
        Ok(y) if y < 100 => y + 1900,
        Ok(y) => y,
        Err(_) => return raw.to_string(),
    };
    format!("{}-{:0>2}-{:0>2}", year, month, day)
}

pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Round to two decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn average(v: &[f64]) -> f64 {
    // Returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
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
    n.to_formatted_string(&Locale::en)
}

/// Signed count with an explicit `+` for growth, e.g. `+1,204`.
pub fn format_delta(n: i64) -> String {
    if n > 0 {
        format!("+{}", format_int(n))
    } else {
        format_int(n)
    }
}
