//! Pure, total normalizers for raw field tokens.
//!
//! Every function here succeeds: unparsable input degrades to the raw
//! trimmed string (or null for explicit not-available markers), never to an
//! error. This keeps record creation unconditional — a bad cell costs one
//! field, not the record.

use crate::schema::{AreaUnit, FieldValue, NormalizerKind};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Outcome of normalizing one raw token.
///
/// `unparsed_date` is a side annotation: the record keeps the raw string,
/// the page counters surface that a date failed to parse.
pub struct Normalized {
    pub value: FieldValue,
    pub unparsed_date: bool,
}

impl Normalized {
    fn plain(value: FieldValue) -> Self {
        Self {
            value,
            unparsed_date: false,
        }
    }
}

/// Dispatch a raw token through the normalizer for its field kind.
pub fn apply(kind: NormalizerKind, raw: &str) -> Normalized {
    let cleaned = clean(raw);
    if is_not_available(&cleaned) {
        return Normalized::plain(FieldValue::Null);
    }
    match kind {
        NormalizerKind::Text => Normalized::plain(FieldValue::Text(cleaned)),
        NormalizerKind::Url => Normalized::plain(FieldValue::Url(cleaned)),
        NormalizerKind::Currency => Normalized::plain(normalize_currency(&cleaned)),
        NormalizerKind::Area => Normalized::plain(normalize_area(&cleaned)),
        NormalizerKind::Count => Normalized::plain(normalize_count(&cleaned)),
        NormalizerKind::Year => Normalized::plain(normalize_year(&cleaned)),
        NormalizerKind::Date => normalize_date(&cleaned),
    }
}

/// Collapse whitespace and strip leading/trailing separator punctuation.
pub fn clean(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| matches!(c, ':' | '-' | '#' | ',' | ';') || c.is_whitespace())
        .to_string()
}

/// Explicit not-available markers normalize to null rather than text.
fn is_not_available(cleaned: &str) -> bool {
    matches!(
        cleaned.to_ascii_lowercase().as_str(),
        "" | "n/a" | "na" | "none" | "--" | "$n/a"
    )
}

// ─── Currency ────────────────────────────────────────────────────────────────

fn number_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d.,]*").expect("number token regex is valid"))
}

/// First numeric token in the value span. Taking only the first token keeps
/// trailing noise (a parcel number, a second figure) out of the amount.
fn first_number_token(cleaned: &str) -> Option<&str> {
    number_token_regex().find(cleaned).map(|m| m.as_str())
}

/// Strip symbols and separators, handling both US (1,234.56) and European
/// (1.234,56) conventions. Falls back to the raw string.
fn normalize_currency(cleaned: &str) -> FieldValue {
    let Some(token) = first_number_token(cleaned) else {
        return FieldValue::Text(cleaned.to_string());
    };
    let digits = token.trim_end_matches(['.', ',']).to_string();

    let normalized = if digits.contains(',') && digits.contains('.') {
        // Both present: the last separator is the decimal point.
        if digits.rfind(',') > digits.rfind('.') {
            digits.replace('.', "").replace(',', ".")
        } else {
            digits.replace(',', "")
        }
    } else if digits.contains(',') {
        let after = digits.rsplit(',').next().unwrap_or("");
        if after.len() == 2 {
            digits.replace(',', ".")
        } else {
            digits.replace(',', "")
        }
    } else {
        digits
    };

    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => FieldValue::Money(v),
        _ => FieldValue::Text(cleaned.to_string()),
    }
}

// ─── Dates ───────────────────────────────────────────────────────────────────

const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
    "%m/%d/%y",
];

/// Canonicalize to a calendar date; unparsable input keeps the raw string
/// and raises the unparsed annotation.
fn normalize_date(cleaned: &str) -> Normalized {
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
            return Normalized::plain(FieldValue::Date(date));
        }
    }
    Normalized {
        value: FieldValue::Text(cleaned.to_string()),
        unparsed_date: true,
    }
}

// ─── Areas ───────────────────────────────────────────────────────────────────

fn area_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([\d,]+(?:\.\d+)?)\s*(sq\.?\s*ft\.?|sqft|square\s*feet|acres?|ac\b)?")
            .expect("area regex is valid")
    })
}

/// Numeric value plus a unit inferred from trailing label text. Bare
/// numbers default to square feet.
fn normalize_area(cleaned: &str) -> FieldValue {
    let Some(caps) = area_regex().captures(cleaned) else {
        return FieldValue::Text(cleaned.to_string());
    };
    let number = caps
        .get(1)
        .map(|m| m.as_str().replace(',', ""))
        .unwrap_or_default();
    let Ok(value) = number.parse::<f64>() else {
        return FieldValue::Text(cleaned.to_string());
    };
    let unit = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(u) if u.starts_with("ac") => AreaUnit::Acres,
        _ => AreaUnit::SquareFeet,
    };
    FieldValue::Area { value, unit }
}

// ─── Counts and years ────────────────────────────────────────────────────────

/// Integer-like count; fractional values ("2.5" bathrooms) preserved.
fn normalize_count(cleaned: &str) -> FieldValue {
    let token = first_number_token(cleaned)
        .map(|t| t.trim_end_matches(['.', ',']).replace(',', ""))
        .unwrap_or_default();
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => FieldValue::Count(v),
        _ => FieldValue::Text(cleaned.to_string()),
    }
}

/// Four-digit year within a plausible construction range.
fn normalize_year(cleaned: &str) -> FieldValue {
    let token = first_number_token(cleaned)
        .map(|t| t.trim_end_matches(['.', ',']))
        .unwrap_or_default();
    match token.parse::<i32>() {
        Ok(y) if (1600..=2100).contains(&y) => FieldValue::Year(y),
        _ => FieldValue::Text(cleaned.to_string()),
    }
}
