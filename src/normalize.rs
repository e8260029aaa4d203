// 📞 Field Normalizer - canonical phone and date-fragment forms
// Pure helpers plus the stage that fills Mobile_norm.

use crate::error::Result;
use crate::pipeline::{RunContext, Stage};
use crate::record::Record;

/// Digits-only phone, possibly empty
///
/// - absent → ""
/// - trailing ".0" from numeric spreadsheet cells is removed once
/// - every non-digit character is removed
///
/// No length check here; the fake-score engine owns validity.
pub fn normalize_phone(raw: Option<&str>) -> String {
    let raw = match raw {
        Some(r) => r.trim(),
        None => return String::new(),
    };

    let raw = raw.strip_suffix(".0").unwrap_or(raw);

    // ASCII only: non-ASCII digits (fullwidth, Arabic-Indic) are dropped,
    // so `mobile_norm.len()` is the digit count the phone rules compare
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parse a Year/Month/Day cell into an integer
///
/// Accepts integral numbers written as ints or floats ("7", "2024.0").
/// Fractional, non-numeric or non-finite values are rejected.
pub fn parse_fragment(raw: Option<&str>) -> Option<i64> {
    let text = raw?.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }

    let value = text.parse::<f64>().ok()?;
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < i64::MIN as f64 || value > i64::MAX as f64 {
        return None;
    }

    Some(value as i64)
}

// ============================================================================
// STAGE
// ============================================================================

/// Fills `mobile_norm` for every record
pub struct PhoneNormalizer;

impl Stage for PhoneNormalizer {
    fn name(&self) -> &str {
        "phone_normalizer"
    }

    fn apply(&self, records: Vec<Record>, _ctx: &RunContext) -> Result<Vec<Record>> {
        Ok(records
            .into_iter()
            .map(|mut record| {
                record.mobile_norm = normalize_phone(record.mobile());
                record
            })
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================
