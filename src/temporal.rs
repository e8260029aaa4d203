// 📅 Date Resolver - one registration date per record
//
// Two competing sources:
// 1. Year + Month + Day fragment columns (preferred)
// 2. A combined `Date` text column, day-before-month
//
// The choice is made ONCE for the whole batch. If fewer than 90% of rows fail
// to build a fragment date, every row uses its fragment result, including the
// rows that failed (they stay absent and do NOT fall back to `Date`).

use crate::error::Result;
use crate::normalize::parse_fragment;
use crate::pipeline::{RunContext, Stage};
use crate::record::{Record, COL_DATE, COL_DAY, COL_MONTH, COL_MONTH_NUMERIC, COL_YEAR};
use chrono::{Datelike, NaiveDate, NaiveTime};
use tracing::{debug, info};

/// Fragment result is accepted while the failure fraction stays below this
pub const FRAGMENT_FAILURE_LIMIT: f64 = 0.9;

/// Day-first layouts with a four-digit year, plus ISO year-first layouts
const FULL_YEAR_FORMATS: [&str; 5] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Day-first layouts with a two-digit year (00-68 → 20xx, 69-99 → 19xx)
const SHORT_YEAR_FORMATS: [&str; 3] = ["%d/%m/%y", "%d-%m-%y", "%d.%m.%y"];

const TIME_FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

/// Registration years outside this window count as parse failures
pub const MIN_REGISTER_YEAR: i32 = 1677;
pub const MAX_REGISTER_YEAR: i32 = 2262;

fn within_year_range(date: NaiveDate) -> Option<NaiveDate> {
    (MIN_REGISTER_YEAR..=MAX_REGISTER_YEAR)
        .contains(&date.year())
        .then_some(date)
}

// ============================================================================
// RESOLUTION RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMethod {
    /// Year/Month/Day columns, accepted batch-wide
    Fragments,
    /// `Date` text column, parsed per row
    DateText,
    /// No usable source; every date is absent
    Unavailable,
}

impl DateMethod {
    pub fn name(&self) -> &str {
        match self {
            DateMethod::Fragments => "fragments",
            DateMethod::DateText => "date_text",
            DateMethod::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateResolution {
    /// One entry per input record, same order
    pub dates: Vec<Option<NaiveDate>>,
    pub method: DateMethod,
}

impl DateResolution {
    pub fn missing_count(&self) -> usize {
        self.dates.iter().filter(|d| d.is_none()).count()
    }
}

// ============================================================================
// PARSERS
// ============================================================================

/// Month column used for fragments: `Month.1` wins over `Month`
///
/// Extracts carry a textual `Month` first and the numeric month second; the
/// reader suffixes the duplicate header as `Month.1`.
pub fn month_column(headers: &[String]) -> Option<&'static str> {
    if headers.iter().any(|h| h == COL_MONTH_NUMERIC) {
        Some(COL_MONTH_NUMERIC)
    } else if headers.iter().any(|h| h == COL_MONTH) {
        Some(COL_MONTH)
    } else {
        None
    }
}

/// Build a date from raw Year/Month/Day cells
pub fn date_from_fragments(
    year: Option<&str>,
    month: Option<&str>,
    day: Option<&str>,
) -> Option<NaiveDate> {
    let year = i32::try_from(parse_fragment(year)?).ok()?;
    let month = u32::try_from(parse_fragment(month)?).ok()?;
    let day = u32::try_from(parse_fragment(day)?).ok()?;

    NaiveDate::from_ymd_opt(year, month, day).and_then(within_year_range)
}

/// Parse combined date text, day before month
///
/// A trailing time (`HH:MM`, `HH:MM:SS`, space or `T` separated) is accepted
/// and discarded.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (date_part, time_part) = match text.find(|c: char| c == ' ' || c == 'T') {
        Some(pos) => (&text[..pos], Some(text[pos + 1..].trim())),
        None => (text, None),
    };

    if let Some(time) = time_part {
        let time_ok = TIME_FORMATS
            .iter()
            .any(|fmt| NaiveTime::parse_from_str(time, fmt).is_ok());
        if !time_ok {
            return None;
        }
    }

    // chrono's %Y happily reads "24" as year 24, so pick formats by year width
    let parts: Vec<&str> = date_part
        .split(|c: char| c == '/' || c == '-' || c == '.')
        .collect();
    let year_first = parts.first().map(|p| p.len() > 2).unwrap_or(false);
    let short_year = !year_first && parts.len() == 3 && parts[2].len() == 2;

    let formats: &[&str] = if short_year {
        &SHORT_YEAR_FORMATS
    } else {
        &FULL_YEAR_FORMATS
    };

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .and_then(within_year_range)
}

// ============================================================================
// BATCH RESOLUTION
// ============================================================================

/// Resolve registration dates for a whole batch
///
/// `headers` is the merged header list; column presence is a batch-level
/// property, not a per-row one.
pub fn resolve_registration_date(records: &[Record], headers: &[String]) -> DateResolution {
    if records.is_empty() {
        return DateResolution {
            dates: Vec::new(),
            method: DateMethod::Unavailable,
        };
    }

    let has = |column: &str| headers.iter().any(|h| h == column);

    // Tier 1: fragments
    if has(COL_YEAR) && has(COL_DAY) {
        if let Some(month_col) = month_column(headers) {
            let dates: Vec<Option<NaiveDate>> = records
                .iter()
                .map(|r| date_from_fragments(r.cell(COL_YEAR), r.cell(month_col), r.cell(COL_DAY)))
                .collect();

            let failed = dates.iter().filter(|d| d.is_none()).count();
            let failure_rate = failed as f64 / dates.len() as f64;

            debug!(
                month_column = month_col,
                failed,
                total = dates.len(),
                failure_rate,
                "Fragment date attempt"
            );

            if failure_rate < FRAGMENT_FAILURE_LIMIT {
                return DateResolution {
                    dates,
                    method: DateMethod::Fragments,
                };
            }
        }
    }

    // Tier 2: combined text
    if has(COL_DATE) {
        let dates = records
            .iter()
            .map(|r| r.cell(COL_DATE).and_then(parse_date_text))
            .collect();

        return DateResolution {
            dates,
            method: DateMethod::DateText,
        };
    }

    DateResolution {
        dates: vec![None; records.len()],
        method: DateMethod::Unavailable,
    }
}

// ============================================================================
// STAGE
// ============================================================================

/// Fills `register_date` for every record
pub struct DateResolver;

impl Stage for DateResolver {
    fn name(&self) -> &str {
        "date_resolver"
    }

    fn apply(&self, mut records: Vec<Record>, ctx: &RunContext) -> Result<Vec<Record>> {
        let resolution = resolve_registration_date(&records, &ctx.headers);

        info!(
            method = resolution.method.name(),
            missing = resolution.missing_count(),
            total = records.len(),
            "Resolved registration dates"
        );

        for (record, date) in records.iter_mut().zip(resolution.dates) {
            record.register_date = date;
        }

        Ok(records)
    }
}

// ============================================================================
// TESTS
// ============================================================================
