use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::warn;

use crate::models::CellValue;

/// Median at or below this value means a percentage column is on the 0–1
/// fractional scale and must be multiplied by 100. Slightly above 1.0 to
/// tolerate rounding artifacts like 1.02 in otherwise-fractional data.
const FRACTION_SCALE_CUTOFF: f64 = 1.05;

// ── PercentNormalizer ─────────────────────────────────────────────────────────

/// Normalizes a percentage column onto the 0–100 scale.
///
/// Spreadsheets export percentages as fractions (`0.95`), whole numbers
/// (`95`) or text (`"95%"`). The scale decision is made once for the whole
/// column from the median of the coerced values, never per cell, so a column
/// cannot end up on two scales at once.
pub struct PercentNormalizer;

impl PercentNormalizer {
    /// Coerce every cell and rescale the column if its median says the data
    /// is fractional. Cells that fail coercion come back as `None`.
    pub fn normalize(cells: &[CellValue]) -> Vec<Option<f64>> {
        let values: Vec<Option<f64>> = cells.iter().map(Self::coerce).collect();

        let median = match median(values.iter().filter_map(|v| *v)) {
            Some(m) => m,
            None => return values,
        };

        if median <= FRACTION_SCALE_CUTOFF {
            values.into_iter().map(|v| v.map(|x| x * 100.0)).collect()
        } else {
            values
        }
    }

    /// Single-cell coercion: strip a trailing `%` and surrounding whitespace
    /// from text before the numeric parse. Non-finite parses (`"nan"`) are
    /// missing, same as [`CellValue::as_number`].
    fn coerce(cell: &CellValue) -> Option<f64> {
        match cell {
            CellValue::Text(s) => s
                .trim()
                .trim_end_matches('%')
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite()),
            other => other.as_number(),
        }
    }
}

// ── DateNormalizer ────────────────────────────────────────────────────────────

/// Free-form patterns tried in order when no explicit format is given.
/// Date-time patterns come first so `"2023-01-15 09:30:00"` is not cut short
/// by a date-only match failure. Month-first slash dates are tried before
/// day-first, so an ambiguous `"01/02/2023"` resolves to January 2nd, the
/// dashboard's parsing convention; callers wanting day-first pass an
/// explicit format hint.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

/// Compact year-month-day encoding, e.g. `"20230115"`.
const COMPACT_FORMAT: &str = "%Y%m%d";

/// Parses a date column into calendar dates.
///
/// Strategy is chosen once for the whole column:
/// 1. all non-blank values are exactly 8 digits → parse uniformly as
///    `%Y%m%d`, regardless of any caller hint;
/// 2. a non-empty caller hint → parse every value with that format;
/// 3. otherwise best-effort parsing over [`DATE_FORMATS`] plus RFC 3339.
pub struct DateNormalizer;

impl DateNormalizer {
    /// Parse every cell under the chosen strategy. Failures come back as
    /// `None`; deciding whether an all-`None` column is fatal is the
    /// caller's job.
    pub fn normalize(cells: &[CellValue], format_hint: Option<&str>) -> Vec<Option<NaiveDate>> {
        let texts: Vec<Option<String>> = cells.iter().map(|c| c.as_text()).collect();

        let compact = Regex::new(r"^\d{8}$").expect("regex is valid");
        let non_blank: Vec<&str> = texts.iter().flatten().map(|s| s.as_str()).collect();
        let all_compact =
            !non_blank.is_empty() && non_blank.iter().all(|s| compact.is_match(s));

        let hint = format_hint.map(str::trim).filter(|h| !h.is_empty());

        let parsed: Vec<Option<NaiveDate>> = texts
            .iter()
            .map(|text| {
                let s = text.as_deref()?;
                if all_compact {
                    NaiveDate::parse_from_str(s, COMPACT_FORMAT).ok()
                } else if let Some(fmt) = hint {
                    Self::parse_with_format(s, fmt)
                } else {
                    Self::parse_free_form(s)
                }
            })
            .collect();

        let failures = texts.iter().flatten().count() - parsed.iter().flatten().count();
        if failures > 0 {
            warn!(
                "DateNormalizer: {} of {} non-blank date cells failed to parse",
                failures,
                non_blank.len()
            );
        }

        parsed
    }

    /// Parse with an explicit format, accepting both date-time and date-only
    /// patterns.
    fn parse_with_format(s: &str, fmt: &str) -> Option<NaiveDate> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
        NaiveDate::parse_from_str(s, fmt).ok()
    }

    fn parse_free_form(s: &str) -> Option<NaiveDate> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.date_naive());
        }
        for fmt in DATE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt.date());
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(date);
            }
        }
        None
    }
}

// ── NumericNormalizer ─────────────────────────────────────────────────────────

/// Plain numeric coercion for count and man-hour columns.
pub struct NumericNormalizer;

impl NumericNormalizer {
    /// Coerce every cell to `f64`; failures and blanks come back as `None`.
    pub fn normalize(cells: &[CellValue]) -> Vec<Option<f64>> {
        cells.iter().map(|c| c.as_number()).collect()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Median of the yielded values, skipping nothing (the caller filters
/// missing values). Even-length input averages the two middle values, the
/// way pandas does. Returns `None` for an empty iterator.
pub fn median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("NaN values were filtered"));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
