use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Placeholder member name substituted when the member cell is blank, so
/// rows are never silently dropped for a missing assignee.
pub const MISSING_MEMBER: &str = "missing";

// ── CellValue ─────────────────────────────────────────────────────────────────

/// One raw spreadsheet cell as handed over by the presentation layer.
///
/// Spreadsheet exports are loosely typed: the same column can mix numbers,
/// strings like `"95%"`, and empty cells. All coercion decisions are deferred
/// to the column normalizers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// An empty cell.
    Blank,
    /// A numeric cell.
    Number(f64),
    /// A textual cell (kept verbatim, including surrounding whitespace).
    Text(String),
}

impl CellValue {
    /// `true` for [`CellValue::Blank`] and for text that is empty after
    /// trimming. Numbers are never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Blank => true,
            CellValue::Number(_) => false,
            CellValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Coerce to a number: numeric cells pass through, text is parsed after
    /// trimming. Returns `None` for blanks, unparseable text, and non-finite
    /// results — a literal `"nan"` or `"inf"` cell is missing data, and must
    /// never leak into an aggregate sum or mean.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Blank => None,
            CellValue::Number(n) => Some(*n).filter(|v| v.is_finite()),
            CellValue::Text(s) => {
                s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
            }
        }
    }

    /// Render as trimmed text. Whole numbers print without a trailing `.0`
    /// so a cell holding `20230115.0` round-trips as `"20230115"`.
    /// Returns `None` for blank cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Blank => None,
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

// ── FieldMapping ──────────────────────────────────────────────────────────────

/// Assigns a sheet column name to each semantic KPI field.
///
/// Supplied by the caller (the column-mapping UI in the original dashboard)
/// and held immutable for one pipeline run. Only the date column is
/// mandatory; unmapped fields come through as all-missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Member / assignee column.
    pub member: Option<String>,
    /// Task date column. Required: monthly grouping is meaningless without it.
    pub date: String,
    /// Optional task identifier column; enables the per-member-per-task table.
    pub task: Option<String>,
    /// Quality score column (percentage in any encoding).
    pub quality: Option<String>,
    /// Revision rate column (percentage).
    pub revision: Option<String>,
    /// Completed task count column.
    pub completed: Option<String>,
    /// On-time delivery column (percentage).
    pub ontime: Option<String>,
    /// Work efficiency column (percentage).
    pub efficiency: Option<String>,
    /// Man-hours spent column (numeric).
    pub manhours: Option<String>,
    /// Explicit strftime-style date format, used when the dates don't parse
    /// on their own (e.g. `%d.%m.%Y`). Empty / absent means autodetect.
    #[serde(default)]
    pub date_format: Option<String>,
}

impl FieldMapping {
    /// Mapping with only the mandatory date column set.
    pub fn new(date_column: impl Into<String>) -> Self {
        Self {
            member: None,
            date: date_column.into(),
            task: None,
            quality: None,
            revision: None,
            completed: None,
            ontime: None,
            efficiency: None,
            manhours: None,
            date_format: None,
        }
    }
}

// ── CanonicalRecord ───────────────────────────────────────────────────────────

/// One normalized task observation, the uniform input to all aggregation.
///
/// Percentages are on the 0–100 scale except `ontime`, which is stored as a
/// 0–1 fraction so that its mean reads directly as an on-time rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Member the row is attributed to; never empty (see [`MISSING_MEMBER`]).
    pub member: String,
    /// Calendar date of the observation.
    pub date: NaiveDate,
    /// First day of `date`'s month; the time-bucket grouping key.
    pub month: NaiveDate,
    /// Task identifier, when a task column is mapped.
    pub task: Option<String>,
    /// Quality score, 0–100.
    pub quality: Option<f64>,
    /// Revision rate, 0–100.
    pub revision: Option<f64>,
    /// Completed task count; defaults to 1 when the source cell is blank.
    pub completed: f64,
    /// On-time delivery as a 0–1 fraction.
    pub ontime: Option<f64>,
    /// Work efficiency, 0–100.
    pub efficiency: Option<f64>,
    /// Man-hours spent.
    pub manhours: Option<f64>,
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month, so the fallback is unreachable.
    date.with_day(1).unwrap_or(date)
}

// ── Summary rows ──────────────────────────────────────────────────────────────

/// Aggregated KPIs for one member in one calendar month.
///
/// Average fields are `None` only when every contributing record was missing
/// that KPI; sums treat missing as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberMonthSummary {
    pub member: String,
    /// First-of-month key.
    pub month: NaiveDate,
    pub avg_quality: Option<f64>,
    pub avg_revision: Option<f64>,
    pub total_completed: f64,
    /// Mean on-time fraction, 0–1.
    pub ontime_pct: Option<f64>,
    pub avg_efficiency: Option<f64>,
    pub total_manhours: f64,
}

/// Team-wide KPIs for one calendar month.
///
/// Averages are means of the per-member monthly averages, giving every member
/// equal weight regardless of how many records they contributed. Sums are
/// sums of the per-member sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMonthSummary {
    /// First-of-month key.
    pub month: NaiveDate,
    pub avg_quality: Option<f64>,
    pub avg_revision: Option<f64>,
    pub total_completed: f64,
    /// Mean on-time fraction, 0–1.
    pub ontime_pct: Option<f64>,
    pub avg_efficiency: Option<f64>,
    pub total_manhours: f64,
}

/// Aggregated KPIs for one member on one task, across all months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberTaskSummary {
    pub member: String,
    pub task: String,
    pub avg_quality: Option<f64>,
    pub avg_revision: Option<f64>,
    pub total_completed: f64,
    /// Mean on-time fraction, 0–1.
    pub ontime_pct: Option<f64>,
    pub avg_efficiency: Option<f64>,
    pub total_manhours: f64,
    /// Number of contributing records, counted regardless of missingness.
    pub observations: usize,
}
