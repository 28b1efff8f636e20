//! Display formatting for summary table cells.
//!
//! Mirrors the fixed formats the dashboard applies to its KPI tables:
//! percentages with two decimals, counts with none, man-hours with one.
//! Missing aggregates render as an em dash.

/// Placeholder shown for aggregates with no contributing values.
pub const MISSING_DISPLAY: &str = "—";

/// Format a 0–100 percentage with two decimal places and a `%` sign.
///
/// # Examples
///
/// ```
/// use kpi_core::formatting::format_percent;
///
/// assert_eq!(format_percent(Some(95.0)),   "95.00%");
/// assert_eq!(format_percent(Some(87.556)), "87.56%");
/// assert_eq!(format_percent(None),         "—");
/// ```
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v),
        None => MISSING_DISPLAY.to_string(),
    }
}

/// Format a 0–1 fraction with two decimal places, no sign.
///
/// # Examples
///
/// ```
/// use kpi_core::formatting::format_fraction;
///
/// assert_eq!(format_fraction(Some(0.875)), "0.88");
/// assert_eq!(format_fraction(None),        "—");
/// ```
pub fn format_fraction(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => MISSING_DISPLAY.to_string(),
    }
}

/// Format a completed-task count with no decimal places.
///
/// # Examples
///
/// ```
/// use kpi_core::formatting::format_count;
///
/// assert_eq!(format_count(12.0), "12");
/// assert_eq!(format_count(3.6),  "4");
/// ```
pub fn format_count(value: f64) -> String {
    format!("{:.0}", value)
}

/// Format a man-hours total with one decimal place.
///
/// # Examples
///
/// ```
/// use kpi_core::formatting::format_hours;
///
/// assert_eq!(format_hours(37.25), "37.2");
/// assert_eq!(format_hours(8.0),   "8.0");
/// ```
pub fn format_hours(value: f64) -> String {
    format!("{:.1}", value)
}
