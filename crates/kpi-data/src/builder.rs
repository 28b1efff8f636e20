//! Mapping of normalized columns into canonical records.
//!
//! The [`RecordBuilder`] is the only place where dynamic column-by-name
//! access happens; everything downstream works on the fixed
//! [`CanonicalRecord`] schema.

use kpi_core::models::{
    month_start, CanonicalRecord, CellValue, FieldMapping, MISSING_MEMBER,
};
use kpi_core::normalize::{DateNormalizer, NumericNormalizer, PercentNormalizer};
use kpi_core::{PipelineError, Result};
use tracing::debug;

use crate::table::CleanTable;

/// Builds the ordered sequence of [`CanonicalRecord`]s for one pipeline run.
pub struct RecordBuilder;

impl RecordBuilder {
    /// Produce one record per data row, preserving row order.
    ///
    /// Rows whose date fails to parse are dropped; that is the only drop
    /// condition. A blank member cell becomes the [`MISSING_MEMBER`]
    /// placeholder, a blank completed cell counts as one completed task, and
    /// on-time percentages are stored as 0–1 fractions (negative values are
    /// discarded as missing).
    ///
    /// Errors:
    /// * [`PipelineError::ColumnNotFound`] when any mapped column name is
    ///   absent from `table`;
    /// * [`PipelineError::NoUsableDates`] when no date cell parses at all.
    ///
    /// An empty table short-circuits to an empty record set.
    pub fn build(table: &CleanTable, mapping: &FieldMapping) -> Result<Vec<CanonicalRecord>> {
        if table.is_empty() {
            return Ok(Vec::new());
        }

        let n = table.row_count();

        let date_cells = Self::resolve(table, "date", &mapping.date)?;
        let dates = DateNormalizer::normalize(&date_cells, mapping.date_format.as_deref());
        if dates.iter().all(Option::is_none) {
            return Err(PipelineError::NoUsableDates {
                column: mapping.date.clone(),
            });
        }

        let member = Self::optional(table, "member", mapping.member.as_deref())?;
        let task = Self::optional(table, "task", mapping.task.as_deref())?;

        let quality = Self::percent(table, "quality", mapping.quality.as_deref(), n)?;
        let revision = Self::percent(table, "revision", mapping.revision.as_deref(), n)?;
        let ontime = Self::percent(table, "ontime", mapping.ontime.as_deref(), n)?;
        let efficiency = Self::percent(table, "efficiency", mapping.efficiency.as_deref(), n)?;
        let completed = Self::numeric(table, "completed", mapping.completed.as_deref(), n)?;
        let manhours = Self::numeric(table, "manhours", mapping.manhours.as_deref(), n)?;

        let mut records = Vec::with_capacity(n);
        for i in 0..n {
            // Unparseable date is the only condition that loses a row.
            let Some(date) = dates[i] else { continue };

            records.push(CanonicalRecord {
                member: Self::member_name(member.as_deref(), i),
                date,
                month: month_start(date),
                task: task
                    .as_deref()
                    .and_then(|cells| cells[i].as_text()),
                quality: quality[i],
                revision: revision[i],
                completed: completed[i].unwrap_or(1.0),
                ontime: ontime[i].filter(|v| *v >= 0.0).map(|v| v / 100.0),
                efficiency: efficiency[i],
                manhours: manhours[i],
            });
        }

        debug!(
            "RecordBuilder: built {} records from {} rows ({} dropped for unparseable dates)",
            records.len(),
            n,
            n - records.len()
        );

        Ok(records)
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Resolve a required column or fail with [`PipelineError::ColumnNotFound`].
    fn resolve(table: &CleanTable, field: &str, column: &str) -> Result<Vec<CellValue>> {
        table
            .column(column)
            .ok_or_else(|| PipelineError::column_not_found(field, column))
    }

    /// Resolve an optionally mapped column. `None` mapping means the field is
    /// simply absent; a mapped-but-missing column is still an error.
    fn optional(
        table: &CleanTable,
        field: &str,
        column: Option<&str>,
    ) -> Result<Option<Vec<CellValue>>> {
        column
            .map(|c| Self::resolve(table, field, c))
            .transpose()
    }

    /// Normalized percentage column, or all-missing when unmapped.
    fn percent(
        table: &CleanTable,
        field: &str,
        column: Option<&str>,
        n: usize,
    ) -> Result<Vec<Option<f64>>> {
        Ok(match Self::optional(table, field, column)? {
            Some(cells) => PercentNormalizer::normalize(&cells),
            None => vec![None; n],
        })
    }

    /// Coerced numeric column, or all-missing when unmapped.
    fn numeric(
        table: &CleanTable,
        field: &str,
        column: Option<&str>,
        n: usize,
    ) -> Result<Vec<Option<f64>>> {
        Ok(match Self::optional(table, field, column)? {
            Some(cells) => NumericNormalizer::normalize(&cells),
            None => vec![None; n],
        })
    }

    fn member_name(member: Option<&[CellValue]>, i: usize) -> String {
        member
            .and_then(|cells| cells[i].as_text())
            .unwrap_or_else(|| MISSING_MEMBER.to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{HeaderDetector, RawTable};
    use chrono::NaiveDate;

    fn iso(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn table(rows: Vec<Vec<&str>>) -> CleanTable {
        let raw = RawTable::new(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|s| {
                            if s.is_empty() {
                                CellValue::Blank
                            } else {
                                CellValue::from(s)
                            }
                        })
                        .collect()
                })
                .collect(),
        );
        HeaderDetector::detect(&raw)
    }

    fn full_mapping() -> FieldMapping {
        FieldMapping {
            member: Some("Member".to_string()),
            date: "Date".to_string(),
            task: None,
            quality: Some("Quality".to_string()),
            revision: None,
            completed: Some("Completed".to_string()),
            ontime: Some("On-time".to_string()),
            efficiency: None,
            manhours: Some("Man-hours".to_string()),
            date_format: None,
        }
    }

    fn sample_table() -> CleanTable {
        table(vec![
            vec!["Member", "Date", "Quality", "Completed", "On-time", "Man-hours"],
            vec!["alice", "2023-01-15", "95%", "2", "90", "8"],
            vec!["bob", "2023-02-20", "0.8", "", "-5", "6.5"],
        ])
    }

    #[test]
    fn test_build_basic_records() {
        let records = RecordBuilder::build(&sample_table(), &full_mapping()).unwrap();
        assert_eq!(records.len(), 2);

        let alice = &records[0];
        assert_eq!(alice.member, "alice");
        assert_eq!(alice.date, iso("2023-01-15"));
        assert_eq!(alice.month, iso("2023-01-01"));
        assert_eq!(alice.quality, Some(95.0));
        assert_eq!(alice.completed, 2.0);
        assert_eq!(alice.ontime, Some(0.9));
        assert_eq!(alice.manhours, Some(8.0));
    }

    #[test]
    fn test_build_month_is_first_of_month() {
        let records = RecordBuilder::build(&sample_table(), &full_mapping()).unwrap();
        assert_eq!(records[1].month, iso("2023-02-01"));
    }

    #[test]
    fn test_quality_scale_decided_per_column() {
        // Column ["95%", "0.8"] has median 47.9 > 1.05: no rescale, so the
        // 0.8 stays 0.8 rather than becoming 80.
        let records = RecordBuilder::build(&sample_table(), &full_mapping()).unwrap();
        assert_eq!(records[1].quality, Some(0.8));
    }

    #[test]
    fn test_completed_defaults_to_one() {
        let records = RecordBuilder::build(&sample_table(), &full_mapping()).unwrap();
        assert_eq!(records[1].completed, 1.0);
    }

    #[test]
    fn test_negative_ontime_is_missing() {
        let records = RecordBuilder::build(&sample_table(), &full_mapping()).unwrap();
        assert_eq!(records[1].ontime, None);
    }

    #[test]
    fn test_unmapped_fields_are_missing() {
        let records = RecordBuilder::build(&sample_table(), &full_mapping()).unwrap();
        assert_eq!(records[0].revision, None);
        assert_eq!(records[0].efficiency, None);
        assert_eq!(records[0].task, None);
    }

    #[test]
    fn test_missing_member_gets_placeholder() {
        let t = table(vec![
            vec!["Member", "Date"],
            vec!["", "2023-01-15"],
        ]);
        let mut mapping = FieldMapping::new("Date");
        mapping.member = Some("Member".to_string());
        let records = RecordBuilder::build(&t, &mapping).unwrap();
        assert_eq!(records[0].member, MISSING_MEMBER);
    }

    #[test]
    fn test_unparseable_date_row_dropped() {
        let t = table(vec![
            vec!["Member", "Date"],
            vec!["alice", "2023-01-15"],
            vec!["bob", "someday"],
        ]);
        let mut mapping = FieldMapping::new("Date");
        mapping.member = Some("Member".to_string());
        let records = RecordBuilder::build(&t, &mapping).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].member, "alice");
    }

    #[test]
    fn test_all_dates_unparseable_is_error() {
        let t = table(vec![
            vec!["Member", "Date"],
            vec!["alice", "soon"],
            vec!["bob", "later"],
        ]);
        let err = RecordBuilder::build(&t, &FieldMapping::new("Date")).unwrap_err();
        assert!(matches!(err, PipelineError::NoUsableDates { .. }));
    }

    #[test]
    fn test_date_column_not_found_is_error() {
        let t = table(vec![vec!["Member"], vec!["alice"]]);
        let err = RecordBuilder::build(&t, &FieldMapping::new("Date")).unwrap_err();
        match err {
            PipelineError::ColumnNotFound { field, column } => {
                assert_eq!(field, "date");
                assert_eq!(column, "Date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mapped_optional_column_not_found_is_error() {
        let t = table(vec![
            vec!["Member", "Date"],
            vec!["alice", "2023-01-15"],
        ]);
        let mut mapping = FieldMapping::new("Date");
        mapping.quality = Some("Quality Score".to_string());
        let err = RecordBuilder::build(&t, &mapping).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ColumnNotFound { ref field, .. } if field == "quality"
        ));
    }

    #[test]
    fn test_empty_table_yields_no_records() {
        let records =
            RecordBuilder::build(&CleanTable::empty(), &FieldMapping::new("Date")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_task_column_carried_through() {
        let t = table(vec![
            vec!["Member", "Date", "Task"],
            vec!["alice", "2023-01-15", "review"],
            vec!["alice", "2023-01-16", ""],
        ]);
        let mut mapping = FieldMapping::new("Date");
        mapping.member = Some("Member".to_string());
        mapping.task = Some("Task".to_string());
        let records = RecordBuilder::build(&t, &mapping).unwrap();
        assert_eq!(records[0].task.as_deref(), Some("review"));
        assert_eq!(records[1].task, None);
    }

    #[test]
    fn test_date_format_hint_is_used() {
        let t = table(vec![
            vec!["Date"],
            vec!["15.01.2023"],
        ]);
        let mut mapping = FieldMapping::new("Date");
        mapping.date_format = Some("%d.%m.%Y".to_string());
        let records = RecordBuilder::build(&t, &mapping).unwrap();
        assert_eq!(records[0].date, iso("2023-01-15"));
    }

    #[test]
    fn test_row_order_preserved() {
        let t = table(vec![
            vec!["Member", "Date"],
            vec!["zoe", "2023-03-01"],
            vec!["alice", "2023-01-01"],
        ]);
        let mut mapping = FieldMapping::new("Date");
        mapping.member = Some("Member".to_string());
        let records = RecordBuilder::build(&t, &mapping).unwrap();
        let members: Vec<&str> = records.iter().map(|r| r.member.as_str()).collect();
        assert_eq!(members, vec!["zoe", "alice"]);
    }
}
