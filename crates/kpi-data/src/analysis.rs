//! Top-level KPI pipeline.
//!
//! Orchestrates header detection, record building and aggregation, returning
//! a [`PipelineResult`] ready for the presentation layer.

use chrono::Utc;
use kpi_core::models::{
    FieldMapping, MemberMonthSummary, MemberTaskSummary, TeamMonthSummary,
};
use kpi_core::Result;
use tracing::debug;

use crate::aggregator::Aggregator;
use crate::builder::RecordBuilder;
use crate::table::{CleanTable, HeaderDetector, RawTable};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the pipeline result.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PipelineMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// Number of data rows below the detected header.
    pub rows_scanned: usize,
    /// Number of canonical records built.
    pub records_built: usize,
    /// Rows dropped because their date failed to parse.
    pub rows_dropped: usize,
    /// Wall-clock seconds spent detecting the header row.
    pub detect_time_seconds: f64,
    /// Wall-clock seconds spent building canonical records.
    pub build_time_seconds: f64,
    /// Wall-clock seconds spent aggregating.
    pub aggregate_time_seconds: f64,
}

/// The complete output of [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// The detected table, exposed so the caller can populate its
    /// column-mapping controls.
    pub clean: CleanTable,
    /// Per-member monthly KPI rows, sorted by (member, month).
    pub member_month: Vec<MemberMonthSummary>,
    /// Team-wide monthly KPI rows, sorted by month.
    pub team_month: Vec<TeamMonthSummary>,
    /// Per-member per-task KPI rows, present only when a task column is
    /// mapped. Sorted by (member, task).
    pub member_task: Option<Vec<MemberTaskSummary>>,
    /// Metadata about this pipeline run.
    pub metadata: PipelineMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full pipeline on an in-memory sheet.
///
/// 1. Detect the header row and rebuild the sheet as a [`CleanTable`].
/// 2. Normalize mapped columns and build [`CanonicalRecord`]s via
///    [`RecordBuilder`].
/// 3. Aggregate member × month, roll the member rows up into team × month,
///    and, when a task column is mapped, aggregate member × task.
///
/// The pipeline is a pure function of its inputs: re-running with the same
/// sheet and mapping yields identical tables. An empty sheet yields empty
/// tables rather than an error.
///
/// [`CanonicalRecord`]: kpi_core::models::CanonicalRecord
pub fn run_pipeline(raw: &RawTable, mapping: &FieldMapping) -> Result<PipelineResult> {
    // ── Step 1: detect ────────────────────────────────────────────────────────
    let detect_start = std::time::Instant::now();
    let clean = HeaderDetector::detect(raw);
    let detect_time = detect_start.elapsed().as_secs_f64();

    // ── Step 2: build ─────────────────────────────────────────────────────────
    let build_start = std::time::Instant::now();
    let records = RecordBuilder::build(&clean, mapping)?;
    let build_time = build_start.elapsed().as_secs_f64();

    // ── Step 3: aggregate ─────────────────────────────────────────────────────
    let aggregate_start = std::time::Instant::now();
    let member_month = Aggregator::member_month(&records);
    let team_month = Aggregator::team_month(&member_month);
    let member_task = mapping
        .task
        .as_ref()
        .map(|_| Aggregator::member_task(&records));
    let aggregate_time = aggregate_start.elapsed().as_secs_f64();

    debug!(
        "Pipeline: {} records → {} member-month rows, {} team-month rows",
        records.len(),
        member_month.len(),
        team_month.len()
    );

    let metadata = PipelineMetadata {
        generated_at: Utc::now().to_rfc3339(),
        rows_scanned: clean.row_count(),
        records_built: records.len(),
        rows_dropped: clean.row_count() - records.len(),
        detect_time_seconds: detect_time,
        build_time_seconds: build_time,
        aggregate_time_seconds: aggregate_time,
    };

    Ok(PipelineResult {
        clean,
        member_month,
        team_month,
        member_task,
        metadata,
    })
}

/// Sorted distinct member names appearing in the member-month table.
///
/// The original dashboard feeds this into its member-filter control.
pub fn member_names(member_month: &[MemberMonthSummary]) -> Vec<String> {
    let mut names: Vec<String> = member_month.iter().map(|r| r.member.clone()).collect();
    names.sort();
    names.dedup();
    names
}

// ── Tests ─────────────────────────────────────────────────────────────────────
