//! KPI aggregation over canonical records.
//!
//! Three grouping operations: member × month, team per month (rolled up from
//! the member-month rows, never from raw records), and member × task.
//! `BTreeMap` keys give every table a stable, display-ready ordering.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use kpi_core::models::{
    CanonicalRecord, MemberMonthSummary, MemberTaskSummary, TeamMonthSummary,
};

// ── MeanState ─────────────────────────────────────────────────────────────────

/// Running mean that ignores missing values.
///
/// The mean is itself missing only when every contributing value was missing.
#[derive(Debug, Clone, Default)]
struct MeanState {
    sum: f64,
    count: u32,
}

impl MeanState {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

// ── KpiStats ──────────────────────────────────────────────────────────────────

/// KPI totals accumulated across the records of one grouping key.
#[derive(Debug, Clone, Default)]
struct KpiStats {
    quality: MeanState,
    revision: MeanState,
    ontime: MeanState,
    efficiency: MeanState,
    /// Sum; missing counts as zero.
    completed: f64,
    /// Sum; missing counts as zero.
    manhours: f64,
    /// All contributing records, regardless of missingness.
    count: usize,
}

impl KpiStats {
    /// Add a single record's KPIs to the running totals.
    fn add_record(&mut self, record: &CanonicalRecord) {
        self.quality.add(record.quality);
        self.revision.add(record.revision);
        self.ontime.add(record.ontime);
        self.efficiency.add(record.efficiency);
        self.completed += record.completed;
        self.manhours += record.manhours.unwrap_or(0.0);
        self.count += 1;
    }
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Stateless helper that rolls canonical records up into summary tables.
pub struct Aggregator;

impl Aggregator {
    /// Aggregate per member per calendar month.
    ///
    /// Returns rows sorted by (member ascending, month ascending).
    pub fn member_month(records: &[CanonicalRecord]) -> Vec<MemberMonthSummary> {
        let mut map: BTreeMap<(String, NaiveDate), KpiStats> = BTreeMap::new();

        for record in records {
            map.entry((record.member.clone(), record.month))
                .or_default()
                .add_record(record);
        }

        map.into_iter()
            .map(|((member, month), stats)| MemberMonthSummary {
                member,
                month,
                avg_quality: stats.quality.mean(),
                avg_revision: stats.revision.mean(),
                total_completed: stats.completed,
                ontime_pct: stats.ontime.mean(),
                avg_efficiency: stats.efficiency.mean(),
                total_manhours: stats.manhours,
            })
            .collect()
    }

    /// Roll member-month rows up into one row per month.
    ///
    /// Averages are means of the per-member averages, so every member weighs
    /// the same no matter how many records they contributed; sums are sums of
    /// the per-member sums. Input is the output of
    /// [`member_month`](Self::member_month), never raw records.
    ///
    /// Returns rows sorted by month ascending.
    pub fn team_month(member_months: &[MemberMonthSummary]) -> Vec<TeamMonthSummary> {
        let mut map: BTreeMap<NaiveDate, KpiStats> = BTreeMap::new();

        for row in member_months {
            let stats = map.entry(row.month).or_default();
            stats.quality.add(row.avg_quality);
            stats.revision.add(row.avg_revision);
            stats.ontime.add(row.ontime_pct);
            stats.efficiency.add(row.avg_efficiency);
            stats.completed += row.total_completed;
            stats.manhours += row.total_manhours;
            stats.count += 1;
        }

        map.into_iter()
            .map(|(month, stats)| TeamMonthSummary {
                month,
                avg_quality: stats.quality.mean(),
                avg_revision: stats.revision.mean(),
                total_completed: stats.completed,
                ontime_pct: stats.ontime.mean(),
                avg_efficiency: stats.efficiency.mean(),
                total_manhours: stats.manhours,
            })
            .collect()
    }

    /// Aggregate per member per task, across all months.
    ///
    /// Records without a task identifier are left out, matching how the
    /// original dashboard's grouping drops null keys.
    ///
    /// Returns rows sorted by (member ascending, task ascending).
    pub fn member_task(records: &[CanonicalRecord]) -> Vec<MemberTaskSummary> {
        let mut map: BTreeMap<(String, String), KpiStats> = BTreeMap::new();

        for record in records {
            let Some(task) = &record.task else { continue };
            map.entry((record.member.clone(), task.clone()))
                .or_default()
                .add_record(record);
        }

        map.into_iter()
            .map(|((member, task), stats)| MemberTaskSummary {
                member,
                task,
                avg_quality: stats.quality.mean(),
                avg_revision: stats.revision.mean(),
                total_completed: stats.completed,
                ontime_pct: stats.ontime.mean(),
                avg_efficiency: stats.efficiency.mean(),
                total_manhours: stats.manhours,
                observations: stats.count,
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
