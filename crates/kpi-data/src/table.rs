//! Raw sheet structure and header detection.
//!
//! Uploaded spreadsheets often carry a title row, notes, or blank padding
//! above the real header. [`HeaderDetector`] finds the most plausible header
//! row and rebuilds the sheet as a [`CleanTable`] with named columns.

use std::collections::HashMap;

use kpi_core::models::CellValue;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ── RawTable ──────────────────────────────────────────────────────────────────

/// An uploaded sheet as an ordered grid of cells, with no assumed header.
///
/// Rows may be ragged; missing trailing cells read as blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── CleanTable ────────────────────────────────────────────────────────────────

/// A sheet with a resolved header: named columns over zero-based data rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanTable {
    /// Index of the chosen header row within the original [`RawTable`].
    header_row: usize,
    /// Column names taken from the header row, disambiguated for
    /// addressability (see [`HeaderDetector::detect`]).
    columns: Vec<String>,
    /// Data rows, re-indexed from zero starting at the first row after the
    /// header.
    rows: Vec<Vec<CellValue>>,
}

impl CleanTable {
    /// The zero-row, zero-column table produced for an empty sheet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Header row index within the original raw sheet.
    pub fn header_row(&self) -> usize {
        self.header_row
    }

    /// Column names, in sheet order. Intended for populating the caller's
    /// column-mapping controls.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Extract one column by name, padding ragged rows with blanks so the
    /// result always has exactly [`row_count`](Self::row_count) entries.
    /// Returns `None` when no column carries that name.
    pub fn column(&self, name: &str) -> Option<Vec<CellValue>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).cloned().unwrap_or(CellValue::Blank))
                .collect(),
        )
    }
}

// ── HeaderDetector ────────────────────────────────────────────────────────────

/// Locates the true header row inside a loosely structured sheet.
pub struct HeaderDetector;

impl HeaderDetector {
    /// Scan rows top to bottom and pick the first row with the maximum count
    /// of non-blank cells as the header. Everything at or above it is
    /// discarded; the rows below become the data rows.
    ///
    /// Header cells become column names. Blank header cells get a positional
    /// name (`column_3`) and duplicates get a numeric suffix (`Score.1`) so
    /// that a [`FieldMapping`](kpi_core::models::FieldMapping) can reference
    /// every column unambiguously.
    ///
    /// An empty sheet yields [`CleanTable::empty`].
    pub fn detect(raw: &RawTable) -> CleanTable {
        if raw.is_empty() {
            return CleanTable::empty();
        }

        let counts: Vec<usize> = raw
            .rows
            .iter()
            .map(|row| row.iter().filter(|c| !c.is_blank()).count())
            .collect();
        let max = counts.iter().copied().max().unwrap_or(0);
        let header_row = counts
            .iter()
            .position(|&c| c == max)
            .unwrap_or(0);

        let columns = Self::name_columns(&raw.rows[header_row]);
        let rows: Vec<Vec<CellValue>> = raw.rows[header_row + 1..].to_vec();

        debug!(
            "HeaderDetector: header at row {} ({} columns, {} data rows)",
            header_row,
            columns.len(),
            rows.len()
        );

        CleanTable {
            header_row,
            columns,
            rows,
        }
    }

    /// Turn header cells into unique, non-empty column names.
    fn name_columns(header: &[CellValue]) -> Vec<String> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        header
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                let base = cell
                    .as_text()
                    .unwrap_or_else(|| format!("column_{}", idx));
                let n = seen.entry(base.clone()).or_insert(0);
                let name = if *n == 0 {
                    base
                } else {
                    format!("{}.{}", base, n)
                };
                *n += 1;
                name
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
