//! Core domain layer for the KPI pipeline.
//!
//! Holds the cell and record models, the error taxonomy, the per-column
//! value normalizers (percentages, dates, numerics) and display formatting
//! helpers. Everything here is pure and table-agnostic; sheet structure and
//! aggregation live in the `kpi-data` crate.

pub mod error;
pub mod formatting;
pub mod models;
pub mod normalize;

pub use error::{PipelineError, Result};
