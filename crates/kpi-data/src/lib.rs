//! Data layer for the KPI pipeline.
//!
//! Responsible for turning a raw uploaded sheet into named columns, building
//! canonical records from a caller-supplied field mapping, aggregating them
//! into member-month / team-month / member-task summaries and running the
//! top-level pipeline.

pub mod aggregator;
pub mod analysis;
pub mod builder;
pub mod table;

pub use kpi_core as core;
