use thiserror::Error;

/// All errors produced by the KPI pipeline.
///
/// Individual cell-level parse failures are never surfaced here; they are
/// absorbed as missing values during normalization. Only structural problems
/// that make a whole run meaningless abort the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A mapped column name does not exist in the detected table.
    #[error("Column '{column}' mapped for field '{field}' not found in sheet")]
    ColumnNotFound { field: String, column: String },

    /// Every value in the mapped date column failed to parse; grouping by
    /// month is undefined without at least one usable date.
    #[error("Failed to parse any dates in column '{column}'; check the date column or provide a date format")]
    NoUsableDates { column: String },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Build a [`PipelineError::ColumnNotFound`] from borrowed parts.
    pub fn column_not_found(field: &str, column: &str) -> Self {
        Self::ColumnNotFound {
            field: field.to_string(),
            column: column.to_string(),
        }
    }
}

/// Convenience alias used throughout the pipeline crates.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_column_not_found() {
        let err = PipelineError::column_not_found("date", "Task Date");
        let msg = err.to_string();
        assert!(msg.contains("'Task Date'"));
        assert!(msg.contains("'date'"));
    }

    #[test]
    fn test_error_display_no_usable_dates() {
        let err = PipelineError::NoUsableDates {
            column: "Completed On".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to parse any dates"));
        assert!(msg.contains("Completed On"));
    }

    #[test]
    fn test_error_display_config() {
        let err = PipelineError::Config("no date column mapped".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: no date column mapped"
        );
    }
}
