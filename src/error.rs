use std::path::PathBuf;

use thiserror::Error;

/// Message shown when the insights table has not been produced yet
pub const DATA_MISSING_MESSAGE: &str =
    "Data file not found. Please ensure the pipeline has been run.";

/// Failures the dashboard knows how to report
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Data file not found. Please ensure the pipeline has been run. (looked for {})", .path.display())]
    DataFileMissing { path: PathBuf },

    #[error("Data file {} is missing required column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("Failed to read data file: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API Connection Error: {0}")]
    Prediction(String),

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },
}

impl DashboardError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        DashboardError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for failures that stop the data panels from rendering
    pub fn halts_rendering(&self) -> bool {
        matches!(
            self,
            DashboardError::DataFileMissing { .. }
                | DashboardError::MissingColumn { .. }
                | DashboardError::Csv(_)
                | DashboardError::Io(_)
        )
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::Prediction(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_message_names_the_pipeline() {
        let err = DashboardError::DataFileMissing {
            path: PathBuf::from("data/x.csv"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with(DATA_MISSING_MESSAGE));
        assert!(msg.contains("data/x.csv"));
        assert!(err.halts_rendering());
    }

    #[test]
    fn prediction_errors_keep_the_dashboard_alive() {
        let err = DashboardError::Prediction("connection refused".to_string());
        assert_eq!(err.to_string(), "API Connection Error: connection refused");
        assert!(!err.halts_rendering());
    }
}
