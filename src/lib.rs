// EcomInsight - Core Library
// Shared by the terminal dashboard, the web server, and tests

pub mod advice;
pub mod charts;
pub mod config;
pub mod error;
pub mod form;
pub mod insights;
pub mod metrics;
pub mod prediction;
pub mod report;

// Re-export commonly used types
pub use advice::{
    Confidence, PredictionReport, RetentionWindow, StrategicAdvice,
    confidence, recovery_value, retention_window,
};
pub use charts::{
    ScatterChart, ScatterPoint, ScatterSeries, SegmentShare,
    scatter_chart, segment_shares,
};
pub use config::Settings;
pub use error::{DashboardError, DATA_MISSING_MESSAGE};
pub use form::{FieldKind, FormField, PredictionForm};
pub use insights::{CustomerInsight, InsightCache, InsightTable, load_insights};
pub use metrics::{SummaryMetrics, CHURN_RATE_DELTA};
pub use prediction::{PredictionClient, PredictionRequest, PredictionResponse};
pub use report::{build_prediction_report, build_summary_report};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_TITLE: &str = "EcomInsight AI-Driven Analytics";
pub const APP_SUBTITLE: &str = "Strategic Customer Intelligence & Retention Optimization";

/// Caption shown at the bottom of both dashboards
pub fn footer_caption() -> String {
    format!(
        "EcomInsight AI Platform v{} | Explainable AI & Business Intelligence Architecture | 2025",
        VERSION
    )
}

/// Shown before the first prediction is submitted
pub const PREDICTION_TIP: &str =
    "Pro Tip: Enter a customer's recent shopping metrics to see AI-driven business recommendations.";
