use std::fmt::Write;

use chrono::Utc;

use crate::advice::PredictionReport;
use crate::charts;
use crate::insights::InsightTable;
use crate::metrics::{self, SummaryMetrics, CHURN_RATE_DELTA};

pub fn build_summary_report(table: &InsightTable) -> String {
    let summary = SummaryMetrics::from_table(table);
    let shares = charts::segment_shares(table);

    let mut output = String::new();

    let _ = writeln!(output, "# EcomInsight Customer Summary");
    let _ = writeln!(
        output,
        "Source: {} (generated {})",
        table.source.display(),
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    );
    if table.skipped_rows > 0 {
        let _ = writeln!(output, "Skipped {} malformed rows", table.skipped_rows);
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Metrics");

    for (label, value) in summary.tiles() {
        if label == "Churn Rate" {
            let _ = writeln!(output, "- {}: {} ({})", label, value, CHURN_RATE_DELTA);
        } else {
            let _ = writeln!(output, "- {}: {}", label, value);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Customer Segmentation");

    if shares.is_empty() {
        let _ = writeln!(output, "No customers loaded.");
    } else {
        for share in &shares {
            let _ = writeln!(
                output,
                "- {}: {} customers ({})",
                share.segment_name,
                metrics::format_count(share.customers),
                metrics::format_percent(share.share)
            );
        }
    }

    output
}

pub fn build_prediction_report(report: &PredictionReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{}: {}", report.headline(), report.score_label());
    let _ = writeln!(output, "AI Confidence Level: {}", report.advice.confidence);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Strategic Business Metrics");

    for (metric, value) in report.business_metrics() {
        let _ = writeln!(output, "- {}: {}", metric, value);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Decision: {}", report.decision());

    output
}
