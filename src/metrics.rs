//! Headline numbers for the metrics panel

use std::collections::HashSet;

use serde::Serialize;

use crate::insights::InsightTable;

/// Cosmetic churn delta shown beside the churn rate; lower is better
pub const CHURN_RATE_DELTA: &str = "-1.2%";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    /// Rows that parsed cleanly; every other metric is computed over these
    pub total_customers: usize,
    /// Rows dropped by the loader as malformed
    pub skipped_rows: usize,
    /// Mean lifetime spend, `None` when the table is empty
    pub avg_revenue: Option<f64>,
    /// Fraction of churned customers in [0, 1]
    pub churn_rate: Option<f64>,
    pub active_segments: usize,
}

impl SummaryMetrics {
    pub fn from_table(table: &InsightTable) -> Self {
        let total_customers = table.len();

        let (revenue_sum, churned) = table
            .rows
            .iter()
            .fold((0.0_f64, 0usize), |(sum, churned), row| {
                (sum + row.monetary, churned + usize::from(row.is_churned))
            });

        let (avg_revenue, churn_rate) = if total_customers == 0 {
            (None, None)
        } else {
            let n = total_customers as f64;
            (Some(revenue_sum / n), Some(churned as f64 / n))
        };

        let active_segments = table
            .rows
            .iter()
            .map(|row| row.segment_name.as_str())
            .collect::<HashSet<_>>()
            .len();

        Self {
            total_customers,
            skipped_rows: table.skipped_rows,
            avg_revenue,
            churn_rate,
            active_segments,
        }
    }

    /// The four tiles in display order: (label, value)
    pub fn tiles(&self) -> [(&'static str, String); 4] {
        [
            ("Total Customers", self.customer_count()),
            (
                "Avg. Revenue (CLV)",
                self.avg_revenue.map(format_currency).unwrap_or_else(not_available),
            ),
            (
                "Churn Rate",
                self.churn_rate.map(format_percent).unwrap_or_else(not_available),
            ),
            ("Active Segments", self.active_segments.to_string()),
        ]
    }

    fn customer_count(&self) -> String {
        let count = format_count(self.total_customers);
        if self.skipped_rows == 0 {
            count
        } else {
            format!("{} ({} skipped)", count, format_count(self.skipped_rows))
        }
    }
}

fn not_available() -> String {
    "n/a".to_string()
}

/// Integer with thousands separators: 12345 -> "12,345"
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Dollar amount with two decimals
pub fn format_currency(value: f64) -> String {
    format!("${:.2}", value)
}

/// Fraction rendered as a percentage with one decimal: 0.1234 -> "12.3%"
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::CustomerInsight;

    fn row(monetary: f64, segment: &str, churned: bool) -> CustomerInsight {
        CustomerInsight {
            tenure: 100.0,
            monetary,
            frequency: 3.0,
            segment_name: segment.to_string(),
            is_churned: churned,
        }
    }

    #[test]
    fn test_summary_metrics() {
        let table = InsightTable::new(vec![
            row(100.0, "Champions", false),
            row(200.0, "Champions", true),
            row(50.0, "At Risk", true),
            row(10.0, "Hibernating", false),
        ]);

        let metrics = SummaryMetrics::from_table(&table);
        assert_eq!(metrics.total_customers, 4);
        assert!((metrics.avg_revenue.unwrap() - 90.0).abs() < 1e-9);
        assert_eq!(metrics.churn_rate, Some(0.5));
        assert_eq!(metrics.active_segments, 3);

        let tiles = metrics.tiles();
        assert_eq!(tiles[0], ("Total Customers", "4".to_string()));
        assert_eq!(tiles[1].1, "$90.00");
        assert_eq!(tiles[2].1, "50.0%");
        assert_eq!(tiles[3].1, "3");
    }

    #[test]
    fn test_skipped_rows_shown_on_count_tile() {
        let mut table = InsightTable::new(vec![row(10.0, "A", false), row(20.0, "B", true)]);
        table.skipped_rows = 1;

        let metrics = SummaryMetrics::from_table(&table);
        assert_eq!(metrics.total_customers, 2);
        assert_eq!(metrics.skipped_rows, 1);
        assert_eq!(metrics.tiles()[0].1, "2 (1 skipped)");
    }

    #[test]
    fn test_churn_rate_one_decimal() {
        let table = InsightTable::new(vec![
            row(1.0, "A", true),
            row(1.0, "A", false),
            row(1.0, "A", false),
        ]);

        let metrics = SummaryMetrics::from_table(&table);
        assert_eq!(metrics.tiles()[2].1, "33.3%");
    }

    #[test]
    fn test_empty_table() {
        let metrics = SummaryMetrics::from_table(&InsightTable::default());
        assert_eq!(metrics.total_customers, 0);
        assert_eq!(metrics.avg_revenue, None);
        assert_eq!(metrics.churn_rate, None);
        assert_eq!(metrics.active_segments, 0);
        assert_eq!(metrics.tiles()[1].1, "n/a");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(4372), "4,372");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_format_currency_and_percent() {
        assert_eq!(format_currency(1234.5), "$1234.50");
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(format_percent(0.2567), "25.7%");
    }
}
