//! Chart series derived from the insights table

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::insights::InsightTable;

pub const SCATTER_X_LABEL: &str = "Days as Customer";
pub const SCATTER_Y_LABEL: &str = "Total Spent ($)";

/// Smallest and largest marker sizes handed to renderers
pub const MIN_MARKER_SIZE: f64 = 4.0;
pub const MAX_MARKER_SIZE: f64 = 20.0;

/// One slice of the segmentation chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentShare {
    pub segment_name: String,
    pub customers: usize,
    /// Fraction of all customers in [0, 1]
    pub share: f64,
}

/// Customers per segment, largest first
pub fn segment_shares(table: &InsightTable) -> Vec<SegmentShare> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in &table.rows {
        *counts.entry(row.segment_name.as_str()).or_insert(0) += 1;
    }

    let total = table.len();
    let mut shares: Vec<SegmentShare> = counts
        .into_iter()
        .map(|(name, customers)| SegmentShare {
            segment_name: name.to_string(),
            customers,
            share: customers as f64 / total as f64,
        })
        .collect();

    shares.sort_by(|a, b| {
        b.customers
            .cmp(&a.customers)
            .then_with(|| a.segment_name.cmp(&b.segment_name))
    });
    shares
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub tenure: f64,
    pub monetary: f64,
    pub frequency: f64,
    pub size: f64,
}

/// Points of one segment, coloured together
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub segment_name: String,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

/// Revenue vs. tenure, one series per segment in name order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterChart {
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub series: Vec<ScatterSeries>,
}

impl ScatterChart {
    /// Extents of all points; a degenerate axis is widened by one unit
    pub fn bounds(&self) -> Bounds {
        let mut x = [f64::INFINITY, f64::NEG_INFINITY];
        let mut y = [f64::INFINITY, f64::NEG_INFINITY];

        for point in self.series.iter().flat_map(|s| s.points.iter()) {
            x[0] = x[0].min(point.tenure);
            x[1] = x[1].max(point.tenure);
            y[0] = y[0].min(point.monetary);
            y[1] = y[1].max(point.monetary);
        }

        Bounds {
            x: widen(x),
            y: widen(y),
        }
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }
}

fn widen(range: [f64; 2]) -> [f64; 2] {
    if !range[0].is_finite() || !range[1].is_finite() {
        return [0.0, 1.0];
    }
    if range[0] == range[1] {
        return [range[0] - 1.0, range[1] + 1.0];
    }
    range
}

/// Marker size proportional to purchase frequency
pub fn marker_size(frequency: f64, max_frequency: f64) -> f64 {
    if max_frequency <= 0.0 {
        return MIN_MARKER_SIZE;
    }
    let ratio = (frequency / max_frequency).clamp(0.0, 1.0);
    MIN_MARKER_SIZE + ratio * (MAX_MARKER_SIZE - MIN_MARKER_SIZE)
}

pub fn scatter_chart(table: &InsightTable) -> ScatterChart {
    let max_frequency = table
        .rows
        .iter()
        .map(|row| row.frequency)
        .fold(0.0_f64, f64::max);

    let mut by_segment: BTreeMap<&str, Vec<ScatterPoint>> = BTreeMap::new();
    for row in &table.rows {
        by_segment
            .entry(row.segment_name.as_str())
            .or_default()
            .push(ScatterPoint {
                tenure: row.tenure,
                monetary: row.monetary,
                frequency: row.frequency,
                size: marker_size(row.frequency, max_frequency),
            });
    }

    ScatterChart {
        x_label: SCATTER_X_LABEL,
        y_label: SCATTER_Y_LABEL,
        series: by_segment
            .into_iter()
            .map(|(name, points)| ScatterSeries {
                segment_name: name.to_string(),
                points,
            })
            .collect(),
    }
}
