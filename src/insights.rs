//! Loading the pre-computed customer insights table
//!
//! The table is produced by an external pipeline. Only five columns are
//! read; any other columns in the file are ignored.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{DashboardError, Result};

/// Columns the dashboard cannot render without
pub const REQUIRED_COLUMNS: [&str; 5] = ["monetary", "is_churned", "segment_name", "tenure", "frequency"];

/// One customer row from the insights table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerInsight {
    /// Days as a customer
    pub tenure: f64,
    /// Lifetime spend
    pub monetary: f64,
    /// Purchase count
    pub frequency: f64,
    pub segment_name: String,
    pub is_churned: bool,
}

/// Raw CSV row before field validation
#[derive(Debug, Deserialize)]
struct RawInsight {
    tenure: Option<String>,
    monetary: Option<String>,
    frequency: Option<String>,
    segment_name: Option<String>,
    is_churned: Option<String>,
}

impl RawInsight {
    fn into_insight(self) -> std::result::Result<CustomerInsight, String> {
        let segment_name = self
            .segment_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "segment_name is empty".to_string())?;

        Ok(CustomerInsight {
            tenure: parse_number("tenure", self.tenure)?,
            monetary: parse_number("monetary", self.monetary)?,
            frequency: parse_number("frequency", self.frequency)?,
            segment_name,
            is_churned: parse_flag(self.is_churned)?,
        })
    }
}

fn parse_number(field: &str, value: Option<String>) -> std::result::Result<f64, String> {
    let raw = value.unwrap_or_default();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{} is empty", field));
    }
    let parsed: f64 = trimmed
        .parse()
        .map_err(|_| format!("{} is not a number: {}", field, trimmed))?;
    if !parsed.is_finite() {
        return Err(format!("{} is not finite: {}", field, trimmed));
    }
    Ok(parsed)
}

/// Accepts the encodings pandas writes for a boolean column
fn parse_flag(value: Option<String>) -> std::result::Result<bool, String> {
    let raw = value.unwrap_or_default();
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Ok(true),
        "0" | "0.0" | "false" => Ok(false),
        "" => Err("is_churned is empty".to_string()),
        other => Err(format!("is_churned is not a flag: {}", other)),
    }
}

/// The loaded table plus bookkeeping about rows that could not be used
#[derive(Debug, Clone, Default)]
pub struct InsightTable {
    pub source: PathBuf,
    pub rows: Vec<CustomerInsight>,
    pub skipped_rows: usize,
}

impl InsightTable {
    pub fn new(rows: Vec<CustomerInsight>) -> Self {
        Self {
            source: PathBuf::new(),
            rows,
            skipped_rows: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Data rows in the file, usable or not
    pub fn total_rows(&self) -> usize {
        self.rows.len() + self.skipped_rows
    }
}

/// Read the insights table from `path`
pub fn load_insights(path: &Path) -> Result<InsightTable> {
    let file = File::open(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => DashboardError::DataFileMissing {
            path: path.to_path_buf(),
        },
        _ => DashboardError::Io(err),
    })?;

    // Trimmed headers are what serde matches fields against below
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DashboardError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    let mut skipped_rows = 0;

    for (index, result) in rdr.deserialize::<RawInsight>().enumerate() {
        // Header is line 1
        let line = index + 2;
        match result.map_err(|e| e.to_string()).and_then(RawInsight::into_insight) {
            Ok(row) => rows.push(row),
            Err(reason) => {
                warn!(line, %reason, "skipping malformed insight row");
                skipped_rows += 1;
            }
        }
    }

    info!(
        path = %path.display(),
        rows = rows.len(),
        skipped = skipped_rows,
        "loaded customer insights"
    );

    Ok(InsightTable {
        source: path.to_path_buf(),
        rows,
        skipped_rows,
    })
}

/// Loads the table once per process and hands out shared references
///
/// Only successful loads are memoized. A missing file is reported on every
/// call until the pipeline produces it.
#[derive(Debug)]
pub struct InsightCache {
    path: PathBuf,
    table: OnceCell<Arc<InsightTable>>,
}

impl InsightCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Result<Arc<InsightTable>> {
        self.table
            .get_or_try_init(|| {
                debug!(path = %self.path.display(), "insight cache miss");
                load_insights(&self.path).map(Arc::new)
            })
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.table.get().is_some()
    }
}
