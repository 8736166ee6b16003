//! Display-only advice derived from a churn score
//!
//! None of this feeds back into the model; it is arithmetic on the score and
//! the submitted profile.

use std::fmt;

use serde::Serialize;

use crate::metrics::{format_currency, format_percent};
use crate::prediction::{PredictionRequest, PredictionResponse};

/// Scores above this are confidently "will churn"
pub const HIGH_CONFIDENCE_UPPER: f64 = 0.85;
/// Scores below this are confidently "will stay"
pub const HIGH_CONFIDENCE_LOWER: f64 = 0.20;
/// Customers buying more often than this need a short retention window
pub const CRITICAL_FREQUENCY: u32 = 8;
pub const PREDICTION_DEVIATION: &str = "±3.8%";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Moderate,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Moderate => "Moderate",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetentionWindow {
    Critical,
    Standard,
}

impl RetentionWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionWindow::Critical => "Critical (1-7 Days)",
            RetentionWindow::Standard => "Standard (14-30 Days)",
        }
    }
}

impl fmt::Display for RetentionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Both cutoffs are exclusive: 0.85 and 0.20 themselves are `Moderate`
pub fn confidence(risk_score: f64) -> Confidence {
    if risk_score > HIGH_CONFIDENCE_UPPER || risk_score < HIGH_CONFIDENCE_LOWER {
        Confidence::High
    } else {
        Confidence::Moderate
    }
}

pub fn recovery_value(risk_score: f64, monetary: f64) -> f64 {
    monetary * risk_score
}

pub fn retention_window(frequency: u32) -> RetentionWindow {
    if frequency > CRITICAL_FREQUENCY {
        RetentionWindow::Critical
    } else {
        RetentionWindow::Standard
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategicAdvice {
    pub confidence: Confidence,
    pub recovery_value: f64,
    pub window: RetentionWindow,
}

impl StrategicAdvice {
    pub fn derive(risk_score: f64, frequency: u32, monetary: f64) -> Self {
        Self {
            confidence: confidence(risk_score),
            recovery_value: recovery_value(risk_score, monetary),
            window: retention_window(frequency),
        }
    }
}

/// Everything the result panel shows for one prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub risk_score: f64,
    pub will_churn: bool,
    pub advice: StrategicAdvice,
}

impl PredictionReport {
    pub fn new(request: &PredictionRequest, response: &PredictionResponse) -> Self {
        Self {
            risk_score: response.churn_risk_score,
            will_churn: response.will_churn,
            advice: StrategicAdvice::derive(
                response.churn_risk_score,
                request.frequency,
                request.monetary,
            ),
        }
    }

    pub fn headline(&self) -> &'static str {
        if self.will_churn {
            "HIGH CHURN RISK"
        } else {
            "LOYAL PROFILE"
        }
    }

    pub fn score_label(&self) -> String {
        format_percent(self.risk_score)
    }

    pub fn strategy(&self) -> &'static str {
        if self.will_churn {
            "Retention Campaign"
        } else {
            "Loyalty Program"
        }
    }

    /// Rows of the business metrics table: (metric, value)
    pub fn business_metrics(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "Estimated Recovery Value",
                format_currency(self.advice.recovery_value),
            ),
            ("Retention Action Window", self.advice.window.to_string()),
            ("Prediction Deviation", PREDICTION_DEVIATION.to_string()),
            ("Suggested Strategy", self.strategy().to_string()),
        ]
    }

    pub fn decision(&self) -> String {
        if self.will_churn {
            format!(
                "This customer represents a potential loss of {}. Execute {} retention plan.",
                format_currency(self.advice.recovery_value),
                self.advice.window
            )
        } else {
            format!(
                "Stable revenue stream. Focus on up-selling within the {} window.",
                self.advice.window
            )
        }
    }
}
