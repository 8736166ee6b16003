//! Client for the external churn prediction service

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::Settings;
use crate::error::{DashboardError, Result};

/// Customer profile submitted to `POST /predict/churn`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub frequency: u32,
    pub monetary: f64,
    pub tenure: u32,
    pub return_rate: f64,
    pub avg_discount: f64,
    pub avg_quantity: u32,
}

impl Default for PredictionRequest {
    fn default() -> Self {
        Self {
            frequency: 5,
            monetary: 250.0,
            tenure: 120,
            return_rate: 0.05,
            avg_discount: 0.10,
            avg_quantity: 2,
        }
    }
}

impl PredictionRequest {
    /// Apply the same bounds the input form enforces
    pub fn validate(&self) -> Result<()> {
        if self.frequency < 1 {
            return Err(DashboardError::invalid("frequency", "must be at least 1"));
        }
        if !self.monetary.is_finite() || self.monetary < 0.0 {
            return Err(DashboardError::invalid("monetary", "must be a non-negative amount"));
        }
        if self.tenure < 1 {
            return Err(DashboardError::invalid("tenure", "must be at least 1 day"));
        }
        check_unit_interval("return_rate", self.return_rate)?;
        check_unit_interval("avg_discount", self.avg_discount)?;
        if self.avg_quantity < 1 {
            return Err(DashboardError::invalid("avg_quantity", "must be at least 1"));
        }
        Ok(())
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DashboardError::invalid(field, "must be between 0 and 1"))
    }
}

/// Answer from the churn service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub churn_risk_score: f64,
    pub will_churn: bool,
}

/// Thin wrapper over the churn endpoint; no retry, no caching
#[derive(Debug, Clone)]
pub struct PredictionClient {
    client: Client,
    endpoint: String,
}

impl PredictionClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_endpoint(settings.predict_endpoint(), settings.timeout())
    }

    /// A `None` timeout leaves the request unbounded
    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        debug!(endpoint = %self.endpoint, ?request, "requesting churn prediction");

        let result = self.send(request).await;
        if let Err(ref err) = result {
            error!(endpoint = %self.endpoint, %err, "churn prediction failed");
        }
        result
    }

    async fn send(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DashboardError::Prediction(format!(
                "service returned {}: {}",
                status,
                body.trim()
            )));
        }

        let body = response.text().await?;
        let parsed: PredictionResponse = serde_json::from_str(&body).map_err(|e| {
            DashboardError::Prediction(format!("invalid response body: {}", e))
        })?;

        if !(0.0..=1.0).contains(&parsed.churn_risk_score) {
            return Err(DashboardError::Prediction(format!(
                "churn_risk_score out of range: {}",
                parsed.churn_risk_score
            )));
        }

        Ok(parsed)
    }
}
