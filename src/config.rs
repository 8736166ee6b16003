//! Runtime settings shared by the dashboard binaries

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

pub const DEFAULT_DATA_PATH: &str = "data/processed/final_customer_insights.csv";
pub const DEFAULT_PREDICT_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the insights table lives and where the churn service answers
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Path to the pre-computed customer insights CSV
    #[arg(long = "data", global = true, env = "ECOMINSIGHT_DATA", default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Base URL of the churn prediction service
    #[arg(long, global = true, env = "ECOMINSIGHT_PREDICT_URL", default_value = DEFAULT_PREDICT_URL)]
    pub predict_url: String,

    /// Timeout for prediction requests, in seconds; 0 waits indefinitely
    #[arg(long, global = true, env = "ECOMINSIGHT_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            predict_url: DEFAULT_PREDICT_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// `None` when the timeout is disabled with 0
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Full URL of the churn endpoint
    pub fn predict_endpoint(&self) -> String {
        format!("{}/predict/churn", self.predict_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn defaults_match_local_deployment() {
        let harness = Harness::parse_from(["test"]);
        assert_eq!(harness.settings.data_path, PathBuf::from(DEFAULT_DATA_PATH));
        assert_eq!(
            harness.settings.predict_endpoint(),
            "http://127.0.0.1:8000/predict/churn"
        );
        assert_eq!(harness.settings.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn trailing_slash_is_not_doubled() {
        let settings = Settings {
            predict_url: "http://models.internal:9000/".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            settings.predict_endpoint(),
            "http://models.internal:9000/predict/churn"
        );
    }

    #[test]
    fn flags_override_defaults() {
        let harness = Harness::parse_from([
            "test",
            "--data",
            "/tmp/insights.csv",
            "--timeout-secs",
            "5",
        ]);
        assert_eq!(harness.settings.data_path, PathBuf::from("/tmp/insights.csv"));
        assert_eq!(harness.settings.timeout_secs, 5);
    }

    #[test]
    fn zero_timeout_disables_it() {
        let harness = Harness::parse_from(["test", "--timeout-secs", "0"]);
        assert_eq!(harness.settings.timeout(), None);
    }
}
