use crate::error::TidesError;
use crate::tide_data::fetcher::RetryPolicy;
use crate::tide_data::request::{ServiceEndpoint, DEFAULT_DATUM};
use crate::tide_data::stitcher::GapPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings for talking to the data service and assembling datasets.
///
/// Every field has a default, so a config file only needs the fields it
/// changes:
///
/// ```
/// use noaa_tides::{GapPolicy, TidesConfig};
///
/// let config: TidesConfig = serde_json::from_str(r#"{
///     "datum": "MHHW",
///     "gap_policy": "record_gaps",
///     "retry": { "max_attempts": 5 }
/// }"#).unwrap();
/// assert_eq!(config.datum, "MHHW");
/// assert_eq!(config.gap_policy, GapPolicy::RecordGaps);
/// assert_eq!(config.retry.max_attempts, 5);
/// assert_eq!(config.endpoint, TidesConfig::default().endpoint);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TidesConfig {
    #[serde(flatten)]
    pub endpoint: ServiceEndpoint,
    /// Vertical reference for water levels, e.g. `MLLW`.
    pub datum: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub gap_policy: GapPolicy,
}

impl Default for TidesConfig {
    fn default() -> Self {
        Self {
            endpoint: ServiceEndpoint::default(),
            datum: DEFAULT_DATUM.to_string(),
            request_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            gap_policy: GapPolicy::default(),
        }
    }
}

impl TidesConfig {
    /// Reads a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self, TidesError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| TidesError::ConfigRead(path.to_path_buf(), e))?;
        serde_json::from_str(&json).map_err(|e| TidesError::ConfigParse(path.to_path_buf(), e))
    }
}
