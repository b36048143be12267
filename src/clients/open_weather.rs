use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::error::{PipelineError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 5;
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(16);

/// Raw history response: the record list plus every other top-level field
/// (`coord` and friends) preserved verbatim for the bronze payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub list: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// API capability consumed by the extraction stage.
#[async_trait]
pub trait AirPollutionApi: Send + Sync {
    /// Fetch historical air pollution data for a location and time range.
    ///
    /// Errors are transport-level and fatal; retry policy lives inside the
    /// implementation, not in the caller.
    async fn fetch_history(
        &self,
        city: &str,
        lat: f64,
        lon: f64,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<HistoryResponse>;
}

/// HTTP client for the OpenWeatherMap air pollution history endpoint.
///
/// Retries server errors and transport failures with exponential backoff
/// (1s, 2s, 4s, 8s, 16s); client errors fail immediately.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn backoff_delay(attempt: u32) -> Duration {
        BACKOFF_BASE
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(BACKOFF_CAP)
    }
}

#[async_trait]
impl AirPollutionApi for OpenWeatherClient {
    async fn fetch_history(
        &self,
        city: &str,
        lat: f64,
        lon: f64,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<HistoryResponse> {
        info!(
            "Fetching air pollution data for {city} (lat={lat}, lon={lon}), \
             time range={start_ts}-{end_ts}"
        );

        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("start", start_ts.to_string()),
            ("end", end_ts.to_string()),
            ("appid", self.api_key.clone()),
        ];

        let mut attempt = 0;
        loop {
            let outcome = self.http.get(&self.base_url).query(&query).send().await;

            match outcome {
                Ok(response) if response.status().is_server_error() && attempt < MAX_RETRIES => {
                    warn!(
                        "Server error {} from API, retrying (attempt {}/{MAX_RETRIES})",
                        response.status(),
                        attempt + 1
                    );
                }
                Ok(response) if !response.status().is_success() => {
                    let status = response.status().as_u16();
                    let message = response.text().await.unwrap_or_default();
                    error!("HTTP error from OpenWeatherMap API: {status} - {message}");
                    return Err(PipelineError::Api { status, message });
                }
                Ok(response) => return Ok(response.json::<HistoryResponse>().await?),
                Err(err) if attempt < MAX_RETRIES && (err.is_timeout() || err.is_connect()) => {
                    warn!("Network error while fetching air pollution data: {err}, retrying");
                }
                Err(err) => {
                    error!("Network error while fetching air pollution data: {err}");
                    return Err(err.into());
                }
            }

            tokio::time::sleep(Self::backoff_delay(attempt)).await;
            attempt += 1;
        }
    }
}
