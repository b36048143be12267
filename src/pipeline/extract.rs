use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::clients::AirPollutionApi;
use crate::error::Result;
use crate::models::{BatchStatus, QuarantineMetadata, QuarantinePayload};
use crate::storage::{ObjectStore, Partition};
use crate::validation::QualityGate;

/// Terminal outcome of one extraction invocation.
///
/// The calling scheduler inspects the variant: `Skipped` marks the unit
/// intentionally inactive (nothing fetched, nothing written), while
/// `CriticalFailure` stops the pipeline for this city after the quarantine
/// evidence has been persisted. Transport and storage errors are not
/// outcomes; they propagate as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Stored { key: String },
    Skipped,
    CriticalFailure { reason: String },
}

/// Parameters of one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    pub start_ts: i64,
    pub end_ts: i64,
    pub logical_date: DateTime<Utc>,
}

/// Extraction orchestrator: fetch, quality-gate, persist.
pub struct Extractor<A, S> {
    api: A,
    store: S,
    gate: QualityGate,
}

impl<A: AirPollutionApi, S: ObjectStore> Extractor<A, S> {
    pub fn new(api: A, store: S, gate: QualityGate) -> Self {
        Self { api, store, gate }
    }

    /// Extract historical air pollution data for one city and persist it to
    /// the bronze layer.
    ///
    /// Side effects are ordered: the quarantine write (or its idempotent
    /// cleanup) always happens before a critical failure is signalled and
    /// before the valid payload is written, so failure evidence survives the
    /// failure.
    pub async fn extract_and_store(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome> {
        let ExtractionRequest {
            city,
            lat,
            lon,
            start_ts,
            end_ts,
            logical_date,
        } = request;

        info!("Starting data extraction for city='{city}' (lat={lat}, lon={lon})");
        debug!("Time range: start_ts={start_ts}, end_ts={end_ts}");

        let data = self
            .api
            .fetch_history(city, *lat, *lon, *start_ts, *end_ts)
            .await?;

        if data.list.is_empty() {
            warn!("API returned empty result for lat:{lat}, lon:{lon}");
            return Ok(ExtractionOutcome::Skipped);
        }

        info!("Retrieved {} raw records from API", data.list.len());

        let validation = self.gate.validate_batch(&data.list);

        info!(
            "Validation outcome: valid={}, quarantined={}, critical={}",
            validation.valid_records.len(),
            validation.quarantine_records.len(),
            validation.is_critical_failure,
        );

        let partition = Partition::new(city, *logical_date);
        let quarantine_key = partition.quarantine_key();

        if validation.quarantine_records.is_empty() {
            info!("No quarantined records; removing prior quarantine artifact if it exists");
            self.store.delete(&quarantine_key).await?;
        } else {
            info!(
                "Writing {} quarantined records",
                validation.quarantine_records.len()
            );
            let status = if validation.is_critical_failure {
                BatchStatus::CriticalFailure
            } else {
                BatchStatus::PartialFailure
            };
            let quarantine_payload = QuarantinePayload {
                metadata: QuarantineMetadata {
                    status,
                    failure_reason: validation.failure_reason.clone(),
                    processed_at: validation.ts_validation.clone(),
                },
                records: validation.quarantine_records,
            };

            self.store
                .put_json(&serde_json::to_value(&quarantine_payload)?, &quarantine_key)
                .await?;
        }

        if validation.is_critical_failure {
            error!(
                "Pipeline stopped due to data quality issues: {}",
                validation.failure_reason
            );
            return Ok(ExtractionOutcome::CriticalFailure {
                reason: validation.failure_reason,
            });
        }

        let valid_key = partition.valid_key();

        let mut valid_payload = data.extra.clone();
        valid_payload.insert("list".to_string(), Value::Array(validation.valid_records));
        valid_payload.insert("metadata".to_string(), json!({"status": BatchStatus::Valid}));

        self.store
            .put_json(&Value::Object(valid_payload), &valid_key)
            .await?;
        info!("Successfully saved valid data to storage: {valid_key}");

        Ok(ExtractionOutcome::Stored { key: valid_key })
    }
}
