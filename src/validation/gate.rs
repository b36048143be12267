use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::QuarantineRecord;
use crate::utils::constants::{DEFAULT_DQ_MIN_FAILED_ITEMS, DEFAULT_DQ_THRESHOLD_PERCENT};
use crate::validation::record::validate_record;

/// Aggregate output of validating one batch.
///
/// Both sequences preserve the input batch order. `ts_validation` is shared
/// by every quarantine entry produced in the batch.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub valid_records: Vec<Value>,
    pub quarantine_records: Vec<QuarantineRecord>,
    pub ts_validation: String,
    pub is_critical_failure: bool,
    pub failure_reason: String,
}

/// Data quality gate deciding whether a batch's error rate is tolerable.
///
/// A batch fails critically when the failure rate breaches the threshold AND
/// at least `min_failed_items` records failed, or when no record at all
/// survived validation. The absolute-count condition guards small batches
/// where a single bad record would look like a catastrophic rate.
#[derive(Debug, Clone)]
pub struct QualityGate {
    threshold_percent: f64,
    min_failed_items: usize,
}

impl QualityGate {
    pub fn new(threshold_percent: f64, min_failed_items: usize) -> Self {
        Self {
            threshold_percent,
            min_failed_items,
        }
    }

    /// Validate an ordered batch of raw records.
    ///
    /// Deterministic and free of I/O; the only environmental input is the
    /// shared validation timestamp.
    pub fn validate_batch(&self, raw_records: &[Value]) -> ValidationResult {
        debug!("Starting validation for batch of {} records", raw_records.len());

        let ts_validation = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false);
        let total_count = raw_records.len();

        if total_count == 0 {
            warn!("Received empty batch for validation");
            return ValidationResult {
                valid_records: Vec::new(),
                quarantine_records: Vec::new(),
                ts_validation,
                is_critical_failure: false,
                failure_reason: String::new(),
            };
        }

        let mut valid_records = Vec::new();
        let mut quarantine_records = Vec::new();

        for record in raw_records {
            match validate_record(record) {
                Ok(validated) => valid_records.push(validated.to_json()),
                Err(errors) => {
                    debug!(?errors, "Validation failed for record: {record}");
                    quarantine_records.push(QuarantineRecord {
                        error: errors,
                        raw: record.clone(),
                        ts: ts_validation.clone(),
                    });
                }
            }
        }

        let failed_count = quarantine_records.len();
        let failure_rate = (failed_count as f64 / total_count as f64) * 100.0;

        info!(
            "Validation stats: Total={}, Valid={}, Failed={} ({:.2}%)",
            total_count,
            valid_records.len(),
            failed_count,
            failure_rate
        );

        let is_failure_rate_high = failure_rate > self.threshold_percent;
        let is_absolute_count_high = failed_count >= self.min_failed_items;

        // Zero valid output is never acceptable, regardless of absolute count.
        let is_total_failure = valid_records.is_empty();

        let is_critical = (is_failure_rate_high && is_absolute_count_high) || is_total_failure;

        let failure_reason = if is_critical {
            format!(
                "Threshold exceeded: {:.2}% failures (Threshold: {}%, MinItems: {})",
                failure_rate, self.threshold_percent, self.min_failed_items
            )
        } else {
            String::new()
        };

        ValidationResult {
            valid_records,
            quarantine_records,
            ts_validation,
            is_critical_failure: is_critical,
            failure_reason,
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(DEFAULT_DQ_THRESHOLD_PERCENT, DEFAULT_DQ_MIN_FAILED_ITEMS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_raw() -> Value {
        json!({
            "dt": 1_606_482_000,
            "main": {"aqi": 2},
            "components": {
                "co": 200.0, "no": 10.0, "no2": 10.0, "o3": 10.0,
                "so2": 10.0, "pm2_5": 10.0, "pm10": 10.0, "nh3": 10.0
            }
        })
    }

    fn invalid_raw() -> Value {
        json!({"dt": 1_606_482_000, "main": {"aqi": "NOT_AN_INT"}})
    }

    fn batch(valid: usize, invalid: usize) -> Vec<Value> {
        let mut records = vec![valid_raw(); valid];
        records.extend(vec![invalid_raw(); invalid]);
        records
    }

    #[test]
    fn test_empty_batch_is_not_critical() {
        let result = QualityGate::default().validate_batch(&[]);

        assert!(result.valid_records.is_empty());
        assert!(result.quarantine_records.is_empty());
        assert!(!result.is_critical_failure);
        assert!(result.failure_reason.is_empty());
        assert!(!result.ts_validation.is_empty());
    }

    #[test]
    fn test_counts_are_conserved() {
        let result = QualityGate::default().validate_batch(&batch(18, 2));

        assert_eq!(result.valid_records.len(), 18);
        assert_eq!(result.quarantine_records.len(), 2);
        // 10% < 20% and 2 < 5
        assert!(!result.is_critical_failure);
        assert!(result.failure_reason.is_empty());
        assert!(result
            .quarantine_records
            .iter()
            .all(|q| q.ts == result.ts_validation && !q.error.is_empty()));
    }

    #[test]
    fn test_rate_breach_without_count_breach_passes() {
        // 40% > 20% but only 4 failed items (< 5): both conditions required
        let result = QualityGate::new(20.0, 5).validate_batch(&batch(6, 4));

        assert!(!result.is_critical_failure);
        assert!(result.failure_reason.is_empty());
    }

    #[test]
    fn test_both_breaches_are_critical() {
        // 50% > 20% and 6 >= 5
        let result = QualityGate::new(20.0, 5).validate_batch(&batch(6, 6));

        assert!(result.is_critical_failure);
        assert!(result.failure_reason.contains("Threshold exceeded"));
        assert!(result.failure_reason.contains("50.00%"));
        assert!(result.failure_reason.contains("MinItems: 5"));
    }

    #[test]
    fn test_count_breach_without_rate_breach_passes() {
        // 6 failed >= 5 but 6% < 20%
        let result = QualityGate::new(20.0, 5).validate_batch(&batch(94, 6));

        assert!(!result.is_critical_failure);
    }

    #[test]
    fn test_total_wipeout_is_always_critical() {
        // One bad record out of one: below min_failed_items but zero valid output
        let result = QualityGate::new(20.0, 5).validate_batch(&batch(0, 1));

        assert!(result.is_critical_failure);
        assert!(result.failure_reason.contains("100.00%"));
    }

    #[test]
    fn test_order_is_preserved() {
        let records = vec![valid_raw(), invalid_raw(), valid_raw(), invalid_raw()];
        let mut tagged = Vec::new();
        for (i, mut record) in records.into_iter().enumerate() {
            record["dt"] = json!(1_606_482_000 + i as i64);
            tagged.push(record);
        }

        let result = QualityGate::default().validate_batch(&tagged);

        let valid_ts: Vec<i64> = result
            .valid_records
            .iter()
            .map(|r| r["dt"].as_i64().unwrap())
            .collect();
        let quarantined_ts: Vec<i64> = result
            .quarantine_records
            .iter()
            .map(|q| q.raw["dt"].as_i64().unwrap())
            .collect();

        assert_eq!(valid_ts, vec![1_606_482_000, 1_606_482_002]);
        assert_eq!(quarantined_ts, vec![1_606_482_001, 1_606_482_003]);
    }

    #[test]
    fn test_valid_records_are_normalized_mappings() {
        let mut raw = valid_raw();
        raw["main"]["aqi"] = json!("4");

        let result = QualityGate::default().validate_batch(&[raw]);

        assert_eq!(result.valid_records[0]["main"]["aqi"], json!(4));
    }
}
