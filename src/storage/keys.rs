use chrono::{DateTime, Datelike, Utc};

use crate::utils::constants::{BRONZE_QUARANTINE_PREFIX, BRONZE_VALID_PREFIX, SILVER_PREFIX};

/// Deterministic storage partition for one (city, logical date) pair.
///
/// The same inputs always produce the same key strings, which makes writes
/// overwritable and deletions safely re-runnable. The valid and quarantine
/// keys differ only by their leading segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    city: String,
    date_path: String,
    epoch_seconds: i64,
}

impl Partition {
    pub fn new(city: &str, logical_date: DateTime<Utc>) -> Self {
        Self {
            city: city.to_string(),
            date_path: format!(
                "year={}/month={:02}/day={:02}",
                logical_date.year(),
                logical_date.month(),
                logical_date.day()
            ),
            epoch_seconds: logical_date.timestamp(),
        }
    }

    /// Bronze-layer key for the validated payload.
    pub fn valid_key(&self) -> String {
        format!(
            "{BRONZE_VALID_PREFIX}/city={}/{}/{}.json",
            self.city, self.date_path, self.epoch_seconds
        )
    }

    /// Bronze-layer key for the quarantine payload.
    pub fn quarantine_key(&self) -> String {
        format!(
            "{BRONZE_QUARANTINE_PREFIX}/city={}/{}/{}.json",
            self.city, self.date_path, self.epoch_seconds
        )
    }

    /// Silver-layer key for the transformed Parquet artifact.
    pub fn silver_key(&self) -> String {
        format!(
            "{SILVER_PREFIX}/city={}/{}/{}.parquet",
            self.city, self.date_path, self.epoch_seconds
        )
    }
}
