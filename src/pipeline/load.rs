use std::path::Path;

use duckdb::{params, Connection};
use tracing::info;

use crate::error::Result;
use crate::pipeline::transform::PollutionRow;
use crate::utils::constants::WAREHOUSE_TABLE;

/// Loads silver-layer rows into the warehouse `air_pollution` table.
///
/// Loading deletes the (city, dt range) slice covered by the incoming rows
/// before inserting, inside one transaction, so re-running a partition
/// replaces it instead of duplicating it.
pub struct WarehouseLoader {
    conn: Connection,
}

impl WarehouseLoader {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::initialize(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {WAREHOUSE_TABLE} (
                city VARCHAR NOT NULL,
                dt BIGINT NOT NULL,
                measured_at TIMESTAMPTZ NOT NULL,
                aqi BIGINT NOT NULL,
                aqi_interpretation VARCHAR NOT NULL,
                day_of_week VARCHAR NOT NULL,
                time_of_day VARCHAR NOT NULL,
                co DOUBLE NOT NULL,
                no DOUBLE NOT NULL,
                no2 DOUBLE NOT NULL,
                o3 DOUBLE NOT NULL,
                so2 DOUBLE NOT NULL,
                pm2_5 DOUBLE NOT NULL,
                pm10 DOUBLE NOT NULL,
                nh3 DOUBLE NOT NULL
            );"
        ))?;

        Ok(Self { conn })
    }

    /// Replace the (city, covered dt range) slice with the given rows.
    ///
    /// Returns the number of rows inserted.
    pub fn load(&mut self, rows: &[PollutionRow], city: &str) -> Result<usize> {
        if rows.is_empty() {
            info!("No rows to load for city={city}");
            return Ok(0);
        }

        let min_dt = rows.iter().map(|r| r.dt).min().unwrap_or(i64::MIN);
        let max_dt = rows.iter().map(|r| r.dt).max().unwrap_or(i64::MAX);

        let tx = self.conn.transaction()?;

        let deleted = tx.execute(
            &format!("DELETE FROM {WAREHOUSE_TABLE} WHERE city = ? AND dt >= ? AND dt <= ?"),
            params![city, min_dt, max_dt],
        )?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {WAREHOUSE_TABLE} VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ))?;
            for row in rows {
                stmt.execute(params![
                    row.city,
                    row.dt,
                    row.measured_at.to_rfc3339(),
                    row.aqi,
                    row.aqi_interpretation,
                    row.day_of_week,
                    row.time_of_day,
                    row.co,
                    row.no,
                    row.no2,
                    row.o3,
                    row.so2,
                    row.pm2_5,
                    row.pm10,
                    row.nh3,
                ])?;
            }
        }

        tx.commit()?;

        info!(
            "Loaded {} rows for city={city} (replaced {deleted} prior rows in dt range {min_dt}-{max_dt})",
            rows.len()
        );

        Ok(rows.len())
    }

    /// Number of warehouse rows for one city.
    pub fn count_for_city(&self, city: &str) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {WAREHOUSE_TABLE} WHERE city = ?"),
            params![city],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_rows(city: &str, base_dt: i64, count: usize) -> Vec<PollutionRow> {
        (0..count)
            .map(|i| {
                let dt = base_dt + (i as i64) * 3_600;
                let measured_at = Utc.timestamp_opt(dt, 0).single().unwrap();
                PollutionRow {
                    city: city.to_string(),
                    dt,
                    measured_at,
                    aqi: 2,
                    aqi_interpretation: "fair".to_string(),
                    day_of_week: measured_at.format("%A").to_string(),
                    time_of_day: measured_at.format("%H:%M").to_string(),
                    co: 200.0,
                    no: 0.1,
                    no2: 8.0,
                    o3: 60.0,
                    so2: 1.0,
                    pm2_5: 5.0,
                    pm10: 8.0,
                    nh3: 0.5,
                }
            })
            .collect()
    }

    #[test]
    fn test_load_inserts_rows() {
        let mut loader = WarehouseLoader::open_in_memory().unwrap();

        let inserted = loader
            .load(&sample_rows("Berlin", 1_606_482_000, 24), "Berlin")
            .unwrap();

        assert_eq!(inserted, 24);
        assert_eq!(loader.count_for_city("Berlin").unwrap(), 24);
    }

    #[test]
    fn test_reload_is_idempotent() {
        let mut loader = WarehouseLoader::open_in_memory().unwrap();
        let rows = sample_rows("Berlin", 1_606_482_000, 24);

        loader.load(&rows, "Berlin").unwrap();
        loader.load(&rows, "Berlin").unwrap();

        // Delete-then-insert replaces the partition instead of duplicating it.
        assert_eq!(loader.count_for_city("Berlin").unwrap(), 24);
    }

    #[test]
    fn test_load_scopes_delete_to_city() {
        let mut loader = WarehouseLoader::open_in_memory().unwrap();

        loader
            .load(&sample_rows("Berlin", 1_606_482_000, 10), "Berlin")
            .unwrap();
        loader
            .load(&sample_rows("Paris", 1_606_482_000, 10), "Paris")
            .unwrap();
        // Same dt range, different city: Berlin rows must survive.
        loader
            .load(&sample_rows("Paris", 1_606_482_000, 10), "Paris")
            .unwrap();

        assert_eq!(loader.count_for_city("Berlin").unwrap(), 10);
        assert_eq!(loader.count_for_city("Paris").unwrap(), 10);
    }

    #[test]
    fn test_empty_load_is_noop() {
        let mut loader = WarehouseLoader::open_in_memory().unwrap();
        assert_eq!(loader.load(&[], "Berlin").unwrap(), 0);
        assert_eq!(loader.count_for_city("Berlin").unwrap(), 0);
    }
}
