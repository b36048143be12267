/// Storage tier prefixes
pub const BRONZE_VALID_PREFIX: &str = "bronze/air_pollution";
pub const BRONZE_QUARANTINE_PREFIX: &str = "bronze/air_pollution_quarantine";
pub const SILVER_PREFIX: &str = "silver/air_pollution";

/// Timestamp plausibility bounds (approx. years 2000-2050)
pub const MIN_TIMESTAMP: i64 = 946_681_200;
pub const MAX_TIMESTAMP: i64 = 2_524_604_400;

/// AQI category bounds
pub const MIN_AQI: i64 = 1;
pub const MAX_AQI: i64 = 5;

/// Data quality gate defaults
pub const DEFAULT_DQ_THRESHOLD_PERCENT: f64 = 20.0;
pub const DEFAULT_DQ_MIN_FAILED_ITEMS: usize = 5;

/// Default extraction interval length
pub const DAY_SECONDS: i64 = 86_400;

/// OpenWeather air pollution history endpoint
pub const DEFAULT_API_BASE_URL: &str =
    "https://api.openweathermap.org/data/2.5/air_pollution/history";

/// Warehouse table name
pub const WAREHOUSE_TABLE: &str = "air_pollution";
