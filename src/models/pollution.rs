use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

/// Pollutant concentrations reported by the air quality API.
///
/// All values are measured in micrograms per cubic metre and must be
/// non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PollutantComponents {
    #[validate(range(min = 0.0, message = "concentration cannot be negative"))]
    pub co: f64,

    #[validate(range(min = 0.0, message = "concentration cannot be negative"))]
    pub no: f64,

    #[validate(range(min = 0.0, message = "concentration cannot be negative"))]
    pub no2: f64,

    #[validate(range(min = 0.0, message = "concentration cannot be negative"))]
    pub o3: f64,

    #[validate(range(min = 0.0, message = "concentration cannot be negative"))]
    pub so2: f64,

    #[validate(range(min = 0.0, message = "concentration cannot be negative"))]
    pub pm2_5: f64,

    #[validate(range(min = 0.0, message = "concentration cannot be negative"))]
    pub pm10: f64,

    #[validate(range(min = 0.0, message = "concentration cannot be negative"))]
    pub nh3: f64,
}

/// Overall air quality index, from 1 (good) to 5 (very poor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AqiMain {
    #[validate(range(min = 1, max = 5, message = "aqi must be between 1 and 5"))]
    pub aqi: i64,
}

/// A complete, schema-conformant air pollution measurement.
///
/// The timestamp is bounded to a plausible epoch range (roughly the years
/// 2000 through 2050); anything outside that window is treated as corrupt
/// upstream data rather than silently accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AirPollutionRecord {
    #[validate(range(
        min = 946681200i64,
        max = 2524604400i64,
        message = "timestamp outside plausible range"
    ))]
    pub dt: i64,

    #[validate(nested)]
    pub main: AqiMain,

    #[validate(nested)]
    pub components: PollutantComponents,
}

impl AirPollutionRecord {
    /// Serialization-ready mapping with the upstream field layout.
    pub fn to_json(&self) -> Value {
        json!({
            "dt": self.dt,
            "main": { "aqi": self.main.aqi },
            "components": {
                "co": self.components.co,
                "no": self.components.no,
                "no2": self.components.no2,
                "o3": self.components.o3,
                "so2": self.components.so2,
                "pm2_5": self.components.pm2_5,
                "pm10": self.components.pm10,
                "nh3": self.components.nh3,
            },
        })
    }
}
