use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::utils::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_DQ_MIN_FAILED_ITEMS, DEFAULT_DQ_THRESHOLD_PERCENT,
};

/// Explicit pipeline configuration, passed into the stages rather than read
/// from ambient globals.
///
/// Values come from an optional settings file overridden by environment
/// variables with the `AIRPOL` prefix (e.g. `AIRPOL__API__KEY`,
/// `AIRPOL__STORAGE__ROOT`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub warehouse: WarehouseSettings,

    #[serde(default)]
    pub quality: QualitySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Root directory acting as the bucket for the partitioned layout.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseSettings {
    #[serde(default = "default_warehouse_path")]
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QualitySettings {
    #[serde(default = "default_threshold")]
    pub threshold_percent: f64,

    #[serde(default = "default_min_failed")]
    pub min_failed_items: usize,
}

impl Settings {
    /// Load settings from `pipeline.{toml,yml,...}` (or an explicit file)
    /// plus `AIRPOL`-prefixed environment variables.
    pub fn load(settings_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match settings_file {
            Some(path) => builder.add_source(File::from(path.to_path_buf())),
            None => builder.add_source(File::with_name("pipeline").required(false)),
        };

        let raw = builder
            .add_source(
                Environment::with_prefix("AIRPOL")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(raw.try_deserialize()?)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            key: String::new(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            db_path: default_warehouse_path(),
        }
    }
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            threshold_percent: default_threshold(),
            min_failed_items: default_min_failed(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_warehouse_path() -> PathBuf {
    PathBuf::from("data/warehouse.duckdb")
}

fn default_threshold() -> f64 {
    DEFAULT_DQ_THRESHOLD_PERCENT
}

fn default_min_failed() -> usize {
    DEFAULT_DQ_MIN_FAILED_ITEMS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.storage.root, PathBuf::from("data"));
        assert_eq!(settings.quality.threshold_percent, 20.0);
        assert_eq!(settings.quality.min_failed_items, 5);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[api]\nkey = \"secret\"\n\n[quality]\nthreshold_percent = 10.0\n"
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();

        assert_eq!(settings.api.key, "secret");
        assert_eq!(settings.quality.threshold_percent, 10.0);
        // Untouched sections keep their defaults
        assert_eq!(settings.quality.min_failed_items, 5);
        assert_eq!(settings.api.base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_missing_default_file_is_fine() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.quality.min_failed_items, 5);
    }
}
