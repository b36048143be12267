use std::path::Path;

use config::{Config, File};
use serde::Deserialize;

use crate::error::Result;

/// A geographic location the pipeline runs for.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct City {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Collection of cities loaded from the YAML configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct CitiesConfig {
    pub cities: Vec<City>,
}

impl CitiesConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = Config::builder()
            .add_source(File::from(path.to_path_buf()))
            .build()?;

        Ok(raw.try_deserialize()?)
    }

    pub fn find(&self, name: &str) -> Option<&City> {
        self.cities
            .iter()
            .find(|city| city.name.eq_ignore_ascii_case(name))
    }
}
