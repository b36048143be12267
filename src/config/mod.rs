pub mod cities;
pub mod settings;

pub use cities::{CitiesConfig, City};
pub use settings::{ApiSettings, QualitySettings, Settings, StorageSettings, WarehouseSettings};
