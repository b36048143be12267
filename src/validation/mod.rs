pub mod gate;
pub mod record;

pub use gate::{QualityGate, ValidationResult};
pub use record::validate_record;
