pub mod pollution;
pub mod quarantine;

pub use pollution::{AirPollutionRecord, AqiMain, PollutantComponents};
pub use quarantine::{
    BatchStatus, FieldError, QuarantineMetadata, QuarantinePayload, QuarantineRecord,
};
