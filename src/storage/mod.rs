pub mod keys;
pub mod object_store;

pub use keys::Partition;
pub use object_store::{LocalObjectStore, MemoryObjectStore, ObjectStore};
