//! Infrastructure - bundled producer adapters

mod directory_producer;
mod memory_producer;

pub use directory_producer::DirectorySourceProducer;
pub use memory_producer::{InMemorySourceProducer, ProduceHook};
