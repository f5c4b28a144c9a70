//! Source producers
//!
//! Producers map FQNs to generated source text. The core consumes them
//! through the `SourceProducer` port; two adapters ship with the crate.

pub mod infrastructure;
pub mod ports;

pub use infrastructure::{DirectorySourceProducer, InMemorySourceProducer, ProduceHook};
pub use ports::{ProduceError, ProducerKind, SourceProducer, TypeLookup};
