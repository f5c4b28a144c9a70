//! Infrastructure - concurrent maps and metrics

mod fqn_cache;
mod metrics;

pub use fqn_cache::FqnCache;
pub use metrics::ProjectionMetrics;
