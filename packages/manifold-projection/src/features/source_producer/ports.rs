//! Ports - producer interface consumed by the projection cache

use crate::features::projection_cache::Resolution;
use crate::shared::models::Fqn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// How a producer's output combines with other producers of the same FQN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProducerKind {
    /// Supplies the complete type; must be the only claimant
    Primary,
    /// Refines the previous producer's output
    Partial,
    /// Contributes extension classes to an existing type
    Supplemental,
}

impl ProducerKind {
    /// Lower ranks are consulted first
    pub fn priority(&self) -> u8 {
        match self {
            ProducerKind::Primary => 0,
            ProducerKind::Partial => 1,
            ProducerKind::Supplemental => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProduceError {
    #[error("Type not produced: {0}")]
    NotFound(Fqn),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Producer failed: {0}")]
    Failed(String),
}

/// Lookups available to a producer while it runs. Lookups made here go
/// through the same reentrancy scope as the build that invoked the producer.
pub trait TypeLookup {
    fn lookup(&self, fqn: &str) -> Resolution;
}

/// External component mapping FQNs to generated source text
pub trait SourceProducer: Send + Sync {
    /// Human-readable name used in logs and diagnostics
    fn name(&self) -> &str;

    fn kind(&self) -> ProducerKind;

    /// Whether this producer claims `fqn` (top-level or nested)
    fn is_type(&self, fqn: &Fqn) -> bool;

    /// Whether `fqn` names a top-level type rather than a nested one
    fn is_top_level_type(&self, fqn: &Fqn) -> bool {
        let _ = fqn;
        true
    }

    /// Backing files for navigation and invalidation
    fn find_files_for_type(&self, fqn: &Fqn) -> Vec<PathBuf>;

    /// Source text for a top-level type. Partial producers receive the
    /// previous producer's output as `prior`.
    fn produce(
        &self,
        fqn: &Fqn,
        prior: Option<&str>,
        lookup: &dyn TypeLookup,
    ) -> Result<String, ProduceError>;

    /// Types backed by `file`
    fn types_for_file(&self, file: &Path) -> Vec<Fqn>;

    /// Every type name this producer can supply, for name completion
    fn all_type_names(&self) -> Vec<Fqn> {
        Vec::new()
    }
}
