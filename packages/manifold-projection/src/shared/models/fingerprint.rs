//! Content fingerprints (Blake3)

use serde::{Deserialize, Serialize};

/// Blake3 digest of the producer text a declaration was parsed from
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn compute(content: &[u8]) -> Self {
        Self(*blake3::hash(content).as_bytes())
    }

    /// Zero fingerprint (for testing)
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}
