//! Preset configurations
//!
//! A preset picks which synthesis passes run by default.

use super::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisPreset {
    /// Extension methods only
    Minimal,

    /// Extension methods, properties, optional parameters and type aliases
    Standard,

    /// Every pass, delegation linking included
    Full,
}

impl SynthesisPreset {
    pub fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "standard" => Ok(Self::Standard),
            "full" => Ok(Self::Full),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "standard",
            Self::Full => "full",
        }
    }
}

impl Default for SynthesisPreset {
    fn default() -> Self {
        Self::Full
    }
}

impl std::fmt::Display for SynthesisPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parsing() {
        assert_eq!(SynthesisPreset::from_str("minimal").unwrap(), SynthesisPreset::Minimal);
        assert_eq!(SynthesisPreset::from_str("STANDARD").unwrap(), SynthesisPreset::Standard);
        assert_eq!(SynthesisPreset::from_str("full").unwrap(), SynthesisPreset::Full);
        assert!(matches!(
            SynthesisPreset::from_str("turbo"),
            Err(ConfigError::UnknownPreset(name)) if name == "turbo"
        ));
    }

    #[test]
    fn test_preset_display() {
        assert_eq!(SynthesisPreset::Minimal.to_string(), "minimal");
        assert_eq!(SynthesisPreset::default().to_string(), "full");
    }
}
