//! YAML schema types
//!
//! Loading and validation live in `projection_config.rs`.

use super::projection_config::{CacheOptions, SynthesisToggles, WatchOptions};
use serde::{Deserialize, Serialize};

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileV1 {
    /// Schema version; only `1` is accepted
    pub version: Option<u32>,

    #[serde(default = "default_preset")]
    pub preset: String,

    /// Per-pass switches layered over the preset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<SynthesisPatch>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheOptions>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch: Option<WatchOptions>,
}

fn default_preset() -> String {
    "full".to_string()
}

/// Partial synthesis switches; unset fields keep the preset's value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthesisPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<bool>,
}

impl SynthesisPatch {
    pub fn apply(&self, toggles: &mut SynthesisToggles) {
        if let Some(v) = self.properties {
            toggles.properties = v;
        }
        if let Some(v) = self.delegation {
            toggles.delegation = v;
        }
        if let Some(v) = self.params {
            toggles.params = v;
        }
        if let Some(v) = self.extensions {
            toggles.extensions = v;
        }
        if let Some(v) = self.aliases {
            toggles.aliases = v;
        }
    }
}

impl From<&SynthesisToggles> for SynthesisPatch {
    fn from(toggles: &SynthesisToggles) -> Self {
        Self {
            properties: Some(toggles.properties),
            delegation: Some(toggles.delegation),
            params: Some(toggles.params),
            extensions: Some(toggles.extensions),
            aliases: Some(toggles.aliases),
        }
    }
}
