//! Session configuration
//!
//! A preset selects the synthesis passes; YAML can override individual
//! passes and set cache and watcher options.

use super::error::{ConfigError, ConfigResult};
use super::io::{ConfigFileV1, SynthesisPatch};
use super::preset::SynthesisPreset;
use crate::features::augment::SynthesisSettings;
use crate::features::invalidation::WatchConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SUPPORTED_VERSIONS: [u32; 1] = [1];
const MAX_DEBOUNCE_MS: u64 = 10_000;

static METRIC_NAMESPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("namespace pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisToggles {
    pub properties: bool,
    pub delegation: bool,
    pub params: bool,
    pub extensions: bool,
    pub aliases: bool,
}

impl SynthesisToggles {
    pub fn for_preset(preset: SynthesisPreset) -> Self {
        match preset {
            SynthesisPreset::Minimal => Self {
                properties: false,
                delegation: false,
                params: false,
                extensions: true,
                aliases: false,
            },
            SynthesisPreset::Standard => Self {
                properties: true,
                delegation: false,
                params: true,
                extensions: true,
                aliases: true,
            },
            SynthesisPreset::Full => Self {
                properties: true,
                delegation: true,
                params: true,
                extensions: true,
                aliases: true,
            },
        }
    }
}

impl From<SynthesisToggles> for SynthesisSettings {
    fn from(t: SynthesisToggles) -> Self {
        SynthesisSettings {
            properties: t.properties,
            delegation: t.delegation,
            params: t.params,
            extensions: t.extensions,
            aliases: t.aliases,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheOptions {
    /// Export cache metrics through the session registry
    #[serde(default = "enabled")]
    pub metrics: bool,

    /// Prefix of every exported metric name
    #[serde(default = "default_namespace")]
    pub metrics_namespace: String,
}

fn enabled() -> bool {
    true
}

fn default_namespace() -> String {
    "manifold".to_string()
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            metrics: true,
            metrics_namespace: default_namespace(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchOptions {
    pub extensions: Vec<String>,
    pub debounce_ms: u64,
    pub ignore_patterns: Vec<String>,
    pub recursive: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        let defaults = WatchConfig::default();
        Self {
            extensions: defaults.extensions,
            debounce_ms: defaults.debounce_duration.as_millis() as u64,
            ignore_patterns: defaults.ignore_patterns,
            recursive: defaults.recursive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionConfig {
    preset: SynthesisPreset,
    pub synthesis: SynthesisToggles,
    pub cache: CacheOptions,
    pub watch: WatchOptions,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self::preset(SynthesisPreset::default())
    }
}

impl ProjectionConfig {
    pub fn preset(preset: SynthesisPreset) -> Self {
        Self {
            preset,
            synthesis: SynthesisToggles::for_preset(preset),
            cache: CacheOptions::default(),
            watch: WatchOptions::default(),
        }
    }

    pub fn get_preset(&self) -> SynthesisPreset {
        self.preset
    }

    pub fn synthesis(mut self, f: impl FnOnce(&mut SynthesisToggles)) -> Self {
        f(&mut self.synthesis);
        self
    }

    pub fn metrics_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cache.metrics_namespace = namespace.into();
        self
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;
        let version = file.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let mut config = Self::preset(SynthesisPreset::from_str(&file.preset)?);
        if let Some(patch) = &file.synthesis {
            patch.apply(&mut config.synthesis);
        }
        if let Some(cache) = file.cache {
            config.cache = cache;
        }
        if let Some(watch) = file.watch {
            config.watch = watch;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: Some(1),
            preset: self.preset.to_string(),
            synthesis: Some(SynthesisPatch::from(&self.synthesis)),
            cache: Some(self.cache.clone()),
            watch: Some(self.watch.clone()),
        };
        serde_yaml::to_string(&file).map_err(ConfigError::Yaml)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.watch.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::range_with_hint(
                "watch.debounce_ms",
                self.watch.debounce_ms,
                0,
                MAX_DEBOUNCE_MS,
                "Long debounce windows delay invalidation",
            ));
        }
        if let Some(ext) = self.watch.extensions.iter().find(|e| e.is_empty() || e.starts_with('.')) {
            return Err(ConfigError::invalid(
                "watch.extensions",
                format!("'{}' must be a bare extension such as 'java'", ext),
            ));
        }
        if !METRIC_NAMESPACE.is_match(&self.cache.metrics_namespace) {
            return Err(ConfigError::invalid(
                "cache.metrics_namespace",
                format!("'{}' is not a valid metric name prefix", self.cache.metrics_namespace),
            ));
        }
        Ok(())
    }

    pub fn synthesis_settings(&self) -> SynthesisSettings {
        self.synthesis.into()
    }

    /// Watcher settings for a project rooted at `root`
    pub fn watch_config(&self, root: impl Into<PathBuf>) -> WatchConfig {
        WatchConfig {
            root_path: root.into(),
            extensions: self.watch.extensions.clone(),
            debounce_duration: Duration::from_millis(self.watch.debounce_ms),
            ignore_patterns: self.watch.ignore_patterns.clone(),
            recursive: self.watch.recursive,
        }
    }
}
