//! Session configuration
//!
//! Two levels:
//! - Preset: `ProjectionConfig::preset(SynthesisPreset::Standard)`
//! - YAML: versioned file layering per-pass switches, cache and watcher
//!   options over a preset
//!
//! ```yaml
//! version: 1
//! preset: full
//! synthesis:
//!   delegation: false
//! watch:
//!   debounce_ms: 200
//! ```

pub mod error;
pub mod io;
pub mod preset;
pub mod projection_config;

pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigFileV1, SynthesisPatch};
pub use preset::SynthesisPreset;
pub use projection_config::{CacheOptions, ProjectionConfig, SynthesisToggles, WatchOptions};
