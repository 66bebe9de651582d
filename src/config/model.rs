// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Engine configuration as read from `Taskchain.toml`.
///
/// ```toml
/// [engine]
/// poll_interval_ms = 100
/// debounce_ms = 100
/// capture_output = true
/// base_dir = "."
///
/// [watch]
/// use_hash = false
///
/// [signals]
/// intercept = ["quit"]
/// ```
///
/// All sections are optional and have reasonable defaults. Semantic checks
/// happen in the conversion to [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEngineConfig {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub signals: SignalsSection,
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// How often the watcher polls watched files.
    #[serde(default = "default_interval_ms")]
    pub poll_interval_ms: u64,

    /// Window in which change events are coalesced into one run.
    #[serde(default = "default_interval_ms")]
    pub debounce_ms: u64,

    /// Whether Exec payloads carry the captured stdout.
    #[serde(default = "default_capture_output")]
    pub capture_output: bool,

    /// Directory runs start from; relative paths are resolved against the
    /// process working directory. Defaults to the working directory itself.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

fn default_interval_ms() -> u64 {
    100
}

fn default_capture_output() -> bool {
    true
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_interval_ms(),
            debounce_ms: default_interval_ms(),
            capture_output: default_capture_output(),
            base_dir: None,
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Drop change events whose file content hash did not change.
    #[serde(default)]
    pub use_hash: bool,
}

/// `[signals]` section.
///
/// Signal names stay strings here so that a typo is reported with the list
/// of accepted names rather than a generic serde error.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalsSection {
    #[serde(default = "default_intercept")]
    pub intercept: Vec<String>,
}

fn default_intercept() -> Vec<String> {
    vec!["quit".to_string()]
}

impl Default for SignalsSection {
    fn default() -> Self {
        Self {
            intercept: default_intercept(),
        }
    }
}
