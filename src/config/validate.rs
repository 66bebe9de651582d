// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::RawEngineConfig;
use crate::errors::{Result, TaskchainError};
use crate::types::SignalName;

/// Validated engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub capture_output: bool,
    pub base_dir: Option<PathBuf>,
    pub use_hash: bool,
    /// Signals routed to the Signal Bridge of every executed task.
    pub signals: Vec<SignalName>,
}

/// Library defaults. No signals are intercepted; a config file (or its
/// absence, see [`load_or_default`](crate::config::load_or_default)) opts
/// into `quit`.
impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            debounce: Duration::from_millis(100),
            capture_output: true,
            base_dir: None,
            use_hash: false,
            signals: Vec::new(),
        }
    }
}

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = TaskchainError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        let poll_interval = positive_millis("engine.poll_interval_ms", raw.engine.poll_interval_ms)?;
        let debounce = positive_millis("engine.debounce_ms", raw.engine.debounce_ms)?;
        let signals = parse_signals(&raw.signals.intercept)?;

        Ok(EngineConfig {
            poll_interval,
            debounce,
            capture_output: raw.engine.capture_output,
            base_dir: raw.engine.base_dir,
            use_hash: raw.watch.use_hash,
            signals,
        })
    }
}

fn positive_millis(key: &str, value: u64) -> Result<Duration> {
    if value == 0 {
        return Err(TaskchainError::ConfigError(format!(
            "[{key}] must be >= 1 (got 0)"
        )));
    }
    Ok(Duration::from_millis(value))
}

fn parse_signals(names: &[String]) -> Result<Vec<SignalName>> {
    let mut signals = Vec::with_capacity(names.len());
    for name in names {
        let signal: SignalName = name
            .parse()
            .map_err(|e: String| TaskchainError::ConfigError(format!("[signals].intercept: {e}")))?;
        if !signals.contains(&signal) {
            signals.push(signal);
        }
    }
    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<EngineConfig> {
        let raw: RawEngineConfig = toml::from_str(toml_src)?;
        EngineConfig::try_from(raw)
    }

    #[test]
    fn empty_file_gives_defaults_and_intercepts_quit() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.signals, [SignalName::Quit]);
        assert_eq!(
            cfg,
            EngineConfig {
                signals: vec![SignalName::Quit],
                ..EngineConfig::default()
            }
        );
    }

    #[test]
    fn library_default_intercepts_no_signals() {
        assert!(EngineConfig::default().signals.is_empty());
    }

    #[test]
    fn sections_are_applied() {
        let cfg = parse(
            r#"
            [engine]
            poll_interval_ms = 250
            debounce_ms = 50
            capture_output = false
            base_dir = "web"

            [watch]
            use_hash = true

            [signals]
            intercept = ["hup", "quit", "SIGHUP"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_millis(250));
        assert_eq!(cfg.debounce, Duration::from_millis(50));
        assert!(!cfg.capture_output);
        assert_eq!(cfg.base_dir, Some(PathBuf::from("web")));
        assert!(cfg.use_hash);
        assert_eq!(cfg.signals, [SignalName::Hangup, SignalName::Quit]);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = parse("[engine]\npoll_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, TaskchainError::ConfigError(_)));
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn unknown_signal_is_rejected() {
        let err = parse("[signals]\nintercept = [\"usr1\"]\n").unwrap_err();
        assert!(err.to_string().contains("invalid signal name: usr1"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            parse("[engine]\npoll = 1\n"),
            Err(TaskchainError::TomlError(_))
        ));
    }
}
