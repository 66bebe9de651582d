// src/config/mod.rs

//! Engine configuration (`Taskchain.toml`).
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into an [`EngineConfig`] (`validate.rs`).
//!
//! Tasks themselves are declared in code with the task builder; the file only
//! tunes how the engine runs them.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{EngineSection, RawEngineConfig, SignalsSection, WatchSection};
pub use validate::EngineConfig;
