// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Resolving Watch glob patterns (including `**`) into concrete paths.
//! - The `FileWatcher` seam and its notify-backed polling implementation.
//! - The per-task watch loop that coalesces change bursts into run requests.
//! - (Optionally) content hashing to ignore changes that leave a file's bytes
//!   as they were.
//!
//! It does **not** run steps; it only asks the task's run loop for another run.

pub(crate) mod event_loop;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::{ContentCache, compute_file_hash};
pub use patterns::resolve_patterns;
pub use watcher::{FileWatcher, NotifyWatcher, NotifyWatcherFactory, WatchEvent, WatcherFactory};
