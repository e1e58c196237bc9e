//! Configuration management for dirsearch.
//!
//! Values are plain data here. The binary fills them from:
//! - Command-line arguments (highest priority)
//! - Environment variables
//! - Built-in defaults (lowest priority)

mod settings;

pub use settings::{Config, DEFAULT_SEARCH_LIMIT};
