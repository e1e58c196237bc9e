//! Configuration settings and validation.

use crate::watcher::{InclusionFilter, PatternSyntax};
use crate::{Error, Result};
use std::path::PathBuf;

/// Default number of hits returned per query.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Main configuration for the dirsearch service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory tree to index and watch.
    pub root: PathBuf,

    /// HTTP path the search endpoint is mounted on.
    pub endpoint: String,

    /// Inclusion pattern; empty matches every path.
    pub pattern: String,

    /// How `pattern` is interpreted.
    pub pattern_syntax: PatternSyntax,

    /// On-disk location of the full-text index.
    pub index_dir: PathBuf,

    /// Host address to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Maximum number of hits per query.
    pub search_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            endpoint: "/search".to_string(),
            pattern: String::new(),
            pattern_syntax: PatternSyntax::Regex,
            index_dir: PathBuf::from("./data/search-index"),
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() || !self.endpoint.starts_with('/') {
            return Err(Error::config(format!(
                "endpoint '{}' must start with '/'",
                self.endpoint
            )));
        }

        if self.port == 0 {
            return Err(Error::config("port cannot be 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.search_limit == 0 {
            return Err(Error::config("search_limit cannot be 0"));
        }

        if self.host.is_empty() {
            return Err(Error::config("host cannot be empty"));
        }

        self.filter()?;

        Ok(())
    }

    /// Build the inclusion filter described by `pattern` and `pattern_syntax`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn filter(&self) -> Result<InclusionFilter> {
        InclusionFilter::new(&self.pattern, self.pattern_syntax)
    }
}
