//! dirsearch
//!
//! Live full-text search over a watched directory tree. Files under a root
//! are indexed on startup and kept in sync with the filesystem as it
//! changes; queries are served over HTTP with highlighted fragments.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod index;
pub mod search;
pub mod server;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
