//! Configuration management for protoc-runner

mod scope;
mod settings;

// Re-export main types
pub use scope::{BuildScope, ScopeConfig};
pub use settings::{Config, CONFIG_FILE_NAMES, DEFAULT_LANGUAGE};
