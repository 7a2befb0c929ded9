//! protoc-runner - prepares .proto inputs for protoc and runs it as part of a build
//!
//! This crate provides functionality to:
//! - Resolve the .proto sources of a project from include/exclude patterns
//! - Extract .proto files shipped inside dependency archives into a scratch area
//! - Skip regeneration when generated output is newer than every source
//! - Clean the output directory and invoke protoc, capturing its diagnostics
pub mod command;
pub mod config;
pub mod deps;
pub mod error;
pub mod janitor;
pub mod runner;
pub mod sources;
pub mod staleness;
pub mod target;

/// Suffix of the schema files protoc consumes
pub const PROTO_SUFFIX: &str = ".proto";

/// Dependency files with this suffix are metadata, never archives
pub const METADATA_SUFFIX: &str = ".xml";

pub const DEFAULT_INCLUDE: &str = "**/*.proto";

// Re-export commonly used types and traits
pub use error::{Error, Result};

// Re-export main API components
pub use command::{ProtocCommand, ProtocCommandBuilder, ProtocOutput};
pub use config::{BuildScope, Config, CONFIG_FILE_NAMES};
pub use deps::{ArchiveExtractor, PathCodec};
pub use runner::{BuildOutcome, ProtocRunner};
pub use staleness::StalenessCheck;
pub use target::{Attachment, BuildTarget, ScopedTarget};
