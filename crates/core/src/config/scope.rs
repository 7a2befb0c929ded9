use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

/// Which proto set a build compiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildScope {
    #[default]
    Main,
    Test,
}

impl BuildScope {
    pub fn default_source_root(self) -> &'static str {
        match self {
            BuildScope::Main => "src/main/proto",
            BuildScope::Test => "src/test/proto",
        }
    }

    /// Relative to the build directory
    pub fn default_output_directory(self) -> &'static str {
        match self {
            BuildScope::Main => "generated-sources/protoc",
            BuildScope::Test => "generated-test-sources/protoc",
        }
    }
}

impl fmt::Display for BuildScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildScope::Main => write!(f, "main"),
            BuildScope::Test => write!(f, "test"),
        }
    }
}

impl FromStr for BuildScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" => Ok(BuildScope::Main),
            "test" => Ok(BuildScope::Test),
            other => Err(Error::ConfigError(format!(
                "unknown build scope '{other}' (expected 'main' or 'test')"
            ))),
        }
    }
}

/// Per-scope locations; unset paths fall back to the scope defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScopeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proto_source_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,
    /// Archives or directories supplied by dependency resolution, in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parsing() {
        assert_eq!("main".parse::<BuildScope>().unwrap(), BuildScope::Main);
        assert_eq!("TEST".parse::<BuildScope>().unwrap(), BuildScope::Test);
        assert!("bench".parse::<BuildScope>().is_err());
        assert_eq!(BuildScope::Test.to_string(), "test");
    }
}
