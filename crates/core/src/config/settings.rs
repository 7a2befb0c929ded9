use crate::{
    deps::PathCodec,
    error::{Error, Result},
    staleness::StalenessCheck,
    DEFAULT_INCLUDE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::{BuildScope, ScopeConfig};

pub const DEFAULT_LANGUAGE: &str = "java";
pub const CONFIG_FILE_NAMES: [&str; 2] = [".protoc-runner.json", "protoc-runner.json"];

const DEFAULT_EXECUTABLE: &str = "protoc";
const DEFAULT_BUILD_DIRECTORY: &str = "target";
const SCRATCH_DIRECTORY_NAME: &str = "protoc-dependencies";

/// Build configuration, read once and then shared immutably by every stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default, deny_unknown_fields)]
pub struct Config {
    /// Resolved through `PATH` unless it contains a separator
    pub protoc_executable: String,
    /// Selects the `--<language>_out` flag
    pub language: String,
    pub additional_proto_paths: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_proto_file_directory: Option<PathBuf>,
    pub hash_dependent_paths: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_repository: Option<PathBuf>,
    pub includes: BTreeSet<String>,
    pub excludes: BTreeSet<String>,
    /// Which files in the output directory count as generated for staleness
    pub generated_includes: BTreeSet<String>,
    pub check_staleness: bool,
    pub stale_millis: u64,
    pub build_directory: PathBuf,
    pub main: ScopeConfig,
    pub test: ScopeConfig,

    // Directory relative paths resolve against (internal, not in JSON)
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protoc_executable: DEFAULT_EXECUTABLE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            additional_proto_paths: Vec::new(),
            temporary_proto_file_directory: None,
            hash_dependent_paths: true,
            local_repository: None,
            includes: BTreeSet::from([DEFAULT_INCLUDE.to_string()]),
            excludes: BTreeSet::new(),
            generated_includes: BTreeSet::from(["**/*".to_string()]),
            check_staleness: false,
            stale_millis: 0,
            build_directory: PathBuf::from(DEFAULT_BUILD_DIRECTORY),
            main: ScopeConfig::default(),
            test: ScopeConfig::default(),
            base_dir: None,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::fs(path, e))?;
        let mut config: Config = serde_json::from_str(&contents).map_err(|e| {
            Error::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents).map_err(|e| Error::fs(path, e))?;
        Ok(())
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            for name in CONFIG_FILE_NAMES {
                let config_path = current.join(name);
                if config_path.is_file() {
                    return Some(config_path);
                }
            }

            current = current.parent()?;
        }
    }

    /// Nearest config file at or above `start_path`, or the defaults rooted there
    pub fn discover(start_path: &Path) -> Result<Self> {
        match Self::find_config_file(start_path) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load_from_file(&path)
            }
            None => Ok(Self {
                base_dir: Some(start_path.to_path_buf()),
                ..Self::default()
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.protoc_executable.trim().is_empty() {
            return Err(Error::ConfigError(
                "protoc_executable must not be empty".to_string(),
            ));
        }
        if self.language.is_empty()
            || !self
                .language
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::ConfigError(format!(
                "invalid output language '{}'",
                self.language
            )));
        }
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        self.base_dir.as_deref().unwrap_or_else(|| Path::new("."))
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    pub fn build_directory(&self) -> PathBuf {
        self.resolve_path(&self.build_directory)
    }

    /// Where dependency archives are unpacked; always emptied at the start of a build
    pub fn scratch_directory(&self) -> PathBuf {
        match &self.temporary_proto_file_directory {
            Some(dir) => self.resolve_path(dir),
            None => self.build_directory().join(SCRATCH_DIRECTORY_NAME),
        }
    }

    pub fn scope(&self, scope: BuildScope) -> &ScopeConfig {
        match scope {
            BuildScope::Main => &self.main,
            BuildScope::Test => &self.test,
        }
    }

    pub fn proto_source_root(&self, scope: BuildScope) -> PathBuf {
        match &self.scope(scope).proto_source_root {
            Some(root) => self.resolve_path(root),
            None => self.resolve_path(Path::new(scope.default_source_root())),
        }
    }

    pub fn output_directory(&self, scope: BuildScope) -> PathBuf {
        match &self.scope(scope).output_directory {
            Some(dir) => self.resolve_path(dir),
            None => self.build_directory().join(scope.default_output_directory()),
        }
    }

    /// Test builds also see the main dependencies, listed first
    pub fn dependencies(&self, scope: BuildScope) -> Vec<PathBuf> {
        let mut dependencies: Vec<PathBuf> = Vec::new();
        let scopes: &[BuildScope] = match scope {
            BuildScope::Main => &[BuildScope::Main],
            BuildScope::Test => &[BuildScope::Main, BuildScope::Test],
        };
        for s in scopes {
            for dependency in &self.scope(*s).dependencies {
                let resolved = self.resolve_path(dependency);
                if !dependencies.contains(&resolved) {
                    dependencies.push(resolved);
                }
            }
        }
        dependencies
    }

    pub fn additional_proto_paths(&self) -> Vec<PathBuf> {
        self.additional_proto_paths
            .iter()
            .map(|p| self.resolve_path(p))
            .collect()
    }

    pub fn staleness(&self) -> StalenessCheck {
        StalenessCheck::new(self.check_staleness, self.stale_millis)
    }

    pub fn path_codec(&self) -> PathCodec {
        let repository = self.local_repository.as_ref().map(|r| self.resolve_path(r));
        PathCodec::new(self.hash_dependent_paths, repository.as_deref())
    }
}
