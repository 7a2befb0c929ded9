//! Main runner that sequences source resolution, extraction, cleanup and protoc

use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::{
    command::{ProtocCommand, ProtocOutput},
    config::Config,
    deps::ArchiveExtractor,
    error::{Error, Result},
    janitor,
    sources::SourceSelector,
    target::{Attachment, BuildTarget},
};

/// How a build ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BuildOutcome {
    /// The proto source root does not exist, nothing to do
    SourceRootMissing { proto_source_root: PathBuf },
    /// The source root exists but no file matched the include patterns
    NoSources,
    /// Generated output is newer than every source
    UpToDate { sources: usize },
    Compiled {
        sources: usize,
        command: String,
        stdout: String,
        stderr: String,
    },
}

/// Sources that survived resolution and the staleness check
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    SourceRootMissing,
    NoSources,
    UpToDate(usize),
    Stale(Vec<PathBuf>),
}

/// Drives one protoc build for a [`BuildTarget`]
pub struct ProtocRunner<'a, T: BuildTarget> {
    config: &'a Config,
    target: T,
}

impl<'a, T: BuildTarget> ProtocRunner<'a, T> {
    pub fn new(config: &'a Config, target: T) -> Self {
        Self { config, target }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    /// Run the whole pipeline.
    ///
    /// A non-zero protoc exit is returned as [`Error::CompilerFailed`] carrying
    /// both captured streams.
    pub fn execute(&mut self) -> Result<BuildOutcome> {
        let sources = match self.resolve()? {
            Resolution::SourceRootMissing => return Ok(self.source_root_missing()),
            Resolution::NoSources => return Ok(BuildOutcome::NoSources),
            Resolution::UpToDate(count) => {
                self.attach();
                return Ok(BuildOutcome::UpToDate { sources: count });
            }
            Resolution::Stale(sources) => sources,
        };

        let command = self.prepare(&sources)?;

        let output_directory = self.absolute(self.target.output_directory());
        create_output_directory(&output_directory)?;
        if !janitor::clean(&output_directory) {
            warn!(
                "Could not fully clean {}; stale files may remain",
                output_directory.display()
            );
        }

        info!("Compiling {} proto file(s) to {}", sources.len(), output_directory.display());
        let output = command.execute()?;
        if !output.success() {
            return Err(compiler_failure(output));
        }

        self.attach();
        Ok(BuildOutcome::Compiled {
            sources: sources.len(),
            command: command.to_shell_command(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Everything up to invoking protoc, without touching the output directory.
    ///
    /// Returns `None` when there is nothing to compile. Dependency archives are
    /// still extracted, since the command refers to the extracted directories.
    pub fn dry_run(&self) -> Result<Option<ProtocCommand>> {
        match self.resolve()? {
            Resolution::Stale(sources) => self.prepare(&sources).map(Some),
            _ => Ok(None),
        }
    }

    fn resolve(&self) -> Result<Resolution> {
        self.check_parameters()?;

        let source_root = self.absolute(self.target.proto_source_root());
        if !source_root.exists() {
            return Ok(Resolution::SourceRootMissing);
        }

        let selector = SourceSelector::new(&self.config.includes, &self.config.excludes)?;
        let sources: Vec<PathBuf> = selector.resolve(&source_root)?.into_iter().collect();
        if sources.is_empty() {
            info!("No proto files to compile.");
            return Ok(Resolution::NoSources);
        }

        let staleness = self.config.staleness();
        if staleness.enabled {
            let outputs = self.generated_files()?;
            if !staleness.is_stale(&sources, &outputs) {
                info!("Skipping compilation because target directory newer than sources.");
                return Ok(Resolution::UpToDate(sources.len()));
            }
        }

        debug!("Resolved {} proto source(s)", sources.len());
        Ok(Resolution::Stale(sources))
    }

    fn prepare(&self, sources: &[PathBuf]) -> Result<ProtocCommand> {
        let extractor = ArchiveExtractor::new(self.config.path_codec());
        let dependency_dirs: BTreeSet<PathBuf> = extractor.extract(
            &self.absolute(&self.config.scratch_directory()),
            self.target.dependency_locations(),
        )?;

        ProtocCommand::builder(
            self.config.protoc_executable.clone(),
            self.absolute(self.target.output_directory()),
        )
        .with_language(self.config.language.clone())
        .with_proto_path(self.absolute(self.target.proto_source_root()))
        .with_proto_paths(dependency_dirs)
        .with_proto_paths(
            self.config
                .additional_proto_paths()
                .iter()
                .map(|p| self.absolute(p)),
        )
        .with_proto_files(sources.iter().cloned())
        .build()
    }

    /// Misconfiguration is reported before anything on disk changes
    fn check_parameters(&self) -> Result<()> {
        self.config.validate()?;

        let scratch_directory = self.config.scratch_directory();
        let checks: [(&str, &Path); 3] = [
            ("proto source root", self.target.proto_source_root()),
            ("temporary proto file directory", &scratch_directory),
            ("output directory", self.target.output_directory()),
        ];
        for (name, path) in checks {
            if path.as_os_str().is_empty() {
                return Err(Error::ConfigError(format!("{name} is not set")));
            }
            if self.absolute(path).is_file() {
                return Err(Error::ConfigError(format!(
                    "{name} {} is a file, not a directory",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    fn generated_files(&self) -> Result<Vec<PathBuf>> {
        let output_directory = self.absolute(self.target.output_directory());
        if !output_directory.is_dir() {
            return Ok(Vec::new());
        }
        let selector =
            SourceSelector::new(&self.config.generated_includes, std::iter::empty::<&str>())?;
        Ok(selector.resolve(&output_directory)?.into_iter().collect())
    }

    fn source_root_missing(&self) -> BuildOutcome {
        let proto_source_root = self.target.proto_source_root().to_path_buf();
        info!(
            "{} does not exist. Review the configuration or consider disabling protoc-runner for this scope.",
            proto_source_root.display()
        );
        BuildOutcome::SourceRootMissing { proto_source_root }
    }

    fn attach(&mut self) {
        let attachment = Attachment::for_target(&self.target);
        self.target.attach(attachment);
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        let path = self.config.resolve_path(path);
        std::path::absolute(&path).unwrap_or(path)
    }
}

fn create_output_directory(dir: &Path) -> Result<()> {
    if let Err(e) = fs::create_dir_all(dir) {
        if !dir.is_dir() {
            return Err(Error::fs(dir, e));
        }
    }
    Ok(())
}

fn compiler_failure(output: ProtocOutput) -> Error {
    error!("protoc failed output: {}", output.stdout);
    error!("protoc failed error: {}", output.stderr);
    Error::CompilerFailed {
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    }
}
