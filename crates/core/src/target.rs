//! The seam between the runner and the host build

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{BuildScope, Config};
use crate::DEFAULT_INCLUDE;

/// What the host build gets back after a successful (or skipped) run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub scope: BuildScope,
    /// Generated sources to compile along with the project
    pub compile_source_root: PathBuf,
    /// The proto sources themselves, packaged as resources
    pub resource_root: PathBuf,
    pub resource_includes: Vec<String>,
}

/// Everything the runner needs to know about the build it serves
pub trait BuildTarget {
    fn scope(&self) -> BuildScope;

    fn proto_source_root(&self) -> &Path;

    fn output_directory(&self) -> &Path;

    /// Archives and directories from dependency resolution, in resolution order
    fn dependency_locations(&self) -> &[PathBuf];

    fn attach(&mut self, attachment: Attachment);
}

/// A [`BuildTarget`] built from configuration for one [`BuildScope`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedTarget {
    scope: BuildScope,
    proto_source_root: PathBuf,
    output_directory: PathBuf,
    dependencies: Vec<PathBuf>,
    attachments: Vec<Attachment>,
}

impl ScopedTarget {
    pub fn new(
        scope: BuildScope,
        proto_source_root: impl Into<PathBuf>,
        output_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scope,
            proto_source_root: proto_source_root.into(),
            output_directory: output_directory.into(),
            dependencies: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn from_config(config: &Config, scope: BuildScope) -> Self {
        Self::new(
            scope,
            config.proto_source_root(scope),
            config.output_directory(scope),
        )
        .with_dependencies(config.dependencies(scope))
    }

    pub fn with_dependencies<I, P>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for dependency in dependencies {
            let dependency = dependency.into();
            if !self.dependencies.contains(&dependency) {
                self.dependencies.push(dependency);
            }
        }
        self
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

impl BuildTarget for ScopedTarget {
    fn scope(&self) -> BuildScope {
        self.scope
    }

    fn proto_source_root(&self) -> &Path {
        &self.proto_source_root
    }

    fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    fn dependency_locations(&self) -> &[PathBuf] {
        &self.dependencies
    }

    fn attach(&mut self, attachment: Attachment) {
        tracing::debug!(
            "Attaching {} sources from {}",
            attachment.scope,
            attachment.compile_source_root.display()
        );
        self.attachments.push(attachment);
    }
}

impl Attachment {
    pub fn for_target<T: BuildTarget + ?Sized>(target: &T) -> Self {
        Self {
            scope: target.scope(),
            compile_source_root: target.output_directory().to_path_buf(),
            resource_root: target.proto_source_root().to_path_buf(),
            resource_includes: vec![DEFAULT_INCLUDE.to_string()],
        }
    }
}
