use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};
use crate::PROTO_SUFFIX;

/// A fully assembled protoc invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocCommand {
    pub executable: String,
    pub output_directory: PathBuf,
    pub proto_paths: Vec<PathBuf>,
    pub proto_files: Vec<PathBuf>,
    pub language: String,
}

/// What protoc produced: exit code plus both captured streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProtocOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl ProtocCommand {
    pub fn builder(
        executable: impl Into<String>,
        output_directory: impl Into<PathBuf>,
    ) -> ProtocCommandBuilder {
        ProtocCommandBuilder::new(executable, output_directory)
    }

    /// Arguments in the order protoc receives them
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.proto_paths.len() + self.proto_files.len() + 1);
        for path in &self.proto_paths {
            args.push(format!("--proto_path={}", path.display()));
        }
        args.push(format!(
            "--{}_out={}",
            self.language,
            self.output_directory.display()
        ));
        for file in &self.proto_files {
            args.push(file.display().to_string());
        }
        args
    }

    pub fn to_shell_command(&self) -> String {
        let mut cmd = quote(&self.executable);
        for arg in self.args() {
            cmd.push(' ');
            cmd.push_str(&quote(&arg));
        }
        cmd
    }

    /// Run protoc to completion, draining stdout and stderr.
    ///
    /// A non-zero exit is returned as data; only a failure to start the process
    /// is an error.
    pub fn execute(&self) -> Result<ProtocOutput> {
        let mut cmd = Command::new(&self.executable);
        cmd.args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Executing: {}", self.to_shell_command());
        // output() reads both pipes concurrently, so a chatty stderr cannot stall stdout
        let output = cmd.output().map_err(|source| Error::LaunchError {
            executable: self.executable.clone(),
            source,
        })?;

        Ok(ProtocOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn quote(arg: &str) -> String {
    if arg.contains(' ') {
        format!("'{arg}'")
    } else {
        arg.to_string()
    }
}

/// Collects proto path roots and sources, then validates them into a [`ProtocCommand`]
#[derive(Debug, Clone)]
pub struct ProtocCommandBuilder {
    executable: String,
    output_directory: PathBuf,
    proto_paths: Vec<PathBuf>,
    proto_files: Vec<PathBuf>,
    language: String,
}

impl ProtocCommandBuilder {
    pub fn new(executable: impl Into<String>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            output_directory: output_directory.into(),
            proto_paths: Vec::new(),
            proto_files: Vec::new(),
            language: crate::config::DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Later duplicates of an already added root are ignored
    pub fn with_proto_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !self.proto_paths.contains(&path) {
            self.proto_paths.push(path);
        }
        self
    }

    pub fn with_proto_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            self = self.with_proto_path(path);
        }
        self
    }

    pub fn with_proto_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for file in files {
            let file = file.into();
            if !self.proto_files.contains(&file) {
                self.proto_files.push(file);
            }
        }
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn build(self) -> Result<ProtocCommand> {
        if self.executable.trim().is_empty() {
            return Err(Error::ConfigError("protoc executable is empty".to_string()));
        }
        if self.language.trim().is_empty() {
            return Err(Error::ConfigError("output language is empty".to_string()));
        }
        if self.proto_files.is_empty() {
            return Err(Error::InvalidInput("no proto files to compile".to_string()));
        }
        for file in &self.proto_files {
            if !file.to_string_lossy().ends_with(PROTO_SUFFIX) {
                return Err(Error::InvalidInput(format!(
                    "{} is not a {PROTO_SUFFIX} file",
                    file.display()
                )));
            }
            if !self.is_on_proto_path(file) {
                return Err(Error::InvalidInput(format!(
                    "{} does not reside in any proto path element",
                    file.display()
                )));
            }
        }

        Ok(ProtocCommand {
            executable: self.executable,
            output_directory: self.output_directory,
            proto_paths: self.proto_paths,
            proto_files: self.proto_files,
            language: self.language,
        })
    }

    fn is_on_proto_path(&self, file: &Path) -> bool {
        self.proto_paths.iter().any(|root| file.starts_with(root))
    }
}
