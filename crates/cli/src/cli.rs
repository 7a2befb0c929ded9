use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use protoc_runner_core::BuildScope;
use std::path::PathBuf;

use crate::commands::{compile_command, config_command, init_command, CompileArgs};

#[derive(Parser, Debug)]
#[command(name = "protoc-runner")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Enable debug logging")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    Main,
    Test,
}

impl From<ScopeArg> for BuildScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Main => BuildScope::Main,
            ScopeArg::Test => BuildScope::Test,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract dependency protos and run protoc for a build scope
    #[command(visible_alias = "c")]
    Compile {
        /// Which proto set to compile
        #[arg(short, long, value_enum, default_value_t = ScopeArg::Main)]
        scope: ScopeArg,

        /// Dependency archive or directory (repeatable, appended to the configured ones)
        #[arg(short = 'D', long = "dependency")]
        dependencies: Vec<PathBuf>,

        /// Extra proto path root (repeatable)
        #[arg(short = 'I', long = "proto-path")]
        proto_paths: Vec<PathBuf>,

        /// Path to the protoc executable
        #[arg(long)]
        protoc: Option<String>,

        /// Skip protoc when generated files are newer than the sources
        #[arg(long)]
        check_staleness: bool,

        /// Grace period for the staleness check, in milliseconds
        #[arg(long)]
        stale_millis: Option<u64>,

        /// Name extracted dependency directories after their path instead of its MD5
        #[arg(long)]
        no_hash: bool,

        /// Print the protoc command without cleaning the output or running it
        #[arg(short, long)]
        dry_run: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a default .protoc-runner.json
    Init {
        /// Directory to write the configuration to (defaults to current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },
    /// Show the effective configuration as JSON
    Config,
}

impl Commands {
    /// Execute the command
    pub fn execute(self) -> Result<()> {
        match self {
            Commands::Compile {
                scope,
                dependencies,
                proto_paths,
                protoc,
                check_staleness,
                stale_millis,
                no_hash,
                dry_run,
                json,
            } => compile_command(CompileArgs {
                scope: scope.into(),
                dependencies,
                proto_paths,
                protoc,
                check_staleness,
                stale_millis,
                no_hash,
                dry_run,
                json,
            }),
            Commands::Init { cwd, force } => init_command(cwd.as_deref(), force),
            Commands::Config => config_command(),
        }
    }
}
