use anyhow::{bail, Context, Result};
use protoc_runner_core::{BuildScope, Config, Error, ProtocRunner, ScopedTarget};
use serde_json::json;
use std::{env, path::PathBuf};
use tracing::{debug, info};

use crate::display::{outcome_json, print_command_breakdown, print_compiler_failure, print_outcome};

/// Flags of `protoc-runner compile`, layered over the discovered config
#[derive(Debug, Clone, Default)]
pub struct CompileArgs {
    pub scope: BuildScope,
    pub dependencies: Vec<PathBuf>,
    pub proto_paths: Vec<PathBuf>,
    pub protoc: Option<String>,
    pub check_staleness: bool,
    pub stale_millis: Option<u64>,
    pub no_hash: bool,
    pub dry_run: bool,
    pub json: bool,
}

pub fn compile_command(args: CompileArgs) -> Result<()> {
    let cwd = env::current_dir().context("Failed to get current directory")?;
    let mut config = Config::discover(&cwd).context("Failed to load configuration")?;
    apply_overrides(&mut config, &args, &cwd);
    debug!("Effective config: {:?}", config);

    // Paths on the command line are relative to where the user stands, not to the config
    let extra_dependencies: Vec<PathBuf> =
        args.dependencies.iter().map(|d| cwd.join(d)).collect();
    let target =
        ScopedTarget::from_config(&config, args.scope).with_dependencies(extra_dependencies);
    let mut runner = ProtocRunner::new(&config, target);

    if args.dry_run {
        return dry_run(&runner, args.json);
    }

    info!("Running protoc for {} scope", args.scope);
    match runner.execute() {
        Ok(outcome) => {
            let attachments = runner.target().attachments();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome, attachments))?);
            } else {
                print_outcome(&outcome, attachments);
            }
            Ok(())
        }
        Err(Error::CompilerFailed {
            exit_code,
            stdout,
            stderr,
        }) => {
            if args.json {
                let failure = json!({
                    "outcome": {
                        "status": "failed",
                        "exit_code": exit_code,
                        "stdout": stdout,
                        "stderr": stderr,
                    },
                    "attachments": [],
                });
                println!("{}", serde_json::to_string_pretty(&failure)?);
            } else {
                print_compiler_failure(exit_code, &stdout, &stderr);
            }
            bail!("protoc did not exit successfully")
        }
        Err(e) => Err(e).context("Failed to generate sources from proto files"),
    }
}

fn dry_run(runner: &ProtocRunner<'_, ScopedTarget>, json: bool) -> Result<()> {
    let command = runner.dry_run().context("Failed to prepare protoc command")?;

    match (command, json) {
        (Some(command), true) => {
            let value = json!({
                "command": command.to_shell_command(),
                "args": command.args(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        (Some(command), false) => {
            println!("📦 {}", command.to_shell_command());
            print_command_breakdown(&command);
        }
        (None, true) => println!("{}", json!({ "command": null })),
        (None, false) => println!("⏭️  Nothing to compile"),
    }
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &CompileArgs, cwd: &std::path::Path) {
    if let Some(protoc) = &args.protoc {
        config.protoc_executable = protoc.clone();
    }
    if args.check_staleness {
        config.check_staleness = true;
    }
    if let Some(millis) = args.stale_millis {
        config.stale_millis = millis;
    }
    if args.no_hash {
        config.hash_dependent_paths = false;
    }
    config
        .additional_proto_paths
        .extend(args.proto_paths.iter().map(|p| cwd.join(p)));
}
