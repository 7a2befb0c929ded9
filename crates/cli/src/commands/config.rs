use anyhow::{Context, Result};
use protoc_runner_core::{BuildScope, Config};
use serde_json::json;
use std::env;

/// Print the configuration `compile` would use from here, with paths resolved
pub fn config_command() -> Result<()> {
    let cwd = env::current_dir().context("Failed to get current directory")?;
    let config = Config::discover(&cwd).context("Failed to load configuration")?;
    config.validate()?;

    let source = Config::find_config_file(&cwd)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    let mut resolved = serde_json::Map::new();
    for scope in [BuildScope::Main, BuildScope::Test] {
        resolved.insert(
            scope.to_string(),
            json!({
                "proto_source_root": config.proto_source_root(scope),
                "output_directory": config.output_directory(scope),
                "dependencies": config.dependencies(scope),
            }),
        );
    }

    let value = json!({
        "source": source,
        "base_dir": config.base_dir(),
        "scratch_directory": config.scratch_directory(),
        "config": config,
        "resolved": resolved,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
