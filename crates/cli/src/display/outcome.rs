use protoc_runner_core::{Attachment, BuildOutcome};
use serde_json::{json, Value};

pub fn print_outcome(outcome: &BuildOutcome, attachments: &[Attachment]) {
    match outcome {
        BuildOutcome::SourceRootMissing { proto_source_root } => {
            println!(
                "⏭️  {} does not exist, nothing to compile",
                proto_source_root.display()
            );
        }
        BuildOutcome::NoSources => println!("⏭️  No proto files to compile"),
        BuildOutcome::UpToDate { sources } => {
            println!("✅ Generated sources are up to date ({sources} proto file(s))");
        }
        BuildOutcome::Compiled {
            sources,
            command,
            stdout,
            stderr,
        } => {
            println!("✅ Compiled {sources} proto file(s)");
            println!("   📦 {command}");
            print_streams(stdout, stderr);
        }
    }

    for attachment in attachments {
        println!(
            "   📂 {} sources: {}",
            attachment.scope,
            attachment.compile_source_root.display()
        );
        println!(
            "   📂 {} resources: {} ({})",
            attachment.scope,
            attachment.resource_root.display(),
            attachment.resource_includes.join(", ")
        );
    }
}

pub fn print_compiler_failure(exit_code: Option<i32>, stdout: &str, stderr: &str) {
    match exit_code {
        Some(code) => eprintln!("❌ protoc exited with code {code}"),
        None => eprintln!("❌ protoc was terminated by a signal"),
    }
    if !stdout.is_empty() {
        eprintln!("--- stdout ---\n{stdout}");
    }
    if !stderr.is_empty() {
        eprintln!("--- stderr ---\n{stderr}");
    }
}

pub fn outcome_json(outcome: &BuildOutcome, attachments: &[Attachment]) -> Value {
    json!({
        "outcome": outcome,
        "attachments": attachments,
    })
}

fn print_streams(stdout: &str, stderr: &str) {
    if !stdout.trim().is_empty() {
        println!("   stdout:\n{stdout}");
    }
    if !stderr.trim().is_empty() {
        println!("   stderr:\n{stderr}");
    }
}
