use protoc_runner_core::ProtocCommand;

pub fn print_command_breakdown(command: &ProtocCommand) {
    println!("   🔧 Command breakdown:");
    println!("      • executable: {}", command.executable);
    println!("      • language: {}", command.language);
    println!("      • output: {}", command.output_directory.display());

    if !command.proto_paths.is_empty() {
        println!("      • proto paths:");
        for path in &command.proto_paths {
            println!("        - {}", path.display());
        }
    }

    println!("      • sources: {} file(s)", command.proto_files.len());
    for file in &command.proto_files {
        println!("        - {}", file.display());
    }
}
