pub mod command_breakdown;
pub mod outcome;

pub use command_breakdown::print_command_breakdown;
pub use outcome::{outcome_json, print_compiler_failure, print_outcome};
