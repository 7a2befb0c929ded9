pub mod compile;
pub mod config;
pub mod init;

pub use compile::{compile_command, CompileArgs};
pub use config::config_command;
pub use init::init_command;
