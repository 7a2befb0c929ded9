pub mod protoc_command;

pub use protoc_command::{ProtocCommand, ProtocCommandBuilder, ProtocOutput};
