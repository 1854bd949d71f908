//! FTP Commands module
//!
//! Protocol commands with their metadata, plus parsing of interactive input.

pub mod command;
pub mod help;
pub mod parser;

// Re-export the main types for easier importing
pub use command::{Arguments, Command, CommandInfo, DataChannel, Standard};
pub use help::get_help_text;
pub use parser::{UserCommand, parse_user_command};
