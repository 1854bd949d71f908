//! FTP reply handling module

pub mod reply;

// Re-export main types
pub use reply::{CommandOutcome, Reply, ReplyCode};
