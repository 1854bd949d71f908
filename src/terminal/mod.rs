//! Terminal module for the `rax-ftp` binary
//!
//! This module handles all CLI display and user interaction functionality.

pub mod listing;
pub mod progress;
pub mod session;

// Re-export commonly used items
pub use session::Terminal;
