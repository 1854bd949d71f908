//! RAX FTP engine
//!
//! RFC 959 client with firewall-aware logon, active and passive data
//! connections, server-to-server transfers and a multi-format `LIST` parser.

pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod listing;
pub mod responses;
pub mod terminal;
pub mod transfer;
pub mod types;

pub use client::{AbortHandle, DataMode, RaxFtpClient};
pub use error::{RaxFtpError, SocketError};
pub use responses::{CommandOutcome, Reply};
