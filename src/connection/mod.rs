//! Connection layer for RAX FTP Engine
//!
//! Blocking sockets with explicit timeouts, plus line-oriented reading for
//! the control channel.

pub mod line;
pub mod socket;

// Re-export main types
pub use line::LineSocket;
pub use socket::{BlockingSocket, SocketKind, TcpSocket, resolve_host_by_addr, resolve_host_by_name};
