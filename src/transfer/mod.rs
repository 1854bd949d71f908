//! Data channel transfers for RAX FTP Engine
//!
//! Downloads, uploads, listings and server-to-server copies are all
//! implemented as `RaxFtpClient` methods on top of the data channel.

pub mod datachannel;
pub mod download;
pub mod fxp;
pub mod listing;
pub mod notification;
pub mod observer;
pub mod progress;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use datachannel::parse_pasv_reply;
pub use notification::{FileStream, MemoryStream, TransferNotification};
pub use observer::Observer;
pub use progress::{ProgressObserver, ProgressSink, TransferProgress};
