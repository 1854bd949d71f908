//! Protocol value types shared by the engine and its callers

pub mod firewall;
pub mod logon;
pub mod representation;

pub use firewall::FirewallType;
pub use logon::{DEFAULT_FTP_PORT, LogonInfo};
pub use representation::{Representation, Structure, TransferMode, Type, TypeFormat};
