//! Advisory events emitted by the engine
//!
//! Observers are attached to a client and told about every command, reply
//! and transfer step. Nothing an observer does changes the engine's
//! behaviour; all methods have empty defaults.

use crate::commands::{Arguments, Command};
use crate::responses::Reply;

pub trait Observer: Send + Sync {
    /// An internal failure was turned into a `false` or `Error` result
    fn on_internal_error(&self, _message: &str, _file: &str, _line: u32) {}

    fn on_begin_receiving_data(&self) {}

    fn on_end_receiving_data(&self, _total_bytes: u64) {}

    fn on_bytes_received(&self, _data: &[u8]) {}

    fn on_bytes_sent(&self, _data: &[u8]) {}

    /// `size` is the remote size when the server reported one
    fn on_pre_receive_file(&self, _source: &str, _target: &str, _size: Option<u64>) {}

    fn on_post_receive_file(&self, _source: &str, _target: &str, _size: Option<u64>) {}

    fn on_pre_send_file(&self, _source: &str, _target: &str, _size: u64) {}

    fn on_post_send_file(&self, _source: &str, _target: &str, _size: u64) {}

    fn on_send_command(&self, _command: Command, _args: &Arguments) {}

    fn on_response(&self, _reply: &Reply) {}
}
