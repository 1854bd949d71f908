//! Line-oriented reading on top of a [`BlockingSocket`]
//!
//! A single `receive` may return several lines, or only part of one. The
//! leftover bytes are kept for the next call so that a text header and a
//! binary body can share one socket.

use log::debug;
use std::time::Duration;

use crate::connection::socket::BlockingSocket;
use crate::error::{SocketError, SocketResult};

const DEFAULT_CHUNK_SIZE: usize = 1024;
const DEFAULT_MAX_LINE: usize = 64 * 1024;

/// Socket wrapper that buffers received bytes between line reads
pub struct LineSocket {
    socket: Box<dyn BlockingSocket>,
    buffer: Vec<u8>,
    chunk_size: usize,
    max_line: usize,
}

impl LineSocket {
    pub fn new(socket: Box<dyn BlockingSocket>) -> Self {
        Self::with_chunk_size(socket, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(socket: Box<dyn BlockingSocket>, chunk_size: usize) -> Self {
        Self {
            socket,
            buffer: Vec::new(),
            chunk_size: chunk_size.max(1),
            max_line: DEFAULT_MAX_LINE,
        }
    }

    /// Longest line, terminator excluded, `read_line` will buffer
    pub fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = max_line.max(1);
        self
    }

    pub fn socket(&self) -> &dyn BlockingSocket {
        self.socket.as_ref()
    }

    pub fn socket_mut(&mut self) -> &mut dyn BlockingSocket {
        self.socket.as_mut()
    }

    /// Number of received bytes not yet handed out
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop buffered bytes, e.g. after the connection was closed
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Read exactly one line, without its terminator.
    ///
    /// Bytes past the terminator stay buffered. A peer closing before the
    /// terminator arrives yields [`SocketError::Closed`], with any partial
    /// line left in the buffer. More than `max_line` bytes without a
    /// terminator yield [`SocketError::LineTooLong`] and are discarded.
    pub fn read_line(&mut self, terminator: u8, timeout: Duration) -> SocketResult<String> {
        let mut scanned = 0;
        loop {
            if let Some(pos) = self.buffer[scanned..].iter().position(|&b| b == terminator) {
                let end = scanned + pos;
                let line: Vec<u8> = self.buffer.drain(..=end).take(end).collect();
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            scanned = self.buffer.len();
            if scanned > self.max_line {
                debug!("Discarding {} bytes without line terminator", scanned);
                self.buffer.clear();
                return Err(SocketError::LineTooLong(self.max_line));
            }

            let mut chunk = vec![0u8; self.chunk_size];
            let n = self.socket.receive(&mut chunk, timeout)?;
            if n == 0 {
                if !self.buffer.is_empty() {
                    debug!("Peer closed with {} bytes of unterminated line", self.buffer.len());
                }
                return Err(SocketError::Closed);
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Fill `buf` with buffered bytes first, then with fresh receives until
    /// it is full or the peer closes. Returns the number of bytes written.
    pub fn read_remainder(&mut self, buf: &mut [u8], timeout: Duration) -> SocketResult<usize> {
        let buffered = self.buffer.len().min(buf.len());
        buf[..buffered].copy_from_slice(&self.buffer[..buffered]);
        self.buffer.drain(..buffered);

        let mut filled = buffered;
        while filled < buf.len() {
            let n = self.socket.receive(&mut buf[filled..], timeout)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    pub fn into_inner(self) -> Box<dyn BlockingSocket> {
        self.socket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::testing::ScriptedSocket;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[test]
    fn test_several_lines_in_one_chunk() {
        let socket = ScriptedSocket::with_chunks(vec![b"220-first\r\n220 second\r\n".to_vec()]);
        let mut line_socket = LineSocket::new(Box::new(socket));

        assert_eq!(line_socket.read_line(b'\n', TIMEOUT).unwrap(), "220-first\r");
        assert_eq!(line_socket.read_line(b'\n', TIMEOUT).unwrap(), "220 second\r");
        assert_eq!(line_socket.buffered(), 0);
        assert_eq!(
            line_socket.read_line(b'\n', TIMEOUT),
            Err(SocketError::Closed)
        );
    }

    #[test]
    fn test_line_split_across_chunks() {
        let socket = ScriptedSocket::with_chunks(vec![
            b"230 User lo".to_vec(),
            b"gged".to_vec(),
            b" in\r\n150".to_vec(),
        ]);
        let mut line_socket = LineSocket::with_chunk_size(Box::new(socket), 4);

        assert_eq!(
            line_socket.read_line(b'\n', TIMEOUT).unwrap(),
            "230 User logged in\r"
        );
        // a line cut off by close is not a line
        assert_eq!(
            line_socket.read_line(b'\n', TIMEOUT),
            Err(SocketError::Closed)
        );
        assert_eq!(line_socket.buffered(), 3);
    }

    #[test]
    fn test_line_length_is_bounded() {
        let socket = ScriptedSocket::with_chunks(vec![
            b"220 no".to_vec(),
            b" terminator".to_vec(),
            b" in sight".to_vec(),
        ]);
        let mut line_socket = LineSocket::new(Box::new(socket)).with_max_line(8);

        assert_eq!(
            line_socket.read_line(b'\n', TIMEOUT),
            Err(SocketError::LineTooLong(8))
        );
        assert_eq!(line_socket.buffered(), 0);

        let socket = ScriptedSocket::with_chunks(vec![b"12345678\nrest".to_vec()]);
        let mut line_socket = LineSocket::new(Box::new(socket)).with_max_line(8);
        assert_eq!(line_socket.read_line(b'\n', TIMEOUT).unwrap(), "12345678");
    }

    #[test]
    fn test_header_then_binary_body() {
        let socket = ScriptedSocket::with_chunks(vec![
            b"HEADER 5\n\x00\x01".to_vec(),
            b"\x02\x03\x04".to_vec(),
        ]);
        let mut line_socket = LineSocket::new(Box::new(socket));

        assert_eq!(line_socket.read_line(b'\n', TIMEOUT).unwrap(), "HEADER 5");
        let mut body = [0u8; 8];
        let n = line_socket.read_remainder(&mut body, TIMEOUT).unwrap();
        assert_eq!(&body[..n], &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_remainder_smaller_than_buffered() {
        let socket = ScriptedSocket::with_chunks(vec![b"abcdef".to_vec()]);
        let mut line_socket = LineSocket::new(Box::new(socket));

        let mut first = [0u8; 1];
        line_socket.read_line(b'c', TIMEOUT).unwrap();
        assert_eq!(line_socket.read_remainder(&mut first, TIMEOUT).unwrap(), 1);
        assert_eq!(&first, b"d");
        assert_eq!(line_socket.buffered(), 2);
    }
}
