use std::fmt;
use std::io;

use crate::commands::Command;
use crate::responses::CommandOutcome;

/// Outcome of a single socket call.
///
/// Every blocking socket operation waits for readiness first; a wait that
/// runs out is reported as [`SocketError::Timeout`], never as a generic OS
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketError {
    Timeout,
    ConnectionRefused,
    Closed,
    Os(i32),
    InvalidState(&'static str),
    Resolve(String),
    /// No line terminator within this many bytes
    LineTooLong(usize),
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "Socket operation timed out"),
            Self::ConnectionRefused => write!(f, "Connection refused"),
            Self::Closed => write!(f, "Connection closed by peer"),
            Self::Os(code) => write!(f, "Socket error (os code {})", code),
            Self::InvalidState(msg) => write!(f, "Invalid socket state: {}", msg),
            Self::Resolve(host) => write!(f, "Cannot resolve host '{}'", host),
            Self::LineTooLong(limit) => write!(f, "Line exceeds {} bytes", limit),
        }
    }
}

impl std::error::Error for SocketError {}

impl From<io::Error> for SocketError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::Timeout,
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected => Self::Closed,
            _ => Self::Os(err.raw_os_error().unwrap_or(-1)),
        }
    }
}

/// Result type of the socket layer
pub type SocketResult<T> = std::result::Result<T, SocketError>;

/// Internal error type of the RAX FTP engine.
///
/// These errors never leave the public engine API: they are reported to the
/// attached observers and turned into a `bool` or `CommandOutcome` there.
#[derive(Debug)]
pub enum RaxFtpError {
    // Transport
    Socket(SocketError),
    NotConnected,

    // Protocol
    MalformedReply(String),
    MalformedPasv(String),
    UnexpectedReply { expected: &'static str, received: String },
    /// Well-formed reply that refused or failed the command
    CommandFailed(Command, CommandOutcome),
    NotDataChannelCommand(Command),
    TransferInProgress,
    Aborted,
    LogonFailed(String),

    // Local side
    Io(io::Error),
    Config(String),
}

impl fmt::Display for RaxFtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket(err) => write!(f, "{}", err),
            Self::NotConnected => write!(f, "Not connected to a server"),

            Self::MalformedReply(reply) => write!(f, "Malformed reply: '{}'", reply),
            Self::MalformedPasv(reply) => {
                write!(f, "Cannot read address from PASV reply: '{}'", reply)
            }
            Self::UnexpectedReply { expected, received } => write!(
                f,
                "Unexpected reply: expected {}, got '{}'",
                expected, received
            ),
            Self::CommandFailed(cmd, outcome) => write!(f, "{} failed ({})", cmd, outcome),
            Self::NotDataChannelCommand(cmd) => {
                write!(f, "{} does not use the data channel", cmd)
            }
            Self::TransferInProgress => write!(f, "Another transfer is in progress"),
            Self::Aborted => write!(f, "Transfer aborted"),
            Self::LogonFailed(msg) => write!(f, "Logon failed: {}", msg),

            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for RaxFtpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Socket(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SocketError> for RaxFtpError {
    fn from(err: SocketError) -> Self {
        Self::Socket(err)
    }
}

impl From<io::Error> for RaxFtpError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<config::ConfigError> for RaxFtpError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RaxFtpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let timeout = io::Error::new(io::ErrorKind::WouldBlock, "not ready");
        assert_eq!(SocketError::from(timeout), SocketError::Timeout);

        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(SocketError::from(refused), SocketError::ConnectionRefused);

        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(SocketError::from(reset), SocketError::Closed);

        let os = io::Error::from_raw_os_error(98);
        assert!(matches!(SocketError::from(os), SocketError::Os(98) | SocketError::Closed));
    }

    #[test]
    fn test_error_display() {
        let err = RaxFtpError::MalformedPasv("227 nothing here".to_string());
        assert_eq!(
            err.to_string(),
            "Cannot read address from PASV reply: '227 nothing here'"
        );
        let err: RaxFtpError = SocketError::Timeout.into();
        assert_eq!(err.to_string(), "Socket operation timed out");
    }
}
