//! RAX FTP client engine
//!
//! [`RaxFtpClient`] owns the control connection. It runs the logon state
//! machine and the simple commands here; the data channel lives in the
//! `transfer` module. Internal failures never cross the public API: they
//! are reported to the attached observers and turned into `bool`,
//! [`CommandOutcome`] or `Result<_, CommandOutcome>` values.

pub mod logon;

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use std::net::SocketAddrV4;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::commands::{Arguments, Command};
use crate::config::ClientSettings;
use crate::connection::{BlockingSocket, LineSocket, SocketKind, TcpSocket};
use crate::error::{RaxFtpError, Result};
use crate::listing::{FileListParser, ListParser};
use crate::responses::{CommandOutcome, Reply};
use crate::transfer::Observer;
use crate::transfer::datachannel::parse_pasv_reply;
use crate::types::{LogonInfo, Representation, Structure, TransferMode};
use logon::{Next, find_step, logon_sequence};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_BUFFER_SIZE: usize = 2048;
pub const DEFAULT_REMOTE_SEPARATOR: &str = "/";

/// Data connection modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    /// We listen and the server connects (`PORT`)
    Active,
    /// The server listens and we connect (`PASV`)
    Passive,
}

impl DataMode {
    pub fn from_passive(passive: bool) -> Self {
        if passive {
            DataMode::Passive
        } else {
            DataMode::Active
        }
    }
}

/// Cancels a running transfer from another thread.
///
/// Cancellation is cooperative: the transfer loop checks the flag between
/// chunks and then runs the `ABOR` handshake itself.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    transferring: Arc<AtomicBool>,
    abort: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Ask the running transfer to stop. Returns false if none is running.
    pub fn abort(&self) -> bool {
        if self.transferring.load(Ordering::SeqCst) {
            self.abort.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    pub fn is_transferring(&self) -> bool {
        self.transferring.load(Ordering::SeqCst)
    }

    pub(crate) fn begin_transfer(&self) {
        self.abort.store(false, Ordering::SeqCst);
        self.transferring.store(true, Ordering::SeqCst);
    }

    pub(crate) fn end_transfer(&self) {
        self.transferring.store(false, Ordering::SeqCst);
    }

    pub(crate) fn abort_requested(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    pub(crate) fn clear_abort(&self) {
        self.abort.store(false, Ordering::SeqCst);
    }
}

/// Main FTP client
pub struct RaxFtpClient {
    /// Prototype the control and data sockets are created from
    pub(crate) socket_factory: Box<dyn BlockingSocket>,

    control: Option<LineSocket>,

    /// Timeout of every single socket call
    pub(crate) timeout: Duration,

    /// Size of the transfer buffer
    pub(crate) buffer_size: usize,

    /// Remote directory separator; also the root entered with `CWD` after logon
    remote_separator: String,

    pub(crate) resume: bool,

    /// Last representation type the server accepted
    representation: Option<Representation>,

    pub(crate) observers: Vec<Arc<dyn Observer>>,

    pub(crate) parser: Box<dyn FileListParser>,

    pub(crate) flags: AbortHandle,

    last_logon: Option<LogonInfo>,
}

impl Default for RaxFtpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RaxFtpClient {
    /// Client using OS sockets and default settings
    pub fn new() -> Self {
        Self::with_socket(Box::new(TcpSocket::new()))
    }

    /// Client creating all its sockets from `socket_factory`
    pub fn with_socket(socket_factory: Box<dyn BlockingSocket>) -> Self {
        Self {
            socket_factory,
            control: None,
            timeout: DEFAULT_TIMEOUT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            remote_separator: DEFAULT_REMOTE_SEPARATOR.to_string(),
            resume: false,
            representation: None,
            observers: Vec::new(),
            parser: Box::new(ListParser::new()),
            flags: AbortHandle::default(),
            last_logon: None,
        }
    }

    /// Client using OS sockets, configured from `settings`
    pub fn from_settings(settings: &ClientSettings) -> Self {
        let mut client = Self::new();
        client.set_timeout(settings.timeout());
        client.set_buffer_size(settings.buffer_size);
        client.set_remote_separator(&settings.remote_separator);
        client.set_resume_mode(settings.resume);
        client
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        self.buffer_size = buffer_size.max(1);
    }

    pub fn set_remote_separator(&mut self, separator: &str) {
        self.remote_separator = separator.to_string();
    }

    /// Resume interrupted downloads and uploads where possible
    pub fn set_resume_mode(&mut self, resume: bool) {
        self.resume = resume;
    }

    pub fn resume_mode(&self) -> bool {
        self.resume
    }

    pub fn set_file_list_parser(&mut self, parser: Box<dyn FileListParser>) {
        self.parser = parser;
    }

    pub fn attach_observer(&mut self, observer: Arc<dyn Observer>) {
        if !self.observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            self.observers.push(observer);
        }
    }

    /// Returns false if `observer` was not attached
    pub fn detach_observer(&mut self, observer: &Arc<dyn Observer>) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| !Arc::ptr_eq(o, observer));
        self.observers.len() != before
    }

    /// Logon information of the last `login` call
    pub fn last_logon_info(&self) -> Option<&LogonInfo> {
        self.last_logon.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.control
            .as_ref()
            .is_some_and(|control| control.socket().is_open())
    }

    pub fn is_transferring_data(&self) -> bool {
        self.flags.is_transferring()
    }

    /// Handle for cancelling transfers from another thread
    pub fn abort_handle(&self) -> AbortHandle {
        self.flags.clone()
    }

    fn open_control_channel(&mut self, host: &str, port: u16) -> Result<()> {
        self.close_control_channel();

        let mut socket = self.socket_factory.create_instance();
        socket.create(SocketKind::Stream)?;
        let addr = socket.resolve_host(host, port)?;
        info!("Connecting to {} ({})", host, addr);
        socket.connect(addr, self.timeout)?;
        info!("Control connection established to {}", addr);

        self.control = Some(LineSocket::with_chunk_size(socket, self.buffer_size));
        Ok(())
    }

    fn close_control_channel(&mut self) {
        if let Some(mut control) = self.control.take() {
            control.socket_mut().close();
            info!("Control connection closed");
        }
        self.representation = None;
    }

    /// Local address of the control connection, used for `PORT`
    pub(crate) fn control_address(&self) -> Result<SocketAddrV4> {
        let control = self.control.as_ref().ok_or(RaxFtpError::NotConnected)?;
        Ok(control.socket().sock_addr()?)
    }

    /// Log on, walking the logon sequence of the configured firewall type.
    ///
    /// An existing session is closed first. After the sequence reaches the
    /// logged-on state the remote root is entered with `CWD`; a failure
    /// there fails the logon.
    pub fn login(&mut self, logon: &LogonInfo) -> bool {
        let result = self.run_logon(logon);
        self.settle(result, file!(), line!()).is_ok()
    }

    fn run_logon(&mut self, logon: &LogonInfo) -> Result<()> {
        self.last_logon = Some(logon.clone());

        if self.is_connected() {
            self.logout();
        }

        let (host, port) = logon.connect_target();
        self.open_control_channel(host, port)?;

        // get initial connect msg off server
        let greeting = self.get_response()?;
        if !greeting.is_positive_completion() {
            return Err(RaxFtpError::UnexpectedReply {
                expected: "2yz greeting",
                received: greeting.text().to_string(),
            });
        }

        let steps = logon_sequence(logon.firewall_type());
        let mut step = steps[0];
        loop {
            let (command, args) = step.command.render(logon);
            let reply = self.execute(command, &args)?;

            let next = if reply.is_positive_completion() {
                step.on_completion
            } else if reply.is_positive_intermediate() {
                step.on_intermediate
            } else if reply.is_negative() {
                warn!("Logon rejected at {}: {}", command, reply);
                return Err(RaxFtpError::CommandFailed(command, CommandOutcome::NotOk));
            } else {
                return Err(RaxFtpError::UnexpectedReply {
                    expected: "2yz or 3yz logon reply",
                    received: reply.text().to_string(),
                });
            };

            match next {
                Next::Then(following) => {
                    step = find_step(steps, following).ok_or_else(|| {
                        RaxFtpError::LogonFailed(format!(
                            "{} has no {:?} step",
                            logon.firewall_type().display_name(),
                            following
                        ))
                    })?;
                }
                Next::Failed => {
                    return Err(RaxFtpError::LogonFailed(format!(
                        "{} cannot continue after '{}'",
                        logon.firewall_type().display_name(),
                        reply
                    )));
                }
                Next::LoggedOn => {
                    info!("Logged on to {}", logon.host_port());
                    let root = Arguments::from(self.remote_separator.as_str());
                    let reply = self.execute(Command::Cwd, &root)?;
                    return require(Command::Cwd, CommandOutcome::from_reply(&reply));
                }
            }
        }
    }

    /// `QUIT`; the control connection is closed in any case
    pub fn logout(&mut self) -> CommandOutcome {
        let result = self
            .execute(Command::Quit, &Arguments::new())
            .map(|reply| CommandOutcome::from_reply(&reply));
        self.close_control_channel();
        self.settle(result, file!(), line!())
            .unwrap_or_else(|outcome| outcome)
    }

    /// Write one command line to the control connection
    pub(crate) fn send_command(&mut self, command: Command, args: &Arguments) -> Result<()> {
        if !self.is_connected() {
            return Err(RaxFtpError::NotConnected);
        }

        for observer in &self.observers {
            observer.on_send_command(command, args);
        }
        debug!("Sending command: {}", command.masked_line(args));

        let line = format!("{}\r\n", command.line(args));
        let timeout = self.timeout;
        let sent = match self.control.as_mut() {
            Some(control) => control.socket_mut().write(line.as_bytes(), timeout),
            None => return Err(RaxFtpError::NotConnected),
        };
        if let Err(err) = sent {
            self.close_control_channel();
            return Err(err.into());
        }
        Ok(())
    }

    fn read_response_line(&mut self) -> Result<String> {
        let timeout = self.timeout;
        let control = self.control.as_mut().ok_or(RaxFtpError::NotConnected)?;
        match control.read_line(b'\n', timeout) {
            Ok(mut line) => {
                if line.ends_with('\r') {
                    line.pop();
                }
                Ok(line)
            }
            Err(err) => {
                self.close_control_channel();
                Err(err.into())
            }
        }
    }

    /// Read one complete, possibly multi-line, reply.
    ///
    /// A multi-line reply ends at the first line carrying the opening code
    /// followed by a space.
    pub(crate) fn get_response(&mut self) -> Result<Reply> {
        let mut text = self.read_response_line()?;

        if text.as_bytes().get(3) == Some(&b'-') {
            let code = text.get(..3).unwrap_or_default().to_string();
            loop {
                let line = self.read_response_line()?;
                text.push_str("\r\n");
                text.push_str(&line);
                if line.as_bytes().get(3) == Some(&b' ') && line.get(..3) == Some(code.as_str())
                {
                    break;
                }
            }
        }

        let mut reply = Reply::default();
        let valid = reply.set(text);
        debug!("Received reply: {}", reply);
        for observer in &self.observers {
            observer.on_response(&reply);
        }

        if !valid {
            return Err(RaxFtpError::MalformedReply(reply.text().to_string()));
        }
        Ok(reply)
    }

    /// Send a command and read its reply
    pub(crate) fn execute(&mut self, command: Command, args: &Arguments) -> Result<Reply> {
        self.send_command(command, args)?;
        self.get_response()
    }

    /// Notify observers about an internal failure
    pub(crate) fn report_error(&self, message: &str, file: &str, line: u32) {
        warn!("{} ({}:{})", message, file, line);
        for observer in &self.observers {
            observer.on_internal_error(message, file, line);
        }
    }

    /// Convert an internal result for the public API.
    ///
    /// A refused command maps to its outcome silently; everything else is
    /// reported once and becomes [`CommandOutcome::Error`].
    pub(crate) fn settle<T>(
        &self,
        result: Result<T>,
        file: &str,
        line: u32,
    ) -> std::result::Result<T, CommandOutcome> {
        match result {
            Ok(value) => Ok(value),
            Err(RaxFtpError::CommandFailed(command, outcome)) => {
                debug!("{} failed: {}", command, outcome);
                Err(outcome)
            }
            Err(err) => {
                self.report_error(&err.to_string(), file, line);
                Err(CommandOutcome::Error)
            }
        }
    }

    fn simple_command(&mut self, command: Command, args: Arguments) -> CommandOutcome {
        let result = self
            .execute(command, &args)
            .map(|reply| CommandOutcome::from_reply(&reply));
        self.settle(result, file!(), line!())
            .unwrap_or_else(|outcome| outcome)
    }

    /// `CDUP`
    pub fn cdup(&mut self) -> CommandOutcome {
        self.simple_command(Command::Cdup, Arguments::new())
    }

    /// `PWD`, yielding the quoted directory name of the reply
    pub fn pwd(&mut self) -> std::result::Result<String, CommandOutcome> {
        let result = self.execute(Command::Pwd, &Arguments::new()).and_then(|reply| {
            require(Command::Pwd, CommandOutcome::from_reply(&reply))?;
            Ok(quoted_directory(reply.message()))
        });
        self.settle(result, file!(), line!())
    }

    /// `SYST`
    pub fn syst(&mut self) -> CommandOutcome {
        self.simple_command(Command::Syst, Arguments::new())
    }

    /// `NOOP`
    pub fn noop(&mut self) -> CommandOutcome {
        self.simple_command(Command::Noop, Arguments::new())
    }

    /// `CWD`
    pub fn cwd(&mut self, directory: &str) -> CommandOutcome {
        self.simple_command(Command::Cwd, directory.into())
    }

    /// `MKD`
    pub fn mkd(&mut self, directory: &str) -> CommandOutcome {
        self.simple_command(Command::Mkd, directory.into())
    }

    /// `RMD`
    pub fn rmd(&mut self, directory: &str) -> CommandOutcome {
        self.simple_command(Command::Rmd, directory.into())
    }

    /// `DELE`
    pub fn dele(&mut self, file: &str) -> CommandOutcome {
        self.simple_command(Command::Dele, file.into())
    }

    /// `SITE`
    pub fn site(&mut self, command: &str) -> CommandOutcome {
        self.simple_command(Command::Site, command.into())
    }

    /// `HELP`, optionally about `topic`
    pub fn help(&mut self, topic: &str) -> CommandOutcome {
        self.simple_command(Command::Help, topic.into())
    }

    /// `STAT`, optionally about `path`
    pub fn stat(&mut self, path: &str) -> CommandOutcome {
        self.simple_command(Command::Stat, path.into())
    }

    /// `SMNT`
    pub fn smnt(&mut self, path: &str) -> CommandOutcome {
        self.simple_command(Command::Smnt, path.into())
    }

    /// `STRU`
    pub fn stru(&mut self, structure: Structure) -> CommandOutcome {
        self.simple_command(Command::Stru, structure.to_string().into())
    }

    /// `MODE`
    pub fn mode(&mut self, mode: TransferMode) -> CommandOutcome {
        self.simple_command(Command::Mode, mode.to_string().into())
    }

    /// `ALLO bytes [R max_record]`
    pub fn allo(&mut self, bytes: u64, max_record: Option<u64>) -> CommandOutcome {
        let mut args = Arguments::from(bytes.to_string());
        if let Some(max_record) = max_record {
            args = args.arg("R").arg(max_record.to_string());
        }
        self.simple_command(Command::Allo, args)
    }

    /// `RNFR` followed by `RNTO`
    pub fn rename(&mut self, from: &str, to: &str) -> CommandOutcome {
        let result = self.run_rename(from, to);
        self.settle(result, file!(), line!())
            .unwrap_or_else(|outcome| outcome)
    }

    fn run_rename(&mut self, from: &str, to: &str) -> Result<CommandOutcome> {
        let reply = self.execute(Command::Rnfr, &from.into())?;
        if reply.is_negative() {
            return Ok(CommandOutcome::NotOk);
        }
        if !reply.is_positive_intermediate() {
            return Ok(CommandOutcome::Error);
        }

        let reply = self.execute(Command::Rnto, &to.into())?;
        Ok(CommandOutcome::from_reply(&reply))
    }

    /// Move a file within the server; both paths include the file name
    pub fn move_file(&mut self, source: &str, target: &str) -> CommandOutcome {
        self.rename(source, target)
    }

    /// `REIN`; a 1yz reply is followed by the real one
    pub fn rein(&mut self) -> CommandOutcome {
        let result = self.run_rein();
        self.settle(result, file!(), line!())
            .unwrap_or_else(|outcome| outcome)
    }

    fn run_rein(&mut self) -> Result<CommandOutcome> {
        let mut reply = self.execute(Command::Rein, &Arguments::new())?;
        if reply.is_positive_preliminary() {
            reply = self.get_response()?;
            if !reply.is_positive_completion() {
                return Ok(CommandOutcome::Error);
            }
        }
        Ok(CommandOutcome::from_reply(&reply))
    }

    /// `REST`; succeeds on a 3yz reply
    pub fn rest(&mut self, offset: u64) -> CommandOutcome {
        let result = self.request_restart(offset);
        self.settle(result, file!(), line!())
            .unwrap_or_else(|outcome| outcome)
    }

    pub(crate) fn request_restart(&mut self, offset: u64) -> Result<CommandOutcome> {
        let reply = self.execute(Command::Rest, &offset.to_string().into())?;
        Ok(if reply.is_positive_intermediate() {
            CommandOutcome::Ok
        } else if reply.is_negative() {
            CommandOutcome::NotOk
        } else {
            CommandOutcome::Error
        })
    }

    /// `SIZE`
    pub fn size(&mut self, path: &str) -> std::result::Result<u64, CommandOutcome> {
        let result = self.execute(Command::Size, &path.into()).and_then(|reply| {
            require(Command::Size, CommandOutcome::from_reply(&reply))?;
            parse_size(&reply).ok_or_else(|| RaxFtpError::MalformedReply(reply.text().to_string()))
        });
        self.settle(result, file!(), line!())
    }

    /// Size reported by `SIZE`, `None` when the server has none to give
    pub(crate) fn remote_size(&mut self, path: &str) -> Result<Option<u64>> {
        let reply = self.execute(Command::Size, &path.into())?;
        Ok(if reply.is_positive_completion() {
            parse_size(&reply)
        } else {
            None
        })
    }

    /// `MDTM`, parsed from `YYYYMMDDhhmmss[.fff]`
    pub fn mdtm(&mut self, path: &str) -> std::result::Result<NaiveDateTime, CommandOutcome> {
        let result = self.execute(Command::Mdtm, &path.into()).and_then(|reply| {
            require(Command::Mdtm, CommandOutcome::from_reply(&reply))?;
            parse_modification_time(&reply)
                .ok_or_else(|| RaxFtpError::MalformedReply(reply.text().to_string()))
        });
        self.settle(result, file!(), line!())
    }

    /// `PASV`, yielding the address the server listens on
    pub fn passive(&mut self) -> std::result::Result<SocketAddrV4, CommandOutcome> {
        let result = self.request_passive();
        self.settle(result, file!(), line!())
    }

    pub(crate) fn request_passive(&mut self) -> Result<SocketAddrV4> {
        let reply = self.execute(Command::Pasv, &Arguments::new())?;
        require(Command::Pasv, CommandOutcome::from_reply(&reply))?;
        parse_pasv_reply(reply.text())
            .ok_or_else(|| RaxFtpError::MalformedPasv(reply.text().to_string()))
    }

    /// `PORT h1,h2,h3,h4,p1,p2`
    pub fn data_port(&mut self, addr: SocketAddrV4) -> CommandOutcome {
        let result = self.request_data_port(addr);
        self.settle(result, file!(), line!())
            .unwrap_or_else(|outcome| outcome)
    }

    pub(crate) fn request_data_port(&mut self, addr: SocketAddrV4) -> Result<CommandOutcome> {
        let [a, b, c, d] = addr.ip().octets();
        let port = addr.port();
        let args = format!("{},{},{},{},{},{}", a, b, c, d, port >> 8, port & 0xFF);
        let reply = self.execute(Command::Port, &args.into())?;
        Ok(CommandOutcome::from_reply(&reply))
    }

    /// `TYPE`; skipped when the server already uses `representation`
    pub fn representation_type(&mut self, representation: Representation) -> CommandOutcome {
        let result = self.negotiate_representation(representation);
        self.settle(result, file!(), line!())
            .unwrap_or_else(|outcome| outcome)
    }

    pub(crate) fn negotiate_representation(
        &mut self,
        representation: Representation,
    ) -> Result<CommandOutcome> {
        if self.representation == Some(representation) {
            return Ok(CommandOutcome::Ok);
        }

        let outcome = match self.execute(Command::Type, &representation.arguments()) {
            Ok(reply) => CommandOutcome::from_reply(&reply),
            Err(err) => {
                self.representation = None;
                return Err(err);
            }
        };
        self.representation = outcome.is_ok().then_some(representation);
        Ok(outcome)
    }

    /// `ABOR`.
    ///
    /// While a transfer runs this only flags it; the transfer loop then
    /// performs the handshake itself.
    pub fn abort(&mut self) -> CommandOutcome {
        if self.flags.abort() {
            return CommandOutcome::Ok;
        }
        self.flags.clear_abort();
        self.simple_command(Command::Abor, Arguments::new())
    }

    /// `ABOR` after a cancelled transfer. A 4yz reply for the transfer is
    /// followed by the reply to `ABOR` itself.
    pub(crate) fn abort_handshake(&mut self) -> Result<()> {
        self.flags.clear_abort();
        info!("Transfer aborted, sending ABOR");
        let reply = self.execute(Command::Abor, &Arguments::new())?;
        if reply.is_transient_negative() {
            self.get_response()?;
        }
        Ok(())
    }
}

impl Drop for RaxFtpClient {
    fn drop(&mut self) {
        if self.is_transferring_data() {
            self.flags.abort();
        }
        if self.is_connected() {
            self.logout();
        }
    }
}

/// `Ok(())` for [`CommandOutcome::Ok`], a `CommandFailed` error otherwise
pub(crate) fn require(command: Command, outcome: CommandOutcome) -> Result<()> {
    match outcome {
        CommandOutcome::Ok => Ok(()),
        other => Err(RaxFtpError::CommandFailed(command, other)),
    }
}

/// Check `reply` with `accept`; negative replies become `CommandFailed`
pub(crate) fn expect_reply(
    reply: &Reply,
    command: Command,
    accept: fn(&Reply) -> bool,
    expected: &'static str,
) -> Result<()> {
    if accept(reply) {
        Ok(())
    } else if reply.is_negative() {
        Err(RaxFtpError::CommandFailed(command, CommandOutcome::NotOk))
    } else {
        Err(RaxFtpError::UnexpectedReply {
            expected,
            received: reply.text().to_string(),
        })
    }
}

/// Leading decimal digits after the reply code
fn parse_size(reply: &Reply) -> Option<u64> {
    let value = reply.text().get(4..)?.trim_start();
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

fn parse_modification_time(reply: &Reply) -> Option<NaiveDateTime> {
    let text = reply.text();
    if text.len() < 18 {
        return None;
    }
    let stamp = text.get(4..)?.split('.').next()?.trim_end();
    if stamp.len() != 14 {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok()
}

/// Directory name between the first and the last quote, `""` meaning `"`
fn quoted_directory(message: &str) -> String {
    match (message.find('"'), message.rfind('"')) {
        (Some(start), Some(end)) if end > start => message[start + 1..end].replace("\"\"", "\""),
        _ => message.to_string(),
    }
}
