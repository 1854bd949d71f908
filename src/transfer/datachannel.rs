//! Data connection lifecycle
//!
//! One call opens exactly one data connection (active or passive), runs the
//! transfer loop over it and closes it again before the final reply is read.

use log::{debug, info};
use std::net::{Ipv4Addr, SocketAddrV4};

use crate::client::{DataMode, RaxFtpClient, expect_reply, require};
use crate::commands::{Arguments, Command};
use crate::connection::{BlockingSocket, SocketKind};
use crate::error::{RaxFtpError, Result, SocketError};
use crate::responses::Reply;
use crate::transfer::TransferNotification;
use crate::types::Representation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PasvScan {
    /// Looking for `(`
    Open,
    /// h1..h4, each ended by `,`
    Address,
    /// p1, ended by `,`
    PortHigh,
    /// p2, ended by `)`
    PortLow,
    Done,
}

/// Read `(h1,h2,h3,h4,p1,p2)` out of a `227` reply text.
///
/// Every field must hold one to three digits with a value up to 255;
/// anything else yields `None`, never a partial address.
pub fn parse_pasv_reply(text: &str) -> Option<SocketAddrV4> {
    let mut state = PasvScan::Open;
    let mut octets = [0u8; 4];
    let mut filled = 0;
    let mut value: Option<u16> = None;
    let mut port_high = 0u8;
    let mut port_low = 0u8;

    for c in text.chars() {
        state = match (state, c) {
            (PasvScan::Open, '(') => PasvScan::Address,
            (PasvScan::Open, _) => PasvScan::Open,
            (PasvScan::Done, _) => break,
            (_, '0'..='9') => {
                let digit = c as u16 - '0' as u16;
                let next = value.unwrap_or(0) * 10 + digit;
                if next > 255 {
                    return None;
                }
                value = Some(next);
                state
            }
            (PasvScan::Address, ',') => {
                octets[filled] = value.take()? as u8;
                filled += 1;
                if filled == octets.len() {
                    PasvScan::PortHigh
                } else {
                    PasvScan::Address
                }
            }
            (PasvScan::PortHigh, ',') => {
                port_high = value.take()? as u8;
                PasvScan::PortLow
            }
            (PasvScan::PortLow, ')') => {
                port_low = value.take()? as u8;
                PasvScan::Done
            }
            _ => return None,
        };
    }

    if state != PasvScan::Done {
        return None;
    }
    let port = u16::from(port_high) << 8 | u16::from(port_low);
    Some(SocketAddrV4::new(Ipv4Addr::from(octets), port))
}

impl RaxFtpClient {
    /// Run a command that moves data over a data connection.
    ///
    /// `offset` is sent as `REST` before `STOR`, `RETR` or `APPE` when resume
    /// mode is on. Returns true only for a 2yz final reply.
    pub fn execute_data_channel_command(
        &mut self,
        command: Command,
        path: &str,
        representation: Representation,
        mode: DataMode,
        offset: u64,
        notification: &mut dyn TransferNotification,
    ) -> bool {
        let result =
            self.run_data_channel_command(command, path, representation, mode, offset, notification);
        self.settle(result, file!(), line!()).is_ok()
    }

    pub(crate) fn run_data_channel_command(
        &mut self,
        command: Command,
        path: &str,
        representation: Representation,
        mode: DataMode,
        offset: u64,
        notification: &mut dyn TransferNotification,
    ) -> Result<()> {
        if command.is_non_data_channel() {
            return Err(RaxFtpError::NotDataChannelCommand(command));
        }
        if self.is_transferring_data() {
            return Err(RaxFtpError::TransferInProgress);
        }
        if !self.is_connected() {
            return Err(RaxFtpError::NotConnected);
        }

        self.flags.begin_transfer();
        let result = self.run_transfer(command, path, representation, mode, offset, notification);
        self.flags.end_transfer();
        result
    }

    fn run_transfer(
        &mut self,
        command: Command,
        path: &str,
        representation: Representation,
        mode: DataMode,
        offset: u64,
        notification: &mut dyn TransferNotification,
    ) -> Result<()> {
        require(Command::Type, self.negotiate_representation(representation)?)?;

        let args = Arguments::from(path);
        let mut data = match mode {
            DataMode::Active => self.open_active_data_connection(command, &args, offset)?,
            DataMode::Passive => self.open_passive_data_connection(command, &args, offset)?,
        };

        let transferred = if command.is_data_channel_write() {
            self.send_data(data.as_mut(), notification)
        } else {
            self.receive_data(data.as_mut(), notification)
        };
        data.close();
        debug!("Data connection closed");

        match transferred {
            Ok(total) => info!("{} transferred {} bytes", command, total),
            Err(RaxFtpError::Aborted) => {
                self.abort_handshake()?;
                return Err(RaxFtpError::Aborted);
            }
            Err(err) => return Err(err),
        }

        let reply = self.get_response()?;
        expect_reply(
            &reply,
            command,
            Reply::is_positive_completion,
            "2yz transfer completion",
        )
    }

    fn restart_if_resuming(&mut self, command: Command, offset: u64) -> Result<()> {
        let restartable = matches!(command, Command::Stor | Command::Retr | Command::Appe);
        if self.resume && restartable && offset != 0 {
            require(Command::Rest, self.request_restart(offset)?)?;
        }
        Ok(())
    }

    /// Send the data command itself; the server must answer 1yz
    fn start_data_command(&mut self, command: Command, args: &Arguments) -> Result<()> {
        let reply = self.execute(command, args)?;
        expect_reply(
            &reply,
            command,
            Reply::is_positive_preliminary,
            "1yz transfer start",
        )
    }

    fn open_active_data_connection(
        &mut self,
        command: Command,
        args: &Arguments,
        offset: u64,
    ) -> Result<Box<dyn BlockingSocket>> {
        let mut listener = self.socket_factory.create_instance();
        let accepted = self.accept_active_data_connection(listener.as_mut(), command, args, offset);
        listener.close();
        accepted
    }

    fn accept_active_data_connection(
        &mut self,
        listener: &mut dyn BlockingSocket,
        command: Command,
        args: &Arguments,
        offset: u64,
    ) -> Result<Box<dyn BlockingSocket>> {
        listener.create(SocketKind::Stream)?;
        listener.bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))?;
        listener.listen()?;
        let port = listener.sock_addr()?.port();

        let local = SocketAddrV4::new(*self.control_address()?.ip(), port);
        require(Command::Port, self.request_data_port(local)?)?;
        self.restart_if_resuming(command, offset)?;
        self.start_data_command(command, args)?;

        match listener.accept(self.timeout)? {
            Some((socket, peer)) => {
                info!("Accepted data connection from {}", peer);
                Ok(socket)
            }
            None => Err(SocketError::Closed.into()),
        }
    }

    fn open_passive_data_connection(
        &mut self,
        command: Command,
        args: &Arguments,
        offset: u64,
    ) -> Result<Box<dyn BlockingSocket>> {
        let addr = self.request_passive()?;

        let mut socket = self.socket_factory.create_instance();
        let started = self.connect_passive_data_connection(socket.as_mut(), addr, command, args, offset);
        match started {
            Ok(()) => Ok(socket),
            Err(err) => {
                socket.close();
                Err(err)
            }
        }
    }

    fn connect_passive_data_connection(
        &mut self,
        socket: &mut dyn BlockingSocket,
        addr: SocketAddrV4,
        command: Command,
        args: &Arguments,
        offset: u64,
    ) -> Result<()> {
        socket.create(SocketKind::Stream)?;
        socket.connect(addr, self.timeout)?;
        info!("Data connection established to {}", addr);

        self.restart_if_resuming(command, offset)?;
        self.start_data_command(command, args)
    }

    /// Download loop. Stops at end of data or when an abort is flagged.
    fn receive_data(
        &mut self,
        data: &mut dyn BlockingSocket,
        target: &mut dyn TransferNotification,
    ) -> Result<u64> {
        let mut buffer = vec![0u8; self.buffer_size];
        let mut total = 0u64;

        for observer in &self.observers {
            observer.on_begin_receiving_data();
        }

        loop {
            if self.flags.abort_requested() {
                return Err(RaxFtpError::Aborted);
            }
            let n = data.receive(&mut buffer, self.timeout)?;
            if n == 0 {
                break;
            }

            let chunk = &buffer[..n];
            for observer in &self.observers {
                observer.on_bytes_received(chunk);
            }
            target.on_bytes_received(chunk)?;
            total += n as u64;
        }

        for observer in &self.observers {
            observer.on_end_receiving_data(total);
        }
        Ok(total)
    }

    /// Upload loop. Sends exactly what the source hands out until it is empty.
    fn send_data(
        &mut self,
        data: &mut dyn BlockingSocket,
        source: &mut dyn TransferNotification,
    ) -> Result<u64> {
        let mut buffer = vec![0u8; self.buffer_size];
        let mut total = 0u64;

        loop {
            if self.flags.abort_requested() {
                return Err(RaxFtpError::Aborted);
            }
            let n = source.on_pre_bytes_send(&mut buffer)?;
            if n == 0 {
                break;
            }

            let chunk = &buffer[..n];
            data.write(chunk, self.timeout)?;
            for observer in &self.observers {
                observer.on_bytes_sent(chunk);
            }
            total += n as u64;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AbortHandle;
    use crate::responses::CommandOutcome;
    use crate::transfer::MemoryStream;
    use crate::transfer::testing::{CONTROL_HOST, CONTROL_PORT, MockServer, RecordingObserver};
    use crate::types::LogonInfo;
    use std::io;
    use std::sync::Arc;

    #[test]
    fn test_parse_pasv_reply() {
        assert_eq!(
            parse_pasv_reply("227 Entering Passive Mode (127,0,0,1,200,3)"),
            Some(SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 51203))
        );
        assert_eq!(
            parse_pasv_reply("227 Entering Passive Mode (192,168,1,10,4,1)."),
            Some(SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 10), 1025))
        );
    }

    #[test]
    fn test_parse_pasv_reply_rejects_malformed() {
        assert_eq!(parse_pasv_reply("227 Entering Passive Mode"), None);
        assert_eq!(parse_pasv_reply("227 (127,0,0,1,200,3"), None);
        assert_eq!(parse_pasv_reply("227 (127,0,0,1,200)"), None);
        assert_eq!(parse_pasv_reply("227 (127,0,,1,200,3)"), None);
        assert_eq!(parse_pasv_reply("227 (127,0,0,256,200,3)"), None);
        assert_eq!(parse_pasv_reply("227 (127, 0,0,1,200,3)"), None);
    }

    fn logged_in(server: &MockServer) -> RaxFtpClient {
        let mut client = RaxFtpClient::with_socket(server.socket());
        let logon = LogonInfo::new(CONTROL_HOST, CONTROL_PORT, "alice", "secret", "");
        assert!(client.login(&logon));
        client
    }

    fn scripted() -> MockServer {
        MockServer::new()
            .reply("USER", "230 Logged in")
            .reply("CWD", "250 OK")
            .reply("TYPE", "200 Type set")
    }

    /// Download target that requests an abort as soon as data arrives
    struct AbortingTarget {
        client_abort: AbortHandle,
        received: Vec<Vec<u8>>,
    }

    impl TransferNotification for AbortingTarget {
        fn local_stream_name(&self) -> String {
            "aborting".to_string()
        }

        fn local_stream_size(&self) -> u64 {
            0
        }

        fn set_local_stream_offset(&mut self, _offset: u64) -> io::Result<()> {
            Ok(())
        }

        fn on_bytes_received(&mut self, data: &[u8]) -> io::Result<()> {
            self.received.push(data.to_vec());
            self.client_abort.abort();
            Ok(())
        }

        fn on_pre_bytes_send(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_passive_retr() {
        let server = scripted()
            .reply("PASV", "227 Entering Passive Mode (127,0,0,1,200,3)")
            .reply("RETR", "150 Opening\r\n226 Transfer complete")
            .download(&[b"hello ", b"world"]);
        let mut client = logged_in(&server);
        let mut target = MemoryStream::new("mem");

        assert!(client.execute_data_channel_command(
            Command::Retr,
            "a.txt",
            Representation::image(),
            DataMode::Passive,
            0,
            &mut target,
        ));
        assert_eq!(target.data(), b"hello world");
        assert_eq!(
            server.data_connects(),
            vec![SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 51203)]
        );
        assert_eq!(&server.commands()[2..], &["TYPE I", "PASV", "RETR a.txt"]);
        assert!(!client.is_transferring_data());
    }

    #[test]
    fn test_active_retr_sends_port() {
        let server = scripted()
            .reply("PORT", "200 PORT ok")
            .reply("RETR", "150 Opening\r\n226 Transfer complete")
            .download(&[b"data"]);
        let mut client = logged_in(&server);
        let mut target = MemoryStream::new("mem");

        assert!(client.execute_data_channel_command(
            Command::Retr,
            "a.txt",
            Representation::image(),
            DataMode::Active,
            0,
            &mut target,
        ));
        assert_eq!(target.data(), b"data");
        assert_eq!(server.accepted(), 1);
        assert_eq!(
            &server.commands()[2..],
            &["TYPE I", "PORT 127,0,0,1,195,80", "RETR a.txt"]
        );
    }

    #[test]
    fn test_rest_sent_only_when_resuming() {
        let server = scripted()
            .reply("PASV", "227 Entering Passive Mode (127,0,0,1,200,3)")
            .reply("REST", "350 Restarting at 5")
            .reply("RETR", "150 Opening\r\n226 Transfer complete")
            .reply("TYPE", "200 Type set")
            .reply("PASV", "227 Entering Passive Mode (127,0,0,1,200,3)")
            .reply("LIST", "150 Here\r\n226 Done");
        let mut client = logged_in(&server);
        client.set_resume_mode(true);

        let mut target = MemoryStream::new("mem");
        assert!(client.execute_data_channel_command(
            Command::Retr,
            "a.txt",
            Representation::image(),
            DataMode::Passive,
            5,
            &mut target,
        ));
        assert!(client.execute_data_channel_command(
            Command::List,
            "/",
            Representation::ascii(),
            DataMode::Passive,
            5,
            &mut target,
        ));
        let commands = server.commands();
        assert_eq!(commands.iter().filter(|c| c.starts_with("REST")).count(), 1);
        assert!(commands.contains(&"REST 5".to_string()));
    }

    #[test]
    fn test_upload_writes_source_bytes() {
        let server = scripted()
            .reply("PASV", "227 Entering Passive Mode (127,0,0,1,200,3)")
            .reply("STOR", "150 Ok to send\r\n226 Stored");
        let mut client = logged_in(&server);
        client.set_buffer_size(4);
        let mut source = MemoryStream::with_data("mem", b"0123456789".to_vec());

        assert!(client.execute_data_channel_command(
            Command::Stor,
            "b.bin",
            Representation::image(),
            DataMode::Passive,
            0,
            &mut source,
        ));
        assert_eq!(server.uploaded(), b"0123456789");
    }

    #[test]
    fn test_failed_start_and_completion() {
        let server = scripted()
            .reply("PASV", "227 Entering Passive Mode (127,0,0,1,200,3)")
            .reply("RETR", "550 No such file")
            .reply("PASV", "227 Entering Passive Mode (127,0,0,1,200,3)")
            .reply("RETR", "150 Opening\r\n451 Local error");
        let observer = Arc::new(RecordingObserver::default());
        let mut client = logged_in(&server);
        client.attach_observer(observer.clone());
        let mut target = MemoryStream::new("mem");

        for _ in 0..2 {
            assert!(!client.execute_data_channel_command(
                Command::Retr,
                "a.txt",
                Representation::image(),
                DataMode::Passive,
                0,
                &mut target,
            ));
        }
        // negative replies are outcomes, not internal errors
        assert!(observer.errors().is_empty());
    }

    #[test]
    fn test_rejects_non_data_channel_command() {
        let server = scripted();
        let observer = Arc::new(RecordingObserver::default());
        let mut client = logged_in(&server);
        client.attach_observer(observer.clone());
        let mut target = MemoryStream::new("mem");

        assert!(!client.execute_data_channel_command(
            Command::Noop,
            "",
            Representation::image(),
            DataMode::Passive,
            0,
            &mut target,
        ));
        assert_eq!(observer.errors(), vec!["NOOP does not use the data channel"]);
        assert_eq!(server.commands().len(), 2);
    }

    #[test]
    fn test_abort_during_download() {
        let server = scripted()
            .reply("PASV", "227 Entering Passive Mode (127,0,0,1,200,3)")
            .reply("RETR", "150 Opening")
            .reply("ABOR", "426 Transfer aborted\r\n226 Abort successful")
            .download(&[b"first", b"second", b"third"]);
        let mut client = logged_in(&server);
        let mut target = AbortingTarget {
            client_abort: client.abort_handle(),
            received: Vec::new(),
        };

        assert!(!client.execute_data_channel_command(
            Command::Retr,
            "big.bin",
            Representation::image(),
            DataMode::Passive,
            0,
            &mut target,
        ));
        assert_eq!(target.received, vec![b"first".to_vec()]);
        assert_eq!(server.commands().last().map(String::as_str), Some("ABOR"));
        assert!(!client.is_transferring_data());

        // control connection is still in step after the handshake
        assert_eq!(client.noop(), CommandOutcome::NotOk);
    }
}
