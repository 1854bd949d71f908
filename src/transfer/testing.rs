//! In-memory sockets for engine tests

use std::collections::{HashMap, VecDeque};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::commands::{Arguments, Command};
use crate::connection::{BlockingSocket, SocketKind};
use crate::error::{SocketError, SocketResult};
use crate::responses::Reply;
use crate::transfer::Observer;

pub const CONTROL_HOST: &str = "127.0.0.1";
pub const CONTROL_PORT: u16 = 21;
/// Local address the mock reports for the control connection
pub const CLIENT_ADDR: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 40000);
/// Port a listening data socket is bound to
pub const ACTIVE_PORT: u16 = 50000;

/// Hands out queued chunks, one per `receive`, then reports a close
pub struct ScriptedSocket {
    chunks: VecDeque<Vec<u8>>,
    sent: Vec<u8>,
    open: bool,
}

impl ScriptedSocket {
    pub fn with_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into(),
            sent: Vec::new(),
            open: true,
        }
    }

    pub fn sent(&self) -> &[u8] {
        &self.sent
    }
}

/// Move the next chunk (or the part of it that fits) into `buf`
fn pop_chunk(chunks: &mut VecDeque<Vec<u8>>, buf: &mut [u8]) -> usize {
    let Some(mut chunk) = chunks.pop_front() else {
        return 0;
    };
    let n = chunk.len().min(buf.len());
    buf[..n].copy_from_slice(&chunk[..n]);
    if n < chunk.len() {
        chunks.push_front(chunk.split_off(n));
    }
    n
}

impl BlockingSocket for ScriptedSocket {
    fn create_instance(&self) -> Box<dyn BlockingSocket> {
        Box::new(ScriptedSocket::with_chunks(Vec::new()))
    }

    fn create(&mut self, _kind: SocketKind) -> SocketResult<()> {
        self.open = true;
        Ok(())
    }

    fn bind(&mut self, _addr: SocketAddrV4) -> SocketResult<()> {
        Ok(())
    }

    fn listen(&mut self) -> SocketResult<()> {
        Ok(())
    }

    fn accept(
        &mut self,
        _timeout: Duration,
    ) -> SocketResult<Option<(Box<dyn BlockingSocket>, SocketAddrV4)>> {
        Ok(None)
    }

    fn connect(&mut self, _addr: SocketAddrV4, _timeout: Duration) -> SocketResult<()> {
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn send(&mut self, buf: &[u8], _timeout: Duration) -> SocketResult<usize> {
        self.sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> SocketResult<usize> {
        Ok(pop_chunk(&mut self.chunks, buf))
    }

    fn send_datagram(
        &mut self,
        _buf: &[u8],
        _to: SocketAddrV4,
        _timeout: Duration,
    ) -> SocketResult<usize> {
        Err(SocketError::InvalidState("scripted socket has no datagrams"))
    }

    fn receive_datagram(
        &mut self,
        _buf: &mut [u8],
        _timeout: Duration,
    ) -> SocketResult<(usize, SocketAddrV4)> {
        Err(SocketError::InvalidState("scripted socket has no datagrams"))
    }

    fn peer_addr(&self) -> SocketResult<SocketAddrV4> {
        Ok(SocketAddrV4::new(Ipv4Addr::LOCALHOST, CONTROL_PORT))
    }

    fn sock_addr(&self) -> SocketResult<SocketAddrV4> {
        Ok(CLIENT_ADDR)
    }

    fn check_readability(&self) -> SocketResult<bool> {
        Ok(!self.chunks.is_empty())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[derive(Default)]
struct ServerState {
    greeting: String,
    greeting_cut: bool,
    replies: HashMap<String, VecDeque<String>>,
    commands: Vec<String>,
    downloads: VecDeque<Vec<Vec<u8>>>,
    uploaded: Vec<u8>,
    data_connects: Vec<SocketAddrV4>,
    accepted: usize,
}

impl ServerState {
    fn reply_for(&mut self, line: &str) -> String {
        let verb = line
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        match self.replies.get_mut(&verb).and_then(VecDeque::pop_front) {
            Some(reply) => reply,
            None if verb == "QUIT" => "221 Goodbye".to_string(),
            None => "502 Command not implemented".to_string(),
        }
    }
}

/// Scripted FTP server reached through [`MockServer::socket`].
///
/// Replies are queued per verb; a connect to the control address yields the
/// control connection, every other connect or accept yields the next queued
/// download payload.
#[derive(Clone)]
pub struct MockServer {
    state: Arc<Mutex<ServerState>>,
}

impl MockServer {
    pub fn new() -> Self {
        let state = ServerState {
            greeting: "220 Mock FTP server ready".to_string(),
            ..ServerState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn greeting(self, text: &str) -> Self {
        self.state.lock().unwrap().greeting = text.to_string();
        self
    }

    /// Greeting the server closes on before sending the line terminator
    pub fn cut_greeting(self, text: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.greeting = text.to_string();
            state.greeting_cut = true;
        }
        self
    }

    /// Queue `text` (may contain several CRLF separated lines) as the
    /// answer to the next `verb`
    pub fn reply(self, verb: &str, text: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .entry(verb.to_ascii_uppercase())
            .or_default()
            .push_back(text.to_string());
        self
    }

    /// Queue the chunks the next data connection delivers
    pub fn download(self, chunks: &[&[u8]]) -> Self {
        self.state
            .lock()
            .unwrap()
            .downloads
            .push_back(chunks.iter().map(|c| c.to_vec()).collect());
        self
    }

    /// Socket prototype for the client under test
    pub fn socket(&self) -> Box<dyn BlockingSocket> {
        Box::new(MockSocket::new(self.state.clone()))
    }

    /// Command lines received so far, without CRLF
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn uploaded(&self) -> Vec<u8> {
        self.state.lock().unwrap().uploaded.clone()
    }

    pub fn data_connects(&self) -> Vec<SocketAddrV4> {
        self.state.lock().unwrap().data_connects.clone()
    }

    pub fn accepted(&self) -> usize {
        self.state.lock().unwrap().accepted
    }
}

enum Role {
    Unassigned,
    Control { inbox: VecDeque<u8>, pending: Vec<u8> },
    Listening,
    Data { chunks: VecDeque<Vec<u8>> },
    Closed,
}

struct MockSocket {
    state: Arc<Mutex<ServerState>>,
    role: Role,
}

impl MockSocket {
    fn new(state: Arc<Mutex<ServerState>>) -> Self {
        Self {
            state,
            role: Role::Unassigned,
        }
    }

    fn data_role(state: &mut ServerState) -> Role {
        Role::Data {
            chunks: state.downloads.pop_front().unwrap_or_default().into(),
        }
    }
}

impl BlockingSocket for MockSocket {
    fn create_instance(&self) -> Box<dyn BlockingSocket> {
        Box::new(MockSocket::new(self.state.clone()))
    }

    fn create(&mut self, _kind: SocketKind) -> SocketResult<()> {
        self.role = Role::Unassigned;
        Ok(())
    }

    fn bind(&mut self, _addr: SocketAddrV4) -> SocketResult<()> {
        Ok(())
    }

    fn listen(&mut self) -> SocketResult<()> {
        self.role = Role::Listening;
        Ok(())
    }

    fn accept(
        &mut self,
        _timeout: Duration,
    ) -> SocketResult<Option<(Box<dyn BlockingSocket>, SocketAddrV4)>> {
        if !matches!(self.role, Role::Listening) {
            return Err(SocketError::InvalidState("accept requires a listening socket"));
        }
        let mut state = self.state.lock().unwrap();
        state.accepted += 1;
        let socket = MockSocket {
            state: self.state.clone(),
            role: MockSocket::data_role(&mut state),
        };
        Ok(Some((
            Box::new(socket),
            SocketAddrV4::new(Ipv4Addr::LOCALHOST, 20),
        )))
    }

    fn connect(&mut self, addr: SocketAddrV4, _timeout: Duration) -> SocketResult<()> {
        let mut state = self.state.lock().unwrap();
        if addr == SocketAddrV4::new(Ipv4Addr::LOCALHOST, CONTROL_PORT) {
            let mut inbox: VecDeque<u8> = state.greeting.bytes().collect();
            if !state.greeting_cut {
                inbox.extend(b"\r\n");
            }
            self.role = Role::Control {
                inbox,
                pending: Vec::new(),
            };
        } else {
            state.data_connects.push(addr);
            self.role = MockSocket::data_role(&mut state);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.role = Role::Closed;
    }

    fn send(&mut self, buf: &[u8], _timeout: Duration) -> SocketResult<usize> {
        let mut state = self.state.lock().unwrap();
        match &mut self.role {
            Role::Control { inbox, pending } => {
                pending.extend_from_slice(buf);
                while let Some(pos) = pending.windows(2).position(|w| w == b"\r\n") {
                    let line: Vec<u8> = pending.drain(..pos + 2).take(pos).collect();
                    let line = String::from_utf8_lossy(&line).into_owned();
                    let reply = state.reply_for(&line);
                    state.commands.push(line);
                    inbox.extend(reply.bytes());
                    inbox.extend(b"\r\n");
                }
                Ok(buf.len())
            }
            Role::Data { .. } => {
                state.uploaded.extend_from_slice(buf);
                Ok(buf.len())
            }
            _ => Err(SocketError::InvalidState("send requires a connected socket")),
        }
    }

    fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> SocketResult<usize> {
        match &mut self.role {
            Role::Control { inbox, .. } => {
                let n = inbox.len().min(buf.len());
                for (slot, byte) in buf.iter_mut().zip(inbox.drain(..n)) {
                    *slot = byte;
                }
                Ok(n)
            }
            Role::Data { chunks } => Ok(pop_chunk(chunks, buf)),
            _ => Err(SocketError::InvalidState("receive requires a connected socket")),
        }
    }

    fn send_datagram(
        &mut self,
        _buf: &[u8],
        _to: SocketAddrV4,
        _timeout: Duration,
    ) -> SocketResult<usize> {
        Err(SocketError::InvalidState("mock server has no datagrams"))
    }

    fn receive_datagram(
        &mut self,
        _buf: &mut [u8],
        _timeout: Duration,
    ) -> SocketResult<(usize, SocketAddrV4)> {
        Err(SocketError::InvalidState("mock server has no datagrams"))
    }

    fn peer_addr(&self) -> SocketResult<SocketAddrV4> {
        Ok(SocketAddrV4::new(Ipv4Addr::LOCALHOST, CONTROL_PORT))
    }

    fn sock_addr(&self) -> SocketResult<SocketAddrV4> {
        match self.role {
            Role::Listening | Role::Unassigned => {
                Ok(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, ACTIVE_PORT))
            }
            Role::Closed => Err(SocketError::InvalidState("socket is not open")),
            _ => Ok(CLIENT_ADDR),
        }
    }

    fn check_readability(&self) -> SocketResult<bool> {
        match &self.role {
            Role::Control { inbox, .. } => Ok(!inbox.is_empty()),
            Role::Data { chunks } => Ok(!chunks.is_empty()),
            _ => Ok(false),
        }
    }

    fn is_open(&self) -> bool {
        !matches!(self.role, Role::Closed)
    }
}

/// Observer that keeps what it was told
#[derive(Default)]
pub struct RecordingObserver {
    errors: Mutex<Vec<String>>,
    responses: Mutex<Vec<String>>,
    commands: Mutex<Vec<String>>,
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn responses(&self) -> Vec<String> {
        self.responses.lock().unwrap().clone()
    }

    /// Masked command lines
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// File and data events, e.g. `pre-receive a.txt -> mem (Some(10))`
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn event(&self, text: String) {
        self.events.lock().unwrap().push(text);
    }
}

impl Observer for RecordingObserver {
    fn on_internal_error(&self, message: &str, _file: &str, _line: u32) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn on_begin_receiving_data(&self) {
        self.event("begin".to_string());
    }

    fn on_end_receiving_data(&self, total_bytes: u64) {
        self.event(format!("end {}", total_bytes));
    }

    fn on_pre_receive_file(&self, source: &str, target: &str, size: Option<u64>) {
        self.event(format!("pre-receive {} -> {} ({:?})", source, target, size));
    }

    fn on_post_receive_file(&self, source: &str, target: &str, size: Option<u64>) {
        self.event(format!("post-receive {} -> {} ({:?})", source, target, size));
    }

    fn on_pre_send_file(&self, source: &str, target: &str, size: u64) {
        self.event(format!("pre-send {} -> {} ({})", source, target, size));
    }

    fn on_post_send_file(&self, source: &str, target: &str, size: u64) {
        self.event(format!("post-send {} -> {} ({})", source, target, size));
    }

    fn on_send_command(&self, command: Command, args: &Arguments) {
        self.commands.lock().unwrap().push(command.masked_line(args));
    }

    fn on_response(&self, reply: &Reply) {
        self.responses.lock().unwrap().push(reply.text().to_string());
    }
}
