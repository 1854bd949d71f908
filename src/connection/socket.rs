//! Blocking socket transport for RAX FTP Engine
//!
//! Every I/O call takes an explicit timeout. The engine only talks to the
//! [`BlockingSocket`] trait, so a scripted socket can stand in for a real
//! server in tests.

use log::{debug, info, warn};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read, Write};
use std::net::{
    IpAddr, Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpListener, TcpStream, UdpSocket,
};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{SocketError, SocketResult};

const LISTEN_BACKLOG: i32 = 5;
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Kind of socket to create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    Stream,
    Datagram,
}

/// Blocking socket with per-call timeouts.
///
/// Lifecycle: unopened -> created -> (connected | listening) -> closed.
pub trait BlockingSocket: Send {
    /// New, unopened socket of the same implementation (used for data connections)
    fn create_instance(&self) -> Box<dyn BlockingSocket>;

    fn create(&mut self, kind: SocketKind) -> SocketResult<()>;
    fn bind(&mut self, addr: SocketAddrV4) -> SocketResult<()>;
    fn listen(&mut self) -> SocketResult<()>;

    /// Wait for one inbound connection.
    ///
    /// Returns `Ok(None)` when the wait was interrupted because the listening
    /// socket went away underneath it.
    fn accept(
        &mut self,
        timeout: Duration,
    ) -> SocketResult<Option<(Box<dyn BlockingSocket>, SocketAddrV4)>>;

    fn connect(&mut self, addr: SocketAddrV4, timeout: Duration) -> SocketResult<()>;
    fn close(&mut self);

    /// Single send; may transfer fewer bytes than requested
    fn send(&mut self, buf: &[u8], timeout: Duration) -> SocketResult<usize>;

    /// Send the whole buffer, looping over partial sends
    fn write(&mut self, buf: &[u8], timeout: Duration) -> SocketResult<usize> {
        let mut sent = 0;
        while sent < buf.len() {
            let n = self.send(&buf[sent..], timeout)?;
            if n == 0 {
                return Err(SocketError::Closed);
            }
            sent += n;
        }
        Ok(sent)
    }

    /// Single receive; `Ok(0)` means the peer closed the connection
    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> SocketResult<usize>;

    fn send_datagram(
        &mut self,
        buf: &[u8],
        to: SocketAddrV4,
        timeout: Duration,
    ) -> SocketResult<usize>;
    fn receive_datagram(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> SocketResult<(usize, SocketAddrV4)>;

    fn peer_addr(&self) -> SocketResult<SocketAddrV4>;
    fn sock_addr(&self) -> SocketResult<SocketAddrV4>;

    /// Non-blocking poll: is there something to read right now?
    fn check_readability(&self) -> SocketResult<bool>;

    fn is_open(&self) -> bool;

    fn resolve_host(&self, host: &str, port: u16) -> SocketResult<SocketAddrV4> {
        resolve_host_by_name(host, port)
    }
}

/// Resolve a host name (or dotted address) to an IPv4 socket address
pub fn resolve_host_by_name(host: &str, port: u16) -> SocketResult<SocketAddrV4> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(SocketAddrV4::new(ip, port));
    }

    let addrs = dns_lookup::lookup_host(host).map_err(|e| {
        warn!("Lookup of '{}' failed: {}", host, e);
        SocketError::Resolve(host.to_string())
    })?;

    addrs
        .into_iter()
        .find_map(|ip| match ip {
            IpAddr::V4(v4) => Some(SocketAddrV4::new(v4, port)),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| SocketError::Resolve(host.to_string()))
}

/// Reverse lookup of an IPv4 address
pub fn resolve_host_by_addr(addr: Ipv4Addr) -> SocketResult<String> {
    dns_lookup::lookup_addr(&IpAddr::V4(addr))
        .map_err(|_| SocketError::Resolve(addr.to_string()))
}

fn to_v4(addr: SocketAddr) -> SocketResult<SocketAddrV4> {
    match addr {
        SocketAddr::V4(v4) => Ok(v4),
        SocketAddr::V6(_) => Err(SocketError::InvalidState("IPv6 is not supported")),
    }
}

fn io_timeout(timeout: Duration) -> Option<Duration> {
    Some(timeout.max(MIN_TIMEOUT))
}

enum Handle {
    Unopened,
    Created { socket: Socket, kind: SocketKind },
    Connected(TcpStream),
    Listening(TcpListener),
    Datagram(UdpSocket),
    Closed,
}

/// OS socket implementation of [`BlockingSocket`]
pub struct TcpSocket {
    handle: Handle,
}

impl TcpSocket {
    pub fn new() -> Self {
        Self {
            handle: Handle::Unopened,
        }
    }

    fn from_stream(stream: TcpStream) -> Self {
        Self {
            handle: Handle::Connected(stream),
        }
    }

    /// Turn a created datagram socket into a usable `UdpSocket`
    fn datagram(&mut self) -> SocketResult<&UdpSocket> {
        if let Handle::Created {
            kind: SocketKind::Datagram,
            ..
        } = self.handle
        {
            if let Handle::Created { socket, .. } =
                std::mem::replace(&mut self.handle, Handle::Unopened)
            {
                self.handle = Handle::Datagram(UdpSocket::from(socket));
            }
        }

        match &self.handle {
            Handle::Datagram(udp) => Ok(udp),
            _ => Err(SocketError::InvalidState("not a datagram socket")),
        }
    }
}

impl Default for TcpSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockingSocket for TcpSocket {
    fn create_instance(&self) -> Box<dyn BlockingSocket> {
        Box::new(TcpSocket::new())
    }

    fn create(&mut self, kind: SocketKind) -> SocketResult<()> {
        if self.is_open() {
            return Err(SocketError::InvalidState("socket already created"));
        }

        let socket = match kind {
            SocketKind::Stream => Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?,
            SocketKind::Datagram => Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?,
        };
        self.handle = Handle::Created { socket, kind };
        Ok(())
    }

    fn bind(&mut self, addr: SocketAddrV4) -> SocketResult<()> {
        let Handle::Created { socket, kind } = &self.handle else {
            return Err(SocketError::InvalidState("bind requires a created socket"));
        };
        socket.bind(&SockAddr::from(addr))?;
        debug!("Socket bound to {}", addr);

        if *kind == SocketKind::Datagram {
            self.datagram()?;
        }
        Ok(())
    }

    fn listen(&mut self) -> SocketResult<()> {
        match std::mem::replace(&mut self.handle, Handle::Unopened) {
            Handle::Created {
                socket,
                kind: SocketKind::Stream,
            } => {
                if let Err(e) = socket.listen(LISTEN_BACKLOG) {
                    self.handle = Handle::Created {
                        socket,
                        kind: SocketKind::Stream,
                    };
                    return Err(e.into());
                }
                self.handle = Handle::Listening(TcpListener::from(socket));
                Ok(())
            }
            other => {
                self.handle = other;
                Err(SocketError::InvalidState("listen requires a created stream socket"))
            }
        }
    }

    fn accept(
        &mut self,
        timeout: Duration,
    ) -> SocketResult<Option<(Box<dyn BlockingSocket>, SocketAddrV4)>> {
        let Handle::Listening(listener) = &self.handle else {
            return Err(SocketError::InvalidState("accept requires a listening socket"));
        };

        listener.set_nonblocking(true)?;
        let deadline = Instant::now() + timeout;
        let accepted = loop {
            match listener.accept() {
                Ok(pair) => break Ok(Some(pair)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        break Err(SocketError::Timeout);
                    }
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    debug!("Accept interrupted: {}", e);
                    break Ok(None);
                }
                Err(e) => break Err(SocketError::from(e)),
            }
        };
        let _ = listener.set_nonblocking(false);

        match accepted? {
            Some((stream, peer)) => {
                stream.set_nonblocking(false)?;
                let peer = to_v4(peer)?;
                info!("Accepted connection from {}", peer);
                Ok(Some((Box::new(TcpSocket::from_stream(stream)), peer)))
            }
            None => Ok(None),
        }
    }

    fn connect(&mut self, addr: SocketAddrV4, timeout: Duration) -> SocketResult<()> {
        match std::mem::replace(&mut self.handle, Handle::Unopened) {
            Handle::Created { socket, kind } => {
                let result = match kind {
                    SocketKind::Stream => {
                        socket.connect_timeout(&SockAddr::from(addr), timeout.max(MIN_TIMEOUT))
                    }
                    SocketKind::Datagram => socket.connect(&SockAddr::from(addr)),
                };
                if let Err(e) = result {
                    self.handle = Handle::Created { socket, kind };
                    return Err(e.into());
                }

                debug!("Connected to {}", addr);
                self.handle = match kind {
                    SocketKind::Stream => Handle::Connected(TcpStream::from(socket)),
                    SocketKind::Datagram => Handle::Datagram(UdpSocket::from(socket)),
                };
                Ok(())
            }
            other => {
                self.handle = other;
                Err(SocketError::InvalidState("connect requires a created socket"))
            }
        }
    }

    fn close(&mut self) {
        if let Handle::Connected(stream) = &self.handle {
            let _ = stream.shutdown(Shutdown::Both);
        }
        if self.is_open() {
            debug!("Socket closed");
        }
        self.handle = Handle::Closed;
    }

    fn send(&mut self, buf: &[u8], timeout: Duration) -> SocketResult<usize> {
        match &mut self.handle {
            Handle::Connected(stream) => {
                stream.set_write_timeout(io_timeout(timeout))?;
                Ok(stream.write(buf)?)
            }
            Handle::Datagram(udp) => {
                udp.set_write_timeout(io_timeout(timeout))?;
                Ok(udp.send(buf)?)
            }
            _ => Err(SocketError::InvalidState("send requires a connected socket")),
        }
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> SocketResult<usize> {
        match &mut self.handle {
            Handle::Connected(stream) => {
                stream.set_read_timeout(io_timeout(timeout))?;
                loop {
                    match stream.read(buf) {
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        other => return Ok(other?),
                    }
                }
            }
            Handle::Datagram(udp) => {
                udp.set_read_timeout(io_timeout(timeout))?;
                Ok(udp.recv(buf)?)
            }
            _ => Err(SocketError::InvalidState("receive requires a connected socket")),
        }
    }

    fn send_datagram(
        &mut self,
        buf: &[u8],
        to: SocketAddrV4,
        timeout: Duration,
    ) -> SocketResult<usize> {
        let udp = self.datagram()?;
        udp.set_write_timeout(io_timeout(timeout))?;
        Ok(udp.send_to(buf, to)?)
    }

    fn receive_datagram(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> SocketResult<(usize, SocketAddrV4)> {
        let udp = self.datagram()?;
        udp.set_read_timeout(io_timeout(timeout))?;
        let (n, from) = udp.recv_from(buf)?;
        Ok((n, to_v4(from)?))
    }

    fn peer_addr(&self) -> SocketResult<SocketAddrV4> {
        match &self.handle {
            Handle::Connected(stream) => to_v4(stream.peer_addr()?),
            Handle::Datagram(udp) => to_v4(udp.peer_addr()?),
            _ => Err(SocketError::InvalidState("socket is not connected")),
        }
    }

    fn sock_addr(&self) -> SocketResult<SocketAddrV4> {
        match &self.handle {
            Handle::Created { socket, .. } => socket
                .local_addr()?
                .as_socket_ipv4()
                .ok_or(SocketError::InvalidState("IPv6 is not supported")),
            Handle::Connected(stream) => to_v4(stream.local_addr()?),
            Handle::Listening(listener) => to_v4(listener.local_addr()?),
            Handle::Datagram(udp) => to_v4(udp.local_addr()?),
            Handle::Unopened | Handle::Closed => {
                Err(SocketError::InvalidState("socket is not open"))
            }
        }
    }

    fn check_readability(&self) -> SocketResult<bool> {
        let mut probe = [0u8; 1];
        let peeked = match &self.handle {
            Handle::Connected(stream) => {
                stream.set_nonblocking(true)?;
                let peeked = stream.peek(&mut probe);
                stream.set_nonblocking(false)?;
                peeked
            }
            Handle::Datagram(udp) => {
                udp.set_nonblocking(true)?;
                let peeked = udp.peek(&mut probe);
                udp.set_nonblocking(false)?;
                peeked
            }
            _ => return Err(SocketError::InvalidState("socket is not connected")),
        };

        match peeked {
            // a pending close is readable as well
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn is_open(&self) -> bool {
        !matches!(self.handle, Handle::Unopened | Handle::Closed)
    }
}

impl Drop for TcpSocket {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn loopback() -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)
    }

    fn listening_socket() -> (TcpSocket, SocketAddrV4) {
        let mut server = TcpSocket::new();
        server.create(SocketKind::Stream).unwrap();
        server.bind(loopback()).unwrap();
        server.listen().unwrap();
        let addr = server.sock_addr().unwrap();
        (server, addr)
    }

    #[test]
    fn test_connect_accept_and_exchange() {
        let (mut server, addr) = listening_socket();
        assert_ne!(addr.port(), 0);

        let mut client = TcpSocket::new();
        client.create(SocketKind::Stream).unwrap();
        client.connect(addr, TIMEOUT).unwrap();

        let (mut accepted, peer) = server.accept(TIMEOUT).unwrap().unwrap();
        assert_eq!(peer, client.sock_addr().unwrap());

        assert_eq!(client.write(b"hello", TIMEOUT).unwrap(), 5);
        let mut buf = [0u8; 16];
        let n = accepted.receive(&mut buf, TIMEOUT).unwrap();
        assert_eq!(&buf[..n], b"hello");

        client.close();
        assert_eq!(accepted.receive(&mut buf, TIMEOUT).unwrap(), 0);
        assert!(!client.is_open());
    }

    #[test]
    fn test_receive_times_out() {
        let (mut server, addr) = listening_socket();
        let mut client = TcpSocket::new();
        client.create(SocketKind::Stream).unwrap();
        client.connect(addr, TIMEOUT).unwrap();
        let _accepted = server.accept(TIMEOUT).unwrap();

        let mut buf = [0u8; 4];
        let result = client.receive(&mut buf, Duration::from_millis(50));
        assert_eq!(result, Err(SocketError::Timeout));
        assert!(!client.check_readability().unwrap());
    }

    #[test]
    fn test_accept_times_out() {
        let (mut server, _) = listening_socket();
        let result = server.accept(Duration::from_millis(50));
        assert!(matches!(result, Err(SocketError::Timeout)));
    }

    #[test]
    fn test_readability_after_send() {
        let (mut server, addr) = listening_socket();
        let mut client = TcpSocket::new();
        client.create(SocketKind::Stream).unwrap();
        client.connect(addr, TIMEOUT).unwrap();
        let (mut accepted, _) = server.accept(TIMEOUT).unwrap().unwrap();

        accepted.write(b"220 ready\r\n", TIMEOUT).unwrap();
        let deadline = Instant::now() + TIMEOUT;
        while !client.check_readability().unwrap() {
            assert!(Instant::now() < deadline, "data never became readable");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_datagram_roundtrip() {
        let mut receiver = TcpSocket::new();
        receiver.create(SocketKind::Datagram).unwrap();
        receiver.bind(loopback()).unwrap();
        let to = receiver.sock_addr().unwrap();

        let mut sender = TcpSocket::new();
        sender.create(SocketKind::Datagram).unwrap();
        sender.bind(loopback()).unwrap();
        sender.send_datagram(b"ping", to, TIMEOUT).unwrap();

        let mut buf = [0u8; 8];
        let (n, from) = receiver.receive_datagram(&mut buf, TIMEOUT).unwrap();
        assert_eq!(&buf[..n], b"ping");
        assert_eq!(from, sender.sock_addr().unwrap());
    }

    #[test]
    fn test_invalid_state_transitions() {
        let mut socket = TcpSocket::new();
        assert!(matches!(socket.listen(), Err(SocketError::InvalidState(_))));
        assert!(matches!(
            socket.send(b"x", TIMEOUT),
            Err(SocketError::InvalidState(_))
        ));

        socket.create(SocketKind::Stream).unwrap();
        assert!(matches!(
            socket.create(SocketKind::Stream),
            Err(SocketError::InvalidState(_))
        ));
    }

    #[test]
    fn test_connect_refused() {
        // grab a free port, then close it so nobody listens there
        let (mut server, addr) = listening_socket();
        server.close();

        let mut client = TcpSocket::new();
        client.create(SocketKind::Stream).unwrap();
        assert_eq!(
            client.connect(addr, TIMEOUT),
            Err(SocketError::ConnectionRefused)
        );
    }

    #[test]
    fn test_resolve_dotted_address() {
        let addr = resolve_host_by_name("10.1.2.3", 21).unwrap();
        assert_eq!(addr, SocketAddrV4::new(Ipv4Addr::new(10, 1, 2, 3), 21));
    }
}
