use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

use super::Transport;

/// How far ahead `pending` looks into the socket.
const PEEK_WINDOW: usize = 256;

/// Plaintext transport over a non-blocking TCP stream.
#[derive(Debug)]
pub struct PlainTransport {
    stream: TcpStream,
}

impl PlainTransport {
    /// Wrap an accepted stream, switching it to non-blocking mode.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

impl Transport for PlainTransport {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.stream.read(dst)
    }

    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        self.stream.write(src)
    }

    fn pending(&mut self) -> usize {
        let mut probe = [0u8; PEEK_WINDOW];
        self.stream.peek(&mut probe).unwrap_or(0)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Write) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}
