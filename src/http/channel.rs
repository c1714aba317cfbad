//! The I/O half of a connection.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use crate::http::buffer::{Fill, ReceiveBuffer};
use crate::http::state::ClientState;
use crate::http::timeout::{Clock, TimeoutTracker};
use crate::transport::{ConnectionIo, Transport, is_would_block};

/// Bound transport, receive buffer, timeout bookkeeping and peer state.
///
/// Every read or write that moves bytes refreshes the idle timeout, no
/// matter whether the parser, a response writer or a relay performed it.
#[derive(Debug)]
pub struct Channel<T, C> {
    transport: Option<T>,
    buffer: ReceiveBuffer,
    timeout: TimeoutTracker,
    clock: C,
    client_state: ClientState,
    peer: Option<SocketAddr>,
    transferred: u64,
}

impl<T, C> Channel<T, C> {
    pub fn is_bound(&self) -> bool {
        self.transport.is_some()
    }

    /// Drop the transport. Returns whether one was bound.
    pub fn release(&mut self) -> bool {
        self.transport.take().is_some()
    }

    pub fn buffer(&self) -> &ReceiveBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut ReceiveBuffer {
        &mut self.buffer
    }

    pub fn client_state(&self) -> ClientState {
        self.client_state
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Bytes moved in either direction since the channel was created.
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    fn moved(&mut self, n: usize) {
        self.transferred += n as u64;
    }
}

impl<T: Transport, C: Clock> Channel<T, C> {
    pub fn new(buffer_size: usize, idle: Duration, shutdown_grace: Duration, clock: C) -> Self {
        Self {
            transport: None,
            buffer: ReceiveBuffer::new(buffer_size),
            timeout: TimeoutTracker::new(idle, shutdown_grace),
            clock,
            client_state: ClientState::Undefined,
            peer: None,
            transferred: 0,
        }
    }

    /// Take ownership of `transport`. Fails if it cannot report its peer.
    pub fn bind(&mut self, transport: T) -> io::Result<()> {
        self.peer = Some(transport.peer_addr()?);
        self.transport = Some(transport);
        self.client_state = ClientState::Active;
        self.timeout.refresh(self.clock.now());
        Ok(())
    }

    pub fn is_secure(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_secure())
    }

    /// One non-blocking refill of the receive buffer.
    pub fn fill(&mut self) -> io::Result<Fill> {
        let Some(transport) = self.transport.as_mut() else {
            return Ok(Fill::Closed);
        };
        if self.client_state == ClientState::Closed {
            return Ok(Fill::Closed);
        }

        let fill = self.buffer.fill_from(transport)?;
        match fill {
            Fill::Read(n) => {
                self.moved(n);
                self.timeout.refresh(self.clock.now());
            }
            Fill::Closed => self.client_state = ClientState::Closed,
            Fill::WouldBlock | Fill::Full => {}
        }
        Ok(fill)
    }

    pub fn timeout_exceeded(&self, closing: bool) -> bool {
        self.timeout.is_exceeded(self.clock.now(), closing)
    }

    /// Stamp the shutdown start and ask the transport for a graceful close.
    pub fn begin_shutdown(&mut self) -> io::Result<()> {
        self.timeout.begin_shutdown(self.clock.now());
        match self.transport.as_mut() {
            Some(transport) => transport.shutdown(),
            None => Ok(()),
        }
    }
}

impl<T: Transport, C: Clock> ConnectionIo for Channel<T, C> {
    fn write_buffer(&mut self, src: &[u8]) -> io::Result<usize> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(io::ErrorKind::NotConnected.into());
        };

        match transport.write(src) {
            Ok(n) => {
                if n > 0 {
                    self.moved(n);
                    self.timeout.refresh(self.clock.now());
                }
                Ok(n)
            }
            Err(e) if is_would_block(&e) => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn read_bytes_to_buffer(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        if dst.is_empty() {
            return Ok(0);
        }
        if self.buffer.pending() > 0 {
            let n = self.buffer.take(dst);
            self.moved(n);
            return Ok(n);
        }
        if self.client_state == ClientState::Closed {
            return Ok(0);
        }
        let Some(transport) = self.transport.as_mut() else {
            return Err(io::ErrorKind::NotConnected.into());
        };

        match transport.read(dst) {
            Ok(0) => {
                self.client_state = ClientState::Closed;
                Ok(0)
            }
            Ok(n) => {
                self.moved(n);
                self.timeout.refresh(self.clock.now());
                Ok(n)
            }
            Err(e) if is_would_block(&e) => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn pending_byte_count(&mut self) -> usize {
        let buffered = self.buffer.pending();
        match self.transport.as_mut() {
            Some(transport) => buffered + transport.pending(),
            None => buffered,
        }
    }

    fn peer_closed(&self) -> bool {
        self.client_state == ClientState::Closed
    }
}
