//! Byte transports a connection runs over.
//!
//! A [`Connection`](crate::http::connection::Connection) owns exactly one
//! [`Transport`] and never cares whether it is encrypted:
//!
//! - [`PlainTransport`]: a non-blocking TCP stream
//! - [`TlsTransport`]: the same stream wrapped in a rustls server session
//!
//! Response writers and WebSocket relays only ever see [`ConnectionIo`].

use std::io;
use std::net::SocketAddr;

pub mod plain;
pub mod tls;

pub use plain::PlainTransport;
pub use tls::TlsTransport;

/// Non-blocking byte transport owned by a connection.
///
/// `read` and `write` follow `std::io` conventions: `Ok(0)` from `read`
/// means the peer closed its side, `ErrorKind::WouldBlock` means nothing can
/// be moved right now. Any other error is a hard transport failure.
pub trait Transport {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize>;

    fn write(&mut self, src: &[u8]) -> io::Result<usize>;

    /// Bytes that can be read without blocking, as far as the transport
    /// can tell.
    fn pending(&mut self) -> usize;

    /// Start a graceful close (half-close or close_notify).
    fn shutdown(&mut self) -> io::Result<()>;

    fn is_secure(&self) -> bool {
        false
    }

    fn peer_addr(&self) -> io::Result<SocketAddr>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        (**self).read(dst)
    }

    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        (**self).write(src)
    }

    fn pending(&mut self) -> usize {
        (**self).pending()
    }

    fn shutdown(&mut self) -> io::Result<()> {
        (**self).shutdown()
    }

    fn is_secure(&self) -> bool {
        (**self).is_secure()
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        (**self).peer_addr()
    }
}

/// The only channel through which response writers and relays move bytes.
///
/// Unlike [`Transport`], would-block is reported as `Ok(0)`; a closed peer
/// is reported through [`peer_closed`](ConnectionIo::peer_closed).
pub trait ConnectionIo {
    /// Best-effort write; returns the number of bytes accepted.
    fn write_buffer(&mut self, src: &[u8]) -> io::Result<usize>;

    /// Read into `dst`, draining bytes the connection already buffered
    /// before touching the transport.
    fn read_bytes_to_buffer(&mut self, dst: &mut [u8]) -> io::Result<usize>;

    /// Bytes readable right now without blocking.
    fn pending_byte_count(&mut self) -> usize;

    fn peer_closed(&self) -> bool;
}

pub(crate) fn is_would_block(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
