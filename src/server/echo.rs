use std::io;

use crate::http::request::Request;
use crate::http::resolver::Handler;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::http::websocket::{Relay, RelayStatus};
use crate::transport::ConnectionIo;

const CHUNK: usize = 512;

/// WebSocket endpoint that sends every received byte straight back.
///
/// Frames are not decoded; a masked client frame comes back masked. Plain
/// requests get `400`.
#[derive(Debug, Default)]
pub struct EchoSocket;

impl Handler for EchoSocket {
    fn handle(&self, _request: &Request<'_>) -> Response {
        ResponseBuilder::new(StatusCode::BadRequest)
            .header("Content-Type", "text/plain")
            .body(b"websocket upgrade required".to_vec())
            .build()
    }

    fn upgrade(&self, _request: &Request<'_>) -> Option<Box<dyn Relay>> {
        Some(Box::new(EchoRelay::default()))
    }
}

#[derive(Debug, Default)]
pub struct EchoRelay {
    /// Received but not yet written back.
    backlog: Vec<u8>,
}

impl Relay for EchoRelay {
    fn step(&mut self, io: &mut dyn ConnectionIo) -> io::Result<RelayStatus> {
        if self.backlog.is_empty() {
            let mut chunk = [0u8; CHUNK];
            let n = io.read_bytes_to_buffer(&mut chunk)?;
            self.backlog.extend_from_slice(&chunk[..n]);
        }

        if !self.backlog.is_empty() {
            let n = io.write_buffer(&self.backlog)?;
            self.backlog.drain(..n);
        }

        if io.peer_closed() && self.backlog.is_empty() && io.pending_byte_count() == 0 {
            return Ok(RelayStatus::Finished);
        }
        Ok(RelayStatus::Open)
    }
}
