#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::{Duration, Instant};

use beacon::config::ConnectionConfig;
use beacon::http::connection::Connection;
use beacon::http::headers::Headers;
use beacon::http::request::{Method, Request};
use beacon::http::resolver::{Handler, Resolver};
use beacon::http::response::Response;
use beacon::http::timeout::Clock;
use beacon::http::websocket::Relay;
use beacon::server::echo::EchoRelay;
use beacon::transport::Transport;

pub static NO_DEFAULTS: Headers = Headers::new();

#[derive(Default)]
struct Script {
    incoming: VecDeque<Vec<u8>>,
    outgoing: Vec<u8>,
    eof: bool,
    shutdowns: usize,
    write_limit: Option<usize>,
    fail_reads: bool,
    fail_writes: bool,
    fail_shutdown: bool,
    fail_peer_addr: bool,
}

/// In-memory transport fed by a [`Peer`] handle.
pub struct ScriptedTransport {
    script: Rc<RefCell<Script>>,
}

/// The test's side of a [`ScriptedTransport`].
#[derive(Clone)]
pub struct Peer {
    script: Rc<RefCell<Script>>,
}

pub fn pair() -> (ScriptedTransport, Peer) {
    let script = Rc::new(RefCell::new(Script::default()));
    (
        ScriptedTransport {
            script: Rc::clone(&script),
        },
        Peer { script },
    )
}

impl Peer {
    /// Queue `bytes` as one read.
    pub fn send(&self, bytes: impl AsRef<[u8]>) {
        self.script
            .borrow_mut()
            .incoming
            .push_back(bytes.as_ref().to_vec());
    }

    /// Queue every byte as its own read.
    pub fn send_bytewise(&self, bytes: impl AsRef<[u8]>) {
        for &b in bytes.as_ref() {
            self.send([b]);
        }
    }

    /// Half-close: reads return EOF once queued bytes are drained.
    pub fn close(&self) {
        self.script.borrow_mut().eof = true;
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.script.borrow().outgoing).into_owned()
    }

    pub fn take_output(&self) -> String {
        let bytes = std::mem::take(&mut self.script.borrow_mut().outgoing);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn shutdowns(&self) -> usize {
        self.script.borrow().shutdowns
    }

    /// Accept at most `limit` bytes per write; `Some(0)` blocks writes.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.script.borrow_mut().write_limit = limit;
    }

    pub fn fail_reads(&self) {
        self.script.borrow_mut().fail_reads = true;
    }

    pub fn fail_writes(&self) {
        self.script.borrow_mut().fail_writes = true;
    }

    pub fn fail_shutdown(&self) {
        self.script.borrow_mut().fail_shutdown = true;
    }

    pub fn fail_peer_addr(&self) {
        self.script.borrow_mut().fail_peer_addr = true;
    }
}

impl Transport for ScriptedTransport {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        let mut script = self.script.borrow_mut();
        if script.fail_reads {
            return Err(io::ErrorKind::ConnectionReset.into());
        }
        let Some(mut chunk) = script.incoming.pop_front() else {
            return if script.eof {
                Ok(0)
            } else {
                Err(io::ErrorKind::WouldBlock.into())
            };
        };

        let n = chunk.len().min(dst.len());
        dst[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            script.incoming.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        let mut script = self.script.borrow_mut();
        if script.fail_writes {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        let n = match script.write_limit {
            Some(0) => return Err(io::ErrorKind::WouldBlock.into()),
            Some(limit) => src.len().min(limit),
            None => src.len(),
        };
        script.outgoing.extend_from_slice(&src[..n]);
        Ok(n)
    }

    fn pending(&mut self) -> usize {
        self.script.borrow().incoming.iter().map(Vec::len).sum()
    }

    fn shutdown(&mut self) -> io::Result<()> {
        let mut script = self.script.borrow_mut();
        if script.fail_shutdown {
            return Err(io::ErrorKind::NotConnected.into());
        }
        script.shutdowns += 1;
        Ok(())
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        if self.script.borrow().fail_peer_addr {
            return Err(io::ErrorKind::NotConnected.into());
        }
        Ok(SocketAddr::from(([127, 0, 0, 1], 40000)))
    }
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Resolver that answers `200 "<METHOD> <target>"` for everything except
/// `/missing`, records each handled request, and upgrades `/ws`.
#[derive(Default)]
pub struct Recorder {
    resolves: Cell<usize>,
    handled: RefCell<Vec<Recorded>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolves(&self) -> usize {
        self.resolves.get()
    }

    pub fn handled(&self) -> Vec<Recorded> {
        self.handled.borrow().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.handled.borrow().iter().map(|r| r.path.clone()).collect()
    }
}

impl Resolver for Recorder {
    fn resolve(&self, _method: Method, path: &str, _headers: &Headers) -> Option<&dyn Handler> {
        self.resolves.set(self.resolves.get() + 1);
        if path == "/missing" {
            return None;
        }
        Some(self)
    }
}

impl Handler for Recorder {
    fn handle(&self, request: &Request<'_>) -> Response {
        self.handled.borrow_mut().push(Recorded {
            method: request.method,
            path: request.path.to_string(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: request.body.to_vec(),
        });
        Response::ok(format!("{} {}", request.method, request.path))
    }

    fn upgrade(&self, request: &Request<'_>) -> Option<Box<dyn Relay>> {
        if request.path_only() == "/ws" {
            Some(Box::new(EchoRelay::default()))
        } else {
            None
        }
    }
}

pub type TestConnection<'a> = Connection<'a, ScriptedTransport, ManualClock>;

/// An initialized connection over a fresh scripted transport.
pub fn connect<'a>(
    resolver: &'a dyn Resolver,
    config: &ConnectionConfig,
    defaults: &'a Headers,
) -> (TestConnection<'a>, Peer, ManualClock) {
    let clock = ManualClock::new();
    let (transport, peer) = pair();
    let mut conn = Connection::with_clock(resolver, config, clock.clone());
    conn.initialize(transport, defaults)
        .expect("initialize scripted connection");
    (conn, peer, clock)
}

/// Step until the connection reports something other than `Busy`.
pub fn settle(conn: &mut TestConnection<'_>) {
    for _ in 0..1000 {
        if conn.step() != beacon::http::connection::Progress::Busy {
            return;
        }
    }
    panic!("connection never settled");
}

/// Number of response status lines in `output`.
pub fn response_count(output: &str) -> usize {
    output.matches("HTTP/1.1 ").count()
}
