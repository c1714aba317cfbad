use std::fmt;
use std::io;
use std::net::SocketAddr;

use tracing::{debug, error, trace, warn};

use crate::config::ConnectionConfig;
use crate::http::buffer::{Fill, ReceiveBuffer};
use crate::http::channel::Channel;
use crate::http::headers::Headers;
use crate::http::line::LineParser;
use crate::http::parser::{self, ParseError};
use crate::http::request::{Method, Request, Version, wants_keep_alive};
use crate::http::resolver::Resolver;
use crate::http::response::{Response, StatusCode};
use crate::http::state::{ClientState, ConnectionState};
use crate::http::timeout::{Clock, SystemClock};
use crate::http::websocket::{self, Relay, RelayStatus};
use crate::http::writer::{ResponseWriter, serialize_response};
use crate::transport::{ConnectionIo, Transport};

static NO_HEADERS: Headers = Headers::new();

/// Outcome of one [`Connection::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Bytes moved or the state changed.
    Busy,
    /// Nothing to do until the peer sends or accepts more.
    Idle,
    /// The connection reached `Closed` or `Error` and can be dropped.
    Done,
}

#[derive(Debug)]
pub enum InitError {
    /// [`Connection::initialize`] was already called.
    AlreadyInitialized,
    /// The transport could not be bound.
    Bind(io::Error),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::AlreadyInitialized => write!(f, "connection already initialized"),
            InitError::Bind(e) => write!(f, "failed to bind transport: {}", e),
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::Bind(e) => Some(e),
            InitError::AlreadyInitialized => None,
        }
    }
}

enum Fault {
    /// The request was malformed or over a limit; the client gets a 4xx.
    Client(ParseError),
    /// The transport failed; nothing more is written.
    Server(io::Error),
}

impl From<ParseError> for Fault {
    fn from(e: ParseError) -> Self {
        Fault::Client(e)
    }
}

impl From<io::Error> for Fault {
    fn from(e: io::Error) -> Self {
        Fault::Server(e)
    }
}

/// A dispatched request whose response is still being written.
struct Exchange {
    writer: ResponseWriter,
    keep_alive: bool,
    relay: Option<Box<dyn Relay>>,
}

/// One HTTP/1.1 connection, driven by repeated calls to [`step`](Connection::step).
///
/// The connection owns its transport and never blocks: every step makes at
/// most one read attempt and one write attempt, parses whatever complete
/// lines are buffered, and returns. The resolver is consulted exactly once
/// per request, after the body has been received.
pub struct Connection<'a, T, C = SystemClock> {
    state: ConnectionState,
    channel: Channel<T, C>,
    line: LineParser,
    config: ConnectionConfig,
    resolver: &'a dyn Resolver,
    default_headers: &'a Headers,

    method: Option<Method>,
    version: Version,
    resource: String,
    headers: Headers,
    keep_alive: bool,
    body: Vec<u8>,
    body_remaining: usize,

    interim: Option<ResponseWriter>,
    exchange: Option<Exchange>,
    relay: Option<Box<dyn Relay>>,
    requests: u64,
}

impl<'a, T: Transport> Connection<'a, T> {
    pub fn new(resolver: &'a dyn Resolver, config: &ConnectionConfig) -> Self {
        Self::with_clock(resolver, config, SystemClock)
    }
}

impl<'a, T: Transport, C: Clock> Connection<'a, T, C> {
    pub fn with_clock(resolver: &'a dyn Resolver, config: &ConnectionConfig, clock: C) -> Self {
        Self {
            state: ConnectionState::Undefined,
            channel: Channel::new(
                config.receive_buffer_size,
                config.idle_timeout(),
                config.shutdown_timeout(),
                clock,
            ),
            line: LineParser::new(),
            config: config.clone(),
            resolver,
            default_headers: &NO_HEADERS,
            method: None,
            version: Version::Http11,
            resource: String::new(),
            headers: Headers::new(),
            keep_alive: false,
            body: Vec::new(),
            body_remaining: 0,
            interim: None,
            exchange: None,
            relay: None,
            requests: 0,
        }
    }

    /// Bind `transport` and start waiting for a request line.
    ///
    /// `default_headers` are added to every response that does not set
    /// them itself. A bind failure drops the transport and leaves the
    /// connection in `Error`.
    pub fn initialize(&mut self, transport: T, default_headers: &'a Headers) -> Result<(), InitError> {
        if self.state != ConnectionState::Undefined {
            return Err(InitError::AlreadyInitialized);
        }

        if let Err(e) = self.channel.bind(transport) {
            warn!(error = %e, "failed to bind transport");
            self.state = ConnectionState::Error;
            return Err(InitError::Bind(e));
        }

        self.default_headers = default_headers;
        self.state = ConnectionState::Initial;
        debug!(
            peer = ?self.channel.peer_addr(),
            secure = self.channel.is_secure(),
            "connection initialized"
        );
        Ok(())
    }

    /// Advance the connection as far as buffered and readily available
    /// bytes allow.
    pub fn step(&mut self) -> Progress {
        match self.state {
            ConnectionState::Undefined => return Progress::Idle,
            s if s.is_terminal() => return Progress::Done,
            _ => {}
        }

        let transferred = self.channel.transferred();
        let mut progressed = false;

        // In relay mode the relay does its own reading.
        if self.state != ConnectionState::WebSocket {
            match self.channel.fill() {
                Ok(Fill::Read(n)) => {
                    trace!(bytes = n, state = ?self.state, "received");
                    progressed = true;
                }
                Ok(Fill::Closed | Fill::WouldBlock | Fill::Full) => {}
                Err(e) => {
                    self.server_error(e);
                    return Progress::Done;
                }
            }
        }

        loop {
            match self.advance() {
                Ok(true) => {
                    progressed = true;
                    if self.state.is_terminal() {
                        break;
                    }
                }
                Ok(false) => break,
                Err(Fault::Client(e)) => {
                    self.client_error(e);
                    break;
                }
                Err(Fault::Server(e)) => {
                    self.server_error(e);
                    break;
                }
            }
        }

        // Partial writes and relay traffic count even without a state change.
        if self.channel.transferred() != transferred {
            progressed = true;
        }

        if self.state.is_receiving_request()
            && self.channel.client_state() == ClientState::Closed
            && self.channel.buffer().pending() == 0
        {
            if self.state > ConnectionState::Initial || self.line.in_progress() {
                debug!(state = ?self.state, "peer closed mid-request");
            } else {
                trace!("peer closed idle connection");
            }
            self.close_connection();
            progressed = true;
        }

        if !self.state.is_terminal() {
            let closing = self.state == ConnectionState::Closing;
            if self.channel.timeout_exceeded(closing) {
                if closing {
                    debug!(peer = ?self.channel.peer_addr(), "shutdown grace elapsed");
                    self.finish_close();
                } else {
                    warn!(peer = ?self.channel.peer_addr(), state = ?self.state, "idle timeout");
                    self.close_connection();
                }
                progressed = true;
            }
        }

        if self.state.is_terminal() {
            Progress::Done
        } else if progressed {
            Progress::Busy
        } else {
            Progress::Idle
        }
    }

    /// Begin a graceful close from any state. Repeated calls are no-ops.
    ///
    /// Moves to `Closing` and waits for the peer to close its side or for
    /// the shutdown grace to elapse. A response still being written is
    /// abandoned.
    pub fn close_connection(&mut self) {
        match self.state {
            ConnectionState::Closing | ConnectionState::Closed | ConnectionState::Error => return,
            ConnectionState::Undefined => {
                self.state = ConnectionState::Closed;
                return;
            }
            _ => {}
        }

        self.release_request();
        self.exchange = None;
        self.relay = None;

        match self.channel.begin_shutdown() {
            Ok(()) => {
                self.state = ConnectionState::Closing;
                debug!(peer = ?self.channel.peer_addr(), requests = self.requests, "closing connection");
                if self.channel.client_state() == ClientState::Closed {
                    self.finish_close();
                }
            }
            Err(e) => {
                warn!(peer = ?self.channel.peer_addr(), error = %e, "graceful shutdown failed");
                self.state = ConnectionState::Error;
                self.channel.release();
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn client_state(&self) -> ClientState {
        self.channel.client_state()
    }

    /// `Closed` or `Error`.
    pub fn is_closed(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_error(&self) -> bool {
        self.state == ConnectionState::Error
    }

    pub fn is_secure(&self) -> bool {
        self.channel.is_secure()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.channel.peer_addr()
    }

    /// Method of the request in progress.
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// Target of the request in progress, as sent.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn buffer(&self) -> &ReceiveBuffer {
        self.channel.buffer()
    }

    /// Requests dispatched so far.
    pub fn requests(&self) -> u64 {
        self.requests
    }

    fn advance(&mut self) -> Result<bool, Fault> {
        match self.state {
            ConnectionState::Initial => self.read_request_line(),
            ConnectionState::RequestFinished => self.read_header_line(),
            ConnectionState::HeadersFinished => self.read_body(),
            ConnectionState::BodyFinished => self.respond(),
            ConnectionState::WebSocket => self.relay_step(),
            ConnectionState::Closing => Ok(self.await_peer_close()),
            ConnectionState::Undefined | ConnectionState::Closed | ConnectionState::Error => {
                Ok(false)
            }
        }
    }

    fn read_request_line(&mut self) -> Result<bool, Fault> {
        let limit = self.config.max_request_line;
        let finished = self
            .line
            .read_line(self.channel.buffer_mut(), limit)
            .map_err(|e| match e {
                ParseError::LineTooLong { limit } => ParseError::RequestLineTooLong { limit },
                e => e,
            })?;
        if !finished {
            return Ok(false);
        }
        // Empty lines ahead of a request line are ignored (RFC 9112 2.2).
        if self.line.is_empty() {
            return Ok(true);
        }

        let line = parser::parse_request_line(self.line.as_bytes())?;
        self.method = Some(line.method);
        self.version = line.version;
        self.resource.clear();
        self.resource.push_str(line.target);
        self.headers = Headers::with_capacity(self.config.max_headers.min(8));
        self.state = ConnectionState::RequestFinished;

        trace!(method = %line.method, target = line.target, "request line");
        Ok(true)
    }

    fn read_header_line(&mut self) -> Result<bool, Fault> {
        let finished = self
            .line
            .read_line(self.channel.buffer_mut(), self.config.max_header_line)?;
        if !finished {
            return Ok(false);
        }
        if self.line.is_empty() {
            self.finish_headers()?;
            return Ok(true);
        }

        if self.headers.len() >= self.config.max_headers {
            return Err(ParseError::TooManyHeaders {
                limit: self.config.max_headers,
            }
            .into());
        }
        let (name, value) = parser::parse_header_line(self.line.as_bytes())?;
        trace!(name, value, "header");
        self.headers.insert(name, value);
        Ok(true)
    }

    fn finish_headers(&mut self) -> Result<(), Fault> {
        self.keep_alive = wants_keep_alive(self.version, &self.headers);
        self.body_remaining = parser::body_length(&self.headers, self.config.max_body_size)?;
        self.body = Vec::with_capacity(self.body_remaining);

        if self.body_remaining > 0
            && self.version == Version::Http11
            && self.headers.contains_token("Expect", "100-continue")
        {
            self.interim = Some(ResponseWriter::interim(StatusCode::Continue));
        }

        self.state = ConnectionState::HeadersFinished;
        debug!(
            method = ?self.method,
            resource = %self.resource,
            headers = self.headers.len(),
            body = self.body_remaining,
            keep_alive = self.keep_alive,
            "request headers complete"
        );
        Ok(())
    }

    fn read_body(&mut self) -> Result<bool, Fault> {
        if let Some(interim) = self.interim.as_mut() {
            if !interim.flush(&mut self.channel)? {
                return Ok(false);
            }
            trace!("sent 100 Continue");
            self.interim = None;
        }

        if self.body_remaining > 0 {
            let n = self
                .channel
                .buffer_mut()
                .take_into(&mut self.body, self.body_remaining);
            self.body_remaining -= n;
            if self.body_remaining > 0 {
                return Ok(n > 0);
            }
        }

        self.state = ConnectionState::BodyFinished;
        Ok(true)
    }

    fn respond(&mut self) -> Result<bool, Fault> {
        if self.exchange.is_none() {
            self.dispatch()?;
        }
        let Some(exchange) = self.exchange.as_mut() else {
            return Ok(false);
        };

        if !exchange.writer.flush(&mut self.channel)? {
            return Ok(false);
        }

        if let Some(exchange) = self.exchange.take() {
            self.finish_exchange(exchange);
        }
        Ok(true)
    }

    /// Resolve the request and serialize its response.
    fn dispatch(&mut self) -> Result<(), Fault> {
        let Some(method) = self.method else {
            return Err(Fault::Server(io::Error::other("dispatch without a request line")));
        };

        let request = Request {
            method,
            path: &self.resource,
            version: self.version,
            headers: &self.headers,
            body: &self.body,
            secure: self.channel.is_secure(),
        };

        let mut relay = None;
        let response = match self.resolver.resolve(method, request.path_only(), &self.headers) {
            Some(handler) => {
                if websocket::is_upgrade_request(&request) {
                    relay = handler.upgrade(&request);
                }
                match (&relay, request.header("Sec-WebSocket-Key")) {
                    (Some(_), Some(key)) => websocket::switching_protocols(key),
                    _ => handler.handle(&request),
                }
            }
            None => Response::not_found(),
        };

        let keep_alive = self.keep_alive
            && relay.is_none()
            && !response.closes_connection()
            && self.has_more_input();
        let include_body = method != Method::HEAD;
        let writer = ResponseWriter::new(&response, self.default_headers, keep_alive, include_body);

        self.requests += 1;
        debug!(
            method = %method,
            path = %self.resource,
            status = response.status.as_u16(),
            bytes = writer.remaining().len(),
            "request dispatched"
        );

        self.exchange = Some(Exchange {
            writer,
            keep_alive,
            relay,
        });
        Ok(())
    }

    fn finish_exchange(&mut self, exchange: Exchange) {
        self.release_request();

        if let Some(relay) = exchange.relay {
            debug!(peer = ?self.channel.peer_addr(), "switching to websocket relay");
            self.relay = Some(relay);
            self.state = ConnectionState::WebSocket;
        } else if exchange.keep_alive && self.has_more_input() {
            trace!("keep-alive, awaiting next request");
            self.state = ConnectionState::Initial;
        } else {
            self.close_connection();
        }
    }

    /// The peer may still send, or already sent, another request.
    fn has_more_input(&self) -> bool {
        self.channel.client_state() == ClientState::Active || self.channel.buffer().pending() > 0
    }

    fn relay_step(&mut self) -> Result<bool, Fault> {
        let Some(relay) = self.relay.as_mut() else {
            self.close_connection();
            return Ok(true);
        };

        let status = relay.step(&mut self.channel)?;
        if status == RelayStatus::Open && !self.channel.peer_closed() {
            return Ok(false);
        }

        debug!(?status, peer_closed = self.channel.peer_closed(), "relay finished");
        self.close_connection();
        Ok(true)
    }

    fn await_peer_close(&mut self) -> bool {
        // Anything the peer still sends is discarded.
        self.channel.buffer_mut().clear();
        if self.channel.client_state() == ClientState::Closed {
            self.finish_close();
            return true;
        }
        false
    }

    fn finish_close(&mut self) {
        self.channel.release();
        self.state = ConnectionState::Closed;
        debug!(peer = ?self.channel.peer_addr(), "connection closed");
    }

    fn release_request(&mut self) {
        self.method = None;
        self.resource.clear();
        self.headers = Headers::new();
        self.keep_alive = false;
        self.body = Vec::new();
        self.body_remaining = 0;
        self.interim = None;
        self.line.reset();
    }

    /// Transport failure: release without writing anything further.
    fn server_error(&mut self, e: io::Error) {
        error!(peer = ?self.channel.peer_addr(), state = ?self.state, error = %e, "transport failure");
        self.release_request();
        self.exchange = None;
        self.relay = None;
        self.state = ConnectionState::Error;
        self.channel.release();
    }

    /// Protocol violation: one best-effort error response, then release.
    fn client_error(&mut self, err: ParseError) {
        warn!(
            peer = ?self.channel.peer_addr(),
            state = ?self.state,
            error = %err,
            "rejecting request"
        );

        if self.exchange.is_none() && self.state.is_open() {
            let response = Response::error(err.status());
            let bytes = serialize_response(&response, self.default_headers, false, true);
            match self.channel.write_buffer(&bytes) {
                Ok(n) if n < bytes.len() => trace!(written = n, "error response truncated"),
                Ok(_) => {}
                Err(e) => trace!(error = %e, "error response not delivered"),
            }
        }

        self.release_request();
        self.exchange = None;
        self.relay = None;
        self.state = ConnectionState::Error;
        self.channel.release();
    }
}

impl<T, C> Drop for Connection<'_, T, C> {
    fn drop(&mut self) {
        if self.state.is_terminal() {
            debug_assert!(!self.channel.is_bound(), "terminal connection still owns its transport");
        } else if self.channel.release() {
            warn!(state = ?self.state, "connection dropped while open");
        }
    }
}
