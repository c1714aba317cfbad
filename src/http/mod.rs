//! HTTP/1.1 protocol engine.
//!
//! Everything here is sans-io in the sense that matters: a
//! [`Connection`](connection::Connection) is driven by repeated,
//! non-blocking calls to `step()` and only touches the network through the
//! [`Transport`](crate::transport::Transport) it owns.
//!
//! # Architecture
//!
//! - **`connection`**: the per-connection state machine
//! - **`channel`**: transport, receive buffer, timeouts and peer state
//! - **`buffer`**: fixed-capacity receive buffer with processed/unused cursors
//! - **`line`**: resumable CRLF line tokenizer
//! - **`parser`**: request line, header line and body length parsing
//! - **`request`** / **`response`** / **`headers`**: message types
//! - **`writer`**: response serialization and partial writes
//! - **`resolver`**: the application seam (`Resolver`, `Handler`)
//! - **`websocket`**: upgrade handshake and relay mode
//! - **`timeout`** / **`state`**: idle and shutdown bookkeeping, state enums
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │  Undefined  │ ← Not bound yet
//!        └──────┬──────┘
//!               │ initialize()
//!               ▼
//!        ┌─────────────┐
//!        │   Initial   │ ← Wait for a request line
//!        └──────┬──────┘
//!               │ Request line parsed
//!               ▼
//!        ┌──────────────────┐
//!        │ RequestFinished  │ ← Read header lines
//!        └──────┬───────────┘
//!               │ Empty line
//!               ▼
//!        ┌──────────────────┐
//!        │ HeadersFinished  │ ← Read Content-Length body bytes
//!        └──────┬───────────┘
//!               │ Body complete
//!               ▼
//!        ┌──────────────────┐
//!        │   BodyFinished   │ ← Resolve once, write the response
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Initial (same connection)
//!               ├─ Upgrade    → WebSocket → Closing
//!               └─ Close      → Closing → Closed
//!
//!   Any fault → Error (transport released)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use beacon::config::ConnectionConfig;
//! use beacon::http::connection::{Connection, Progress};
//! use beacon::http::headers::Headers;
//! use beacon::http::request::Request;
//! use beacon::http::response::Response;
//! use beacon::server::Routes;
//! use beacon::transport::PlainTransport;
//!
//! let routes = Routes::new().get("/", |_req: &Request<'_>| Response::ok("hello"));
//! let defaults = Headers::new();
//! let mut conn = Connection::new(&routes, &ConnectionConfig::default());
//! conn.initialize(PlainTransport::new(stream)?, &defaults)?;
//! while conn.step() != Progress::Done {}
//! ```

pub mod buffer;
pub mod channel;
pub mod connection;
pub mod headers;
pub mod line;
pub mod parser;
pub mod request;
pub mod resolver;
pub mod response;
pub mod state;
pub mod timeout;
pub mod websocket;
pub mod writer;
