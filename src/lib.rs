//! Beacon - embedded HTTP/1.1 server engine
//!
//! Non-blocking, step-driven connections over plain TCP or TLS, with
//! keep-alive, pipelining, `100-continue` and WebSocket upgrades.

pub mod config;
pub mod http;
pub mod server;
pub mod transport;
