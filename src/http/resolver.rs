//! Seams between the connection and the application.

use crate::http::headers::Headers;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::websocket::Relay;

/// Produces the response for a resolved request.
///
/// Handlers run synchronously inside a connection step, so they must
/// return promptly.
pub trait Handler {
    fn handle(&self, request: &Request<'_>) -> Response;

    /// Take over the connection after a WebSocket handshake.
    ///
    /// Only called for valid upgrade requests. Returning `None` answers the
    /// request through [`handle`](Handler::handle) instead.
    fn upgrade(&self, _request: &Request<'_>) -> Option<Box<dyn Relay>> {
        None
    }
}

impl<F> Handler for F
where
    F: Fn(&Request<'_>) -> Response,
{
    fn handle(&self, request: &Request<'_>) -> Response {
        self(request)
    }
}

/// Maps a parsed request onto a handler.
///
/// `None` means no resource matched; the connection answers `404`.
pub trait Resolver {
    fn resolve(&self, method: Method, path: &str, headers: &Headers) -> Option<&dyn Handler>;
}
