//! Connection and peer state enums.

/// Lifecycle state of a [`Connection`](crate::http::connection::Connection).
///
/// The variants are declared in their lifecycle order and the derived
/// `Ord` is part of the contract: everything before [`HeadersFinished`]
/// (inclusive, from [`Initial`]) is still receiving a request, everything
/// from [`Closing`] on is shutting down.
///
/// ```text
/// Undefined ─ initialize() ─> Initial ─ request line ─> RequestFinished
///                                ^                            │ header lines
///                                │ keep-alive                 v
///    WebSocket <─ upgrade ─ BodyFinished <─ body read ─ HeadersFinished
///        │                       │
///        └──── close ──────> Closing ──> Closed
///
///   any state ── fault ──> Error
/// ```
///
/// [`HeadersFinished`]: ConnectionState::HeadersFinished
/// [`Initial`]: ConnectionState::Initial
/// [`Closing`]: ConnectionState::Closing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectionState {
    /// Not bound to a transport yet.
    Undefined,
    /// Bound, waiting for a request line.
    Initial,
    /// The request line has been parsed; reading header lines.
    RequestFinished,
    /// The empty line after the headers has been seen; reading the body.
    HeadersFinished,
    /// The request is complete and is being answered.
    BodyFinished,
    /// Raw relay mode after a successful upgrade.
    WebSocket,
    /// Graceful shutdown started, waiting for the peer.
    Closing,
    /// Transport released after a normal close.
    Closed,
    /// Transport released after a fault.
    Error,
}

impl ConnectionState {
    /// Whether a request is still being received (`Initial..=HeadersFinished`).
    pub fn is_receiving_request(self) -> bool {
        self >= ConnectionState::Initial && self <= ConnectionState::HeadersFinished
    }

    /// `Closed` or `Error`; the connection can be retired.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Error)
    }

    /// Bound and not shutting down.
    pub fn is_open(self) -> bool {
        self > ConnectionState::Undefined && self < ConnectionState::Closing
    }
}

/// What we know about the peer's side of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    Undefined,
    Active,
    /// The peer half-closed (EOF or TLS close_notify).
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiving_request_covers_parse_states_only() {
        assert!(!ConnectionState::Undefined.is_receiving_request());
        assert!(ConnectionState::Initial.is_receiving_request());
        assert!(ConnectionState::RequestFinished.is_receiving_request());
        assert!(ConnectionState::HeadersFinished.is_receiving_request());
        assert!(!ConnectionState::BodyFinished.is_receiving_request());
        assert!(!ConnectionState::Closing.is_receiving_request());
    }

    #[test]
    fn order_follows_lifecycle() {
        assert!(ConnectionState::Initial < ConnectionState::BodyFinished);
        assert!(ConnectionState::WebSocket < ConnectionState::Closing);
        assert!(ConnectionState::Closed < ConnectionState::Error);
    }

    #[test]
    fn terminal_and_open() {
        assert!(ConnectionState::Closed.is_terminal());
        assert!(ConnectionState::Error.is_terminal());
        assert!(!ConnectionState::Closing.is_terminal());
        assert!(ConnectionState::WebSocket.is_open());
        assert!(!ConnectionState::Closing.is_open());
        assert!(!ConnectionState::Undefined.is_open());
    }
}
