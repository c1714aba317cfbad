//! WebSocket opening handshake and the relay mode that follows it.
//!
//! After `101 Switching Protocols` the connection stops parsing HTTP and
//! hands every step to a [`Relay`], which moves opaque bytes through
//! [`ConnectionIo`]. Framing is the relay's business.

use std::io;

use base64ct::{Base64, Encoding};
use sha1::{Digest, Sha1};

use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::transport::ConnectionIo;

const WS_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    /// Keep calling.
    Open,
    /// The relay is done; the connection closes.
    Finished,
}

/// Drives a connection in WebSocket mode, one step at a time.
pub trait Relay {
    /// Move whatever bytes can be moved without blocking.
    fn step(&mut self, io: &mut dyn ConnectionIo) -> io::Result<RelayStatus>;
}

/// Whether `request` is a well-formed RFC 6455 upgrade request.
pub fn is_upgrade_request(request: &Request<'_>) -> bool {
    let headers = request.headers;

    request.method == Method::GET
        && headers.contains_token("Connection", "upgrade")
        && headers.contains_token("Upgrade", "websocket")
        && headers.get("Sec-WebSocket-Version") == Some("13")
        && headers.get("Sec-WebSocket-Key").is_some_and(|k| !k.is_empty())
}

/// `Sec-WebSocket-Accept` value for a client key.
pub fn accept_key(key: &str) -> String {
    let mut sha1 = Sha1::default();
    sha1.update(key.as_bytes());
    sha1.update(WS_GUID);
    let digest = sha1.finalize();

    Base64::encode_string(&digest)
}

/// The `101` response completing the handshake for `key`.
pub fn switching_protocols(key: &str) -> Response {
    ResponseBuilder::new(StatusCode::SwitchingProtocols)
        .header("Upgrade", "websocket")
        .header("Connection", "Upgrade")
        .header("Sec-WebSocket-Accept", accept_key(key))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::headers::Headers;
    use crate::http::request::Version;

    #[test]
    fn accept_key_matches_rfc_example() {
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn upgrade_request_detection() {
        let headers: Headers = [
            ("Host", "device"),
            ("Upgrade", "websocket"),
            ("Connection", "keep-alive, Upgrade"),
            ("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ=="),
            ("Sec-WebSocket-Version", "13"),
        ]
        .into_iter()
        .collect();
        let request = Request {
            method: Method::GET,
            path: "/ws",
            version: Version::Http11,
            headers: &headers,
            body: &[],
            secure: false,
        };

        assert!(is_upgrade_request(&request));
        assert!(!is_upgrade_request(&Request {
            method: Method::POST,
            ..request
        }));
    }

    #[test]
    fn switching_protocols_has_no_body() {
        let response = switching_protocols("dGhlIHNhbXBsZSBub25jZQ==");

        assert_eq!(response.status.as_u16(), 101);
        assert!(response.headers.get("Content-Length").is_none());
        assert_eq!(
            response.headers.get("Sec-WebSocket-Accept"),
            Some("s3pPLMBiTxaQ9kYGzzhZRbK+xOo=")
        );
    }
}
