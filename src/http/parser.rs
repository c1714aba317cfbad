use std::fmt;

use crate::http::headers::Headers;
use crate::http::request::{Method, Version};
use crate::http::response::StatusCode;

/// Why a request was rejected. Every variant is the peer's fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The request line is not `METHOD SP TARGET SP VERSION`.
    InvalidRequest,
    InvalidMethod,
    InvalidVersion,
    InvalidHeader,
    /// A line is not valid UTF-8.
    InvalidEncoding,
    /// A `\r` not followed by `\n`.
    InvalidLineEnding,
    InvalidContentLength,
    /// A header line longer than the configured cap.
    LineTooLong { limit: usize },
    /// A request line longer than the configured cap.
    RequestLineTooLong { limit: usize },
    TooManyHeaders { limit: usize },
    UnsupportedTransferEncoding,
    BodyTooLarge { length: usize, limit: usize },
}

impl ParseError {
    /// Status code of the error response sent to the peer.
    pub fn status(&self) -> StatusCode {
        match self {
            ParseError::RequestLineTooLong { .. } => StatusCode::UriTooLong,
            ParseError::LineTooLong { .. } | ParseError::TooManyHeaders { .. } => {
                StatusCode::RequestHeaderFieldsTooLarge
            }
            ParseError::UnsupportedTransferEncoding => StatusCode::LengthRequired,
            ParseError::BodyTooLarge { .. } => StatusCode::PayloadTooLarge,
            _ => StatusCode::BadRequest,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidRequest => f.write_str("malformed request line"),
            ParseError::InvalidMethod => f.write_str("unknown request method"),
            ParseError::InvalidVersion => f.write_str("unsupported protocol version"),
            ParseError::InvalidHeader => f.write_str("malformed header line"),
            ParseError::InvalidEncoding => f.write_str("line is not valid UTF-8"),
            ParseError::InvalidLineEnding => f.write_str("carriage return without line feed"),
            ParseError::InvalidContentLength => f.write_str("invalid Content-Length"),
            ParseError::LineTooLong { limit } => {
                write!(f, "header line exceeds {limit} bytes")
            }
            ParseError::RequestLineTooLong { limit } => {
                write!(f, "request line exceeds {limit} bytes")
            }
            ParseError::TooManyHeaders { limit } => write!(f, "more than {limit} headers"),
            ParseError::UnsupportedTransferEncoding => {
                f.write_str("Transfer-Encoding is not supported")
            }
            ParseError::BodyTooLarge { length, limit } => {
                write!(f, "body of {length} bytes exceeds {limit} bytes")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// A parsed `METHOD SP TARGET SP VERSION` line, borrowing the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: Method,
    pub target: &'a str,
    pub version: Version,
}

pub fn parse_request_line(line: &[u8]) -> Result<RequestLine<'_>, ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidEncoding)?;

    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::InvalidRequest);
    };

    let method = Method::from_str(method).ok_or(ParseError::InvalidMethod)?;

    if target.is_empty() {
        return Err(ParseError::InvalidRequest);
    }

    let version = Version::from_str(version).ok_or(ParseError::InvalidVersion)?;

    Ok(RequestLine {
        method,
        target,
        version,
    })
}

/// Split a header line at the first `:` into a token name and a value
/// with surrounding whitespace removed.
pub fn parse_header_line(line: &[u8]) -> Result<(&str, &str), ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidEncoding)?;

    let (name, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;

    if name.is_empty() || !name.bytes().all(is_token) {
        return Err(ParseError::InvalidHeader);
    }

    Ok((name, value.trim_matches([' ', '\t'])))
}

/// Length of the body that follows the headers.
///
/// Framing comes from `Content-Length` alone; without it the body is
/// empty. Chunked or otherwise encoded bodies are rejected.
pub fn body_length(headers: &Headers, limit: usize) -> Result<usize, ParseError> {
    if headers.contains("Transfer-Encoding") {
        return Err(ParseError::UnsupportedTransferEncoding);
    }

    let mut length = None;
    for value in headers.get_all("Content-Length") {
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidContentLength);
        }
        let parsed: usize = value
            .parse()
            .map_err(|_| ParseError::InvalidContentLength)?;

        // conflicting duplicates make the framing ambiguous
        if length.is_some_and(|l| l != parsed) {
            return Err(ParseError::InvalidContentLength);
        }
        length = Some(parsed);
    }

    let length = length.unwrap_or(0);
    if length > limit {
        return Err(ParseError::BodyTooLarge { length, limit });
    }
    Ok(length)
}

fn is_token(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let line = parse_request_line(b"GET / HTTP/1.1").unwrap();

        assert_eq!(line.method, Method::GET);
        assert_eq!(line.target, "/");
        assert_eq!(line.version, Version::Http11);
    }
}
