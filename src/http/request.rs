use std::fmt;

use crate::http::headers::Headers;

/// HTTP request methods.
///
/// Only the methods listed here are accepted on the request line; anything
/// else is rejected before the resolver is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of the method (case-sensitive, typically uppercase)
    ///
    /// # Returns
    ///
    /// `Some(Method)` if the string matches a known method, `None` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use beacon::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol versions accepted on the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "HTTP/1.1" => Some(Version::Http11),
            "HTTP/1.0" => Some(Version::Http10),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

/// Keep-alive decision for a request.
///
/// An explicit `Connection: close` or `Connection: keep-alive` wins;
/// otherwise HTTP/1.1 keeps the connection open and HTTP/1.0 does not.
pub fn wants_keep_alive(version: Version, headers: &Headers) -> bool {
    if headers.contains_token("Connection", "close") {
        false
    } else if headers.contains_token("Connection", "keep-alive") {
        true
    } else {
        version == Version::Http11
    }
}

/// A fully received request, as handed to a [`Handler`](crate::http::resolver::Handler).
///
/// Borrows everything from the connection that parsed it; it only lives
/// for the duration of the handler call.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target as sent (e.g., "/index.html?lang=en")
    pub path: &'a str,
    pub version: Version,
    pub headers: &'a Headers,
    /// Request body, `Content-Length` bytes
    pub body: &'a [u8],
    /// Whether the request arrived over TLS
    pub secure: bool,
}

impl<'a> Request<'a> {
    /// Retrieves a header value by name (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&'a str> {
        self.headers.get(key)
    }

    /// Retrieves the Content-Length header value and parses it as a usize.
    ///
    /// Returns 0 if the header is missing or not a valid number.
    pub fn content_length(&self) -> usize {
        self.header("Content-Length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Determines whether the connection should remain open after the response.
    pub fn keep_alive(&self) -> bool {
        wants_keep_alive(self.version, self.headers)
    }

    /// The target without its query string.
    pub fn path_only(&self) -> &'a str {
        split_target(self.path).0
    }

    pub fn query(&self) -> Option<&'a str> {
        split_target(self.path).1
    }
}

/// Split a request target into path and optional query.
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}
