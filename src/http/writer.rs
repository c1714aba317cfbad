use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::http::headers::Headers;
use crate::http::response::{Response, StatusCode};
use crate::transport::ConnectionIo;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serialize a response onto the wire format.
///
/// `defaults` are written for every name the response does not set itself.
/// A `Connection` header reflecting `keep_alive` is added unless the
/// response carries one. With `include_body == false` (HEAD) the body is
/// left out but `Content-Length` still describes it.
pub fn serialize_response(
    resp: &Response,
    defaults: &Headers,
    keep_alive: bool,
    include_body: bool,
) -> BytesMut {
    let mut buf = BytesMut::with_capacity(128 + resp.body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.put_slice(status_line.as_bytes());

    // Headers
    for (k, v) in resp.headers.iter() {
        put_header(&mut buf, k, v);
    }
    for (k, v) in defaults.iter() {
        if !resp.headers.contains(k) {
            put_header(&mut buf, k, v);
        }
    }
    if !resp.headers.contains("Connection") {
        put_header(
            &mut buf,
            "Connection",
            if keep_alive { "keep-alive" } else { "close" },
        );
    }

    // Header/body separator
    buf.put_slice(b"\r\n");

    if include_body {
        buf.put_slice(&resp.body);
    }

    buf
}

fn put_header(buf: &mut BytesMut, name: &str, value: &str) {
    buf.put_slice(name.as_bytes());
    buf.put_slice(b": ");
    buf.put_slice(value.as_bytes());
    buf.put_slice(b"\r\n");
}

/// Serialized response bytes plus how far they have been written.
///
/// Writing never blocks: each [`flush`](ResponseWriter::flush) makes one
/// write attempt and the caller comes back on a later step for the rest.
#[derive(Debug)]
pub struct ResponseWriter {
    buffer: Bytes,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response, defaults: &Headers, keep_alive: bool, include_body: bool) -> Self {
        Self::from_bytes(serialize_response(response, defaults, keep_alive, include_body))
    }

    /// A bodiless interim response such as `100 Continue`.
    pub fn interim(status: StatusCode) -> Self {
        let line = format!(
            "{} {} {}\r\n\r\n",
            HTTP_VERSION,
            status.as_u16(),
            status.reason_phrase()
        );
        Self::from_bytes(line)
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            buffer: bytes.into(),
            written: 0,
        }
    }

    /// Bytes still to be written.
    pub fn remaining(&self) -> &[u8] {
        &self.buffer
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn is_done(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Make one write attempt. Returns `Ok(true)` once everything is out.
    pub fn flush<IO>(&mut self, io: &mut IO) -> io::Result<bool>
    where
        IO: ConnectionIo + ?Sized,
    {
        if self.buffer.is_empty() {
            return Ok(true);
        }

        let n = io.write_buffer(&self.buffer)?;
        self.buffer.advance(n);
        self.written += n;

        Ok(self.buffer.is_empty())
    }
}
