use beacon::http::headers::Headers;
use beacon::http::parser::{ParseError, body_length, parse_header_line, parse_request_line};
use beacon::http::request::{Method, Version};
use beacon::http::response::StatusCode;

#[test]
fn test_parse_request_line_with_query() {
    let line = parse_request_line(b"GET /search?q=rust HTTP/1.1").unwrap();

    assert_eq!(line.method, Method::GET);
    assert_eq!(line.target, "/search?q=rust");
    assert_eq!(line.version, Version::Http11);
}

#[test]
fn test_parse_http10_request_line() {
    let line = parse_request_line(b"POST /api HTTP/1.0").unwrap();

    assert_eq!(line.method, Method::POST);
    assert_eq!(line.version, Version::Http10);
}

#[test]
fn test_parse_various_http_methods() {
    let methods = vec![
        ("GET", Method::GET),
        ("POST", Method::POST),
        ("PUT", Method::PUT),
        ("DELETE", Method::DELETE),
        ("HEAD", Method::HEAD),
        ("OPTIONS", Method::OPTIONS),
        ("PATCH", Method::PATCH),
    ];

    for (method_str, expected_method) in methods {
        let raw = format!("{} / HTTP/1.1", method_str);
        let line = parse_request_line(raw.as_bytes()).unwrap();
        assert_eq!(line.method, expected_method);
    }
}

#[test]
fn test_parse_invalid_http_method() {
    let result = parse_request_line(b"INVALID / HTTP/1.1");

    assert!(matches!(result, Err(ParseError::InvalidMethod)));
}

#[test]
fn test_parse_invalid_version() {
    assert!(matches!(
        parse_request_line(b"GET / HTTP/2.0"),
        Err(ParseError::InvalidVersion)
    ));
}

#[test]
fn test_parse_request_line_wrong_shape() {
    for raw in [&b"GET /"[..], b"GET  / HTTP/1.1", b"GET / HTTP/1.1 extra", b""] {
        assert!(
            matches!(parse_request_line(raw), Err(ParseError::InvalidRequest)),
            "{:?}",
            String::from_utf8_lossy(raw)
        );
    }
}

#[test]
fn test_parse_request_line_invalid_utf8() {
    assert!(matches!(
        parse_request_line(b"GET /\xff HTTP/1.1"),
        Err(ParseError::InvalidEncoding)
    ));
}

#[test]
fn test_parse_header_trims_value() {
    let (name, value) = parse_header_line(b"Content-Type: \t application/json \t").unwrap();

    assert_eq!(name, "Content-Type");
    assert_eq!(value, "application/json");
}

#[test]
fn test_parse_header_value_may_contain_colons() {
    let (name, value) = parse_header_line(b"Host: example.com:8080").unwrap();

    assert_eq!(name, "Host");
    assert_eq!(value, "example.com:8080");
}

#[test]
fn test_parse_malformed_header() {
    assert!(matches!(
        parse_header_line(b"BrokenHeader"),
        Err(ParseError::InvalidHeader)
    ));
    assert!(matches!(
        parse_header_line(b"Bad Name: x"),
        Err(ParseError::InvalidHeader)
    ));
    assert!(matches!(
        parse_header_line(b": empty name"),
        Err(ParseError::InvalidHeader)
    ));
}

#[test]
fn test_body_length_defaults_to_zero() {
    assert_eq!(body_length(&Headers::new(), 1024).unwrap(), 0);
}

#[test]
fn test_body_length_from_content_length() {
    let headers: Headers = [("Content-Length", "42")].into_iter().collect();

    assert_eq!(body_length(&headers, 1024).unwrap(), 42);
}

#[test]
fn test_body_length_rejects_garbage() {
    for value in ["not-a-number", "+5", "-1", ""] {
        let headers: Headers = [("Content-Length", value)].into_iter().collect();
        assert!(
            matches!(body_length(&headers, 1024), Err(ParseError::InvalidContentLength)),
            "{value:?}"
        );
    }
}

#[test]
fn test_body_length_conflicting_duplicates() {
    let same: Headers = [("Content-Length", "5"), ("Content-Length", "5")]
        .into_iter()
        .collect();
    let conflict: Headers = [("Content-Length", "5"), ("Content-Length", "6")]
        .into_iter()
        .collect();

    assert_eq!(body_length(&same, 1024).unwrap(), 5);
    assert!(matches!(
        body_length(&conflict, 1024),
        Err(ParseError::InvalidContentLength)
    ));
}

#[test]
fn test_body_length_over_limit() {
    let headers: Headers = [("Content-Length", "1025")].into_iter().collect();

    assert!(matches!(
        body_length(&headers, 1024),
        Err(ParseError::BodyTooLarge {
            length: 1025,
            limit: 1024
        })
    ));
}

#[test]
fn test_transfer_encoding_rejected() {
    let headers: Headers = [("Transfer-Encoding", "chunked")].into_iter().collect();

    assert!(matches!(
        body_length(&headers, 1024),
        Err(ParseError::UnsupportedTransferEncoding)
    ));
}

#[test]
fn test_error_status_mapping() {
    assert_eq!(
        ParseError::RequestLineTooLong { limit: 128 }.status(),
        StatusCode::UriTooLong
    );
    assert_eq!(
        ParseError::LineTooLong { limit: 384 }.status(),
        StatusCode::RequestHeaderFieldsTooLarge
    );
    assert_eq!(
        ParseError::TooManyHeaders { limit: 20 }.status(),
        StatusCode::RequestHeaderFieldsTooLarge
    );
    assert_eq!(
        ParseError::UnsupportedTransferEncoding.status(),
        StatusCode::LengthRequired
    );
    assert_eq!(
        ParseError::BodyTooLarge { length: 2, limit: 1 }.status(),
        StatusCode::PayloadTooLarge
    );
    assert_eq!(ParseError::InvalidHeader.status(), StatusCode::BadRequest);
}

#[test]
fn test_error_display() {
    assert_eq!(
        ParseError::TooManyHeaders { limit: 20 }.to_string(),
        "more than 20 headers"
    );
}
