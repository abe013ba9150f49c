//! Tests for the HTTP parser.

#[cfg(test)]
mod tests {
    use crate::parser::{Error, HttpVersion, Method, ParseLimits, RequestParser};

    /// Feed a whole request at once and expect it to complete.
    fn parse(input: &[u8]) -> RequestParser {
        let mut parser = RequestParser::default();
        let consumed = parser.feed(input).unwrap();
        assert_eq!(consumed, input.len());
        assert!(parser.message_complete());
        parser
    }

    fn parse_err(input: &[u8]) -> Error {
        RequestParser::default().feed(input).unwrap_err()
    }

    /// Feed `input` in fragments of `size` bytes.
    fn feed_fragmented(input: &[u8], size: usize) -> RequestParser {
        let mut parser = RequestParser::default();
        for fragment in input.chunks(size) {
            let consumed = parser.feed(fragment).unwrap();
            assert_eq!(consumed, fragment.len());
        }
        parser
    }

    #[test]
    fn test_parse_simple_get_request() {
        let mut parser = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n");
        assert_eq!(parser.method(), Some(Method::GET));
        assert_eq!(parser.target(), Some("/index.html"));
        assert_eq!(parser.version(), Some(HttpVersion::Http11));
        assert_eq!(parser.header("Host"), Some("example.com"));
        assert!(parser.take_body().is_empty());
    }

    #[test]
    fn test_headers_keep_arrival_order() {
        let parser = parse(b"GET / HTTP/1.1\r\nHost: example.com\r\nUser-Agent: test\r\nAccept: */*\r\n\r\n");
        let names: Vec<&str> = parser.headers().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["Host", "User-Agent", "Accept"]);
    }

    #[test]
    fn test_case_insensitive_headers() {
        let parser = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n");
        assert_eq!(parser.header("host"), Some("example.com"));
        assert_eq!(parser.header("HOST"), Some("example.com"));
        assert_eq!(parser.header("Accept"), None);
    }

    #[test]
    fn test_invalid_method() {
        let err = parse_err(b"INVALID /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n");
        assert!(matches!(err, Error::InvalidMethod(ref m) if m == "INVALID"));
    }

    #[test]
    fn test_invalid_http_version() {
        let err = parse_err(b"GET /index.html HTTP/9.9\r\nHost: example.com\r\n\r\n");
        assert!(matches!(err, Error::MalformedRequest(_)));
    }

    #[test]
    fn test_invalid_header_format() {
        let err = parse_err(b"GET /index.html HTTP/1.1\r\nInvalidHeader\r\n\r\n");
        assert!(matches!(err, Error::MalformedRequest(_)));
    }

    #[test]
    fn test_truncated_request_waits_for_more() {
        let mut parser = RequestParser::default();
        assert_eq!(parser.feed(b"GET /index.html HTT").unwrap(), 19);
        assert!(!parser.headers_complete());
        assert!(!parser.message_complete());
        assert_eq!(parser.method(), None);
        assert!(parser.headers().is_empty());
    }

    #[test]
    fn test_garbage_request_line() {
        assert!(matches!(parse_err(b"GARBAGE\r\n\r\n"), Error::MalformedRequest(_)));
    }

    #[test]
    fn test_all_methods() {
        let methods = vec![
            ("GET", Method::GET),
            ("POST", Method::POST),
            ("PUT", Method::PUT),
            ("DELETE", Method::DELETE),
            ("HEAD", Method::HEAD),
            ("OPTIONS", Method::OPTIONS),
            ("PATCH", Method::PATCH),
            ("TRACE", Method::TRACE),
        ];

        for (token, expected_method) in methods {
            let request = format!("{token} /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n");
            let parser = parse(request.as_bytes());
            assert_eq!(parser.method(), Some(expected_method));
            assert_eq!(expected_method.to_string(), token);
        }
    }

    #[test]
    fn test_headers_with_multiple_colons() {
        let parser = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nX-Test: value:with:colons\r\n\r\n");
        assert_eq!(parser.header("X-Test"), Some("value:with:colons"));
    }

    #[test]
    fn test_http10_without_host() {
        let parser = parse(b"GET /index.html HTTP/1.0\r\n\r\n");
        assert_eq!(parser.version(), Some(HttpVersion::Http10));
        assert!(parser.headers().is_empty());
    }

    #[test]
    fn test_http_version_display() {
        assert_eq!(HttpVersion::Http10.to_string(), "HTTP/1.0");
        assert_eq!(HttpVersion::Http11.to_string(), "HTTP/1.1");
        assert_eq!(HttpVersion::Http11.as_tuple(), (1, 1));
    }

    #[test]
    fn test_mixed_line_endings() {
        let parser = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\nUser-Agent: test\r\n\r\n");
        assert_eq!(parser.header("Host"), Some("example.com"));
        assert_eq!(parser.header("User-Agent"), Some("test"));
    }

    #[test]
    fn test_target_keeps_query() {
        let parser = parse(b"GET /search?q=test&page=1 HTTP/1.1\r\nHost: example.com\r\n\r\n");
        assert_eq!(parser.target(), Some("/search?q=test&page=1"));
    }

    #[test]
    fn test_non_utf8_header_value() {
        let err = parse_err(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nX-Test: \xFF\xFF\xFF\r\n\r\n");
        assert!(matches!(err, Error::InvalidHeaderFormat));
    }

    #[test]
    fn test_empty_header_value() {
        let parser = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nX-Empty:\r\n\r\n");
        assert_eq!(parser.header("X-Empty"), Some(""));
    }

    #[test]
    fn test_duplicate_headers_are_kept() {
        let parser = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nX-Test: value1\r\nX-Test: value2\r\n\r\n");
        assert_eq!(parser.header("X-Test"), Some("value1"));
        assert_eq!(parser.headers().iter().filter(|(k, _)| k == "X-Test").count(), 2);
    }

    #[test]
    fn test_content_length_body() {
        let mut parser = parse(b"POST /api/users HTTP/1.1\r\nHost: example.com\r\nContent-Length: 5\r\n\r\nhello");
        assert_eq!(parser.take_body(), b"hello");
        assert!(parser.take_body().is_empty());
    }

    #[test]
    fn test_conflicting_content_length() {
        let err = parse_err(b"POST / HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 6\r\n\r\nhello!");
        assert!(matches!(err, Error::InvalidContentLength(_)));
    }

    #[test]
    fn test_chunked_body() {
        let mut parser = parse(
            b"POST /upload HTTP/1.1\r\nHost: example.com\r\nTransfer-Encoding: chunked\r\n\r\n\
            5\r\nhello\r\n7;ext=1\r\n, world\r\n0\r\nX-Trailer: yes\r\n\r\n",
        );
        assert_eq!(parser.take_body(), b"hello, world");
    }

    #[test]
    fn test_bad_chunk_terminator() {
        let err = parse_err(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhelloXX0\r\n\r\n");
        assert!(matches!(err, Error::InvalidChunk(_)));
    }

    #[test]
    fn test_trailing_data_is_not_consumed() {
        let request = b"GET / HTTP/1.1\r\nHost: a\r\n\r\nGET / HTTP/1.1\r\n";
        let mut parser = RequestParser::default();
        let consumed = parser.feed(request).unwrap();
        assert!(parser.message_complete());
        assert_eq!(consumed, b"GET / HTTP/1.1\r\nHost: a\r\n\r\n".len());
        assert_eq!(parser.feed(b"more").unwrap(), 0);
    }

    #[test]
    fn test_fragmentation_transparency() {
        let request: &[u8] = b"POST /api/users?role=admin HTTP/1.1\r\n\
            Host: example.com\r\n\
            Content-Type: application/json\r\n\
            Transfer-Encoding: chunked\r\n\
            \r\n\
            a\r\n{\"name\":\"J\r\n\
            14\r\nohn\",\"email\":\"j@x.y\"\r\n\
            1\r\n}\r\n\
            0\r\n\r\n";
        let mut whole = parse(request);
        let whole_body = whole.take_body();

        for size in 1..request.len() {
            let mut parser = feed_fragmented(request, size);
            assert!(parser.message_complete(), "fragment size {size}");
            assert_eq!(parser.method(), whole.method());
            assert_eq!(parser.target(), whole.target());
            assert_eq!(parser.version(), whole.version());
            assert_eq!(parser.headers(), whole.headers());
            assert_eq!(parser.take_body(), whole_body, "fragment size {size}");
        }
    }

    #[test]
    fn test_headers_complete_before_body() {
        let mut parser = RequestParser::default();
        parser.feed(b"POST / HTTP/1.1\r\nContent-Length: 4\r\n\r\nab").unwrap();
        assert!(parser.headers_complete());
        assert!(!parser.message_complete());
        parser.feed(b"cd").unwrap();
        assert!(parser.message_complete());
        assert_eq!(parser.take_body(), b"abcd");
    }

    #[test]
    fn test_keep_alive_hint() {
        let cases: [(&[u8], bool); 5] = [
            (b"GET / HTTP/1.1\r\n\r\n", true),
            (b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n", false),
            (b"GET / HTTP/1.0\r\n\r\n", false),
            (b"GET / HTTP/1.0\r\nConnection: Keep-Alive\r\n\r\n", true),
            (b"GET / HTTP/1.1\r\nConnection: keep-alive, close\r\n\r\n", false),
        ];
        for (request, expected) in cases {
            let mut parser = RequestParser::default();
            parser.feed(request).unwrap();
            assert_eq!(parser.should_keep_alive(), expected, "{}", String::from_utf8_lossy(request));
        }
    }

    #[test]
    fn test_limits() {
        let limits = ParseLimits { max_headers: 2, max_head_size: 64, max_body_size: 4 };

        let mut parser = RequestParser::new(limits);
        let result = parser.feed(b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n");
        assert!(matches!(result, Err(Error::TooManyHeaders(2))));

        let mut parser = RequestParser::new(limits);
        let result = parser.feed(&[b'a'; 65]);
        assert!(matches!(result, Err(Error::HeadTooLarge(64))));

        let mut parser = RequestParser::new(limits);
        let result = parser.feed(b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\n");
        assert!(matches!(result, Err(Error::BodyTooLarge(4))));
    }
}
