//! HTTP/1.x response head parsing.
//!
//! The parser operates on an accumulating receive buffer: callers feed it the
//! whole buffered prefix on every receive notification until it reports a
//! complete head. Anything that is not yet a complete, recognizable head is
//! reported as [`HeadParse::Incomplete`]: a malformed head is
//! indistinguishable from a partial one here, and the connection close path
//! classifies it.

/// Body size declared by a response head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySize {
    /// `Content-Length` carried a well-defined finite size (zero included).
    Known(u64),
    /// No usable length: absent or unparseable `Content-Length`, or chunked
    /// transfer encoding. The update session treats this as fatal.
    Unknown,
}

/// A completely parsed response head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// HTTP status code.
    pub status: u16,
    /// Bytes occupied by the head, including the blank-line terminator.
    /// Everything past this offset is body.
    pub head_len: usize,
    /// Declared body size.
    pub body_size: BodySize,
    /// `Location` header value, copied out of the buffer.
    pub location: Option<String>,
}

/// Outcome of one parse attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadParse {
    /// Not enough bytes yet; wait for the next receive notification.
    Incomplete,
    /// Head fully parsed.
    Complete(ResponseHead),
}

/// Parse a response head from the front of `buf`.
pub fn parse_head(buf: &[u8]) -> HeadParse {
    let Some(head_len) = find_head_end(buf) else {
        return HeadParse::Incomplete;
    };
    let Ok(head) = std::str::from_utf8(&buf[..head_len]) else {
        return HeadParse::Incomplete;
    };

    let mut lines = head.lines();
    let Some(status) = lines.next().and_then(parse_status_line) else {
        return HeadParse::Incomplete;
    };

    let mut content_length = None;
    let mut length_invalid = false;
    let mut chunked = false;
    let mut location = None;

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            match value.parse::<u64>() {
                Ok(n) => content_length = Some(n),
                Err(_) => length_invalid = true,
            }
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            if value.to_ascii_lowercase().contains("chunked") {
                chunked = true;
            }
        } else if name.eq_ignore_ascii_case("location") {
            location = Some(value.to_string());
        }
    }

    let body_size = match content_length {
        Some(n) if !chunked && !length_invalid => BodySize::Known(n),
        _ => BodySize::Unknown,
    };

    HeadParse::Complete(ResponseHead {
        status,
        head_len,
        body_size,
        location,
    })
}

/// Byte length of the head if `buf` contains its blank-line terminator.
///
/// Accepts `\r\n\r\n`, bare `\n\n`, and the mixed `\n\r\n` form, taking the
/// earliest terminator in the stream.
fn find_head_end(buf: &[u8]) -> Option<usize> {
    let mut end: Option<usize> = None;
    for pat in [&b"\r\n\r\n"[..], &b"\n\r\n"[..], &b"\n\n"[..]] {
        if let Some(pos) = buf.windows(pat.len()).position(|w| w == pat) {
            let candidate = pos + pat.len();
            end = Some(end.map_or(candidate, |e| e.min(candidate)));
        }
    }
    end
}

/// Status code from a `HTTP/1.x <code> <reason>` line.
fn parse_status_line(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(buf: &[u8]) -> ResponseHead {
        match parse_head(buf) {
            HeadParse::Complete(head) => head,
            HeadParse::Incomplete => panic!("expected complete head"),
        }
    }

    #[test]
    fn test_partial_head_is_incomplete() {
        assert_eq!(parse_head(b""), HeadParse::Incomplete);
        assert_eq!(parse_head(b"HTTP/1.1 200 OK\r\n"), HeadParse::Incomplete);
        assert_eq!(
            parse_head(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n"),
            HeadParse::Incomplete
        );
    }

    #[test]
    fn test_simple_200_with_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 1024\r\n\r\n";
        let head = complete(raw);
        assert_eq!(head.status, 200);
        assert_eq!(head.head_len, raw.len());
        assert_eq!(head.body_size, BodySize::Known(1024));
        assert_eq!(head.location, None);
    }

    #[test]
    fn test_head_len_excludes_body_bytes() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nBODY";
        let head = complete(raw);
        assert_eq!(head.head_len, raw.len() - 4);
        assert_eq!(&raw[head.head_len..], b"BODY");
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let head = complete(b"HTTP/1.1 200 OK\r\nCONTENT-LENGTH: 7\r\n\r\n");
        assert_eq!(head.body_size, BodySize::Known(7));
    }

    #[test]
    fn test_zero_length_is_known() {
        let head = complete(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        assert_eq!(head.body_size, BodySize::Known(0));
    }

    #[test]
    fn test_missing_length_is_unknown() {
        let head = complete(b"HTTP/1.1 200 OK\r\n\r\n");
        assert_eq!(head.body_size, BodySize::Unknown);
    }

    #[test]
    fn test_chunked_overrides_content_length() {
        let head = complete(
            b"HTTP/1.1 200 OK\r\nContent-Length: 512\r\nTransfer-Encoding: chunked\r\n\r\n",
        );
        assert_eq!(head.body_size, BodySize::Unknown);
    }

    #[test]
    fn test_unparseable_length_is_unknown() {
        let head = complete(b"HTTP/1.1 200 OK\r\nContent-Length: lots\r\n\r\n");
        assert_eq!(head.body_size, BodySize::Unknown);
    }

    #[test]
    fn test_location_is_copied_out() {
        let head = complete(
            b"HTTP/1.1 302 Found\r\nLocation: http://b.example.com/fw.bin\r\n\r\n",
        );
        assert_eq!(head.status, 302);
        assert_eq!(head.location.as_deref(), Some("http://b.example.com/fw.bin"));
    }

    #[test]
    fn test_bare_lf_separators() {
        let raw = b"HTTP/1.1 200 OK\nContent-Length: 3\n\n";
        let head = complete(raw);
        assert_eq!(head.head_len, raw.len());
        assert_eq!(head.body_size, BodySize::Known(3));
    }

    #[test]
    fn test_mixed_terminator() {
        let raw = b"HTTP/1.1 304 Not Modified\n\r\n";
        let head = complete(raw);
        assert_eq!(head.status, 304);
        assert_eq!(head.head_len, raw.len());
    }

    #[test]
    fn test_malformed_status_line_is_incomplete() {
        assert_eq!(parse_head(b"ICY 200 OK\r\n\r\n"), HeadParse::Incomplete);
        assert_eq!(parse_head(b"HTTP/1.1 banana OK\r\n\r\n"), HeadParse::Incomplete);
        assert_eq!(parse_head(b"\r\n\r\n"), HeadParse::Incomplete);
    }

    #[test]
    fn test_earliest_terminator_wins() {
        let raw = b"HTTP/1.1 200 OK\nContent-Length: 2\n\nxx\r\n\r\n";
        let head = complete(raw);
        assert_eq!(head.head_len, raw.len() - 6);
    }
}
