//! Push-based incremental request parser.
//!
//! [`RequestParser`] accepts a request as an arbitrary sequence of byte
//! fragments. Tokenising of the request head is delegated to `httparse`; this
//! type adds buffering across reads, body framing (`Content-Length` and
//! chunked transfer coding) and size limits.

use std::mem;
use std::str::FromStr;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// Longest accepted chunk-size line, extensions included.
const MAX_CHUNK_LINE: usize = 1024;

/// Size limits enforced while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Maximum number of request headers.
    pub max_headers: usize,
    /// Maximum size of the request line plus headers, in bytes.
    pub max_head_size: usize,
    /// Maximum size of the decoded request body, in bytes.
    pub max_body_size: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_headers: 64,
            max_head_size: 64 * 1024,
            max_body_size: 16 * 1024 * 1024,
        }
    }
}

/// The request line and headers, fixed once the head is parsed.
#[derive(Debug, Clone)]
struct RequestHead {
    method: Method,
    target: String,
    version: HttpVersion,
    headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    Size,
    Data { remaining: usize },
    DataEnd,
    Trailers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    Length { remaining: usize },
    Chunked(ChunkState),
    Complete,
}

/// Incremental HTTP/1.x request parser.
///
/// Feed bytes with [`feed`](Self::feed) as they arrive. The parser reports
/// how many bytes of each fragment belong to the current request; once the
/// message is complete no further bytes are consumed.
#[derive(Debug)]
pub struct RequestParser {
    limits: ParseLimits,
    state: State,
    // Bytes of the head, a chunk-size line or chunk framing seen so far.
    pending: Vec<u8>,
    head: Option<RequestHead>,
    body: Vec<u8>,
}

impl RequestParser {
    /// Create a parser enforcing the given limits.
    pub fn new(limits: ParseLimits) -> Self {
        Self {
            limits,
            state: State::Head,
            pending: Vec::new(),
            head: None,
            body: Vec::new(),
        }
    }

    /// Feed the next fragment of the request.
    ///
    /// Returns the number of bytes consumed. A count shorter than
    /// `data.len()` means the request ended inside this fragment and the
    /// remainder belongs to something else.
    pub fn feed(&mut self, data: &[u8]) -> Result<usize, Error> {
        let mut consumed = 0;
        while consumed < data.len() {
            let input = &data[consumed..];
            let used = match self.state {
                State::Head => self.feed_head(input)?,
                State::Length { remaining } => {
                    let take = remaining.min(input.len());
                    self.body.extend_from_slice(&input[..take]);
                    self.state = if take == remaining {
                        State::Complete
                    } else {
                        State::Length { remaining: remaining - take }
                    };
                    take
                }
                State::Chunked(chunk) => self.feed_chunked(chunk, input)?,
                State::Complete => break,
            };
            consumed += used;
        }
        Ok(consumed)
    }

    /// Whether the request line and all headers have been parsed.
    pub fn headers_complete(&self) -> bool {
        self.head.is_some()
    }

    /// Whether the whole request, body included, has been parsed.
    pub fn message_complete(&self) -> bool {
        self.state == State::Complete
    }

    pub fn method(&self) -> Option<Method> {
        self.head.as_ref().map(|head| head.method)
    }

    pub fn target(&self) -> Option<&str> {
        self.head.as_ref().map(|head| head.target.as_str())
    }

    pub fn version(&self) -> Option<HttpVersion> {
        self.head.as_ref().map(|head| head.version)
    }

    /// Headers in arrival order. Empty until the head is complete.
    pub fn headers(&self) -> &[(String, String)] {
        self.head.as_ref().map_or(&[], |head| head.headers.as_slice())
    }

    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Take the assembled body, leaving the parser's buffer empty.
    pub fn take_body(&mut self) -> Vec<u8> {
        mem::take(&mut self.body)
    }

    /// Keep-alive hint derived from the request.
    ///
    /// `Connection: close` always wins, `Connection: keep-alive` keeps the
    /// connection open, otherwise HTTP/1.1 and later default to keep-alive.
    pub fn should_keep_alive(&self) -> bool {
        let Some(head) = &self.head else {
            return false;
        };
        let mut keep_alive = false;
        for (name, value) in &head.headers {
            if !name.eq_ignore_ascii_case("Connection") {
                continue;
            }
            for token in value.split(',').map(str::trim) {
                if token.eq_ignore_ascii_case("close") {
                    return false;
                }
                if token.eq_ignore_ascii_case("keep-alive") {
                    keep_alive = true;
                }
            }
        }
        keep_alive || head.version.keeps_alive_by_default()
    }

    fn feed_head(&mut self, input: &[u8]) -> Result<usize, Error> {
        let before = self.pending.len();
        self.pending.extend_from_slice(input);

        let mut slots = vec![httparse::EMPTY_HEADER; self.limits.max_headers];
        let mut req = httparse::Request::new(&mut slots);
        let head_len = match req.parse(&self.pending) {
            Ok(httparse::Status::Complete(len)) => len,
            Ok(httparse::Status::Partial) => {
                if self.pending.len() > self.limits.max_head_size {
                    return Err(Error::HeadTooLarge(self.limits.max_head_size));
                }
                return Ok(input.len());
            }
            Err(httparse::Error::TooManyHeaders) => {
                return Err(Error::TooManyHeaders(self.limits.max_headers));
            }
            Err(e) => return Err(e.into()),
        };
        if head_len > self.limits.max_head_size {
            return Err(Error::HeadTooLarge(self.limits.max_head_size));
        }

        let method = Method::from_str(req.method.unwrap_or_default())?;
        let target = req.path.unwrap_or_default().to_string();
        let version = HttpVersion::from_minor(req.version.unwrap_or_default())?;
        let headers = req
            .headers
            .iter()
            .map(|h| {
                std::str::from_utf8(h.value)
                    .map(|value| (h.name.to_string(), value.to_string()))
                    .map_err(|_| Error::InvalidHeaderFormat)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.pending.clear();
        let head = RequestHead { method, target, version, headers };
        self.state = self.body_framing(&head)?;
        self.head = Some(head);

        Ok(head_len - before)
    }

    fn body_framing(&self, head: &RequestHead) -> Result<State, Error> {
        let chunked = head
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("Transfer-Encoding"))
            .flat_map(|(_, v)| v.split(','))
            .map(str::trim)
            .last()
            .is_some_and(|coding| coding.eq_ignore_ascii_case("chunked"));
        if chunked {
            return Ok(State::Chunked(ChunkState::Size));
        }

        let mut length: Option<usize> = None;
        for (_, value) in head
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
        {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| Error::InvalidContentLength(value.clone()))?;
            if length.is_some_and(|seen| seen != parsed) {
                return Err(Error::InvalidContentLength(value.clone()));
            }
            length = Some(parsed);
        }

        match length {
            Some(len) if len > self.limits.max_body_size => {
                Err(Error::BodyTooLarge(self.limits.max_body_size))
            }
            Some(len) if len > 0 => Ok(State::Length { remaining: len }),
            _ => Ok(State::Complete),
        }
    }

    fn feed_chunked(&mut self, chunk: ChunkState, input: &[u8]) -> Result<usize, Error> {
        match chunk {
            ChunkState::Size => {
                let before = self.pending.len();
                self.pending.extend_from_slice(input);
                match httparse::parse_chunk_size(&self.pending) {
                    Ok(httparse::Status::Complete((end, size))) => {
                        let size = usize::try_from(size)
                            .map_err(|_| Error::BodyTooLarge(self.limits.max_body_size))?;
                        if self.body.len().saturating_add(size) > self.limits.max_body_size {
                            return Err(Error::BodyTooLarge(self.limits.max_body_size));
                        }
                        self.pending.clear();
                        self.state = State::Chunked(if size == 0 {
                            ChunkState::Trailers
                        } else {
                            ChunkState::Data { remaining: size }
                        });
                        Ok(end - before)
                    }
                    Ok(httparse::Status::Partial) => {
                        if self.pending.len() > MAX_CHUNK_LINE {
                            return Err(Error::InvalidChunk("chunk size line too long"));
                        }
                        Ok(input.len())
                    }
                    Err(_) => Err(Error::InvalidChunk("invalid chunk size")),
                }
            }
            ChunkState::Data { remaining } => {
                let take = remaining.min(input.len());
                self.body.extend_from_slice(&input[..take]);
                self.state = State::Chunked(if take == remaining {
                    ChunkState::DataEnd
                } else {
                    ChunkState::Data { remaining: remaining - take }
                });
                Ok(take)
            }
            ChunkState::DataEnd => {
                let take = (2 - self.pending.len()).min(input.len());
                self.pending.extend_from_slice(&input[..take]);
                if self.pending.len() == 2 {
                    if self.pending != b"\r\n" {
                        return Err(Error::InvalidChunk("missing CRLF after chunk data"));
                    }
                    self.pending.clear();
                    self.state = State::Chunked(ChunkState::Size);
                }
                Ok(take)
            }
            ChunkState::Trailers => {
                let before = self.pending.len();
                self.pending.extend_from_slice(input);
                let end = if self.pending.starts_with(b"\r\n") {
                    Some(2)
                } else {
                    find(&self.pending, b"\r\n\r\n").map(|pos| pos + 4)
                };
                match end {
                    Some(end) => {
                        self.pending.clear();
                        self.state = State::Complete;
                        Ok(end - before)
                    }
                    None if self.pending.len() > self.limits.max_head_size => {
                        Err(Error::HeadTooLarge(self.limits.max_head_size))
                    }
                    None => Ok(input.len()),
                }
            }
        }
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new(ParseLimits::default())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
