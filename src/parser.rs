use std::cmp::min;

use httparse::{self, parse_chunk_size};
use url::Url;

use enums::Method;
use error::Error;
use headers::has_token;
use request::{Request, ParseState};

/// Number of headers to allocate on a stack
const MIN_HEADERS: usize = 16;
/// A hard limit on the number of headers
const MAX_HEADERS: usize = 1024;

/// What a single parser step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseProgress {
    /// The message is incomplete, feed more bytes.
    NeedMore,
    /// The headers request a protocol upgrade. Nothing has been
    /// consumed: rolling back is simply not committing.
    Upgrade,
    /// The request reached `MessageComplete`.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Fixed(u64),
    Chunked,
}

#[derive(Debug)]
enum Phase {
    Head,
    Body(BodyProgress),
    Finished,
}

#[derive(Debug)]
enum BodyProgress {
    Fixed(u64),
    Chunked {
        // bytes of the current chunk not yet copied out
        pending: usize,
        expect_crlf: bool,
        trailers: bool,
    },
}

enum HeadOutcome {
    NeedMore,
    Upgrade,
    Body,
    Complete,
}

/// Incremental request parser for one connection.
///
/// The parser never consumes from the input buffer itself. It advances a
/// watermark (`parsed`) that the connection commits once it has decided
/// the bytes are not part of an upgrade hand-off. Until then every byte
/// is still in the buffer, which makes rollback byte-exact.
#[derive(Debug)]
pub struct Parser {
    parsed: usize,
    phase: Phase,
}

impl Parser {
    pub fn new() -> Parser {
        Parser {
            parsed: 0,
            phase: Phase::Head,
        }
    }

    /// Prepares for the next message on the same connection.
    pub fn reset(&mut self) {
        self.parsed = 0;
        self.phase = Phase::Head;
    }

    /// Bytes of the buffer belonging to the current message so far.
    pub fn parsed(&self) -> usize {
        self.parsed
    }

    /// Takes the watermark for committing; the caller consumes that many
    /// bytes from its buffer.
    pub fn take_parsed(&mut self) -> usize {
        let bytes = self.parsed;
        self.parsed = 0;
        bytes
    }

    /// Feeds the currently buffered bytes. `buf` must always be the same
    /// buffer, grown since the last call; consuming from it is only
    /// allowed through `take_parsed`.
    pub fn advance(&mut self, req: &mut Request, buf: &[u8])
        -> Result<ParseProgress, Error>
    {
        if let Phase::Head = self.phase {
            match self.parse_head(req, buf)? {
                HeadOutcome::NeedMore => return Ok(ParseProgress::NeedMore),
                HeadOutcome::Upgrade => return Ok(ParseProgress::Upgrade),
                HeadOutcome::Complete => return Ok(ParseProgress::Complete),
                HeadOutcome::Body => {}
            }
        }
        match self.phase {
            Phase::Head => unreachable!(),
            Phase::Body(BodyProgress::Fixed(..)) => self.parse_fixed(req, buf),
            Phase::Body(BodyProgress::Chunked { .. }) => {
                self.parse_chunked(req, buf)
            }
            Phase::Finished => Ok(ParseProgress::Complete),
        }
    }

    fn parse_head(&mut self, req: &mut Request, buf: &[u8])
        -> Result<HeadOutcome, Error>
    {
        let (bytes, body) = {
            let mut vec;
            let mut headers = [httparse::EMPTY_HEADER; MIN_HEADERS];
            let mut raw = httparse::Request::new(&mut headers);
            let mut result = raw.parse(buf);
            if matches!(result, Err(httparse::Error::TooManyHeaders)) {
                vec = vec![httparse::EMPTY_HEADER; MAX_HEADERS];
                raw = httparse::Request::new(&mut vec);
                result = raw.parse(buf);
            }
            match result? {
                httparse::Status::Complete(bytes) => {
                    req.method = Method::from_name(raw.method.unwrap());
                    req.state = ParseState::Url;
                    apply_target(&mut req.url, raw.path.unwrap())?;
                    req.state = ParseState::Headers;
                    let body = scan_headers(req, raw.headers)?;
                    (bytes, body)
                }
                httparse::Status::Partial => {
                    if !buf.is_empty() {
                        req.state = if contains_crlf(buf) {
                            ParseState::Headers
                        } else {
                            ParseState::Url
                        };
                    }
                    return Ok(HeadOutcome::NeedMore);
                }
            }
        };
        req.state = ParseState::HeadersComplete;
        self.parsed = bytes;
        if wants_upgrade(req) {
            return Ok(HeadOutcome::Upgrade);
        }
        match body {
            BodyKind::Fixed(0) => {
                req.state = ParseState::MessageComplete;
                self.phase = Phase::Finished;
                Ok(HeadOutcome::Complete)
            }
            BodyKind::Fixed(len) => {
                self.phase = Phase::Body(BodyProgress::Fixed(len));
                Ok(HeadOutcome::Body)
            }
            BodyKind::Chunked => {
                self.phase = Phase::Body(BodyProgress::Chunked {
                    pending: 0,
                    expect_crlf: false,
                    trailers: false,
                });
                Ok(HeadOutcome::Body)
            }
        }
    }

    fn parse_fixed(&mut self, req: &mut Request, buf: &[u8])
        -> Result<ParseProgress, Error>
    {
        let remaining = match self.phase {
            Phase::Body(BodyProgress::Fixed(ref mut n)) => n,
            _ => unreachable!(),
        };
        let avail = (buf.len() - self.parsed) as u64;
        if avail == 0 {
            return Ok(ParseProgress::NeedMore);
        }
        let take = min(avail, *remaining) as usize;
        req.body.extend_from_slice(&buf[self.parsed..self.parsed + take]);
        self.parsed += take;
        *remaining -= take as u64;
        if *remaining == 0 {
            req.state = ParseState::MessageComplete;
            self.phase = Phase::Finished;
            Ok(ParseProgress::Complete)
        } else {
            req.state = ParseState::Body;
            Ok(ParseProgress::NeedMore)
        }
    }

    fn parse_chunked(&mut self, req: &mut Request, buf: &[u8])
        -> Result<ParseProgress, Error>
    {
        let (mut pending, mut expect_crlf, mut trailers) = match self.phase {
            Phase::Body(BodyProgress::Chunked { pending, expect_crlf,
                                                trailers }) => {
                (pending, expect_crlf, trailers)
            }
            _ => unreachable!(),
        };
        let result = loop {
            if expect_crlf {
                if buf.len() - self.parsed < 2 {
                    break Ok(ParseProgress::NeedMore);
                }
                if &buf[self.parsed..self.parsed + 2] != b"\r\n" {
                    return Err(Error::BadChunkFraming);
                }
                self.parsed += 2;
                expect_crlf = false;
                req.state = ParseState::ChunkComplete;
                continue;
            }
            if trailers {
                // skip trailer lines until the empty one
                match find_crlf(&buf[self.parsed..]) {
                    None => break Ok(ParseProgress::NeedMore),
                    Some(0) => {
                        self.parsed += 2;
                        req.state = ParseState::MessageComplete;
                        self.phase = Phase::Finished;
                        return Ok(ParseProgress::Complete);
                    }
                    Some(line) => {
                        self.parsed += line + 2;
                        continue;
                    }
                }
            }
            if pending == 0 {
                match parse_chunk_size(&buf[self.parsed..])? {
                    httparse::Status::Partial => {
                        break Ok(ParseProgress::NeedMore);
                    }
                    httparse::Status::Complete((consumed, size)) => {
                        self.parsed += consumed;
                        req.state = ParseState::ChunkHeader;
                        if size == 0 {
                            trailers = true;
                        } else {
                            pending = size as usize;
                        }
                        continue;
                    }
                }
            }
            let avail = buf.len() - self.parsed;
            if avail == 0 {
                break Ok(ParseProgress::NeedMore);
            }
            let take = min(avail, pending);
            req.body.extend_from_slice(
                &buf[self.parsed..self.parsed + take]);
            self.parsed += take;
            pending -= take;
            req.state = ParseState::Body;
            if pending == 0 {
                expect_crlf = true;
            }
        };
        self.phase = Phase::Body(BodyProgress::Chunked {
            pending: pending,
            expect_crlf: expect_crlf,
            trailers: trailers,
        });
        result
    }
}

/// Implements the body length algorithm for requests:
/// http://httpwg.github.io/specs/rfc7230.html#message.body.length
///
/// 1. If the last transfer encoding is chunked the request is chunked.
/// 2. A valid Content-Length gives a fixed length in octets.
/// 3. Neither present: the request has an empty body.
///
/// Also records every header into the request, parsing `Host` as the
/// authority of the request URL.
fn scan_headers(req: &mut Request, headers: &[httparse::Header])
    -> Result<BodyKind, Error>
{
    let mut body = BodyKind::Fixed(0);
    let mut has_content_length = false;
    for header in headers.iter() {
        let value = String::from_utf8_lossy(header.value);
        req.headers.insert(header.name, &value);
        if header.name.eq_ignore_ascii_case("Host") {
            apply_authority(&mut req.url, value.trim())?;
        } else if header.name.eq_ignore_ascii_case("Transfer-Encoding") {
            if let Some(enc) = value.split(',').last() {
                if enc.trim().eq_ignore_ascii_case("chunked") {
                    body = BodyKind::Chunked;
                }
            }
        } else if header.name.eq_ignore_ascii_case("Content-Length") {
            if has_content_length {
                return Err(Error::DuplicateContentLength);
            }
            has_content_length = true;
            if body != BodyKind::Chunked {
                // transfer-encoding has preference
                let len = value.trim().parse()
                    .map_err(|_| Error::ContentLengthInvalid)?;
                body = BodyKind::Fixed(len);
            }
        }
    }
    Ok(body)
}

/// The parser equivalent of the `upgrade` flag: an `Upgrade` header
/// together with an `upgrade` token in `Connection`.
fn wants_upgrade(req: &Request) -> bool {
    req.headers.get("upgrade").is_some() &&
        req.headers.get("connection")
            .map_or(false, |v| has_token(v, "upgrade"))
}

/// Applies the request-target to the URL. Origin-form targets set path,
/// query and fragment; absolute-form targets replace the whole URL
/// (their scheme wins, as the original parser's url callback does).
fn apply_target(url: &mut Url, target: &str) -> Result<(), Error> {
    if target.starts_with('/') {
        let (target, fragment) = match target.find('#') {
            Some(pos) => (&target[..pos], Some(&target[pos + 1..])),
            None => (target, None),
        };
        let (path, query) = match target.find('?') {
            Some(pos) => (&target[..pos], Some(&target[pos + 1..])),
            None => (target, None),
        };
        url.set_path(path);
        url.set_query(query);
        url.set_fragment(fragment);
        Ok(())
    } else if target.contains("://") {
        *url = Url::parse(target).map_err(|_| Error::BadRequestTarget)?;
        Ok(())
    } else if target == "*" {
        Ok(())
    } else {
        // authority-form (CONNECT-style)
        apply_authority(url, target)
    }
}

/// Parses `[userinfo@]host[:port]` into the URL.
fn apply_authority(url: &mut Url, value: &str) -> Result<(), Error> {
    let rest = match value.rfind('@') {
        Some(pos) => {
            let userinfo = &value[..pos];
            let (user, password) = match userinfo.find(':') {
                Some(p) => (&userinfo[..p], Some(&userinfo[p + 1..])),
                None => (userinfo, None),
            };
            url.set_username(user).map_err(|_| Error::HostInvalid)?;
            url.set_password(password).map_err(|_| Error::HostInvalid)?;
            &value[pos + 1..]
        }
        None => value,
    };
    let (host, port) = if rest.starts_with('[') {
        // bracketed IPv6 literal
        let close = rest.find(']').ok_or(Error::HostInvalid)?;
        let host = &rest[..close + 1];
        let tail = &rest[close + 1..];
        let port = if tail.starts_with(':') {
            Some(tail[1..].parse().map_err(|_| Error::HostInvalid)?)
        } else {
            None
        };
        (host, port)
    } else {
        match rest.rfind(':') {
            Some(pos) => {
                let port = rest[pos + 1..].parse()
                    .map_err(|_| Error::HostInvalid)?;
                (&rest[..pos], Some(port))
            }
            None => (rest, None),
        }
    };
    if host.is_empty() {
        return Err(Error::HostInvalid);
    }
    url.set_host(Some(host)).map_err(|_| Error::HostInvalid)?;
    url.set_port(port).map_err(|_| Error::HostInvalid)?;
    Ok(())
}

fn contains_crlf(buf: &[u8]) -> bool {
    find_crlf(buf).is_some()
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

#[cfg(test)]
mod test {
    use error::Error;
    use enums::Method;
    use request::{Request, ParseState};
    use super::{Parser, ParseProgress};

    fn feed(parser: &mut Parser, req: &mut Request, bytes: &[u8])
        -> ParseProgress
    {
        parser.advance(req, bytes).unwrap()
    }

    #[test]
    fn simple_get() {
        let mut parser = Parser::new();
        let mut req = Request::new(false);
        let buf = b"GET /hello?x=1 HTTP/1.1\r\nHost: example.org:8080\r\n\r\n";
        assert_eq!(feed(&mut parser, &mut req, buf), ParseProgress::Complete);
        assert_eq!(req.method(), Method::Get);
        assert_eq!(req.url().path(), "/hello");
        assert_eq!(req.url().query(), Some("x=1"));
        assert_eq!(req.url().host_str(), Some("example.org"));
        assert_eq!(req.url().port(), Some(8080));
        assert_eq!(req.state(), ParseState::MessageComplete);
        assert_eq!(parser.parsed(), buf.len());
    }

    #[test]
    fn incremental_head() {
        let mut parser = Parser::new();
        let mut req = Request::new(false);
        let buf = b"GET /incremental HTTP/1.1\r\nHost: localhost\r\n\r\n";
        assert_eq!(feed(&mut parser, &mut req, &buf[..4]),
                   ParseProgress::NeedMore);
        assert_eq!(req.state(), ParseState::Url);
        assert_eq!(feed(&mut parser, &mut req, &buf[..30]),
                   ParseProgress::NeedMore);
        assert_eq!(req.state(), ParseState::Headers);
        assert_eq!(feed(&mut parser, &mut req, buf),
                   ParseProgress::Complete);
        assert_eq!(req.url().path(), "/incremental");
    }

    #[test]
    fn fixed_body() {
        let mut parser = Parser::new();
        let mut req = Request::new(false);
        let buf = b"POST /post-body HTTP/1.1\r\nHost: localhost\r\n\
                    Content-Length: 14\r\n\r\nsome post data";
        let head_len = buf.len() - 14;
        assert_eq!(feed(&mut parser, &mut req, &buf[..head_len + 4]),
                   ParseProgress::NeedMore);
        assert_eq!(req.state(), ParseState::Body);
        assert_eq!(feed(&mut parser, &mut req, buf),
                   ParseProgress::Complete);
        assert_eq!(req.method(), Method::Post);
        assert_eq!(req.body(), b"some post data");
        assert_eq!(parser.parsed(), buf.len());
    }

    #[test]
    fn chunked_body() {
        let mut parser = Parser::new();
        let mut req = Request::new(false);
        let buf = b"POST /upload HTTP/1.1\r\nHost: localhost\r\n\
                    Transfer-Encoding: chunked\r\n\r\n\
                    4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
        assert_eq!(feed(&mut parser, &mut req, buf),
                   ParseProgress::Complete);
        assert_eq!(req.body(), b"Wikipedia");
        assert_eq!(req.state(), ParseState::MessageComplete);
        assert_eq!(parser.parsed(), buf.len());
    }

    #[test]
    fn chunked_body_split_feeds() {
        let mut parser = Parser::new();
        let mut req = Request::new(false);
        let buf: &[u8] = b"POST /upload HTTP/1.1\r\nHost: localhost\r\n\
                    Transfer-Encoding: chunked\r\n\r\n\
                    4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
        for cut in (buf.len() - 12)..buf.len() {
            assert_eq!(feed(&mut parser, &mut req, &buf[..cut]),
                       ParseProgress::NeedMore, "cut at {}", cut);
        }
        assert_eq!(feed(&mut parser, &mut req, buf),
                   ParseProgress::Complete);
        assert_eq!(req.body(), b"Wikipedia");
    }

    #[test]
    fn upgrade_consumes_nothing() {
        let mut parser = Parser::new();
        let mut req = Request::new(false);
        let buf = b"GET /chat HTTP/1.1\r\nHost: localhost\r\n\
                    Connection: Upgrade\r\nUpgrade: websocket\r\n\r\n";
        assert_eq!(feed(&mut parser, &mut req, buf),
                   ParseProgress::Upgrade);
        assert_eq!(req.state(), ParseState::HeadersComplete);
        assert_eq!(req.value("upgrade"), Some("websocket"));
        // the watermark is set but nothing was consumed: rollback is free
        assert_eq!(parser.parsed(), buf.len());
    }

    #[test]
    fn duplicate_content_length() {
        let mut parser = Parser::new();
        let mut req = Request::new(false);
        let buf = b"POST / HTTP/1.1\r\nContent-Length: 4\r\n\
                    Content-Length: 5\r\n\r\n";
        match parser.advance(&mut req, buf) {
            Err(Error::DuplicateContentLength) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn garbage_request_line() {
        let mut parser = Parser::new();
        let mut req = Request::new(false);
        assert!(parser.advance(&mut req, b"GET / TTMP/2.0\r\n\r\n").is_err());
    }

    #[test]
    fn absolute_form_target() {
        let mut parser = Parser::new();
        let mut req = Request::new(false);
        let buf =
            b"GET http://user@proxy.example:3128/over?here HTTP/1.1\r\n\r\n";
        assert_eq!(feed(&mut parser, &mut req, buf),
                   ParseProgress::Complete);
        assert_eq!(req.url().host_str(), Some("proxy.example"));
        assert_eq!(req.url().port(), Some(3128));
        assert_eq!(req.url().username(), "user");
        assert_eq!(req.url().path(), "/over");
        assert_eq!(req.url().query(), Some("here"));
    }

    #[test]
    fn reuse_after_reset() {
        let mut parser = Parser::new();
        let mut req = Request::new(false);
        let first = b"GET /one HTTP/1.1\r\nHost: localhost\r\n\r\n";
        assert_eq!(feed(&mut parser, &mut req, first),
                   ParseProgress::Complete);
        assert_eq!(parser.take_parsed(), first.len());
        req.clear();
        parser.reset();
        let second = b"GET /two HTTP/1.1\r\nHost: localhost\r\n\r\n";
        assert_eq!(feed(&mut parser, &mut req, second),
                   ParseProgress::Complete);
        assert_eq!(req.url().path(), "/two");
    }
}
