//! Response message serializer shared by the buffered and streaming
//! write paths of the responder.

use std::fmt::Display;
use std::io::Write;

use tk_bufstream::Buf;

use enums::Version;

quick_error! {
    #[derive(Debug)]
    pub enum HeaderError {
        DuplicateContentLength {
            description("Content-Length is added twice")
        }
        DuplicateTransferEncoding {
            description("Transfer-Encoding is added twice")
        }
        InvalidHeaderName {
            description("Header name contains invalid characters")
        }
        InvalidHeaderValue {
            description("Header value contains invalid characters")
        }
        TransferEncodingAfterContentLength {
            description("Transfer encoding added when Content-Length is \
                already specified")
        }
        ContentLengthAfterTransferEncoding {
            description("Content-Length added after Transfer-Encoding")
        }
        CantDetermineBodySize {
            description("Neither Content-Length nor Transfer-Encoding \
                is present in the headers")
        }
        BodyLengthHeader {
            description("Content-Length and Transfer-Encoding must be set \
                using the specialized methods")
        }
        RequireBodyless {
            description("This message must not contain body length fields.")
        }
    }
}

/// State of one response message on the wire.
///
/// Note: while we pass the buffer to each method, we expect that the
/// same buffer is passed each time. The state machine guarantees the
/// status line and the header-terminating CRLF are each written exactly
/// once.
#[derive(Debug)]
pub enum MessageState {
    /// Nothing has been sent.
    ResponseStart { version: Version, body: Body },
    /// Status line is already in the buffer.
    Headers { body: Body },
    /// The message contains a fixed size body.
    FixedHeaders { is_head: bool, content_length: u64 },
    /// The message contains a chunked body.
    ChunkedHeaders { is_head: bool },
    /// The message contains no body.
    ///
    /// All 1xx (Informational), 204 (No Content),
    /// and 304 (Not Modified) responses do not include a message body.
    Bodyless,
    /// The message contains a body with the given length.
    FixedBody { is_head: bool, content_length: u64 },
    /// The message contains a chunked body.
    ChunkedBody { is_head: bool },
    /// A message in final state.
    Done,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Body {
    /// Message contains a body.
    Normal,
    /// Message body is ignored: responses to HEAD requests.
    Head,
    /// Message must not have a body: all 1xx (Informational),
    /// 204 (No Content), and 304 (Not Modified) responses
    Denied,
}

fn invalid_header(value: &[u8]) -> bool {
    value.iter().any(|&x| x == b'\r' || x == b'\n')
}

impl MessageState {
    /// Write the status line.
    ///
    /// # Panics
    ///
    /// When the status line is already written, and when the status code
    /// is 100 (Continue), which is not allowed as a final status.
    pub fn response_status(&mut self, buf: &mut Buf, code: u16,
                           reason: &str)
    {
        use self::Body::*;
        use self::MessageState::*;
        match *self {
            ResponseStart { version, mut body } => {
                assert!(code != 100);
                write!(buf, "{} {} {}\r\n", version, code, reason).unwrap();
                // Responses without body:
                //
                // * 1xx (Informational)
                // * 204 (No Content)
                // * 304 (Not Modified)
                if (code >= 100 && code < 200) || code == 204 || code == 304 {
                    body = Denied;
                }
                *self = Headers { body: body };
            }
            ref state => {
                panic!("Called response_status() method on response \
                    in state {:?}", state)
            }
        }
    }

    fn write_header(&mut self, buf: &mut Buf, name: &str, value: &[u8])
        -> Result<(), HeaderError>
    {
        if invalid_header(name.as_bytes()) {
            return Err(HeaderError::InvalidHeaderName);
        }
        if invalid_header(value) {
            return Err(HeaderError::InvalidHeaderValue);
        }
        buf.write_all(name.as_bytes()).unwrap();
        buf.write_all(b": ").unwrap();
        buf.write_all(value).unwrap();
        buf.write_all(b"\r\n").unwrap();
        Ok(())
    }

    fn write_formatted<D: Display>(&mut self, buf: &mut Buf,
        name: &str, value: D)
        -> Result<(), HeaderError>
    {
        if invalid_header(name.as_bytes()) {
            return Err(HeaderError::InvalidHeaderName);
        }
        let start = buf.len();
        buf.write_all(name.as_bytes()).unwrap();
        buf.write_all(b": ").unwrap();

        let value_start = buf.len();
        write!(buf, "{}", value).unwrap();
        if invalid_header(&buf[value_start..]) {
            buf.remove_range(start..);
            return Err(HeaderError::InvalidHeaderValue);
        }

        buf.write_all(b"\r\n").unwrap();
        Ok(())
    }

    /// Add a header to the message.
    ///
    /// `Content-Length` must be sent using the `add_length` method and
    /// `Transfer-Encoding: chunked` with the `add_chunked` method; both
    /// are important for the correctness of the protocol.
    ///
    /// # Panics
    ///
    /// Panics when `add_header` is called in the wrong state.
    pub fn add_header(&mut self, buf: &mut Buf, name: &str, value: &[u8])
        -> Result<(), HeaderError>
    {
        use self::MessageState::*;
        use self::HeaderError::*;
        if name.eq_ignore_ascii_case("Content-Length")
            || name.eq_ignore_ascii_case("Transfer-Encoding") {
            return Err(BodyLengthHeader)
        }
        match *self {
            Headers { .. } | FixedHeaders { .. } | ChunkedHeaders { .. } => {
                self.write_header(buf, name, value)
            }
            ref state => {
                panic!("Called add_header() method on a message in state {:?}",
                       state)
            }
        }
    }

    /// Same as `add_header` but the value is formatted directly into
    /// the buffer. Useful for numeric headers.
    pub fn format_header<D: Display>(&mut self, buf: &mut Buf,
        name: &str, value: D)
        -> Result<(), HeaderError>
    {
        use self::MessageState::*;
        use self::HeaderError::*;
        if name.eq_ignore_ascii_case("Content-Length")
            || name.eq_ignore_ascii_case("Transfer-Encoding") {
            return Err(BodyLengthHeader)
        }
        match *self {
            Headers { .. } | FixedHeaders { .. } | ChunkedHeaders { .. } => {
                self.write_formatted(buf, name, value)
            }
            ref state => {
                panic!("Called format_header() method on a message \
                    in state {:?}", state)
            }
        }
    }

    /// Add a content length to the message.
    ///
    /// # Panics
    ///
    /// Panics when `add_length` is called in the wrong state.
    pub fn add_length(&mut self, buf: &mut Buf, n: u64)
        -> Result<(), HeaderError>
    {
        use self::MessageState::*;
        use self::HeaderError::*;
        use self::Body::*;
        match *self {
            FixedHeaders { .. } => Err(DuplicateContentLength),
            ChunkedHeaders { .. } => Err(ContentLengthAfterTransferEncoding),
            Headers { body: Denied } => Err(RequireBodyless),
            Headers { body } => {
                self.write_formatted(buf, "Content-Length", n)?;
                *self = FixedHeaders { is_head: body == Head,
                                       content_length: n };
                Ok(())
            }
            ref state => {
                panic!("Called add_length() method on message in state {:?}",
                       state)
            }
        }
    }

    /// Sets the transfer encoding to chunked.
    ///
    /// # Panics
    ///
    /// Panics when `add_chunked` is called in the wrong state.
    pub fn add_chunked(&mut self, buf: &mut Buf)
        -> Result<(), HeaderError>
    {
        use self::MessageState::*;
        use self::HeaderError::*;
        use self::Body::*;
        match *self {
            FixedHeaders { .. } => Err(TransferEncodingAfterContentLength),
            ChunkedHeaders { .. } => Err(DuplicateTransferEncoding),
            Headers { body: Denied } => Err(RequireBodyless),
            Headers { body } => {
                self.write_header(buf, "Transfer-Encoding", b"chunked")?;
                *self = ChunkedHeaders { is_head: body == Head };
                Ok(())
            }
            ref state => {
                panic!("Called add_chunked() method on message in state {:?}",
                       state)
            }
        }
    }

    /// Returns true if the status line denied an entity body (1xx, 204,
    /// 304).
    pub fn body_denied(&self) -> bool {
        matches!(*self, MessageState::Headers { body: Body::Denied })
    }

    /// Closes the HTTP header and returns `true` if an entity body is
    /// expected.
    ///
    /// Specifically `false` is returned when status is 1xx, 204, 304 or
    /// in the response to a `HEAD` request, but not if the body has
    /// zero length.
    ///
    /// # Panics
    ///
    /// Panics when the response is in a wrong state.
    pub fn done_headers(&mut self, buf: &mut Buf)
        -> Result<bool, HeaderError>
    {
        use self::Body::*;
        use self::MessageState::*;
        let expect_body = match *self {
            Headers { body: Denied } => {
                *self = Bodyless;
                false
            }
            Headers { body: Normal } => {
                return Err(HeaderError::CantDetermineBodySize);
            }
            Headers { body: Head } => {
                return Err(HeaderError::CantDetermineBodySize);
            }
            FixedHeaders { is_head, content_length } => {
                *self = FixedBody { is_head: is_head,
                                    content_length: content_length };
                !is_head
            }
            ChunkedHeaders { is_head } => {
                *self = ChunkedBody { is_head: is_head };
                !is_head
            }
            ref state => {
                panic!("Called done_headers() method on response \
                    in state {:?}", state)
            }
        };
        buf.write_all(b"\r\n").unwrap();
        Ok(expect_body)
    }

    /// Write a chunk of the message body.
    ///
    /// Works both for fixed-size and chunked bodies. A body may be
    /// written in response to a HEAD request just like for a real
    /// request, but the data is not put on the wire.
    ///
    /// # Panics
    ///
    /// When the response is in the wrong state or a fixed-size body
    /// would overflow its declared length.
    pub fn write_body(&mut self, buf: &mut Buf, data: &[u8]) {
        use self::MessageState::*;
        match *self {
            Bodyless => panic!("Message must not contain body."),
            FixedBody { is_head, ref mut content_length } => {
                if data.len() as u64 > *content_length {
                    panic!("Fixed size response error. \
                        Bytes left {} but got additional {}",
                        content_length, data.len());
                }
                if !is_head {
                    buf.write_all(data).unwrap();
                }
                *content_length -= data.len() as u64;
            }
            ChunkedBody { is_head } => if !is_head && data.len() > 0 {
                write!(buf, "{:x}\r\n", data.len()).unwrap();
                buf.write_all(data).unwrap();
                buf.write_all(b"\r\n").unwrap();
            },
            ref state => {
                panic!("Called write_body() method on message \
                    in state {:?}", state)
            }
        }
    }

    /// Returns true if `done()` has already been called.
    pub fn is_complete(&self) -> bool {
        matches!(*self, MessageState::Done)
    }

    /// Writes needed finalization data into the buffer.
    ///
    /// The method may be called multiple times.
    ///
    /// # Panics
    ///
    /// When the message is in the wrong state or a fixed-size body was
    /// not written in full.
    pub fn done(&mut self, buf: &mut Buf) {
        use self::MessageState::*;
        match *self {
            Bodyless => *self = Done,
            // Don't check responses to HEAD requests if a body was
            // actually "sent".
            FixedBody { is_head: true, .. } |
            ChunkedBody { is_head: true } => *self = Done,
            FixedBody { is_head: false, content_length: 0 } => *self = Done,
            FixedBody { is_head: false, content_length } =>
                panic!("Tried to close message with {} bytes remaining.",
                       content_length),
            ChunkedBody { is_head: false } => {
                buf.write_all(b"0\r\n\r\n").unwrap();
                *self = Done;
            }
            Done => {}  // multiple invocations are okay.
            ref state => {
                panic!("Called done() method on response in state {:?}",
                       state);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use tk_bufstream::Buf;

    use enums::Version;
    use super::{MessageState, Body};

    fn do_response11<F>(fun: F) -> Buf
        where F: FnOnce(MessageState, &mut Buf)
    {
        let mut buf = Buf::new();
        fun(MessageState::ResponseStart {
            version: Version::Http11,
            body: Body::Normal,
        }, &mut buf);
        buf
    }

    fn do_head_response11<F>(fun: F) -> Buf
        where F: FnOnce(MessageState, &mut Buf)
    {
        let mut buf = Buf::new();
        fun(MessageState::ResponseStart {
            version: Version::Http11,
            body: Body::Head,
        }, &mut buf);
        buf
    }

    #[test]
    fn minimal_response() {
        assert_eq!(&do_response11(|mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_length(buf, 0).unwrap();
            msg.done_headers(buf).unwrap();
            msg.done(buf);
        })[..], "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n".as_bytes());
    }

    #[test]
    fn response_with_body() {
        assert_eq!(&do_response11(|mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_length(buf, 5).unwrap();
            msg.done_headers(buf).unwrap();
            msg.write_body(buf, b"Hello");
            msg.done(buf);
        })[..], "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nHello".as_bytes());
    }

    #[test]
    fn head_response() {
        // The response to a HEAD request may contain the real body
        // length, but the body itself stays off the wire.
        assert_eq!(&do_head_response11(|mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_length(buf, 500).unwrap();
            assert_eq!(msg.done_headers(buf).unwrap(), false);
            msg.write_body(buf, b"data");
            msg.done(buf);
        })[..], "HTTP/1.1 200 OK\r\nContent-Length: 500\r\n\r\n".as_bytes());
    }

    #[test]
    fn informational_response() {
        // No response with an 1xx status code may contain a body length.
        assert_eq!(&do_response11(|mut msg, buf| {
            msg.response_status(buf, 142, "Foo");
            msg.add_length(buf, 500).unwrap_err();
            msg.done_headers(buf).unwrap();
            msg.done(buf);
        })[..], "HTTP/1.1 142 Foo\r\n\r\n".as_bytes());
    }

    #[test]
    fn chunked_response() {
        assert_eq!(&do_response11(|mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_chunked(buf).unwrap();
            msg.done_headers(buf).unwrap();
            msg.write_body(buf, b"Hello");
            msg.write_body(buf, b"");
            msg.write_body(buf, b" world");
            msg.done(buf);
        })[..], concat!("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n",
                        "5\r\nHello\r\n6\r\n world\r\n0\r\n\r\n").as_bytes());
    }

    #[test]
    fn extra_header() {
        assert_eq!(&do_response11(|mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_length(buf, 0).unwrap();
            msg.add_header(buf, "X-Extra", b"yes").unwrap();
            msg.done_headers(buf).unwrap();
            msg.done(buf);
        })[..], concat!("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n",
                        "X-Extra: yes\r\n\r\n").as_bytes());
    }

    #[test]
    fn body_length_header_rejected() {
        do_response11(|mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_header(buf, "Content-Length", b"10").unwrap_err();
            msg.add_header(buf, "transfer-encoding", b"chunked").unwrap_err();
            msg.add_length(buf, 0).unwrap();
            msg.done_headers(buf).unwrap();
            msg.done(buf);
        });
    }

    #[test]
    #[should_panic(expected = "response_status")]
    fn double_status_line() {
        do_response11(|mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.response_status(buf, 200, "OK");
        });
    }
}
