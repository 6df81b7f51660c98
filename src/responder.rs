use std::io;

use futures::{Future, Async, Poll};
use serde_json;
use tk_bufstream::WriteBuf;
use tokio_io::AsyncWrite;

use enums::{Status, Version};
use error::Error;
use response::Response;
use serializer::{MessageState, Body};

/// Size of the ring buffer a streaming transfer moves bytes through.
const RING_SIZE: usize = 512;
/// A transfer stops refilling the output buffer above this amount and
/// waits for the socket to drain.
const FLUSH_WATERMARK: usize = 16384;

/// A one-shot response writer bound to one socket.
///
/// The responder holds exclusive write access to the connection for
/// exactly one response. Every `write_*` method consumes it and returns
/// a [`ResponderDone`] that the connection drives; the type system makes
/// writing twice impossible. Responses are always emitted as HTTP/1.1.
pub struct Responder<S> {
    io: WriteBuf<S>,
    state: MessageState,
    extra: Vec<(String, Vec<u8>)>,
}

/// Continuation returned by the responder's write methods.
///
/// For buffered responses it yields the write half back immediately;
/// for streaming responses it completes when the whole source has been
/// transferred to the socket.
pub struct ResponderDone<S> {
    inner: DoneState<S>,
}

enum DoneState<S> {
    Buffered(Option<WriteBuf<S>>),
    Streaming(Box<Future<Item=WriteBuf<S>, Error=Error>>),
    Failed(Option<Error>),
}

impl<S> ResponderDone<S> {
    fn buffered(io: WriteBuf<S>) -> ResponderDone<S> {
        ResponderDone { inner: DoneState::Buffered(Some(io)) }
    }
    fn streaming(fut: Box<Future<Item=WriteBuf<S>, Error=Error>>)
        -> ResponderDone<S>
    {
        ResponderDone { inner: DoneState::Streaming(fut) }
    }
    fn failed(err: Error) -> ResponderDone<S> {
        ResponderDone { inner: DoneState::Failed(Some(err)) }
    }
}

impl<S> Future for ResponderDone<S> {
    type Item = WriteBuf<S>;
    type Error = Error;
    fn poll(&mut self) -> Poll<WriteBuf<S>, Error> {
        match self.inner {
            DoneState::Buffered(ref mut io) => {
                Ok(Async::Ready(io.take().expect("polled after completion")))
            }
            DoneState::Streaming(ref mut fut) => fut.poll(),
            DoneState::Failed(ref mut err) => {
                Err(err.take().expect("polled after completion"))
            }
        }
    }
}

impl<S> Responder<S> {
    pub(crate) fn new(io: WriteBuf<S>, is_head: bool) -> Responder<S> {
        Responder {
            io: io,
            state: MessageState::ResponseStart {
                version: Version::Http11,
                body: if is_head { Body::Head } else { Body::Normal },
            },
            extra: Vec::new(),
        }
    }

    /// Adds a header for the response about to be written.
    ///
    /// Returns false (and writes nothing) for names or values with CR/LF
    /// bytes, and for the body-length headers the responder manages
    /// itself.
    pub fn add_header(&mut self, name: &str, value: &[u8]) -> bool {
        let bad = |v: &[u8]| v.iter().any(|&x| x == b'\r' || x == b'\n');
        if bad(name.as_bytes()) || bad(value) {
            warn!("header {:?} dropped: invalid characters", name);
            return false;
        }
        if name.eq_ignore_ascii_case("Content-Length")
            || name.eq_ignore_ascii_case("Transfer-Encoding") {
            warn!("header {:?} dropped: body length is set by the \
                responder", name);
            return false;
        }
        self.extra.push((name.to_string(), value.to_vec()));
        true
    }

    /// Answers with a status code only: empty body, mime
    /// `application/x-empty`.
    pub fn status(self, status: Status) -> ResponderDone<S> {
        self.write(b"", "application/x-empty", status)
    }

    /// Answers with a full body, a mime type and a status code.
    ///
    /// Sends the status line, `Content-Type`, `Content-Length`, any
    /// extra headers, and the body.
    pub fn write(mut self, data: &[u8], mime: &str, status: Status)
        -> ResponderDone<S>
    {
        match self.write_buffered(data, mime, status) {
            Ok(()) => ResponderDone::buffered(self.io),
            Err(e) => ResponderDone::failed(e),
        }
    }

    /// Serializes a JSON document, mime `text/json`.
    pub fn write_json(self, data: &serde_json::Value, status: Status)
        -> ResponderDone<S>
    {
        let body = serde_json::to_vec(data)
            .expect("serializing a json value never fails");
        self.write(&body, "text/json", status)
    }

    /// Writes a handler's response value.
    pub fn respond(self, response: Response) -> ResponderDone<S> {
        let (mime, body, status) = response.into_parts();
        self.write(&body, &mime, status)
    }

    fn write_buffered(&mut self, data: &[u8], mime: &str, status: Status)
        -> Result<(), Error>
    {
        let buf = &mut self.io.out_buf;
        self.state.response_status(buf, status.code(), status.reason());
        self.state.add_header(buf, "Content-Type", mime.as_bytes())?;
        if !self.state.body_denied() {
            self.state.add_length(buf, data.len() as u64)?;
        }
        for &(ref name, ref value) in &self.extra {
            self.state.add_header(buf, name, value)?;
        }
        self.state.done_headers(buf)?;
        if !self.state.is_complete()
            && !matches!(self.state, MessageState::Bodyless)
        {
            self.state.write_body(buf, data);
        }
        self.state.done(buf);
        Ok(())
    }
}

impl<S: AsyncWrite + 'static> Responder<S> {
    /// Streams a response body from any byte source.
    ///
    /// With a known size `Content-Length` is sent and the source must
    /// yield exactly that many bytes; without one the transfer uses
    /// chunked encoding. The responder takes ownership of the source and
    /// releases it when it reports end-of-stream or the socket goes
    /// away. Bytes move through a fixed 512-byte ring: refill when the
    /// ring is empty, drain into the socket buffer, and pause above the
    /// flush watermark until the socket catches up.
    pub fn write_io<R>(mut self, source: R, len: Option<u64>, mime: &str,
                       status: Status)
        -> ResponderDone<S>
        where R: io::Read + 'static
    {
        match self.stream_headers(len, mime, status) {
            Ok(true) => {
                let Responder { io, state, .. } = self;
                ResponderDone::streaming(Box::new(BodyTransfer {
                    io: Some(io),
                    state: state,
                    source: Some(source),
                    ring: [0; RING_SIZE],
                    begin: 0,
                    end: 0,
                }))
            }
            Ok(false) => {
                // HEAD or bodyless status: headers only, release the
                // source right away
                let Responder { mut io, mut state, .. } = self;
                state.done(&mut io.out_buf);
                ResponderDone::buffered(io)
            }
            Err(e) => ResponderDone::failed(e),
        }
    }

    fn stream_headers(&mut self, len: Option<u64>, mime: &str,
                      status: Status)
        -> Result<bool, Error>
    {
        let buf = &mut self.io.out_buf;
        self.state.response_status(buf, status.code(), status.reason());
        self.state.add_header(buf, "Content-Type", mime.as_bytes())?;
        if !self.state.body_denied() {
            match len {
                Some(n) => self.state.add_length(buf, n)?,
                None => self.state.add_chunked(buf)?,
            }
        }
        for &(ref name, ref value) in &self.extra {
            self.state.add_header(buf, name, value)?;
        }
        Ok(self.state.done_headers(buf)?)
    }
}

struct BodyTransfer<S, R> {
    io: Option<WriteBuf<S>>,
    state: MessageState,
    source: Option<R>,
    ring: [u8; RING_SIZE],
    begin: usize,
    end: usize,
}

impl<S: AsyncWrite, R: io::Read> Future for BodyTransfer<S, R> {
    type Item = WriteBuf<S>;
    type Error = Error;
    fn poll(&mut self) -> Poll<WriteBuf<S>, Error> {
        loop {
            {
                let io = self.io.as_mut()
                    .expect("transfer polled after completion");
                io.flush()?;
                if io.out_buf.len() > FLUSH_WATERMARK {
                    return Ok(Async::NotReady);
                }
            }
            if self.begin == self.end {
                let bytes = loop {
                    let source = self.source.as_mut()
                        .expect("transfer polled after completion");
                    match source.read(&mut self.ring) {
                        Ok(bytes) => break bytes,
                        Err(ref e)
                            if e.kind() == io::ErrorKind::Interrupted =>
                        {
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    }
                };
                if bytes == 0 {
                    self.source = None;
                    let mut io = self.io.take().unwrap();
                    self.state.done(&mut io.out_buf);
                    io.flush()?;
                    return Ok(Async::Ready(io));
                }
                self.begin = 0;
                self.end = bytes;
            }
            {
                let io = self.io.as_mut().unwrap();
                self.state.write_body(&mut io.out_buf,
                                      &self.ring[self.begin..self.end]);
                self.begin = self.end;
            }
        }
    }
}
