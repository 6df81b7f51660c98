use std::mem;

use futures::{Future, Async, Poll};
use tk_bufstream::{IoBuf, ReadBuf, WriteBuf};
use tokio_io::{AsyncRead, AsyncWrite};

use enums::Method;
use error::Error;
use parser::{Parser, ParseProgress};
use request::{Request, ParseState};
use responder::{Responder, ResponderDone};
use server::Dispatcher;
use websocket::WebSocketConnection;

enum OutState<S> {
    Idle(WriteBuf<S>),
    Write(ResponderDone<S>),
    Void,
}

enum Step {
    Again,
    Eof,
    Upgrade,
    Dispatch,
}

/// A low-level HTTP/1.x server protocol handler for one connection.
///
/// Owns the socket, one request object and one parser for the whole
/// connection lifetime; consecutive requests on the socket clear the
/// request in place. The future resolves when the peer disconnects, an
/// error tears the connection down, or the socket is handed off to a
/// websocket consumer.
///
/// Requests are dispatched in byte-arrival order and the next request
/// is not parsed until the previous response has been fully emitted, so
/// responses keep that order too.
pub struct Proto<S, D> {
    dispatcher: D,
    reading: Option<ReadBuf<S>>,
    writing: OutState<S>,
    request: Request,
    parser: Parser,
}

impl<S: AsyncRead + AsyncWrite, D: Dispatcher<S>> Proto<S, D> {
    /// Wraps an accepted connection. `encrypted` only selects the URL
    /// scheme (`http`/`https`) of parsed requests; transport security
    /// itself lives in `S`.
    pub fn new(conn: S, encrypted: bool, dispatcher: D) -> Proto<S, D> {
        let (out, inp) = IoBuf::new(conn).split();
        Proto {
            dispatcher: dispatcher,
            reading: Some(inp),
            writing: OutState::Idle(out),
            request: Request::new(encrypted),
            parser: Parser::new(),
        }
    }
}

impl<S: AsyncRead + AsyncWrite, D: Dispatcher<S>> Future for Proto<S, D> {
    type Item = ();
    type Error = Error;

    fn poll(&mut self) -> Poll<(), Error> {
        loop {
            // drive the response being emitted; reads wait until the
            // socket is ours again
            match mem::replace(&mut self.writing, OutState::Void) {
                OutState::Write(mut fut) => {
                    match fut.poll()? {
                        Async::Ready(out) => {
                            self.writing = OutState::Idle(out);
                        }
                        Async::NotReady => {
                            self.writing = OutState::Write(fut);
                            return Ok(Async::NotReady);
                        }
                    }
                }
                OutState::Idle(out) => {
                    self.writing = OutState::Idle(out);
                }
                OutState::Void => unreachable!(),
            }
            if let OutState::Idle(ref mut out) = self.writing {
                out.flush()?;
            }

            if self.request.state() == ParseState::MessageComplete {
                self.request.clear();
                self.parser.reset();
            }

            let step = {
                let inp = match self.reading {
                    Some(ref mut inp) => inp,
                    None => return Ok(Async::Ready(())),
                };
                match self.parser.advance(&mut self.request,
                                          &inp.in_buf[..])?
                {
                    ParseProgress::NeedMore => {
                        if inp.read()? == 0 {
                            if inp.done() {
                                Step::Eof
                            } else {
                                return Ok(Async::NotReady);
                            }
                        } else {
                            Step::Again
                        }
                    }
                    ParseProgress::Upgrade => Step::Upgrade,
                    ParseProgress::Complete => Step::Dispatch,
                }
            };
            match step {
                Step::Again => {}
                Step::Eof => {
                    if self.request.state() != ParseState::MessageBegin {
                        debug!("connection closed mid-request");
                    }
                    // don't drop buffered response bytes of earlier
                    // pipelined requests
                    if let OutState::Idle(ref mut out) = self.writing {
                        out.flush()?;
                        if out.out_buf.len() > 0 {
                            return Ok(Async::NotReady);
                        }
                    }
                    return Ok(Async::Ready(()));
                }
                Step::Upgrade => {
                    let proto = self.request.value("upgrade")
                        .unwrap_or("").to_string();
                    if proto.eq_ignore_ascii_case("websocket")
                        && self.dispatcher.websockets_enabled()
                    {
                        // roll the transaction back: nothing was
                        // consumed, so the buffer still holds the
                        // original request bytes
                        let read = self.reading.take()
                            .expect("reading side present");
                        let write = match mem::replace(&mut self.writing,
                                                       OutState::Void)
                        {
                            OutState::Idle(out) => out,
                            _ => unreachable!(),
                        };
                        self.dispatcher.handoff_websocket(
                            WebSocketConnection {
                                read: read,
                                write: write,
                            });
                    } else {
                        warn!("upgrade to {:?} not supported, \
                            closing connection", proto);
                    }
                    return Ok(Async::Ready(()));
                }
                Step::Dispatch => {
                    // commit the read transaction
                    let consumed = self.parser.take_parsed();
                    if let Some(ref mut inp) = self.reading {
                        inp.in_buf.consume(consumed);
                    }
                    let out = match mem::replace(&mut self.writing,
                                                 OutState::Void)
                    {
                        OutState::Idle(out) => out,
                        _ => unreachable!(),
                    };
                    let responder = Responder::new(
                        out, self.request.method() == Method::Head);
                    let done = match self.dispatcher.handle_request(
                        &self.request, responder)
                    {
                        Ok(done) => done,
                        Err(responder) => {
                            self.dispatcher.missing_handler(
                                &self.request, responder)
                        }
                    };
                    self.writing = OutState::Write(done);
                }
            }
        }
    }
}
