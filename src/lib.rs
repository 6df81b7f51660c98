//! Routed HTTP/1.x server based on `tokio` tools
//!
//! The library drives one HTTP parser per socket, matches completed
//! requests against an ordered list of URL patterns with typed path
//! captures, and writes responses back on the same socket in request
//! order. Websocket upgrades are handed off to the embedder together
//! with the bytes read so far.

extern crate futures;
extern crate url;
extern crate httparse;
extern crate tokio_core;
extern crate tokio_io;
extern crate tk_bufstream;
extern crate regex;
extern crate mime_guess;
#[macro_use] extern crate serde_json;
#[macro_use(quick_error)] extern crate quick_error;
#[macro_use] extern crate matches;
#[macro_use] extern crate log;

pub mod enums;
pub mod server;
mod error;
mod headers;
mod request;
mod parser;
mod serializer;
mod response;
mod responder;
mod captures;
mod handler;
mod router;
mod websocket;

pub use enums::{Method, MethodMask, IntoMethodMask, Status, Version};
pub use error::{Error, RuleError};
pub use headers::HeaderMap;
pub use request::{Request, ParseState};
pub use response::Response;
pub use responder::{Responder, ResponderDone};
pub use serializer::HeaderError;
pub use captures::{PathCapture, PathArgs, Rest};
pub use handler::{View, Direct, TakesRequest, TakesResponder};
pub use router::{Router, RouteRule};
pub use websocket::WebSocketConnection;
pub use server::{Proto, Dispatcher, HttpServer};
