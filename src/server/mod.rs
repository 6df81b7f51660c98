//! HTTP server protocol implementation
//!
mod proto;
mod http;

pub use self::proto::Proto;
pub use self::http::HttpServer;

use request::Request;
use responder::{Responder, ResponderDone};
use websocket::WebSocketConnection;

/// The seam between the connection pipeline and the routing layer.
///
/// [`Proto`](struct.Proto.html) calls `handle_request` once per
/// completed request; an implementation either consumes the responder
/// and returns its completion, or gives the responder back to signal
/// that nothing matched, upon which `missing_handler` decides the
/// answer.
///
/// The two websocket hooks gate upgrade hand-off: upgrades are only
/// honored while `websockets_enabled` returns true, otherwise the
/// connection is closed as the upgrade is unsupported.
pub trait Dispatcher<S> {
    fn handle_request(&mut self, request: &Request, responder: Responder<S>)
        -> Result<ResponderDone<S>, Responder<S>>;

    fn missing_handler(&mut self, request: &Request,
                       responder: Responder<S>) -> ResponderDone<S>;

    fn websockets_enabled(&self) -> bool {
        false
    }

    fn handoff_websocket(&mut self, _connection: WebSocketConnection<S>) {
    }
}
