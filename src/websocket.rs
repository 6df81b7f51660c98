use tk_bufstream::{ReadBuf, WriteBuf};

/// A socket handed off after a websocket upgrade request.
///
/// The read transaction is rolled back before hand-off, so `read.in_buf`
/// still holds every byte of the upgrade request: a websocket server
/// receiving this value sees exactly what arrived on the wire and
/// performs the handshake itself. This library does not speak the
/// websocket protocol.
pub struct WebSocketConnection<S> {
    pub read: ReadBuf<S>,
    pub write: WriteBuf<S>,
}
