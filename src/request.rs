use url::Url;

use enums::Method;
use headers::HeaderMap;

/// Where the parser currently is within one request message.
///
/// Observable through `Request::state`; `MessageComplete` is the signal
/// that the request is ready to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    MessageBegin,
    Url,
    Status,
    Headers,
    HeadersComplete,
    Body,
    MessageComplete,
    ChunkHeader,
    ChunkComplete,
}

/// A parsed (or partially parsed) HTTP request.
///
/// One instance lives per connection and is cleared in place when the
/// next request arrives on the same socket, keeping its allocations.
/// The URL scheme reflects whether the transport reported itself as
/// encrypted when the connection was accepted.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
    pub(crate) state: ParseState,
}

fn default_url(encrypted: bool) -> Url {
    let base = if encrypted { "https://localhost/" } else { "http://localhost/" };
    Url::parse(base).expect("default url is valid")
}

impl Request {
    pub fn new(encrypted: bool) -> Request {
        Request {
            method: Method::Unknown,
            url: default_url(encrypted),
            headers: HeaderMap::new(),
            body: Vec::new(),
            state: ParseState::MessageBegin,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive single-header lookup.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Resets for the next request on a kept-alive connection.
    ///
    /// The URL scheme survives: it belongs to the transport, not to a
    /// single request.
    pub(crate) fn clear(&mut self) {
        let encrypted = self.url.scheme() == "https";
        self.method = Method::Unknown;
        self.url = default_url(encrypted);
        self.headers.clear();
        self.body.clear();
        self.state = ParseState::MessageBegin;
    }
}
