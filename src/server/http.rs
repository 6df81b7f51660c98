use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::rc::Rc;

use futures::{Future, Stream};
use tokio_core::net::{TcpListener, TcpStream};
use tokio_core::reactor::Handle;

use enums::{IntoMethodMask, MethodMask, Status};
use error::RuleError;
use handler::View;
use request::Request;
use responder::{Responder, ResponderDone};
use response::Response;
use router::{Router, RouteRule};
use server::{Dispatcher, Proto};
use websocket::WebSocketConnection;

type MissingHandler =
    Box<Fn(&Request, Responder<TcpStream>) -> ResponderDone<TcpStream>>;

struct WebSockets {
    subscribed: bool,
    notify: Option<Box<FnMut()>>,
    pending: VecDeque<WebSocketConnection<TcpStream>>,
}

struct Shared {
    router: RefCell<Router<TcpStream>>,
    missing: RefCell<MissingHandler>,
    websockets: RefCell<WebSockets>,
    addrs: RefCell<Vec<SocketAddr>>,
}

/// The embedding surface: a router-backed HTTP server on a tokio-core
/// event loop.
///
/// All I/O runs on the loop the server was created with; the server
/// value itself is a cheap handle and everything it spawns shares one
/// router. Routes should be registered before traffic arrives; adding
/// rules concurrently with request dispatch is not supported.
///
/// ```rust,no_run
/// # extern crate tokio_core;
/// # extern crate tk_webroute;
/// # use tk_webroute::HttpServer;
/// # fn main() {
/// let mut core = tokio_core::reactor::Core::new().unwrap();
/// let server = HttpServer::new(&core.handle());
/// server.route("/", || "Hello world");
/// server.route("/page/", |page: i32| format!("page: {}", page));
/// server.listen("127.0.0.1".parse().unwrap(), 8080).unwrap();
/// # }
/// ```
pub struct HttpServer {
    shared: Rc<Shared>,
    handle: Handle,
}

fn default_missing(_request: &Request, responder: Responder<TcpStream>)
    -> ResponderDone<TcpStream>
{
    responder.respond(Response::error_page(Status::NotFound))
}

impl HttpServer {
    pub fn new(handle: &Handle) -> HttpServer {
        HttpServer {
            shared: Rc::new(Shared {
                router: RefCell::new(Router::new()),
                missing: RefCell::new(Box::new(default_missing)),
                websockets: RefCell::new(WebSockets {
                    subscribed: false,
                    notify: None,
                    pending: VecDeque::new(),
                }),
                addrs: RefCell::new(Vec::new()),
            }),
            handle: handle.clone(),
        }
    }

    /// Binds a fresh TCP listener and starts serving on it.
    ///
    /// Returns the actually bound port (useful with port 0).
    pub fn listen(&self, addr: IpAddr, port: u16) -> io::Result<u16> {
        let listener = TcpListener::bind(&SocketAddr::new(addr, port),
                                         &self.handle)?;
        let port = listener.local_addr()?.port();
        self.bind(listener);
        Ok(port)
    }

    /// Adopts an externally created, already-listening TCP listener.
    ///
    /// May be called multiple times; every listener dispatches through
    /// the same router.
    pub fn bind(&self, listener: TcpListener) {
        match listener.local_addr() {
            Ok(addr) => self.shared.addrs.borrow_mut().push(addr),
            Err(e) => debug!("can't get listener address: {}", e),
        }
        let shared = self.shared.clone();
        let handle = self.handle.clone();
        let accept = listener.incoming().for_each(move |(conn, peer)| {
            debug!("new connection from {}", peer);
            let dispatcher = RouterDispatcher { shared: shared.clone() };
            handle.spawn(Proto::new(conn, false, dispatcher)
                .map_err(|e| debug!("connection terminated: {}", e)));
            Ok(())
        }).map_err(|e| warn!("accept error: {}", e));
        self.handle.spawn(accept);
    }

    /// Addresses of the listeners bound so far.
    pub fn servers(&self) -> Vec<SocketAddr> {
        self.shared.addrs.borrow().clone()
    }

    /// Registers a route accepting any method.
    pub fn route<K, V>(&self, pattern: &str, view: V) -> bool
        where V: View<TcpStream, K>
    {
        self.route_method(pattern, MethodMask::ALL, view)
    }

    /// Registers a route for the given methods: a [`Method`], a mask
    /// built with `|`, or a string like `"GET|POST"` or `"All"`.
    ///
    /// Returns false (leaving the rule set unchanged) when the mask or
    /// the pattern is rejected.
    ///
    /// [`Method`]: enum.Method.html
    pub fn route_method<M, K, V>(&self, pattern: &str, methods: M, view: V)
        -> bool
        where M: IntoMethodMask, V: View<TcpStream, K>
    {
        let mask = match methods.into_mask() {
            Some(mask) => mask,
            None => {
                warn!("route {:?} rejected: {}", pattern,
                      RuleError::BadMethodMask);
                return false;
            }
        };
        let result = self.shared.router.borrow_mut()
            .add_rule(RouteRule::new(pattern, mask), view);
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("route {:?} rejected: {}", pattern, e);
                false
            }
        }
    }

    /// Direct access to the router, for custom rules (guards) and
    /// converter registration.
    pub fn router(&self) -> RefMut<Router<TcpStream>> {
        self.shared.router.borrow_mut()
    }

    /// Replaces the policy applied when no rule matches. The default
    /// answers `404 Not Found` with a small html page.
    pub fn set_missing_handler<F>(&self, f: F)
        where F: Fn(&Request, Responder<TcpStream>)
                    -> ResponderDone<TcpStream> + 'static
    {
        *self.shared.missing.borrow_mut() = Box::new(f);
    }

    /// Subscribes to websocket hand-offs.
    ///
    /// Upgrade requests are only honored while a subscriber exists;
    /// without one the connection is closed. The callback fires each
    /// time a connection is queued; fetch it with
    /// `next_pending_websocket_connection`.
    pub fn on_websocket_connection<F: FnMut() + 'static>(&self, f: F) {
        let mut ws = self.shared.websockets.borrow_mut();
        ws.subscribed = true;
        ws.notify = Some(Box::new(f));
    }

    pub fn has_pending_websocket_connections(&self) -> bool {
        !self.shared.websockets.borrow().pending.is_empty()
    }

    pub fn next_pending_websocket_connection(&self)
        -> Option<WebSocketConnection<TcpStream>>
    {
        self.shared.websockets.borrow_mut().pending.pop_front()
    }
}

struct RouterDispatcher {
    shared: Rc<Shared>,
}

impl Dispatcher<TcpStream> for RouterDispatcher {
    fn handle_request(&mut self, request: &Request,
                      responder: Responder<TcpStream>)
        -> Result<ResponderDone<TcpStream>, Responder<TcpStream>>
    {
        self.shared.router.borrow().handle_request(request, responder)
    }

    fn missing_handler(&mut self, request: &Request,
                       responder: Responder<TcpStream>)
        -> ResponderDone<TcpStream>
    {
        debug!("missing handler: {}", request.url().path());
        let missing = self.shared.missing.borrow();
        (&*missing)(request, responder)
    }

    fn websockets_enabled(&self) -> bool {
        self.shared.websockets.borrow().subscribed
    }

    fn handoff_websocket(&mut self,
                         connection: WebSocketConnection<TcpStream>)
    {
        let mut ws = self.shared.websockets.borrow_mut();
        ws.pending.push_back(connection);
        if let Some(ref mut notify) = ws.notify {
            notify();
        }
    }
}
