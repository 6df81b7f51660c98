//! The signature adapter: binds handler callables of every supported
//! shape to the router.
//!
//! A handler takes zero or more typed path parameters, optionally
//! followed by one special last argument. The shape decides how the
//! response is emitted:
//!
//! * plain parameters only: the return value converts into a
//!   [`Response`](../struct.Response.html) and is written out;
//! * trailing `&Request`: same, with the request readable;
//! * trailing `Responder`: the handler owns response emission and
//!   returns the responder's completion.
//!
//! The special argument can only be last, the request only borrowed and
//! the responder only moved; any other shape simply fails to satisfy
//! the trait bounds, which is this library's version of the original's
//! compile-time shape validation.

use captures::{PathArgs, PathCapture};
use request::Request;
use responder::{Responder, ResponderDone};
use response::Response;

/// Shape marker: no special last argument.
pub struct Direct;
/// Shape marker: the last argument borrows the request.
pub struct TakesRequest;
/// Shape marker: the last argument takes the responder over.
pub struct TakesResponder;

/// A routable handler callable.
///
/// `Kind` is inferred from the callable's signature; user code never
/// names it.
pub trait View<S, Kind>: 'static {
    type Args: PathArgs;
    fn call(&self, args: Self::Args, request: &Request,
            responder: Responder<S>) -> ResponderDone<S>;
}

macro_rules! view_impls {
    ($(($ty:ident, $var:ident)),*) => {
        impl<S, F, R $(, $ty)*> View<S, (Direct, ($($ty,)*))> for F
            where F: Fn($($ty),*) -> R + 'static,
                  R: Into<Response>,
                  $($ty: PathCapture,)*
        {
            type Args = ($($ty,)*);
            #[allow(unused_variables)]
            fn call(&self, args: Self::Args, request: &Request,
                    responder: Responder<S>) -> ResponderDone<S>
            {
                let ($($var,)*) = args;
                responder.respond((self)($($var),*).into())
            }
        }

        impl<S, F, R $(, $ty)*> View<S, (TakesRequest, ($($ty,)*))> for F
            where F: Fn($($ty,)* &Request) -> R + 'static,
                  R: Into<Response>,
                  $($ty: PathCapture,)*
        {
            type Args = ($($ty,)*);
            fn call(&self, args: Self::Args, request: &Request,
                    responder: Responder<S>) -> ResponderDone<S>
            {
                let ($($var,)*) = args;
                responder.respond((self)($($var,)* request).into())
            }
        }

        impl<S, F $(, $ty)*> View<S, (TakesResponder, ($($ty,)*))> for F
            where F: Fn($($ty,)* Responder<S>) -> ResponderDone<S> + 'static,
                  S: 'static,
                  $($ty: PathCapture,)*
        {
            type Args = ($($ty,)*);
            #[allow(unused_variables)]
            fn call(&self, args: Self::Args, request: &Request,
                    responder: Responder<S>) -> ResponderDone<S>
            {
                let ($($var,)*) = args;
                (self)($($var,)* responder)
            }
        }
    }
}

view_impls!();
view_impls!((A, a));
view_impls!((A, a), (B, b));
view_impls!((A, a), (B, b), (C, c));
view_impls!((A, a), (B, b), (C, c), (D, d));
view_impls!((A, a), (B, b), (C, c), (D, d), (E, e));
