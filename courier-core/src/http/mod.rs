mod body;
use http::{Request, Response, StatusCode};

pub use body::Body;

use crate::Result;

/// Anything that turns a request into a response.
///
/// The kernel, every middleware pipeline and the controller terminal handler
/// implement this trait.
pub trait RequestHandler {
    fn handle(&self, request: Request<Body>) -> Result<Response<Body>>;
}

impl<H: RequestHandler + ?Sized> RequestHandler for &H {
    #[inline]
    fn handle(&self, request: Request<Body>) -> Result<Response<Body>> {
        (**self).handle(request)
    }
}

impl<H: RequestHandler + ?Sized> RequestHandler for Box<H> {
    #[inline]
    fn handle(&self, request: Request<Body>) -> Result<Response<Body>> {
        (**self).handle(request)
    }
}

impl<H: RequestHandler + ?Sized> RequestHandler for std::sync::Arc<H> {
    #[inline]
    fn handle(&self, request: Request<Body>) -> Result<Response<Body>> {
        (**self).handle(request)
    }
}

pub fn handler_fn<FN>(f: FN) -> HandlerFn<FN>
where
    FN: Fn(Request<Body>) -> Result<Response<Body>>,
{
    HandlerFn { f }
}

#[derive(Clone)]
pub struct HandlerFn<FN> {
    f: FN,
}

impl<FN> RequestHandler for HandlerFn<FN>
where
    FN: Fn(Request<Body>) -> Result<Response<Body>>,
{
    #[inline]
    fn handle(&self, request: Request<Body>) -> Result<Response<Body>> {
        (self.f)(request)
    }
}

/// Builds a bodiless response with the given status.
pub fn generate_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::Empty);
    *response.status_mut() = status;
    response
}
