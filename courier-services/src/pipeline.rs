//! Middleware pipelines.
//!
//! A [`Pipeline`] nests its middleware around a terminal handler so that the
//! first middleware is the outermost one: pre-processing runs in list order,
//! post-processing in reverse. Any middleware may answer without calling
//! `next`, in which case nothing further in the chain runs.
use courier_core::{
    http::{Body, RequestHandler},
    middleware::Middleware,
    Result,
};
use http::{Request, Response};

#[derive(Debug, Default, Clone, Copy)]
pub struct MiddlewarePipelineFactory;

impl MiddlewarePipelineFactory {
    pub fn create_pipeline<H>(&self, middleware: Vec<Box<dyn Middleware>>, handler: H) -> Pipeline<H>
    where
        H: RequestHandler,
    {
        Pipeline {
            middleware,
            handler,
        }
    }
}

pub struct Pipeline<H> {
    middleware: Vec<Box<dyn Middleware>>,
    handler: H,
}

impl<H> Pipeline<H> {
    #[inline]
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    pub fn into_handler(self) -> H {
        self.handler
    }
}

impl<H: RequestHandler> RequestHandler for Pipeline<H> {
    fn handle(&self, request: Request<Body>) -> Result<Response<Body>> {
        Next {
            middleware: &self.middleware,
            handler: &self.handler,
        }
        .handle(request)
    }
}

/// The rest of the chain as seen by one middleware.
struct Next<'a> {
    middleware: &'a [Box<dyn Middleware>],
    handler: &'a dyn RequestHandler,
}

impl RequestHandler for Next<'_> {
    fn handle(&self, request: Request<Body>) -> Result<Response<Body>> {
        match self.middleware.split_first() {
            Some((current, rest)) => current.handle(
                request,
                &Next {
                    middleware: rest,
                    handler: self.handler,
                },
            ),
            None => self.handler.handle(request),
        }
    }
}
