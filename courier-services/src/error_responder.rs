use courier_core::{
    http::{Body, RequestHandler},
    Result,
};
use http::{Request, Response};

/// Outermost layer: turns every error of the wrapped handler into the
/// response it stands for, so hosts always get a response back.
#[derive(Debug, Clone)]
pub struct ErrorResponder<H>(pub H);

impl<H: RequestHandler> RequestHandler for ErrorResponder<H> {
    fn handle(&self, request: Request<Body>) -> Result<Response<Body>> {
        let method = request.method().clone();
        let uri = request.uri().clone();
        match self.0.handle(request) {
            Ok(response) => Ok(response),
            Err(err) => {
                let status = err.status();
                if status.is_server_error() {
                    tracing::error!(%method, %uri, %status, "request failed: {err:#}");
                } else {
                    tracing::debug!(%method, %uri, %status, "request rejected: {err}");
                }
                Ok(err.into_response())
            }
        }
    }
}
