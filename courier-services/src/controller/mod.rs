//! Terminal side of the pipeline: binding arguments, running the action and
//! turning what it returns into a response.
mod binding;
mod handler;
mod invoker;

pub use binding::RouteVariableError;
pub use handler::ControllerRequestHandler;
pub use invoker::DefaultRouteActionInvoker;
