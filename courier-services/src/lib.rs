pub mod common;
pub mod container;
pub mod controller;
pub mod error_responder;
pub mod kernel;
pub mod negotiation;
pub mod pipeline;
pub mod routing;

#[cfg(test)]
pub(crate) mod testing;

pub use container::Container;
pub use error_responder::ErrorResponder;
pub use kernel::{RouterKernel, RouterKernelFactory};
pub use negotiation::MediaTypeNegotiator;
pub use pipeline::{MiddlewarePipelineFactory, Pipeline};
pub use routing::{MatchitRouteMatcher, RouteRegistry};
