mod error;
pub use error::{
    AnyError, AnyResult, ConfigurationError, DependencyResolutionError, Error, FatalError,
    FatalErrorKind, HttpException, RequestBodyDeserializationError, Result, Severity,
};

pub mod config;
pub mod context;
pub mod controller;
pub mod http;
pub mod middleware;
pub mod negotiation;
pub mod resolver;
pub mod response;
pub mod routing;

pub(crate) mod sealed {
    pub trait Sealed {}
}
