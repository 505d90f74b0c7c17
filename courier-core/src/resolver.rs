use std::{any::Any, fmt, sync::Arc};

use crate::{controller::Controller, middleware::Middleware, DependencyResolutionError};

/// A resolved instance, tagged with the role it can play.
pub enum Component {
    Controller(Box<dyn Controller>),
    Middleware(Box<dyn Middleware>),
    Other(Box<dyn Any + Send>),
}

impl Component {
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Controller(_) => "controller",
            Component::Middleware(_) => "middleware",
            Component::Other(_) => "other",
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component::{}", self.kind())
    }
}

/// Creates controllers and middleware by name.
///
/// Each call must produce a fresh instance; the kernel mutates what it gets.
pub trait DependencyResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Component, DependencyResolutionError>;
}

impl<T: DependencyResolver + ?Sized> DependencyResolver for Arc<T> {
    #[inline]
    fn resolve(&self, name: &str) -> Result<Component, DependencyResolutionError> {
        (**self).resolve(name)
    }
}
