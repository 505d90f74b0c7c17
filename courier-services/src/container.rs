use std::{any::Any, collections::HashMap, fmt};

use courier_core::{
    controller::Controller,
    middleware::Middleware,
    resolver::{Component, DependencyResolver},
    AnyResult, DependencyResolutionError,
};

type Factory = Box<dyn Fn() -> AnyResult<Component> + Send + Sync>;

/// Name to factory bindings.
///
/// Every `resolve` runs the factory again, so controllers and middleware are
/// never shared between requests.
#[derive(Default)]
pub struct Container {
    bindings: HashMap<String, Factory>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a fallible factory. A later binding under the same name wins.
    pub fn bind_factory<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> AnyResult<Component> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.bindings.insert(name.clone(), Box::new(factory)).is_some() {
            tracing::debug!("container binding {name} replaced");
        }
        self
    }

    pub fn bind_controller<C, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.bind_factory(name, move || Ok(Component::Controller(Box::new(factory()))))
    }

    pub fn bind_middleware<M, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        M: Middleware + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.bind_factory(name, move || Ok(Component::Middleware(Box::new(factory()))))
    }

    /// Binds a component that is neither a controller nor a middleware.
    pub fn bind_component<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: Any + Send,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.bind_factory(name, move || Ok(Component::Other(Box::new(factory()))))
    }

    #[inline]
    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

impl DependencyResolver for Container {
    fn resolve(&self, name: &str) -> Result<Component, DependencyResolutionError> {
        let factory = self
            .bindings
            .get(name)
            .ok_or_else(|| DependencyResolutionError::Unbound(name.to_string()))?;
        factory().map_err(|cause| DependencyResolutionError::Failed {
            name: name.to_string(),
            cause,
        })
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}
