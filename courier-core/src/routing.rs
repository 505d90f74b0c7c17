use std::{collections::HashMap, sync::Arc};

use http::Method;

use crate::{controller::Action, middleware::MiddlewareAttributes};

/// What a route runs once it matched.
#[derive(Debug, Clone)]
pub enum RouteAction {
    /// A named method on a controller resolved by class name.
    Method {
        class_name: String,
        method_name: String,
    },
    /// An action that runs against a fresh base controller.
    Closure(Action),
}

impl RouteAction {
    pub fn method(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        RouteAction::Method {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }

    pub fn closure(action: Action) -> Self {
        RouteAction::Closure(action)
    }

    #[inline]
    pub fn uses_method(&self) -> bool {
        matches!(self, RouteAction::Method { .. })
    }
}

impl From<Action> for RouteAction {
    fn from(action: Action) -> Self {
        RouteAction::Closure(action)
    }
}

impl<C: Into<String>, M: Into<String>> From<(C, M)> for RouteAction {
    fn from((class_name, method_name): (C, M)) -> Self {
        RouteAction::method(class_name, method_name)
    }
}

/// A middleware class bound to a route, with the attributes it receives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiddlewareBinding {
    pub class_name: String,
    pub attributes: MiddlewareAttributes,
}

impl MiddlewareBinding {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            attributes: MiddlewareAttributes::default(),
        }
    }

    pub fn with_attributes(mut self, attributes: MiddlewareAttributes) -> Self {
        self.attributes = attributes;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub action: RouteAction,
    /// Ordered outermost first.
    pub middleware_bindings: Vec<MiddlewareBinding>,
}

impl Route {
    pub fn new(action: RouteAction) -> Self {
        Self {
            action,
            middleware_bindings: Vec::new(),
        }
    }

    pub fn with_middleware(mut self, binding: MiddlewareBinding) -> Self {
        self.middleware_bindings.push(binding);
        self
    }
}

/// Outcome of matching a request against the route table.
///
/// `method_is_allowed` is `None` when the path did not match at all, and
/// `Some(false)` when it matched under other methods only; those methods
/// are listed in `allowed_methods`.
#[derive(Debug, Clone, Default)]
pub struct RouteMatchingResult {
    pub route: Option<Arc<Route>>,
    pub route_variables: HashMap<String, String>,
    pub method_is_allowed: Option<bool>,
    pub allowed_methods: Vec<Method>,
}

impl RouteMatchingResult {
    pub fn found(route: Arc<Route>, route_variables: HashMap<String, String>) -> Self {
        Self {
            route: Some(route),
            route_variables,
            method_is_allowed: Some(true),
            allowed_methods: Vec::new(),
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn method_not_allowed(allowed_methods: Vec<Method>) -> Self {
        Self {
            method_is_allowed: Some(false),
            allowed_methods,
            ..Self::default()
        }
    }

    #[inline]
    pub fn match_found(&self) -> bool {
        self.route.is_some()
    }
}

pub trait RouteMatcher: Send + Sync {
    fn match_route(&self, method: &Method, host: &str, path: &str) -> RouteMatchingResult;
}

impl<T: RouteMatcher + ?Sized> RouteMatcher for Arc<T> {
    #[inline]
    fn match_route(&self, method: &Method, host: &str, path: &str) -> RouteMatchingResult {
        (**self).match_route(method, host, path)
    }
}
