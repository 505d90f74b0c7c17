//! Route table backed by [`matchit::Router`].
//!
//! Paths use `matchit` syntax (`/users/{id}`, `/files/{*path}`). One path may
//! be registered several times with different methods or hosts; all of them
//! share a single entry in the path tree and are told apart afterwards, which
//! is also how the allowed methods of a 405 are collected.
use std::{collections::HashMap, sync::Arc};

use courier_core::{
    config::RouteConfig,
    routing::{MiddlewareBinding, Route, RouteAction, RouteMatcher, RouteMatchingResult},
};
use http::Method;

#[derive(thiserror::Error, Debug)]
pub enum RoutingError {
    #[error("router error: {0:?}")]
    Insert(#[from] matchit::InsertError),
    #[error("invalid http method {0}")]
    InvalidMethod(String),
}

#[derive(Debug)]
struct RouteEntry {
    methods: Vec<Method>,
    host: Option<String>,
    route: Arc<Route>,
}

impl RouteEntry {
    fn serves_host(&self, host: &str) -> bool {
        self.host
            .as_deref()
            .map_or(true, |h| h.eq_ignore_ascii_case(host))
    }
}

#[derive(Debug, Default)]
pub struct MatchitRouteMatcher {
    router: matchit::Router<usize>,
    paths: HashMap<String, usize>,
    tables: Vec<Vec<RouteEntry>>,
}

impl MatchitRouteMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        methods: Vec<Method>,
        path: &str,
        host: Option<String>,
        route: Route,
    ) -> Result<(), RoutingError> {
        let index = match self.paths.get(path) {
            Some(index) => *index,
            None => {
                let index = self.tables.len();
                self.router.insert(path, index)?;
                self.paths.insert(path.to_string(), index);
                self.tables.push(Vec::new());
                index
            }
        };
        tracing::debug!(path, ?methods, ?host, "route registered");
        self.tables[index].push(RouteEntry {
            methods,
            host,
            route: Arc::new(route),
        });
        Ok(())
    }

    pub fn from_configs<'a, I>(configs: I) -> Result<Self, RoutingError>
    where
        I: IntoIterator<Item = &'a RouteConfig>,
    {
        let mut registry = RouteRegistry::new();
        registry.extend_from_configs(configs)?;
        registry.build()
    }
}

fn parse_method(method: &str) -> Result<Method, RoutingError> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| RoutingError::InvalidMethod(method.to_string()))
}

impl RouteMatcher for MatchitRouteMatcher {
    fn match_route(&self, method: &Method, host: &str, path: &str) -> RouteMatchingResult {
        let Ok(matched) = self.router.at(path) else {
            return RouteMatchingResult::not_found();
        };
        let mut entries = self.tables[*matched.value]
            .iter()
            .filter(|entry| entry.serves_host(host))
            .peekable();
        if entries.peek().is_none() {
            return RouteMatchingResult::not_found();
        }

        let mut allowed_methods = Vec::new();
        for entry in entries {
            if entry.methods.contains(method) {
                let route_variables = matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                return RouteMatchingResult::found(entry.route.clone(), route_variables);
            }
            for m in &entry.methods {
                if !allowed_methods.contains(m) {
                    allowed_methods.push(m.clone());
                }
            }
        }
        RouteMatchingResult::method_not_allowed(allowed_methods)
    }
}

/// A route being declared on a [`RouteRegistry`].
#[derive(Debug)]
pub struct RouteDefinition {
    methods: Vec<Method>,
    path: String,
    host: Option<String>,
    route: Route,
}

impl RouteDefinition {
    /// Restricts the route to one host, compared case-insensitively.
    pub fn host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = Some(host.into());
        self
    }

    /// Appends a middleware; the first one added runs outermost.
    pub fn middleware(&mut self, binding: MiddlewareBinding) -> &mut Self {
        self.route.middleware_bindings.push(binding);
        self
    }
}

/// Collects route declarations in code and builds a matcher from them.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: Vec<RouteDefinition>,
}

macro_rules! method_route {
    ($($name:ident => $method:ident,)*) => {
        $(
            pub fn $name(
                &mut self,
                path: impl Into<String>,
                action: impl Into<RouteAction>,
            ) -> &mut RouteDefinition {
                self.route([Method::$method], path, action)
            }
        )*
    };
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(
        &mut self,
        methods: impl IntoIterator<Item = Method>,
        path: impl Into<String>,
        action: impl Into<RouteAction>,
    ) -> &mut RouteDefinition {
        self.routes.push(RouteDefinition {
            methods: methods.into_iter().collect(),
            path: path.into(),
            host: None,
            route: Route::new(action.into()),
        });
        let last = self.routes.len() - 1;
        &mut self.routes[last]
    }

    method_route! {
        get => GET,
        post => POST,
        put => PUT,
        patch => PATCH,
        delete => DELETE,
    }

    /// Adds routes read from configuration.
    pub fn extend_from_configs<'a, I>(&mut self, configs: I) -> Result<(), RoutingError>
    where
        I: IntoIterator<Item = &'a RouteConfig>,
    {
        for config in configs {
            let methods = config
                .methods
                .iter()
                .map(|m| parse_method(m))
                .collect::<Result<Vec<_>, _>>()?;
            let definition = self.route(
                methods,
                &config.path,
                RouteAction::method(&config.controller, &config.action),
            );
            definition.host = config.host.clone();
            for middleware in &config.middleware {
                definition.middleware(middleware.clone().into());
            }
        }
        Ok(())
    }

    pub fn build(self) -> Result<MatchitRouteMatcher, RoutingError> {
        let mut matcher = MatchitRouteMatcher::new();
        for definition in self.routes {
            matcher.insert(
                definition.methods,
                &definition.path,
                definition.host,
                definition.route,
            )?;
        }
        Ok(matcher)
    }
}

#[cfg(test)]
mod tests {
    use courier_core::{config::Config, controller::Action};

    use super::*;

    fn registry() -> RouteRegistry {
        let mut registry = RouteRegistry::new();
        registry.get("/users", ("Users", "list"));
        registry.post("/users", ("Users", "create"));
        registry
            .get("/users/{id}", ("Users", "show"))
            .middleware(MiddlewareBinding::new("Auth"));
        registry
            .delete("/admin", Action::closure("purge", vec![], |_, _| Ok(())))
            .host("Admin.Example.com");
        registry
    }

    #[test]
    fn test_route_variables() {
        let matcher = registry().build().unwrap();
        let result = matcher.match_route(&Method::GET, "example.com", "/users/42");
        assert!(result.match_found());
        assert_eq!(result.route_variables["id"], "42");
        let route = result.route.unwrap();
        assert!(route.action.uses_method());
        assert_eq!(route.middleware_bindings[0].class_name, "Auth");
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let matcher = registry().build().unwrap();
        let result = matcher.match_route(&Method::GET, "example.com", "/missing");
        assert!(!result.match_found());
        assert_eq!(result.method_is_allowed, None);
    }

    #[test]
    fn test_allowed_methods_in_registration_order() {
        let matcher = registry().build().unwrap();
        let result = matcher.match_route(&Method::PUT, "example.com", "/users");
        assert!(!result.match_found());
        assert_eq!(result.method_is_allowed, Some(false));
        assert_eq!(result.allowed_methods, vec![Method::GET, Method::POST]);
    }

    #[test]
    fn test_host_constraint() {
        let matcher = registry().build().unwrap();
        assert!(matcher
            .match_route(&Method::DELETE, "admin.example.com", "/admin")
            .match_found());
        let result = matcher.match_route(&Method::DELETE, "example.com", "/admin");
        assert_eq!(result.method_is_allowed, None);
    }

    #[test]
    fn test_routes_from_config() {
        let config = Config::from_slice(
            br#"{"routes": [{"path": "/items/{id}", "methods": ["get", "Patch"],
                "controller": "Items", "action": "show"}]}"#,
        )
        .unwrap();
        let matcher = MatchitRouteMatcher::from_configs(&config.routes).unwrap();
        assert!(matcher
            .match_route(&Method::PATCH, "localhost", "/items/1")
            .match_found());

        let config = Config::from_slice(
            br#"{"routes": [{"path": "/", "methods": ["NOT A METHOD"],
                "controller": "Items", "action": "show"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            MatchitRouteMatcher::from_configs(&config.routes),
            Err(RoutingError::InvalidMethod(_))
        ));
    }
}
