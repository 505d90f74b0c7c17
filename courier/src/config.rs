use std::path::Path;

use courier_core::config::{Config, MiddlewareConfig, NegotiationConfig, RouteConfig};
use service_async::Param;

/// Configuration of the dispatcher host, read from a file or built from the
/// bundled demo routes.
#[derive(Debug, Clone)]
pub struct AppConfig {
    inner: Config,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let inner = Config::load(path)?;
        tracing::info!(routes = inner.routes.len(), "config loaded");
        Ok(Self { inner })
    }

    pub fn demo() -> Self {
        let route = |methods: &[&str], path: &str, action: &str| RouteConfig {
            path: path.to_string(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            host: None,
            controller: crate::demo::USERS.to_string(),
            action: action.to_string(),
            middleware: vec![MiddlewareConfig {
                name: crate::demo::HEADER.to_string(),
                attributes: [("name", "x-served-by"), ("value", "courier")]
                    .into_iter()
                    .collect(),
            }],
        };
        let mut create = route(&["POST"], "/users", "create");
        create.middleware.insert(
            0,
            MiddlewareConfig {
                name: crate::demo::API_KEY.to_string(),
                attributes: [("key", "secret")].into_iter().collect(),
            },
        );
        Self {
            inner: Config {
                negotiation: NegotiationConfig {
                    languages: vec!["en".to_string()],
                },
                routes: vec![
                    route(&["GET"], "/users", "list"),
                    create,
                    route(&["GET", "HEAD"], "/users/{id}", "show"),
                ],
            },
        }
    }
}

impl Param<Vec<RouteConfig>> for AppConfig {
    fn param(&self) -> Vec<RouteConfig> {
        self.inner.routes.clone()
    }
}

impl Param<NegotiationConfig> for AppConfig {
    fn param(&self) -> NegotiationConfig {
        self.inner.negotiation.clone()
    }
}
