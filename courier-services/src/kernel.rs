//! The router kernel: the request handler a host calls for every request.
//!
//! For each request the kernel
//!
//! 1. matches the route, raising a 404 or a 405 carrying an `Allow` header;
//! 2. creates the controller and binds the action to it;
//! 3. resolves the route's middleware afresh and hands attribute-capable
//!    middleware the attributes of their binding;
//! 4. runs the middleware pipeline around a [`ControllerRequestHandler`].
//!
//! Nothing is retried. Routing failures are returned as [`HttpException`] so
//! that an outer layer such as [`ErrorResponder`](crate::ErrorResponder) can
//! still turn them into responses.
//!
//! [`RouterKernelFactory`] builds kernels from route configuration through
//! [`MakeService`], so a host can rebuild the route table when its
//! configuration changes.
use std::{collections::HashMap, fmt, sync::Arc};

use courier_core::{
    config::{NegotiationConfig, RouteConfig},
    controller::{ActionDelegate, BaseController, RouteActionInvoker},
    http::{generate_response, Body, RequestHandler},
    middleware::Middleware,
    negotiation::ContentNegotiator,
    resolver::{Component, DependencyResolver},
    routing::{MiddlewareBinding, Route, RouteAction, RouteMatcher},
    ConfigurationError, HttpException, Result,
};
use http::{
    header::{ALLOW, HOST},
    HeaderValue, Request, Response, StatusCode,
};
use service_async::{MakeService, Param};

use crate::{
    controller::{ControllerRequestHandler, DefaultRouteActionInvoker},
    negotiation::MediaTypeNegotiator,
    pipeline::MiddlewarePipelineFactory,
    routing::{MatchitRouteMatcher, RoutingError},
};

pub struct RouterKernel<M, D> {
    matcher: M,
    resolver: D,
    negotiator: Arc<dyn ContentNegotiator>,
    pipeline_factory: MiddlewarePipelineFactory,
    invoker: Arc<dyn RouteActionInvoker>,
}

impl<M, D> RouterKernel<M, D>
where
    M: RouteMatcher,
    D: DependencyResolver,
{
    /// Uses the default action invoker, which reads bodies and negotiates
    /// responses through `negotiator`.
    pub fn new(matcher: M, resolver: D, negotiator: Arc<dyn ContentNegotiator>) -> Self {
        Self {
            matcher,
            resolver,
            invoker: Arc::new(DefaultRouteActionInvoker::new(negotiator.clone())),
            negotiator,
            pipeline_factory: MiddlewarePipelineFactory,
        }
    }

    pub fn with_invoker(mut self, invoker: Arc<dyn RouteActionInvoker>) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn with_pipeline_factory(mut self, pipeline_factory: MiddlewarePipelineFactory) -> Self {
        self.pipeline_factory = pipeline_factory;
        self
    }

    #[inline]
    pub fn negotiator(&self) -> &Arc<dyn ContentNegotiator> {
        &self.negotiator
    }

    /// The matched route and its route variables.
    fn match_route(
        &self,
        request: &Request<Body>,
    ) -> Result<(Arc<Route>, HashMap<String, String>)> {
        let host = request_host(request);
        let result = self
            .matcher
            .match_route(request.method(), host, request.uri().path());
        if let Some(route) = result.route {
            return Ok((route, result.route_variables));
        }

        if result.method_is_allowed.is_none() {
            tracing::debug!(method = %request.method(), uri = %request.uri(), "no route found");
            return Err(HttpException::new(
                StatusCode::NOT_FOUND,
                format!("No route found for {}", request.uri()),
            )
            .into());
        }

        let allow = result
            .allowed_methods
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        tracing::debug!(method = %request.method(), uri = %request.uri(), %allow, "method not allowed");
        let mut response = generate_response(StatusCode::METHOD_NOT_ALLOWED);
        if let Ok(value) = HeaderValue::from_str(&allow) {
            response.headers_mut().insert(ALLOW, value);
        }
        Err(HttpException::with_response(response, "Method not allowed").into())
    }

    fn create_controller(&self, action: &RouteAction) -> Result<ActionDelegate> {
        match action {
            RouteAction::Method {
                class_name,
                method_name,
            } => {
                let controller = match self.resolver.resolve(class_name)? {
                    Component::Controller(controller) => controller,
                    other => {
                        tracing::error!("{class_name} resolved to a {} component", other.kind());
                        return Err(ConfigurationError::NotAController(class_name.clone()).into());
                    }
                };
                let action = controller.action(method_name).ok_or_else(|| {
                    ConfigurationError::MissingAction {
                        class: class_name.clone(),
                        method: method_name.clone(),
                    }
                })?;
                Ok(ActionDelegate::new(controller, action))
            }
            RouteAction::Closure(action) => Ok(ActionDelegate::new(
                Box::new(BaseController::new()),
                action.clone(),
            )),
        }
    }

    fn create_middleware(&self, bindings: &[MiddlewareBinding]) -> Result<Vec<Box<dyn Middleware>>> {
        bindings
            .iter()
            .map(|binding| -> Result<Box<dyn Middleware>> {
                let mut middleware = match self.resolver.resolve(&binding.class_name)? {
                    Component::Middleware(middleware) => middleware,
                    other => {
                        tracing::error!(
                            "{} resolved to a {} component",
                            binding.class_name,
                            other.kind()
                        );
                        return Err(
                            ConfigurationError::NotMiddleware(binding.class_name.clone()).into()
                        );
                    }
                };
                if let Some(attributes) = middleware.attributes_mut() {
                    *attributes = binding.attributes.clone();
                }
                Ok(middleware)
            })
            .collect()
    }
}

impl<M, D> RequestHandler for RouterKernel<M, D>
where
    M: RouteMatcher,
    D: DependencyResolver,
{
    fn handle(&self, request: Request<Body>) -> Result<Response<Body>> {
        let (route, route_variables) = self.match_route(&request)?;
        let delegate = self.create_controller(&route.action)?;
        let middleware = self.create_middleware(&route.middleware_bindings)?;
        let handler = ControllerRequestHandler::new(delegate, route_variables, self.invoker.clone());
        self.pipeline_factory
            .create_pipeline(middleware, handler)
            .handle(request)
    }
}

impl<M: fmt::Debug, D> fmt::Debug for RouterKernel<M, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterKernel")
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

/// The host the request was sent to, from the URI or the `Host` header,
/// without its port.
fn request_host(request: &Request<Body>) -> &str {
    if let Some(host) = request.uri().host() {
        return host;
    }
    let Some(host) = request.headers().get(HOST).and_then(|h| h.to_str().ok()) else {
        return "";
    };
    if host.starts_with('[') {
        // [::1]:8080
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

/// Builds a [`RouterKernel`] over a [`MatchitRouteMatcher`] from route
/// configuration.
pub struct RouterKernelFactory<D> {
    routes: Vec<RouteConfig>,
    negotiation: NegotiationConfig,
    resolver: Arc<D>,
}

impl<D> RouterKernelFactory<D> {
    pub fn new<C>(config: &C, resolver: Arc<D>) -> Self
    where
        C: Param<Vec<RouteConfig>> + Param<NegotiationConfig>,
    {
        Self {
            routes: <C as Param<Vec<RouteConfig>>>::param(config),
            negotiation: <C as Param<NegotiationConfig>>::param(config),
            resolver,
        }
    }
}

impl<D: DependencyResolver> MakeService for RouterKernelFactory<D> {
    type Service = RouterKernel<MatchitRouteMatcher, Arc<D>>;
    type Error = RoutingError;

    fn make_via_ref(&self, _old: Option<&Self::Service>) -> Result<Self::Service, Self::Error> {
        let matcher = MatchitRouteMatcher::from_configs(&self.routes)?;
        let negotiator = Arc::new(MediaTypeNegotiator::from_config(&self.negotiation));
        tracing::info!(routes = self.routes.len(), "router kernel built");
        Ok(RouterKernel::new(matcher, self.resolver.clone(), negotiator))
    }
}
