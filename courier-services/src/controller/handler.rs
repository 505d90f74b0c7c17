use std::{cell::RefCell, collections::HashMap, sync::Arc};

use courier_core::{
    controller::{ActionDelegate, RouteActionInvoker},
    http::{Body, RequestHandler},
    ConfigurationError, Result,
};
use http::{Request, Response};

/// Innermost handler of a route's pipeline.
pub struct ControllerRequestHandler {
    action: String,
    delegate: RefCell<ActionDelegate>,
    route_variables: HashMap<String, String>,
    invoker: Arc<dyn RouteActionInvoker>,
}

impl ControllerRequestHandler {
    pub fn new(
        delegate: ActionDelegate,
        route_variables: HashMap<String, String>,
        invoker: Arc<dyn RouteActionInvoker>,
    ) -> Self {
        Self {
            action: delegate.descriptor().name().to_string(),
            delegate: RefCell::new(delegate),
            route_variables,
            invoker,
        }
    }
}

impl RequestHandler for ControllerRequestHandler {
    fn handle(&self, request: Request<Body>) -> Result<Response<Body>> {
        // the controller cannot be lent twice when a middleware re-enters `next`
        let mut delegate = self
            .delegate
            .try_borrow_mut()
            .map_err(|_| ConfigurationError::ReentrantInvocation(self.action.clone()))?;
        self.invoker
            .invoke_route_action(&mut delegate, request, &self.route_variables)
    }
}
