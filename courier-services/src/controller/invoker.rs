use std::{collections::HashMap, sync::Arc};

use courier_core::{
    context::RequestContext,
    controller::{ActionDelegate, ActionResult, RouteActionInvoker},
    http::{generate_response, Body},
    negotiation::ContentNegotiator,
    response::{RawBody, ResponseFactory},
    Error, Result,
};
use http::{Request, Response, StatusCode};
use serde_json::Value;

use super::binding::{bind_arguments, RequestBody};
use crate::common::catch_panic;

pub struct DefaultRouteActionInvoker {
    negotiator: Arc<dyn ContentNegotiator>,
}

impl DefaultRouteActionInvoker {
    pub fn new(negotiator: Arc<dyn ContentNegotiator>) -> Self {
        Self { negotiator }
    }
}

impl RouteActionInvoker for DefaultRouteActionInvoker {
    fn invoke_route_action(
        &self,
        delegate: &mut ActionDelegate,
        request: Request<Body>,
        route_variables: &HashMap<String, String>,
    ) -> Result<Response<Body>> {
        let (parts, body) = request.into_parts();
        let mut context = RequestContext::new(&parts);
        context.set_request_content_negotiation_result(
            self.negotiator.negotiate_request_content(&parts),
        );
        context.set_response_content_negotiation_result(
            self.negotiator.negotiate_response_content(&parts),
        );
        let context = Arc::new(context);
        delegate
            .controller_mut()
            .base_mut()
            .set_request_context(context.clone());

        let arguments = bind_arguments(
            delegate.descriptor(),
            route_variables,
            &mut RequestBody::new(body),
            &context,
        )?;
        tracing::debug!(
            action = delegate.descriptor().name(),
            arguments = arguments.len(),
            "invoking action"
        );
        let result = catch_panic(|| delegate.invoke(arguments)).map_err(Error::from_action)?;

        // a formatter that cannot write the returned value gives way to the
        // next acceptable one
        if let Some(value) = structured_value(&result) {
            let writable = context
                .response_content_negotiation_result()
                .and_then(|r| r.formatter())
                .is_some_and(|f| f.can_write(value));
            if !writable {
                let mut renegotiated = RequestContext::clone(&context);
                renegotiated.set_response_content_negotiation_result(
                    self.negotiator.negotiate_response_content_for(&parts, value),
                );
                tracing::debug!(
                    media_type = ?renegotiated
                        .response_content_negotiation_result()
                        .and_then(|r| r.media_type()),
                    "response content renegotiated for a structured value"
                );
                return into_response(result, &renegotiated);
            }
        }
        into_response(result, &context)
    }
}

fn structured_value(result: &ActionResult) -> Option<&Value> {
    let raw_body = match result {
        ActionResult::Value(raw_body) => raw_body,
        ActionResult::Factory(factory) => factory.raw_body(),
        ActionResult::Empty | ActionResult::Response(_) => return None,
    };
    match raw_body {
        RawBody::Structured(value) => Some(value),
        _ => None,
    }
}

fn into_response(result: ActionResult, context: &RequestContext) -> Result<Response<Body>> {
    match result {
        ActionResult::Empty => Ok(generate_response(StatusCode::OK)),
        ActionResult::Response(response) => Ok(response),
        ActionResult::Factory(factory) => Ok(factory.create_response(context)?),
        ActionResult::Value(raw_body) => Ok(ResponseFactory::ok(raw_body).create_response(context)?),
    }
}
