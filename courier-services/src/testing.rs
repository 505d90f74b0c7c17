//! Controllers and middleware shared by the tests of this crate.
use std::sync::{Arc, Mutex, OnceLock};

use courier_core::{
    controller::{
        Action, ActionTable, Arguments, BaseController, Controller, ParameterDescriptor,
    },
    http::{generate_response, Body, RequestHandler},
    middleware::{Middleware, MiddlewareAttributes},
    response::ResponseFactory,
    AnyResult, Result,
};
use http::{HeaderValue, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
}

fn text(body: impl Into<String>) -> Response<Body> {
    let mut response = generate_response(StatusCode::OK);
    *response.body_mut() = Body::from(body.into());
    response
}

#[derive(Debug, Default)]
pub struct MockController {
    base: BaseController,
}

impl MockController {
    fn int_parameter(&mut self, args: Arguments) -> AnyResult<Response<Body>> {
        Ok(text(args.get::<i64>("foo")?.to_string()))
    }

    fn float_parameter(&mut self, args: Arguments) -> AnyResult<Response<Body>> {
        Ok(text(args.get::<f64>("foo")?.to_string()))
    }

    fn bool_parameter(&mut self, args: Arguments) -> AnyResult<Response<Body>> {
        Ok(text(args.get::<bool>("foo")?.to_string()))
    }

    fn string_parameter(&mut self, args: Arguments) -> AnyResult<Response<Body>> {
        Ok(text(args.get::<String>("foo")?))
    }

    fn no_type_hint_parameter(&mut self, args: Arguments) -> AnyResult<Response<Body>> {
        Ok(text(args.get::<String>("foo")?))
    }

    fn default_value_parameter(&mut self, args: Arguments) -> AnyResult<Response<Body>> {
        Ok(text(args.get::<String>("foo")?))
    }

    fn nullable_scalar_parameter(&mut self, args: Arguments) -> AnyResult<Response<Body>> {
        let foo = args.get::<Option<i64>>("foo")?;
        Ok(text(if foo.is_none() { "null" } else { "notnull" }))
    }

    fn object_parameter(&mut self, args: Arguments) -> AnyResult<Response<Body>> {
        let user: User = args.deserialize("user")?;
        Ok(text(format!("id:{}, email:{}", user.id, user.email)))
    }

    fn nullable_object_parameter(&mut self, args: Arguments) -> AnyResult<Response<Body>> {
        let user: Option<User> = args.deserialize("user")?;
        Ok(text(if user.is_none() { "null" } else { "notnull" }))
    }

    fn popo(&mut self, _: Arguments) -> AnyResult<Value> {
        Ok(serde_json::to_value(User {
            id: 123,
            email: "foo@bar.com".to_string(),
        })?)
    }

    fn request_method(&mut self, _: Arguments) -> AnyResult<Response<Body>> {
        let method = self
            .base
            .request_context()
            .map(|c| c.method().to_string())
            .unwrap_or_default();
        Ok(text(method))
    }

    fn actions() -> &'static ActionTable {
        static ACTIONS: OnceLock<ActionTable> = OnceLock::new();
        ACTIONS.get_or_init(|| {
            ActionTable::new()
                .with(Action::new(
                    "int_parameter",
                    vec![ParameterDescriptor::int("foo")],
                    Self::int_parameter,
                ))
                .with(Action::new(
                    "float_parameter",
                    vec![ParameterDescriptor::float("foo")],
                    Self::float_parameter,
                ))
                .with(Action::new(
                    "bool_parameter",
                    vec![ParameterDescriptor::bool("foo")],
                    Self::bool_parameter,
                ))
                .with(Action::new(
                    "string_parameter",
                    vec![ParameterDescriptor::string("foo")],
                    Self::string_parameter,
                ))
                .with(Action::new(
                    "no_type_hint_parameter",
                    vec![ParameterDescriptor::mixed("foo")],
                    Self::no_type_hint_parameter,
                ))
                .with(Action::new(
                    "default_value_parameter",
                    vec![ParameterDescriptor::string("foo").with_default("bar")],
                    Self::default_value_parameter,
                ))
                .with(Action::new(
                    "nullable_scalar_parameter",
                    vec![ParameterDescriptor::int("foo").nullable()],
                    Self::nullable_scalar_parameter,
                ))
                .with(Action::new(
                    "object_parameter",
                    vec![ParameterDescriptor::object::<User>("user")],
                    Self::object_parameter,
                ))
                .with(Action::new(
                    "nullable_object_parameter",
                    vec![ParameterDescriptor::object::<User>("user").nullable()],
                    Self::nullable_object_parameter,
                ))
                .with(Action::new(
                    "unsatisfiable_parameter",
                    vec![ParameterDescriptor::int("foo")],
                    Self::int_parameter,
                ))
                .with(Action::new("no_parameters", vec![], |_: &mut Self, _| {
                    Ok(text("no_parameters"))
                }))
                .with(Action::new("popo", vec![], Self::popo))
                .with(Action::new("response_factory", vec![], |_: &mut Self, _| {
                    Ok(ResponseFactory::ok("foo"))
                }))
                .with(Action::new("returns_nothing", vec![], |_: &mut Self, _| {
                    Ok(())
                }))
                .with(Action::new("request_method", vec![], Self::request_method))
                .with(Action::new(
                    "throws_exception",
                    vec![],
                    |_: &mut Self, _| -> AnyResult<()> {
                        anyhow::bail!("Testing controller method that throws exception")
                    },
                ))
                .with(Action::new(
                    "panics",
                    vec![],
                    |_: &mut Self, _| -> AnyResult<()> { panic!("controller exploded") },
                ))
        })
    }
}

impl Controller for MockController {
    fn base(&self) -> &BaseController {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseController {
        &mut self.base
    }

    fn action(&self, method: &str) -> Option<Action> {
        Self::actions().get(method)
    }
}

pub type Log = Arc<Mutex<Vec<String>>>;

/// Records when it runs before and after the rest of the chain.
pub struct RecordingMiddleware {
    name: &'static str,
    log: Log,
}

impl RecordingMiddleware {
    pub fn new(name: &'static str, log: Log) -> Self {
        Self { name, log }
    }
}

impl Middleware for RecordingMiddleware {
    fn handle(&self, request: Request<Body>, next: &dyn RequestHandler) -> Result<Response<Body>> {
        self.log.lock().unwrap().push(format!("{}:before", self.name));
        let response = next.handle(request);
        self.log.lock().unwrap().push(format!("{}:after", self.name));
        response
    }
}

/// Answers with a fixed status without calling the rest of the chain.
pub struct ShortCircuitMiddleware {
    status: StatusCode,
}

impl ShortCircuitMiddleware {
    pub fn new(status: StatusCode) -> Self {
        Self { status }
    }
}

impl Middleware for ShortCircuitMiddleware {
    fn handle(&self, _: Request<Body>, _: &dyn RequestHandler) -> Result<Response<Body>> {
        Ok(generate_response(self.status))
    }
}

/// Copies its `header` attribute into an `x-attribute` response header.
#[derive(Default)]
pub struct AttributeMiddleware {
    attributes: MiddlewareAttributes,
}

impl Middleware for AttributeMiddleware {
    fn handle(&self, request: Request<Body>, next: &dyn RequestHandler) -> Result<Response<Body>> {
        let mut response = next.handle(request)?;
        let default = Value::from("unset");
        if let Some(value) = self
            .attributes
            .get_or("header", &default)
            .as_str()
            .and_then(|v| HeaderValue::from_str(v).ok())
        {
            response.headers_mut().insert("x-attribute", value);
        }
        Ok(response)
    }

    fn attributes_mut(&mut self) -> Option<&mut MiddlewareAttributes> {
        Some(&mut self.attributes)
    }
}
