use std::{any::type_name, fmt, sync::Arc};

use http::Response;
use serde_json::Value;

use super::{ArgumentValue, Arguments, BaseController, Controller};
use crate::{
    http::Body,
    response::{RawBody, ResponseFactory},
    AnyResult, ConfigurationError,
};

/// Declared type of an action parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterType {
    Int,
    Float,
    Bool,
    String,
    /// No declared type; route variables bind as strings.
    Mixed,
    /// A structured type read from the request body, named for diagnostics.
    Object(&'static str),
}

impl ParameterType {
    /// Whether a route variable of the same name can feed this parameter.
    pub fn accepts_route_variable(&self) -> bool {
        !matches!(self, ParameterType::Object(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, ParameterType::Object(_))
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::Int => f.write_str("int"),
            ParameterType::Float => f.write_str("float"),
            ParameterType::Bool => f.write_str("bool"),
            ParameterType::String => f.write_str("string"),
            ParameterType::Mixed => f.write_str("mixed"),
            ParameterType::Object(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    name: String,
    ty: ParameterType,
    nullable: bool,
    default: Option<ArgumentValue>,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, ty: ParameterType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            default: None,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Bool)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::String)
    }

    pub fn mixed(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Mixed)
    }

    pub fn object<T>(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Object(type_name::<T>()))
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<ArgumentValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> &ParameterType {
        &self.ty
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[inline]
    pub fn default_value(&self) -> Option<&ArgumentValue> {
        self.default.as_ref()
    }
}

/// Name and formal parameters of an action, built once at registration.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDescriptor {
    name: String,
    parameters: Vec<ParameterDescriptor>,
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>, parameters: Vec<ParameterDescriptor>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }
}

/// What an action returned, before it becomes a response.
pub enum ActionResult {
    /// Nothing was returned.
    Empty,
    Response(Response<Body>),
    Factory(ResponseFactory),
    Value(RawBody),
}

impl fmt::Debug for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionResult::Empty => f.write_str("ActionResult::Empty"),
            ActionResult::Response(r) => f.debug_tuple("ActionResult::Response").field(r).finish(),
            ActionResult::Factory(r) => f.debug_tuple("ActionResult::Factory").field(r).finish(),
            ActionResult::Value(r) => f.debug_tuple("ActionResult::Value").field(r).finish(),
        }
    }
}

impl From<()> for ActionResult {
    fn from(_: ()) -> Self {
        ActionResult::Empty
    }
}

impl From<Response<Body>> for ActionResult {
    fn from(response: Response<Body>) -> Self {
        ActionResult::Response(response)
    }
}

impl From<ResponseFactory> for ActionResult {
    fn from(factory: ResponseFactory) -> Self {
        ActionResult::Factory(factory)
    }
}

impl From<RawBody> for ActionResult {
    fn from(body: RawBody) -> Self {
        ActionResult::Value(body)
    }
}

impl From<Value> for ActionResult {
    fn from(value: Value) -> Self {
        ActionResult::Value(RawBody::Structured(value))
    }
}

type ActionFn = dyn Fn(&mut dyn Controller, Arguments) -> AnyResult<ActionResult> + Send + Sync;

/// A callable action together with its descriptor.
///
/// Method actions are looked up on a resolved controller; closure actions run
/// against a fresh [`BaseController`].
#[derive(Clone)]
pub struct Action {
    descriptor: Arc<ActionDescriptor>,
    handler: Arc<ActionFn>,
}

impl Action {
    pub fn new<C, F, R>(name: impl Into<String>, parameters: Vec<ParameterDescriptor>, f: F) -> Self
    where
        C: Controller + 'static,
        F: Fn(&mut C, Arguments) -> AnyResult<R> + Send + Sync + 'static,
        R: Into<ActionResult>,
    {
        let descriptor = Arc::new(ActionDescriptor::new(name, parameters));
        let action = descriptor.name().to_string();
        let handler = move |controller: &mut dyn Controller,
                            arguments: Arguments|
              -> AnyResult<ActionResult> {
            let controller = controller.as_any_mut().downcast_mut::<C>().ok_or_else(|| {
                ConfigurationError::ControllerTypeMismatch {
                    action: action.clone(),
                    expected: type_name::<C>(),
                }
            })?;
            f(controller, arguments).map(Into::into)
        };
        Self {
            descriptor,
            handler: Arc::new(handler),
        }
    }

    pub fn closure<F, R>(name: impl Into<String>, parameters: Vec<ParameterDescriptor>, f: F) -> Self
    where
        F: Fn(&mut BaseController, Arguments) -> AnyResult<R> + Send + Sync + 'static,
        R: Into<ActionResult>,
    {
        Self::new(name, parameters, f)
    }

    #[inline]
    pub fn descriptor(&self) -> &ActionDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn call(
        &self,
        controller: &mut dyn Controller,
        arguments: Arguments,
    ) -> AnyResult<ActionResult> {
        (self.handler)(controller, arguments)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
