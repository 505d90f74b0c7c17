//! Controllers and their actions.
//!
//! A route targets either a method-based action, looked up by name on a
//! controller resolved through the dependency resolver, or a closure-based
//! action that runs against a fresh [`BaseController`]. Both kinds are an
//! [`Action`]: a descriptor listing the formal parameters, built once when
//! the action is declared, plus the callable itself. Parameter binding is a
//! pure function over that descriptor, so nothing is inspected at call time.
//!
//! Controllers are created per request and owned by that request only.
use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use http::{Request, Response};

mod action;
mod arguments;

pub use action::{
    Action, ActionDescriptor, ActionResult, ParameterDescriptor, ParameterType,
};
pub use arguments::{ArgumentTypeError, ArgumentValue, Arguments, FromArgument};

use crate::{context::RequestContext, http::Body, sealed::Sealed, AnyResult, Result};

pub trait AsAny: Sealed {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + Send> Sealed for T {}

impl<T: Any + Send> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub trait Controller: AsAny + Send {
    fn base(&self) -> &BaseController;

    fn base_mut(&mut self) -> &mut BaseController;

    /// Looks up a method-based action by name.
    fn action(&self, _method: &str) -> Option<Action> {
        None
    }
}

/// The base controller every controller embeds.
///
/// It is also the receiver of closure-based actions.
#[derive(Debug, Default)]
pub struct BaseController {
    request_context: Option<Arc<RequestContext>>,
}

impl BaseController {
    pub fn new() -> Self {
        Self::default()
    }

    /// The context of the request being handled, set before the action runs.
    #[inline]
    pub fn request_context(&self) -> Option<&RequestContext> {
        self.request_context.as_deref()
    }

    pub fn set_request_context(&mut self, context: Arc<RequestContext>) {
        self.request_context = Some(context);
    }
}

impl Controller for BaseController {
    #[inline]
    fn base(&self) -> &BaseController {
        self
    }

    #[inline]
    fn base_mut(&mut self) -> &mut BaseController {
        self
    }
}

/// Name to action lookup, typically built once per controller type.
#[derive(Debug, Clone, Default)]
pub struct ActionTable {
    actions: HashMap<String, Action>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, action: Action) -> Self {
        self.actions
            .insert(action.descriptor().name().to_string(), action);
        self
    }

    pub fn get(&self, method: &str) -> Option<Action> {
        self.actions.get(method).cloned()
    }
}

/// A controller bound to the action it is about to run.
pub struct ActionDelegate {
    controller: Box<dyn Controller>,
    action: Action,
}

impl ActionDelegate {
    pub fn new(controller: Box<dyn Controller>, action: Action) -> Self {
        Self { controller, action }
    }

    #[inline]
    pub fn descriptor(&self) -> &ActionDescriptor {
        self.action.descriptor()
    }

    #[inline]
    pub fn controller(&self) -> &dyn Controller {
        self.controller.as_ref()
    }

    #[inline]
    pub fn controller_mut(&mut self) -> &mut dyn Controller {
        self.controller.as_mut()
    }

    pub fn invoke(&mut self, arguments: Arguments) -> AnyResult<ActionResult> {
        self.action.call(self.controller.as_mut(), arguments)
    }
}

impl fmt::Debug for ActionDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDelegate")
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

/// Binds arguments, runs the action and turns its result into a response.
pub trait RouteActionInvoker: Send + Sync {
    fn invoke_route_action(
        &self,
        delegate: &mut ActionDelegate,
        request: Request<Body>,
        route_variables: &HashMap<String, String>,
    ) -> Result<Response<Body>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigurationError;

    #[derive(Default)]
    struct GreetingController {
        base: BaseController,
        greeting: String,
    }

    impl Controller for GreetingController {
        fn base(&self) -> &BaseController {
            &self.base
        }

        fn base_mut(&mut self) -> &mut BaseController {
            &mut self.base
        }

        fn action(&self, method: &str) -> Option<Action> {
            ActionTable::new()
                .with(Action::new(
                    "greet",
                    vec![ParameterDescriptor::string("name")],
                    |c: &mut GreetingController, args| {
                        let name: String = args.get("name")?;
                        Ok(serde_json::Value::String(format!("{} {name}", c.greeting)))
                    },
                ))
                .get(method)
        }
    }

    #[test]
    fn test_method_action_runs_against_controller() {
        let controller = GreetingController {
            greeting: "hello".to_string(),
            ..Default::default()
        };
        let action = controller.action("greet").unwrap();
        assert!(controller.action("missing").is_none());
        assert_eq!(action.descriptor().parameters().len(), 1);

        let mut delegate = ActionDelegate::new(Box::new(controller), action);
        let mut arguments = Arguments::default();
        arguments.push("name", ArgumentValue::from("dave"));
        match delegate.invoke(arguments).unwrap() {
            ActionResult::Value(crate::response::RawBody::Structured(v)) => {
                assert_eq!(v, "hello dave")
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_action_on_wrong_controller_type() {
        let action = GreetingController::default().action("greet").unwrap();
        let mut delegate = ActionDelegate::new(Box::new(BaseController::new()), action);
        let err = delegate.invoke(Arguments::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::ControllerTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_closure_action_sees_request_context() {
        let action = Action::closure("ping", vec![], |c: &mut BaseController, _| {
            Ok(serde_json::Value::Bool(c.request_context().is_some()))
        });
        let mut delegate = ActionDelegate::new(Box::new(BaseController::new()), action);
        let (parts, _) = Request::get("/ping").body(()).unwrap().into_parts();
        delegate
            .controller_mut()
            .base_mut()
            .set_request_context(Arc::new(RequestContext::new(&parts)));
        match delegate.invoke(Arguments::default()).unwrap() {
            ActionResult::Value(crate::response::RawBody::Structured(v)) => assert_eq!(v, true),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
