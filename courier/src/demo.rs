//! A small user directory served when no configuration file is given.
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::anyhow;
use courier_core::{
    controller::{Action, ActionTable, Arguments, BaseController, Controller, ParameterDescriptor},
    http::{generate_response, Body, RequestHandler},
    middleware::{Middleware, MiddlewareAttributes},
    response::ResponseFactory,
    AnyResult, HttpException, Result,
};
use courier_services::Container;
use http::{HeaderName, HeaderValue, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

pub const USERS: &str = "Users";
pub const HEADER: &str = "Header";
pub const API_KEY: &str = "ApiKey";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub email: String,
}

type Store = Arc<Mutex<Vec<User>>>;

#[derive(Debug)]
pub struct UserController {
    base: BaseController,
    store: Store,
}

impl UserController {
    fn list(&mut self, _: Arguments) -> AnyResult<ResponseFactory> {
        let users = self.lock()?.clone();
        Ok(ResponseFactory::ok(serde_json::to_value(users)?))
    }

    fn show(&mut self, args: Arguments) -> AnyResult<ResponseFactory> {
        let id: i64 = args.get("id")?;
        let user = self.lock()?.iter().find(|u| u.id == id).cloned();
        match user {
            Some(user) => Ok(ResponseFactory::ok(serde_json::to_value(user)?)),
            None => Err(HttpException::new(StatusCode::NOT_FOUND, format!("No user {id}")).into()),
        }
    }

    fn create(&mut self, args: Arguments) -> AnyResult<ResponseFactory> {
        let mut user: User = args.deserialize("user")?;
        let mut users = self.lock()?;
        user.id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        users.push(user.clone());
        tracing::info!(id = user.id, "user created");
        Ok(ResponseFactory::created(serde_json::to_value(user)?))
    }

    fn lock(&self) -> AnyResult<std::sync::MutexGuard<'_, Vec<User>>> {
        self.store.lock().map_err(|_| anyhow!("user store poisoned"))
    }

    fn actions() -> &'static ActionTable {
        static ACTIONS: OnceLock<ActionTable> = OnceLock::new();
        ACTIONS.get_or_init(|| {
            ActionTable::new()
                .with(Action::new("list", vec![], Self::list))
                .with(Action::new(
                    "show",
                    vec![ParameterDescriptor::int("id")],
                    Self::show,
                ))
                .with(Action::new(
                    "create",
                    vec![ParameterDescriptor::object::<User>("user")],
                    Self::create,
                ))
        })
    }
}

impl Controller for UserController {
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

/// Sets the response header named by the `name` attribute to `value`.
#[derive(Default)]
pub struct HeaderMiddleware {
    attributes: MiddlewareAttributes,
}

impl Middleware for HeaderMiddleware {
    fn handle(&self, request: Request<Body>, next: &dyn RequestHandler) -> Result<Response<Body>> {
        let mut response = next.handle(request)?;
        let name = self.attributes.get_str("name");
        let value = self.attributes.get_str("value").unwrap_or_default();
        if let (Some(name), Ok(value)) = (
            name.and_then(|n| HeaderName::from_bytes(n.as_bytes()).ok()),
            HeaderValue::from_str(value),
        ) {
            response.headers_mut().insert(name, value);
        }
        Ok(response)
    }

    fn attributes_mut(&mut self) -> Option<&mut MiddlewareAttributes> {
        Some(&mut self.attributes)
    }
}

/// Rejects requests whose `x-api-key` header differs from the `key` attribute.
#[derive(Default)]
pub struct ApiKeyMiddleware {
    attributes: MiddlewareAttributes,
}

impl Middleware for ApiKeyMiddleware {
    fn handle(&self, request: Request<Body>, next: &dyn RequestHandler) -> Result<Response<Body>> {
        let expected = self.attributes.get_str("key");
        let given = request
            .headers()
            .get("x-api-key")
            .and_then(|v| v.to_str().ok());
        if expected.is_some() && expected != given {
            tracing::debug!("api key rejected");
            return Ok(generate_response(StatusCode::UNAUTHORIZED));
        }
        next.handle(request)
    }

    fn attributes_mut(&mut self) -> Option<&mut MiddlewareAttributes> {
        Some(&mut self.attributes)
    }
}

pub fn container() -> Container {
    let store: Store = Arc::new(Mutex::new(vec![User {
        id: 1,
        name: "Dave".to_string(),
        email: "dave@example.com".to_string(),
    }]));
    let mut container = Container::new();
    container
        .bind_controller(USERS, move || UserController {
            base: BaseController::new(),
            store: store.clone(),
        })
        .bind_middleware(HEADER, HeaderMiddleware::default)
        .bind_middleware(API_KEY, ApiKeyMiddleware::default);
    container
}
