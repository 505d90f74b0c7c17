use std::{
    any::Any,
    fmt,
    num::{ParseFloatError, ParseIntError},
    str::ParseBoolError,
};

use http::{Response, StatusCode};
use thiserror::Error;

use crate::{controller::ArgumentTypeError, http::Body, negotiation::SerializationError};

pub type AnyError = anyhow::Error;
pub type AnyResult<T, E = AnyError> = std::result::Result<T, E>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure a request can end with once it entered the kernel.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] HttpException),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Resolution(#[from] DependencyResolutionError),
    #[error(transparent)]
    RequestBodyDeserialization(#[from] RequestBodyDeserializationError),
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Http(e) => e.status(),
            Error::RequestBodyDeserialization(e) => e.status(),
            Error::Configuration(_) | Error::Resolution(_) | Error::Fatal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converts the error into the response an outer error layer would send.
    pub fn into_response(self) -> Response<Body> {
        match self {
            Error::Http(e) => e.into_response(),
            other => crate::http::generate_response(other.status()),
        }
    }

    /// Maps an error raised by an action body into the taxonomy.
    ///
    /// Errors that already belong to the taxonomy pass through untouched,
    /// anything else becomes a [`FatalError`].
    pub fn from_action(err: AnyError) -> Self {
        let err = match err.downcast::<Error>() {
            Ok(e) => return e,
            Err(e) => e,
        };
        let err = match err.downcast::<HttpException>() {
            Ok(e) => return Error::Http(e),
            Err(e) => e,
        };
        let err = match err.downcast::<ConfigurationError>() {
            Ok(e) => return Error::Configuration(e),
            Err(e) => e,
        };
        let err = match err.downcast::<DependencyResolutionError>() {
            Ok(e) => return Error::Resolution(e),
            Err(e) => e,
        };
        let err = match err.downcast::<RequestBodyDeserializationError>() {
            Ok(e) => return Error::RequestBodyDeserialization(e),
            Err(e) => e,
        };
        match err.downcast::<FatalError>() {
            Ok(e) => Error::Fatal(e),
            Err(e) => Error::Fatal(FatalError::new(e)),
        }
    }
}

/// An error carrying an HTTP status, and optionally a ready-made response.
///
/// Routing failures are raised as `HttpException` so that an outer layer can
/// still intercept them; a 405 carries its response with the `Allow` header.
pub struct HttpException {
    status: StatusCode,
    message: String,
    response: Option<Response<Body>>,
    cause: Option<AnyError>,
}

impl HttpException {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            response: None,
            cause: None,
        }
    }

    pub fn with_response(response: Response<Body>, message: impl Into<String>) -> Self {
        Self {
            status: response.status(),
            message: message.into(),
            response: Some(response),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<AnyError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn response(&self) -> Option<&Response<Body>> {
        self.response.as_ref()
    }

    #[inline]
    pub fn cause(&self) -> Option<&AnyError> {
        self.cause.as_ref()
    }

    pub fn into_response(self) -> Response<Body> {
        match self.response {
            Some(response) => response,
            None => crate::http::generate_response(self.status),
        }
    }
}

impl fmt::Debug for HttpException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpException")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("has_response", &self.response.is_some())
            .field("cause", &self.cause)
            .finish()
    }
}

impl fmt::Display for HttpException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}

/// Programmer errors in how routes, controllers or middleware are wired.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("controller method {class}::{method}() does not exist")]
    MissingAction { class: String, method: String },
    #[error("controller {0} is not a controller")]
    NotAController(String),
    #[error("middleware {0} does not implement middleware")]
    NotMiddleware(String),
    #[error("failed to resolve parameter `{parameter}` of action {action}")]
    UnsatisfiableParameter { action: String, parameter: String },
    #[error("action {action} expects a controller of type {expected}")]
    ControllerTypeMismatch {
        action: String,
        expected: &'static str,
    },
    #[error("action {0} is already running")]
    ReentrantInvocation(String),
}

#[derive(Error, Debug)]
pub enum DependencyResolutionError {
    #[error("no binding registered for {0}")]
    Unbound(String),
    #[error("failed to resolve {name}: {cause:#}")]
    Failed { name: String, cause: AnyError },
}

#[derive(Error, Debug)]
pub enum RequestBodyDeserializationError {
    #[error("no formatter can read a request body of media type {}", .media_type.as_deref().unwrap_or("<none>"))]
    Unsupported { media_type: Option<String> },
    #[error("failed to read request body: {0}")]
    Io(#[from] std::io::Error),
    #[error("a request body is required for parameter `{parameter}`")]
    Missing { parameter: String },
    #[error("failed to deserialize request body into parameter `{parameter}`: {cause}")]
    Malformed {
        parameter: String,
        #[source]
        cause: SerializationError,
    },
}

impl RequestBodyDeserializationError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestBodyDeserializationError::Unsupported { .. } => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            RequestBodyDeserializationError::Io(_)
            | RequestBodyDeserializationError::Missing { .. }
            | RequestBodyDeserializationError::Malformed { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalErrorKind {
    TypeMismatch,
    Parse,
    Fatal,
}

impl fmt::Display for FatalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FatalErrorKind::TypeMismatch => "Type error",
            FatalErrorKind::Parse => "Parse error",
            FatalErrorKind::Fatal => "Fatal error",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Recoverable,
    Parse,
    Error,
}

/// Uniform shape for unexpected faults raised while an action runs.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct FatalError {
    kind: FatalErrorKind,
    message: String,
    cause: Option<AnyError>,
}

impl FatalError {
    pub fn new(cause: AnyError) -> Self {
        let kind = classify(&cause);
        Self {
            kind,
            message: format!("{cause:#}"),
            cause: Some(cause),
        }
    }

    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "action panicked".to_string()
        };
        Self {
            kind: FatalErrorKind::Fatal,
            message,
            cause: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> FatalErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn cause(&self) -> Option<&AnyError> {
        self.cause.as_ref()
    }

    pub fn severity(&self) -> Severity {
        match self.kind {
            FatalErrorKind::TypeMismatch => Severity::Recoverable,
            FatalErrorKind::Parse => Severity::Parse,
            FatalErrorKind::Fatal => Severity::Error,
        }
    }
}

fn classify(err: &AnyError) -> FatalErrorKind {
    if err.downcast_ref::<ArgumentTypeError>().is_some() {
        return FatalErrorKind::TypeMismatch;
    }
    if let Some(e) = err.downcast_ref::<serde_json::Error>() {
        return match e.classify() {
            serde_json::error::Category::Data => FatalErrorKind::TypeMismatch,
            serde_json::error::Category::Syntax | serde_json::error::Category::Eof => {
                FatalErrorKind::Parse
            }
            serde_json::error::Category::Io => FatalErrorKind::Fatal,
        };
    }
    if err.downcast_ref::<ParseIntError>().is_some()
        || err.downcast_ref::<ParseFloatError>().is_some()
        || err.downcast_ref::<ParseBoolError>().is_some()
    {
        return FatalErrorKind::Parse;
    }
    FatalErrorKind::Fatal
}

#[cfg(test)]
mod tests {
    use http::header::ALLOW;

    use super::*;
    use crate::controller::{ArgumentValue, Arguments};

    #[test]
    fn test_fatal_error_classification() {
        let parse = FatalError::new("abc".parse::<i64>().unwrap_err().into());
        assert_eq!(parse.kind(), FatalErrorKind::Parse);
        assert_eq!(parse.severity(), Severity::Parse);
        assert!(parse.to_string().starts_with("Parse error: "));

        let mut arguments = Arguments::default();
        arguments.push("id", ArgumentValue::String("42".to_string()));
        let type_error = FatalError::new(arguments.get::<i64>("id").unwrap_err());
        assert_eq!(type_error.kind(), FatalErrorKind::TypeMismatch);
        assert!(type_error.to_string().starts_with("Type error: "));

        let fatal = FatalError::new(anyhow::anyhow!("boom"));
        assert_eq!(fatal.kind(), FatalErrorKind::Fatal);
        assert_eq!(fatal.to_string(), "Fatal error: boom");
        assert!(fatal.cause().is_some());
    }

    #[test]
    fn test_fatal_error_from_panic() {
        let payload = std::panic::catch_unwind(|| panic!("controller exploded")).unwrap_err();
        let err = FatalError::from_panic(payload);
        assert_eq!(err.kind(), FatalErrorKind::Fatal);
        assert_eq!(err.message(), "controller exploded");
    }

    #[test]
    fn test_from_action_keeps_taxonomy() {
        let err = Error::from_action(HttpException::new(StatusCode::CONFLICT, "taken").into());
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = Error::from_action(
            ConfigurationError::NotAController("Foo".to_string()).into(),
        );
        assert!(matches!(err, Error::Configuration(_)));

        let err = Error::from_action(anyhow::anyhow!("unexpected"));
        assert!(matches!(err, Error::Fatal(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_http_exception_keeps_prebuilt_response() {
        let mut response = crate::http::generate_response(StatusCode::METHOD_NOT_ALLOWED);
        response
            .headers_mut()
            .insert(ALLOW, http::HeaderValue::from_static("GET"));
        let err = HttpException::with_response(response, "Method not allowed");
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = Error::from(err).into_response();
        assert_eq!(response.headers()[ALLOW], "GET");
    }

    #[test]
    fn test_request_body_error_status() {
        let unsupported = RequestBodyDeserializationError::Unsupported {
            media_type: Some("application/xml".to_string()),
        };
        assert_eq!(unsupported.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            Error::from(unsupported).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        let missing = RequestBodyDeserializationError::Missing {
            parameter: "user".to_string(),
        };
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            missing.to_string(),
            "a request body is required for parameter `user`"
        );
    }
}
