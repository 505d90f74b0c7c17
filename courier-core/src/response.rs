//! Response factories.
//!
//! A [`ResponseFactory`] holds a status, headers and a raw body, and turns
//! them into a response once the request's response negotiation is known.
//! Structured bodies are serialized by the negotiated formatter.
use std::{fmt, io::Read};

use bytes::{Buf, BufMut, BytesMut};
use http::{
    header::{HeaderName, CONTENT_TYPE},
    HeaderMap, HeaderValue, Response, StatusCode,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    context::RequestContext,
    http::Body,
    negotiation::SerializationError,
    HttpException,
};

/// A scalar body, written as its string form.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
        }
    }
}

/// The body a factory was given, before it is turned into a [`Body`].
#[derive(Default)]
pub enum RawBody {
    #[default]
    None,
    Body(Body),
    Stream(Box<dyn Read + Send + Sync>),
    Scalar(Scalar),
    /// A structured value serialized by the negotiated formatter.
    Structured(Value),
    /// Not representable as a body; creating the response fails.
    Callable(Box<dyn Fn() -> Value + Send + Sync>),
}

impl RawBody {
    /// Serializes `value` into a structured body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, SerializationError> {
        serde_json::to_value(value)
            .map(RawBody::Structured)
            .map_err(|e| SerializationError::Format(Box::new(e)))
    }

    pub fn stream<R>(reader: R) -> Self
    where
        R: Read + Send + Sync + 'static,
    {
        RawBody::Stream(Box::new(reader))
    }

    fn kind(&self) -> &'static str {
        match self {
            RawBody::None => "none",
            RawBody::Body(_) => "body",
            RawBody::Stream(_) => "stream",
            RawBody::Scalar(_) => "scalar",
            RawBody::Structured(_) => "structured",
            RawBody::Callable(_) => "callable",
        }
    }
}

impl fmt::Debug for RawBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawBody::Body(body) => f.debug_tuple("RawBody::Body").field(body).finish(),
            RawBody::Scalar(s) => f.debug_tuple("RawBody::Scalar").field(s).finish(),
            RawBody::Structured(v) => f.debug_tuple("RawBody::Structured").field(v).finish(),
            other => write!(f, "RawBody::{}", other.kind()),
        }
    }
}

impl From<Body> for RawBody {
    fn from(body: Body) -> Self {
        RawBody::Body(body)
    }
}

impl From<Value> for RawBody {
    fn from(value: Value) -> Self {
        RawBody::Structured(value)
    }
}

impl From<String> for RawBody {
    fn from(s: String) -> Self {
        RawBody::Scalar(Scalar::String(s))
    }
}

impl From<&str> for RawBody {
    fn from(s: &str) -> Self {
        RawBody::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<i64> for RawBody {
    fn from(i: i64) -> Self {
        RawBody::Scalar(Scalar::Int(i))
    }
}

impl From<f64> for RawBody {
    fn from(x: f64) -> Self {
        RawBody::Scalar(Scalar::Float(x))
    }
}

impl From<bool> for RawBody {
    fn from(b: bool) -> Self {
        RawBody::Scalar(Scalar::Bool(b))
    }
}

#[derive(Error, Debug)]
pub enum BodyError {
    #[error("a {0} value cannot be used as a response body")]
    UnsupportedBodyType(&'static str),
    #[error("no formatter was negotiated for the response")]
    NotNegotiated,
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// A status, headers and a raw body waiting for negotiation.
#[derive(Debug)]
pub struct ResponseFactory {
    status: StatusCode,
    headers: HeaderMap,
    raw_body: RawBody,
}

macro_rules! preset {
    ($($(#[$meta:meta])* $name:ident => $status:ident,)*) => {
        $(
            $(#[$meta])*
            pub fn $name(raw_body: impl Into<RawBody>) -> Self {
                Self::new(StatusCode::$status, raw_body)
            }
        )*
    };
}

impl ResponseFactory {
    pub fn new(status: StatusCode, raw_body: impl Into<RawBody>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            raw_body: raw_body.into(),
        }
    }

    preset! {
        ok => OK,
        created => CREATED,
        accepted => ACCEPTED,
        bad_request => BAD_REQUEST,
        unauthorized => UNAUTHORIZED,
        forbidden => FORBIDDEN,
        not_found => NOT_FOUND,
        conflict => CONFLICT,
        internal_server_error => INTERNAL_SERVER_ERROR,
    }

    /// A 204 never carries a body.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, RawBody::None)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn raw_body(&self) -> &RawBody {
        &self.raw_body
    }

    /// Builds the response using the response negotiation of `context`.
    pub fn create_response(self, context: &RequestContext) -> Result<Response<Body>, HttpException> {
        let negotiation = context.response_content_negotiation_result().ok_or_else(|| {
            HttpException::new(
                StatusCode::NOT_ACCEPTABLE,
                "Response content could not be negotiated",
            )
        })?;

        let mut headers = self.headers;
        if let Some(media_type) = negotiation.media_type() {
            if !headers.contains_key(CONTENT_TYPE) {
                match HeaderValue::from_str(media_type) {
                    Ok(value) => {
                        headers.insert(CONTENT_TYPE, value);
                    }
                    Err(_) => {
                        tracing::debug!(media_type, "negotiated media type is not a header value")
                    }
                }
            }
        }

        let body = match self.raw_body {
            RawBody::None => Body::Empty,
            RawBody::Body(body) => body,
            RawBody::Stream(reader) => Body::Stream(reader),
            RawBody::Scalar(scalar) => Body::from(scalar.to_string()),
            callable @ RawBody::Callable(_) => {
                return Err(HttpException::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to create response body",
                )
                .with_cause(BodyError::UnsupportedBodyType(callable.kind())));
            }
            RawBody::Structured(value) => {
                let formatter = negotiation
                    .formatter()
                    .filter(|f| f.can_write(&value))
                    .ok_or_else(|| {
                        HttpException::new(
                            StatusCode::NOT_ACCEPTABLE,
                            "Response content could not be negotiated",
                        )
                        .with_cause(BodyError::NotNegotiated)
                    })?;
                let mut writer = BytesMut::new().writer();
                formatter.write_to_stream(&value, &mut writer).map_err(|e| {
                    tracing::warn!("response body serialization failed: {e}");
                    HttpException::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to serialize response body",
                    )
                    .with_cause(BodyError::from(e))
                })?;
                Body::from_stream(writer.into_inner().freeze().reader())
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
