use std::collections::HashMap;

use bytes::Buf;
use courier_core::{
    context::RequestContext,
    controller::{ActionDescriptor, ArgumentValue, Arguments, ParameterDescriptor, ParameterType},
    http::Body,
    ConfigurationError, Error, HttpException, RequestBodyDeserializationError, Result,
};
use http::StatusCode;
use serde_json::Value;

#[derive(thiserror::Error, Debug)]
#[error("route variable `{name}` = {value:?} is not a valid {expected}")]
pub struct RouteVariableError {
    pub name: String,
    pub value: String,
    pub expected: ParameterType,
}

/// The request body, read and deserialized at most once.
pub(crate) struct RequestBody {
    raw: Option<Body>,
    parsed: Option<Option<Value>>,
}

impl RequestBody {
    pub(crate) fn new(body: Body) -> Self {
        Self {
            raw: Some(body),
            parsed: None,
        }
    }

    /// `None` for an empty body or a body holding only `null`.
    fn value(
        &mut self,
        parameter: &str,
        context: &RequestContext,
    ) -> Result<Option<Value>, RequestBodyDeserializationError> {
        if self.parsed.is_none() {
            let raw = self.raw.take().unwrap_or_default();
            self.parsed = Some(read_body(raw, parameter, context)?);
        }
        Ok(self.parsed.clone().flatten())
    }
}

fn read_body(
    body: Body,
    parameter: &str,
    context: &RequestContext,
) -> Result<Option<Value>, RequestBodyDeserializationError> {
    let bytes = body.into_bytes()?;
    if bytes.is_empty() {
        return Ok(None);
    }
    let negotiation = context.request_content_negotiation_result();
    let formatter = negotiation.and_then(|r| r.formatter()).ok_or_else(|| {
        RequestBodyDeserializationError::Unsupported {
            media_type: negotiation.and_then(|r| r.media_type()).map(str::to_string),
        }
    })?;
    let value = formatter
        .read_from_stream(&mut bytes.reader())
        .map_err(|cause| RequestBodyDeserializationError::Malformed {
            parameter: parameter.to_string(),
            cause,
        })?;
    Ok(Some(value).filter(|v| !v.is_null()))
}

/// Binds every parameter of `descriptor`, in declaration order.
///
/// Sources are tried in turn: a route variable of the same name, the request
/// body for structured parameters, null for nullable parameters, then the
/// declared default. A parameter none of them can satisfy is a configuration
/// error.
pub(crate) fn bind_arguments(
    descriptor: &ActionDescriptor,
    route_variables: &HashMap<String, String>,
    body: &mut RequestBody,
    context: &RequestContext,
) -> Result<Arguments> {
    let mut arguments = Arguments::default();
    for parameter in descriptor.parameters() {
        let value = bind_parameter(descriptor, parameter, route_variables, body, context)?;
        arguments.push(parameter.name(), value);
    }
    Ok(arguments)
}

fn bind_parameter(
    descriptor: &ActionDescriptor,
    parameter: &ParameterDescriptor,
    route_variables: &HashMap<String, String>,
    body: &mut RequestBody,
    context: &RequestContext,
) -> Result<ArgumentValue> {
    if parameter.ty().accepts_route_variable() {
        if let Some(raw) = route_variables.get(parameter.name()) {
            return convert_route_variable(parameter, raw).map_err(|e| {
                Error::from(
                    HttpException::new(
                        StatusCode::BAD_REQUEST,
                        format!("Invalid value for parameter {}", parameter.name()),
                    )
                    .with_cause(e),
                )
            });
        }
    }
    if parameter.ty().is_object() {
        if let Some(value) = body.value(parameter.name(), context)? {
            return Ok(ArgumentValue::Object(value));
        }
        if !parameter.is_nullable() && parameter.default_value().is_none() {
            return Err(missing_body(parameter, context).into());
        }
    }
    if parameter.is_nullable() {
        return Ok(ArgumentValue::Null);
    }
    if let Some(default) = parameter.default_value() {
        return Ok(default.clone());
    }
    Err(ConfigurationError::UnsatisfiableParameter {
        action: descriptor.name().to_string(),
        parameter: parameter.name().to_string(),
    }
    .into())
}

/// 415 unless the request declared a readable media type, 400 otherwise.
fn missing_body(
    parameter: &ParameterDescriptor,
    context: &RequestContext,
) -> RequestBodyDeserializationError {
    let negotiation = context.request_content_negotiation_result();
    if negotiation.and_then(|r| r.formatter()).is_some() {
        RequestBodyDeserializationError::Missing {
            parameter: parameter.name().to_string(),
        }
    } else {
        RequestBodyDeserializationError::Unsupported {
            media_type: negotiation.and_then(|r| r.media_type()).map(str::to_string),
        }
    }
}

fn convert_route_variable(
    parameter: &ParameterDescriptor,
    raw: &str,
) -> std::result::Result<ArgumentValue, RouteVariableError> {
    let invalid = || RouteVariableError {
        name: parameter.name().to_string(),
        value: raw.to_string(),
        expected: parameter.ty().clone(),
    };
    let value = raw.trim();
    match parameter.ty() {
        ParameterType::Int => value.parse().map(ArgumentValue::Int).map_err(|_| invalid()),
        ParameterType::Float => value
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(ArgumentValue::Float)
            .ok_or_else(invalid),
        ParameterType::Bool => parse_bool(value).map(ArgumentValue::Bool).ok_or_else(invalid),
        ParameterType::String | ParameterType::Mixed => Ok(ArgumentValue::String(raw.to_string())),
        ParameterType::Object(_) => Err(invalid()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    const TRUE: [&str; 4] = ["true", "1", "yes", "on"];
    const FALSE: [&str; 4] = ["false", "0", "no", "off"];
    if TRUE.iter().any(|t| t.eq_ignore_ascii_case(value)) {
        Some(true)
    } else if FALSE.iter().any(|f| f.eq_ignore_ascii_case(value)) {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use courier_core::negotiation::{ContentNegotiator, SerializationError};
    use http::Request;
    use serde_json::json;

    use super::*;
    use crate::negotiation::MediaTypeNegotiator;

    fn context(content_type: Option<&str>) -> RequestContext {
        let mut builder = Request::post("/");
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        let mut context = RequestContext::new(&parts);
        context.set_request_content_negotiation_result(
            MediaTypeNegotiator::default().negotiate_request_content(&parts),
        );
        context
    }

    fn bind(
        parameters: Vec<ParameterDescriptor>,
        variables: &[(&str, &str)],
        body: &str,
        content_type: Option<&str>,
    ) -> Result<Arguments> {
        let descriptor = ActionDescriptor::new("action", parameters);
        let variables = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut body = RequestBody::new(Body::from(body.to_string()));
        bind_arguments(&descriptor, &variables, &mut body, &context(content_type))
    }

    #[test]
    fn test_scalar_route_variables() {
        let arguments = bind(
            vec![
                ParameterDescriptor::int("id"),
                ParameterDescriptor::float("ratio"),
                ParameterDescriptor::bool("active"),
                ParameterDescriptor::mixed("name"),
            ],
            &[("id", "42"), ("ratio", "0.25"), ("active", "Yes"), ("name", "dave")],
            "",
            None,
        )
        .unwrap();
        assert_eq!(arguments.value("id"), Some(&ArgumentValue::Int(42)));
        assert_eq!(arguments.value("ratio"), Some(&ArgumentValue::Float(0.25)));
        assert_eq!(arguments.value("active"), Some(&ArgumentValue::Bool(true)));
        assert_eq!(arguments.value("name"), Some(&ArgumentValue::from("dave")));
    }

    #[test]
    fn test_unconvertible_route_variable_is_bad_request() {
        let err = bind(vec![ParameterDescriptor::int("id")], &[("id", "abc")], "", None)
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let Error::Http(err) = err else {
            panic!("expected an http error");
        };
        let cause = err
            .cause()
            .and_then(|c| c.downcast_ref::<RouteVariableError>())
            .unwrap();
        assert_eq!(cause.value, "abc");
    }

    #[test]
    fn test_fallbacks() {
        let arguments = bind(
            vec![
                ParameterDescriptor::int("page").nullable(),
                ParameterDescriptor::string("sort").with_default("name"),
                ParameterDescriptor::int("limit").nullable().with_default(10_i64),
            ],
            &[],
            "",
            None,
        )
        .unwrap();
        assert_eq!(arguments.value("page"), Some(&ArgumentValue::Null));
        assert_eq!(arguments.value("sort"), Some(&ArgumentValue::from("name")));
        assert_eq!(arguments.value("limit"), Some(&ArgumentValue::Null));
    }

    #[test]
    fn test_unsatisfiable_parameter() {
        let err = bind(vec![ParameterDescriptor::int("id")], &[], "", None).unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::UnsatisfiableParameter { ref parameter, .. })
                if parameter == "id"
        ));
    }

    #[test]
    fn test_object_from_body() {
        let arguments = bind(
            vec![ParameterDescriptor::object::<Value>("user")],
            &[],
            r#"{"id": 123, "email": "foo@bar.com"}"#,
            Some("application/json"),
        )
        .unwrap();
        assert_eq!(
            arguments.value("user"),
            Some(&ArgumentValue::Object(json!({"id": 123, "email": "foo@bar.com"})))
        );
    }

    #[test]
    fn test_body_errors() {
        let err = bind(
            vec![ParameterDescriptor::object::<Value>("user")],
            &[],
            "<user/>",
            Some("application/xml"),
        )
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let err = bind(
            vec![ParameterDescriptor::object::<Value>("user")],
            &[],
            "{",
            Some("application/json"),
        )
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(
            err,
            Error::RequestBodyDeserialization(RequestBodyDeserializationError::Malformed {
                cause: SerializationError::Format(_),
                ..
            })
        ));
    }

    #[test]
    fn test_required_object_without_body() {
        let err = bind(vec![ParameterDescriptor::object::<Value>("user")], &[], "", None)
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(matches!(
            err,
            Error::RequestBodyDeserialization(RequestBodyDeserializationError::Unsupported {
                media_type: None
            })
        ));

        let err = bind(
            vec![ParameterDescriptor::object::<Value>("user")],
            &[],
            "null",
            Some("application/json"),
        )
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(
            err,
            Error::RequestBodyDeserialization(RequestBodyDeserializationError::Missing {
                ref parameter
            }) if parameter == "user"
        ));

        let arguments = bind(
            vec![ParameterDescriptor::object::<Value>("user")
                .with_default(ArgumentValue::Object(json!({"id": 0})))],
            &[],
            "",
            Some("application/json"),
        )
        .unwrap();
        assert_eq!(arguments.value("user"), Some(&ArgumentValue::Object(json!({"id": 0}))));
    }

    #[test]
    fn test_nullable_object_without_body() {
        let arguments = bind(
            vec![ParameterDescriptor::object::<Value>("user").nullable()],
            &[],
            "",
            None,
        )
        .unwrap();
        assert_eq!(arguments.value("user"), Some(&ArgumentValue::Null));
    }
}
