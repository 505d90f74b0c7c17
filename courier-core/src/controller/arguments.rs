use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::AnyResult;

/// A value bound to one action parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Object(Value),
}

impl ArgumentValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgumentValue::Null => "null",
            ArgumentValue::Int(_) => "int",
            ArgumentValue::Float(_) => "float",
            ArgumentValue::Bool(_) => "bool",
            ArgumentValue::String(_) => "string",
            ArgumentValue::Object(_) => "object",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, ArgumentValue::Null)
    }

    pub fn to_value(&self) -> Value {
        match self {
            ArgumentValue::Null => Value::Null,
            ArgumentValue::Int(i) => Value::from(*i),
            ArgumentValue::Float(f) => Value::from(*f),
            ArgumentValue::Bool(b) => Value::Bool(*b),
            ArgumentValue::String(s) => Value::String(s.clone()),
            ArgumentValue::Object(v) => v.clone(),
        }
    }
}

impl From<i64> for ArgumentValue {
    fn from(i: i64) -> Self {
        ArgumentValue::Int(i)
    }
}

impl From<f64> for ArgumentValue {
    fn from(f: f64) -> Self {
        ArgumentValue::Float(f)
    }
}

impl From<bool> for ArgumentValue {
    fn from(b: bool) -> Self {
        ArgumentValue::Bool(b)
    }
}

impl From<&str> for ArgumentValue {
    fn from(s: &str) -> Self {
        ArgumentValue::String(s.to_string())
    }
}

impl From<String> for ArgumentValue {
    fn from(s: String) -> Self {
        ArgumentValue::String(s)
    }
}

#[derive(Error, Debug)]
#[error("argument `{name}` is {found}, expected {expected}")]
pub struct ArgumentTypeError {
    pub name: String,
    pub expected: &'static str,
    pub found: &'static str,
}

/// Conversion from a bound argument into a Rust value.
pub trait FromArgument: Sized {
    /// `None` when the value has the wrong shape.
    fn from_argument(value: &ArgumentValue) -> Option<Self>;
}

impl FromArgument for ArgumentValue {
    fn from_argument(value: &ArgumentValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromArgument for i64 {
    fn from_argument(value: &ArgumentValue) -> Option<Self> {
        match value {
            ArgumentValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromArgument for i32 {
    fn from_argument(value: &ArgumentValue) -> Option<Self> {
        i64::from_argument(value).and_then(|i| i32::try_from(i).ok())
    }
}

impl FromArgument for u64 {
    fn from_argument(value: &ArgumentValue) -> Option<Self> {
        i64::from_argument(value).and_then(|i| u64::try_from(i).ok())
    }
}

impl FromArgument for f64 {
    fn from_argument(value: &ArgumentValue) -> Option<Self> {
        match value {
            ArgumentValue::Float(f) => Some(*f),
            ArgumentValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromArgument for bool {
    fn from_argument(value: &ArgumentValue) -> Option<Self> {
        match value {
            ArgumentValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromArgument for String {
    fn from_argument(value: &ArgumentValue) -> Option<Self> {
        match value {
            ArgumentValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromArgument for Value {
    fn from_argument(value: &ArgumentValue) -> Option<Self> {
        Some(value.to_value())
    }
}

impl<T: FromArgument> FromArgument for Option<T> {
    fn from_argument(value: &ArgumentValue) -> Option<Self> {
        match value {
            ArgumentValue::Null => Some(None),
            other => T::from_argument(other).map(Some),
        }
    }
}

/// Arguments bound to an action, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<(String, ArgumentValue)>,
}

impl Arguments {
    pub fn push(&mut self, name: impl Into<String>, value: ArgumentValue) {
        self.values.push((name.into(), value));
    }

    pub fn value(&self, name: &str) -> Option<&ArgumentValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Reads an argument as `T`; a shape mismatch is an [`ArgumentTypeError`].
    pub fn get<T: FromArgument>(&self, name: &str) -> AnyResult<T> {
        let value = self.value(name).unwrap_or(&ArgumentValue::Null);
        T::from_argument(value).ok_or_else(|| {
            ArgumentTypeError {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
                found: value.type_name(),
            }
            .into()
        })
    }

    /// Deserializes a structured argument into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self, name: &str) -> AnyResult<T> {
        let value = self
            .value(name)
            .map(ArgumentValue::to_value)
            .unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgumentValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        email: String,
    }

    fn arguments() -> Arguments {
        let mut arguments = Arguments::default();
        arguments.push("id", ArgumentValue::Int(42));
        arguments.push("ratio", ArgumentValue::Float(0.5));
        arguments.push("name", ArgumentValue::from("dave"));
        arguments.push("nothing", ArgumentValue::Null);
        arguments.push(
            "user",
            ArgumentValue::Object(json!({"id": 123, "email": "foo@bar.com"})),
        );
        arguments
    }

    #[test]
    fn test_typed_access() {
        let arguments = arguments();
        assert_eq!(arguments.get::<i64>("id").unwrap(), 42);
        assert_eq!(arguments.get::<i32>("id").unwrap(), 42);
        assert_eq!(arguments.get::<f64>("ratio").unwrap(), 0.5);
        assert_eq!(arguments.get::<String>("name").unwrap(), "dave");
        assert_eq!(arguments.get::<Option<i64>>("nothing").unwrap(), None);
        assert_eq!(arguments.get::<Option<i64>>("id").unwrap(), Some(42));
        assert_eq!(arguments.len(), 5);
    }

    #[test]
    fn test_shape_mismatch_is_type_error() {
        let err = arguments().get::<i64>("name").unwrap_err();
        let err = err.downcast::<ArgumentTypeError>().unwrap();
        assert_eq!(err.name, "name");
        assert_eq!(err.found, "string");
    }

    #[test]
    fn test_deserialize_structured_argument() {
        let user: User = arguments().deserialize("user").unwrap();
        assert_eq!(
            user,
            User {
                id: 123,
                email: "foo@bar.com".to_string()
            }
        );
        let missing: Option<User> = arguments().deserialize("missing").unwrap();
        assert!(missing.is_none());
    }
}
