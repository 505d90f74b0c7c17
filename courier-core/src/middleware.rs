use std::collections::HashMap;

use derive_more::{From, Into};
use http::{Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    http::{Body, RequestHandler},
    Result,
};

/// A step of the pipeline wrapped around the controller.
///
/// A middleware may answer on its own without calling `next`, or
/// post-process whatever `next` returns.
pub trait Middleware: Send {
    fn handle(&self, request: Request<Body>, next: &dyn RequestHandler) -> Result<Response<Body>>;

    /// Attribute-capable middleware expose their attribute slot here so the
    /// kernel can fill it from the route binding before the chain is built.
    fn attributes_mut(&mut self) -> Option<&mut MiddlewareAttributes> {
        None
    }
}

/// Per-binding configuration handed to attribute-capable middleware.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct MiddlewareAttributes(HashMap<String, Value>);

impl MiddlewareAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns the attribute, or `default` when it was never set.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a Value) -> &'a Value {
        self.0.get(name).unwrap_or(default)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MiddlewareAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_getting_attribute_returns_value_set() {
        let attributes = MiddlewareAttributes::new().with("foo", "bar");
        assert_eq!(attributes.get("foo"), Some(&json!("bar")));
        assert_eq!(attributes.get_str("foo"), Some("bar"));
    }

    #[test]
    fn test_missing_attribute_returns_default() {
        let attributes = MiddlewareAttributes::new();
        assert!(attributes.get("foo").is_none());
        let default = json!("bar");
        assert_eq!(attributes.get_or("foo", &default), &json!("bar"));
    }

    #[test]
    fn test_attributes_deserialize_from_map() {
        let attributes: MiddlewareAttributes =
            serde_json::from_str(r#"{"role": "admin", "limit": 3}"#).unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes.get("limit"), Some(&json!(3)));
    }
}
