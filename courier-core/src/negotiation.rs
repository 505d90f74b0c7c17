//! Content negotiation contracts.
//!
//! A [`ContentNegotiator`] chooses which [`MediaTypeFormatter`] reads the
//! request body and which one writes the response body. Structured values
//! travel through formatters as [`serde_json::Value`], a format-neutral data
//! model; typed access goes through `serde`.
use std::{
    fmt,
    io::{Read, Write},
    sync::Arc,
};

use http::request::Parts;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Unsupported(String),
    #[error("{0}")]
    Format(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Reads and writes structured values in one or more media types.
pub trait MediaTypeFormatter: Send + Sync + fmt::Debug {
    fn supported_media_types(&self) -> &[&'static str];

    fn supported_encodings(&self) -> &[&'static str] {
        &["utf-8"]
    }

    fn supports_media_type(&self, media_type: &str) -> bool {
        self.supported_media_types()
            .iter()
            .any(|m| m.eq_ignore_ascii_case(media_type))
    }

    /// Whether `value` has a representation in this formatter's media types.
    fn can_write(&self, _value: &Value) -> bool {
        true
    }

    fn write_to_stream(
        &self,
        value: &Value,
        stream: &mut dyn Write,
    ) -> Result<(), SerializationError>;

    fn read_from_stream(&self, stream: &mut dyn Read) -> Result<Value, SerializationError>;
}

/// Outcome of negotiating one side of an exchange. Immutable once produced.
#[derive(Debug, Clone, Default)]
pub struct ContentNegotiationResult {
    media_type: Option<String>,
    formatter: Option<Arc<dyn MediaTypeFormatter>>,
    encoding: Option<String>,
    language: Option<String>,
}

impl ContentNegotiationResult {
    pub fn new(
        formatter: Option<Arc<dyn MediaTypeFormatter>>,
        media_type: Option<String>,
        encoding: Option<String>,
        language: Option<String>,
    ) -> Self {
        Self {
            media_type,
            formatter,
            encoding,
            language,
        }
    }

    #[inline]
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    #[inline]
    pub fn formatter(&self) -> Option<&Arc<dyn MediaTypeFormatter>> {
        self.formatter.as_ref()
    }

    #[inline]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    #[inline]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

pub trait ContentNegotiator: Send + Sync {
    /// Picks the formatter able to read the request body, `None` when the
    /// request declares no content type.
    fn negotiate_request_content(&self, request: &Parts) -> Option<ContentNegotiationResult>;

    /// Picks the representation of the response, `None` when nothing the
    /// client accepts can be produced.
    fn negotiate_response_content(&self, request: &Parts) -> Option<ContentNegotiationResult>;

    /// Like [`negotiate_response_content`](Self::negotiate_response_content),
    /// but only considers formatters able to write `value`.
    fn negotiate_response_content_for(
        &self,
        request: &Parts,
        value: &Value,
    ) -> Option<ContentNegotiationResult> {
        self.negotiate_response_content(request)
            .filter(|r| r.formatter().is_some_and(|f| f.can_write(value)))
    }
}

impl<T: ContentNegotiator + ?Sized> ContentNegotiator for Arc<T> {
    #[inline]
    fn negotiate_request_content(&self, request: &Parts) -> Option<ContentNegotiationResult> {
        (**self).negotiate_request_content(request)
    }

    #[inline]
    fn negotiate_response_content(&self, request: &Parts) -> Option<ContentNegotiationResult> {
        (**self).negotiate_response_content(request)
    }

    #[inline]
    fn negotiate_response_content_for(
        &self,
        request: &Parts,
        value: &Value,
    ) -> Option<ContentNegotiationResult> {
        (**self).negotiate_response_content_for(request, value)
    }
}
