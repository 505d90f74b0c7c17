use http::{request::Parts, HeaderMap, Method, Uri};

use crate::negotiation::ContentNegotiationResult;

/// Per-request state shared by the controller and the response factories.
///
/// Built when action invocation starts; negotiation results are attached as
/// they are computed.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    request_negotiation: Option<ContentNegotiationResult>,
    response_negotiation: Option<ContentNegotiationResult>,
}

impl RequestContext {
    pub fn new(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            request_negotiation: None,
            response_negotiation: None,
        }
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn request_content_negotiation_result(&self) -> Option<&ContentNegotiationResult> {
        self.request_negotiation.as_ref()
    }

    #[inline]
    pub fn response_content_negotiation_result(&self) -> Option<&ContentNegotiationResult> {
        self.response_negotiation.as_ref()
    }

    pub fn set_request_content_negotiation_result(
        &mut self,
        result: Option<ContentNegotiationResult>,
    ) {
        self.request_negotiation = result;
    }

    pub fn set_response_content_negotiation_result(
        &mut self,
        result: Option<ContentNegotiationResult>,
    ) {
        self.response_negotiation = result;
    }
}
