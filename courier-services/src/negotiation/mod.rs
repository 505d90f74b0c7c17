//! Header-driven content negotiation.
//!
//! [`MediaTypeNegotiator`] holds an ordered list of formatters. The request
//! side follows `Content-Type` (and its `charset`) plus `Content-Language`;
//! the response side ranks `Accept`, `Accept-Charset` and `Accept-Language`
//! by quality, then by specificity, then by position in the header.
use std::{cmp::Ordering, sync::Arc};

use courier_core::{
    config::NegotiationConfig,
    negotiation::{ContentNegotiationResult, ContentNegotiator, MediaTypeFormatter},
};
use http::{
    header::{ACCEPT, ACCEPT_CHARSET, ACCEPT_LANGUAGE, CONTENT_LANGUAGE, CONTENT_TYPE},
    request::Parts,
    HeaderMap, HeaderName,
};
use serde_json::Value;

mod formatters;

pub use formatters::{JsonMediaTypeFormatter, PlainTextMediaTypeFormatter};

#[derive(Debug, Clone)]
pub struct MediaTypeNegotiator {
    formatters: Vec<Arc<dyn MediaTypeFormatter>>,
    languages: Vec<String>,
}

impl Default for MediaTypeNegotiator {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(JsonMediaTypeFormatter),
            Arc::new(PlainTextMediaTypeFormatter),
        ])
    }
}

impl MediaTypeNegotiator {
    /// The first formatter is the default when the client states no preference.
    pub fn new(formatters: Vec<Arc<dyn MediaTypeFormatter>>) -> Self {
        Self {
            formatters,
            languages: Vec::new(),
        }
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    pub fn from_config(config: &NegotiationConfig) -> Self {
        Self::default().with_languages(config.languages.clone())
    }

    pub fn formatters(&self) -> &[Arc<dyn MediaTypeFormatter>] {
        &self.formatters
    }

    fn formatter_for(&self, media_type: &str) -> Option<&Arc<dyn MediaTypeFormatter>> {
        self.formatters
            .iter()
            .find(|f| f.supports_media_type(media_type))
    }

    /// Finds the first eligible formatter and media type covered by `range`.
    fn match_range(
        &self,
        range: &str,
        eligible: &dyn Fn(&dyn MediaTypeFormatter) -> bool,
    ) -> Option<(&Arc<dyn MediaTypeFormatter>, &'static str)> {
        let (ty, subtype) = range.split_once('/')?;
        self.formatters
            .iter()
            .filter(|f| eligible(f.as_ref()))
            .find_map(|formatter| {
                formatter
                    .supported_media_types()
                    .iter()
                    .find(|media_type| match (ty, subtype) {
                        ("*", "*") => true,
                        (ty, "*") => media_type
                            .split_once('/')
                            .is_some_and(|(t, _)| t.eq_ignore_ascii_case(ty)),
                        _ => media_type.eq_ignore_ascii_case(range),
                    })
                    .map(|media_type| (formatter, *media_type))
            })
    }

    fn negotiate_response(
        &self,
        headers: &HeaderMap,
        eligible: &dyn Fn(&dyn MediaTypeFormatter) -> bool,
    ) -> Option<ContentNegotiationResult> {
        let (formatter, media_type) = match header_ranges(headers, ACCEPT) {
            None => {
                let formatter = self.formatters.iter().find(|f| eligible(f.as_ref()))?;
                (formatter, *formatter.supported_media_types().first()?)
            }
            Some(ranges) => ranges
                .iter()
                .find_map(|range| self.match_range(&range.value, eligible))?,
        };
        let encoding = self.negotiate_encoding(headers, formatter);
        let language = self.negotiate_language(headers);
        tracing::trace!(media_type, ?encoding, ?language, "negotiated response content");
        Some(ContentNegotiationResult::new(
            Some(formatter.clone()),
            Some(media_type.to_string()),
            encoding,
            language,
        ))
    }

    fn negotiate_encoding(
        &self,
        headers: &HeaderMap,
        formatter: &Arc<dyn MediaTypeFormatter>,
    ) -> Option<String> {
        let supported = formatter.supported_encodings();
        let Some(ranges) = header_ranges(headers, ACCEPT_CHARSET) else {
            return supported.first().map(|e| e.to_string());
        };
        ranges.iter().find_map(|range| {
            if range.value == "*" {
                supported.first().map(|e| e.to_string())
            } else {
                supported
                    .iter()
                    .find(|e| e.eq_ignore_ascii_case(&range.value))
                    .map(|e| e.to_string())
            }
        })
    }

    fn negotiate_language(&self, headers: &HeaderMap) -> Option<String> {
        let Some(ranges) = header_ranges(headers, ACCEPT_LANGUAGE) else {
            return self.languages.first().cloned();
        };
        ranges.iter().find_map(|range| {
            if range.value == "*" {
                return self.languages.first().cloned();
            }
            self.languages
                .iter()
                .find(|language| language_matches(&range.value, language))
                .cloned()
        })
    }
}

impl ContentNegotiator for MediaTypeNegotiator {
    fn negotiate_request_content(&self, request: &Parts) -> Option<ContentNegotiationResult> {
        let content_type = request.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let media = parse_item(content_type)?;
        let encoding = media.param("charset").map(str::to_ascii_lowercase);
        let language = request
            .headers
            .get(CONTENT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string());

        // An unreadable type or charset still yields a result naming the
        // media type, so the caller can report what it could not read.
        let formatter = self.formatter_for(&media.value).filter(|f| {
            encoding.as_deref().map_or(true, |encoding| {
                f.supported_encodings()
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(encoding))
            })
        });
        tracing::trace!(
            media_type = %media.value,
            readable = formatter.is_some(),
            "negotiated request content"
        );
        Some(ContentNegotiationResult::new(
            formatter.cloned(),
            Some(media.value),
            encoding,
            language,
        ))
    }

    fn negotiate_response_content(&self, request: &Parts) -> Option<ContentNegotiationResult> {
        self.negotiate_response(&request.headers, &|_| true)
    }

    fn negotiate_response_content_for(
        &self,
        request: &Parts,
        value: &Value,
    ) -> Option<ContentNegotiationResult> {
        self.negotiate_response(&request.headers, &|f| f.can_write(value))
    }
}

/// One element of a comma separated header, e.g. `text/html;q=0.8`.
#[derive(Debug, Clone, PartialEq)]
struct HeaderItem {
    value: String,
    quality: f32,
    params: Vec<(String, String)>,
    position: usize,
}

impl HeaderItem {
    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `*/*` and `*` rank below `type/*`, which ranks below a concrete value.
    fn specificity(&self) -> u8 {
        match self.value.as_str() {
            "*" | "*/*" => 0,
            v if v.ends_with("/*") => 1,
            _ => 2,
        }
    }
}

fn parse_item(raw: &str) -> Option<HeaderItem> {
    let mut parts = raw.split(';');
    let value = parts.next()?.trim().to_ascii_lowercase();
    if value.is_empty() {
        return None;
    }
    let mut quality = 1.0;
    let mut params = Vec::new();
    for param in parts {
        let Some((name, v)) = param.split_once('=') else {
            continue;
        };
        let (name, v) = (name.trim(), v.trim().trim_matches('"'));
        if name.eq_ignore_ascii_case("q") {
            quality = v.parse::<f32>().unwrap_or(0.0).clamp(0.0, 1.0);
        } else {
            params.push((name.to_string(), v.to_string()));
        }
    }
    Some(HeaderItem {
        value,
        quality,
        params,
        position: 0,
    })
}

/// Parses a quality-valued header, best ranked first, dropping `q=0` items.
/// `None` when the header is absent or blank.
fn header_ranges(headers: &HeaderMap, name: HeaderName) -> Option<Vec<HeaderItem>> {
    let mut items = Vec::new();
    for value in headers.get_all(name) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for raw in value.split(',') {
            if let Some(mut item) = parse_item(raw) {
                item.position = items.len();
                items.push(item);
            }
        }
    }
    if items.is_empty() {
        return None;
    }
    items.retain(|item| item.quality > 0.0);
    items.sort_by(|a, b| {
        b.quality
            .partial_cmp(&a.quality)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.specificity().cmp(&a.specificity()))
            .then_with(|| a.position.cmp(&b.position))
    });
    Some(items)
}

/// `en` matches `en-US` and the other way round.
fn language_matches(range: &str, language: &str) -> bool {
    if range.eq_ignore_ascii_case(language) {
        return true;
    }
    let prefix_of = |short: &str, long: &str| {
        long.len() > short.len()
            && long.as_bytes()[short.len()] == b'-'
            && long[..short.len()].eq_ignore_ascii_case(short)
    };
    prefix_of(range, language) || prefix_of(language, range)
}
