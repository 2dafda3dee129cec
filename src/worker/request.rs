//! Request and response values passed between the worker, its cache and the network.

use bytes::Bytes;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An outgoing request the worker intercepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Url,
}

impl Request {
    /// Creates a request.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    /// Creates a `GET` request.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parses `text` as a `GET` request, resolving relative paths against `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the text is not a valid URL or path.
    pub fn parse(text: &str, base: &Url) -> Result<Self> {
        resolve(base, text).map(Self::get)
    }

    /// The HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The target URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Identity used for cache lookups: the URL without its fragment.
    #[must_use]
    pub fn cache_key(&self) -> &str {
        let url = self.url.as_str();
        url.split_once('#').map_or(url, |(key, _)| key)
    }
}

/// Resolves `text` against `base`; absolute URLs are returned as-is.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if the result does not parse.
pub fn resolve(base: &Url, text: &str) -> Result<Url> {
    base.join(text).map_err(|e| Error::InvalidUrl {
        url: text.to_string(),
        reason: e.to_string(),
    })
}

/// Parses an absolute URL.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if the text does not parse.
pub fn parse_url(text: &str) -> Result<Url> {
    Url::parse(text).map_err(|e| Error::InvalidUrl {
        url: text.to_string(),
        reason: e.to_string(),
    })
}

/// Where a response came from, relative to the worker's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response.
    Basic,
    /// Cross-origin response.
    Cors,
    /// Cross-origin response with no readable details.
    Opaque,
    /// Network error placeholder.
    Error,
}

/// A response, either live from the network or replayed from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL after redirects.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Origin classification.
    pub kind: ResponseKind,
    /// Response headers, in received order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Bytes,
}

impl Response {
    /// Creates a same-origin `200` response with no headers.
    #[must_use]
    pub fn basic(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            kind: ResponseKind::Basic,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Replaces the status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Replaces the origin classification.
    #[must_use]
    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// True for any 2xx status.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Only complete, same-origin responses are worth keeping.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic
    }

    /// Value of the first header named `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
