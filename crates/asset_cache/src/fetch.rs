//! Request and response types seen by the asset cache

use serde::{Deserialize, Serialize};

/// HTTP method of an intercepted request. Only GET is ever cached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn is_get(&self) -> bool {
        matches!(self, Method::Get)
    }
}

/// What the request is fetching, as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Other,
}

/// An intercepted outgoing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    /// Absolute URL or an app-relative path such as `/index.html`.
    pub url: String,
    pub destination: Destination,
    /// Whether the request's accept header includes HTML; drives the
    /// root-document fallback.
    pub accepts_html: bool,
}

impl FetchRequest {
    /// A plain GET for a static asset.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            destination: Destination::Other,
            accepts_html: false,
        }
    }

    /// A navigation request for an HTML document.
    pub fn document(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            destination: Destination::Document,
            accepts_html: true,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Host part of an absolute URL; `None` for app-relative paths.
    pub fn host(&self) -> Option<&str> {
        let rest = self.url.split_once("://")?.1;
        rest.split(['/', '?']).next()
    }

    /// Path part of the URL (`/` when the URL has no path).
    pub fn path(&self) -> &str {
        match self.url.split_once("://") {
            Some((_, rest)) => rest
                .find('/')
                .map(|index| &rest[index..])
                .unwrap_or("/"),
            None => &self.url,
        }
    }
}

/// A response, either fresh from the network or replayed from the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn ok(body: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            status: 200,
            content_type: content_type.map(String::from),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Where the returned response came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
}

/// A served response together with its provenance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOutcome {
    pub response: FetchResponse,
    pub source: ResponseSource,
}
