//! Request and response types exchanged between interceptors and transports.

use bytes::Bytes;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Connection-scoped headers that a proxy must not forward.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Returns true if `name` is a hop-by-hop header (case-insensitive).
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// Errors raised while sending a request over the network.
///
/// These are the only errors a caller of the proxy ever observes; storage
/// failures are absorbed inside the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The underlying HTTP client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),

    /// The request target is not a valid absolute URL.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request could not be sent or the connection failed.
    #[error("Request failed: {0}")]
    Request(String),

    /// The request exceeded the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The response body could not be read.
    #[error("Failed to read response: {0}")]
    Body(String),
}

/// An outbound HTTP request as seen by the proxy.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    method: Method,
    url: Url,
    headers: Vec<(String, Bytes)>,
    body: Bytes,
}

impl ProxyRequest {
    /// Create a request with the given method and absolute URL.
    pub fn new(method: Method, url: &str) -> Result<Self, TransportError> {
        let url = Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            method,
            url,
            headers: Vec::new(),
            body: Bytes::new(),
        })
    }

    /// Create a `GET` request for `url`.
    pub fn get(url: &str) -> Result<Self, TransportError> {
        Self::new(Method::GET, url)
    }

    /// Add a text header. Hop-by-hop headers are dropped.
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let value: String = value.into();
        self.with_header_bytes(name, value)
    }

    /// Add a header whose value is kept byte-for-byte, including bytes
    /// outside ASCII. Hop-by-hop headers are dropped.
    pub fn with_header_bytes(mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        let name = name.into();
        if !is_hop_by_hop(&name) {
            self.headers.push((name, value.into()));
        }
        self
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, Bytes)] {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Cache key for this request.
    ///
    /// Entries are keyed by the full serialized URL only; headers do not
    /// participate in equivalence.
    pub fn cache_key(&self) -> String {
        self.url.as_str().to_string()
    }
}

/// A captured HTTP response.
///
/// This is both what the proxy returns to callers and what cache stores
/// persist, so a cache hit is byte-identical to the response that was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyResponse {
    status: u16,
    headers: Vec<(String, Bytes)>,
    body: Bytes,
}

impl ProxyResponse {
    /// Create a response with the given status and body and no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Add a text header.
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let value: String = value.into();
        self.with_header_bytes(name, value)
    }

    /// Add a header whose value is kept byte-for-byte.
    pub fn with_header_bytes(mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, Bytes)] {
        &self.headers
    }

    /// First value of header `name` (case-insensitive) as raw bytes.
    pub fn header_bytes(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_ref())
    }

    /// First value of header `name` (case-insensitive), if it is UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_bytes(name)
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parses_absolute_url() {
        let req = ProxyRequest::get("https://api.mapbox.com/v4/tiles/1/2/3.png").unwrap();
        assert_eq!(*req.method(), Method::GET);
        assert_eq!(req.url().host_str(), Some("api.mapbox.com"));
        assert!(req.body().is_empty());
    }

    #[test]
    fn test_request_rejects_relative_url() {
        let err = ProxyRequest::get("/v4/tiles/1/2/3.png").unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));
    }

    #[test]
    fn test_cache_key_is_full_url() {
        let req = ProxyRequest::get("https://api.mapbox.com/v4/a.png?access_token=abc")
            .unwrap()
            .with_header("Accept", "image/png");
        assert_eq!(
            req.cache_key(),
            "https://api.mapbox.com/v4/a.png?access_token=abc"
        );
    }

    #[test]
    fn test_request_drops_hop_by_hop_headers() {
        let req = ProxyRequest::get("http://example.com/")
            .unwrap()
            .with_header("Connection", "keep-alive")
            .with_header("Proxy-Connection", "keep-alive")
            .with_header("Accept", "*/*");
        assert_eq!(req.headers(), &[("Accept".to_string(), Bytes::from("*/*"))]);
    }

    #[test]
    fn test_response_header_lookup_is_case_insensitive() {
        let resp = ProxyResponse::new(200, "x").with_header("Content-Type", "image/png");
        assert_eq!(resp.header("content-type"), Some("image/png"));
        assert_eq!(resp.header("etag"), None);
    }

    #[test]
    fn test_response_keeps_non_utf8_header_bytes() {
        let resp = ProxyResponse::new(200, "x").with_header_bytes("X-Name", &b"caf\xe9"[..]);
        assert_eq!(resp.header_bytes("x-name"), Some(&b"caf\xe9"[..]));
        assert_eq!(resp.header("x-name"), None);

        let encoded = bincode::serialize(&resp).unwrap();
        let decoded: ProxyResponse = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded.header_bytes("x-name"), Some(&b"caf\xe9"[..]));
    }

    #[test]
    fn test_response_is_success() {
        assert!(ProxyResponse::new(200, "").is_success());
        assert!(ProxyResponse::new(204, "").is_success());
        assert!(!ProxyResponse::new(304, "").is_success());
        assert!(!ProxyResponse::new(404, "").is_success());
        assert!(!ProxyResponse::new(500, "").is_success());
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Request("connection refused".to_string());
        assert_eq!(err.to_string(), "Request failed: connection refused");
    }
}
