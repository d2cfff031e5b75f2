//! Request classification against the designated tile origin.

use std::fmt;
use std::str::FromStr;

use reqwest::{Method, Url};
use thiserror::Error;

use crate::http::ProxyRequest;

/// Tile origin used when none is configured.
pub const DEFAULT_TILE_ORIGIN: &str = "https://api.mapbox.com";

/// Error parsing a tile origin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid tile origin '{origin}': {reason}")]
pub struct OriginError {
    pub origin: String,
    pub reason: String,
}

/// How the proxy treats a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Forward untouched; never read or write the cache.
    PassThrough,
    /// Serve cache-first and store eligible responses.
    Cacheable,
}

/// Scheme, host and port identifying the tile provider.
///
/// Matching is done on the parsed URL rather than on a string prefix, so
/// `https://api.mapbox.com.example.net/` or `https://api.mapbox.com@evil/`
/// are not mistaken for the tile origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileOrigin {
    scheme: String,
    host: String,
    port: u16,
}

impl TileOrigin {
    /// Parse an origin such as `https://api.mapbox.com`.
    ///
    /// Only `http` and `https` are accepted, and the origin must not carry a
    /// path, query, fragment or credentials.
    pub fn parse(origin: &str) -> Result<Self, OriginError> {
        let invalid = |reason: &str| OriginError {
            origin: origin.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(origin).map_err(|e| invalid(&e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("origin must not include a path, query or fragment"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid("origin must not include credentials"));
        }
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port"))?;

        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port,
        })
    }

    /// The default Mapbox API origin.
    pub fn mapbox() -> Self {
        Self {
            scheme: "https".to_string(),
            host: "api.mapbox.com".to_string(),
            port: 443,
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// True if `url` targets this origin.
    pub fn matches(&self, url: &Url) -> bool {
        url.scheme() == self.scheme
            && url.host_str() == Some(self.host.as_str())
            && url.port_or_known_default() == Some(self.port)
    }

    /// Classify a request: only `GET`s to this origin are cacheable.
    pub fn classify(&self, request: &ProxyRequest) -> RequestClass {
        if *request.method() == Method::GET && self.matches(request.url()) {
            RequestClass::Cacheable
        } else {
            RequestClass::PassThrough
        }
    }

    fn default_port(&self) -> u16 {
        if self.scheme == "https" {
            443
        } else {
            80
        }
    }
}

impl Default for TileOrigin {
    fn default() -> Self {
        Self::mapbox()
    }
}

impl FromStr for TileOrigin {
    type Err = OriginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TileOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == self.default_port() {
            write!(f, "{}://{}", self.scheme, self.host)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}
