//! HTTP surface for the interceptor.
//!
//! Every inbound request is converted to a [`ProxyRequest`] and answered by
//! an [`Interceptor`]. Two request-target forms are accepted:
//!
//! - **absolute-form** (`GET http://host/path`), as sent by clients that use
//!   this server as an HTTP forward proxy. The target is used as-is.
//! - **origin-form** (`GET /path?query`), as sent by clients whose tile base
//!   URL points at this server. The target is resolved against the upstream
//!   tile origin, so `/v4/a.png` becomes `https://api.mapbox.com/v4/a.png`.
//!
//! `CONNECT` tunnels are refused: tunnelled TLS traffic cannot be cached.
//!
//! Transport errors become `502 Bad Gateway` (`504` for timeouts). Response
//! status, headers and body are otherwise forwarded unchanged, minus
//! hop-by-hop headers.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::http::{is_hop_by_hop, ProxyRequest, ProxyResponse, TransportError};
use crate::proxy::{Interceptor, TileOrigin};

/// Errors from the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the listen socket.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The server loop failed.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[derive(Clone)]
struct ServerState {
    interceptor: Arc<dyn Interceptor>,
    upstream: TileOrigin,
}

/// Build the router that sends every request through `interceptor`.
///
/// Origin-form targets are resolved against `upstream`.
pub fn router(interceptor: Arc<dyn Interceptor>, upstream: TileOrigin) -> Router {
    Router::new().fallback(forward).with_state(ServerState {
        interceptor,
        upstream,
    })
}

/// Bind a TCP listener on `addr`.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serve `interceptor` on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    interceptor: Arc<dyn Interceptor>,
    upstream: TileOrigin,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, upstream = %upstream, "Proxy server listening");
    }

    axum::serve(listener, router(interceptor, upstream))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
}

/// Resolve the request target to an absolute URL.
fn target_url(uri: &Uri, upstream: &TileOrigin) -> String {
    if uri.scheme().is_some() {
        uri.to_string()
    } else {
        let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        format!("{}{}", upstream, path)
    }
}

fn to_proxy_request(
    method: &Method,
    target: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<ProxyRequest, TransportError> {
    let request = headers
        .iter()
        .filter(|(name, _)| *name != header::HOST && *name != header::CONTENT_LENGTH)
        .fold(ProxyRequest::new(method.clone(), target)?, |req, (name, value)| {
            req.with_header_bytes(name.as_str(), Bytes::copy_from_slice(value.as_bytes()))
        });
    Ok(request.with_body(body))
}

/// `content-length` is recomputed from the body, except for `HEAD` where the
/// body is empty and the upstream length is the meaningful one.
fn to_http_response(method: &Method, response: ProxyResponse) -> Response {
    let status = match StatusCode::from_u16(response.status()) {
        Ok(status) => status,
        Err(_) => {
            return error_response(
                StatusCode::BAD_GATEWAY,
                format!("Upstream sent invalid status {}", response.status()),
            )
        }
    };

    let mut headers = HeaderMap::new();
    for (name, value) in response.headers() {
        if is_hop_by_hop(name)
            || (name.eq_ignore_ascii_case("content-length") && *method != Method::HEAD)
        {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => debug!(header = %name, "Dropping unrepresentable response header"),
        }
    }

    (status, headers, Body::from(response.into_body())).into_response()
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, message).into_response()
}

async fn forward(
    State(state): State<ServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::CONNECT {
        return error_response(
            StatusCode::NOT_IMPLEMENTED,
            "CONNECT tunnelling is not supported".to_string(),
        );
    }

    let target = target_url(&uri, &state.upstream);
    let request = match to_proxy_request(&method, &target, &headers, body) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.interceptor.handle(request).await {
        Ok(response) => to_http_response(&method, response),
        Err(e) => {
            warn!(method = %method, error = %e, "Upstream request failed");
            let status = match e {
                TransportError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            };
            error_response(status, e.to_string())
        }
    }
}
