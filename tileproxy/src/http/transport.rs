//! Network transport abstraction for testability.

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tracing::trace;

use super::types::{ProxyRequest, ProxyResponse, TransportError};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent string for outbound requests.
pub const DEFAULT_USER_AGENT: &str = concat!("tileproxy/", env!("CARGO_PKG_VERSION"));

/// Trait for sending a request to the network.
///
/// This abstraction allows for dependency injection and easier testing by
/// enabling mock transports. It is dyn-compatible so the proxy can hold an
/// `Arc<dyn Transport>`.
///
/// Implementations must return non-success statuses as `Ok` responses; only
/// failures to obtain a response at all are errors.
pub trait Transport: Send + Sync {
    /// Send `request` and capture the complete response.
    fn send(&self, request: ProxyRequest) -> BoxFuture<'_, Result<ProxyResponse, TransportError>>;
}

/// Real transport implementation using an async reqwest client.
///
/// The client is built without decompression features, so response bodies
/// are forwarded exactly as the origin sent them.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with the default timeout and user agent.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_options(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
    }

    /// Creates a transport with a custom timeout and user agent.
    pub fn with_options(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        // Environment proxies are ignored: HTTP_PROXY may point back at us.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .no_proxy()
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: ProxyRequest) -> BoxFuture<'_, Result<ProxyResponse, TransportError>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method().clone(), request.url().clone());

            for (name, value) in request.headers() {
                builder = builder.header(name.as_str(), &value[..]);
            }
            if !request.body().is_empty() {
                builder = builder.body(request.body().clone());
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::Request(e.to_string())
                }
            })?;

            let status = response.status().as_u16();
            let headers: Vec<(String, Bytes)> = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        Bytes::copy_from_slice(value.as_bytes()),
                    )
                })
                .collect();

            let body = response.bytes().await.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::Body(e.to_string())
                }
            })?;

            trace!(
                url = %request.url(),
                status,
                bytes = body.len(),
                "Network response received"
            );

            let response = headers
                .into_iter()
                .fold(ProxyResponse::new(status, body), |resp, (n, v)| {
                    resp.with_header_bytes(n, v)
                });
            Ok(response)
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::collections::HashMap;

    use parking_lot::Mutex;

    /// Mock transport for testing.
    ///
    /// Serves canned results per URL. Unrouted URLs get `fallback`, or a
    /// `200` echoing the URL as body when no fallback is set. Every URL it
    /// was asked to send is recorded.
    pub struct MockTransport {
        routes: HashMap<String, Result<ProxyResponse, TransportError>>,
        fallback: Option<Result<ProxyResponse, TransportError>>,
        delay: Option<Duration>,
        calls: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub fn ok() -> Self {
            Self {
                routes: HashMap::new(),
                fallback: None,
                delay: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_fallback(result: Result<ProxyResponse, TransportError>) -> Self {
            Self {
                fallback: Some(result),
                ..Self::ok()
            }
        }

        pub fn route(mut self, url: &str, result: Result<ProxyResponse, TransportError>) -> Self {
            self.routes.insert(url.to_string(), result);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        pub fn calls_for(&self, url: &str) -> usize {
            self.calls.lock().iter().filter(|u| u.as_str() == url).count()
        }
    }

    impl Transport for MockTransport {
        fn send(
            &self,
            request: ProxyRequest,
        ) -> BoxFuture<'_, Result<ProxyResponse, TransportError>> {
            Box::pin(async move {
                let url = request.cache_key();
                self.calls.lock().push(url.clone());
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }

                match (self.routes.get(&url), &self.fallback) {
                    (Some(result), _) => result.clone(),
                    (None, Some(result)) => result.clone(),
                    (None, None) => Ok(ProxyResponse::new(200, url.into_bytes())),
                }
            })
        }
    }

    #[tokio::test]
    async fn test_mock_transport_records_calls() {
        let mock = MockTransport::ok();

        let req = ProxyRequest::get("http://example.com/a").unwrap();
        let resp = mock.send(req).await.unwrap();

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.body().as_ref(), b"http://example.com/a");
        assert_eq!(mock.calls(), vec!["http://example.com/a".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_transport_routes_errors() {
        let mock = MockTransport::ok().route(
            "http://example.com/down",
            Err(TransportError::Request("refused".to_string())),
        );

        let req = ProxyRequest::get("http://example.com/down").unwrap();
        let err = mock.send(req).await.unwrap_err();
        assert_eq!(err, TransportError::Request("refused".to_string()));
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
        assert!(ReqwestTransport::with_options(Duration::from_secs(5), "test-agent").is_ok());
    }

    #[tokio::test]
    async fn test_reqwest_transport_keeps_raw_header_bytes() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nX-Name: caf\xe9\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                )
                .await
                .unwrap();
        });

        let transport = ReqwestTransport::new().unwrap();
        let url = format!("http://{}/a", addr);
        let resp = transport
            .send(ProxyRequest::get(&url).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.header_bytes("x-name"), Some(&b"caf\xe9"[..]));
        assert_eq!(resp.body().as_ref(), b"ok");
    }

    #[test]
    fn test_default_user_agent_names_crate() {
        assert!(DEFAULT_USER_AGENT.starts_with("tileproxy/"));
    }
}
