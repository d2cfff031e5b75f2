//! The interception point every outbound request passes through.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::http::{ProxyRequest, ProxyResponse, Transport, TransportError};

/// Middleware that decides how an outbound request is answered.
///
/// An interceptor either answers from local state or forwards to a
/// [`Transport`]. Errors are transport errors only; anything an interceptor
/// does internally must not introduce new caller-visible failures.
pub trait Interceptor: Send + Sync {
    /// Answer `request`.
    fn handle(&self, request: ProxyRequest) -> BoxFuture<'_, Result<ProxyResponse, TransportError>>;
}

/// Interceptor that forwards everything unchanged.
///
/// Used when caching is disabled, so the serving path stays identical.
pub struct PassThrough {
    transport: Arc<dyn Transport>,
}

impl PassThrough {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl Interceptor for PassThrough {
    fn handle(&self, request: ProxyRequest) -> BoxFuture<'_, Result<ProxyResponse, TransportError>> {
        self.transport.send(request)
    }
}

impl<I: Interceptor + ?Sized> Interceptor for Arc<I> {
    fn handle(&self, request: ProxyRequest) -> BoxFuture<'_, Result<ProxyResponse, TransportError>> {
        (**self).handle(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockTransport;

    #[tokio::test]
    async fn test_pass_through_forwards_every_request() {
        let transport = Arc::new(MockTransport::ok());
        let interceptor = PassThrough::new(transport.clone());

        let resp = interceptor
            .handle(ProxyRequest::get("https://api.mapbox.com/a.png").unwrap())
            .await
            .unwrap();
        assert_eq!(resp.body().as_ref(), b"https://api.mapbox.com/a.png");

        interceptor
            .handle(ProxyRequest::get("https://api.mapbox.com/a.png").unwrap())
            .await
            .unwrap();
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_arc_interceptor_delegates() {
        let transport = Arc::new(MockTransport::ok());
        let interceptor: Arc<dyn Interceptor> = Arc::new(PassThrough::new(transport.clone()));

        let resp = Interceptor::handle(&interceptor, ProxyRequest::get("http://x.test/").unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(transport.calls(), vec!["http://x.test/".to_string()]);
    }
}
