//! HTTP request/response model and network transport.
//!
//! The proxy never talks to `reqwest` directly. Outbound traffic goes through
//! the [`Transport`] trait so the network can be swapped for a mock in tests
//! and so interceptors can be stacked in front of a real client.
//!
//! Bodies are carried as [`bytes::Bytes`], which makes cloning a response for
//! the background cache write a reference-count bump rather than a copy.

mod transport;
mod types;

pub use reqwest::{Method, Url};
pub use transport::{ReqwestTransport, Transport, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use types::{is_hop_by_hop, ProxyRequest, ProxyResponse, TransportError};

#[cfg(test)]
pub use transport::tests::MockTransport;
