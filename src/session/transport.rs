//! HTTP transport seam
//!
//! The [`Transport`] trait is the boundary between the session logic and
//! the actual network. [`HttpTransport`] is the reqwest-backed production
//! implementation; tests substitute a canned-response fake.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Raw response from the remote: status line plus body bytes.
///
/// Status classification (2xx window, 404 as not-found) is the session's
/// and reconciler's job, not the transport's.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Executes a single HTTP request against an absolute URL.
///
/// A transport-level failure (connect, TLS, timeout) surfaces as
/// [`Error::Transport`]; any response that came back, whatever its
/// status, is returned as a [`RawResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: reqwest::Method,
        url: &str,
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse>;
}

// =============================================================================
// Production Transport
// =============================================================================

/// reqwest-backed transport with a fixed per-request deadline
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport. `insecure` skips TLS certificate verification,
    /// which self-signed dashboard deployments commonly require.
    pub fn new(timeout: Duration, insecure: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: reqwest::Method,
        url: &str,
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse> {
        let mut req = self.client.request(method, url);
        for (name, value) in headers {
            req = req.header(name, value);
        }
        if let Some(bytes) = body {
            req = req.body(bytes);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(RawResponse { status, body })
    }
}

// =============================================================================
// Test Transport
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// One request as seen by the fake transport
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: String,
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub body: Option<serde_json::Value>,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Transport fake: hands out queued responses and records every call
    #[derive(Default)]
    pub struct FakeTransport {
        responses: Mutex<VecDeque<Result<RawResponse>>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_status(&self, status: u16, body: &str) {
            self.responses.lock().unwrap().push_back(Ok(RawResponse {
                status,
                body: Bytes::copy_from_slice(body.as_bytes()),
            }));
        }

        pub fn push_json(&self, status: u16, body: serde_json::Value) {
            self.push_status(status, &body.to_string());
        }

        pub fn push_transport_error(&self, reason: &str) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(Error::Transport(reason.to_string())));
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(
            &self,
            method: reqwest::Method,
            url: &str,
            headers: &[(String, String)],
            body: Option<Vec<u8>>,
        ) -> Result<RawResponse> {
            self.requests.lock().unwrap().push(RecordedRequest {
                method: method.to_string(),
                url: url.to_string(),
                headers: headers.to_vec(),
                body: body.and_then(|b| serde_json::from_slice(&b).ok()),
            });
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(RawResponse {
                        status: 200,
                        body: Bytes::from_static(b"{}"),
                    })
                })
        }
    }
}
