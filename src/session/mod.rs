//! Authenticated Ceph Dashboard API session
//!
//! A [`Session`] holds the dashboard base URL and the bearer token obtained
//! from a one-time sign-in exchange, and executes authenticated requests.
//! The token is set once at connect time and read-only afterwards; the
//! session itself never retries a failed call.

pub mod transport;

use crate::error::{Error, Result};
use bytes::Bytes;
use reqwest::Method;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub use transport::{HttpTransport, RawResponse, Transport};

/// Versioned media type the dashboard API requires on every request
pub const ACCEPT_HEADER: &str = "application/vnd.ceph.api.v1.0+json";

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for the dashboard API
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Dashboard base URL, e.g. `https://ceph-dashboard.example.com:8443`
    pub url: String,
    /// Sign-in username; empty skips authentication (read-only endpoints)
    pub username: String,
    /// Sign-in password
    pub password: String,
    /// Skip TLS certificate verification
    pub insecure: bool,
    /// Per-request deadline
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: "https://localhost:8443".to_string(),
            username: String::new(),
            password: String::new(),
            insecure: false,
            timeout: Duration::from_secs(10),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    #[allow(dead_code)]
    username: Option<String>,
}

/// Authenticated handle to one dashboard endpoint
pub struct Session {
    base_url: String,
    token: Option<String>,
    transport: Arc<dyn Transport>,
}

// Manual impl: the transport is a trait object and the token must not
// end up in log output.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Connect to the dashboard, signing in immediately when a username
    /// is configured.
    pub async fn connect(config: &SessionConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.timeout, config.insecure)?);
        Self::connect_with(config, transport).await
    }

    /// Connect over an explicit transport (tests inject a fake here)
    pub async fn connect_with(
        config: &SessionConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        if config.url.is_empty() {
            return Err(Error::Configuration(
                "dashboard URL must be configured".into(),
            ));
        }

        let mut session = Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            token: None,
            transport,
        };

        if !config.username.is_empty() && !config.password.is_empty() {
            session.sign_in(&config.username, &config.password).await?;
        }

        Ok(session)
    }

    /// Exchange credentials for a bearer token at `/api/auth`.
    ///
    /// The dashboard answers 201 on success; 200 is also accepted.
    pub async fn sign_in(&mut self, username: &str, password: &str) -> Result<()> {
        let payload = serde_json::json!({
            "username": username,
            "password": password,
        });

        let resp = self
            .transport
            .send(
                Method::POST,
                &format!("{}/api/auth", self.base_url),
                &self.headers(),
                Some(payload.to_string().into_bytes()),
            )
            .await?;

        if resp.status != 200 && resp.status != 201 {
            return Err(Error::Auth {
                status: resp.status,
            });
        }

        let auth: AuthResponse = serde_json::from_slice(&resp.body)?;
        self.token = Some(auth.token);
        info!(username, "signed in to dashboard");
        Ok(())
    }

    /// Execute an authenticated request, returning the raw body on any
    /// 2xx status and a protocol failure (status + body verbatim) otherwise.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Bytes> {
        self.execute_with_headers(method, path, body, &[]).await
    }

    /// Like [`Session::execute`] with extra headers; later entries override
    /// the session defaults.
    pub async fn execute_with_headers(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        extra_headers: &[(String, String)],
    ) -> Result<Bytes> {
        let url = format!("{}{}", self.base_url, path);
        let mut headers = self.headers();
        for (name, value) in extra_headers {
            headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }

        debug!(%method, path, "dashboard request");

        let resp = self
            .transport
            .send(
                method,
                &url,
                &headers,
                body.map(|v| v.to_string().into_bytes()),
            )
            .await?;

        if !(200..300).contains(&resp.status) {
            return Err(Error::Protocol {
                status: resp.status,
                body: String::from_utf8_lossy(&resp.body).into_owned(),
            });
        }

        Ok(resp.body)
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), ACCEPT_HEADER.to_string()),
        ];
        if let Some(token) = &self.token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        headers
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::transport::testing::FakeTransport;
    use super::*;
    use assert_matches::assert_matches;

    fn config() -> SessionConfig {
        SessionConfig {
            url: "https://ceph.example:8443".into(),
            username: "admin".into(),
            password: "secret".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sign_in_caches_token() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_json(
            201,
            serde_json::json!({"token": "tok-123", "username": "admin"}),
        );

        let session = Session::connect_with(&config(), transport.clone())
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, "https://ceph.example:8443/api/auth");
        assert_eq!(requests[0].header("Accept"), Some(ACCEPT_HEADER));

        // Subsequent calls carry the bearer token
        transport.push_status(200, "{}");
        session.execute(Method::GET, "/api/pool/data", None).await.unwrap();
        let requests = transport.requests();
        assert_eq!(
            requests[1].header("Authorization"),
            Some("Bearer tok-123")
        );
    }

    #[tokio::test]
    async fn test_debug_output_redacts_token() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_json(
            201,
            serde_json::json!({"token": "tok-123", "username": "admin"}),
        );
        let session = Session::connect_with(&config(), transport).await.unwrap();

        let rendered = format!("{:?}", session);
        assert!(rendered.contains("authenticated: true"));
        assert!(!rendered.contains("tok-123"));
    }

    #[tokio::test]
    async fn test_extra_headers_replace_session_defaults() {
        let transport = Arc::new(FakeTransport::new());
        let cfg = SessionConfig {
            url: "https://ceph.example:8443".into(),
            ..Default::default()
        };
        let session = Session::connect_with(&cfg, transport.clone()).await.unwrap();

        transport.push_status(200, "{}");
        session
            .execute_with_headers(
                Method::GET,
                "/api/pool/data",
                None,
                &[("Accept".to_string(), "application/json".to_string())],
            )
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.header("Accept"), Some("application/json"));
        let accept_count = request
            .headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case("Accept"))
            .count();
        assert_eq!(accept_count, 1);
    }

    #[tokio::test]
    async fn test_sign_in_failure_is_auth_error() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_status(401, "denied");

        let err = Session::connect_with(&config(), transport)
            .await
            .unwrap_err();
        assert_matches!(err, Error::Auth { status: 401 });
    }

    #[tokio::test]
    async fn test_session_without_credentials_skips_sign_in() {
        let transport = Arc::new(FakeTransport::new());
        let cfg = SessionConfig {
            url: "https://ceph.example:8443".into(),
            ..Default::default()
        };
        let session = Session::connect_with(&cfg, transport.clone()).await.unwrap();
        assert!(transport.requests().is_empty());

        transport.push_status(200, "{}");
        session.execute(Method::GET, "/api/monitor", None).await.unwrap();
        assert_eq!(transport.requests()[0].header("Authorization"), None);
    }

    #[tokio::test]
    async fn test_non_2xx_surfaces_status_and_body() {
        let transport = Arc::new(FakeTransport::new());
        let cfg = SessionConfig {
            url: "https://ceph.example:8443".into(),
            ..Default::default()
        };
        let session = Session::connect_with(&cfg, transport.clone()).await.unwrap();

        transport.push_status(500, "internal error");
        let err = session
            .execute(Method::GET, "/api/pool/data", None)
            .await
            .unwrap_err();
        assert_matches!(err, Error::Protocol { status: 500, ref body } if body == "internal error");
    }

    #[tokio::test]
    async fn test_transport_failure_passes_through() {
        let transport = Arc::new(FakeTransport::new());
        let cfg = SessionConfig {
            url: "https://ceph.example:8443".into(),
            ..Default::default()
        };
        let session = Session::connect_with(&cfg, transport.clone()).await.unwrap();

        transport.push_transport_error("connection refused");
        let err = session
            .execute(Method::GET, "/api/pool/data", None)
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_missing_url_rejected() {
        let transport = Arc::new(FakeTransport::new());
        let cfg = SessionConfig {
            url: String::new(),
            ..Default::default()
        };
        let err = Session::connect_with(&cfg, transport).await.unwrap_err();
        assert_matches!(err, Error::Configuration(_));
    }
}
