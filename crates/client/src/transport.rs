// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! HTTP transport for the Password Safe API

use crate::error::TransportError;
use crate::identity::ClientIdentity;
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
            Method::Put => f.write_str("PUT"),
        }
    }
}

/// A request relative to the API base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status and raw body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Request/response capability the session runs on
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request with the session's default credentials
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;

    /// Send a request presenting `identity` as TLS client certificate
    async fn send_with_identity(
        &self,
        request: ApiRequest,
        identity: &ClientIdentity,
    ) -> Result<ApiResponse, TransportError>;

    /// Root URL requests are resolved against
    fn base_url(&self) -> &str;
}

/// Settings for [`HttpTransport`]
#[derive(Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub api_key: String,
    pub verify_ca: bool,
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("verify_ca", &self.verify_ca)
            .finish()
    }
}

/// reqwest-backed transport.
///
/// All clients built by one transport share a cookie jar, so the session
/// cookie from sign-in travels with every later call.
pub struct HttpTransport {
    client: reqwest::Client,
    jar: Arc<Jar>,
    headers: HeaderMap,
    base_url: String,
    verify_ca: bool,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|e| TransportError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;

        let mut auth = HeaderValue::from_str(&format!("PS-Auth key={}", config.api_key))
            .map_err(|_| TransportError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
            })?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        if !config.verify_ca {
            insight_logging::warning(&format!(
                "InsecureRequestWarning: Unverified HTTPS request is being made to host {}. \
                 Adding certificate verification is strongly advised.",
                base_url
            ));
        }

        let jar = Arc::new(Jar::default());
        let client = client_builder(&headers, &jar, config.verify_ca)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            client,
            jar,
            headers,
            base_url,
            verify_ca: config.verify_ca,
        })
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, TransportError> {
        let raw = format!("{}{}", self.base_url, path);
        reqwest::Url::parse(&raw).map_err(|e| TransportError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }

    async fn execute(
        &self,
        client: &reqwest::Client,
        request: ApiRequest,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url(&request.path)?;
        insight_logging::debug(&format!("{} {}", request.method, request.path));

        let mut builder = match request.method {
            Method::Get => client.get(url.clone()),
            Method::Post => client.post(url.clone()),
            Method::Put => client.put(url.clone()),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), e))?;

        Ok(ApiResponse { status, body })
    }
}

fn client_builder(headers: &HeaderMap, jar: &Arc<Jar>, verify_ca: bool) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(format!("insight-agent/{}", env!("CARGO_PKG_VERSION")))
        .default_headers(headers.clone())
        .cookie_provider(Arc::clone(jar))
        .danger_accept_invalid_certs(!verify_ca)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.execute(&self.client, request).await
    }

    async fn send_with_identity(
        &self,
        request: ApiRequest,
        identity: &ClientIdentity,
    ) -> Result<ApiResponse, TransportError> {
        // One-off client; the identity is released together with it
        let client = client_builder(&self.headers, &self.jar, self.verify_ca)
            .identity(identity.to_reqwest()?)
            .build()
            .map_err(TransportError::Client)?;
        self.execute(&client, request).await
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::new(&TransportConfig {
            base_url: format!("{}/", server.uri()),
            api_key: "abc123;runas=agent".to_string(),
            verify_ca: false,
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = HttpTransport::new(&TransportConfig {
            base_url: "not a url".to_string(),
            api_key: "k".to_string(),
            verify_ca: true,
        })
        .err()
        .unwrap();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));
    }

    #[test]
    fn test_config_debug_redacts_api_key() {
        let config = TransportConfig {
            base_url: "https://pws.example.com/BeyondTrust/api/public/v3".to_string(),
            api_key: "abc123".to_string(),
            verify_ca: true,
        };
        assert!(!format!("{:?}", config).contains("abc123"));
    }

    #[tokio::test]
    async fn test_sends_authorization_header_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets-safe/secrets"))
            .and(header("authorization", "PS-Auth key=abc123;runas=agent"))
            .and(query_param("path", "folder a/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport(&server);
        assert_eq!(transport.base_url(), server.uri());

        let response = transport
            .send(ApiRequest::get("/secrets-safe/secrets").query("path", "folder a/b"))
            .await
            .unwrap();
        assert_eq!(response, ApiResponse::new(200, "[]"));
    }

    #[tokio::test]
    async fn test_session_cookie_is_replayed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Auth/SignAppin"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "ASP.NET_SessionId=s1; Path=/")
                    .set_body_json(json!({"UserId": 1})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/Requests/7/checkin"))
            .and(header("cookie", "ASP.NET_SessionId=s1"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport(&server);
        transport.send(ApiRequest::post("/Auth/SignAppin")).await.unwrap();
        let response = transport
            .send(ApiRequest::put("/Requests/7/checkin").json(json!({})))
            .await
            .unwrap();
        assert_eq!(response.status, 204);
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        // Grab a free port and release it so nothing is listening there
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let transport = HttpTransport::new(&TransportConfig {
            base_url: format!("http://127.0.0.1:{}", port),
            api_key: "k".to_string(),
            verify_ca: true,
        })
        .unwrap();
        let err = transport
            .send(ApiRequest::post("/Auth/SignAppin"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connection { .. }));
    }
}
