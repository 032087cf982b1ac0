use anyhow::Context;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthManager, Credentials};
use crate::error::{truncate, OpenListError, RequestError, Result, ERROR_SNIPPET_LEN};

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Characters of a response body written to debug logs
const LOG_BODY_LEN: usize = 500;

/// Query parameters, JSON body and extra headers for one API call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub json: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

/// HTTP client for the OpenList API
/// Attaches the session token and retries once after a 401
#[derive(Clone)]
pub struct OpenListHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Authentication manager
    auth_manager: Arc<AuthManager>,
}

impl OpenListHttpClient {
    /// Create a client and its authentication manager for one server
    pub fn new(credentials: Credentials, request_timeout: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        let auth_manager = Arc::new(AuthManager::new(credentials, client.clone()));

        Ok(Self {
            client,
            auth_manager,
        })
    }

    pub fn auth_manager(&self) -> &Arc<AuthManager> {
        &self.auth_manager
    }

    /// Issue an authenticated request and return the parsed JSON body
    ///
    /// On 401 the token is discarded, a fresh login is made and the request is
    /// sent once more; the retry's outcome is final.
    pub async fn request(&self, method: Method, path: &str, options: RequestOptions) -> Result<Value> {
        let token = self.auth_manager.access_token().await?;
        let url = format!("{}{}", self.auth_manager.credentials().host, path);

        tracing::debug!(
            method = %method,
            url = %url,
            query = ?options.query,
            body = ?options.json,
            "Sending API request"
        );

        let (status, body) = self.send(&method, &url, &options, &token).await?;

        if status == 401 {
            tracing::warn!(
                method = %method,
                url = %url,
                "Received 401, logging in again and retrying once"
            );

            let token = self.auth_manager.relogin().await?;
            let (status, body) = self.send(&method, &url, &options, &token).await?;
            return parse_response(status, &body).map_err(|e| {
                tracing::error!(url = %url, error = %e, "Retried request failed");
                e
            });
        }

        parse_response(status, &body).map_err(|e| {
            tracing::error!(url = %url, error = %e, "API request failed");
            e
        })
    }

    /// Send one attempt and read the full body
    async fn send(
        &self,
        method: &Method,
        url: &str,
        options: &RequestOptions,
        token: &str,
    ) -> Result<(u16, String)> {
        let mut builder = self
            .client
            .request(method.clone(), url)
            .header(AUTHORIZATION, token);

        for (key, value) in &options.headers {
            if key.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                continue;
            }
            builder = builder.header(key.as_str(), value.as_str());
        }

        if !options.has_header(ACCEPT.as_str()) {
            builder = builder.header(ACCEPT, "application/json");
        }

        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }

        if let Some(ref body) = options.json {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            let error_kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connection_failed"
            } else if e.is_request() {
                "request_error"
            } else {
                "unknown"
            };

            tracing::warn!(
                error_kind = error_kind,
                error = %e,
                url = %url,
                "HTTP request error"
            );
            OpenListError::Transport(e)
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(
            status,
            body = %truncate(&body, LOG_BODY_LEN),
            "Received API response"
        );

        Ok((status, body))
    }
}

/// Classify a finished response: non-200 first, then JSON parsing
fn parse_response(status: u16, body: &str) -> Result<Value> {
    if status != 200 {
        return Err(RequestError::Status {
            status,
            body: truncate(body, ERROR_SNIPPET_LEN),
        }
        .into());
    }

    serde_json::from_str(body).map_err(|_| {
        RequestError::InvalidJson {
            status,
            body: truncate(body, ERROR_SNIPPET_LEN),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LOGIN_PATH;
    use chrono::Utc;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(host: &str) -> OpenListHttpClient {
        OpenListHttpClient::new(Credentials::new(host, "admin", "secret"), 30).unwrap()
    }

    #[test]
    fn test_parse_response() {
        assert_eq!(
            parse_response(200, r#"{"code":200}"#).unwrap(),
            json!({"code": 200})
        );

        assert!(matches!(
            parse_response(500, "oops").unwrap_err(),
            OpenListError::Request(RequestError::Status { status: 500, .. })
        ));

        assert!(matches!(
            parse_response(200, "not json").unwrap_err(),
            OpenListError::Request(RequestError::InvalidJson { status: 200, .. })
        ));
    }

    #[test]
    fn test_request_options_builder() {
        let options = RequestOptions::new()
            .query("tid", "abc")
            .json(json!(["a"]))
            .header("accept", "text/plain");

        assert_eq!(options.query, vec![("tid".to_string(), "abc".to_string())]);
        assert_eq!(options.json, Some(json!(["a"])));
        assert!(options.has_header("Accept"));
        assert!(!options.has_header("X-Other"));
    }

    #[tokio::test]
    async fn test_token_sent_verbatim_with_accept_header() {
        let mut server = mockito::Server::new_async().await;
        let target = server
            .mock("GET", "/api/me")
            .match_header("authorization", "raw-token")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_body(r#"{"code":200,"data":{"username":"admin"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url());
        client
            .auth_manager()
            .set_token_for_testing("raw-token", Utc::now())
            .await;

        let value = client
            .request(Method::GET, "/api/me", RequestOptions::new())
            .await
            .unwrap();

        target.assert_async().await;
        assert_eq!(value["data"]["username"], "admin");
    }

    #[tokio::test]
    async fn test_caller_accept_header_kept() {
        let mut server = mockito::Server::new_async().await;
        let target = server
            .mock("GET", "/api/me")
            .match_header("accept", "text/plain")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url());
        client
            .auth_manager()
            .set_token_for_testing("tok", Utc::now())
            .await;

        client
            .request(
                Method::GET,
                "/api/me",
                RequestOptions::new().header("Accept", "text/plain"),
            )
            .await
            .unwrap();
        target.assert_async().await;
    }

    #[tokio::test]
    async fn test_401_relogs_in_and_retries_once() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("POST", "/api/fs/list")
            .match_header("authorization", "expired-token")
            .with_status(401)
            .with_body(r#"{"code":401,"message":"token is expired"}"#)
            .expect(1)
            .create_async()
            .await;
        let login = server
            .mock("POST", LOGIN_PATH)
            .with_status(200)
            .with_body(r#"{"code":200,"data":{"token":"fresh-token"}}"#)
            .expect(1)
            .create_async()
            .await;
        let accepted = server
            .mock("POST", "/api/fs/list")
            .match_header("authorization", "fresh-token")
            .match_body(Matcher::Json(json!({"path": "/"})))
            .with_status(200)
            .with_body(r#"{"code":200,"data":{"content":[]}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url());
        client
            .auth_manager()
            .set_token_for_testing("expired-token", Utc::now())
            .await;

        let value = client
            .request(
                Method::POST,
                "/api/fs/list",
                RequestOptions::new().json(json!({"path": "/"})),
            )
            .await
            .unwrap();

        assert_eq!(value["code"], 200);
        rejected.assert_async().await;
        login.assert_async().await;
        accepted.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_retry_reports_retry_status() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("POST", "/api/fs/list")
            .match_header("authorization", "expired-token")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let login = server
            .mock("POST", LOGIN_PATH)
            .with_status(200)
            .with_body(r#"{"code":200,"data":{"token":"fresh-token"}}"#)
            .expect(1)
            .create_async()
            .await;
        let retried = server
            .mock("POST", "/api/fs/list")
            .match_header("authorization", "fresh-token")
            .with_status(503)
            .with_body("unavailable")
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url());
        client
            .auth_manager()
            .set_token_for_testing("expired-token", Utc::now())
            .await;

        let err = client
            .request(Method::POST, "/api/fs/list", RequestOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OpenListError::Request(RequestError::Status { status: 503, .. })
        ));
        rejected.assert_async().await;
        login.assert_async().await;
        retried.assert_async().await;
    }

    #[tokio::test]
    async fn test_second_401_is_not_retried_again() {
        let mut server = mockito::Server::new_async().await;
        let target = server
            .mock("POST", "/api/fs/list")
            .with_status(401)
            .expect(2)
            .create_async()
            .await;
        let login = server
            .mock("POST", LOGIN_PATH)
            .with_status(200)
            .with_body(r#"{"code":200,"data":{"token":"fresh-token"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url());
        client
            .auth_manager()
            .set_token_for_testing("expired-token", Utc::now())
            .await;

        let err = client
            .request(Method::POST, "/api/fs/list", RequestOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OpenListError::Request(RequestError::Status { status: 401, .. })
        ));
        target.assert_async().await;
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_json_and_non_200_are_distinct() {
        let mut server = mockito::Server::new_async().await;
        let _html = server
            .mock("GET", "/api/me")
            .with_status(200)
            .with_body("<html></html>")
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/api/task/copy/done")
            .with_status(500)
            .with_body(r#"{"code":500}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        client
            .auth_manager()
            .set_token_for_testing("tok", Utc::now())
            .await;

        let not_json = client
            .request(Method::GET, "/api/me", RequestOptions::new())
            .await
            .unwrap_err();
        let failed = client
            .request(Method::GET, "/api/task/copy/done", RequestOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(
            not_json,
            OpenListError::Request(RequestError::InvalidJson { .. })
        ));
        assert!(matches!(
            failed,
            OpenListError::Request(RequestError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_query_parameters_sent() {
        let mut server = mockito::Server::new_async().await;
        let target = server
            .mock("POST", "/api/task/upload/delete")
            .match_query(Matcher::UrlEncoded("tid".into(), "task-1".into()))
            .with_status(200)
            .with_body(r#"{"code":200}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url());
        client
            .auth_manager()
            .set_token_for_testing("tok", Utc::now())
            .await;

        client
            .request(
                Method::POST,
                "/api/task/upload/delete",
                RequestOptions::new().query("tid", "task-1"),
            )
            .await
            .unwrap();
        target.assert_async().await;
    }

    #[tokio::test]
    async fn test_transport_error() {
        // Nothing listens on port 1
        let client = client_for("http://127.0.0.1:1");
        let err = client
            .request(Method::GET, "/api/me", RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OpenListError::Transport(_)));
    }
}
