//! Blocking HTTP client for the Jira REST API.
//!
//! A thin wrapper around `reqwest::blocking` holding the base URL and the
//! static credential. It must only be used from blocking threads: the
//! dispatcher runs every handler on `spawn_blocking`. The underlying
//! `reqwest` client is built on first use for the same reason.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder, multipart};
use reqwest::header::{ACCEPT, HeaderValue};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::{JiraError, JiraResult};
use crate::core::config::JiraConfig;
use crate::core::{Error, Result};

/// Longest raw body echoed back in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Credential forwarded with every request.
#[derive(Clone, PartialEq, Eq)]
pub enum JiraAuth {
    /// Username (email) and API token.
    Basic { username: String, token: String },
    /// Personal access token.
    Bearer(String),
}

impl std::fmt::Debug for JiraAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("token", &"[REDACTED]")
                .finish(),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"[REDACTED]").finish(),
        }
    }
}

/// Client for one Jira instance.
#[derive(Debug)]
pub struct JiraClient {
    base_url: String,
    auth: JiraAuth,
    timeout: Duration,
    http: OnceLock<Client>,
}

impl JiraClient {
    /// Create a client. The base URL's trailing slashes are dropped.
    pub fn new(base_url: impl Into<String>, auth: JiraAuth, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            auth,
            timeout,
            http: OnceLock::new(),
        }
    }

    /// Create a client from configuration.
    pub fn from_config(config: &JiraConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| Error::config("JIRA_URL is not set"))?;
        let token = config
            .api_token
            .clone()
            .ok_or_else(|| Error::config("JIRA_API_TOKEN is not set"))?;
        let auth = match config.username.clone() {
            Some(username) => JiraAuth::Basic { username, token },
            None => JiraAuth::Bearer(token),
        };
        Ok(Self::new(
            base_url,
            auth,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether an absolute URL points into this instance.
    pub fn is_own_url(&self, url: &str) -> bool {
        url.strip_prefix(&self.base_url)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
    }

    /// Build an absolute URL from an API path or validate an absolute one.
    pub fn resolve_url(&self, path_or_url: &str) -> JiraResult<String> {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            if self.is_own_url(path_or_url) {
                Ok(path_or_url.to_string())
            } else {
                Err(JiraError::ForeignUrl(path_or_url.to_string()))
            }
        } else if path_or_url.starts_with('/') {
            Ok(format!("{}{}", self.base_url, path_or_url))
        } else {
            Ok(format!("{}/{}", self.base_url, path_or_url))
        }
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// GET a JSON resource.
    pub fn get(&self, path: &str) -> JiraResult<Value> {
        self.get_with(path, &[])
    }

    /// GET a JSON resource with query parameters.
    pub fn get_with(&self, path: &str, query: &[(&str, String)]) -> JiraResult<Value> {
        let builder = self.request(Method::GET, path)?.query(query);
        self.execute(builder)
    }

    /// GET an absolute URL returned by a previous response (e.g. `self` links).
    pub fn get_absolute(&self, url: &str) -> JiraResult<Value> {
        if !self.is_own_url(url) {
            return Err(JiraError::ForeignUrl(url.to_string()));
        }
        self.get(url)
    }

    /// POST a JSON body.
    pub fn post(&self, path: &str, body: &Value) -> JiraResult<Value> {
        let builder = self.request(Method::POST, path)?.json(body);
        self.execute(builder)
    }

    /// PUT a JSON body.
    pub fn put(&self, path: &str, body: &Value) -> JiraResult<Value> {
        let builder = self.request(Method::PUT, path)?.json(body);
        self.execute(builder)
    }

    /// Upload a local file as a multipart attachment.
    pub fn upload(&self, path: &str, file: &Path) -> JiraResult<Value> {
        let form = multipart::Form::new().file("file", file)?;
        let builder = self
            .request(Method::POST, path)?
            .header("X-Atlassian-Token", HeaderValue::from_static("no-check"))
            .multipart(form);
        self.execute(builder)
    }

    /// Download raw bytes, e.g. attachment content.
    pub fn download(&self, url: &str) -> JiraResult<Vec<u8>> {
        let response = self.request(Method::GET, url)?.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_error(status, &body));
        }
        Ok(response.bytes()?.to_vec())
    }

    /// Run a JQL search.
    pub fn search(&self, jql: &str, max_results: i64, extra: &[(&str, String)]) -> JiraResult<Value> {
        let mut query = vec![("jql", jql.to_string()), ("maxResults", max_results.to_string())];
        query.extend(extra.iter().cloned());
        self.get_with("/rest/api/3/search", &query)
    }

    /// Number of issues matching a JQL query.
    pub fn search_total(&self, jql: &str) -> JiraResult<u64> {
        let data = self.search(jql, 0, &[])?;
        Ok(data.get("total").and_then(Value::as_u64).unwrap_or(0))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn http(&self) -> JiraResult<&Client> {
        if let Some(client) = self.http.get() {
            return Ok(client);
        }
        let client = Client::builder().timeout(self.timeout).build()?;
        Ok(self.http.get_or_init(|| client))
    }

    fn request(&self, method: Method, path_or_url: &str) -> JiraResult<RequestBuilder> {
        let url = self.resolve_url(path_or_url)?;
        debug!("{} {}", method, url);
        let builder = self
            .http()?
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(match &self.auth {
            JiraAuth::Basic { username, token } => builder.basic_auth(username, Some(token)),
            JiraAuth::Bearer(token) => builder.bearer_auth(token),
        })
    }

    fn execute(&self, builder: RequestBuilder) -> JiraResult<Value> {
        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            let err = status_error(status, &body);
            warn!("{}", err);
            return Err(err);
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| JiraError::UnexpectedBody {
            status: status.as_u16(),
            message: format!("invalid JSON: {e}"),
        })
    }
}

/// Build a status error, extracting Jira's own error text when present.
fn status_error(status: reqwest::StatusCode, body: &str) -> JiraError {
    JiraError::Status {
        status: status.as_u16(),
        message: error_message(status, body),
    }
}

/// Best-effort error message from a Jira error body.
///
/// Jira reports failures as `{"errorMessages": [...], "errors": {field: msg}}`.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let mut parts: Vec<String> = value
            .get("errorMessages")
            .and_then(Value::as_array)
            .map(|msgs| {
                msgs.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if let Some(errors) = value.get("errors").and_then(Value::as_object) {
            for (field, msg) in errors {
                match msg.as_str() {
                    Some(text) => parts.push(format!("{field}: {text}")),
                    None => parts.push(format!("{field}: {msg}")),
                }
            }
        }

        if let Some(message) = value.get("message").and_then(Value::as_str) {
            parts.push(message.to_string());
        }

        if !parts.is_empty() {
            return parts.join("; ");
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.chars().take(MAX_ERROR_BODY).collect();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn basic_client(base: &str) -> JiraClient {
        JiraClient::new(
            base,
            JiraAuth::Basic {
                username: "user".into(),
                token: "token".into(),
            },
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_get_sends_basic_auth() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/3/issue/KW-1")
                .header("Authorization", "Basic dXNlcjp0b2tlbg==");
            then.status(200).json_body(json!({ "key": "KW-1" }));
        });

        let client = basic_client(&server.base_url());
        let value = client.get("/rest/api/3/issue/KW-1").unwrap();

        mock.assert();
        assert_eq!(value["key"], "KW-1");
    }

    #[test]
    fn test_bearer_auth() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/3/field")
                .header("Authorization", "Bearer pat-123");
            then.status(200).json_body(json!([]));
        });

        let client = JiraClient::new(
            server.base_url(),
            JiraAuth::Bearer("pat-123".into()),
            Duration::from_secs(5),
        );
        assert_eq!(client.get("/rest/api/3/field").unwrap(), json!([]));
        mock.assert();
    }

    #[test]
    fn test_error_messages_extracted() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/issue/KW-404");
            then.status(404).json_body(json!({
                "errorMessages": ["Issue does not exist or you do not have permission to see it."],
                "errors": {}
            }));
        });

        let client = basic_client(&server.base_url());
        let err = client.get("/rest/api/3/issue/KW-404").unwrap_err();
        match err {
            JiraError::Status { status, message } => {
                assert_eq!(status, 404);
                assert!(message.starts_with("Issue does not exist"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_field_errors_extracted() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/api/3/issue");
            then.status(400).json_body(json!({
                "errorMessages": [],
                "errors": { "summary": "You must specify a summary of the issue." }
            }));
        });

        let client = basic_client(&server.base_url());
        let err = client.post("/rest/api/3/issue", &json!({})).unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("summary: You must specify a summary"));
    }

    #[test]
    fn test_empty_body_is_null() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT).path("/rest/api/3/issue/KW-2");
            then.status(204);
        });

        let client = basic_client(&server.base_url());
        let value = client
            .put("/rest/api/3/issue/KW-2", &json!({ "fields": { "summary": "x" } }))
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_search_query_parameters() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/3/search")
                .query_param("jql", "project = KW")
                .query_param("maxResults", "0");
            then.status(200).json_body(json!({ "total": 42, "issues": [] }));
        });

        let client = basic_client(&server.base_url());
        assert_eq!(client.search_total("project = KW").unwrap(), 42);
        mock.assert();
    }

    #[test]
    fn test_resolve_url() {
        let client = basic_client("https://example.atlassian.net/");
        assert_eq!(client.base_url(), "https://example.atlassian.net");
        assert_eq!(
            client.resolve_url("/rest/api/3/project").unwrap(),
            "https://example.atlassian.net/rest/api/3/project"
        );
        assert!(client.resolve_url("https://example.atlassian.net/secure/attachment/1").is_ok());
        assert!(matches!(
            client.resolve_url("https://evil.example.com/steal"),
            Err(JiraError::ForeignUrl(_))
        ));
        assert!(!client.is_own_url("https://example.atlassian.net.evil.com/x"));
    }

    #[test]
    fn test_connection_failure_is_network_error() {
        let client = basic_client("http://127.0.0.1:1");
        let err = client.get("/rest/api/3/project").unwrap_err();
        assert!(matches!(err, JiraError::Network(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = basic_client("https://example.atlassian.net");
        let debug = format!("{:?}", client);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("\"token\""));
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(
            error_message(reqwest::StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(
            error_message(reqwest::StatusCode::SERVICE_UNAVAILABLE, ""),
            "Service Unavailable"
        );
    }
}
