//! Client for the internal AcademiaDePolitie API.
//!
//! Every tool call becomes exactly one `GET` against a single endpoint.
//! The query is built fresh per call ([`BackendQuery`]) and the bearer
//! token is injected once at construction.

use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::BackendError;

/// User agent sent with every backend request.
pub const BACKEND_USER_AGENT: &str = "MCP-Server/1.0";

/// A scalar query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// Integer value (ids, counts, `1` for enabled flags).
    Int(i64),
    /// String value (enumerated filters).
    Str(String),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Flat, insertion-ordered query parameters for one backend call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendQuery {
    params: IndexMap<&'static str, QueryValue>,
}

impl BackendQuery {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, replacing any previous value for `key`.
    pub fn insert(&mut self, key: &'static str, value: impl Into<QueryValue>) {
        self.params.insert(key, value.into());
    }

    /// Returns the value for `key`, if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.params.get(key)
    }

    /// Returns `true` if `key` is set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Returns the parameter names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params.keys().copied()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the parameters as `(name, value)` string pairs, ready for URL encoding.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        self.params
            .iter()
            .map(|(key, value)| (*key, value.to_string()))
            .collect()
    }
}

/// HTTP client bound to the configured endpoint.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    url: reqwest::Url,
    token: Option<String>,
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the token.
        f.debug_struct("BackendClient")
            .field("url", &self.url.as_str())
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Creates a client for `config`, authenticating with `token` when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is malformed or the HTTP client
    /// cannot be built.
    pub fn new(config: &ApiConfig, token: Option<String>) -> Result<Self, BackendError> {
        let raw_url = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.endpoint.trim_start_matches('/')
        );
        let url = reqwest::Url::parse(&raw_url).map_err(|e| BackendError::Url(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BACKEND_USER_AGENT));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(BackendError::Client)?;

        Ok(Self {
            http,
            url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Returns the endpoint URL (without query).
    #[must_use]
    pub const fn url(&self) -> &reqwest::Url {
        &self.url
    }

    /// Returns `true` if requests carry an `Authorization` header.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Performs the backend `GET` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or timeout, a non-success
    /// status, or a body that is not JSON.
    pub async fn fetch(&self, query: &BackendQuery) -> Result<Value, BackendError> {
        let mut request = self.http.get(self.url.clone()).query(&query.to_pairs());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        tracing::debug!(url = %self.url, params = query.len(), "Calling backend");

        let response = request.send().await.map_err(BackendError::Request)?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Backend returned an error status");
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(BackendError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config_for(base_url: String) -> ApiConfig {
        ApiConfig {
            base_url,
            timeout_secs: 5,
            ..ApiConfig::default()
        }
    }

    #[test]
    fn query_preserves_insertion_order() {
        let mut query = BackendQuery::new();
        query.insert("user_id", 4001_i64);
        query.insert("all", 1_i64);
        query.insert("focus", "judet");

        assert_eq!(query.keys().collect::<Vec<_>>(), ["user_id", "all", "focus"]);
        assert_eq!(
            query.to_pairs(),
            vec![
                ("user_id", "4001".to_string()),
                ("all", "1".to_string()),
                ("focus", "judet".to_string()),
            ]
        );
    }

    #[test]
    fn endpoint_url_joins_base_and_endpoint() {
        let config = config_for("https://example.com/api/internal/".to_string());
        let client = BackendClient::new(&config, None).unwrap();
        assert_eq!(
            client.url().as_str(),
            "https://example.com/api/internal/profile_for_conversation.php"
        );
    }

    #[test]
    fn blank_token_is_treated_as_absent() {
        let config = ApiConfig::default();
        let client = BackendClient::new(&config, Some("   ".to_string())).unwrap();
        assert!(!client.has_token());
    }

    #[test]
    fn debug_output_hides_token() {
        let config = ApiConfig::default();
        let client = BackendClient::new(&config, Some("eyJsecret".to_string())).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("eyJsecret"));
        assert!(debug.contains("has_token: true"));
    }

    #[tokio::test]
    async fn fetch_sends_query_and_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/profile_for_conversation.php")
                .query_param("user_id", "4001")
                .query_param("all", "1")
                .header("authorization", "Bearer test-token")
                .header("user-agent", BACKEND_USER_AGENT);
            then.status(200).json_body(json!({"ok": true}));
        });

        let client =
            BackendClient::new(&config_for(server.base_url()), Some("test-token".to_string()))
                .unwrap();
        let mut query = BackendQuery::new();
        query.insert("user_id", 4001_i64);
        query.insert("all", 1_i64);

        let body = client.fetch(&query).await.unwrap();
        assert_eq!(body, json!({"ok": true}));
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/profile_for_conversation.php");
            then.status(401).body("unauthorised");
        });

        let client = BackendClient::new(&config_for(server.base_url()), None).unwrap();
        let err = client.fetch(&BackendQuery::new()).await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 401 }));
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/profile_for_conversation.php");
            then.status(200).body("<html>oops</html>");
        });

        let client = BackendClient::new(&config_for(server.base_url()), None).unwrap();
        let err = client.fetch(&BackendQuery::new()).await.unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
        assert!(err.to_string().starts_with("API call failed"));
    }
}
