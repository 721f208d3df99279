//! Open Trivia DB API client
//!
//! This module issues the single upstream request the proxy depends on and
//! classifies its outcome. It does no retrying, throttling or caching; see
//! `retry`, `rate_limit` and `query` for those.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use super::{QueryFilters, RawQuestion};

/// Base URL for the Open Trivia DB API
pub const OPENTDB_BASE_URL: &str = "https://opentdb.com/api.php";

/// Upper bound for a single upstream request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur when fetching questions
///
/// Only [`UpstreamError::RateLimited`] is treated differently by the retry
/// policy; every other variant is a plain upstream failure.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Upstream answered HTTP 429
    #[error("Upstream rate limit exceeded (HTTP 429)")]
    RateLimited,

    /// Upstream answered with a non-success status other than 429
    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    /// HTTP request failed (connection error, timeout, ...)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl UpstreamError {
    /// Whether this failure is the upstream's rate-limit signal
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, UpstreamError::RateLimited)
    }
}

/// A successfully decoded upstream reply
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    /// HTTP status of the reply
    pub status: u16,
    /// Open Trivia DB response code; 0 means success
    pub response_code: i64,
    /// Raw, still-encoded questions
    pub results: Vec<RawQuestion>,
}

/// Source of raw trivia questions
///
/// Implemented by [`OpenTdbClient`] in production and by scripted stubs in tests.
#[async_trait]
pub trait TriviaSource: Send + Sync {
    /// Fetch one batch of `amount` questions matching `filters`
    ///
    /// `filters.search` is applied locally and never sent upstream.
    async fn fetch(
        &self,
        amount: u32,
        filters: &QueryFilters,
    ) -> Result<UpstreamResponse, UpstreamError>;
}

/// Open Trivia DB response body
#[derive(Debug, Deserialize)]
struct ApiResponse {
    response_code: i64,
    #[serde(default)]
    results: Vec<RawQuestion>,
}

/// Client for fetching questions from Open Trivia DB
#[derive(Debug, Clone)]
pub struct OpenTdbClient {
    client: Client,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl OpenTdbClient {
    /// Creates a client with the 5 second request timeout
    ///
    /// # Arguments
    /// * `base_url` - Endpoint to query, usually [`OPENTDB_BASE_URL`]
    ///
    /// # Returns
    /// * `Ok(OpenTdbClient)` on success
    /// * `Err(reqwest::Error)` if the HTTP client cannot be built (e.g. TLS init failure)
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a client around an existing HTTP client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Returns the configured endpoint
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TriviaSource for OpenTdbClient {
    async fn fetch(
        &self,
        amount: u32,
        filters: &QueryFilters,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let params = query_params(amount, filters);

        let response = self.client.get(&self.base_url).query(&params).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::RateLimited);
        }
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        parse_body(status.as_u16(), &text)
    }
}

/// Builds the upstream query string, leaving out unset filters
fn query_params(amount: u32, filters: &QueryFilters) -> Vec<(&'static str, String)> {
    let filters = filters.normalized();
    let mut params = vec![("amount", amount.to_string())];

    if let Some(category) = filters.category {
        params.push(("category", category));
    }
    if let Some(difficulty) = filters.difficulty {
        params.push(("difficulty", difficulty.as_str().to_string()));
    }
    if let Some(kind) = filters.kind {
        params.push(("type", kind.as_str().to_string()));
    }

    params
}

/// Parses an upstream body into an UpstreamResponse
fn parse_body(status: u16, text: &str) -> Result<UpstreamResponse, UpstreamError> {
    let body: ApiResponse = serde_json::from_str(text)?;
    Ok(UpstreamResponse {
        status,
        response_code: body.response_code,
        results: body.results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Difficulty, QuestionType};
    use axum::{extract::Query, routing::get, Router};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    /// Serves `router` on an ephemeral local port and returns its endpoint URL
    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Should bind");
        let addr = listener.local_addr().expect("Should have local address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{}/api.php", addr)
    }

    /// Endpoint answering every request with `status` and `body`
    async fn stub_upstream(status: StatusCode, body: &'static str) -> String {
        serve(Router::new().route("/api.php", get(move || async move { (status, body) }))).await
    }

    /// Sample valid Open Trivia DB response
    const VALID_RESPONSE: &str = r#"{
        "response_code": 0,
        "results": [
            {
                "type": "multiple",
                "difficulty": "easy",
                "category": "Entertainment: Video Games",
                "question": "What is the name of the main character in &quot;The Legend of Zelda&quot;?",
                "correct_answer": "Link",
                "incorrect_answers": ["Zelda", "Ganon", "Epona"]
            },
            {
                "type": "boolean",
                "difficulty": "hard",
                "category": "Science &amp; Nature",
                "question": "The speed of light is faster than the speed of sound.",
                "correct_answer": "True",
                "incorrect_answers": ["False"]
            }
        ]
    }"#;

    /// Open Trivia DB reply for a query with too few matching questions
    const NO_RESULTS_RESPONSE: &str = r#"{"response_code": 1, "results": []}"#;

    #[test]
    fn test_parse_valid_response() {
        let response = parse_body(200, VALID_RESPONSE).expect("Should parse valid response");

        assert_eq!(response.status, 200);
        assert_eq!(response.response_code, 0);
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].correct_answer, "Link");
        assert_eq!(response.results[1].kind, QuestionType::Boolean);
        assert_eq!(response.results[1].difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_parse_non_zero_response_code() {
        let response = parse_body(200, NO_RESULTS_RESPONSE).expect("Should parse");

        assert_eq!(response.response_code, 1);
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_parse_missing_results_defaults_to_empty() {
        let response = parse_body(200, r#"{"response_code": 2}"#).expect("Should parse");

        assert_eq!(response.response_code, 2);
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_parse_malformed_body_is_an_error() {
        let result = parse_body(200, "<html>Bad Gateway</html>");

        assert!(matches!(result, Err(UpstreamError::Parse(_))));
    }

    #[test]
    fn test_query_params_amount_only() {
        let params = query_params(50, &QueryFilters::default());

        assert_eq!(params, vec![("amount", "50".to_string())]);
    }

    #[test]
    fn test_query_params_all_filters() {
        let filters = QueryFilters {
            category: Some("9".to_string()),
            difficulty: Some(Difficulty::Medium),
            kind: Some(QuestionType::Multiple),
            search: Some("capital".to_string()),
        };

        let params = query_params(50, &filters);

        assert_eq!(
            params,
            vec![
                ("amount", "50".to_string()),
                ("category", "9".to_string()),
                ("difficulty", "medium".to_string()),
                ("type", "multiple".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_params_skip_empty_category() {
        let filters = QueryFilters {
            category: Some(String::new()),
            ..Default::default()
        };

        let params = query_params(50, &filters);

        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_rate_limited_classification() {
        assert!(UpstreamError::RateLimited.is_rate_limited());
        assert!(!UpstreamError::Status(503).is_rate_limited());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(UpstreamError::Status(503).to_string(), "Upstream returned HTTP 503");
        assert!(UpstreamError::RateLimited.to_string().contains("429"));
    }

    #[test]
    fn test_client_keeps_base_url() {
        let client = OpenTdbClient::new("http://localhost:9/api.php").expect("Should build client");
        assert_eq!(client.base_url(), "http://localhost:9/api.php");
    }

    #[tokio::test]
    async fn test_fetch_429_is_rate_limited() {
        let url = stub_upstream(StatusCode::TOO_MANY_REQUESTS, r#"{"response_code": 5}"#).await;
        let client = OpenTdbClient::new(url).expect("Should build client");

        let result = client.fetch(50, &QueryFilters::default()).await;

        assert!(matches!(result, Err(UpstreamError::RateLimited)));
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_status() {
        let url = stub_upstream(StatusCode::SERVICE_UNAVAILABLE, "down").await;
        let client = OpenTdbClient::new(url).expect("Should build client");

        let result = client.fetch(50, &QueryFilters::default()).await;

        assert!(matches!(result, Err(UpstreamError::Status(503))));
    }

    #[tokio::test]
    async fn test_fetch_success_parses_body() {
        let url = stub_upstream(StatusCode::OK, VALID_RESPONSE).await;
        let client = OpenTdbClient::new(url).expect("Should build client");

        let response = client
            .fetch(50, &QueryFilters::default())
            .await
            .expect("Should fetch");

        assert_eq!(response.status, 200);
        assert_eq!(response.response_code, 0);
        assert_eq!(response.results.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_non_json_success_is_parse_error() {
        let url = stub_upstream(StatusCode::OK, "<html>maintenance</html>").await;
        let client = OpenTdbClient::new(url).expect("Should build client");

        let result = client.fetch(50, &QueryFilters::default()).await;

        assert!(matches!(result, Err(UpstreamError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_sends_filters_but_not_search() {
        let router = Router::new().route(
            "/api.php",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let expected = params.get("amount").map(String::as_str) == Some("50")
                    && params.get("category").map(String::as_str) == Some("9")
                    && params.get("difficulty").map(String::as_str) == Some("easy")
                    && params.get("type").map(String::as_str) == Some("boolean")
                    && !params.contains_key("search");
                if expected {
                    (StatusCode::OK, r#"{"response_code": 0, "results": []}"#)
                } else {
                    (StatusCode::BAD_REQUEST, "unexpected query")
                }
            }),
        );
        let client = OpenTdbClient::new(serve(router).await).expect("Should build client");
        let filters = QueryFilters {
            category: Some("9".to_string()),
            difficulty: Some(Difficulty::Easy),
            kind: Some(QuestionType::Boolean),
            search: Some("moon".to_string()),
        };

        let response = client.fetch(50, &filters).await.expect("Should fetch");

        assert_eq!(response.response_code, 0);
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_request_error() {
        let router = Router::new().route(
            "/api.php",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                (StatusCode::OK, r#"{"response_code": 0, "results": []}"#)
            }),
        );
        let url = serve(router).await;
        let http = Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .expect("Should build HTTP client");
        let client = OpenTdbClient::with_client(http, url);

        let result = client.fetch(50, &QueryFilters::default()).await;

        match result {
            Err(UpstreamError::Request(e)) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {:?}", other),
        }
    }
}
