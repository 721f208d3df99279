//! HTTP surface of the proxy
//!
//! Exposes `GET /api/questions` (the query operation) and `GET /health`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::data::{Difficulty, Question, QueryFilters, QuestionType};
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::query::{QueryService, ServiceError};

/// Raw query string of `GET /api/questions`
///
/// Everything arrives as text so that empty values (`?category=`) can be
/// treated as absent instead of being rejected.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionParams {
    pub amount: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
}

/// A fully parsed `GET /api/questions` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRequest {
    pub filters: QueryFilters,
    pub page: u32,
    pub page_size: u32,
}

impl QuestionParams {
    /// Validates the parameters into a request
    ///
    /// # Returns
    /// * `Ok(QuestionRequest)` with defaults applied (`amount` 10, `page` 1)
    /// * `Err(ApiError::BadRequest)` if a value cannot be parsed
    pub fn into_request(self) -> Result<QuestionRequest, ApiError> {
        let page_size = parse_number("amount", self.amount.as_deref(), DEFAULT_PAGE_SIZE)?;
        let page = parse_number("page", self.page.as_deref(), 1)?;

        let difficulty = match present(self.difficulty.as_deref()) {
            Some(value) => Some(Difficulty::parse(value).ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Invalid difficulty '{}'. Valid values: easy, medium, hard",
                    value
                ))
            })?),
            None => None,
        };

        let kind = match present(self.kind.as_deref()) {
            Some(value) => Some(QuestionType::parse(value).ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Invalid type '{}'. Valid values: multiple, boolean",
                    value
                ))
            })?),
            None => None,
        };

        Ok(QuestionRequest {
            filters: QueryFilters {
                category: self.category,
                difficulty,
                kind,
                search: self.search,
            }
            .normalized(),
            page,
            page_size,
        })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(name: &str, value: Option<&str>, default: u32) -> Result<u32, ApiError> {
    match present(value) {
        Some(v) => v
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid {} '{}'", name, v))),
        None => Ok(default),
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: bool,
    pub message: String,
}

/// Errors returned to HTTP callers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed query parameter
    #[error("{0}")]
    BadRequest(String),

    /// Upstream unreachable after all retries
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(ServiceError::Unavailable) => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorBody {
            error: true,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Returns a page of questions
pub async fn questions_handler(
    State(service): State<QueryService>,
    Query(params): Query<QuestionParams>,
) -> Result<Json<Vec<Question>>, ApiError> {
    let request = params.into_request()?;
    let questions = service
        .resolve(&request.filters, request.page, request.page_size)
        .await?;
    Ok(Json(questions))
}

/// Health check endpoint
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Builds the Axum router
pub fn router(service: QueryService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/questions", get(questions_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}
