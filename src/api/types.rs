use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::browse::{BrowseSnapshot, CategoryOutcome};
use crate::catalog::MovieSummary;
use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    Loaded,
    Empty,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryView {
    pub key: String,
    pub title: String,
    pub status: CategoryStatus,
    pub movies: Vec<MovieSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&CategoryOutcome> for CategoryView {
    fn from(outcome: &CategoryOutcome) -> Self {
        match outcome {
            CategoryOutcome::Success { key, display_name, movies } => CategoryView {
                key: key.clone(),
                title: display_name.clone(),
                status: if movies.is_empty() {
                    CategoryStatus::Empty
                } else {
                    CategoryStatus::Loaded
                },
                movies: movies.clone(),
                error: None,
            },
            CategoryOutcome::Failure { key, display_name, error_message } => CategoryView {
                key: key.clone(),
                title: display_name.clone(),
                status: CategoryStatus::Failed,
                movies: Vec::new(),
                error: Some(error_message.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseResponse {
    /// True while no run has completed yet; `categories` is empty then.
    pub loading: bool,
    pub refreshing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<u64>,
    #[serde(rename = "partialFailure")]
    pub partial_failure: bool,
    pub categories: Vec<CategoryView>,
}

impl BrowseResponse {
    pub fn loading() -> Self {
        Self {
            loading: true,
            refreshing: true,
            run: None,
            partial_failure: false,
            categories: Vec::new(),
        }
    }

    pub fn from_snapshot(snapshot: &BrowseSnapshot, refreshing: bool) -> Self {
        Self {
            loading: false,
            refreshing,
            run: Some(snapshot.run),
            partial_failure: snapshot.result.had_any_failure,
            categories: snapshot.result.outcomes.iter().map(CategoryView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Handler error: a status code plus a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::NetworkUnreachable(_) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Upstream { .. } | ServiceError::ProtocolViolation(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}
