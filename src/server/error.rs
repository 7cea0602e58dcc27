//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::search::SearchError;

/// Errors a handler can surface to the client.
///
/// Every variant maps to one status code and a `{"error": "..."}` JSON
/// body; internal detail never leaks past the log line.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// An upstream service failed; the request could not be served.
    #[error("{0} unavailable")]
    Upstream(&'static str),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::InvalidInput(msg) => Self::BadRequest(msg),
            SearchError::NotFound(msg) => Self::NotFound(msg),
            SearchError::Upstream { service, message } => {
                warn!(service, message = %message, "Upstream service failed");
                Self::Upstream(service)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(e) => {
                error!(error = %e, "Request failed internally");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
