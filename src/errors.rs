use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Unprocessable Entity")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Machine-readable details for errors that carry structured data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

/// Error type shared by every service in the crate.
///
/// Any variant raised inside an order or pre-release unit of work aborts the
/// enclosing transaction; nothing is committed.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Validation error: cart must contain at least one line")]
    EmptyCart,

    #[error("Validation error: transfer must contain at least one line")]
    EmptyTransfer,

    #[error("Product {product_id} not found")]
    ProductNotFound { product_id: Uuid },

    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Transaction did not complete within {0:?}")]
    TransactionTimeout(Duration),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn db_error(error: impl Into<DbErr>) -> Self {
        ServiceError::DatabaseError(error.into())
    }

    /// Units missing to satisfy an `InsufficientStock` request.
    pub fn shortfall(&self) -> Option<i32> {
        match self {
            Self::InsufficientStock {
                requested,
                available,
                ..
            } => Some(requested - available),
            _ => None,
        }
    }

    /// Storage-level failures a caller may retry. The core itself never does.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::TransactionTimeout(_))
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "storage",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) | Self::EmptyCart | Self::EmptyTransfer => "validation",
            Self::ProductNotFound { .. } => "product_not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::TransactionTimeout(_) => "timeout",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::InternalError(_) => "internal",
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) | Self::ProductNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::EmptyCart | Self::EmptyTransfer => {
                StatusCode::BAD_REQUEST
            }
            Self::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TransactionTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Storage and internal errors return generic messages.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            Self::TransactionTimeout(_) => {
                "The operation timed out and was rolled back; retry later".to_string()
            }
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InsufficientStock {
                product_id,
                requested,
                available,
            } => Some(serde_json::json!({
                "product_id": product_id,
                "requested": requested,
                "available": available,
                "shortfall": requested - available,
            })),
            Self::ProductNotFound { product_id } => {
                Some(serde_json::json!({ "product_id": product_id }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: self.details(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
