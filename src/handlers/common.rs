use crate::ApiResponse;
use axum::{http::StatusCode, response::Json};
use serde::Serialize;

/// `201 Created` with the standard envelope
pub type Created<T> = (StatusCode, Json<ApiResponse<T>>);

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Created<T> {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Standard no content response
pub fn no_content_response() -> StatusCode {
    StatusCode::NO_CONTENT
}
