use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response, success_response, Created};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::users::{
        Availability, AvailabilityQuery, NewUser, UserProfile, UserStatusChange, UserUpdate,
    },
    ApiResult, AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<UserProfile>> {
    let users = state.services.users.list_users(&auth_user).await?;
    Ok(success_response(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<NewUser>,
) -> Result<Created<UserProfile>, ServiceError> {
    let user = state.services.users.create_user(&auth_user, payload).await?;
    Ok(created_response(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UserUpdate>,
) -> ApiResult<UserProfile> {
    let user = state
        .services
        .users
        .update_user(&auth_user, user_id, payload)
        .await?;
    Ok(success_response(user))
}

pub async fn set_user_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UserStatusChange>,
) -> ApiResult<UserProfile> {
    let user = state
        .services
        .users
        .set_status(&auth_user, user_id, payload.status)
        .await?;
    Ok(success_response(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.users.delete_user(&auth_user, user_id).await?;
    Ok(no_content_response())
}

pub async fn check_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Availability> {
    let availability = state.services.users.availability(query).await?;
    Ok(success_response(availability))
}
